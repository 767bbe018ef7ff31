//! Error types for solver sessions.

use chronoforge_core::{ModelError, WireError};
use thiserror::Error;

use crate::session::SolverState;

/// Error raised by a solver session.
#[derive(Debug, Error)]
pub enum SolverError {
    /// The engine could not be started or the stream ended early.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A message could not be encoded or decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] WireError),

    /// An inbound line that failed to decode, with the raw text.
    #[error("protocol error: {source} in message {line:?}")]
    InvalidMessage {
        line: String,
        #[source]
        source: WireError,
    },

    /// The engine reported an error.
    #[error("engine error: {0}")]
    Engine(String),

    /// A session runs a single command.
    #[error("solver is {0:?}, expected Idle")]
    InvalidState(SolverState),

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Result type for solver operations.
pub type Result<T> = std::result::Result<T, SolverError>;
