//! Error types for benchmarks.

use chronoforge_config::ConfigError;
use chronoforge_core::{ModelError, WireError};
use chronoforge_solver::SolverError;
use thiserror::Error;

/// Error that ends a whole benchmark.
///
/// A failing run is not one of these: it is recorded as
/// [`RunOutcome::Error`](crate::RunOutcome::Error) and the benchmark goes on.
#[derive(Debug, Error)]
pub enum BenchmarkError {
    /// Invalid benchmark setup, reported before any run starts.
    #[error("usage error: {0}")]
    Usage(String),

    #[error("I/O error on {path}: {source}")]
    Output {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("benchmark run panicked or was cancelled: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Result type for benchmark operations.
pub type Result<T> = std::result::Result<T, BenchmarkError>;
