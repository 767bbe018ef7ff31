//! JSON-lines codec between models and the solving engine.
//!
//! Every message is one JSON object on one line. Outbound commands carry the
//! model record, the parameters and an optional warm start; inbound events are
//! decoded against the model so that solution and domain ids map back to the
//! caller's nodes.

mod decode;
mod document;
mod encode;
mod messages;

#[cfg(test)]
mod tests;

use thiserror::Error;

use crate::error::ModelError;

pub use decode::{
    decode_command, decode_domains, decode_message, decode_model, decode_solution, EngineRequest,
};
pub use document::{json_to_problem, problem_to_json, Problem};
pub use encode::{
    encode_command, encode_event, encode_model, encode_solution, propagate_command,
    solution_command, solve_command, stop_command, to_text_command,
};
pub use messages::{
    Command, DomainsEvent, EngineMessage, LowerBoundEvent, SolutionEvent, SolveSummary,
    WireArg, WireDomain, WireDomains, WireEvent, WireModel, WireNode, WireObjective,
    WireSolution, WireSolutionEvent, WireValue,
};

/// Error raised while encoding or decoding protocol messages.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("malformed JSON message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("id {0} is not a variable of the model")]
    UnknownId(u32),

    #[error("reference {0} does not exist")]
    DanglingRef(u32),

    #[error("reference cycle through node {0}")]
    Cycle(u32),

    #[error("engine reported an invalid solution")]
    InvalidSolution,

    #[error("malformed message: {0}")]
    Malformed(String),

    #[error(transparent)]
    Model(#[from] ModelError),
}

pub type Result<T> = std::result::Result<T, WireError>;
