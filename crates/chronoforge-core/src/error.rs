//! Error types for model construction and evaluation

use thiserror::Error;

use crate::model::{Func, NodeId};

/// Error raised synchronously by a modeling call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// A numeric bound lies outside the representable range.
    #[error("{what} value {value} is out of range [{min}, {max}]")]
    OutOfRange {
        what: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// A lower bound exceeds its upper bound.
    #[error("invalid {what} bounds: {min} > {max}")]
    InvalidBounds {
        what: &'static str,
        min: f64,
        max: f64,
    },

    /// Operator received the wrong number of arguments.
    #[error("{func} expects {expected} argument(s), got {actual}")]
    Arity {
        func: Func,
        expected: usize,
        actual: usize,
    },

    /// Transition matrix does not match the intervals or types it covers.
    #[error("transition matrix must be {expected}x{expected}: {detail}")]
    TransitionShape { expected: usize, detail: String },

    /// Transition matrices only hold non-negative distances.
    #[error("negative transition time {value} at [{row}][{col}]")]
    NegativeTransition { row: usize, col: usize, value: i64 },

    /// Step function points must be strictly increasing in x.
    #[error("step function points must be strictly increasing, found x={x} after x={previous}")]
    StepFunctionOrder { previous: i64, x: i64 },

    /// Handle does not belong to this model.
    #[error("node {0:?} does not belong to this model")]
    UnknownNode(NodeId),

    /// Node has the wrong kind for the requested operation.
    #[error("node {node:?} is a {actual}, expected {expected}")]
    KindMismatch {
        node: NodeId,
        expected: &'static str,
        actual: &'static str,
    },

    /// Other invalid argument.
    #[error("invalid argument: {0}")]
    Invalid(String),
}

/// Result type alias for modeling operations
pub type Result<T> = std::result::Result<T, ModelError>;
