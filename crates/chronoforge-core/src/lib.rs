//! ChronoForge Core - modeling and protocol types for scheduling solvers
//!
//! This crate provides everything that does not need a running engine:
//! - The expression graph and [`Model`] with the full modeling vocabulary
//! - [`Solution`] and [`ModelDomains`] values exchanged with the engine
//! - A presence-aware evaluator that checks solutions client side
//! - The JSON-lines wire codec, JSON documents and Rust source export

pub mod domains;
pub mod error;
pub mod eval;
pub mod export;
pub mod model;
pub mod solution;
pub mod wire;

pub use domains::{Domain, ModelDomains};
pub use error::ModelError;
pub use eval::{eval, eval_constraint, verify, EvalError, Value};
pub use model::{
    BoolExpr, BoolVar, Constraint, CumulExpr, FloatExpr, FloatVar, Func, IntExpr,
    IntStepFunction, IntVar, IntervalVar, Model, NodeId, ObjectiveSense, Presence, RefId,
    SequenceVar,
};
pub use solution::{ObjectiveValue, Solution, SolutionValue};
pub use wire::{
    DomainsEvent, EngineMessage, LowerBoundEvent, SolutionEvent, SolveSummary, WireError,
};
