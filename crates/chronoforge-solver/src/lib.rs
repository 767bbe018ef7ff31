//! ChronoForge Solver - sessions with an external solving engine
//!
//! This crate provides:
//! - [`Solver`]: a one-shot session that sends one command and streams back
//!   typed events until the engine finishes
//! - [`SolverHandle`]: stop a running session or inject solutions into it
//! - [`EngineLauncher`]: how a session reaches its engine; [`ProcessLauncher`]
//!   starts the engine executable
//!
//! Sessions log through `tracing` with structured `event` fields
//! (`solve_start`, `solution`, `lower_bound`, `solve_end`, `engine_error`).

pub mod engine;
pub mod error;
pub mod event;
pub mod handle;
pub mod result;
pub mod session;

pub use engine::{
    EngineConnection, EngineLauncher, EngineReader, EngineWriter, LaunchFuture, ProcessLauncher,
    DEFAULT_SOLVER, SOLVER_ENV,
};
pub use error::{Result, SolverError};
pub use event::{SolverEvent, SolverEventSupport, SubscriptionId};
pub use handle::{CommandStatus, SolverHandle};
pub use result::{PropagationResult, SolutionRecord, SolveResult};
pub use session::{Solver, SolverState};
