//! ChronoForge - constraint-based scheduling in Rust
//!
//! Build a model with interval variables and constraints, then hand it to
//! an external engine with [`solve`].
//!
//! # Example
//!
//! ```rust
//! use chronoforge::prelude::*;
//!
//! let mut model = Model::with_name("two-tasks");
//! let x = model.interval_var().length(10).name("x").build().unwrap();
//! let y = model.interval_var().length(10).name("y").build().unwrap();
//! model.end_before_start(x, y, 0).unwrap();
//! let end = model.end(y).unwrap();
//! model.minimize(end).unwrap();
//!
//! let json = problem_to_json(&model, Some(&Parameters::new().with_time_limit(5.0)), None).unwrap();
//! assert!(json.contains("intervalVar"));
//! ```
//!
//! With the `console` feature, [`solve`] and [`benchmark`] install the
//! colored console logger on first use.

pub use chronoforge_core::{export, wire};

#[cfg(feature = "console")]
pub use chronoforge_console as console;

// Modeling
pub use chronoforge_core::{
    eval, verify, BoolExpr, BoolVar, Constraint, CumulExpr, FloatExpr, FloatVar, IntExpr,
    IntStepFunction, IntVar, IntervalVar, Model, ModelDomains, ModelError, ObjectiveSense,
    ObjectiveValue, SequenceVar, Solution, SolutionValue,
};

// Exports
pub use chronoforge_core::export::to_rust_source;
pub use chronoforge_core::wire::{json_to_problem, problem_to_json, Problem};

// Parameters
pub use chronoforge_config::{
    parse_benchmark_parameters, parse_parameters, BenchmarkParameters, Parameters, ParsedArgs,
    SearchType, WorkerParameters,
};

// Sessions
pub use chronoforge_solver::{
    CommandStatus, EngineLauncher, ProcessLauncher, PropagationResult, SolveResult, Solver,
    SolverError, SolverEvent, SolverHandle,
};

// Benchmarks
pub use chronoforge_benchmark::{
    expand_pattern, BenchmarkError, BenchmarkReport, BenchmarkResult, MarkdownReport, RunOutcome,
};

mod run;
pub use run::{benchmark, benchmark_with_args, propagate, solve, to_text};

pub mod prelude {
    pub use super::{
        BoolExpr, Constraint, CumulExpr, FloatExpr, IntExpr, IntVar, IntervalVar, Model,
        ModelError, SequenceVar, Solution,
    };
    pub use super::{problem_to_json, BenchmarkParameters, Parameters, SearchType};
    pub use super::{SolveResult, Solver, SolverError, SolverEvent};
    pub use super::{benchmark, benchmark_with_args, propagate, solve, to_text};
}
