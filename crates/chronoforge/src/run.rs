//! One-call entry points using the engine executable.

use std::sync::Arc;

use chronoforge_benchmark::{BenchmarkError, BenchmarkResult};
use chronoforge_config::{BenchmarkParameters, Parameters};
use chronoforge_core::{Model, ModelError, Solution, WireError};
use chronoforge_solver::{ProcessLauncher, PropagationResult, SolveResult, Solver, SolverError};

fn init_console() {
    #[cfg(feature = "console")]
    chronoforge_console::init();
}

/// Solves `model` with a fresh session on the engine executable.
///
/// The executable is `parameters.solver`, else `CHRONOFORGE_SOLVER`, else
/// `chronoforge-engine` from `PATH`.
pub async fn solve(
    model: &Model,
    parameters: &Parameters,
    warm_start: Option<&Solution>,
) -> Result<SolveResult, SolverError> {
    init_console();
    Solver::new().solve(model, parameters, warm_start).await
}

/// Runs propagation only and returns the reduced domains.
pub async fn propagate(
    model: &Model,
    parameters: &Parameters,
) -> Result<PropagationResult, SolverError> {
    init_console();
    Solver::new()
        .propagate(model, parameters)
        .await?
        .ok_or_else(|| missing("domains"))
}

/// Returns the engine's text rendering of `model`.
pub async fn to_text(
    model: &Model,
    parameters: &Parameters,
    warm_start: Option<&Solution>,
) -> Result<String, SolverError> {
    init_console();
    Solver::new()
        .to_text(model, parameters, warm_start)
        .await?
        .ok_or_else(|| missing("text"))
}

/// Benchmarks `problem_fn` over `inputs` on the engine executable.
pub async fn benchmark<I, F>(
    problem_fn: F,
    inputs: &[I],
    params: &BenchmarkParameters,
) -> Result<Vec<BenchmarkResult>, BenchmarkError>
where
    F: Fn(&I) -> Result<Model, ModelError>,
{
    init_console();
    chronoforge_benchmark::benchmark(Arc::new(ProcessLauncher::new()), problem_fn, inputs, params)
        .await
}

/// Benchmarks `problem_fn` over `inputs` with parameters read from `args`.
///
/// Returns `Ok(None)` when `args` asked for `--help`.
pub async fn benchmark_with_args<I, F, A, S>(
    problem_fn: F,
    inputs: &[I],
    args: A,
) -> Result<Option<Vec<BenchmarkResult>>, BenchmarkError>
where
    F: Fn(&I) -> Result<Model, ModelError>,
    A: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    init_console();
    chronoforge_benchmark::benchmark_with_args(
        Arc::new(ProcessLauncher::new()),
        problem_fn,
        inputs,
        args,
    )
    .await
}

// A session without error listeners returns Err rather than nothing.
fn missing(what: &str) -> SolverError {
    SolverError::Protocol(WireError::Malformed(format!("engine sent no {what}")))
}
