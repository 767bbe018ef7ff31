//! Tests for the one-call entry points.

use chronoforge::prelude::*;
use chronoforge::{json_to_problem, to_rust_source, BenchmarkError};

const MISSING_ENGINE: &str = "/nonexistent/chronoforge-engine";

fn model() -> Model {
    let mut model = Model::with_name("facade");
    let x = model.interval_var().length(3).name("x").build().unwrap();
    let end = model.end(x).unwrap();
    model.minimize(end).unwrap();
    model
}

#[tokio::test]
async fn test_solve_without_engine_is_a_transport_error() {
    let params = Parameters::new().with_solver(MISSING_ENGINE);
    let err = solve(&model(), &params, None).await.unwrap_err();

    assert!(matches!(err, SolverError::Transport(ref m) if m.contains(MISSING_ENGINE)));
}

#[tokio::test]
async fn test_propagate_without_engine() {
    let params = Parameters::new().with_solver(MISSING_ENGINE);
    let err = propagate(&model(), &params).await.unwrap_err();

    assert!(matches!(err, SolverError::Transport(_)));
}

#[tokio::test]
async fn test_benchmark_without_inputs() {
    let inputs: [u32; 0] = [];
    let err = benchmark(|_: &u32| Ok(model()), &inputs, &BenchmarkParameters::default())
        .await
        .unwrap_err();

    assert!(matches!(err, BenchmarkError::Usage(_)));
}

#[tokio::test]
async fn test_benchmark_flags_fail_before_the_engine() {
    let err = benchmark_with_args(|_: &u32| Ok(model()), &[1], ["--solver", MISSING_ENGINE, "--bogus"])
        .await
        .unwrap_err();
    assert!(matches!(err, BenchmarkError::Config(_)));

    let help = benchmark_with_args(|_: &u32| Ok(model()), &[1], ["--help"])
        .await
        .unwrap();
    assert!(help.is_none());
}

#[test]
fn test_exports_through_the_facade() {
    let model = model();
    let json = problem_to_json::<Parameters>(&model, None, None).unwrap();
    let problem = json_to_problem::<Parameters>(&json).unwrap();

    assert_eq!(problem.model.name(), Some("facade"));
    assert!(to_rust_source(&model).contains("interval_var()"));
}
