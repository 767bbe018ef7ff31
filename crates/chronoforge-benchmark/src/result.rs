//! Benchmark result types.

use chrono::{DateTime, Utc};
use chronoforge_config::Parameters;
use chronoforge_solver::SolveResult;
use serde::Serialize;

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RunOutcome {
    /// The session failed; the message of its error.
    Error(String),
    Solved(SolveResult),
}

/// Result of one benchmark run.
///
/// Serialized with the outcome flattened in, as `"error": "..."` or
/// `"solved": {...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkResult {
    /// Name of the generated model.
    pub model_name: String,
    /// When the run started.
    pub timestamp: DateTime<Utc>,
    /// Parameters the run was solved with, seed included.
    pub parameters: Parameters,
    /// Seed of the run when the benchmark runs several seeds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(flatten)]
    pub outcome: RunOutcome,
}

impl BenchmarkResult {
    /// Model name with the `-seed{n}` suffix used in output file names.
    ///
    /// # Example
    ///
    /// ```
    /// use chrono::Utc;
    /// use chronoforge_benchmark::{BenchmarkResult, RunOutcome};
    /// use chronoforge_config::Parameters;
    ///
    /// let result = BenchmarkResult {
    ///     model_name: "ft06".into(),
    ///     timestamp: Utc::now(),
    ///     parameters: Parameters::new(),
    ///     seed: Some(2),
    ///     outcome: RunOutcome::Error("engine crashed".into()),
    /// };
    /// assert_eq!(result.run_name(), "ft06-seed2");
    /// assert!(result.is_error());
    /// ```
    pub fn run_name(&self) -> String {
        run_name(&self.model_name, self.seed)
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, RunOutcome::Error(_))
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            RunOutcome::Error(message) => Some(message),
            RunOutcome::Solved(_) => None,
        }
    }

    pub fn solve_result(&self) -> Option<&SolveResult> {
        match &self.outcome {
            RunOutcome::Solved(result) => Some(result),
            RunOutcome::Error(_) => None,
        }
    }

    pub fn objective(&self) -> Option<f64> {
        self.solve_result().and_then(SolveResult::objective)
    }

    pub fn lower_bound(&self) -> Option<f64> {
        let result = self.solve_result()?;
        result
            .summary
            .as_ref()
            .and_then(|s| s.lower_bound)
            .or(result.best_lower_bound)
    }

    /// Solve time in seconds, from the engine's summary.
    pub fn duration(&self) -> Option<f64> {
        self.solve_result().and_then(SolveResult::duration)
    }
}

pub(crate) fn run_name(model_name: &str, seed: Option<u64>) -> String {
    match seed {
        Some(seed) => format!("{model_name}-seed{seed}"),
        None => model_name.to_string(),
    }
}
