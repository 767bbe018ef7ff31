//! Benchmark parameters.

use serde::{Deserialize, Serialize};

use crate::parameters::Parameters;

/// Parameters of a benchmark: the solve parameters shared by every run plus
/// the scheduling and output settings.
///
/// The output fields are filename patterns expanded per run with `{name}`,
/// `{seed}` and `{flat_name}`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkParameters {
    /// Maximum number of concurrent runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nb_parallel_runs: Option<u32>,

    /// Runs per input, each with a different random seed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nb_seeds: Option<u32>,

    /// Per-run log file pattern.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,

    /// Per-run JSON result pattern.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,

    /// Per-run problem JSON pattern.
    #[serde(
        rename = "exportJSON",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub export_json: Option<String>,

    /// File receiving every result as one JSON array.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// CSV file with one row per run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(flatten)]
    pub parameters: Parameters,
}

impl BenchmarkParameters {
    pub fn new(parameters: Parameters) -> Self {
        Self {
            parameters,
            ..Self::default()
        }
    }

    pub fn with_parallel_runs(mut self, n: u32) -> Self {
        self.nb_parallel_runs = Some(n);
        self
    }

    pub fn with_seeds(mut self, n: u32) -> Self {
        self.nb_seeds = Some(n);
        self
    }

    /// Concurrency cap; one run at a time when unset.
    pub fn parallel_runs(&self) -> u32 {
        self.nb_parallel_runs.unwrap_or(1)
    }

    pub fn seeds(&self) -> u32 {
        self.nb_seeds.unwrap_or(1)
    }
}
