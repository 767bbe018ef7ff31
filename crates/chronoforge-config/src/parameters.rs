//! Solve parameters sent to the engine.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// Environment variable read when `nb_workers` is unset or `0`.
pub const NB_WORKERS_ENV: &str = "CHRONOFORGE_NB_WORKERS";

/// Search strategy of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum SearchType {
    /// Large neighborhood search.
    #[serde(rename = "LNS")]
    Lns,

    /// Failure-directed search.
    #[serde(rename = "FDS")]
    Fds,

    /// Failure-directed search on the dual problem.
    #[serde(rename = "FDSDual")]
    FdsDual,

    /// Chronological set-times search.
    #[serde(rename = "SetTimes")]
    SetTimes,

    /// Failure-directed search improving the lower bound.
    #[serde(rename = "FDSLB")]
    FdsLb,
}

impl SearchType {
    pub const ALL: [SearchType; 5] = [
        SearchType::Lns,
        SearchType::Fds,
        SearchType::FdsDual,
        SearchType::SetTimes,
        SearchType::FdsLb,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SearchType::Lns => "LNS",
            SearchType::Fds => "FDS",
            SearchType::FdsDual => "FDSDual",
            SearchType::SetTimes => "SetTimes",
            SearchType::FdsLb => "FDSLB",
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| "expected one of LNS, FDS, FDSDual, SetTimes, FDSLB".to_string())
    }
}

/// Colored engine output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

impl FromStr for ColorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(ColorMode::Auto),
            "always" => Ok(ColorMode::Always),
            "never" => Ok(ColorMode::Never),
            _ => Err("expected auto, always or never".into()),
        }
    }
}

/// Parameters that can differ between workers.
///
/// At the top level of [`Parameters`] these are the defaults of every
/// worker; entries of [`Parameters::workers`] override them per worker.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerParameters {
    /// Search strategy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_type: Option<SearchType>,

    /// Seed of the worker's random generator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub random_seed: Option<u64>,

    /// Maximum number of failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_limit: Option<u64>,

    /// Maximum number of branches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_limit: Option<u64>,

    /// Maximum number of LNS steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lns_step_limit: Option<u64>,

    /// Propagation strength of no-overlap constraints (1 to 4).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_overlap_propagation_level: Option<u32>,

    /// Propagation strength of cumulative constraints (1 to 3).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cumul_propagation_level: Option<u32>,

    /// Engine-internal tunables, passed through as written. Their keys
    /// start with `_`; any other unknown key is an error.
    #[serde(flatten, deserialize_with = "internal_tunables")]
    pub internal: BTreeMap<String, serde_json::Value>,
}

fn internal_tunables<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    let map = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
    match map.keys().find(|k| !k.starts_with('_')) {
        Some(key) => Err(D::Error::custom(format!("unknown parameter `{key}`"))),
        None => Ok(map),
    }
}

impl WorkerParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overlays `other` on `self`: every field set in `other` wins.
    pub fn combine(&self, other: &WorkerParameters) -> WorkerParameters {
        let mut out = self.clone();
        macro_rules! overlay {
            ($($field:ident),*) => {$(
                if other.$field.is_some() {
                    out.$field = other.$field.clone();
                }
            )*};
        }
        overlay!(
            search_type,
            random_seed,
            fail_limit,
            branch_limit,
            lns_step_limit,
            no_overlap_propagation_level,
            cumul_propagation_level
        );
        out.internal
            .extend(other.internal.iter().map(|(k, v)| (k.clone(), v.clone())));
        out
    }
}

/// Parameters of one solve.
///
/// `solver`, `solver_args` and `print_log` are read by the client; the
/// rest is forwarded to the engine.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameters {
    /// Path of the engine executable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solver: Option<String>,

    /// Extra command-line arguments for the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solver_args: Option<Vec<String>>,

    /// Print engine output to stdout when no output sink is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub print_log: Option<bool>,

    /// Number of workers; `0` means auto-detect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nb_workers: Option<u32>,

    /// Wall-clock limit in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<f64>,

    /// Stop after this many solutions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution_limit: Option<u64>,

    /// Verbosity of the engine log (0 to 3).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<u32>,

    /// Seconds between periodic log lines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_period: Option<f64>,

    /// Verbosity of warnings (0 to 3).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning_level: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<ColorMode>,

    /// Ask the engine to check every solution it reports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify_solutions: Option<bool>,

    /// Stop when the objective is within this distance of the lower bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub absolute_gap_tolerance: Option<f64>,

    /// Same as `absolute_gap_tolerance`, relative to the objective.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_gap_tolerance: Option<f64>,

    /// Defaults of every worker.
    #[serde(flatten)]
    pub search: WorkerParameters,

    /// Per-worker overrides, by worker index.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub workers: Vec<WorkerParameters>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.time_limit = Some(seconds);
        self
    }

    pub fn with_nb_workers(mut self, nb_workers: u32) -> Self {
        self.nb_workers = Some(nb_workers);
        self
    }

    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.search.random_seed = Some(seed);
        self
    }

    pub fn with_search_type(mut self, search_type: SearchType) -> Self {
        self.search.search_type = Some(search_type);
        self
    }

    pub fn with_solver(mut self, path: impl Into<String>) -> Self {
        self.solver = Some(path.into());
        self
    }

    /// Overlays `other` on `self`. Later values win field by field, and
    /// worker records are overlaid index by index.
    pub fn combine(&self, other: &Parameters) -> Parameters {
        let mut out = self.clone();
        macro_rules! overlay {
            ($($field:ident),*) => {$(
                if other.$field.is_some() {
                    out.$field = other.$field.clone();
                }
            )*};
        }
        overlay!(
            solver,
            solver_args,
            print_log,
            nb_workers,
            time_limit,
            solution_limit,
            log_level,
            log_period,
            warning_level,
            color,
            verify_solutions,
            absolute_gap_tolerance,
            relative_gap_tolerance
        );
        out.search = self.search.combine(&other.search);
        let len = self.workers.len().max(other.workers.len());
        out.workers = (0..len)
            .map(|i| match (self.workers.get(i), other.workers.get(i)) {
                (Some(a), Some(b)) => a.combine(b),
                (Some(a), None) => a.clone(),
                (None, Some(b)) => b.clone(),
                (None, None) => WorkerParameters::default(),
            })
            .collect();
        out
    }

    /// Effective parameters of worker `index`: its override on top of the
    /// global defaults.
    pub fn worker(&self, index: usize) -> WorkerParameters {
        match self.workers.get(index) {
            Some(w) => self.search.combine(w),
            None => self.search.clone(),
        }
    }

    /// Worker record `index`, created empty if missing.
    pub fn worker_mut(&mut self, index: usize) -> &mut WorkerParameters {
        if self.workers.len() <= index {
            self.workers.resize_with(index + 1, WorkerParameters::default);
        }
        &mut self.workers[index]
    }

    /// Worker count: `nb_workers` when positive, else the environment
    /// variable, else the number of available cores.
    pub fn resolved_nb_workers(&self) -> u32 {
        if let Some(n) = self.nb_workers.filter(|n| *n > 0) {
            return n;
        }
        std::env::var(NB_WORKERS_ENV)
            .ok()
            .and_then(|v| v.trim().parse::<u32>().ok())
            .filter(|n| *n > 0)
            .or_else(|| {
                std::thread::available_parallelism()
                    .ok()
                    .and_then(|n| u32::try_from(n.get()).ok())
            })
            .unwrap_or(1)
    }
}
