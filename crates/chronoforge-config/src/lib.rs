//! Parameters for ChronoForge solves and benchmarks.
//!
//! Every field is optional: an unset field is left to the engine's default.
//! Parameters can be written in code, loaded from TOML, YAML or JSON files,
//! or parsed from command-line style flags.
//!
//! # Examples
//!
//! Load parameters from a TOML string:
//!
//! ```
//! use chronoforge_config::{Parameters, SearchType};
//!
//! let params = Parameters::from_toml_str(r#"
//!     timeLimit = 30
//!     searchType = "LNS"
//!
//!     [[workers]]
//!     searchType = "FDS"
//! "#).unwrap();
//!
//! assert_eq!(params.time_limit, Some(30.0));
//! assert_eq!(params.worker(0).search_type, Some(SearchType::Fds));
//! assert_eq!(params.worker(1).search_type, Some(SearchType::Lns));
//! ```
//!
//! Parse flags:
//!
//! ```
//! use chronoforge_config::{parse_parameters, ParsedArgs};
//!
//! let args = ["--timeLimit", "10", "--worker0-1.randomSeed", "5"];
//! let ParsedArgs::Parsed(params) = parse_parameters(args).unwrap() else {
//!     unreachable!()
//! };
//! assert_eq!(params.worker(1).random_seed, Some(5));
//! ```

mod args;
mod benchmark;
mod parameters;


use std::path::Path;

use serde::de::DeserializeOwned;
use thiserror::Error;

pub use args::{
    parse_benchmark_parameters, parse_known_parameters, parse_parameters, usage, ParsedArgs,
};
pub use benchmark::BenchmarkParameters;
pub use parameters::{ColorMode, Parameters, SearchType, WorkerParameters, NB_WORKERS_ENV};

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown flag: {0}")]
    UnknownFlag(String),

    #[error("flag {0} expects a value")]
    MissingValue(String),

    #[error("invalid value {value:?} for {flag}: {reason}")]
    InvalidValue {
        flag: String,
        value: String,
        reason: String,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

fn read_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => Ok(toml::from_str(&contents)?),
        Some("yaml" | "yml") => Ok(serde_yaml::from_str(&contents)?),
        Some("json") => Ok(serde_json::from_str(&contents)?),
        _ => Err(ConfigError::Invalid(format!(
            "cannot tell the format of {} from its extension",
            path.display()
        ))),
    }
}

macro_rules! file_loaders {
    ($($ty:ty),*) => {$(
        impl $ty {
            /// Loads a TOML, YAML or JSON file, chosen by extension.
            pub fn load(path: impl AsRef<Path>) -> Result<Self> {
                read_file(path.as_ref())
            }

            /// Loads a TOML file.
            pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
                let contents = std::fs::read_to_string(path)?;
                Self::from_toml_str(&contents)
            }

            /// Parses a TOML string.
            pub fn from_toml_str(s: &str) -> Result<Self> {
                Ok(toml::from_str(s)?)
            }

            /// Loads a YAML file.
            pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
                let contents = std::fs::read_to_string(path)?;
                Self::from_yaml_str(&contents)
            }

            /// Parses a YAML string.
            pub fn from_yaml_str(s: &str) -> Result<Self> {
                Ok(serde_yaml::from_str(s)?)
            }
        }
    )*};
}

file_loaders!(Parameters, BenchmarkParameters);
