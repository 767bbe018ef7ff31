//! Benchmark orchestrator for ChronoForge.
//!
//! Runs one solver session per (input, seed) pair under a concurrency cap,
//! collects a [`BenchmarkResult`] for each and writes the optional side
//! outputs named by [`BenchmarkParameters`](chronoforge_config::BenchmarkParameters).
//!
//! # Overview
//!
//! - [`benchmark`] drives the runs and returns results in input order
//! - [`benchmark_with_args`] does the same with parameters read from flags
//! - [`expand_pattern`] turns output patterns into per-run file names
//! - [`BenchmarkReport`] and [`MarkdownReport`] render the results as CSV or
//!   Markdown
//!
//! # Example
//!
//! ```
//! use chronoforge_benchmark::expand_pattern;
//!
//! let path = expand_pattern("logs/{flat_name}-{seed}.log", "jobshop/ft06", Some(3));
//! assert_eq!(path, "logs/jobshop_ft06-3.log");
//! ```
//!
//! Running a benchmark:
//!
//! ```text
//! let params = BenchmarkParameters::new(Parameters::new().with_time_limit(60.0))
//!     .with_parallel_runs(4)
//!     .with_seeds(5);
//! let results = benchmark(launcher, |size| build_model(*size), &[10, 20, 40], &params).await?;
//! println!("{}", MarkdownReport::to_string(&results));
//! ```

mod error;
mod pattern;
mod report;
mod result;
mod runner;


pub use error::{BenchmarkError, Result};
pub use pattern::expand_pattern;
pub use report::{BenchmarkReport, MarkdownReport, ModelStats};
pub use result::{BenchmarkResult, RunOutcome};
pub use runner::{benchmark, benchmark_with_args};
