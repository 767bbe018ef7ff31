//! Report generation for benchmark results.

use std::fmt::{self, Write};
use std::path::Path;
use std::{fs, io};

use chronoforge_core::ObjectiveSense;

use crate::result::BenchmarkResult;

/// Aggregates over the runs of one model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelStats {
    pub model_name: String,
    pub runs: usize,
    pub errors: usize,
    /// Best objective over the runs, in the model's objective sense.
    pub best_objective: Option<f64>,
    /// Best lower bound over the runs.
    pub best_lower_bound: Option<f64>,
    /// Average solve time in seconds over the runs that finished.
    pub avg_duration: Option<f64>,
}

impl ModelStats {
    fn new(model_name: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            runs: 0,
            errors: 0,
            best_objective: None,
            best_lower_bound: None,
            avg_duration: None,
        }
    }
}

/// CSV export and aggregation of benchmark results.
///
/// # Example
///
/// ```
/// use chronoforge_benchmark::BenchmarkReport;
///
/// let csv = BenchmarkReport::to_csv(&[]);
/// assert!(csv.starts_with("model,seed,status,objective"));
/// ```
pub struct BenchmarkReport;

impl BenchmarkReport {
    /// Per-model aggregates, in order of first appearance.
    ///
    /// Objectives are minimized unless a run's summary says the model
    /// maximizes.
    pub fn aggregate(results: &[BenchmarkResult]) -> Vec<ModelStats> {
        let mut stats: Vec<ModelStats> = Vec::new();
        let mut durations: Vec<Vec<f64>> = Vec::new();

        for result in results {
            let index = match stats.iter().position(|s| s.model_name == result.model_name) {
                Some(index) => index,
                None => {
                    stats.push(ModelStats::new(&result.model_name));
                    durations.push(Vec::new());
                    stats.len() - 1
                }
            };
            let entry = &mut stats[index];
            entry.runs += 1;
            if result.is_error() {
                entry.errors += 1;
                continue;
            }

            let maximize = result
                .solve_result()
                .and_then(|r| r.summary.as_ref())
                .and_then(|s| s.objective_sense)
                == Some(ObjectiveSense::Maximize);
            if let Some(objective) = result.objective() {
                entry.best_objective = Some(match entry.best_objective {
                    Some(best) if maximize => best.max(objective),
                    Some(best) => best.min(objective),
                    None => objective,
                });
            }
            if let Some(bound) = result.lower_bound() {
                entry.best_lower_bound = Some(match entry.best_lower_bound {
                    Some(best) if maximize => best.min(bound),
                    Some(best) => best.max(bound),
                    None => bound,
                });
            }
            if let Some(duration) = result.duration() {
                durations[index].push(duration);
            }
        }

        for (entry, times) in stats.iter_mut().zip(&durations) {
            if !times.is_empty() {
                entry.avg_duration = Some(times.iter().sum::<f64>() / times.len() as f64);
            }
        }
        stats
    }

    /// One row per run.
    pub fn to_csv(results: &[BenchmarkResult]) -> String {
        let mut output = String::new();
        // Writing into a String cannot fail.
        let _ = Self::write_csv(results, &mut output);
        output
    }

    pub fn write_csv(results: &[BenchmarkResult], out: &mut impl Write) -> fmt::Result {
        writeln!(
            out,
            "model,seed,status,objective,lowerBound,nbSolutions,duration,proof,error"
        )?;
        for result in results {
            let solved = result.solve_result();
            writeln!(
                out,
                "{},{},{},{},{},{},{},{},{}",
                csv_field(&result.model_name),
                opt(result.seed),
                if result.is_error() { "error" } else { "solved" },
                opt(result.objective()),
                opt(result.lower_bound()),
                opt(solved.map(|r| r.nb_solutions())),
                opt(result.duration()),
                opt(solved.map(|r| r.proof())),
                csv_field(result.error().unwrap_or_default()),
            )?;
        }
        Ok(())
    }

    /// Writes the CSV to a file.
    pub fn to_file(results: &[BenchmarkResult], path: impl AsRef<Path>) -> io::Result<()> {
        fs::write(path, Self::to_csv(results))
    }
}

/// Markdown report generator.
///
/// The summary table has one row per model, the details table one row per
/// run.
///
/// # Example
///
/// ```
/// use chronoforge_benchmark::MarkdownReport;
///
/// let md = MarkdownReport::to_string(&[]);
/// assert!(md.contains("# Benchmark"));
/// assert!(md.contains("*No runs completed.*"));
/// ```
pub struct MarkdownReport;

impl MarkdownReport {
    pub fn to_string(results: &[BenchmarkResult]) -> String {
        let mut output = String::new();
        let _ = Self::write(results, &mut output);
        output
    }

    pub fn write(results: &[BenchmarkResult], out: &mut impl Write) -> fmt::Result {
        writeln!(out, "# Benchmark")?;
        writeln!(out)?;
        writeln!(out, "- **Runs**: {}", results.len())?;
        writeln!(
            out,
            "- **Errors**: {}",
            results.iter().filter(|r| r.is_error()).count()
        )?;
        writeln!(out)?;

        writeln!(out, "## Summary")?;
        writeln!(out)?;
        if results.is_empty() {
            writeln!(out, "*No runs completed.*")?;
            return Ok(());
        }
        writeln!(
            out,
            "| Model | Runs | Errors | Best Objective | Best Bound | Avg Time (s) |"
        )?;
        writeln!(
            out,
            "|-------|------|--------|----------------|------------|--------------|"
        )?;
        for stats in BenchmarkReport::aggregate(results) {
            writeln!(
                out,
                "| {} | {} | {} | {} | {} | {} |",
                stats.model_name,
                stats.runs,
                stats.errors,
                na(stats.best_objective),
                na(stats.best_lower_bound),
                stats
                    .avg_duration
                    .map_or_else(|| "N/A".to_string(), |d| format!("{d:.2}")),
            )?;
        }
        writeln!(out)?;

        writeln!(out, "## Run Details")?;
        writeln!(out)?;
        writeln!(out, "| Run | Objective | Solutions | Time (s) | Status |")?;
        writeln!(out, "|-----|-----------|-----------|----------|--------|")?;
        for result in results {
            let solved = result.solve_result();
            let status = match result.error() {
                Some(message) => format!("error: {message}"),
                None if solved.is_some_and(|r| r.proof()) => "optimal".to_string(),
                None => "solved".to_string(),
            };
            writeln!(
                out,
                "| {} | {} | {} | {} | {} |",
                result.run_name(),
                na(result.objective()),
                solved.map_or(0, |r| r.nb_solutions()),
                result
                    .duration()
                    .map_or_else(|| "N/A".to_string(), |d| format!("{d:.2}")),
                status.replace('|', "\\|"),
            )?;
        }
        Ok(())
    }

    /// Writes the Markdown report to a file.
    pub fn to_file(results: &[BenchmarkResult], path: impl AsRef<Path>) -> io::Result<()> {
        fs::write(path, Self::to_string(results))
    }
}

fn opt<T: fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn na(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| v.to_string())
}

/// Quotes a field holding a separator, quote or line break.
fn csv_field(text: &str) -> String {
    if text.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}
