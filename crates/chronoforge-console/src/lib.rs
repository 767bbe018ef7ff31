//! Colorful console output for solver sessions and benchmarks.
//!
//! Provides a `tracing` layer that renders the structured `event` fields
//! logged by `chronoforge-solver` and `chronoforge-benchmark`.
//!
//! ## Log Levels
//!
//! - **INFO**: lifecycle events (solve and run start/end, solutions, bounds)
//! - **WARN**/**ERROR**: failed runs and engine errors
//! - **DEBUG**: transport detail, not rendered here

use num_format::{Locale, ToFormattedString};
use owo_colors::OwoColorize;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Instant;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

#[cfg(test)]
mod tests;

static INIT: OnceLock<()> = OnceLock::new();
static EPOCH: OnceLock<Instant> = OnceLock::new();
static START_NANOS: AtomicU64 = AtomicU64::new(0);
static IN_BENCHMARK: AtomicBool = AtomicBool::new(false);

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "chronoforge_solver=info,chronoforge_benchmark=info";

const TARGETS: [&str; 3] = ["chronoforge_solver", "chronoforge_benchmark", "chronoforge::"];

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initializes console output.
///
/// Safe to call multiple times - only the first call has effect. Prints the
/// banner and installs a subscriber filtered by `RUST_LOG`, or by
/// [`DEFAULT_FILTER`] when it is unset.
pub fn init() {
    INIT.get_or_init(|| {
        print_banner();

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(ConsoleLayer)
            .try_init();
    });
}

fn mark_start() {
    let epoch = EPOCH.get_or_init(Instant::now);
    START_NANOS.store(epoch.elapsed().as_nanos() as u64, Ordering::Relaxed);
}

// Seconds since the last solve or benchmark start.
fn elapsed_secs() -> f64 {
    let Some(epoch) = EPOCH.get() else {
        return 0.0;
    };
    let start = START_NANOS.load(Ordering::Relaxed);
    let now = epoch.elapsed().as_nanos() as u64;
    now.saturating_sub(start) as f64 / 1_000_000_000.0
}

fn print_banner() {
    let title = format!("ChronoForge v{VERSION}");
    let rule = "─".repeat(title.len() + 4);

    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{}", format!("┌{rule}┐").bright_cyan());
    let _ = writeln!(
        stdout,
        "{}  {}  {}",
        "│".bright_cyan(),
        title.bright_white().bold(),
        "│".bright_cyan()
    );
    let _ = writeln!(stdout, "{}", format!("└{rule}┘").bright_cyan());
    let _ = stdout.flush();
}

/// A tracing layer that formats session and benchmark events with colors.
pub struct ConsoleLayer;

impl<S: Subscriber> Layer<S> for ConsoleLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let target = metadata.target();
        if !TARGETS.iter().any(|t| target.starts_with(t)) {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let output = format_event(&visitor, *metadata.level());
        if !output.is_empty() {
            let _ = writeln!(io::stdout(), "{output}");
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct EventVisitor {
    pub(crate) event: Option<String>,
    pub(crate) message: Option<String>,
    pub(crate) command: Option<String>,
    pub(crate) model: Option<String>,
    pub(crate) reason: Option<String>,
    pub(crate) error: Option<String>,
    pub(crate) failed: Option<bool>,
    pub(crate) solve_time: Option<f64>,
    pub(crate) duration: Option<f64>,
    pub(crate) value: Option<f64>,
    pub(crate) objective: Option<f64>,
    pub(crate) lower_bound: Option<f64>,
    pub(crate) time_limit: Option<f64>,
    pub(crate) valid: Option<bool>,
    pub(crate) proof: Option<bool>,
    pub(crate) infeasible: Option<bool>,
    pub(crate) seed: Option<u64>,
    pub(crate) bytes: Option<u64>,
    pub(crate) nb_workers: Option<u64>,
    pub(crate) nb_solutions: Option<u64>,
    pub(crate) nb_inputs: Option<u64>,
    pub(crate) nb_seeds: Option<u64>,
    pub(crate) nb_parallel_runs: Option<u64>,
    pub(crate) nb_runs: Option<u64>,
    pub(crate) nb_errors: Option<u64>,
}

/// Reads `Some(x)` / `None` as written by `?option`.
fn parse_option<T: std::str::FromStr>(text: &str) -> Option<T> {
    text.strip_prefix("Some(")
        .and_then(|t| t.strip_suffix(')'))
        .unwrap_or(text)
        .parse()
        .ok()
}

impl Visit for EventVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let text = format!("{value:?}");
        match field.name() {
            "objective" => self.objective = parse_option(&text),
            "lower_bound" => self.lower_bound = parse_option(&text),
            "time_limit" => self.time_limit = parse_option(&text),
            "duration" => self.duration = parse_option(&text),
            "nb_workers" => self.nb_workers = parse_option(&text),
            "seed" => self.seed = parse_option(&text),
            "valid" => self.valid = parse_option(&text),
            _ => self.record_str(field, text.trim_matches('"')),
        }
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        match field.name() {
            "solve_time" => self.solve_time = Some(value),
            "duration" => self.duration = Some(value),
            "value" => self.value = Some(value),
            "objective" => self.objective = Some(value),
            "lower_bound" => self.lower_bound = Some(value),
            "time_limit" => self.time_limit = Some(value),
            _ => {}
        }
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        match field.name() {
            "seed" => self.seed = Some(value),
            "bytes" => self.bytes = Some(value),
            "nb_workers" => self.nb_workers = Some(value),
            "nb_solutions" => self.nb_solutions = Some(value),
            "nb_inputs" => self.nb_inputs = Some(value),
            "nb_seeds" => self.nb_seeds = Some(value),
            "nb_parallel_runs" => self.nb_parallel_runs = Some(value),
            "nb_runs" => self.nb_runs = Some(value),
            "nb_errors" => self.nb_errors = Some(value),
            _ => {}
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_u64(field, value.max(0) as u64);
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        match field.name() {
            "valid" => self.valid = Some(value),
            "proof" => self.proof = Some(value),
            "infeasible" => self.infeasible = Some(value),
            "error" => self.failed = Some(value),
            _ => {}
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        let value = Some(value.to_string());
        match field.name() {
            "event" => self.event = value,
            "message" => self.message = value,
            "command" => self.command = value,
            "model" => self.model = value,
            "reason" => self.reason = value,
            "error" => self.error = value,
            _ => {}
        }
    }
}

pub(crate) fn format_event(v: &EventVisitor, level: Level) -> String {
    match v.event.as_deref().unwrap_or("") {
        "solve_start" => format_solve_start(v),
        "solution" => format_solution(v),
        "lower_bound" => format_lower_bound(v),
        "solve_end" => format_solve_end(v),
        "engine_error" => format_engine_error(v),
        "stop_requested" => format_stop(v),
        "benchmark_start" => format_benchmark_start(v),
        "run_start" => format_run_start(v),
        "run_end" => format_run_end(v),
        "benchmark_end" => format_benchmark_end(v),
        "" if level <= Level::WARN => format_warning(v, level),
        _ => String::new(),
    }
}

fn format_elapsed() -> String {
    format!("{:>7.3}s", elapsed_secs()).bright_black().to_string()
}

fn format_solve_start(v: &EventVisitor) -> String {
    if !IN_BENCHMARK.load(Ordering::Relaxed) {
        mark_start();
    }
    let command = v.command.as_deref().unwrap_or("solve");
    let model = v.model.as_deref().unwrap_or("<unnamed>");

    let mut output = format!(
        "{} {} {} {}",
        format_elapsed(),
        "▶".bright_green().bold(),
        capitalize(command),
        model.white().bold(),
    );
    if let Some(limit) = v.time_limit {
        output.push_str(&format!(" │ {} limit", format_duration(limit).bright_yellow()));
    }
    if let Some(workers) = v.nb_workers.filter(|&n| n > 0) {
        output.push_str(&format!(
            " │ {} workers",
            workers.to_formatted_string(&Locale::en).bright_yellow()
        ));
    }
    output
}

fn format_solution(v: &EventVisitor) -> String {
    let mut output = format!(
        "{} {} Solution │ objective {} │ at {}",
        format_elapsed(),
        "★".bright_yellow(),
        format_objective(v.objective),
        format_duration(v.solve_time.unwrap_or(0.0)).yellow(),
    );
    if v.valid == Some(true) {
        output.push_str(&format!(" │ {}", "verified".bright_green()));
    }
    output
}

fn format_lower_bound(v: &EventVisitor) -> String {
    format!(
        "{} {} Lower bound │ {} │ at {}",
        format_elapsed(),
        "↓".bright_blue(),
        format_number(v.value.unwrap_or(0.0)).bright_blue(),
        format_duration(v.solve_time.unwrap_or(0.0)).yellow(),
    )
}

fn format_solve_end(v: &EventVisitor) -> String {
    let duration = format_duration(v.duration.unwrap_or(0.0)).yellow().to_string();
    let head = format!("{} {}", format_elapsed(), "■".bright_cyan().bold());

    if let Some(infeasible) = v.infeasible {
        let status = if infeasible {
            "INFEASIBLE".bright_red().bold().to_string()
        } else {
            "PROPAGATED".bright_green().bold().to_string()
        };
        return format!("{head} Propagation complete │ {duration} │ {status}");
    }
    if let Some(bytes) = v.bytes {
        return format!(
            "{head} Text export complete │ {} bytes",
            bytes.to_formatted_string(&Locale::en).bright_yellow()
        );
    }

    let nb_solutions = v.nb_solutions.unwrap_or(0);
    let status = match (nb_solutions > 0, v.proof == Some(true)) {
        (true, true) => "OPTIMAL".bright_green().bold().to_string(),
        (true, false) => "FEASIBLE".bright_green().bold().to_string(),
        (false, true) => "INFEASIBLE".bright_red().bold().to_string(),
        (false, false) => "NO SOLUTION".yellow().bold().to_string(),
    };
    let mut output = format!(
        "{head} Solve complete │ {} solutions │ objective {}",
        nb_solutions
            .to_formatted_string(&Locale::en)
            .bright_magenta()
            .bold(),
        format_objective(v.objective),
    );
    if let Some(bound) = v.lower_bound {
        output.push_str(&format!(" │ bound {}", format_number(bound).bright_blue()));
    }
    output.push_str(&format!(" │ {duration} │ {status}"));
    output
}

fn format_engine_error(v: &EventVisitor) -> String {
    format!(
        "{} {} {} failed │ {}",
        format_elapsed(),
        "✗".bright_red().bold(),
        capitalize(v.command.as_deref().unwrap_or("solve")),
        v.error.as_deref().unwrap_or("unknown error").bright_red(),
    )
}

fn format_stop(v: &EventVisitor) -> String {
    format!(
        "{} {} Stop requested │ {}",
        format_elapsed(),
        "■".yellow(),
        v.reason.as_deref().unwrap_or(""),
    )
}

fn format_benchmark_start(v: &EventVisitor) -> String {
    mark_start();
    IN_BENCHMARK.store(true, Ordering::Relaxed);
    format!(
        "{} {} Benchmark │ {} inputs × {} seeds │ {} in parallel",
        format_elapsed(),
        "▶".bright_green().bold(),
        v.nb_inputs.unwrap_or(0).to_formatted_string(&Locale::en).bright_yellow(),
        v.nb_seeds.unwrap_or(1).to_formatted_string(&Locale::en).bright_yellow(),
        v.nb_parallel_runs
            .unwrap_or(1)
            .to_formatted_string(&Locale::en)
            .bright_yellow(),
    )
}

fn format_run_start(v: &EventVisitor) -> String {
    format!(
        "{} {} Run {} started",
        format_elapsed(),
        "▷".bright_blue(),
        v.model.as_deref().unwrap_or("?").white().bold(),
    )
}

fn format_run_end(v: &EventVisitor) -> String {
    let model = v.model.as_deref().unwrap_or("?").white().bold().to_string();
    if v.failed == Some(true) {
        return format!(
            "{} {} Run {model} {}",
            format_elapsed(),
            "◁".bright_red(),
            "FAILED".bright_red().bold(),
        );
    }
    format!(
        "{} {} Run {model} │ objective {} │ {}",
        format_elapsed(),
        "◁".bright_blue(),
        format_objective(v.objective),
        v.duration
            .map_or_else(|| "N/A".to_string(), format_duration)
            .yellow(),
    )
}

fn format_benchmark_end(v: &EventVisitor) -> String {
    IN_BENCHMARK.store(false, Ordering::Relaxed);
    let errors = v.nb_errors.unwrap_or(0);
    let errors_text = errors.to_formatted_string(&Locale::en);
    format!(
        "{} {} Benchmark complete │ {} runs │ {} errors",
        format_elapsed(),
        "■".bright_cyan().bold(),
        v.nb_runs.unwrap_or(0).to_formatted_string(&Locale::en).bright_magenta(),
        if errors > 0 {
            errors_text.bright_red().to_string()
        } else {
            errors_text.bright_green().to_string()
        },
    )
}

fn format_warning(v: &EventVisitor, level: Level) -> String {
    let Some(message) = v.message.as_deref() else {
        return String::new();
    };
    let icon = if level == Level::ERROR {
        "✗".bright_red().bold().to_string()
    } else {
        "⚠".yellow().bold().to_string()
    };
    let mut output = format!("{} {icon} {message}", format_elapsed());
    if let Some(model) = &v.model {
        output.push_str(&format!(" │ {model}"));
    }
    if let Some(error) = &v.error {
        output.push_str(&format!(" │ {}", error.bright_red()));
    }
    output
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn format_objective(objective: Option<f64>) -> String {
    match objective {
        Some(v) => format_number(v).bright_green().bold().to_string(),
        None => "N/A".bright_black().to_string(),
    }
}

/// Integers with thousands separators, other values as is.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        (value as i64).to_formatted_string(&Locale::en)
    } else {
        format!("{value}")
    }
}

fn format_duration(secs: f64) -> String {
    if secs < 1.0 {
        format!("{}ms", (secs * 1000.0).round() as u64)
    } else if secs < 60.0 {
        format!("{secs:.2}s")
    } else {
        let total = secs as u64;
        format!("{}m {}s", total / 60, total % 60)
    }
}
