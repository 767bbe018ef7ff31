//! Tests for console formatting.

use std::sync::{Arc, Mutex};

use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;

use super::*;

/// Drops ANSI color sequences.
fn plain(text: &str) -> String {
    let mut out = String::new();
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\u{1b}' {
            for c in chars.by_ref() {
                if c == 'm' {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Layer that keeps formatted lines instead of printing them.
struct Capture(Arc<Mutex<Vec<String>>>);

impl<S: Subscriber> Layer<S> for Capture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);
        let line = format_event(&visitor, *event.metadata().level());
        self.0.lock().unwrap().push(plain(&line));
    }
}

fn capture(f: impl FnOnce()) -> Vec<String> {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry().with(Capture(Arc::clone(&lines)));
    tracing::subscriber::with_default(subscriber, f);
    let captured = lines.lock().unwrap().clone();
    captured
}

#[test]
fn test_parse_option() {
    assert_eq!(parse_option::<f64>("Some(20.5)"), Some(20.5));
    assert_eq!(parse_option::<f64>("None"), None);
    assert_eq!(parse_option::<u64>("7"), Some(7));
    assert_eq!(parse_option::<bool>("Some(true)"), Some(true));
}

#[test]
fn test_format_duration() {
    assert_eq!(format_duration(0.25), "250ms");
    assert_eq!(format_duration(2.5), "2.50s");
    assert_eq!(format_duration(125.0), "2m 5s");
}

#[test]
fn test_format_number() {
    assert_eq!(format_number(1234567.0), "1,234,567");
    assert_eq!(format_number(2.5), "2.5");
}

mod events {
    use super::*;

    #[test]
    fn test_solve_end_from_tracing_fields() {
        let lines = capture(|| {
            info!(
                event = "solve_end",
                nb_solutions = 3u64,
                objective = ?Some(1234.0),
                lower_bound = ?Some(1200.0),
                duration = 2.5,
                proof = true,
            );
        });

        assert_eq!(lines.len(), 1);
        let line = &lines[0];
        assert!(line.contains("Solve complete"));
        assert!(line.contains("3 solutions"));
        assert!(line.contains("objective 1,234"));
        assert!(line.contains("bound 1,200"));
        assert!(line.contains("2.50s"));
        assert!(line.ends_with("OPTIMAL"));
    }

    #[test]
    fn test_solve_start_and_solution() {
        let lines = capture(|| {
            info!(
                event = "solve_start",
                command = "solve",
                model = "jobshop",
                time_limit = ?Some(60.0),
                nb_workers = ?Some(4u32),
            );
            info!(
                event = "solution",
                solve_time = 0.5,
                objective = ?Some(20.0),
                valid = ?Some(true),
            );
        });

        assert!(lines[0].contains("Solve jobshop"));
        assert!(lines[0].contains("1m 0s limit"));
        assert!(lines[0].contains("4 workers"));
        assert!(lines[1].contains("objective 20"));
        assert!(lines[1].contains("at 500ms"));
        assert!(lines[1].ends_with("verified"));
    }

    #[test]
    fn test_propagation_and_text_end() {
        let lines = capture(|| {
            info!(event = "solve_end", infeasible = true, duration = 0.01);
            info!(event = "solve_end", bytes = 2048u64);
        });

        assert!(lines[0].contains("Propagation complete"));
        assert!(lines[0].ends_with("INFEASIBLE"));
        assert!(lines[1].contains("2,048 bytes"));
    }

    #[test]
    fn test_benchmark_runs() {
        let lines = capture(|| {
            info!(event = "benchmark_start", nb_inputs = 2usize, nb_seeds = 3usize, nb_parallel_runs = 4usize);
            info!(event = "run_end", model = %"ft06-seed1", objective = ?Some(55.0), duration = ?Some(1.5), error = false);
            info!(event = "run_end", model = %"ft06-seed2", objective = ?None::<f64>, duration = ?None::<f64>, error = true);
            info!(event = "benchmark_end", nb_runs = 6usize, nb_errors = 1usize);
        });

        assert!(lines[0].contains("2 inputs × 3 seeds │ 4 in parallel"));
        assert!(lines[1].contains("Run ft06-seed1 │ objective 55 │ 1.50s"));
        assert!(lines[2].ends_with("Run ft06-seed2 FAILED"));
        assert!(lines[3].contains("6 runs │ 1 errors"));
    }

    #[test]
    fn test_engine_error_and_warnings() {
        let lines = capture(|| {
            tracing::error!(event = "engine_error", command = "propagate", error = %"engine error: boom");
            warn!(model = %"ft06", error = %"transport error: closed", "run failed");
            info!("plain info is not rendered");
        });

        assert!(lines[0].contains("Propagate failed │ engine error: boom"));
        assert!(lines[1].contains("run failed │ ft06 │ transport error: closed"));
        assert_eq!(lines[2], "");
    }
}
