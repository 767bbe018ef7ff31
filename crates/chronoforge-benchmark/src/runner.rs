//! Benchmark runner.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use chronoforge_config::{parse_benchmark_parameters, BenchmarkParameters, Parameters, ParsedArgs};
use chronoforge_core::wire::problem_to_json;
use chronoforge_core::{Model, ModelError};
use chronoforge_solver::{EngineLauncher, Solver};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::error::{BenchmarkError, Result};
use crate::pattern::{expand_pattern, has_placeholder};
use crate::report::BenchmarkReport;
use crate::result::{run_name, BenchmarkResult, RunOutcome};

/// A run ready to be spawned.
struct Run {
    /// Index of the result in the output.
    slot: usize,
    model: Model,
    model_name: String,
    seed: Option<u64>,
    parameters: Parameters,
    log: Option<String>,
    result: Option<String>,
    export_json: Option<String>,
}

/// Runs one solve per input and seed, at most `nb_parallel_runs` at a time.
///
/// `problem_fn` builds a fresh model for each run. Results come back in
/// input order, the seeds of one input next to each other, whatever order
/// the runs finished in. A run that fails is recorded as
/// [`RunOutcome::Error`]; the benchmark itself fails only on usage errors,
/// a model that cannot be built, or a side output that cannot be written.
///
/// With `nb_seeds = n > 1`, run `k` of an input sets `randomSeed` to `k + 1`
/// and is named `{model}-seed{k+1}` in output files.
pub async fn benchmark<I, F>(
    launcher: Arc<dyn EngineLauncher>,
    problem_fn: F,
    inputs: &[I],
    params: &BenchmarkParameters,
) -> Result<Vec<BenchmarkResult>>
where
    F: Fn(&I) -> std::result::Result<Model, ModelError>,
{
    if let Some(message) = usage_error(inputs.len(), params) {
        error!(error = %message, "invalid benchmark");
        return Err(BenchmarkError::Usage(message));
    }
    let nb_seeds = params.seeds() as usize;
    let nb_parallel_runs = params.parallel_runs() as usize;

    info!(
        event = "benchmark_start",
        nb_inputs = inputs.len(),
        nb_seeds,
        nb_parallel_runs,
    );

    let mut queue: VecDeque<(usize, usize)> = (0..inputs.len())
        .flat_map(|input| (0..nb_seeds).map(move |seed| (input, seed)))
        .collect();
    let mut slots: Vec<Option<BenchmarkResult>> = (0..queue.len()).map(|_| None).collect();
    let mut running = JoinSet::new();

    loop {
        while running.len() < nb_parallel_runs {
            let Some((index, seed_index)) = queue.pop_front() else {
                break;
            };
            let run = prepare(&problem_fn, &inputs[index], index, seed_index, nb_seeds, params)?;
            running.spawn(execute(Arc::clone(&launcher), run));
        }
        let Some(joined) = running.join_next().await else {
            break;
        };
        let (slot, result) = joined??;
        if let Some(entry) = slots.get_mut(slot) {
            *entry = Some(result);
        }
    }
    let results: Vec<BenchmarkResult> = slots.into_iter().flatten().collect();

    if let Some(path) = &params.output {
        write_file(path, serde_json::to_string_pretty(&results)?).await?;
    }
    if let Some(path) = &params.summary {
        write_file(path, BenchmarkReport::to_csv(&results)).await?;
    }

    info!(
        event = "benchmark_end",
        nb_runs = results.len(),
        nb_errors = results.iter().filter(|r| r.is_error()).count(),
    );
    Ok(results)
}

/// Like [`benchmark`], with the parameters read from command-line flags.
///
/// Returns `Ok(None)` after printing the usage when `--help` is among
/// `args`. Unknown or malformed flags end the benchmark before any run.
pub async fn benchmark_with_args<I, F, A, S>(
    launcher: Arc<dyn EngineLauncher>,
    problem_fn: F,
    inputs: &[I],
    args: A,
) -> Result<Option<Vec<BenchmarkResult>>>
where
    F: Fn(&I) -> std::result::Result<Model, ModelError>,
    A: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let params = match parse_benchmark_parameters(args) {
        Ok(ParsedArgs::Parsed(params)) => params,
        Ok(ParsedArgs::Help(text)) => {
            println!("{text}");
            return Ok(None);
        }
        Err(err) => {
            error!(error = %err, "invalid benchmark flags");
            return Err(err.into());
        }
    };
    benchmark(launcher, problem_fn, inputs, &params).await.map(Some)
}

fn usage_error(nb_inputs: usize, params: &BenchmarkParameters) -> Option<String> {
    if nb_inputs == 0 {
        return Some("no inputs to benchmark".into());
    }
    if params.parallel_runs() == 0 {
        return Some("nbParallelRuns must be at least 1".into());
    }
    if params.seeds() == 0 {
        return Some("nbSeeds must be at least 1".into());
    }
    if nb_inputs * params.seeds() as usize > 1 {
        let per_run = [
            ("log", &params.log),
            ("result", &params.result),
            ("exportJSON", &params.export_json),
        ];
        for (flag, pattern) in per_run {
            if let Some(pattern) = pattern {
                if !has_placeholder(pattern) {
                    return Some(format!(
                        "--{flag} {pattern:?} would be overwritten by every run; \
                         use {{name}}, {{flat_name}} or {{seed}}"
                    ));
                }
            }
        }
    }
    None
}

fn prepare<I, F>(
    problem_fn: &F,
    input: &I,
    index: usize,
    seed_index: usize,
    nb_seeds: usize,
    params: &BenchmarkParameters,
) -> Result<Run>
where
    F: Fn(&I) -> std::result::Result<Model, ModelError>,
{
    let model = problem_fn(input)?;
    let model_name = model
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("model{}", index + 1));

    let seed = (nb_seeds > 1).then_some(seed_index as u64 + 1);
    let mut parameters = params.parameters.clone();
    if let Some(seed) = seed {
        parameters = parameters.with_random_seed(seed);
    }

    let name = run_name(&model_name, seed);
    let expand = |pattern: &Option<String>| {
        pattern
            .as_deref()
            .map(|p| expand_pattern(p, &name, seed))
    };
    Ok(Run {
        slot: index * nb_seeds + seed_index,
        log: expand(&params.log),
        result: expand(&params.result),
        export_json: expand(&params.export_json),
        model,
        model_name,
        seed,
        parameters,
    })
}

async fn execute(
    launcher: Arc<dyn EngineLauncher>,
    run: Run,
) -> Result<(usize, BenchmarkResult)> {
    let name = run_name(&run.model_name, run.seed);
    let timestamp = Utc::now();
    info!(event = "run_start", model = %name, seed = ?run.seed);

    if let Some(path) = &run.export_json {
        let json = problem_to_json(&run.model, Some(&run.parameters), None)?;
        write_file(path, json).await?;
    }

    let mut solver = Solver::with_launcher(launcher);
    if let Some(path) = &run.log {
        solver.set_output(create_file(path).await?);
    }
    let outcome = match solver.solve(&run.model, &run.parameters, None).await {
        Ok(result) => RunOutcome::Solved(result),
        Err(e) => {
            warn!(model = %name, error = %e, "run failed");
            RunOutcome::Error(e.to_string())
        }
    };

    let result = BenchmarkResult {
        model_name: run.model_name,
        timestamp,
        parameters: run.parameters,
        seed: run.seed,
        outcome,
    };
    info!(
        event = "run_end",
        model = %name,
        objective = ?result.objective(),
        duration = ?result.duration(),
        error = result.is_error(),
    );

    if let Some(path) = &run.result {
        write_file(path, serde_json::to_string_pretty(&result)?).await?;
    }
    Ok((run.slot, result))
}

fn output_error(path: &str, source: std::io::Error) -> BenchmarkError {
    BenchmarkError::Output {
        path: path.to_string(),
        source,
    }
}

async fn create_parent(path: &str) -> Result<()> {
    match Path::new(path).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| output_error(path, e)),
        _ => Ok(()),
    }
}

async fn create_file(path: &str) -> Result<tokio::fs::File> {
    create_parent(path).await?;
    tokio::fs::File::create(path)
        .await
        .map_err(|e| output_error(path, e))
}

async fn write_file(path: &str, contents: String) -> Result<()> {
    create_parent(path).await?;
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| output_error(path, e))
}
