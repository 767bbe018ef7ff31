//! Command-line style flags.
//!
//! Every flag is the camelCase field name with a `--` prefix. Worker fields
//! can be addressed per worker with `--worker2.searchType FDS` or over an
//! inclusive range with `--worker0-3.randomSeed 7`.
//!
//! The flag tables below build a `clap` command. Worker-prefixed flags are
//! rewritten before matching into a hidden `--worker.<field>` flag whose
//! values carry the index range, as in `0-3=7`.

use std::fmt::Display;
use std::str::FromStr;

use clap::builder::NonEmptyStringValueParser;
use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{Arg, ArgAction, ArgMatches, Command};

use crate::benchmark::BenchmarkParameters;
use crate::parameters::{Parameters, WorkerParameters};
use crate::{ConfigError, Result};

const PROGRAM: &str = "chronoforge";
const WORKER_SCOPE: &str = "worker.";
const WORKER_NOTE: &str = "Prefix a worker option with workerN. or workerN-M. to set it for\n\
                           worker N or workers N to M, e.g. --worker0.searchType FDS.";

/// Outcome of a successful parse.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedArgs<T> {
    Parsed(T),
    /// `--help` was given; holds the usage text.
    Help(String),
}

impl<T> ParsedArgs<T> {
    pub fn parsed(self) -> Option<T> {
        match self {
            ParsedArgs::Parsed(v) => Some(v),
            ParsedArgs::Help(_) => None,
        }
    }

    fn map<U>(self, f: impl FnOnce(T) -> U) -> ParsedArgs<U> {
        match self {
            ParsedArgs::Parsed(v) => ParsedArgs::Parsed(f(v)),
            ParsedArgs::Help(text) => ParsedArgs::Help(text),
        }
    }
}

type Apply<T> = fn(&mut T, &str) -> std::result::Result<(), String>;

struct Flag<T> {
    name: &'static str,
    /// `None` for switches, which take an optional `=value`.
    metavar: Option<&'static str>,
    help: &'static str,
    apply: Apply<T>,
}

impl<T> Flag<T> {
    fn new(name: &'static str, metavar: &'static str, help: &'static str, apply: Apply<T>) -> Self {
        Self {
            name,
            metavar: Some(metavar),
            help,
            apply,
        }
    }

    fn switch(name: &'static str, help: &'static str, apply: Apply<T>) -> Self {
        Self {
            name,
            metavar: None,
            help,
            apply,
        }
    }

    fn arg(&self, heading: &'static str) -> Arg {
        let arg = Arg::new(self.name)
            .long(self.name)
            .help(self.help)
            .help_heading(heading);
        match self.metavar {
            Some(metavar) => arg
                .value_name(metavar)
                .num_args(1)
                .allow_hyphen_values(true)
                .value_parser(NonEmptyStringValueParser::new()),
            None => arg
                .value_name("BOOL")
                .num_args(0..=1)
                .require_equals(true)
                .default_missing_value("true")
                .value_parser(["true", "false"]),
        }
    }

    /// Hidden flag collecting `lo-hi=value` entries for a worker field.
    fn scoped_arg(&self) -> Arg {
        let id = scoped_id(self.name);
        Arg::new(id.clone())
            .long(id)
            .hide(true)
            .num_args(1)
            .allow_hyphen_values(true)
            .action(ArgAction::Append)
            .value_parser(NonEmptyStringValueParser::new())
    }

    /// Applies the value matched for this flag, if any.
    fn apply_match(&self, matches: &ArgMatches, target: &mut T) -> Result<()> {
        let Some(value) = matches.get_one::<String>(self.name) else {
            return Ok(());
        };
        (self.apply)(target, value).map_err(|reason| ConfigError::InvalidValue {
            flag: format!("--{}", self.name),
            value: value.clone(),
            reason,
        })
    }
}

fn scoped_id(field: &str) -> String {
    format!("{WORKER_SCOPE}{field}")
}

fn set<V>(slot: &mut Option<V>, value: &str) -> std::result::Result<(), String>
where
    V: FromStr,
    V::Err: Display,
{
    *slot = Some(value.parse::<V>().map_err(|e| e.to_string())?);
    Ok(())
}

fn global_flags() -> Vec<Flag<Parameters>> {
    type F = Flag<Parameters>;
    vec![
        F::new("solver", "PATH", "Engine executable", |p, v| {
            set(&mut p.solver, v)
        }),
        F::new(
            "solverArgs",
            "ARGS",
            "Extra engine arguments, separated by spaces",
            |p, v| {
                p.solver_args = Some(v.split_whitespace().map(String::from).collect());
                Ok(())
            },
        ),
        F::switch("printLog", "Print engine output to stdout", |p, v| {
            set(&mut p.print_log, v)
        }),
        F::new("nbWorkers", "N", "Number of workers, 0 for auto", |p, v| {
            set(&mut p.nb_workers, v)
        }),
        F::new("timeLimit", "SECONDS", "Wall-clock limit", |p, v| {
            set(&mut p.time_limit, v)
        }),
        F::new("solutionLimit", "N", "Stop after N solutions", |p, v| {
            set(&mut p.solution_limit, v)
        }),
        F::new("logLevel", "0..3", "Engine log verbosity", |p, v| {
            set(&mut p.log_level, v)
        }),
        F::new("logPeriod", "SECONDS", "Period of progress lines", |p, v| {
            set(&mut p.log_period, v)
        }),
        F::new("warningLevel", "0..3", "Warning verbosity", |p, v| {
            set(&mut p.warning_level, v)
        }),
        F::new("color", "auto|always|never", "Colored output", |p, v| {
            set(&mut p.color, v)
        }),
        F::switch("verifySolutions", "Check every solution", |p, v| {
            set(&mut p.verify_solutions, v)
        }),
        F::new(
            "absoluteGapTolerance",
            "X",
            "Stop when objective - bound <= X",
            |p, v| set(&mut p.absolute_gap_tolerance, v),
        ),
        F::new(
            "relativeGapTolerance",
            "X",
            "Stop when the relative gap <= X",
            |p, v| set(&mut p.relative_gap_tolerance, v),
        ),
    ]
}

fn worker_flags() -> Vec<Flag<WorkerParameters>> {
    type F = Flag<WorkerParameters>;
    vec![
        F::new(
            "searchType",
            "LNS|FDS|FDSDual|SetTimes|FDSLB",
            "Search strategy",
            |w, v| set(&mut w.search_type, v),
        ),
        F::new("randomSeed", "N", "Random seed", |w, v| {
            set(&mut w.random_seed, v)
        }),
        F::new("failLimit", "N", "Maximum number of failures", |w, v| {
            set(&mut w.fail_limit, v)
        }),
        F::new("branchLimit", "N", "Maximum number of branches", |w, v| {
            set(&mut w.branch_limit, v)
        }),
        F::new("lnsStepLimit", "N", "Maximum number of LNS steps", |w, v| {
            set(&mut w.lns_step_limit, v)
        }),
        F::new(
            "noOverlapPropagationLevel",
            "1..4",
            "No-overlap propagation strength",
            |w, v| set(&mut w.no_overlap_propagation_level, v),
        ),
        F::new(
            "cumulPropagationLevel",
            "1..3",
            "Cumulative propagation strength",
            |w, v| set(&mut w.cumul_propagation_level, v),
        ),
    ]
}

fn benchmark_flags() -> Vec<Flag<BenchmarkParameters>> {
    type F = Flag<BenchmarkParameters>;
    vec![
        F::new("nbParallelRuns", "N", "Concurrent runs", |b, v| {
            set(&mut b.nb_parallel_runs, v)
        }),
        F::new("nbSeeds", "N", "Runs per input with distinct seeds", |b, v| {
            set(&mut b.nb_seeds, v)
        }),
        F::new("log", "PATTERN", "Per-run log file", |b, v| {
            set(&mut b.log, v)
        }),
        F::new("result", "PATTERN", "Per-run JSON result", |b, v| {
            set(&mut b.result, v)
        }),
        F::new("exportJSON", "PATTERN", "Per-run problem JSON", |b, v| {
            set(&mut b.export_json, v)
        }),
        F::new("output", "FILE", "All results as one JSON array", |b, v| {
            set(&mut b.output, v)
        }),
        F::new("summary", "FILE", "CSV summary, one row per run", |b, v| {
            set(&mut b.summary, v)
        }),
    ]
}

struct Tables {
    benchmark: Vec<Flag<BenchmarkParameters>>,
    global: Vec<Flag<Parameters>>,
    worker: Vec<Flag<WorkerParameters>>,
}

impl Tables {
    fn new(with_benchmark: bool) -> Self {
        Self {
            benchmark: if with_benchmark {
                benchmark_flags()
            } else {
                Vec::new()
            },
            global: global_flags(),
            worker: worker_flags(),
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(PROGRAM)
            .no_binary_name(true)
            .args_override_self(true)
            .after_help(WORKER_NOTE);
        for flag in &self.benchmark {
            cmd = cmd.arg(flag.arg("Benchmark options"));
        }
        for flag in &self.global {
            cmd = cmd.arg(flag.arg("Solver options"));
        }
        for flag in &self.worker {
            cmd = cmd.arg(flag.arg("Worker defaults")).arg(flag.scoped_arg());
        }
        cmd
    }

    /// What `--name` refers to: `Some(takes_value)` for a flag of the
    /// tables, with the worker range for prefixed worker flags.
    fn lookup(&self, name: &str) -> Option<(Option<(usize, usize)>, bool)> {
        if let Some((lo, hi, field)) = worker_prefix(name) {
            return self
                .worker
                .iter()
                .find(|f| f.name == field)
                .map(|f| (Some((lo, hi)), f.metavar.is_some()));
        }
        let takes_value = |metavar: Option<&str>| metavar.is_some();
        self.benchmark
            .iter()
            .find(|f| f.name == name)
            .map(|f| takes_value(f.metavar))
            .or_else(|| self.global.iter().find(|f| f.name == name).map(|f| takes_value(f.metavar)))
            .or_else(|| self.worker.iter().find(|f| f.name == name).map(|f| takes_value(f.metavar)))
            .map(|takes| (None, takes))
    }

    /// Rewrites worker prefixes and splits off what the tables do not know.
    ///
    /// Unknown `--` flags are an error unless `keep_unknown`, in which case
    /// they come back in the second list together with positional arguments.
    fn prepare(&self, args: Vec<String>, keep_unknown: bool) -> Result<(Vec<String>, Vec<String>)> {
        let mut known = Vec::new();
        let mut unknown = Vec::new();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            if arg == "-h" || arg == "--help" {
                known.push(arg);
                continue;
            }
            let Some(body) = arg.strip_prefix("--") else {
                if keep_unknown {
                    unknown.push(arg);
                } else {
                    known.push(arg);
                }
                continue;
            };
            let (name, inline) = match body.split_once('=') {
                Some((name, value)) => (name, Some(value.to_string())),
                None => (body, None),
            };
            let Some((range, takes_value)) = self.lookup(name) else {
                if keep_unknown {
                    unknown.push(arg);
                    continue;
                }
                return Err(ConfigError::UnknownFlag(arg));
            };
            let value = match (inline, takes_value) {
                (Some(v), _) => Some(v),
                (None, false) => None,
                (None, true) => Some(
                    args.next()
                        .ok_or_else(|| ConfigError::MissingValue(format!("--{name}")))?,
                ),
            };
            match (range, value) {
                (Some((lo, hi)), value) => {
                    let field = name.split_once('.').map_or(name, |(_, f)| f);
                    let value = value.unwrap_or_else(|| "true".to_string());
                    known.push(format!("--{}={lo}-{hi}={value}", scoped_id(field)));
                }
                (None, Some(value)) => known.push(format!("--{name}={value}")),
                (None, None) => known.push(format!("--{name}")),
            }
        }
        Ok((known, unknown))
    }

    fn apply(&self, matches: &ArgMatches) -> Result<BenchmarkParameters> {
        let mut out = BenchmarkParameters::default();
        for flag in &self.benchmark {
            flag.apply_match(matches, &mut out)?;
        }
        for flag in &self.global {
            flag.apply_match(matches, &mut out.parameters)?;
        }
        for flag in &self.worker {
            flag.apply_match(matches, &mut out.parameters.search)?;
        }
        for flag in &self.worker {
            let entries = matches.get_many::<String>(&scoped_id(flag.name));
            for entry in entries.into_iter().flatten() {
                let malformed = || ConfigError::Invalid(format!("bad worker entry {entry:?}"));
                let (range, value) = entry.split_once('=').ok_or_else(malformed)?;
                let (lo, hi) = range.split_once('-').ok_or_else(malformed)?;
                let lo: usize = lo.parse().map_err(|_| malformed())?;
                let hi: usize = hi.parse().map_err(|_| malformed())?;
                for i in lo..=hi {
                    (flag.apply)(out.parameters.worker_mut(i), value).map_err(|reason| {
                        ConfigError::InvalidValue {
                            flag: format!("--worker{range}.{}", flag.name),
                            value: value.to_string(),
                            reason,
                        }
                    })?;
                }
            }
        }
        Ok(out)
    }
}

/// Splits `worker2.searchType` or `worker0-3.searchType` into the index
/// range and the field name.
fn worker_prefix(name: &str) -> Option<(usize, usize, &str)> {
    let rest = name.strip_prefix("worker")?;
    let (range, field) = rest.split_once('.')?;
    let (lo, hi) = match range.split_once('-') {
        Some((lo, hi)) => (lo.parse().ok()?, hi.parse().ok()?),
        None => {
            let i = range.parse().ok()?;
            (i, i)
        }
    };
    (lo <= hi).then_some((lo, hi, field))
}

fn context(err: &clap::Error, kind: ContextKind) -> String {
    match err.get(kind) {
        Some(ContextValue::String(s)) => s.clone(),
        _ => String::new(),
    }
}

fn config_error(err: clap::Error) -> ConfigError {
    match err.kind() {
        ErrorKind::UnknownArgument => ConfigError::UnknownFlag(context(&err, ContextKind::InvalidArg)),
        ErrorKind::InvalidValue => {
            let arg = context(&err, ContextKind::InvalidArg);
            let flag = arg
                .split(|c: char| c == '[' || c == '=' || c.is_whitespace())
                .next()
                .unwrap_or_default()
                .to_string();
            ConfigError::InvalidValue {
                flag,
                value: context(&err, ContextKind::InvalidValue),
                reason: err.kind().to_string(),
            }
        }
        _ => ConfigError::Invalid(err.to_string()),
    }
}

fn parse_into<I, S>(
    args: I,
    with_benchmark: bool,
    keep_unknown: bool,
) -> Result<ParsedArgs<(BenchmarkParameters, Vec<String>)>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let tables = Tables::new(with_benchmark);
    let args = args.into_iter().map(|a| a.as_ref().to_string()).collect();
    let (known, unknown) = tables.prepare(args, keep_unknown)?;

    let mut cmd = tables.command();
    let matches = match cmd.try_get_matches_from_mut(known) {
        Ok(matches) => matches,
        Err(err) if err.kind() == ErrorKind::DisplayHelp => {
            return Ok(ParsedArgs::Help(cmd.render_help().to_string()));
        }
        Err(err) => return Err(config_error(err)),
    };
    Ok(ParsedArgs::Parsed((tables.apply(&matches)?, unknown)))
}

/// Parses solve flags. Any unknown argument is an error.
pub fn parse_parameters<I, S>(args: I) -> Result<ParsedArgs<Parameters>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Ok(parse_into(args, false, false)?.map(|(b, _)| b.parameters))
}

/// Parses solve flags and hands back every argument it does not recognize,
/// in order.
pub fn parse_known_parameters<I, S>(args: I) -> Result<ParsedArgs<(Parameters, Vec<String>)>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Ok(parse_into(args, false, true)?.map(|(b, rest)| (b.parameters, rest)))
}

/// Parses solve and benchmark flags.
pub fn parse_benchmark_parameters<I, S>(args: I) -> Result<ParsedArgs<BenchmarkParameters>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Ok(parse_into(args, true, false)?.map(|(b, _)| b))
}

/// Usage text listing every flag.
pub fn usage(with_benchmark: bool) -> String {
    Tables::new(with_benchmark)
        .command()
        .render_help()
        .to_string()
}
