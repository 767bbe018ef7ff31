//! Attaching to an engine.
//!
//! A session only needs a line-oriented byte stream in each direction. The
//! [`EngineLauncher`] trait hands one out; [`ProcessLauncher`] starts the
//! engine executable, while tests plug in an in-memory duplex stream.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use chronoforge_config::Parameters;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::{Child, Command};
use tracing::debug;

use crate::error::{Result, SolverError};

/// Environment variable naming the engine executable.
pub const SOLVER_ENV: &str = "CHRONOFORGE_SOLVER";

/// Executable looked up on `PATH` when nothing else names the engine.
pub const DEFAULT_SOLVER: &str = "chronoforge-engine";

pub type EngineReader = Box<dyn AsyncRead + Send + Unpin>;
pub type EngineWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Byte streams to and from one engine, plus the process behind them.
pub struct EngineConnection {
    pub reader: EngineReader,
    pub writer: EngineWriter,
    /// Killed when the connection is dropped.
    pub child: Option<Child>,
}

impl EngineConnection {
    pub fn new(
        reader: impl AsyncRead + Send + Unpin + 'static,
        writer: impl AsyncWrite + Send + Unpin + 'static,
    ) -> Self {
        Self {
            reader: Box::new(reader),
            writer: Box::new(writer),
            child: None,
        }
    }
}

impl fmt::Debug for EngineConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConnection")
            .field("pid", &self.child.as_ref().and_then(|c| c.id()))
            .finish_non_exhaustive()
    }
}

pub type LaunchFuture<'a> = Pin<Box<dyn Future<Output = Result<EngineConnection>> + Send + 'a>>;

/// Source of engine connections, one per command.
pub trait EngineLauncher: Send + Sync {
    fn launch<'a>(&'a self, parameters: &'a Parameters) -> LaunchFuture<'a>;
}

/// Starts the engine as a child process talking over stdin and stdout.
///
/// The executable is `Parameters::solver`, else the `CHRONOFORGE_SOLVER`
/// environment variable, else `chronoforge-engine` from `PATH`.
#[derive(Debug, Clone, Default)]
pub struct ProcessLauncher {
    program: Option<String>,
}

impl ProcessLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `program` unless the parameters name another executable.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: Some(program.into()),
        }
    }

    pub fn resolve_program(&self, parameters: &Parameters) -> String {
        parameters
            .solver
            .clone()
            .or_else(|| self.program.clone())
            .or_else(|| std::env::var(SOLVER_ENV).ok().filter(|s| !s.is_empty()))
            .unwrap_or_else(|| DEFAULT_SOLVER.to_string())
    }
}

impl EngineLauncher for ProcessLauncher {
    fn launch<'a>(&'a self, parameters: &'a Parameters) -> LaunchFuture<'a> {
        Box::pin(async move {
            let program = self.resolve_program(parameters);
            let mut command = Command::new(&program);
            command
                .args(parameters.solver_args.iter().flatten())
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::inherit())
                .kill_on_drop(true);

            let mut child = command
                .spawn()
                .map_err(|e| SolverError::Transport(format!("cannot start {program}: {e}")))?;
            debug!(program = %program, pid = ?child.id(), "engine started");

            let stdin = child
                .stdin
                .take()
                .ok_or_else(|| SolverError::Transport("engine stdin is not piped".into()))?;
            let stdout = child
                .stdout
                .take()
                .ok_or_else(|| SolverError::Transport("engine stdout is not piped".into()))?;

            Ok(EngineConnection {
                reader: Box::new(stdout),
                writer: Box::new(stdin),
                child: Some(child),
            })
        })
    }
}
