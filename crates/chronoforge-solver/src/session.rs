//! One-shot solver session.

use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use chronoforge_config::Parameters;
use chronoforge_core::wire::{
    decode_message, propagate_command, solve_command, stop_command, to_text_command,
};
use chronoforge_core::{
    DomainsEvent, EngineMessage, LowerBoundEvent, Model, Solution, SolutionEvent, SolveSummary,
    WireError,
};
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::engine::{EngineConnection, EngineLauncher, EngineWriter, ProcessLauncher};
use crate::error::{Result, SolverError};
use crate::event::{SolverEvent, SolverEventSupport, SubscriptionId};
use crate::handle::{CommandStatus, Outbound, Shared, SolverHandle};
use crate::result::{PropagationResult, SolveResult};

/// Lifecycle of a session. `Finished` and `Errored` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolverState {
    Idle,
    Running,
    Finished,
    Errored,
}

impl SolverState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SolverState::Finished | SolverState::Errored)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommandKind {
    Solve,
    Propagate,
    ToText,
}

impl CommandKind {
    fn name(self) -> &'static str {
        match self {
            CommandKind::Solve => "solve",
            CommandKind::Propagate => "propagate",
            CommandKind::ToText => "toText",
        }
    }

    /// Whether `message` is the terminal event of this command.
    fn ends_with(self, message: &EngineMessage) -> bool {
        matches!(
            (self, message),
            (CommandKind::Solve, EngineMessage::Summary(_))
                | (CommandKind::Propagate, EngineMessage::Domains(_))
                | (CommandKind::ToText, EngineMessage::Text(_))
        )
    }
}

#[derive(Default)]
struct Collected {
    result: SolveResult,
    domains: Option<DomainsEvent>,
    text: Option<String>,
}

/// A session with one engine, running a single command.
///
/// Listeners are registered before the command. While the command runs,
/// [`SolverHandle`]s stop it or inject solutions.
///
/// ```no_run
/// use chronoforge_config::Parameters;
/// use chronoforge_core::Model;
/// use chronoforge_solver::Solver;
///
/// # async fn run(model: Model) -> chronoforge_solver::Result<()> {
/// let mut solver = Solver::new();
/// solver.on_solution(|s| println!("solution at {:.2}s", s.solve_time));
/// let result = solver
///     .solve(&model, &Parameters::new().with_time_limit(10.0), None)
///     .await?;
/// println!("{} solutions", result.nb_solutions());
/// # Ok(())
/// # }
/// ```
pub struct Solver {
    launcher: Arc<dyn EngineLauncher>,
    events: SolverEventSupport,
    state: SolverState,
    shared: Arc<Shared>,
    tx: mpsc::UnboundedSender<Outbound>,
    rx: Option<mpsc::UnboundedReceiver<Outbound>>,
    output: Option<EngineWriter>,
}

impl Default for Solver {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver {
    /// Creates a session that starts the engine executable.
    pub fn new() -> Self {
        Self::with_launcher(Arc::new(ProcessLauncher::new()))
    }

    pub fn with_launcher(launcher: Arc<dyn EngineLauncher>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            launcher,
            events: SolverEventSupport::new(),
            state: SolverState::Idle,
            shared: Arc::new(Shared::default()),
            tx,
            rx: Some(rx),
            output: None,
        }
    }

    /// Tees log, trace and warning text into `sink`, one line at a time.
    pub fn with_output(mut self, sink: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        self.set_output(sink);
        self
    }

    pub fn set_output(&mut self, sink: impl AsyncWrite + Send + Unpin + 'static) {
        self.output = Some(Box::new(sink));
    }

    pub fn state(&self) -> SolverState {
        self.state
    }

    pub fn handle(&self) -> SolverHandle {
        SolverHandle::new(self.tx.clone(), Arc::clone(&self.shared))
    }

    /// Same as `self.handle().stop(reason)`.
    pub fn stop(&self, reason: impl Into<String>) -> CommandStatus {
        self.handle().stop(reason)
    }

    pub fn events(&self) -> &SolverEventSupport {
        &self.events
    }

    // === Channels ===

    pub fn on_log(&mut self, f: impl FnMut(&str) + Send + 'static) -> SubscriptionId {
        self.events.on_log(f)
    }

    pub fn on_trace(&mut self, f: impl FnMut(&str) + Send + 'static) -> SubscriptionId {
        self.events.on_trace(f)
    }

    pub fn on_warning(&mut self, f: impl FnMut(&str) + Send + 'static) -> SubscriptionId {
        self.events.on_warning(f)
    }

    pub fn on_error(&mut self, f: impl FnMut(&SolverError) + Send + 'static) -> SubscriptionId {
        self.events.on_error(f)
    }

    pub fn on_solution(
        &mut self,
        f: impl FnMut(&SolutionEvent) + Send + 'static,
    ) -> SubscriptionId {
        self.events.on_solution(f)
    }

    pub fn on_lower_bound(
        &mut self,
        f: impl FnMut(&LowerBoundEvent) + Send + 'static,
    ) -> SubscriptionId {
        self.events.on_lower_bound(f)
    }

    pub fn on_summary(&mut self, f: impl FnMut(&SolveSummary) + Send + 'static) -> SubscriptionId {
        self.events.on_summary(f)
    }

    pub fn on_close(&mut self, f: impl FnMut() + Send + 'static) -> SubscriptionId {
        self.events.on_close(f)
    }

    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<SolverEvent> {
        self.events.subscribe()
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    // === Commands ===

    /// Solves `model` and resolves once the engine sends its summary.
    pub async fn solve(
        &mut self,
        model: &Model,
        parameters: &Parameters,
        warm_start: Option<&Solution>,
    ) -> Result<SolveResult> {
        let line = solve_command(model, &engine_parameters(parameters), warm_start);
        let collected = self
            .run(CommandKind::Solve, model, parameters, line.map_err(Into::into))
            .await?;
        Ok(collected.result)
    }

    /// Runs propagation only. `None` when an error listener took the
    /// failure.
    pub async fn propagate(
        &mut self,
        model: &Model,
        parameters: &Parameters,
    ) -> Result<Option<PropagationResult>> {
        let line = propagate_command(model, &engine_parameters(parameters));
        let collected = self
            .run(CommandKind::Propagate, model, parameters, line.map_err(Into::into))
            .await?;
        Ok(collected.domains.map(PropagationResult::from))
    }

    /// Asks the engine for its text rendering of the model. `None` when an
    /// error listener took the failure.
    pub async fn to_text(
        &mut self,
        model: &Model,
        parameters: &Parameters,
        warm_start: Option<&Solution>,
    ) -> Result<Option<String>> {
        let line = to_text_command(model, &engine_parameters(parameters), warm_start);
        let collected = self
            .run(CommandKind::ToText, model, parameters, line.map_err(Into::into))
            .await?;
        Ok(collected.text)
    }

    async fn run(
        &mut self,
        kind: CommandKind,
        model: &Model,
        parameters: &Parameters,
        line: Result<String>,
    ) -> Result<Collected> {
        if self.state != SolverState::Idle {
            return Err(SolverError::InvalidState(self.state));
        }
        self.state = SolverState::Running;
        let _ = self.shared.model.set(model.clone());
        self.shared.running.store(true, Ordering::SeqCst);

        info!(
            event = "solve_start",
            command = kind.name(),
            model = model.name().unwrap_or("<unnamed>"),
            time_limit = ?parameters.time_limit,
            nb_workers = ?parameters.nb_workers,
        );

        let mut collected = Collected::default();
        let outcome = match line {
            Ok(line) => self.drive(kind, model, parameters, line, &mut collected).await,
            Err(e) => Err(e),
        };
        self.shared.running.store(false, Ordering::SeqCst);

        let outcome = match outcome {
            Ok(()) => {
                self.state = SolverState::Finished;
                Ok(collected)
            }
            Err(err) => {
                self.state = SolverState::Errored;
                error!(event = "engine_error", command = kind.name(), error = %err);
                self.events.fire_error(&err);
                if self.events.has_error_listeners() {
                    Ok(collected)
                } else {
                    Err(err)
                }
            }
        };
        self.events.fire_close();
        outcome
    }

    async fn drive(
        &mut self,
        kind: CommandKind,
        model: &Model,
        parameters: &Parameters,
        command: String,
        collected: &mut Collected,
    ) -> Result<()> {
        let mut outbound = self
            .rx
            .take()
            .ok_or(SolverError::InvalidState(self.state))?;
        let launcher = Arc::clone(&self.launcher);
        let EngineConnection {
            reader,
            mut writer,
            child,
        } = launcher.launch(parameters).await?;
        // Keeps the process alive until the command ends.
        let _child = child;

        write_line(&mut writer, &command)
            .await
            .map_err(|e| SolverError::Transport(format!("cannot send {}: {e}", kind.name())))?;
        debug!(command = kind.name(), bytes = command.len(), "command sent");

        let print_log = parameters.print_log == Some(true);
        let mut lines = BufReader::new(reader).lines();
        loop {
            tokio::select! {
                next = lines.next_line() => {
                    let Some(line) = next? else {
                        return Err(SolverError::Transport(format!(
                            "engine closed the stream before the {} finished",
                            kind.name()
                        )));
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    let message = decode_message(model, &line).map_err(|source| {
                        SolverError::InvalidMessage {
                            line: line.clone(),
                            source,
                        }
                    })?;
                    let terminal = message.is_terminal();
                    if terminal && !kind.ends_with(&message) {
                        return Err(SolverError::Protocol(WireError::Malformed(format!(
                            "unexpected terminal event for {}: {line}",
                            kind.name()
                        ))));
                    }
                    if self.dispatch(message, collected, print_log).await? {
                        let stop = stop_command("output sink failed")?;
                        if let Err(e) = write_line(&mut writer, &stop).await {
                            warn!(error = %e, "cannot send stop");
                        }
                    }
                    if terminal {
                        return Ok(());
                    }
                }
                Some(command) = outbound.recv() => {
                    let line = match command {
                        Outbound::Stop(reason) => {
                            info!(event = "stop_requested", reason = %reason);
                            stop_command(&reason)?
                        }
                        Outbound::Line(line) => line,
                    };
                    if let Err(e) = write_line(&mut writer, &line).await {
                        warn!(error = %e, "cannot write to engine");
                    }
                }
            }
        }
    }

    /// Routes one message to its channel. Returns `true` when the output
    /// sink failed and the engine should be stopped.
    async fn dispatch(
        &mut self,
        message: EngineMessage,
        collected: &mut Collected,
        print_log: bool,
    ) -> Result<bool> {
        match message {
            EngineMessage::Log(text) => {
                let failed = self.tee(&text, print_log).await;
                self.events.fire_log(&text);
                return Ok(failed);
            }
            EngineMessage::Trace(text) => {
                let failed = self.tee(&text, print_log).await;
                self.events.fire_trace(&text);
                return Ok(failed);
            }
            EngineMessage::Warning(text) => {
                let failed = self.tee(&text, print_log).await;
                self.events.fire_warning(&text);
                return Ok(failed);
            }
            EngineMessage::Error(text) => return Err(SolverError::Engine(text)),
            EngineMessage::Solution(found) => {
                info!(
                    event = "solution",
                    solve_time = found.solve_time,
                    objective = ?found.solution.objective().value(),
                    valid = ?found.valid,
                );
                collected.result.record_solution(&found);
                self.events.fire_solution(&found);
            }
            EngineMessage::LowerBound(bound) => {
                info!(
                    event = "lower_bound",
                    solve_time = bound.solve_time,
                    value = bound.value,
                );
                collected.result.record_lower_bound(&bound);
                self.events.fire_lower_bound(&bound);
            }
            EngineMessage::Summary(summary) => {
                info!(
                    event = "solve_end",
                    nb_solutions = summary.nb_solutions,
                    objective = ?summary.objective,
                    lower_bound = ?summary.lower_bound,
                    duration = summary.duration,
                    proof = summary.proof,
                );
                self.events.fire_summary(&summary);
                collected.result.summary = Some(summary);
            }
            EngineMessage::Domains(domains) => {
                info!(
                    event = "solve_end",
                    infeasible = domains.domains.is_none(),
                    duration = domains.duration,
                );
                collected.domains = Some(domains);
            }
            EngineMessage::Text(text) => {
                info!(event = "solve_end", bytes = text.len());
                collected.text = Some(text);
            }
        }
        Ok(false)
    }

    /// Writes `text` to the output sink, or to stdout when asked to.
    /// Returns `true` if the sink failed; it is dropped afterwards.
    async fn tee(&mut self, text: &str, print_log: bool) -> bool {
        let Some(sink) = self.output.as_mut() else {
            if print_log {
                for line in text.lines() {
                    println!("{line}");
                }
            }
            return false;
        };

        let mut buf = String::with_capacity(text.len() + 1);
        for line in text.lines() {
            buf.push_str(line);
            buf.push('\n');
        }
        if buf.is_empty() {
            buf.push('\n');
        }
        let written = match sink.write_all(buf.as_bytes()).await {
            Ok(()) => sink.flush().await,
            Err(e) => Err(e),
        };
        match written {
            Ok(()) => false,
            Err(e) => {
                warn!(error = %e, "output sink failed, stopping the engine");
                self.output = None;
                true
            }
        }
    }
}

impl fmt::Debug for Solver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Solver")
            .field("state", &self.state)
            .field("events", &self.events)
            .field("output", &self.output.is_some())
            .finish_non_exhaustive()
    }
}

/// Parameters as the engine sees them: the client-side fields are dropped.
fn engine_parameters(parameters: &Parameters) -> Parameters {
    Parameters {
        solver: None,
        solver_args: None,
        print_log: None,
        ..parameters.clone()
    }
}

async fn write_line(writer: &mut EngineWriter, line: &str) -> std::io::Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}
