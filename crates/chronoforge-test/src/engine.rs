//! Scripted in-process engine.
//!
//! [`FakeEngine`] speaks the wire protocol over `tokio::io::duplex`. Each
//! connection reads one command, decodes it with the real codec and plays
//! the replies its script returns for it.

use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};
use std::time::Duration;

use chronoforge_config::Parameters;
use chronoforge_core::wire::{decode_command, encode_event, EngineRequest};
use chronoforge_core::{
    eval, verify, DomainsEvent, EngineMessage, LowerBoundEvent, Model, ModelDomains,
    ObjectiveValue, Solution, SolutionEvent, SolveSummary,
};
use chronoforge_solver::{EngineConnection, EngineLauncher, LaunchFuture, SolverError};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadBuf};

const BUFFER_SIZE: usize = 64 * 1024;

/// One step of a scripted reply.
#[derive(Debug, Clone)]
pub enum Reply {
    /// An event encoded against the decoded model.
    Send(EngineMessage),
    /// A solution, verified with the evaluator before it is sent. A failed
    /// check is reported as an engine error instead. An undefined objective
    /// is filled in from the model.
    Solution { solve_time: f64, solution: Solution },
    /// A line written as is.
    Raw(String),
    /// A line written in chunks of `chunk` bytes.
    Fragmented { line: String, chunk: usize },
    Delay(Duration),
    /// Reads commands until a `stop` arrives.
    WaitForStop,
    /// Closes the connection without another byte.
    Hangup,
}

impl Reply {
    pub fn log(text: impl Into<String>) -> Self {
        Reply::Send(EngineMessage::Log(text.into()))
    }

    pub fn trace(text: impl Into<String>) -> Self {
        Reply::Send(EngineMessage::Trace(text.into()))
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Reply::Send(EngineMessage::Warning(text.into()))
    }

    pub fn error(text: impl Into<String>) -> Self {
        Reply::Send(EngineMessage::Error(text.into()))
    }

    pub fn lower_bound(solve_time: f64, value: f64) -> Self {
        Reply::Send(EngineMessage::LowerBound(LowerBoundEvent { solve_time, value }))
    }

    pub fn summary(nb_solutions: u64, objective: Option<f64>) -> Self {
        Reply::Send(EngineMessage::Summary(SolveSummary {
            nb_solutions,
            objective,
            duration: 0.25,
            proof: nb_solutions > 0,
            nb_workers: Some(1),
            solver: Some("fake-engine".into()),
            ..SolveSummary::default()
        }))
    }

    pub fn domains(domains: Option<ModelDomains>) -> Self {
        Reply::Send(EngineMessage::Domains(DomainsEvent {
            duration: 0.01,
            domains,
        }))
    }

    pub fn text(text: impl Into<String>) -> Self {
        Reply::Send(EngineMessage::Text(text.into()))
    }
}

type Script = dyn Fn(&EngineRequest<Parameters>) -> Vec<Reply> + Send + Sync;

#[derive(Default)]
struct Counters {
    launches: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl Counters {
    fn open(&self) {
        self.launches.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
    }
}

struct Inner {
    script: Box<Script>,
    available: bool,
    counters: Counters,
    requests: Mutex<Vec<EngineRequest<Parameters>>>,
    lines: Mutex<Vec<String>>,
}

/// Scripted engine implementing [`EngineLauncher`].
///
/// Clones share the script and the recordings, so a test keeps one clone
/// to inspect what the sessions sent.
#[derive(Clone)]
pub struct FakeEngine {
    inner: Arc<Inner>,
}

impl FakeEngine {
    pub fn new(
        script: impl Fn(&EngineRequest<Parameters>) -> Vec<Reply> + Send + Sync + 'static,
    ) -> Self {
        Self::build(Box::new(script), true)
    }

    /// An engine whose launches fail, like a missing executable.
    pub fn unavailable() -> Self {
        Self::build(Box::new(|_| Vec::new()), false)
    }

    fn build(script: Box<Script>, available: bool) -> Self {
        Self {
            inner: Arc::new(Inner {
                script,
                available,
                counters: Counters::default(),
                requests: Mutex::new(Vec::new()),
                lines: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Answers solves with `solutions(model)` followed by a summary,
    /// propagation with unbounded domains and text export with the model
    /// name.
    pub fn solving(solutions: impl Fn(&Model) -> Vec<Solution> + Send + Sync + 'static) -> Self {
        Self::new(move |request| match request {
            EngineRequest::Solve { model, .. } => {
                let found = solutions(model);
                let objective = found.last().and_then(|s| s.objective().value());
                let mut replies: Vec<Reply> = found
                    .into_iter()
                    .enumerate()
                    .map(|(i, solution)| Reply::Solution {
                        solve_time: 0.1 * (i + 1) as f64,
                        solution,
                    })
                    .collect();
                let nb_solutions = replies.len() as u64;
                replies.push(Reply::summary(nb_solutions, objective));
                replies
            }
            EngineRequest::Propagate { .. } => vec![Reply::domains(Some(ModelDomains::new()))],
            EngineRequest::ToText { model, .. } => {
                vec![Reply::text(model.name().unwrap_or("model").to_string())]
            }
            _ => Vec::new(),
        })
    }

    /// Number of launches so far.
    pub fn launches(&self) -> usize {
        self.inner.counters.launches.load(Ordering::SeqCst)
    }

    /// Sessions currently holding a connection.
    pub fn active(&self) -> usize {
        self.inner.counters.active.load(Ordering::SeqCst)
    }

    /// Largest number of connections held at the same time.
    pub fn max_active(&self) -> usize {
        self.inner.counters.max_active.load(Ordering::SeqCst)
    }

    /// Every decoded request, commands and follow-ups alike.
    pub fn requests(&self) -> Vec<EngineRequest<Parameters>> {
        lock(&self.inner.requests).clone()
    }

    /// Every raw line received.
    pub fn lines(&self) -> Vec<String> {
        lock(&self.inner.lines).clone()
    }

    fn connect(&self) -> Result<EngineConnection, SolverError> {
        if !self.inner.available {
            return Err(SolverError::Transport(
                "cannot start fake engine: unavailable".into(),
            ));
        }
        self.inner.counters.open();
        let (client, server) = tokio::io::duplex(BUFFER_SIZE);
        let (reader, writer) = tokio::io::split(client);
        tokio::spawn(serve(Arc::clone(&self.inner), server));
        Ok(EngineConnection::new(
            Tracked {
                inner: reader,
                engine: Arc::clone(&self.inner),
            },
            writer,
        ))
    }
}

impl EngineLauncher for FakeEngine {
    fn launch<'a>(&'a self, _parameters: &'a Parameters) -> LaunchFuture<'a> {
        Box::pin(async move { self.connect() })
    }
}

impl fmt::Debug for FakeEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeEngine")
            .field("available", &self.inner.available)
            .field("launches", &self.launches())
            .field("active", &self.active())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Client read half that marks the connection closed when dropped.
struct Tracked<R> {
    inner: R,
    engine: Arc<Inner>,
}

impl<R: AsyncRead + Unpin> AsyncRead for Tracked<R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl<R> Drop for Tracked<R> {
    fn drop(&mut self) {
        self.engine.counters.active.fetch_sub(1, Ordering::SeqCst);
    }
}

async fn serve(engine: Arc<Inner>, stream: tokio::io::DuplexStream) {
    let (read, mut write) = tokio::io::split(stream);
    let mut lines = BufReader::new(read).lines();

    let Ok(Some(first)) = lines.next_line().await else {
        return;
    };
    lock(&engine.lines).push(first.clone());
    let request = match decode_command::<Parameters>(&first) {
        Ok(request) => request,
        Err(e) => {
            let _ = send_line(&mut write, &error_line(&format!("bad command: {e}"))).await;
            return;
        }
    };
    lock(&engine.requests).push(request.clone());

    let (model, parameters) = match &request {
        EngineRequest::Solve {
            model, parameters, ..
        }
        | EngineRequest::Propagate { model, parameters }
        | EngineRequest::ToText {
            model, parameters, ..
        } => (model.clone(), parameters.clone()),
        _ => {
            let _ = send_line(&mut write, &error_line("expected a command")).await;
            return;
        }
    };

    for reply in (engine.script)(&request) {
        let written = match reply {
            Reply::Send(message) => send_message(&mut write, &model, &message).await,
            Reply::Solution {
                solve_time,
                solution,
            } => {
                let message = checked_solution(&model, &parameters, solve_time, solution);
                send_message(&mut write, &model, &message).await
            }
            Reply::Raw(line) => send_line(&mut write, &line).await,
            Reply::Fragmented { line, chunk } => {
                send_fragmented(&mut write, &line, chunk.max(1)).await
            }
            Reply::Delay(duration) => {
                tokio::time::sleep(duration).await;
                Ok(())
            }
            Reply::WaitForStop => {
                wait_for_stop(&engine, &mut lines).await;
                Ok(())
            }
            Reply::Hangup => return,
        };
        if written.is_err() {
            return;
        }
    }
}

/// Verifies a scripted solution the way an engine with verification would.
fn checked_solution(
    model: &Model,
    parameters: &Parameters,
    solve_time: f64,
    mut solution: Solution,
) -> EngineMessage {
    if solution.objective().is_undefined() {
        if let Some(objective) = model.objective() {
            let value = match eval(model, &solution, objective.expr) {
                Ok(v) => v.as_f64().map_or(ObjectiveValue::Absent, ObjectiveValue::Value),
                Err(e) => return EngineMessage::Error(format!("cannot evaluate objective: {e}")),
            };
            solution.set_objective(value);
        }
    }
    if let Err(e) = verify(model, &solution) {
        return EngineMessage::Error(format!("solution verification failed: {e}"));
    }
    EngineMessage::Solution(SolutionEvent {
        solve_time,
        valid: (parameters.verify_solutions == Some(true)).then_some(true),
        solution,
    })
}

async fn wait_for_stop<R>(engine: &Inner, lines: &mut tokio::io::Lines<R>)
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    while let Ok(Some(line)) = lines.next_line().await {
        lock(&engine.lines).push(line.clone());
        let Ok(request) = decode_command::<Parameters>(&line) else {
            continue;
        };
        let stop = matches!(request, EngineRequest::Stop { .. });
        lock(&engine.requests).push(request);
        if stop {
            return;
        }
    }
}

fn error_line(text: &str) -> String {
    serde_json::json!({ "msg": "error", "data": text }).to_string()
}

async fn send_message<W: AsyncWrite + Unpin>(
    write: &mut W,
    model: &Model,
    message: &EngineMessage,
) -> std::io::Result<()> {
    match encode_event(model, message) {
        Ok(line) => send_line(write, &line).await,
        Err(e) => send_line(write, &error_line(&format!("cannot encode reply: {e}"))).await,
    }
}

async fn send_line<W: AsyncWrite + Unpin>(write: &mut W, line: &str) -> std::io::Result<()> {
    write.write_all(line.as_bytes()).await?;
    write.write_all(b"\n").await?;
    write.flush().await
}

async fn send_fragmented<W: AsyncWrite + Unpin>(
    write: &mut W,
    line: &str,
    chunk: usize,
) -> std::io::Result<()> {
    let mut bytes = line.as_bytes().to_vec();
    bytes.push(b'\n');
    for piece in bytes.chunks(chunk) {
        write.write_all(piece).await?;
        write.flush().await?;
        tokio::task::yield_now().await;
    }
    Ok(())
}
