//! Handle for talking to a running session from elsewhere.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use chronoforge_core::wire::solution_command;
use chronoforge_core::{Model, Solution};
use tokio::sync::mpsc;

use crate::error::Result;

/// Result of a handle command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    /// Queued for the engine.
    Queued,
    /// The session is idle or already finished; nothing was sent.
    NotRunning,
}

#[derive(Debug)]
pub(crate) enum Outbound {
    Stop(String),
    /// An encoded command line.
    Line(String),
}

/// State shared between a session and its handles.
#[derive(Debug, Default)]
pub(crate) struct Shared {
    pub(crate) running: AtomicBool,
    /// Model of the command in flight, set once.
    pub(crate) model: OnceLock<Model>,
}

/// Cloneable handle to a [`Solver`](crate::Solver).
///
/// Commands are queued and written by the session between inbound
/// messages. Once the session is finished they are no-ops.
#[derive(Debug, Clone)]
pub struct SolverHandle {
    tx: mpsc::UnboundedSender<Outbound>,
    shared: Arc<Shared>,
}

impl SolverHandle {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Outbound>, shared: Arc<Shared>) -> Self {
        Self { tx, shared }
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    fn queue(&self, outbound: Outbound) -> CommandStatus {
        if !self.is_running() {
            return CommandStatus::NotRunning;
        }
        match self.tx.send(outbound) {
            Ok(()) => CommandStatus::Queued,
            Err(_) => CommandStatus::NotRunning,
        }
    }

    /// Asks the engine to stop early. Events may still arrive before
    /// `close`.
    pub fn stop(&self, reason: impl Into<String>) -> CommandStatus {
        self.queue(Outbound::Stop(reason.into()))
    }

    /// Offers an external solution to the running search.
    ///
    /// The solution is checked against the model's variables before it is
    /// queued; a value for a node that is not a variable of the model is a
    /// protocol error.
    pub fn send_solution(&self, solution: &Solution) -> Result<CommandStatus> {
        let Some(model) = self.shared.model.get() else {
            return Ok(CommandStatus::NotRunning);
        };
        if !self.is_running() {
            return Ok(CommandStatus::NotRunning);
        }
        let line = solution_command(model, solution)?;
        Ok(self.queue(Outbound::Line(line)))
    }
}
