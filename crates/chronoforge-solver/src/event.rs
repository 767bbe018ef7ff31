//! Event channels of a solver session.
//!
//! Every decoded engine message fans out to exactly one channel. Listeners
//! are called synchronously, in registration order, in the order the engine
//! sent the messages. `close` fires once, after every other event.

use std::fmt;

use chronoforge_core::{LowerBoundEvent, SolutionEvent, SolveSummary};
use tokio::sync::mpsc;

use crate::error::SolverError;

/// Identifies one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Every channel as one value, delivered by [`SolverEventSupport::subscribe`].
#[derive(Debug, Clone, PartialEq)]
pub enum SolverEvent {
    Log(String),
    Trace(String),
    Warning(String),
    /// Display text of the session error.
    Error(String),
    Solution(SolutionEvent),
    LowerBound(LowerBoundEvent),
    Summary(SolveSummary),
    Close,
}

struct Listeners<T: ?Sized> {
    entries: Vec<(SubscriptionId, Box<dyn FnMut(&T) + Send>)>,
}

impl<T: ?Sized> Default for Listeners<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: ?Sized> Listeners<T> {
    fn fire(&mut self, value: &T) {
        for (_, callback) in &mut self.entries {
            callback(value);
        }
    }

    fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Listener registry of one session.
#[derive(Default)]
pub struct SolverEventSupport {
    next_id: u64,
    log: Listeners<str>,
    trace: Listeners<str>,
    warning: Listeners<str>,
    error: Listeners<SolverError>,
    solution: Listeners<SolutionEvent>,
    lower_bound: Listeners<LowerBoundEvent>,
    summary: Listeners<SolveSummary>,
    close: Listeners<()>,
    senders: Vec<(SubscriptionId, mpsc::UnboundedSender<SolverEvent>)>,
}

impl SolverEventSupport {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> SubscriptionId {
        self.next_id += 1;
        SubscriptionId(self.next_id)
    }

    // === Registration ===

    pub fn on_log(&mut self, f: impl FnMut(&str) + Send + 'static) -> SubscriptionId {
        let id = self.next_id();
        self.log.entries.push((id, Box::new(f)));
        id
    }

    pub fn on_trace(&mut self, f: impl FnMut(&str) + Send + 'static) -> SubscriptionId {
        let id = self.next_id();
        self.trace.entries.push((id, Box::new(f)));
        id
    }

    pub fn on_warning(&mut self, f: impl FnMut(&str) + Send + 'static) -> SubscriptionId {
        let id = self.next_id();
        self.warning.entries.push((id, Box::new(f)));
        id
    }

    /// Registering an error listener turns session errors into events: the
    /// command then resolves with its partial result.
    pub fn on_error(&mut self, f: impl FnMut(&SolverError) + Send + 'static) -> SubscriptionId {
        let id = self.next_id();
        self.error.entries.push((id, Box::new(f)));
        id
    }

    pub fn on_solution(
        &mut self,
        f: impl FnMut(&SolutionEvent) + Send + 'static,
    ) -> SubscriptionId {
        let id = self.next_id();
        self.solution.entries.push((id, Box::new(f)));
        id
    }

    pub fn on_lower_bound(
        &mut self,
        f: impl FnMut(&LowerBoundEvent) + Send + 'static,
    ) -> SubscriptionId {
        let id = self.next_id();
        self.lower_bound.entries.push((id, Box::new(f)));
        id
    }

    pub fn on_summary(&mut self, f: impl FnMut(&SolveSummary) + Send + 'static) -> SubscriptionId {
        let id = self.next_id();
        self.summary.entries.push((id, Box::new(f)));
        id
    }

    pub fn on_close(&mut self, mut f: impl FnMut() + Send + 'static) -> SubscriptionId {
        let id = self.next_id();
        self.close.entries.push((id, Box::new(move |_: &()| f())));
        id
    }

    /// Streams every event into a channel. The channel ends after
    /// [`SolverEvent::Close`].
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<SolverEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_id();
        self.senders.push((id, tx));
        rx
    }

    /// Removes one listener. Returns `false` if `id` was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.senders.len();
        self.senders.retain(|(entry, _)| *entry != id);
        let removed_sender = self.senders.len() != before;

        // Ids are unique, so at most one registry holds it.
        removed_sender
            || self.log.remove(id)
            || self.trace.remove(id)
            || self.warning.remove(id)
            || self.error.remove(id)
            || self.solution.remove(id)
            || self.lower_bound.remove(id)
            || self.summary.remove(id)
            || self.close.remove(id)
    }

    pub fn has_error_listeners(&self) -> bool {
        !self.error.entries.is_empty()
    }

    pub fn listener_count(&self) -> usize {
        self.log.len()
            + self.trace.len()
            + self.warning.len()
            + self.error.len()
            + self.solution.len()
            + self.lower_bound.len()
            + self.summary.len()
            + self.close.len()
            + self.senders.len()
    }

    // === Dispatch ===

    fn send(&mut self, event: impl FnOnce() -> SolverEvent) {
        if self.senders.is_empty() {
            return;
        }
        let event = event();
        self.senders.retain(|(_, tx)| tx.send(event.clone()).is_ok());
    }

    pub(crate) fn fire_log(&mut self, text: &str) {
        self.log.fire(text);
        self.send(|| SolverEvent::Log(text.to_string()));
    }

    pub(crate) fn fire_trace(&mut self, text: &str) {
        self.trace.fire(text);
        self.send(|| SolverEvent::Trace(text.to_string()));
    }

    pub(crate) fn fire_warning(&mut self, text: &str) {
        self.warning.fire(text);
        self.send(|| SolverEvent::Warning(text.to_string()));
    }

    pub(crate) fn fire_error(&mut self, error: &SolverError) {
        self.error.fire(error);
        self.send(|| SolverEvent::Error(error.to_string()));
    }

    pub(crate) fn fire_solution(&mut self, event: &SolutionEvent) {
        self.solution.fire(event);
        self.send(|| SolverEvent::Solution(event.clone()));
    }

    pub(crate) fn fire_lower_bound(&mut self, event: &LowerBoundEvent) {
        self.lower_bound.fire(event);
        self.send(|| SolverEvent::LowerBound(*event));
    }

    pub(crate) fn fire_summary(&mut self, summary: &SolveSummary) {
        self.summary.fire(summary);
        self.send(|| SolverEvent::Summary(summary.clone()));
    }

    /// Fires `close` and ends every subscription channel.
    pub(crate) fn fire_close(&mut self) {
        self.close.fire(&());
        self.send(|| SolverEvent::Close);
        self.senders.clear();
    }
}

impl fmt::Debug for SolverEventSupport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolverEventSupport")
            .field("log", &self.log.len())
            .field("trace", &self.trace.len())
            .field("warning", &self.warning.len())
            .field("error", &self.error.len())
            .field("solution", &self.solution.len())
            .field("lower_bound", &self.lower_bound.len())
            .field("summary", &self.summary.len())
            .field("close", &self.close.len())
            .field("subscribers", &self.senders.len())
            .finish()
    }
}
