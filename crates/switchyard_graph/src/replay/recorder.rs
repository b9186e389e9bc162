//! Observer that records every hook into a ring buffer.

use parking_lot::Mutex;

use crate::error::FsmError;
use crate::logic::Outcome;
use crate::node::NodeId;
use crate::observer::{HookFuture, Observer, done};
use crate::replay::event::{EventKind, ReplayEvent};
use crate::replay::ring::RingBuffer;
use crate::status::ExecutionStatus;

/// Default number of events a recorder keeps.
pub const DEFAULT_CAPACITY: usize = 256;

/// Records the most recent observer notifications for later replay.
///
/// Each hook appends one [`ReplayEvent`] stamped with the wall-clock time.
/// When the buffer is full the oldest event is evicted.
#[derive(Debug)]
pub struct ReplayRecorder {
    events: Mutex<RingBuffer<ReplayEvent>>,
}

impl ReplayRecorder {
    /// Creates a recorder keeping at most `capacity` events.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Mutex::new(RingBuffer::with_capacity(capacity)),
        }
    }

    /// Maximum number of events kept.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.events.lock().capacity()
    }

    /// Number of live events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns `true` if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// The `n`th-oldest live event.
    #[must_use]
    pub fn get(&self, n: usize) -> Option<ReplayEvent> {
        self.events.lock().get(n).cloned()
    }

    /// Live events from oldest to newest.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ReplayEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Forgets every recorded event.
    pub fn clear(&self) {
        self.events.lock().clear();
    }

    /// Appends an event.
    pub fn record(&self, event: ReplayEvent) {
        self.events.lock().push(event);
    }

    fn capture<'a>(&'a self, event: ReplayEvent) -> HookFuture<'a> {
        self.record(event);
        done()
    }
}

impl Default for ReplayRecorder {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl Observer for ReplayRecorder {
    fn on_state_entered<'a>(&'a self, node: &'a NodeId) -> HookFuture<'a> {
        self.capture(ReplayEvent::new(EventKind::StateEntered, node.clone()))
    }

    fn on_state_exited<'a>(&'a self, node: &'a NodeId) -> HookFuture<'a> {
        self.capture(ReplayEvent::new(EventKind::StateExited, node.clone()))
    }

    fn on_transition<'a>(&'a self, from: &'a NodeId, to: &'a NodeId) -> HookFuture<'a> {
        self.capture(ReplayEvent::new(EventKind::Transition, from.clone()).with_target(to.clone()))
    }

    fn on_state_failed<'a>(&'a self, node: &'a NodeId, error: &'a FsmError) -> HookFuture<'a> {
        self.capture(
            ReplayEvent::new(EventKind::StateFailed, node.clone()).with_message(error.to_string()),
        )
    }

    fn on_machine_started<'a>(&'a self, graph: &'a NodeId) -> HookFuture<'a> {
        self.capture(ReplayEvent::new(EventKind::MachineStarted, graph.clone()))
    }

    fn on_machine_completed<'a>(&'a self, graph: &'a NodeId, outcome: Outcome) -> HookFuture<'a> {
        self.capture(
            ReplayEvent::new(EventKind::MachineCompleted, graph.clone())
                .with_message(outcome.to_string()),
        )
    }

    fn on_machine_cancelled<'a>(&'a self, graph: &'a NodeId) -> HookFuture<'a> {
        self.capture(ReplayEvent::new(EventKind::MachineCancelled, graph.clone()))
    }

    fn on_machine_reset<'a>(&'a self, graph: &'a NodeId) -> HookFuture<'a> {
        self.capture(ReplayEvent::new(EventKind::MachineReset, graph.clone()))
    }

    fn on_status_changed<'a>(
        &'a self,
        graph: &'a NodeId,
        prev: ExecutionStatus,
        next: ExecutionStatus,
    ) -> HookFuture<'a> {
        self.capture(
            ReplayEvent::new(EventKind::StatusChanged, graph.clone())
                .with_message(format!("{prev}->{next}")),
        )
    }

    fn on_log<'a>(&'a self, node: &'a NodeId, message: &'a str) -> HookFuture<'a> {
        self.capture(ReplayEvent::new(EventKind::Log, node.clone()).with_message(message))
    }
}
