//! Replay event records.

use core::fmt;

use crate::node::NodeId;

/// Which observer hook produced a [`ReplayEvent`].
///
/// The discriminants are part of the binary replay format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventKind {
    /// `on_state_entered`
    StateEntered = 0,
    /// `on_state_exited`
    StateExited = 1,
    /// `on_transition`
    Transition = 2,
    /// `on_state_failed`
    StateFailed = 3,
    /// `on_machine_reset`
    MachineReset = 4,
    /// `on_machine_started`
    MachineStarted = 5,
    /// `on_machine_completed`
    MachineCompleted = 6,
    /// `on_machine_cancelled`
    MachineCancelled = 7,
    /// `on_status_changed`
    StatusChanged = 8,
    /// `on_log`
    Log = 9,
}

impl TryFrom<u8> for EventKind {
    type Error = u8;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        Ok(match raw {
            0 => EventKind::StateEntered,
            1 => EventKind::StateExited,
            2 => EventKind::Transition,
            3 => EventKind::StateFailed,
            4 => EventKind::MachineReset,
            5 => EventKind::MachineStarted,
            6 => EventKind::MachineCompleted,
            7 => EventKind::MachineCancelled,
            8 => EventKind::StatusChanged,
            9 => EventKind::Log,
            other => return Err(other),
        })
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One recorded observer notification.
///
/// `source` is the node for node-level events and the graph's own ID for
/// machine-level events. `target` is only set for transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayEvent {
    /// The hook that fired.
    pub kind: EventKind,
    /// The node or graph the event concerns.
    pub source: NodeId,
    /// Transition destination.
    pub target: Option<NodeId>,
    /// Status change (`"Running->Completed"`), outcome, error text or log message.
    pub message: Option<String>,
    /// Wall-clock time in Unix milliseconds.
    pub timestamp: i64,
}

impl ReplayEvent {
    /// Creates an event stamped with the current wall-clock time.
    #[must_use]
    pub fn new(kind: EventKind, source: NodeId) -> Self {
        Self {
            kind,
            source,
            target: None,
            message: None,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Sets the transition destination.
    #[must_use]
    pub fn with_target(mut self, target: NodeId) -> Self {
        self.target = Some(target);
        self
    }

    /// Sets the message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Overrides the timestamp.
    #[must_use]
    pub fn at(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }
}

impl fmt::Display for ReplayEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} {}", self.timestamp, self.kind, self.source)?;
        if let Some(target) = &self.target {
            write!(f, " -> {target}")?;
        }
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        Ok(())
    }
}
