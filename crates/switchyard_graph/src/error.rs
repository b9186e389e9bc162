//! Error types for graph construction and execution.

use core::time::Duration;
use std::error::Error as StdError;

use crate::node::NodeId;
use crate::status::ExecutionStatus;

/// Boxed error type carried by [`FsmError::Logic`] and [`FsmError::Observer`].
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Errors raised while building or running a state machine.
///
/// The variants fall into four groups:
///
/// - **usage errors**, raised synchronously at the call that violated a
///   precondition (see [`FsmError::is_usage`]);
/// - **node errors**, raised by the work a node performs;
/// - **observer errors**, raised by a lifecycle hook;
/// - **cancellation**, raised when the run's token is cancelled
///   (see [`FsmError::is_cancellation`]).
///
/// A node finishing with [`Outcome::Failure`](crate::logic::Outcome::Failure)
/// is not an error; it is a normal run result.
#[derive(Debug, thiserror::Error)]
pub enum FsmError {
    /// `run` was called while another run of the same machine is in flight.
    #[error("state machine is already running")]
    AlreadyRunning,

    /// `run` was called while the machine sits in a terminal status.
    #[error("state machine cannot start from status {0}; reset it first")]
    NotReady(ExecutionStatus),

    /// `reset` was called while a run is active.
    #[error("cannot reset a state machine while it is {0}")]
    ResetWhileActive(ExecutionStatus),

    /// A second static transition was added from the same source node.
    #[error("node {0} already has a transition")]
    DuplicateTransition(NodeId),

    /// A timeout decorator was configured with a zero duration.
    #[error("timeout must be greater than zero, got {0:?}")]
    InvalidTimeout(Duration),

    /// The node and transition arrays do not describe a valid graph.
    #[error("invalid graph: {0}")]
    InvalidGraph(String),

    /// An agent was pushed into a graph with no node accepting its type.
    #[error("no node accepts an agent of type `{0}`")]
    NoAgentTarget(&'static str),

    /// Error raised by a node's own work.
    #[error("node logic failed: {0}")]
    Logic(#[source] BoxError),

    /// A timeout decorator configured to throw ran out of time.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// An agent-aware node ran before an agent was injected.
    #[error("node {0} requires an agent but none was set")]
    AgentMissing(NodeId),

    /// A node or transition destination could not be resolved.
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// A node has no transition slot in its graph.
    #[error("no transition slot for node: {0}")]
    NoTransition(NodeId),

    /// Error raised by an observer hook.
    #[error("observer failed: {0}")]
    Observer(#[source] BoxError),

    /// The run was cancelled through its cancellation token.
    #[error("operation was cancelled")]
    Cancelled,
}

impl FsmError {
    /// Wraps an arbitrary error raised by node logic.
    pub fn logic(err: impl Into<BoxError>) -> Self {
        FsmError::Logic(err.into())
    }

    /// Wraps an arbitrary error raised by an observer hook.
    pub fn observer(err: impl Into<BoxError>) -> Self {
        FsmError::Observer(err.into())
    }

    /// Returns `true` if this error reports a cancelled run.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, FsmError::Cancelled)
    }

    /// Returns `true` if this error reports API misuse rather than a runtime failure.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            FsmError::AlreadyRunning
                | FsmError::NotReady(_)
                | FsmError::ResetWhileActive(_)
                | FsmError::DuplicateTransition(_)
                | FsmError::InvalidTimeout(_)
                | FsmError::InvalidGraph(_)
                | FsmError::NoAgentTarget(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(FsmError::Cancelled.is_cancellation());
        assert!(!FsmError::Timeout(Duration::from_millis(5)).is_cancellation());
        assert!(FsmError::AlreadyRunning.is_usage());
        assert!(FsmError::ResetWhileActive(ExecutionStatus::Running).is_usage());
        assert!(!FsmError::logic("boom").is_usage());
    }

    #[test]
    fn display_includes_context() {
        let err = FsmError::DuplicateTransition(NodeId::new(3).with_name("fetch"));
        assert_eq!(err.to_string(), "node fetch(3) already has a transition");

        let err = FsmError::logic("disk on fire");
        assert_eq!(err.to_string(), "node logic failed: disk on fire");
    }
}
