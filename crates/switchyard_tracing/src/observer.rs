//! Lifecycle hooks rendered as `tracing` events.

use switchyard_graph::error::FsmError;
use switchyard_graph::logic::Outcome;
use switchyard_graph::node::NodeId;
use switchyard_graph::observer::{HookFuture, Observer, done};
use switchyard_graph::status::ExecutionStatus;

const TARGET: &str = "switchyard::observer";

/// Emits one `tracing` event per lifecycle hook. Never fails a run.
///
/// Node-level hooks log at `DEBUG`, machine start and completion at `INFO`,
/// node failures and cancellation at `WARN`, status changes at `TRACE`.
/// Node log messages are emitted at `INFO`.
///
/// Events carry the `switchyard::observer` target, so they can be filtered
/// independently of the engine's own diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl TracingObserver {
    /// Creates the observer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Observer for TracingObserver {
    fn on_state_entered<'a>(&'a self, node: &'a NodeId) -> HookFuture<'a> {
        tracing::debug!(target: TARGET, %node, "state entered");
        done()
    }

    fn on_state_exited<'a>(&'a self, node: &'a NodeId) -> HookFuture<'a> {
        tracing::debug!(target: TARGET, %node, "state exited");
        done()
    }

    fn on_transition<'a>(&'a self, from: &'a NodeId, to: &'a NodeId) -> HookFuture<'a> {
        tracing::debug!(target: TARGET, %from, %to, "transition");
        done()
    }

    fn on_state_failed<'a>(&'a self, node: &'a NodeId, error: &'a FsmError) -> HookFuture<'a> {
        tracing::warn!(target: TARGET, %node, %error, "state failed");
        done()
    }

    fn on_machine_started<'a>(&'a self, graph: &'a NodeId) -> HookFuture<'a> {
        tracing::info!(target: TARGET, %graph, "machine started");
        done()
    }

    fn on_machine_completed<'a>(&'a self, graph: &'a NodeId, outcome: Outcome) -> HookFuture<'a> {
        tracing::info!(target: TARGET, %graph, %outcome, "machine completed");
        done()
    }

    fn on_machine_cancelled<'a>(&'a self, graph: &'a NodeId) -> HookFuture<'a> {
        tracing::warn!(target: TARGET, %graph, "machine cancelled");
        done()
    }

    fn on_machine_reset<'a>(&'a self, graph: &'a NodeId) -> HookFuture<'a> {
        tracing::debug!(target: TARGET, %graph, "machine reset");
        done()
    }

    fn on_status_changed<'a>(
        &'a self,
        graph: &'a NodeId,
        prev: ExecutionStatus,
        next: ExecutionStatus,
    ) -> HookFuture<'a> {
        tracing::trace!(target: TARGET, %graph, %prev, %next, "status changed");
        done()
    }

    fn on_log<'a>(&'a self, node: &'a NodeId, message: &'a str) -> HookFuture<'a> {
        tracing::info!(target: TARGET, %node, "{message}");
        done()
    }
}
