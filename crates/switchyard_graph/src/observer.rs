//! Lifecycle hooks invoked by the engine during a run.
//!
//! Hooks are awaited one at a time, in the order the engine produces them.
//! For every status change the generic [`Observer::on_status_changed`] hook
//! runs before the named hook for the same change (for example
//! `on_status_changed(Running, Completed)` then `on_machine_completed`).
//!
//! A hook returning an error aborts the run exactly like a node error.
//!
//! # Example
//!
//! ```ignore
//! struct Entered(Mutex<Vec<NodeId>>);
//!
//! impl Observer for Entered {
//!     fn on_state_entered<'a>(&'a self, node: &'a NodeId) -> HookFuture<'a> {
//!         self.0.lock().push(node.clone());
//!         done()
//!     }
//! }
//! ```

use std::sync::Arc;

use futures::future::{self, BoxFuture};

use crate::error::FsmError;
use crate::logic::Outcome;
use crate::node::NodeId;
use crate::status::ExecutionStatus;

/// Future returned by every observer hook.
pub type HookFuture<'a> = BoxFuture<'a, Result<(), FsmError>>;

/// An already-completed, successful hook future.
#[must_use]
pub fn done<'a>() -> HookFuture<'a> {
    Box::pin(future::ready(Ok(())))
}

/// Receives lifecycle notifications from a [`StateMachine`](crate::executor::StateMachine).
///
/// Every hook defaults to a no-op. Machine-level hooks receive the graph's own
/// ID; node-level hooks receive the node's ID.
pub trait Observer: Send + Sync {
    /// A node became the current node.
    fn on_state_entered<'a>(&'a self, node: &'a NodeId) -> HookFuture<'a> {
        let _ = node;
        done()
    }

    /// A node finished with [`Outcome::Success`].
    fn on_state_exited<'a>(&'a self, node: &'a NodeId) -> HookFuture<'a> {
        let _ = node;
        done()
    }

    /// The engine is moving from one node to the next.
    fn on_transition<'a>(&'a self, from: &'a NodeId, to: &'a NodeId) -> HookFuture<'a> {
        let _ = (from, to);
        done()
    }

    /// A node step failed with an error, or could not be resolved.
    fn on_state_failed<'a>(&'a self, node: &'a NodeId, error: &'a FsmError) -> HookFuture<'a> {
        let _ = (node, error);
        done()
    }

    /// The machine entered `Starting`.
    fn on_machine_started<'a>(&'a self, graph: &'a NodeId) -> HookFuture<'a> {
        let _ = graph;
        done()
    }

    /// The machine entered `Completed` or `Failed`.
    fn on_machine_completed<'a>(&'a self, graph: &'a NodeId, outcome: Outcome) -> HookFuture<'a> {
        let _ = (graph, outcome);
        done()
    }

    /// The machine entered `Cancelled`.
    fn on_machine_cancelled<'a>(&'a self, graph: &'a NodeId) -> HookFuture<'a> {
        let _ = graph;
        done()
    }

    /// The machine entered `Resetting`.
    fn on_machine_reset<'a>(&'a self, graph: &'a NodeId) -> HookFuture<'a> {
        let _ = graph;
        done()
    }

    /// Any status change, fired before the named hook for that change.
    fn on_status_changed<'a>(
        &'a self,
        graph: &'a NodeId,
        prev: ExecutionStatus,
        next: ExecutionStatus,
    ) -> HookFuture<'a> {
        let _ = (graph, prev, next);
        done()
    }

    /// A node emitted a message through [`NodeContext::log`](crate::logic::NodeContext::log).
    fn on_log<'a>(&'a self, node: &'a NodeId, message: &'a str) -> HookFuture<'a> {
        let _ = (node, message);
        done()
    }
}

impl<O: Observer + ?Sized> Observer for Arc<O> {
    fn on_state_entered<'a>(&'a self, node: &'a NodeId) -> HookFuture<'a> {
        (**self).on_state_entered(node)
    }

    fn on_state_exited<'a>(&'a self, node: &'a NodeId) -> HookFuture<'a> {
        (**self).on_state_exited(node)
    }

    fn on_transition<'a>(&'a self, from: &'a NodeId, to: &'a NodeId) -> HookFuture<'a> {
        (**self).on_transition(from, to)
    }

    fn on_state_failed<'a>(&'a self, node: &'a NodeId, error: &'a FsmError) -> HookFuture<'a> {
        (**self).on_state_failed(node, error)
    }

    fn on_machine_started<'a>(&'a self, graph: &'a NodeId) -> HookFuture<'a> {
        (**self).on_machine_started(graph)
    }

    fn on_machine_completed<'a>(&'a self, graph: &'a NodeId, outcome: Outcome) -> HookFuture<'a> {
        (**self).on_machine_completed(graph, outcome)
    }

    fn on_machine_cancelled<'a>(&'a self, graph: &'a NodeId) -> HookFuture<'a> {
        (**self).on_machine_cancelled(graph)
    }

    fn on_machine_reset<'a>(&'a self, graph: &'a NodeId) -> HookFuture<'a> {
        (**self).on_machine_reset(graph)
    }

    fn on_status_changed<'a>(
        &'a self,
        graph: &'a NodeId,
        prev: ExecutionStatus,
        next: ExecutionStatus,
    ) -> HookFuture<'a> {
        (**self).on_status_changed(graph, prev, next)
    }

    fn on_log<'a>(&'a self, node: &'a NodeId, message: &'a str) -> HookFuture<'a> {
        (**self).on_log(node, message)
    }
}

/// Fans every hook out to several observers, in registration order.
///
/// The first failing observer aborts the hook; later observers do not see it.
#[derive(Default)]
pub struct ObserverChain {
    observers: Vec<Arc<dyn Observer>>,
}

impl ObserverChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an observer.
    #[must_use]
    pub fn with(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Appends an observer in place.
    pub fn push(&mut self, observer: Arc<dyn Observer>) {
        self.observers.push(observer);
    }

    /// Number of observers in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Returns `true` if the chain has no observers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    fn fan_out<'a, F>(&'a self, hook: F) -> HookFuture<'a>
    where
        F: Fn(&'a dyn Observer) -> HookFuture<'a> + Send + 'a,
    {
        Box::pin(async move {
            for observer in &self.observers {
                hook(observer.as_ref()).await?;
            }
            Ok(())
        })
    }
}

impl Observer for ObserverChain {
    fn on_state_entered<'a>(&'a self, node: &'a NodeId) -> HookFuture<'a> {
        self.fan_out(move |o| o.on_state_entered(node))
    }

    fn on_state_exited<'a>(&'a self, node: &'a NodeId) -> HookFuture<'a> {
        self.fan_out(move |o| o.on_state_exited(node))
    }

    fn on_transition<'a>(&'a self, from: &'a NodeId, to: &'a NodeId) -> HookFuture<'a> {
        self.fan_out(move |o| o.on_transition(from, to))
    }

    fn on_state_failed<'a>(&'a self, node: &'a NodeId, error: &'a FsmError) -> HookFuture<'a> {
        self.fan_out(move |o| o.on_state_failed(node, error))
    }

    fn on_machine_started<'a>(&'a self, graph: &'a NodeId) -> HookFuture<'a> {
        self.fan_out(move |o| o.on_machine_started(graph))
    }

    fn on_machine_completed<'a>(&'a self, graph: &'a NodeId, outcome: Outcome) -> HookFuture<'a> {
        self.fan_out(move |o| o.on_machine_completed(graph, outcome))
    }

    fn on_machine_cancelled<'a>(&'a self, graph: &'a NodeId) -> HookFuture<'a> {
        self.fan_out(move |o| o.on_machine_cancelled(graph))
    }

    fn on_machine_reset<'a>(&'a self, graph: &'a NodeId) -> HookFuture<'a> {
        self.fan_out(move |o| o.on_machine_reset(graph))
    }

    fn on_status_changed<'a>(
        &'a self,
        graph: &'a NodeId,
        prev: ExecutionStatus,
        next: ExecutionStatus,
    ) -> HookFuture<'a> {
        self.fan_out(move |o| o.on_status_changed(graph, prev, next))
    }

    fn on_log<'a>(&'a self, node: &'a NodeId, message: &'a str) -> HookFuture<'a> {
        self.fan_out(move |o| o.on_log(node, message))
    }
}
