//! Agent-aware node logic.
//!
//! An agent is an externally owned context object (a game entity, a workflow
//! document, a conversation) shared by the nodes of a graph. It is pushed in
//! with [`Graph::set_agent`](crate::graph::Graph::set_agent) and reaches every
//! node whose logic exposes a matching [`AgentSlot`].

use core::any::Any;
use core::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use crate::error::FsmError;
use crate::logic::{AgentSlot, Logic, NodeContext, Outcome, SharedAgent};

/// Holds the agent injected into one node.
pub struct AgentCell<T> {
    agent: RwLock<Option<Arc<T>>>,
}

impl<T> AgentCell<T> {
    /// Creates an empty cell.
    #[must_use]
    pub fn new() -> Self {
        Self {
            agent: RwLock::new(None),
        }
    }

    /// Stores `agent`, replacing any previous one.
    pub fn set(&self, agent: Arc<T>) {
        *self.agent.write() = Some(agent);
    }

    /// Returns the current agent.
    #[must_use]
    pub fn get(&self) -> Option<Arc<T>> {
        self.agent.read().clone()
    }
}

impl<T> Default for AgentCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Any + Send + Sync> AgentSlot for AgentCell<T> {
    fn offer(&self, agent: &SharedAgent) -> usize {
        match Arc::clone(agent).downcast::<T>() {
            Ok(agent) => {
                self.set(agent);
                1
            }
            Err(_) => 0,
        }
    }
}

type AgentRunFn<T> =
    Box<dyn Fn(Arc<T>, CancellationToken) -> BoxFuture<'static, Result<Outcome, FsmError>> + Send + Sync>;

type AgentPhaseFn<T> =
    Box<dyn Fn(Arc<T>, CancellationToken) -> BoxFuture<'static, Result<(), FsmError>> + Send + Sync>;

/// Closure-backed logic operating on an injected agent of type `T`.
///
/// Executing before an agent was injected fails with
/// [`FsmError::AgentMissing`].
pub struct AgentRelay<T> {
    cell: AgentCell<T>,
    run: AgentRunFn<T>,
    on_enter: Option<AgentPhaseFn<T>>,
    on_exit: Option<AgentPhaseFn<T>>,
}

impl<T: Any + Send + Sync> AgentRelay<T> {
    /// Creates agent relay logic from its main closure.
    #[must_use]
    pub fn new<F, Fut>(run: F) -> Self
    where
        F: Fn(Arc<T>, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Outcome, FsmError>> + Send + 'static,
    {
        Self {
            cell: AgentCell::new(),
            run: Box::new(move |agent, cancel| Box::pin(run(agent, cancel))),
            on_enter: None,
            on_exit: None,
        }
    }

    /// Sets the closure run before the main closure.
    #[must_use]
    pub fn on_enter<F, Fut>(mut self, phase: F) -> Self
    where
        F: Fn(Arc<T>, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), FsmError>> + Send + 'static,
    {
        self.on_enter = Some(Box::new(move |agent, cancel| Box::pin(phase(agent, cancel))));
        self
    }

    /// Sets the closure run after the main closure.
    #[must_use]
    pub fn on_exit<F, Fut>(mut self, phase: F) -> Self
    where
        F: Fn(Arc<T>, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), FsmError>> + Send + 'static,
    {
        self.on_exit = Some(Box::new(move |agent, cancel| Box::pin(phase(agent, cancel))));
        self
    }

    /// Returns the injected agent, if any.
    #[must_use]
    pub fn agent(&self) -> Option<Arc<T>> {
        self.cell.get()
    }
}

impl<T: Any + Send + Sync> Logic for AgentRelay<T> {
    fn execute<'a>(&'a self, cx: &'a NodeContext<'a>) -> BoxFuture<'a, Result<Outcome, FsmError>> {
        Box::pin(async move {
            let agent = self
                .cell
                .get()
                .ok_or_else(|| FsmError::AgentMissing(cx.node().clone()))?;
            let cancel = cx.cancellation();
            if let Some(enter) = &self.on_enter {
                enter(Arc::clone(&agent), cancel.clone()).await?;
            }
            let outcome = (self.run)(Arc::clone(&agent), cancel.clone()).await?;
            if let Some(exit) = &self.on_exit {
                exit(agent, cancel.clone()).await?;
            }
            Ok(outcome)
        })
    }

    fn agent_slot(&self) -> Option<&dyn AgentSlot> {
        Some(&self.cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeId;
    use core::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter(AtomicUsize);

    #[test]
    fn cell_accepts_matching_type_only() {
        let cell = AgentCell::<Counter>::new();
        let wrong: SharedAgent = Arc::new(12_i64);
        assert_eq!(cell.offer(&wrong), 0);
        assert!(cell.get().is_none());

        let right: SharedAgent = Arc::new(Counter::default());
        assert_eq!(cell.offer(&right), 1);
        assert!(cell.get().is_some());
    }

    #[tokio::test]
    async fn relay_runs_against_agent() {
        let relay = AgentRelay::new(|agent: Arc<Counter>, _| async move {
            agent.0.fetch_add(1, Ordering::SeqCst);
            Ok(Outcome::Success)
        });
        let counter = Arc::new(Counter::default());
        let shared: SharedAgent = counter.clone();
        assert_eq!(relay.agent_slot().unwrap().offer(&shared), 1);

        let id = NodeId::START;
        let token = CancellationToken::new();
        let cx = NodeContext::new(&id, &token);
        assert_eq!(relay.execute(&cx).await.unwrap(), Outcome::Success);
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn relay_without_agent_errors() {
        let relay = AgentRelay::new(|_: Arc<Counter>, _| async { Ok(Outcome::Success) });
        let id = NodeId::new(2);
        let token = CancellationToken::new();
        let cx = NodeContext::new(&id, &token);
        let err = relay.execute(&cx).await.unwrap_err();
        assert!(matches!(err, FsmError::AgentMissing(node) if node.index() == 2));
    }
}
