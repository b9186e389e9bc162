//! The state-machine engine.
//!
//! A [`StateMachine`] walks a [`Graph`] one node at a time. Each run moves the
//! machine through `Starting → Running ⇄ Transitioning → {Completed | Failed
//! | Cancelled}` and, with auto-reset enabled (the default), back through
//! `Resetting → Ready` before returning.
//!
//! # Example
//!
//! ```ignore
//! use switchyard_graph::prelude::*;
//!
//! let mut builder = GraphBuilder::new();
//! let first = builder.add_node(RelayLogic::success());
//! builder.chain(&first, RelayLogic::success())?;
//!
//! let machine = StateMachine::new(builder.build()?)
//!     .with_observer(Arc::new(ReplayRecorder::default()));
//! let outcome = machine.run(&CancellationToken::new()).await?;
//! assert_eq!(outcome, Outcome::Success);
//! ```

use core::any::Any;
use core::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::error::FsmError;
use crate::graph::Graph;
use crate::logic::{AgentSlot, Logic, NodeContext, Outcome, SharedAgent};
use crate::node::NodeId;
use crate::observer::Observer;
use crate::status::{AtomicStatus, ExecutionStatus};

const RUN_ID_LEN: usize = 10;

/// Drives a graph to completion while reporting to an optional observer.
///
/// A machine runs one graph at a time: a second concurrent [`run`](Self::run)
/// fails with [`FsmError::AlreadyRunning`]. Its [`status`](Self::status) can
/// be read from any thread while a run is in flight.
pub struct StateMachine {
    graph: Arc<Graph>,
    observer: Option<Arc<dyn Observer>>,
    status: AtomicStatus,
    cursor: AtomicI32,
    auto_reset: AtomicBool,
    gate: AtomicBool,
}

impl StateMachine {
    /// Creates a machine for `graph` with auto-reset enabled and no observer.
    #[must_use]
    pub fn new(graph: impl Into<Arc<Graph>>) -> Self {
        Self {
            graph: graph.into(),
            observer: None,
            status: AtomicStatus::new(ExecutionStatus::Created),
            cursor: AtomicI32::new(NodeId::START.index()),
            auto_reset: AtomicBool::new(true),
            gate: AtomicBool::new(false),
        }
    }

    /// Reports lifecycle events to `observer`.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Sets whether a finished run resets the machine to `Ready` before returning.
    #[must_use]
    pub fn with_auto_reset(self, enabled: bool) -> Self {
        self.set_auto_reset(enabled);
        self
    }

    /// Changes the auto-reset setting. Takes effect when the current run ends.
    pub fn set_auto_reset(&self, enabled: bool) {
        self.auto_reset.store(enabled, Ordering::Release);
    }

    /// Returns the auto-reset setting.
    #[must_use]
    pub fn auto_reset(&self) -> bool {
        self.auto_reset.load(Ordering::Acquire)
    }

    /// The current execution status.
    #[must_use]
    pub fn status(&self) -> ExecutionStatus {
        self.status.load()
    }

    /// The graph this machine runs.
    #[must_use]
    pub fn graph(&self) -> &Arc<Graph> {
        &self.graph
    }

    /// The node the machine is positioned at.
    #[must_use]
    pub fn current(&self) -> NodeId {
        let current = NodeId::new(self.cursor.load(Ordering::Acquire));
        self.graph
            .node(&current)
            .map_or(current, |node| node.id().clone())
    }

    /// Pushes `agent` into every accepting node of the graph.
    ///
    /// # Errors
    ///
    /// Returns [`FsmError::NoAgentTarget`] if no node accepts a `T`.
    pub fn set_agent<T: Any + Send + Sync>(&self, agent: Arc<T>) -> Result<usize, FsmError> {
        self.graph.set_agent(agent)
    }

    /// Runs the graph from its start node until it finishes.
    ///
    /// Returns the run's outcome. Errors raised by node logic or by the
    /// observer are returned after the machine has recorded a terminal status
    /// and notified the observer; cancellation is returned as
    /// [`FsmError::Cancelled`].
    ///
    /// # Errors
    ///
    /// - [`FsmError::AlreadyRunning`] if another run is in flight.
    /// - [`FsmError::NotReady`] if a previous run ended and the machine has
    ///   not been reset (auto-reset disabled).
    /// - Any error raised during the run.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<Outcome, FsmError> {
        let _guard = RunGuard::acquire(self)?;
        let status = self.status.load();
        if !status.can_start() {
            return Err(FsmError::NotReady(status));
        }

        let span = tracing::info_span!(
            "switchyard.run",
            graph.id = %self.graph.id(),
            run.id = %nanoid::nanoid!(RUN_ID_LEN),
        );
        async {
            match self.drive_and_settle(cancel).await {
                Ok(outcome) => Ok(outcome),
                Err(FsmError::Cancelled) => {
                    self.settle_cancelled().await;
                    Err(FsmError::Cancelled)
                }
                Err(err) => {
                    self.settle_failed(&err).await;
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Returns a finished machine to `Ready`.
    ///
    /// Does nothing if the machine is `Created` or `Ready`.
    ///
    /// # Errors
    ///
    /// Returns [`FsmError::ResetWhileActive`] while a run is in flight, or
    /// the error raised by an observer hook.
    pub async fn reset(&self) -> Result<(), FsmError> {
        loop {
            let status = self.status.load();
            if status.is_active() {
                return Err(FsmError::ResetWhileActive(status));
            }
            if status.can_start() {
                return Ok(());
            }
            if let Ok(prev) = self
                .status
                .compare_exchange(status, ExecutionStatus::Resetting)
            {
                if prev != ExecutionStatus::Resetting {
                    tracing::debug!(graph = %self.graph.id(), %prev, next = %ExecutionStatus::Resetting, "status changed");
                    self.notify_status(prev, ExecutionStatus::Resetting).await?;
                }
                break;
            }
        }
        self.cursor.store(NodeId::START.index(), Ordering::Release);
        self.transition_to(ExecutionStatus::Ready).await
    }

    fn observer(&self) -> Option<&dyn Observer> {
        self.observer.as_deref()
    }

    async fn drive_and_settle(&self, cancel: &CancellationToken) -> Result<Outcome, FsmError> {
        let outcome = self.drive(cancel).await?;
        let terminal = match outcome {
            Outcome::Success => ExecutionStatus::Completed,
            Outcome::Failure => ExecutionStatus::Failed,
        };
        self.transition_to(terminal).await?;
        if self.auto_reset() {
            self.reset().await?;
        }
        Ok(outcome)
    }

    async fn drive(&self, cancel: &CancellationToken) -> Result<Outcome, FsmError> {
        self.transition_to(ExecutionStatus::Starting).await?;
        let mut current = self.graph.start_node().id().clone();
        self.cursor.store(current.index(), Ordering::Release);
        if let Some(observer) = self.observer() {
            observer.on_state_entered(&current).await?;
        }
        self.transition_to(ExecutionStatus::Running).await?;

        loop {
            if cancel.is_cancelled() {
                return Err(FsmError::Cancelled);
            }
            let node = self
                .graph
                .node(&current)
                .ok_or_else(|| FsmError::NodeNotFound(current.clone()))?;
            tracing::debug!(node = %current, "executing node");

            let cx = NodeContext::new(node.id(), cancel).with_reporter(self.observer.as_ref());
            if node.kind().execute(&cx).await? == Outcome::Failure {
                return Ok(Outcome::Failure);
            }
            if let Some(observer) = self.observer() {
                observer.on_state_exited(&current).await?;
            }

            let next = match node.kind().director() {
                Some(director) => {
                    let next = director.select_next();
                    if next.is_none() {
                        return Ok(Outcome::Success);
                    }
                    next
                }
                None => match self.graph.transition(&current) {
                    Some(transition) => match transition.destination() {
                        Some(destination) => destination.clone(),
                        None => return Ok(Outcome::Success),
                    },
                    None => {
                        self.fail_step(&current, FsmError::NoTransition(current.clone()))
                            .await?;
                        return Ok(Outcome::Failure);
                    }
                },
            };
            let Some(next) = self.graph.node(&next).map(|node| node.id().clone()) else {
                self.fail_step(&current, FsmError::NodeNotFound(next)).await?;
                return Ok(Outcome::Failure);
            };

            self.transition_to(ExecutionStatus::Transitioning).await?;
            if let Some(observer) = self.observer() {
                observer.on_transition(&current, &next).await?;
            }
            tracing::debug!(from = %current, to = %next, "transition");
            current = next;
            self.cursor.store(current.index(), Ordering::Release);
            if let Some(observer) = self.observer() {
                observer.on_state_entered(&current).await?;
            }
            self.transition_to(ExecutionStatus::Running).await?;
        }
    }

    async fn fail_step(&self, node: &NodeId, error: FsmError) -> Result<(), FsmError> {
        tracing::debug!(%node, %error, "step cannot continue");
        match self.observer() {
            Some(observer) => observer.on_state_failed(node, &error).await,
            None => Ok(()),
        }
    }

    async fn settle_cancelled(&self) {
        if let Err(err) = self.transition_to(ExecutionStatus::Cancelled).await {
            tracing::warn!(error = %err, "observer failed while recording cancellation");
        }
        self.settle_reset().await;
    }

    async fn settle_failed(&self, error: &FsmError) {
        let current = self.current();
        if let Some(observer) = self.observer()
            && let Err(err) = observer.on_state_failed(&current, error).await
        {
            tracing::warn!(error = %err, node = %current, "observer failed while recording a node error");
        }
        if let Err(err) = self.transition_to(ExecutionStatus::Failed).await {
            tracing::warn!(error = %err, "observer failed while recording failure");
        }
        self.settle_reset().await;
    }

    async fn settle_reset(&self) {
        if !self.auto_reset() {
            return;
        }
        if let Err(err) = self.reset().await {
            tracing::warn!(error = %err, "observer failed during auto-reset");
        }
    }

    async fn transition_to(&self, next: ExecutionStatus) -> Result<(), FsmError> {
        let prev = self.status.swap(next);
        if prev == next {
            return Ok(());
        }
        tracing::debug!(graph = %self.graph.id(), %prev, %next, "status changed");
        self.notify_status(prev, next).await
    }

    async fn notify_status(
        &self,
        prev: ExecutionStatus,
        next: ExecutionStatus,
    ) -> Result<(), FsmError> {
        let Some(observer) = self.observer() else {
            return Ok(());
        };
        let graph = self.graph.id();
        observer.on_status_changed(graph, prev, next).await?;
        match next {
            ExecutionStatus::Starting => observer.on_machine_started(graph).await,
            ExecutionStatus::Completed => {
                observer.on_machine_completed(graph, Outcome::Success).await
            }
            ExecutionStatus::Failed => observer.on_machine_completed(graph, Outcome::Failure).await,
            ExecutionStatus::Cancelled => observer.on_machine_cancelled(graph).await,
            ExecutionStatus::Resetting => observer.on_machine_reset(graph).await,
            ExecutionStatus::Created
            | ExecutionStatus::Running
            | ExecutionStatus::Transitioning
            | ExecutionStatus::Ready => Ok(()),
        }
    }
}

impl Logic for StateMachine {
    fn execute<'a>(&'a self, cx: &'a NodeContext<'a>) -> BoxFuture<'a, Result<Outcome, FsmError>> {
        Box::pin(self.run(cx.cancellation()))
    }

    fn agent_slot(&self) -> Option<&dyn AgentSlot> {
        Some(self)
    }
}

impl AgentSlot for StateMachine {
    fn offer(&self, agent: &SharedAgent) -> usize {
        self.graph.offer(agent)
    }
}

impl core::fmt::Debug for StateMachine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StateMachine")
            .field("graph", self.graph.id())
            .field("status", &self.status())
            .field("auto_reset", &self.auto_reset())
            .finish_non_exhaustive()
    }
}

/// Holds the reentrancy gate for the duration of a run.
///
/// If the run future is dropped mid-flight, the status is republished as
/// `Ready` (auto-reset) or `Cancelled` without notifying the observer.
struct RunGuard<'a> {
    machine: &'a StateMachine,
}

impl<'a> RunGuard<'a> {
    fn acquire(machine: &'a StateMachine) -> Result<Self, FsmError> {
        if machine.gate.swap(true, Ordering::AcqRel) {
            return Err(FsmError::AlreadyRunning);
        }
        Ok(Self { machine })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let machine = self.machine;
        let status = machine.status.load();
        if status.is_active() || status == ExecutionStatus::Resetting {
            let settled = if machine.auto_reset() {
                machine.cursor.store(NodeId::START.index(), Ordering::Release);
                ExecutionStatus::Ready
            } else {
                ExecutionStatus::Cancelled
            };
            machine.status.swap(settled);
            tracing::warn!(graph = %machine.graph.id(), %status, %settled, "run ended before the machine settled");
        }
        machine.gate.store(false, Ordering::Release);
    }
}
