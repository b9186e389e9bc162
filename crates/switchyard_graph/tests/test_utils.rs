//! Shared test utilities for `switchyard_graph` integration tests.
//!
//! This module provides common logic, observers and graph helpers used
//! across multiple test files. Import via `mod test_utils;` in test files.

#![allow(
    dead_code,
    missing_docs,
    reason = "shared test utilities; not all items used in every test binary"
)]

use std::sync::Arc;

use futures::future::{self, BoxFuture};
use parking_lot::Mutex;
use switchyard_graph::builder::GraphBuilder;
use switchyard_graph::error::FsmError;
use switchyard_graph::graph::Graph;
use switchyard_graph::logic::{Logic, NodeContext, Outcome, RelayLogic};
use switchyard_graph::node::NodeId;
use switchyard_graph::observer::{HookFuture, Observer, done};
use switchyard_graph::status::ExecutionStatus;

// ═══════════════════════════════════════════════════════════════════════════════
// TRACKING
// ═══════════════════════════════════════════════════════════════════════════════

/// Ordered, shareable list of labels pushed by test logic.
#[derive(Clone, Default)]
pub struct Tracker(Arc<Mutex<Vec<String>>>);

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, label: impl Into<String>) {
        self.0.lock().push(label.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn count(&self, label: &str) -> usize {
        self.0.lock().iter().filter(|entry| *entry == label).count()
    }
}

/// Relay logic that pushes `label` and succeeds.
pub fn track(tracker: &Tracker, label: &str) -> RelayLogic {
    let tracker = tracker.clone();
    let label = label.to_owned();
    RelayLogic::new(move |_| {
        tracker.push(label.clone());
        future::ready(Ok(Outcome::Success))
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// LOGIC
// ═══════════════════════════════════════════════════════════════════════════════

/// Logic that reports a message through the node context, then succeeds.
pub struct Say(pub &'static str);

impl Logic for Say {
    fn execute<'a>(&'a self, cx: &'a NodeContext<'a>) -> BoxFuture<'a, Result<Outcome, FsmError>> {
        Box::pin(async move {
            cx.log(self.0).await?;
            Ok(Outcome::Success)
        })
    }
}

/// Relay logic that raises a logic error.
pub fn boom(message: &'static str) -> RelayLogic {
    RelayLogic::new(move |_| future::ready(Err(FsmError::logic(message))))
}

/// Relay logic that waits until its token is cancelled.
pub fn wait_for_cancel() -> RelayLogic {
    RelayLogic::new(|cancel| async move {
        cancel.cancelled().await;
        Err(FsmError::Cancelled)
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// GRAPH HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

/// A linear graph of `len` nodes, each pushing `"n{i}"` into `tracker`.
pub fn tracked_chain(tracker: &Tracker, len: usize) -> Graph {
    let mut builder = GraphBuilder::new();
    let mut last = builder.add_node(track(tracker, "n0"));
    for i in 1..len {
        last = builder
            .chain(&last, track(tracker, &format!("n{i}")))
            .expect("chain");
    }
    builder.build().expect("build")
}

/// A linear graph of `len` always-succeeding nodes.
pub fn success_chain(len: usize) -> Graph {
    let mut builder = GraphBuilder::new();
    let mut last = builder.add_node(RelayLogic::success());
    for _ in 1..len {
        last = builder.chain(&last, RelayLogic::success()).expect("chain");
    }
    builder.build().expect("build")
}

// ═══════════════════════════════════════════════════════════════════════════════
// OBSERVERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Records every hook as a compact string.
///
/// Optionally fails `on_state_entered` for one node, after recording it.
#[derive(Default)]
pub struct EventLog {
    events: Mutex<Vec<String>>,
    fail_on_enter: Option<i32>,
}

impl EventLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_on_enter(index: i32) -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::default(),
            fail_on_enter: Some(index),
        })
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    fn push(&self, event: String) -> HookFuture<'_> {
        self.events.lock().push(event);
        done()
    }
}

impl Observer for EventLog {
    fn on_state_entered<'a>(&'a self, node: &'a NodeId) -> HookFuture<'a> {
        self.events.lock().push(format!("entered {}", node.index()));
        if self.fail_on_enter == Some(node.index()) {
            return Box::pin(future::ready(Err(FsmError::observer("observer refused"))));
        }
        done()
    }

    fn on_state_exited<'a>(&'a self, node: &'a NodeId) -> HookFuture<'a> {
        self.push(format!("exited {}", node.index()))
    }

    fn on_transition<'a>(&'a self, from: &'a NodeId, to: &'a NodeId) -> HookFuture<'a> {
        self.push(format!("transition {}->{}", from.index(), to.index()))
    }

    fn on_state_failed<'a>(&'a self, node: &'a NodeId, _error: &'a FsmError) -> HookFuture<'a> {
        self.push(format!("failed {}", node.index()))
    }

    fn on_machine_started<'a>(&'a self, _graph: &'a NodeId) -> HookFuture<'a> {
        self.push("started".into())
    }

    fn on_machine_completed<'a>(&'a self, _graph: &'a NodeId, outcome: Outcome) -> HookFuture<'a> {
        self.push(format!("completed {outcome}"))
    }

    fn on_machine_cancelled<'a>(&'a self, _graph: &'a NodeId) -> HookFuture<'a> {
        self.push("cancelled".into())
    }

    fn on_machine_reset<'a>(&'a self, _graph: &'a NodeId) -> HookFuture<'a> {
        self.push("reset".into())
    }

    fn on_status_changed<'a>(
        &'a self,
        _graph: &'a NodeId,
        prev: ExecutionStatus,
        next: ExecutionStatus,
    ) -> HookFuture<'a> {
        self.push(format!("status {prev}->{next}"))
    }

    fn on_log<'a>(&'a self, node: &'a NodeId, message: &'a str) -> HookFuture<'a> {
        self.push(format!("log {} {message}", node.index()))
    }
}
