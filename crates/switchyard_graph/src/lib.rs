//! Hierarchical graph state machines for async Rust.
//!
//! `switchyard_graph` runs a directed graph of nodes, one at a time, from a
//! start node until a node has nowhere left to go. Each node either runs a
//! piece of [`Logic`](logic::Logic), a nested [`StateMachine`] or a nested
//! [`Graph`]. Successors come from the node's static transition or, for
//! branching nodes, from a [`Director`](logic::Director) consulted at run
//! time.
//!
//! # Core Concepts
//!
//! - [`NodeId`] - Index-based node identity with an optional name
//! - [`Graph`] - Immutable, index-aligned nodes and transitions
//! - [`GraphBuilder`] - Incremental construction API
//! - [`StateMachine`] - The engine: status lifecycle, run guard, observers
//! - [`Observer`] - Async lifecycle hooks with a fixed event order
//! - [`ReplayRecorder`] - Ring-buffer recorder with a binary codec
//!
//! # Example
//!
//! ```ignore
//! use switchyard_graph::prelude::*;
//!
//! let mut builder = GraphBuilder::new();
//! let start = builder.add_named("load", RelayLogic::success());
//! builder.chain(&start, DelayLogic::from_millis(50))?;
//!
//! let machine = StateMachine::new(builder.build()?).with_auto_reset(true);
//! let outcome = machine.run(&CancellationToken::new()).await?;
//! assert!(outcome.is_success());
//! ```

/// Error types shared by every module.
pub mod error;

/// Node identity, transitions and node payloads.
pub mod node;

/// Graph storage and agent injection.
pub mod graph;

/// Incremental graph construction.
pub mod builder;

/// Execution primitives: relays, branches, timeouts, delays, agents.
pub mod logic;

/// Engine status lifecycle.
pub mod status;

/// Lifecycle hooks.
pub mod observer;

/// The state machine engine.
pub mod executor;

/// Event recording and deterministic replay.
pub mod replay;

/// Static graph analysis.
pub mod validation;

/// Mermaid flowchart export.
pub mod export;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::builder::{ChoiceBranch, GraphBuilder, SwitchBranch};
    pub use crate::error::{BoxError, FsmError};
    pub use crate::executor::StateMachine;
    pub use crate::export::{FlowDirection, MermaidOptions, to_mermaid};
    pub use crate::graph::Graph;
    pub use crate::logic::{
        AgentCell, AgentRelay, AgentSlot, ChoiceLogic, DelayLogic, Director, HandlePool, Logic,
        NodeContext, NodeHandle, Outcome, RelayLogic, SwitchLogic, TimeoutBehavior, TimeoutLogic,
    };
    pub use crate::node::{Node, NodeId, NodeKind, Transition};
    pub use crate::observer::{HookFuture, Observer, ObserverChain};
    pub use crate::replay::{EventKind, Replay, ReplayEvent, ReplayRecorder};
    pub use crate::status::ExecutionStatus;
    pub use crate::validation::{Severity, ValidationOptions, ValidationReport, validate};
    pub use tokio_util::sync::CancellationToken;
}

// Re-export key types at crate root for convenience
pub use builder::GraphBuilder;
pub use error::FsmError;
pub use executor::StateMachine;
pub use graph::Graph;
pub use node::NodeId;
pub use observer::Observer;
pub use replay::ReplayRecorder;
pub use status::ExecutionStatus;
pub use tokio_util::sync::CancellationToken;
