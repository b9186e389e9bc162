//! Immutable, index-aligned graph storage.
//!
//! `nodes[i]` and `edges[i]` both describe node `i`. Lookups are O(1) and
//! return `None` for out-of-range or stale IDs; the engine decides whether
//! a miss is fatal.

use core::any::{Any, type_name};
use std::sync::Arc;

use crate::error::FsmError;
use crate::logic::{AgentSlot, SharedAgent};
use crate::node::{Node, NodeId, NodeKind, Transition};

/// A directed graph of nodes with at most one static transition per node.
///
/// Build one with [`GraphBuilder`](crate::builder::GraphBuilder) or
/// [`Graph::new`].
#[derive(Debug)]
pub struct Graph {
    id: NodeId,
    nodes: Vec<Node>,
    edges: Vec<Transition>,
}

impl Graph {
    /// Creates a graph from index-aligned node and transition arrays.
    ///
    /// # Errors
    ///
    /// Returns [`FsmError::InvalidGraph`] if the arrays are empty, differ in
    /// length, or a node's ID does not match its position.
    pub fn new(nodes: Vec<Node>, edges: Vec<Transition>) -> Result<Self, FsmError> {
        if nodes.is_empty() {
            return Err(FsmError::InvalidGraph("graph has no nodes".into()));
        }
        if nodes.len() != edges.len() {
            return Err(FsmError::InvalidGraph(format!(
                "{} nodes but {} transitions",
                nodes.len(),
                edges.len()
            )));
        }
        for (slot, node) in nodes.iter().enumerate() {
            if node.id().slot() != Some(slot) {
                return Err(FsmError::InvalidGraph(format!(
                    "node {} stored at index {slot}",
                    node.id()
                )));
            }
        }
        Ok(Self {
            id: NodeId::NONE,
            nodes,
            edges,
        })
    }

    /// Sets the graph's own ID, reported to machine-level observer hooks.
    #[must_use]
    pub fn with_id(mut self, id: NodeId) -> Self {
        self.id = id;
        self
    }

    /// The graph's own ID.
    #[must_use]
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// Looks up a node by ID.
    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        let node = self.nodes.get(id.slot()?)?;
        (node.id() == id).then_some(node)
    }

    /// Looks up the static transition leaving `from`.
    #[must_use]
    pub fn transition(&self, from: &NodeId) -> Option<&Transition> {
        self.edges.get(from.slot()?)
    }

    /// The entry node.
    #[must_use]
    pub fn start_node(&self) -> &Node {
        &self.nodes[0]
    }

    /// All nodes, in index order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// All transitions, in index order.
    #[must_use]
    pub fn edges(&self) -> &[Transition] {
        &self.edges
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of transition slots (one per node, empty or not).
    #[must_use]
    pub fn transition_count(&self) -> usize {
        self.edges.len()
    }

    /// Pushes `agent` into every node that accepts a `T`, including nodes of
    /// nested machines and sub-graphs.
    ///
    /// Returns the number of nodes that accepted it.
    ///
    /// # Errors
    ///
    /// Returns [`FsmError::NoAgentTarget`] if no node accepts a `T`.
    pub fn set_agent<T: Any + Send + Sync>(&self, agent: Arc<T>) -> Result<usize, FsmError> {
        let agent: SharedAgent = agent;
        match self.offer(&agent) {
            0 => Err(FsmError::NoAgentTarget(type_name::<T>())),
            accepted => {
                tracing::debug!(graph = %self.id, agent = type_name::<T>(), accepted, "agent injected");
                Ok(accepted)
            }
        }
    }
}

impl AgentSlot for Graph {
    fn offer(&self, agent: &SharedAgent) -> usize {
        self.nodes
            .iter()
            .map(|node| match node.kind() {
                NodeKind::Logic(logic) => logic.agent_slot().map_or(0, |slot| slot.offer(agent)),
                NodeKind::Machine(machine) => machine.graph().offer(agent),
                NodeKind::Graph(graph) => graph.offer(agent),
            })
            .sum()
    }
}
