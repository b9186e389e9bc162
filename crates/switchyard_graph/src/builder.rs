//! Incremental graph construction.
//!
//! Node IDs are handed out sequentially; the first node added (or reserved)
//! becomes the start node.
//!
//! # Example
//!
//! ```ignore
//! use switchyard_graph::prelude::*;
//!
//! let mut builder = GraphBuilder::new();
//! let fetch = builder.add_named("fetch", RelayLogic::success());
//! let parse = builder.chain(&fetch, RelayLogic::success())?;
//! let branch = builder.add_choice(|| true, RelayLogic::success(), RelayLogic::failure());
//! builder.add_transition(&parse, &branch.choice)?;
//! let graph = builder.build()?;
//! ```

use core::hash::Hash;
use std::sync::Arc;

use crate::error::FsmError;
use crate::executor::StateMachine;
use crate::graph::Graph;
use crate::logic::{ChoiceLogic, Logic, SwitchLogic};
use crate::node::{Node, NodeId, NodeKind, Transition};

/// IDs allocated by [`GraphBuilder::add_choice`].
#[derive(Debug, Clone)]
pub struct ChoiceBranch {
    /// The deciding node.
    pub choice: NodeId,
    /// Taken when the predicate holds.
    pub then: NodeId,
    /// Taken otherwise.
    pub otherwise: NodeId,
}

/// IDs allocated by [`GraphBuilder::add_switch`].
#[derive(Debug, Clone)]
pub struct SwitchBranch {
    /// The deciding node.
    pub switch: NodeId,
    /// One node per case, in the order the cases were given.
    pub cases: Vec<NodeId>,
    /// The default node, if one was given.
    pub default: Option<NodeId>,
}

/// Builds a [`Graph`] one node at a time.
#[derive(Default)]
pub struct GraphBuilder {
    id: Option<NodeId>,
    nodes: Vec<Option<Node>>,
    edges: Vec<Option<NodeId>>,
    overflow: Option<FsmError>,
}

impl GraphBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the ID of the graph being built.
    #[must_use]
    pub fn with_graph_id(mut self, id: NodeId) -> Self {
        self.id = Some(id);
        self
    }

    /// Number of node slots allocated so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if no node has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Allocates an ID whose payload is supplied later with [`place`](Self::place).
    ///
    /// # Errors
    ///
    /// Returns [`FsmError::InvalidGraph`] once the graph has no index left.
    pub fn reserve(&mut self, name: Option<&str>) -> Result<NodeId, FsmError> {
        let index = next_index(self.nodes.len())?;
        let id = match name {
            Some(name) => NodeId::new(index).with_name(name),
            None => NodeId::new(index),
        };
        self.nodes.push(None);
        self.edges.push(None);
        Ok(id)
    }

    /// Supplies the payload of a reserved ID.
    ///
    /// # Errors
    ///
    /// Returns [`FsmError::InvalidGraph`] if `id` was not reserved by this
    /// builder or already holds a payload.
    pub fn place(&mut self, id: &NodeId, kind: NodeKind) -> Result<&mut Self, FsmError> {
        let slot = self
            .slot_of(id)
            .ok_or_else(|| FsmError::InvalidGraph(format!("node {id} was not reserved")))?;
        let entry = &mut self.nodes[slot];
        if entry.is_some() {
            return Err(FsmError::InvalidGraph(format!("node {id} is already placed")));
        }
        *entry = Some(Node::from_kind(id.clone(), kind));
        Ok(self)
    }

    /// Adds a node with an explicit payload.
    ///
    /// Running out of indices returns [`NodeId::NONE`] and fails [`build`](Self::build).
    pub fn add_kind(&mut self, name: Option<&str>, kind: NodeKind) -> NodeId {
        let id = self.allocate(name);
        self.fill(&id, Node::from_kind(id.clone(), kind));
        id
    }

    /// Adds an unnamed leaf node.
    pub fn add_node(&mut self, logic: impl Logic) -> NodeId {
        self.add_kind(None, NodeKind::Logic(Box::new(logic)))
    }

    /// Adds a named leaf node.
    pub fn add_named(&mut self, name: &str, logic: impl Logic) -> NodeId {
        self.add_kind(Some(name), NodeKind::Logic(Box::new(logic)))
    }

    /// Adds a node running a nested state machine.
    pub fn add_machine(&mut self, machine: Arc<StateMachine>) -> NodeId {
        self.add_kind(None, NodeKind::Machine(machine))
    }

    /// Adds a node running a nested graph on a fresh machine.
    pub fn add_subgraph(&mut self, graph: Arc<Graph>) -> NodeId {
        self.add_kind(None, NodeKind::Graph(graph))
    }

    /// Adds a leaf node and a transition to it from `from`.
    ///
    /// # Errors
    ///
    /// Fails as [`add_transition`](Self::add_transition) does.
    pub fn chain(&mut self, from: &NodeId, logic: impl Logic) -> Result<NodeId, FsmError> {
        let to = self.add_node(logic);
        self.add_transition(from, &to)?;
        Ok(to)
    }

    /// Sets the static transition leaving `from`.
    ///
    /// The destination is not checked here; the engine resolves it lazily.
    ///
    /// # Errors
    ///
    /// - [`FsmError::DuplicateTransition`] if `from` already has one.
    /// - [`FsmError::InvalidGraph`] if `from` was not allocated by this builder.
    pub fn add_transition(&mut self, from: &NodeId, to: &NodeId) -> Result<&mut Self, FsmError> {
        let slot = self
            .slot_of(from)
            .ok_or_else(|| FsmError::InvalidGraph(format!("unknown source node {from}")))?;
        let edge = &mut self.edges[slot];
        if edge.is_some() {
            return Err(FsmError::DuplicateTransition(from.clone()));
        }
        *edge = Some(to.clone());
        Ok(self)
    }

    /// Adds a two-way branch and its two destination nodes.
    pub fn add_choice<P>(
        &mut self,
        predicate: P,
        then: impl Logic,
        otherwise: impl Logic,
    ) -> ChoiceBranch
    where
        P: Fn() -> bool + Send + Sync + 'static,
    {
        let choice = self.allocate(None);
        let then = self.add_node(then);
        let otherwise = self.add_node(otherwise);
        let logic = ChoiceLogic::new(predicate, then.clone(), otherwise.clone());
        self.fill(&choice, Node::new(choice.clone(), logic));
        ChoiceBranch {
            choice,
            then,
            otherwise,
        }
    }

    /// Adds a multi-way branch, one node per case and an optional default.
    ///
    /// Without a default, an unmatched key ends the run successfully.
    pub fn add_switch<K, S>(
        &mut self,
        selector: S,
        cases: impl IntoIterator<Item = (K, Box<dyn Logic>)>,
        default: Option<Box<dyn Logic>>,
    ) -> SwitchBranch
    where
        K: Eq + Hash + Send + Sync + 'static,
        S: Fn() -> K + Send + Sync + 'static,
    {
        let switch = self.allocate(None);
        let mut logic = SwitchLogic::new(selector);
        let mut case_ids = Vec::new();
        for (key, case) in cases {
            let id = self.add_kind(None, NodeKind::Logic(case));
            logic = logic.case(key, id.clone());
            case_ids.push(id);
        }
        let default = default.map(|fallback| self.add_kind(None, NodeKind::Logic(fallback)));
        if let Some(fallback) = &default {
            logic = logic.default_to(fallback.clone());
        }
        self.fill(&switch, Node::new(switch.clone(), logic));
        SwitchBranch {
            switch,
            cases: case_ids,
            default,
        }
    }

    /// Finishes the graph.
    ///
    /// # Errors
    ///
    /// Returns [`FsmError::InvalidGraph`] if no node was added, a reserved
    /// ID was never placed, or the builder ran out of indices.
    pub fn build(self) -> Result<Graph, FsmError> {
        if let Some(err) = self.overflow {
            return Err(err);
        }
        let mut nodes = Vec::with_capacity(self.nodes.len());
        for (slot, node) in self.nodes.into_iter().enumerate() {
            let node = node
                .ok_or_else(|| FsmError::InvalidGraph(format!("node_{slot} reserved but never placed")))?;
            nodes.push(node);
        }
        let edges = self
            .edges
            .into_iter()
            .map(|edge| edge.map_or_else(Transition::empty, Transition::to))
            .collect();
        let graph = Graph::new(nodes, edges)?;
        Ok(match self.id {
            Some(id) => graph.with_id(id),
            None => graph,
        })
    }

    fn slot_of(&self, id: &NodeId) -> Option<usize> {
        id.slot().filter(|slot| *slot < self.nodes.len())
    }

    fn allocate(&mut self, name: Option<&str>) -> NodeId {
        match self.reserve(name) {
            Ok(id) => id,
            Err(err) => {
                if self.overflow.is_none() {
                    self.overflow = Some(err);
                }
                NodeId::NONE
            }
        }
    }

    fn fill(&mut self, id: &NodeId, node: Node) {
        if let Some(slot) = self.slot_of(id) {
            self.nodes[slot] = Some(node);
        }
    }
}

fn next_index(len: usize) -> Result<i32, FsmError> {
    i32::try_from(len)
        .map_err(|_| FsmError::InvalidGraph(format!("node index {len} does not fit in an i32")))
}
