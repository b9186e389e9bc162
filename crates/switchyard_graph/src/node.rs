//! Node identity, node payloads and static transitions.
//!
//! A graph stores its nodes in a dense array; a [`NodeId`] is an index into
//! that array plus an optional display name. Names are diagnostic only:
//! equality and hashing look at the index alone.

use core::fmt;
use core::hash::{Hash, Hasher};
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::FsmError;
use crate::executor::StateMachine;
use crate::graph::Graph;
use crate::logic::{Director, Logic, NodeContext, Outcome};

/// Identifier of a node within a graph.
#[derive(Debug, Clone)]
pub struct NodeId {
    index: i32,
    name: Option<Arc<str>>,
}

impl NodeId {
    /// The entry node of every graph (index 0).
    pub const START: NodeId = NodeId {
        index: 0,
        name: None,
    };

    /// Sentinel meaning "no such node". A director returning it ends the run.
    pub const NONE: NodeId = NodeId {
        index: -1,
        name: None,
    };

    /// Creates an unnamed node ID.
    #[must_use]
    pub fn new(index: i32) -> Self {
        Self { index, name: None }
    }

    /// Attaches a display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns the raw index.
    #[must_use]
    pub fn index(&self) -> i32 {
        self.index
    }

    /// Returns the display name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the array slot this ID addresses, or `None` for negative indices.
    #[must_use]
    pub fn slot(&self) -> Option<usize> {
        usize::try_from(self.index).ok()
    }

    /// Returns `true` for the [`NodeId::NONE`] sentinel.
    #[must_use]
    pub fn is_none(&self) -> bool {
        self.index == Self::NONE.index
    }

    /// Returns `true` for the [`NodeId::START`] node.
    #[must_use]
    pub fn is_start(&self) -> bool {
        self.index == Self::START.index
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::NONE
    }
}

impl PartialEq for NodeId {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl Eq for NodeId {}

impl Hash for NodeId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name}({})", self.index),
            None => write!(f, "node_{}", self.index),
        }
    }
}

/// The single static outgoing edge of a node.
///
/// An empty transition marks the node as a static terminal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transition {
    destination: Option<NodeId>,
}

impl Transition {
    /// A transition leading nowhere.
    #[must_use]
    pub fn empty() -> Self {
        Self { destination: None }
    }

    /// A transition to `destination`.
    #[must_use]
    pub fn to(destination: NodeId) -> Self {
        Self {
            destination: Some(destination),
        }
    }

    /// Returns the destination, if any.
    #[must_use]
    pub fn destination(&self) -> Option<&NodeId> {
        self.destination.as_ref()
    }

    /// Returns `true` if this transition ends the run.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.destination.is_none()
    }
}

/// What a node runs when the engine reaches it.
pub enum NodeKind {
    /// Leaf logic.
    Logic(Box<dyn Logic>),
    /// A fully configured state machine run to completion as one step.
    ///
    /// The machine keeps its own observer and auto-reset setting; the parent
    /// never resets it.
    Machine(Arc<StateMachine>),
    /// A bare graph, run on a fresh machine each time the node executes.
    Graph(Arc<Graph>),
}

impl NodeKind {
    /// Executes the payload and returns its outcome.
    pub fn execute<'a>(
        &'a self,
        cx: &'a NodeContext<'a>,
    ) -> BoxFuture<'a, Result<Outcome, FsmError>> {
        match self {
            NodeKind::Logic(logic) => logic.execute(cx),
            NodeKind::Machine(machine) => Box::pin(machine.run(cx.cancellation())),
            NodeKind::Graph(graph) => Box::pin(async move {
                StateMachine::new(Arc::clone(graph))
                    .run(cx.cancellation())
                    .await
            }),
        }
    }

    /// Returns the director capability of leaf logic.
    #[must_use]
    pub fn director(&self) -> Option<&dyn Director> {
        match self {
            NodeKind::Logic(logic) => logic.director(),
            NodeKind::Machine(_) | NodeKind::Graph(_) => None,
        }
    }

    /// Returns the nested graph for machine and sub-graph payloads.
    #[must_use]
    pub fn nested_graph(&self) -> Option<&Arc<Graph>> {
        match self {
            NodeKind::Logic(_) => None,
            NodeKind::Machine(machine) => Some(machine.graph()),
            NodeKind::Graph(graph) => Some(graph),
        }
    }
}

impl fmt::Debug for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Logic(logic) => f
                .debug_struct("Logic")
                .field("director", &logic.director().is_some())
                .finish(),
            NodeKind::Machine(machine) => f
                .debug_tuple("Machine")
                .field(machine.graph().id())
                .finish(),
            NodeKind::Graph(graph) => f.debug_tuple("Graph").field(graph.id()).finish(),
        }
    }
}

/// A node placed in a graph: an ID paired with its payload.
#[derive(Debug)]
pub struct Node {
    id: NodeId,
    kind: NodeKind,
}

impl Node {
    /// Creates a node from any leaf logic.
    #[must_use]
    pub fn new(id: NodeId, logic: impl Logic) -> Self {
        Self::from_kind(id, NodeKind::Logic(Box::new(logic)))
    }

    /// Creates a node with an explicit payload.
    #[must_use]
    pub fn from_kind(id: NodeId, kind: NodeKind) -> Self {
        Self { id, kind }
    }

    /// Returns the node's ID.
    #[must_use]
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// Returns the node's payload.
    #[must_use]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashbrown::HashSet;

    #[test]
    fn equality_ignores_name() {
        let a = NodeId::new(4).with_name("fetch");
        let b = NodeId::new(4);
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn sentinels() {
        assert!(NodeId::START.is_start());
        assert!(NodeId::NONE.is_none());
        assert_eq!(NodeId::NONE.slot(), None);
        assert_eq!(NodeId::START.slot(), Some(0));
        assert_eq!(NodeId::default(), NodeId::NONE);
    }

    #[test]
    fn display() {
        assert_eq!(NodeId::new(2).to_string(), "node_2");
        assert_eq!(NodeId::new(2).with_name("load").to_string(), "load(2)");
    }

    #[test]
    fn transitions() {
        assert!(Transition::empty().is_empty());
        let t = Transition::to(NodeId::new(1));
        assert_eq!(t.destination(), Some(&NodeId::new(1)));
    }
}
