//! Director logic for conditional and multi-way branching.

use core::hash::Hash;

use futures::future::{self, BoxFuture};
use hashbrown::HashMap;

use crate::error::FsmError;
use crate::logic::{Director, Logic, NodeContext, Outcome};
use crate::node::NodeId;

/// Two-way branch: picks `then` or `otherwise` from a predicate.
///
/// The predicate is evaluated when the engine asks for the next node, after
/// the choice node itself has succeeded.
pub struct ChoiceLogic {
    predicate: Box<dyn Fn() -> bool + Send + Sync>,
    then: NodeId,
    otherwise: NodeId,
}

impl ChoiceLogic {
    /// Creates a choice between two destinations.
    #[must_use]
    pub fn new<P>(predicate: P, then: NodeId, otherwise: NodeId) -> Self
    where
        P: Fn() -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Box::new(predicate),
            then,
            otherwise,
        }
    }
}

impl Logic for ChoiceLogic {
    fn execute<'a>(&'a self, _cx: &'a NodeContext<'a>) -> BoxFuture<'a, Result<Outcome, FsmError>> {
        Box::pin(future::ready(Ok(Outcome::Success)))
    }

    fn director(&self) -> Option<&dyn Director> {
        Some(self)
    }
}

impl Director for ChoiceLogic {
    fn select_next(&self) -> NodeId {
        if (self.predicate)() {
            self.then.clone()
        } else {
            self.otherwise.clone()
        }
    }
}

/// Multi-way branch keyed by the value a selector returns.
///
/// Keys without a case go to the default destination, which is
/// [`NodeId::NONE`] (end the run successfully) unless set.
pub struct SwitchLogic<K> {
    selector: Box<dyn Fn() -> K + Send + Sync>,
    cases: HashMap<K, NodeId>,
    default: NodeId,
}

impl<K> SwitchLogic<K>
where
    K: Eq + Hash + Send + Sync + 'static,
{
    /// Creates a switch with no cases.
    #[must_use]
    pub fn new<S>(selector: S) -> Self
    where
        S: Fn() -> K + Send + Sync + 'static,
    {
        Self {
            selector: Box::new(selector),
            cases: HashMap::new(),
            default: NodeId::NONE,
        }
    }

    /// Routes `key` to `destination`.
    #[must_use]
    pub fn case(mut self, key: K, destination: NodeId) -> Self {
        self.cases.insert(key, destination);
        self
    }

    /// Sets the destination for unmatched keys.
    #[must_use]
    pub fn default_to(mut self, destination: NodeId) -> Self {
        self.default = destination;
        self
    }
}

impl<K> Logic for SwitchLogic<K>
where
    K: Eq + Hash + Send + Sync + 'static,
{
    fn execute<'a>(&'a self, _cx: &'a NodeContext<'a>) -> BoxFuture<'a, Result<Outcome, FsmError>> {
        Box::pin(future::ready(Ok(Outcome::Success)))
    }

    fn director(&self) -> Option<&dyn Director> {
        Some(self)
    }
}

impl<K> Director for SwitchLogic<K>
where
    K: Eq + Hash + Send + Sync + 'static,
{
    fn select_next(&self) -> NodeId {
        let key = (self.selector)();
        self.cases.get(&key).unwrap_or(&self.default).clone()
    }
}
