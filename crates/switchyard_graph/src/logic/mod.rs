//! The executable-unit contract and the built-in execution primitives.
//!
//! Every node payload implements [`Logic`]: execute asynchronously, observe the
//! cancellation token, and finish with an [`Outcome`]. Extra behavior is
//! layered on as optional capabilities that the engine queries at run time:
//!
//! - [`Director`]: picks the next node after a successful execution,
//!   overriding the node's static transition.
//! - [`AgentSlot`]: accepts an externally supplied agent value.
//!
//! The log pseudo-channel is reached through [`NodeContext::log`], or
//! [`NodeHandle::log`] from closure-backed logic.

use core::any::Any;
use core::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::error::FsmError;
use crate::node::NodeId;
use crate::observer::Observer;

mod agent;
mod branch;
mod delay;
mod relay;
mod timeout;

pub use agent::{AgentCell, AgentRelay};
pub use branch::{ChoiceLogic, SwitchLogic};
pub use delay::DelayLogic;
pub use relay::{PhaseFn, RelayLogic};
pub use timeout::{HandlePool, TimeoutBehavior, TimeoutLogic};

/// Result of executing one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The node finished its work.
    Success,
    /// The node finished without achieving its goal. Ends the run.
    Failure,
}

impl Outcome {
    /// Returns `true` for [`Outcome::Success`].
    #[must_use]
    pub fn is_success(self) -> bool {
        self == Outcome::Success
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => f.write_str("Success"),
            Outcome::Failure => f.write_str("Failure"),
        }
    }
}

/// Executable unit placed in a graph node.
///
/// # Example
///
/// ```ignore
/// struct Ping;
///
/// impl Logic for Ping {
///     fn execute<'a>(&'a self, cx: &'a NodeContext<'a>) -> BoxFuture<'a, Result<Outcome, FsmError>> {
///         Box::pin(async move {
///             cx.log("ping").await?;
///             Ok(Outcome::Success)
///         })
///     }
/// }
/// ```
pub trait Logic: Send + Sync + 'static {
    /// Runs the node's work.
    fn execute<'a>(&'a self, cx: &'a NodeContext<'a>) -> BoxFuture<'a, Result<Outcome, FsmError>>;

    /// Returns the director capability, if this logic chooses its own successor.
    fn director(&self) -> Option<&dyn Director> {
        None
    }

    /// Returns the agent capability, if this logic accepts an injected agent.
    fn agent_slot(&self) -> Option<&dyn AgentSlot> {
        None
    }
}

impl<L: Logic + ?Sized> Logic for Arc<L> {
    fn execute<'a>(&'a self, cx: &'a NodeContext<'a>) -> BoxFuture<'a, Result<Outcome, FsmError>> {
        (**self).execute(cx)
    }

    fn director(&self) -> Option<&dyn Director> {
        (**self).director()
    }

    fn agent_slot(&self) -> Option<&dyn AgentSlot> {
        (**self).agent_slot()
    }
}

/// Capability: choose the next node after a successful execution.
pub trait Director: Send + Sync {
    /// Returns the next node, or [`NodeId::NONE`] to end the run successfully.
    fn select_next(&self) -> NodeId;
}

/// A type-erased agent value.
pub type SharedAgent = Arc<dyn Any + Send + Sync>;

/// Capability: accept an externally supplied agent.
pub trait AgentSlot: Send + Sync {
    /// Offers an agent. Returns how many nodes accepted it (zero when the
    /// agent's type does not match).
    fn offer(&self, agent: &SharedAgent) -> usize;
}

/// Per-execution view handed to [`Logic::execute`].
#[derive(Clone, Copy)]
pub struct NodeContext<'a> {
    node: &'a NodeId,
    cancel: &'a CancellationToken,
    reporter: Option<&'a Arc<dyn Observer>>,
}

impl<'a> NodeContext<'a> {
    /// Creates a context with no log reporter attached.
    #[must_use]
    pub fn new(node: &'a NodeId, cancel: &'a CancellationToken) -> Self {
        Self {
            node,
            cancel,
            reporter: None,
        }
    }

    /// Routes [`NodeContext::log`] messages to `observer`.
    #[must_use]
    pub fn with_reporter(mut self, observer: Option<&'a Arc<dyn Observer>>) -> Self {
        self.reporter = observer;
        self
    }

    /// Returns a copy of this context observing a different cancellation token.
    #[must_use]
    pub fn with_cancellation<'b>(&'b self, cancel: &'b CancellationToken) -> NodeContext<'b> {
        NodeContext {
            node: self.node,
            cancel,
            reporter: self.reporter,
        }
    }

    /// The node being executed.
    #[must_use]
    pub fn node(&self) -> &'a NodeId {
        self.node
    }

    /// The token cancelling this execution.
    #[must_use]
    pub fn cancellation(&self) -> &'a CancellationToken {
        self.cancel
    }

    /// Returns `true` once the token has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Emits a free-text message tagged with the current node.
    ///
    /// Does nothing when the engine has no observer.
    pub async fn log(&self, message: impl AsRef<str>) -> Result<(), FsmError> {
        match self.reporter {
            Some(observer) => observer.on_log(self.node, message.as_ref()).await,
            None => Ok(()),
        }
    }

    /// Returns an owned handle to this execution.
    #[must_use]
    pub fn handle(&self) -> NodeHandle {
        NodeHandle {
            node: self.node.clone(),
            cancel: self.cancel.clone(),
            reporter: self.reporter.cloned(),
        }
    }
}

/// Owned counterpart of [`NodeContext`] for `'static` futures built by
/// closures.
#[derive(Clone)]
pub struct NodeHandle {
    node: NodeId,
    cancel: CancellationToken,
    reporter: Option<Arc<dyn Observer>>,
}

impl NodeHandle {
    /// The node being executed.
    #[must_use]
    pub fn node(&self) -> &NodeId {
        &self.node
    }

    /// The token cancelling this execution.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Returns `true` once the token has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Same as [`NodeContext::log`].
    pub async fn log(&self, message: impl AsRef<str>) -> Result<(), FsmError> {
        match &self.reporter {
            Some(observer) => observer.on_log(&self.node, message.as_ref()).await,
            None => Ok(()),
        }
    }
}

impl fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeHandle")
            .field("node", &self.node)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("reporting", &self.reporter.is_some())
            .finish()
    }
}

impl fmt::Debug for NodeContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeContext")
            .field("node", self.node)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("reporting", &self.reporter.is_some())
            .finish()
    }
}
