//! Closure-backed node logic.

use core::future::Future;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::error::FsmError;
use crate::logic::{Logic, NodeContext, NodeHandle, Outcome};

/// Boxed enter/exit phase closure.
pub type PhaseFn =
    Box<dyn Fn(CancellationToken) -> BoxFuture<'static, Result<(), FsmError>> + Send + Sync>;

type RunFn =
    Box<dyn Fn(NodeHandle) -> BoxFuture<'static, Result<Outcome, FsmError>> + Send + Sync>;

/// Node logic that relays execution to closures.
///
/// Executing the node runs the optional enter phase, the main closure, then
/// the optional exit phase. The exit phase runs whatever the main closure's
/// outcome was; an error from any phase ends the node immediately.
///
/// # Example
///
/// ```ignore
/// let logic = RelayLogic::new(|_cancel| async { Ok(Outcome::Success) })
///     .on_enter(|_| async { Ok(()) });
///
/// let chatty = RelayLogic::with_handle(|node| async move {
///     node.log("scanning").await?;
///     Ok::<_, FsmError>(Outcome::Success)
/// });
/// ```
pub struct RelayLogic {
    run: RunFn,
    on_enter: Option<PhaseFn>,
    on_exit: Option<PhaseFn>,
}

impl RelayLogic {
    /// Creates relay logic from its main closure.
    #[must_use]
    pub fn new<F, Fut>(run: F) -> Self
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Outcome, FsmError>> + Send + 'static,
    {
        Self {
            run: Box::new(move |node: NodeHandle| Box::pin(run(node.cancellation().clone()))),
            on_enter: None,
            on_exit: None,
        }
    }

    /// Creates relay logic whose main closure receives a [`NodeHandle`],
    /// giving it the node's ID and log channel as well as its token.
    #[must_use]
    pub fn with_handle<F, Fut>(run: F) -> Self
    where
        F: Fn(NodeHandle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Outcome, FsmError>> + Send + 'static,
    {
        Self {
            run: Box::new(move |node| Box::pin(run(node))),
            on_enter: None,
            on_exit: None,
        }
    }

    /// Relay logic that always succeeds immediately.
    #[must_use]
    pub fn success() -> Self {
        Self::new(|_| async { Ok(Outcome::Success) })
    }

    /// Relay logic that always fails immediately.
    #[must_use]
    pub fn failure() -> Self {
        Self::new(|_| async { Ok(Outcome::Failure) })
    }

    /// Sets the closure run before the main closure.
    #[must_use]
    pub fn on_enter<F, Fut>(mut self, phase: F) -> Self
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), FsmError>> + Send + 'static,
    {
        self.on_enter = Some(Box::new(move |cancel| Box::pin(phase(cancel))));
        self
    }

    /// Sets the closure run after the main closure.
    #[must_use]
    pub fn on_exit<F, Fut>(mut self, phase: F) -> Self
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), FsmError>> + Send + 'static,
    {
        self.on_exit = Some(Box::new(move |cancel| Box::pin(phase(cancel))));
        self
    }
}

impl Logic for RelayLogic {
    fn execute<'a>(&'a self, cx: &'a NodeContext<'a>) -> BoxFuture<'a, Result<Outcome, FsmError>> {
        Box::pin(async move {
            let cancel = cx.cancellation();
            if let Some(enter) = &self.on_enter {
                enter(cancel.clone()).await?;
            }
            let outcome = (self.run)(cx.handle()).await?;
            if let Some(exit) = &self.on_exit {
                exit(cancel.clone()).await?;
            }
            Ok(outcome)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeId;
    use parking_lot::Mutex;
    use std::sync::Arc;

    async fn execute(logic: &RelayLogic) -> Result<Outcome, FsmError> {
        let id = NodeId::START;
        let token = CancellationToken::new();
        let cx = NodeContext::new(&id, &token);
        logic.execute(&cx).await
    }

    #[tokio::test]
    async fn phases_run_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (enter, run, exit) = (Arc::clone(&log), Arc::clone(&log), Arc::clone(&log));
        let logic = RelayLogic::new(move |_| {
            let run = Arc::clone(&run);
            async move {
                run.lock().push("run");
                Ok(Outcome::Failure)
            }
        })
        .on_enter(move |_| {
            let enter = Arc::clone(&enter);
            async move {
                enter.lock().push("enter");
                Ok(())
            }
        })
        .on_exit(move |_| {
            let exit = Arc::clone(&exit);
            async move {
                exit.lock().push("exit");
                Ok(())
            }
        });

        assert_eq!(execute(&logic).await.unwrap(), Outcome::Failure);
        assert_eq!(*log.lock(), vec!["enter", "run", "exit"]);
    }

    #[tokio::test]
    async fn enter_error_skips_run() {
        let ran = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&ran);
        let logic = RelayLogic::new(move |_| {
            *flag.lock() = true;
            async { Ok(Outcome::Success) }
        })
        .on_enter(|_| async { Err(FsmError::logic("enter failed")) });

        assert!(matches!(execute(&logic).await, Err(FsmError::Logic(_))));
        assert!(!*ran.lock());
    }

    #[tokio::test]
    async fn exit_error_propagates() {
        let logic = RelayLogic::success().on_exit(|_| async { Err(FsmError::logic("exit failed")) });
        let err = execute(&logic).await.unwrap_err();
        assert_eq!(err.to_string(), "node logic failed: exit failed");
    }

    #[tokio::test]
    async fn constant_outcomes() {
        assert_eq!(execute(&RelayLogic::success()).await.unwrap(), Outcome::Success);
        assert_eq!(execute(&RelayLogic::failure()).await.unwrap(), Outcome::Failure);
    }
}
