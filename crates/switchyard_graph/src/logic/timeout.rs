//! Timeout decorator and its pool of cancellation handles.

use core::time::Duration;
use std::sync::{Arc, LazyLock};

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::FsmError;
use crate::logic::{AgentSlot, Director, Logic, NodeContext, Outcome};

const DEFAULT_POOL_CAPACITY: usize = 64;

static SHARED_POOL: LazyLock<Arc<HandlePool>> =
    LazyLock::new(|| Arc::new(HandlePool::new(DEFAULT_POOL_CAPACITY)));

/// What a [`TimeoutLogic`] does when its deadline passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeoutBehavior {
    /// Finish the node with [`Outcome::Failure`].
    #[default]
    Fail,
    /// Raise [`FsmError::Timeout`].
    Throw,
}

/// Free list of internal cancellation handles used by [`TimeoutLogic`].
///
/// A cancelled token can never be un-cancelled, so only tokens that finished
/// their invocation uncancelled go back on the list; the rest are dropped.
#[derive(Debug)]
pub struct HandlePool {
    idle: Mutex<Vec<CancellationToken>>,
    capacity: usize,
}

impl HandlePool {
    /// Creates a pool retaining at most `capacity` idle handles.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
        }
    }

    /// The process-wide pool used when none is configured.
    #[must_use]
    pub fn shared() -> Arc<HandlePool> {
        Arc::clone(&SHARED_POOL)
    }

    /// Takes an uncancelled handle, reusing an idle one when possible.
    #[must_use]
    pub fn acquire(&self) -> CancellationToken {
        let mut idle = self.idle.lock();
        while let Some(token) = idle.pop() {
            if !token.is_cancelled() {
                return token;
            }
        }
        CancellationToken::new()
    }

    /// Returns a handle after use. Cancelled handles are discarded.
    pub fn release(&self, token: CancellationToken) {
        if token.is_cancelled() {
            return;
        }
        let mut idle = self.idle.lock();
        if idle.len() < self.capacity {
            idle.push(token);
        }
    }

    /// Number of idle handles ready for reuse.
    #[must_use]
    pub fn idle(&self) -> usize {
        self.idle.lock().len()
    }
}

impl Default for HandlePool {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_CAPACITY)
    }
}

/// Wraps logic with a deadline.
///
/// The inner logic observes an internal handle that is cancelled when the
/// deadline passes or the caller's token is cancelled. The inner logic is
/// then awaited until it returns, so a nested machine settles and notifies
/// its observer before the decorator reports. Inner logic that ignores its
/// cancellation handle delays the decorator until it finishes.
///
/// Cancellation of the caller's token always surfaces as
/// [`FsmError::Cancelled`], even when the deadline is also due.
///
/// Director and agent capabilities of the inner logic pass through.
pub struct TimeoutLogic {
    inner: Box<dyn Logic>,
    timeout: Duration,
    behavior: TimeoutBehavior,
    pool: Arc<HandlePool>,
}

impl TimeoutLogic {
    /// Wraps `inner` with a deadline of `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`FsmError::InvalidTimeout`] if `timeout` is zero.
    pub fn new(
        inner: impl Logic,
        timeout: Duration,
        behavior: TimeoutBehavior,
    ) -> Result<Self, FsmError> {
        if timeout.is_zero() {
            return Err(FsmError::InvalidTimeout(timeout));
        }
        Ok(Self {
            inner: Box::new(inner),
            timeout,
            behavior,
            pool: HandlePool::shared(),
        })
    }

    /// Draws internal handles from `pool` instead of the shared one.
    #[must_use]
    pub fn with_pool(mut self, pool: Arc<HandlePool>) -> Self {
        self.pool = pool;
        self
    }

    /// The configured deadline.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The configured expiry behavior.
    #[must_use]
    pub fn behavior(&self) -> TimeoutBehavior {
        self.behavior
    }

    fn expire(&self) -> Result<Outcome, FsmError> {
        match self.behavior {
            TimeoutBehavior::Fail => Ok(Outcome::Failure),
            TimeoutBehavior::Throw => Err(FsmError::Timeout(self.timeout)),
        }
    }
}

enum Race {
    Finished(Result<Outcome, FsmError>),
    Cancelled,
    Expired,
}

/// Lets cancelled inner logic finish on its own so nested machines settle
/// and notify their observers.
async fn unwind(inner: BoxFuture<'_, Result<Outcome, FsmError>>, cx: &NodeContext<'_>) {
    if let Err(err) = inner.await
        && !err.is_cancellation()
    {
        tracing::debug!(node = %cx.node(), error = %err, "inner logic failed while unwinding");
    }
}

impl Logic for TimeoutLogic {
    fn execute<'a>(&'a self, cx: &'a NodeContext<'a>) -> BoxFuture<'a, Result<Outcome, FsmError>> {
        Box::pin(async move {
            let external = cx.cancellation();
            let internal = self.pool.acquire();
            let result = {
                let inner_cx = cx.with_cancellation(&internal);
                let mut inner = self.inner.execute(&inner_cx);
                let race = tokio::select! {
                    biased;
                    () = external.cancelled() => Race::Cancelled,
                    result = &mut inner => Race::Finished(result),
                    () = tokio::time::sleep(self.timeout) => Race::Expired,
                };
                match race {
                    Race::Finished(_) if external.is_cancelled() => Err(FsmError::Cancelled),
                    Race::Finished(result) => result,
                    Race::Cancelled => {
                        internal.cancel();
                        unwind(inner, cx).await;
                        Err(FsmError::Cancelled)
                    }
                    Race::Expired => {
                        internal.cancel();
                        unwind(inner, cx).await;
                        if external.is_cancelled() {
                            Err(FsmError::Cancelled)
                        } else {
                            tracing::debug!(node = %cx.node(), timeout = ?self.timeout, "node timed out");
                            self.expire()
                        }
                    }
                }
            };
            self.pool.release(internal);
            result
        })
    }

    fn director(&self) -> Option<&dyn Director> {
        self.inner.director()
    }

    fn agent_slot(&self) -> Option<&dyn AgentSlot> {
        self.inner.agent_slot()
    }
}
