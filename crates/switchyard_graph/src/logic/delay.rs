//! "Wait N" node logic.

use core::time::Duration;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::error::FsmError;
use crate::logic::{Logic, NodeContext, Outcome};

/// Waits for a fixed duration, then succeeds.
///
/// A zero delay succeeds immediately. The delay may be bound to its own
/// token: cancelling that token ends the wait with [`Outcome::Failure`],
/// while cancelling the run's token raises [`FsmError::Cancelled`].
#[derive(Debug, Clone)]
pub struct DelayLogic {
    delay: Duration,
    bound: Option<CancellationToken>,
}

impl DelayLogic {
    /// Waits for `delay`.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self { delay, bound: None }
    }

    /// Waits for `millis` milliseconds. Negative values mean no wait.
    #[must_use]
    pub fn from_millis(millis: i64) -> Self {
        Self::new(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }

    /// Binds the wait to `token`.
    #[must_use]
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.bound = Some(token);
        self
    }

    /// The configured delay.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    async fn wait_bound(&self) {
        match &self.bound {
            Some(token) => token.cancelled().await,
            None => futures::future::pending().await,
        }
    }
}

impl Logic for DelayLogic {
    fn execute<'a>(&'a self, cx: &'a NodeContext<'a>) -> BoxFuture<'a, Result<Outcome, FsmError>> {
        Box::pin(async move {
            if self.delay.is_zero() {
                return Ok(Outcome::Success);
            }
            tokio::select! {
                biased;
                () = cx.cancellation().cancelled() => Err(FsmError::Cancelled),
                () = self.wait_bound() => Ok(Outcome::Failure),
                () = tokio::time::sleep(self.delay) => Ok(Outcome::Success),
            }
        })
    }
}
