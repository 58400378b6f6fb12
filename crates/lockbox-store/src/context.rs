//! Per-call cancellation and deadlines.
//!
//! A [`Context`] travels with every store and cache call. The HTTP layer
//! builds one per request with the request timeout as its deadline.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, StoreError};

/// Cancellation token plus an optional deadline.
#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Attach an existing token, e.g. a server shutdown token.
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Cancel this context and every clone of it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fail if the context is already done.
    ///
    /// Cancellation wins over an expired deadline.
    pub fn check(&self) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(StoreError::Canceled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(StoreError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Drive `fut` until it completes or the context is done.
    ///
    /// Only for reads: a dropped future may have partially run.
    pub async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check()?;
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(StoreError::Canceled),
            _ = deadline_elapsed(self.deadline) => Err(StoreError::DeadlineExceeded),
            result = fut => result,
        }
    }
}

async fn deadline_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_is_live() {
        assert!(Context::background().check().is_ok());
    }

    #[test]
    fn test_cancel_propagates_to_clones() {
        let ctx = Context::background();
        let clone = ctx.clone();
        ctx.cancel();
        assert!(matches!(clone.check(), Err(StoreError::Canceled)));
    }

    #[tokio::test]
    async fn test_deadline_exceeded() {
        let ctx = Context::with_timeout(Duration::from_millis(1));
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(matches!(ctx.check(), Err(StoreError::DeadlineExceeded)));
    }

    #[tokio::test]
    async fn test_run_races_slow_future() {
        let ctx = Context::with_timeout(Duration::from_millis(10));
        let result: Result<()> = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(StoreError::DeadlineExceeded)));
    }

    #[tokio::test]
    async fn test_run_passes_through_result() {
        let ctx = Context::background();
        let value = ctx.run(async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }
}
