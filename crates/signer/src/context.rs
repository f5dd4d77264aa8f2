//! Caller-supplied cancellation and timeout for remote calls.
//!
//! Remote KMS signing and every chain round-trip go through [`CallContext::run`],
//! so a stalled remote cannot hang the caller past its deadline.

use core::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Default deadline applied to a single remote call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Why a remote call did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Interrupted {
    #[error("cancelled by caller")]
    Cancelled,
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
}

/// Deadline plus cancellation handle attached to one logical submission.
#[derive(Debug, Clone)]
pub struct CallContext {
    timeout: Duration,
    cancel: CancellationToken,
}

impl Default for CallContext {
    fn default() -> Self {
        Self::new(DEFAULT_CALL_TIMEOUT)
    }
}

impl CallContext {
    /// Context with the given per-call timeout and a fresh cancellation token.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout, cancel: CancellationToken::new() }
    }

    /// Context bound to an existing token, e.g. a child of a service shutdown token.
    pub fn with_token(timeout: Duration, cancel: CancellationToken) -> Self {
        Self { timeout, cancel }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Cancel every call issued through this context (and its clones).
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Drive `fut` until it completes, the deadline elapses or the token fires.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, Interrupted>
    where
        F: Future<Output = T>,
    {
        if self.cancel.is_cancelled() {
            return Err(Interrupted::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Interrupted::Cancelled),
            res = tokio::time::timeout(self.timeout, fut) => {
                res.map_err(|_| Interrupted::TimedOut(self.timeout))
            }
        }
    }
}
