//! Cancellation scopes passed to every run
//!
//! A [`RunContext`] combines a cancellation token with an optional deadline.
//! Scopes form a tree: cancelling a parent cancels every scope derived from
//! it, and a derived scope never outlives its parent's deadline.

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::ContextError;

#[derive(Debug, Clone)]
pub struct RunContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl RunContext {
    /// Root scope with no deadline that is only cancelled explicitly
    pub fn background() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Derived scope that can be cancelled without affecting its parent
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Derived scope that ends at `at` or at the parent's deadline,
    /// whichever comes first
    pub fn with_deadline(&self, at: Instant) -> Self {
        let deadline = match self.deadline {
            Some(existing) if existing <= at => existing,
            _ => at,
        };
        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    /// Derived scope that ends `timeout` from now
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Token that fires on explicit cancellation (not on deadline expiry)
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Why the scope ended, or `None` while it is still live
    pub fn error(&self) -> Option<ContextError> {
        if self.token.is_cancelled() {
            return Some(ContextError::Cancelled);
        }
        match self.deadline {
            Some(at) if Instant::now() >= at => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.error().is_some()
    }

    /// Resolves once the scope is cancelled or its deadline passes
    pub async fn done(&self) -> ContextError {
        match self.deadline {
            Some(at) => {
                tokio::select! {
                    _ = self.token.cancelled() => ContextError::Cancelled,
                    _ = sleep_until(at) => ContextError::DeadlineExceeded,
                }
            }
            None => {
                self.token.cancelled().await;
                ContextError::Cancelled
            }
        }
    }

    /// Drive `fut` until it completes or the scope ends
    pub async fn run_until_done<F>(&self, fut: F) -> Result<F::Output, ContextError>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            out = fut => Ok(out),
            err = self.done() => Err(err),
        }
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::background()
    }
}
