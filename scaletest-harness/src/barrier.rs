//! Countdown rendezvous for multi-phase scenarios
//!
//! Scenarios use a [`Barrier`] to hold every concurrent run at a phase
//! boundary, e.g. wait until all runs finished setup before any of them
//! starts generating load. A run that cannot reach the boundary calls
//! [`Barrier::cancel`] so the others are not blocked forever.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Single-use barrier released after `size` parties have arrived
#[derive(Debug, Clone)]
pub struct Barrier {
    inner: Arc<BarrierInner>,
}

#[derive(Debug)]
struct BarrierInner {
    remaining: AtomicI64,
    released: CancellationToken,
}

impl Barrier {
    pub fn new(size: usize) -> Self {
        Self {
            inner: Arc::new(BarrierInner {
                remaining: AtomicI64::new(size as i64),
                released: CancellationToken::new(),
            }),
        }
    }

    /// Announce arrival without waiting for the other parties.
    ///
    /// Only the call that moves the counter from one to zero releases the
    /// barrier; surplus calls drive it negative and have no effect.
    pub fn cancel(&self) {
        let remaining = self.inner.remaining.fetch_sub(1, Ordering::AcqRel) - 1;
        if remaining == 0 {
            tracing::debug!("barrier released");
            self.inner.released.cancel();
        }
    }

    /// Arrive and wait until every party has arrived
    pub async fn wait(&self) {
        self.cancel();
        self.inner.released.cancelled().await;
    }

    /// Parties still expected; negative after surplus arrivals
    pub fn remaining(&self) -> i64 {
        self.inner.remaining.load(Ordering::Acquire)
    }

    pub fn is_released(&self) -> bool {
        self.inner.released.is_cancelled()
    }
}
