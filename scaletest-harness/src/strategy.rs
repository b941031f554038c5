//! Execution strategies: how a batch of runs is scheduled
//!
//! Strategies compose by wrapping: a bounded, shuffled batch with a per-run
//! timeout is
//!
//! ```ignore
//! TimeoutExecutionStrategyWrapper::new(
//!     Duration::from_secs(300),
//!     Arc::new(ShuffleExecutionStrategyWrapper::new(Arc::new(
//!         ParallelExecutionStrategy::new(10),
//!     ))),
//! )
//! ```

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

use crate::context::RunContext;
use crate::error::HarnessError;

/// One schedulable unit of work
pub type TestFn = Box<dyn FnOnce(RunContext) -> BoxFuture<'static, anyhow::Result<()>> + Send>;

/// Box an async closure as a [`TestFn`]
pub fn test_fn<F, Fut>(f: F) -> TestFn
where
    F: FnOnce(RunContext) -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Box::new(move |ctx| f(ctx).boxed())
}

/// Scheduling policy for a batch of [`TestFn`]s.
///
/// `Ok` carries the failures of individual functions (order unspecified);
/// a failing function never stops its siblings. `Err` is reserved for
/// faults of the strategy itself.
#[async_trait]
pub trait ExecutionStrategy: Send + Sync {
    async fn run(
        &self,
        ctx: RunContext,
        fns: Vec<TestFn>,
    ) -> Result<Vec<anyhow::Error>, HarnessError>;
}

/// Runs functions one after another in input order
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearExecutionStrategy;

#[async_trait]
impl ExecutionStrategy for LinearExecutionStrategy {
    async fn run(
        &self,
        ctx: RunContext,
        fns: Vec<TestFn>,
    ) -> Result<Vec<anyhow::Error>, HarnessError> {
        let mut errs = Vec::new();
        for (i, f) in fns.into_iter().enumerate() {
            if let Err(err) = f(ctx.clone()).await {
                errs.push(err.context(format!("run {}", i)));
            }
        }
        Ok(errs)
    }
}

/// Runs every function at once on its own task
#[derive(Debug, Clone, Copy, Default)]
pub struct ConcurrentExecutionStrategy;

#[async_trait]
impl ExecutionStrategy for ConcurrentExecutionStrategy {
    async fn run(
        &self,
        ctx: RunContext,
        fns: Vec<TestFn>,
    ) -> Result<Vec<anyhow::Error>, HarnessError> {
        let errs = Arc::new(Mutex::new(Vec::new()));
        let mut tasks = JoinSet::new();

        for (i, f) in fns.into_iter().enumerate() {
            let ctx = ctx.clone();
            let errs = errs.clone();
            tasks.spawn(async move {
                if let Err(err) = f(ctx).await {
                    errs.lock().push(err.context(format!("run {}", i)));
                }
            });
        }

        join_tasks(tasks).await?;
        let errs = std::mem::take(&mut *errs.lock());
        Ok(errs)
    }
}

/// Like [`ConcurrentExecutionStrategy`] but with at most `limit` functions
/// in flight
#[derive(Debug, Clone, Copy)]
pub struct ParallelExecutionStrategy {
    pub limit: usize,
}

impl ParallelExecutionStrategy {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }
}

#[async_trait]
impl ExecutionStrategy for ParallelExecutionStrategy {
    async fn run(
        &self,
        ctx: RunContext,
        fns: Vec<TestFn>,
    ) -> Result<Vec<anyhow::Error>, HarnessError> {
        if self.limit == 0 {
            return Err(HarnessError::Strategy(
                "parallel execution limit must be greater than zero".to_string(),
            ));
        }

        let semaphore = Arc::new(Semaphore::new(self.limit));
        let errs = Arc::new(Mutex::new(Vec::new()));
        let mut tasks = JoinSet::new();

        for (i, f) in fns.into_iter().enumerate() {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| HarnessError::Strategy(e.to_string()))?;
            debug!(run = i, limit = self.limit, "admitted run");

            let ctx = ctx.clone();
            let errs = errs.clone();
            tasks.spawn(async move {
                // Dropped on completion, unwind or abort
                let _permit = permit;
                if let Err(err) = f(ctx).await {
                    errs.lock().push(err.context(format!("run {}", i)));
                }
            });
        }

        join_tasks(tasks).await?;
        let errs = std::mem::take(&mut *errs.lock());
        Ok(errs)
    }
}

/// Gives every function its own deadline `timeout` after it starts, then
/// delegates to `inner`
#[derive(Clone)]
pub struct TimeoutExecutionStrategyWrapper {
    pub timeout: Duration,
    pub inner: Arc<dyn ExecutionStrategy>,
}

impl TimeoutExecutionStrategyWrapper {
    pub fn new(timeout: Duration, inner: Arc<dyn ExecutionStrategy>) -> Self {
        Self { timeout, inner }
    }
}

#[async_trait]
impl ExecutionStrategy for TimeoutExecutionStrategyWrapper {
    async fn run(
        &self,
        ctx: RunContext,
        fns: Vec<TestFn>,
    ) -> Result<Vec<anyhow::Error>, HarnessError> {
        let timeout = self.timeout;
        let wrapped: Vec<TestFn> = fns
            .into_iter()
            .map(|f| -> TestFn { Box::new(move |ctx: RunContext| f(ctx.with_timeout(timeout))) })
            .collect();

        self.inner.run(ctx, wrapped).await
    }
}

/// Randomizes the order of the batch before delegating to `inner`
#[derive(Clone)]
pub struct ShuffleExecutionStrategyWrapper {
    pub inner: Arc<dyn ExecutionStrategy>,
}

impl ShuffleExecutionStrategyWrapper {
    pub fn new(inner: Arc<dyn ExecutionStrategy>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl ExecutionStrategy for ShuffleExecutionStrategyWrapper {
    async fn run(
        &self,
        ctx: RunContext,
        mut fns: Vec<TestFn>,
    ) -> Result<Vec<anyhow::Error>, HarnessError> {
        {
            // Seeded from OS entropy so repeated runs are not predictable
            let mut rng = StdRng::from_entropy();
            fns.shuffle(&mut rng);
        }

        self.inner.run(ctx, fns).await
    }
}

/// Wait for every task. A panic in any task is resumed on the caller once
/// all of its siblings have finished. Dropping the returned future aborts
/// the tasks still running.
async fn join_tasks(mut tasks: JoinSet<()>) -> Result<(), HarnessError> {
    let mut panic = None;
    let mut join_error = None;

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(()) => {}
            Err(err) if err.is_panic() => {
                if panic.is_none() {
                    panic = Some(err.into_panic());
                }
            }
            Err(err) => {
                if join_error.is_none() {
                    join_error = Some(err.to_string());
                }
            }
        }
    }

    if let Some(payload) = panic {
        std::panic::resume_unwind(payload);
    }
    match join_error {
        Some(message) => Err(HarnessError::Join(message)),
        None => Ok(()),
    }
}
