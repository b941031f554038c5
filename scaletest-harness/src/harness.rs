//! Two-phase orchestrator: run every registered scenario, then clean up

use futures::FutureExt;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::context::RunContext;
use crate::error::{panic_message, CleanupErrors, HarnessError};
use crate::results::Results;
use crate::run::TestRun;
use crate::runnable::Runnable;
use crate::strategy::{test_fn, ExecutionStrategy, TestFn};

/// Registry of [`TestRun`]s driven through a run phase and a cleanup phase,
/// each with its own [`ExecutionStrategy`].
///
/// Misuse (registering after start, duplicate ids, running twice, reading
/// results or cleaning up before the run phase finished) panics.
pub struct TestHarness {
    run_strategy: Arc<dyn ExecutionStrategy>,
    cleanup_strategy: Arc<dyn ExecutionStrategy>,
    state: Mutex<HarnessState>,
    done: CancellationToken,
}

#[derive(Default)]
struct HarnessState {
    runs: Vec<Arc<TestRun>>,
    ids: HashSet<String>,
    started: bool,
    elapsed: Duration,
}

impl TestHarness {
    pub fn new(
        run_strategy: Arc<dyn ExecutionStrategy>,
        cleanup_strategy: Arc<dyn ExecutionStrategy>,
    ) -> Self {
        Self {
            run_strategy,
            cleanup_strategy,
            state: Mutex::new(HarnessState::default()),
            done: CancellationToken::new(),
        }
    }

    /// Register a scenario under `<test_name>/<id>`.
    ///
    /// # Panics
    ///
    /// Panics if the harness has started or the id is already registered.
    pub fn add_run(
        &self,
        test_name: impl Into<String>,
        id: impl Into<String>,
        runner: Arc<dyn Runnable>,
    ) -> Arc<TestRun> {
        let run = Arc::new(TestRun::new(test_name, id, runner));
        let full_id = run.full_id();

        let mut state = self.state.lock();
        if state.started {
            panic!("cannot add run {} after the harness has started", full_id);
        }
        if !state.ids.insert(full_id.clone()) {
            panic!("duplicate run id {} registered with the harness", full_id);
        }
        state.runs.push(run.clone());
        run
    }

    pub fn len(&self) -> usize {
        self.state.lock().runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the run phase has completed
    pub fn is_done(&self) -> bool {
        self.done.is_cancelled()
    }

    /// Execute every registered run with the run strategy.
    ///
    /// Failing or panicking runs do not fail this call; they are visible
    /// through [`results`](Self::results). An error here means the strategy
    /// itself failed or panicked.
    ///
    /// # Panics
    ///
    /// Panics if called more than once.
    pub async fn run(&self, ctx: RunContext) -> Result<(), HarnessError> {
        let runs = {
            let mut state = self.state.lock();
            if state.started {
                panic!("harness run called more than once");
            }
            state.started = true;
            state.runs.clone()
        };

        let fns: Vec<TestFn> = runs
            .iter()
            .map(|run| {
                let run = run.clone();
                test_fn(move |ctx| async move { run.run(ctx).await.map_err(anyhow::Error::new) })
            })
            .collect();

        info!(runs = fns.len(), "starting test harness");
        let phase = RunPhase {
            harness: self,
            start: Instant::now(),
        };
        let outcome = AssertUnwindSafe(self.run_strategy.run(ctx, fns))
            .catch_unwind()
            .await;
        let elapsed = phase.start.elapsed();
        drop(phase);

        match outcome {
            Ok(Ok(errs)) => {
                info!(
                    runs = runs.len(),
                    failed = errs.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "test harness finished"
                );
                Ok(())
            }
            Ok(Err(err)) => {
                warn!(error = %err, "run strategy failed");
                Err(err)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!("run strategy panicked: {}", message);
                Err(HarnessError::Panic(message))
            }
        }
    }

    /// Clean up every run with the cleanup strategy.
    ///
    /// Every run is cleaned up even if its own run failed. All cleanup
    /// failures are returned together.
    ///
    /// # Panics
    ///
    /// Panics if the run phase has not started or not finished.
    pub async fn cleanup(&self, ctx: RunContext) -> Result<(), HarnessError> {
        let runs = self.finished_runs("cleanup");

        let fns: Vec<TestFn> = runs
            .iter()
            .map(|run| {
                let run = run.clone();
                test_fn(
                    move |ctx| async move { run.cleanup(ctx).await.map_err(anyhow::Error::new) },
                )
            })
            .collect();

        let outcome = AssertUnwindSafe(self.cleanup_strategy.run(ctx, fns))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(errs)) if errs.is_empty() => Ok(()),
            Ok(Ok(errs)) => {
                warn!(failed = errs.len(), "cleanup finished with errors");
                Err(HarnessError::Cleanup(CleanupErrors::new(errs)))
            }
            Ok(Err(err)) => {
                warn!(error = %err, "cleanup strategy failed");
                Err(err)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!("cleanup strategy panicked: {}", message);
                Err(HarnessError::Panic(message))
            }
        }
    }

    /// Aggregate results of the run phase.
    ///
    /// Runs that never completed (the strategy failed before reaching them,
    /// or the `run` future was dropped) are reported as failures.
    ///
    /// # Panics
    ///
    /// Panics if the run phase has not started or not finished.
    pub fn results(&self) -> Results {
        let runs = self.finished_runs("results");
        let elapsed = self.state.lock().elapsed;

        Results::from_runs(
            runs.iter().map(|run| {
                if run.is_done() {
                    run.result()
                } else {
                    run.unexecuted_result()
                }
            }),
            elapsed,
        )
    }

    fn finished_runs(&self, operation: &str) -> Vec<Arc<TestRun>> {
        let state = self.state.lock();
        if !state.started {
            panic!("harness {} called before the harness was run", operation);
        }
        if !self.done.is_cancelled() {
            panic!("harness {} called before the harness finished running", operation);
        }
        state.runs.clone()
    }
}

/// Ends the run phase when dropped, so a caller dropping the `run` future
/// still leaves the harness ready for `results` and `cleanup`.
struct RunPhase<'a> {
    harness: &'a TestHarness,
    start: Instant,
}

impl Drop for RunPhase<'_> {
    fn drop(&mut self) {
        self.harness.state.lock().elapsed = self.start.elapsed();
        self.harness.done.cancel();
    }
}

impl std::fmt::Debug for TestHarness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TestHarness")
            .field("runs", &state.runs.len())
            .field("started", &state.started)
            .field("done", &self.done.is_cancelled())
            .finish_non_exhaustive()
    }
}
