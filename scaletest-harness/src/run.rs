//! Per-scenario execution wrapper

use chrono::{DateTime, Utc};
use futures::FutureExt;
use parking_lot::Mutex;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::context::RunContext;
use crate::error::{panic_message, RunError};
use crate::results::RunResult;
use crate::runnable::{LogWriter, Runnable};

/// One registered scenario: panic isolation, log capture and timing around
/// a [`Runnable`].
pub struct TestRun {
    test_name: String,
    id: String,
    runner: Arc<dyn Runnable>,
    state: Mutex<RunState>,
    done: CancellationToken,
}

#[derive(Default)]
struct RunState {
    logs: LogWriter,
    started_at: Option<DateTime<Utc>>,
    duration: Duration,
    error: Option<RunError>,
}

impl TestRun {
    pub fn new(
        test_name: impl Into<String>,
        id: impl Into<String>,
        runner: Arc<dyn Runnable>,
    ) -> Self {
        Self {
            test_name: test_name.into(),
            id: id.into(),
            runner,
            state: Mutex::new(RunState::default()),
            done: CancellationToken::new(),
        }
    }

    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// `<test_name>/<id>`, unique within a harness
    pub fn full_id(&self) -> String {
        format!("{}/{}", self.test_name, self.id)
    }

    /// Whether `run` has completed
    pub fn is_done(&self) -> bool {
        self.done.is_cancelled()
    }

    /// Execute the scenario.
    ///
    /// A panic inside the scenario is caught and recorded as an error
    /// starting with `panic: `. The returned error is the one stored for
    /// [`result`](Self::result).
    pub async fn run(&self, ctx: RunContext) -> Result<(), RunError> {
        let logs = LogWriter::new();
        {
            let mut state = self.state.lock();
            state.logs = logs.clone();
            state.started_at = Some(Utc::now());
        }
        let start = Instant::now();

        let outcome = AssertUnwindSafe(self.runner.run(ctx, &self.id, logs))
            .catch_unwind()
            .await;
        let result = match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(RunError::new(err)),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(full_id = %self.full_id(), "run panicked: {}", message);
                Err(RunError::new(anyhow::anyhow!("panic: {}", message)))
            }
        };

        // Error and duration are recorded under one lock so readers never
        // see one without the other.
        {
            let mut state = self.state.lock();
            state.error = result.as_ref().err().cloned();
            state.duration = start.elapsed();
        }
        self.done.cancel();

        debug!(
            full_id = %self.full_id(),
            success = result.is_ok(),
            "run finished"
        );
        result
    }

    /// Release whatever the scenario left behind.
    ///
    /// Does nothing when the runnable is not cleanable or when `run` never
    /// completed. Runs regardless of whether `run` succeeded.
    pub async fn cleanup(&self, ctx: RunContext) -> Result<(), RunError> {
        let Some(cleanable) = self.runner.as_cleanable() else {
            return Ok(());
        };
        if !self.is_done() {
            debug!(full_id = %self.full_id(), "skipping cleanup, run did not complete");
            return Ok(());
        }

        let logs = self.state.lock().logs.clone();
        let outcome = AssertUnwindSafe(cleanable.cleanup(ctx, &self.id, logs))
            .catch_unwind()
            .await;
        match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(RunError::new(err)),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(full_id = %self.full_id(), "cleanup panicked: {}", message);
                Err(RunError::new(anyhow::anyhow!("panic: {}", message)))
            }
        }
    }

    /// Snapshot of the finished run.
    ///
    /// # Panics
    ///
    /// Panics if `run` has not completed.
    pub fn result(&self) -> RunResult {
        if !self.is_done() {
            panic!(
                "cannot get result of run {} before it has finished",
                self.full_id()
            );
        }

        let state = self.state.lock();
        RunResult {
            full_id: self.full_id(),
            test_name: self.test_name.clone(),
            id: self.id.clone(),
            logs: state.logs.contents(),
            error: state.error.clone(),
            started_at: state.started_at.unwrap_or_default(),
            duration: state.duration,
        }
    }

    /// Result for a run the strategy never reached or that was abandoned
    /// mid-flight
    pub(crate) fn unexecuted_result(&self) -> RunResult {
        RunResult {
            full_id: self.full_id(),
            test_name: self.test_name.clone(),
            id: self.id.clone(),
            logs: String::new(),
            error: Some(RunError::new(anyhow::anyhow!("run did not complete"))),
            started_at: DateTime::<Utc>::default(),
            duration: Duration::ZERO,
        }
    }
}

impl std::fmt::Debug for TestRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestRun")
            .field("full_id", &self.full_id())
            .field("done", &self.is_done())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runnable::Cleanable;
    use async_trait::async_trait;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Echo {
        fail: bool,
    }

    #[async_trait]
    impl Runnable for Echo {
        async fn run(&self, _ctx: RunContext, id: &str, mut logs: LogWriter) -> anyhow::Result<()> {
            writeln!(logs, "hello from {}", id)?;
            if self.fail {
                anyhow::bail!("echo {} failed", id);
            }
            Ok(())
        }
    }

    struct Boom;

    #[async_trait]
    impl Runnable for Boom {
        async fn run(&self, _ctx: RunContext, _id: &str, mut logs: LogWriter) -> anyhow::Result<()> {
            writeln!(logs, "about to explode")?;
            panic!("boom");
        }
    }

    #[derive(Default)]
    struct Tracked {
        cleanups: AtomicUsize,
    }

    #[async_trait]
    impl Runnable for Tracked {
        async fn run(&self, _ctx: RunContext, _id: &str, _logs: LogWriter) -> anyhow::Result<()> {
            Ok(())
        }

        fn as_cleanable(&self) -> Option<&dyn Cleanable> {
            Some(self)
        }
    }

    #[async_trait]
    impl Cleanable for Tracked {
        async fn cleanup(&self, _ctx: RunContext, id: &str, mut logs: LogWriter) -> anyhow::Result<()> {
            self.cleanups.fetch_add(1, Ordering::SeqCst);
            writeln!(logs, "cleaned {}", id)?;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_run_captures_logs_and_success() {
        let run = TestRun::new("echo", "1", Arc::new(Echo { fail: false }));
        assert_eq!(run.full_id(), "echo/1");

        run.run(RunContext::background()).await.unwrap();

        let result = run.result();
        assert_eq!(result.full_id, "echo/1");
        assert_eq!(result.test_name, "echo");
        assert_eq!(result.id, "1");
        assert_eq!(result.logs, "hello from 1\n");
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_run_records_error() {
        let run = TestRun::new("echo", "2", Arc::new(Echo { fail: true }));
        let err = run.run(RunContext::background()).await.unwrap_err();
        assert_eq!(err.to_string(), "echo 2 failed");

        let result = run.result();
        assert_eq!(result.error.unwrap().to_string(), "echo 2 failed");
        // Repeated reads are identical
        assert_eq!(run.result().logs, "hello from 2\n");
    }

    #[tokio::test]
    async fn test_run_recovers_panic() {
        let run = TestRun::new("boom", "1", Arc::new(Boom));
        let err = run.run(RunContext::background()).await.unwrap_err();
        assert!(err.is_panic());

        let result = run.result();
        let message = result.error.unwrap().to_string();
        assert!(message.contains("panic"));
        assert!(message.contains("boom"));
        assert_eq!(result.logs, "about to explode\n");
    }

    #[test]
    #[should_panic(expected = "before it has finished")]
    fn test_result_before_run_panics() {
        let run = TestRun::new("echo", "1", Arc::new(Echo { fail: false }));
        let _ = run.result();
    }

    #[tokio::test]
    async fn test_cleanup_skipped_when_not_run() {
        let runner = Arc::new(Tracked::default());
        let run = TestRun::new("tracked", "1", runner.clone());

        run.cleanup(RunContext::background()).await.unwrap();
        assert_eq!(runner.cleanups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cleanup_shares_run_logs() {
        let runner = Arc::new(Tracked::default());
        let run = TestRun::new("tracked", "7", runner.clone());

        run.run(RunContext::background()).await.unwrap();
        run.cleanup(RunContext::background()).await.unwrap();

        assert_eq!(runner.cleanups.load(Ordering::SeqCst), 1);
        assert_eq!(run.result().logs, "cleaned 7\n");
    }

    #[tokio::test]
    async fn test_cleanup_noop_for_plain_runnable() {
        let run = TestRun::new("echo", "1", Arc::new(Echo { fail: true }));
        let _ = run.run(RunContext::background()).await;
        run.cleanup(RunContext::background()).await.unwrap();
    }
}
