//! Span-per-run instrumentation for any [`Runnable`]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use tracing::{info_span, Instrument, Span};

use crate::context::RunContext;
use crate::runnable::{Cleanable, LogWriter, Runnable};

/// Wraps a runnable so its run and cleanup execute inside `tracing` spans.
///
/// The cleanup span is a child of the run span, so both phases of one
/// scenario group together in a trace. The span id is written to the run's
/// logs. Run spans are kept per id, so one instance may be registered under
/// several ids.
pub struct TracedRunnable {
    span_name: String,
    runner: Arc<dyn Runnable>,
    run_spans: Mutex<HashMap<String, Span>>,
}

impl TracedRunnable {
    pub fn new(span_name: impl Into<String>, runner: Arc<dyn Runnable>) -> Self {
        Self {
            span_name: span_name.into(),
            runner,
            run_spans: Mutex::new(HashMap::new()),
        }
    }

    fn run_span(&self, id: &str) -> Option<Span> {
        self.run_spans.lock().get(id).cloned()
    }
}

#[async_trait]
impl Runnable for TracedRunnable {
    async fn run(&self, ctx: RunContext, id: &str, mut logs: LogWriter) -> anyhow::Result<()> {
        let span = info_span!("scaletest_run", name = %self.span_name, id = %id);
        self.run_spans.lock().insert(id.to_string(), span.clone());

        match span.id() {
            Some(span_id) => writeln!(logs, "Span ID: {}\n", span_id.into_u64())?,
            None => writeln!(logs, "Span ID: unknown span ID\n")?,
        }

        self.runner.run(ctx, id, logs).instrument(span).await
    }

    fn as_cleanable(&self) -> Option<&dyn Cleanable> {
        self.runner.as_cleanable().map(|_| self as &dyn Cleanable)
    }
}

#[async_trait]
impl Cleanable for TracedRunnable {
    async fn cleanup(&self, ctx: RunContext, id: &str, logs: LogWriter) -> anyhow::Result<()> {
        let Some(inner) = self.runner.as_cleanable() else {
            return Ok(());
        };

        let parent = self.run_spans.lock().remove(id).and_then(|s| s.id());
        let span = info_span!(parent: parent, "scaletest_cleanup", name = %self.span_name, id = %id);
        inner.cleanup(ctx, id, logs).instrument(span).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Plain;

    #[async_trait]
    impl Runnable for Plain {
        async fn run(&self, _ctx: RunContext, id: &str, mut logs: LogWriter) -> anyhow::Result<()> {
            writeln!(logs, "plain {}", id)?;
            Ok(())
        }
    }

    #[derive(Default)]
    struct WithCleanup {
        cleanups: AtomicUsize,
    }

    #[async_trait]
    impl Runnable for WithCleanup {
        async fn run(&self, _ctx: RunContext, _id: &str, _logs: LogWriter) -> anyhow::Result<()> {
            Ok(())
        }

        fn as_cleanable(&self) -> Option<&dyn Cleanable> {
            Some(self)
        }
    }

    #[async_trait]
    impl Cleanable for WithCleanup {
        async fn cleanup(&self, _ctx: RunContext, _id: &str, _logs: LogWriter) -> anyhow::Result<()> {
            self.cleanups.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_traced_run_forwards_and_logs_span() {
        let traced = TracedRunnable::new("workspacebuild", Arc::new(Plain));
        let logs = LogWriter::new();

        traced
            .run(RunContext::background(), "3", logs.clone())
            .await
            .unwrap();

        let contents = logs.contents();
        assert!(contents.starts_with("Span ID: "));
        assert!(contents.ends_with("plain 3\n"));
        assert!(traced.as_cleanable().is_none());
    }

    #[tokio::test]
    async fn test_traced_cleanup_forwards_when_inner_is_cleanable() {
        let inner = Arc::new(WithCleanup::default());
        let traced = TracedRunnable::new("workspacebuild", inner.clone());

        traced
            .run(RunContext::background(), "1", LogWriter::new())
            .await
            .unwrap();
        let cleanable = traced.as_cleanable().expect("inner runner is cleanable");
        cleanable
            .cleanup(RunContext::background(), "1", LogWriter::new())
            .await
            .unwrap();

        assert_eq!(inner.cleanups.load(Ordering::SeqCst), 1);
    }

    fn logged_span_id(logs: &LogWriter) -> u64 {
        let contents = logs.contents();
        let line = contents.lines().next().unwrap();
        line.trim_start_matches("Span ID: ").parse().unwrap()
    }

    #[tokio::test]
    async fn test_shared_instance_keeps_span_per_id() {
        let _subscriber = tracing::subscriber::set_default(tracing_subscriber::registry());
        let inner = Arc::new(WithCleanup::default());
        let traced = TracedRunnable::new("workspacebuild", inner.clone());

        let first_logs = LogWriter::new();
        let second_logs = LogWriter::new();
        traced
            .run(RunContext::background(), "1", first_logs.clone())
            .await
            .unwrap();
        traced
            .run(RunContext::background(), "2", second_logs.clone())
            .await
            .unwrap();

        let first = traced.run_span("1").and_then(|s| s.id()).unwrap();
        let second = traced.run_span("2").and_then(|s| s.id()).unwrap();
        assert_ne!(first, second);
        assert_eq!(first.into_u64(), logged_span_id(&first_logs));
        assert_eq!(second.into_u64(), logged_span_id(&second_logs));

        let cleanable = traced.as_cleanable().unwrap();
        cleanable
            .cleanup(RunContext::background(), "1", LogWriter::new())
            .await
            .unwrap();
        assert!(traced.run_span("1").is_none());
        assert_eq!(
            traced.run_span("2").and_then(|s| s.id()).unwrap().into_u64(),
            second.into_u64()
        );
        assert_eq!(inner.cleanups.load(Ordering::SeqCst), 1);
    }
}
