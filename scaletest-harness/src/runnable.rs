//! Contracts every scenario implements, and the log sink handed to them

use async_trait::async_trait;
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;

use crate::context::RunContext;

/// A unit of synthetic work scheduled by the harness.
///
/// Implementations must honour `ctx` and must not return until all work
/// they spawned has stopped, unless that work is detached and released by
/// [`Cleanable::cleanup`].
#[async_trait]
pub trait Runnable: Send + Sync {
    async fn run(&self, ctx: RunContext, id: &str, logs: LogWriter) -> anyhow::Result<()>;

    /// Cleanup capability, if any. Implementors of [`Cleanable`] return
    /// `Some(self)`.
    fn as_cleanable(&self) -> Option<&dyn Cleanable> {
        None
    }
}

/// A [`Runnable`] that leaves resources behind which must be released.
///
/// `cleanup` is only invoked for runs whose `run` actually executed, and it
/// is invoked even when `run` failed.
#[async_trait]
pub trait Cleanable: Runnable {
    async fn cleanup(&self, ctx: RunContext, id: &str, logs: LogWriter) -> anyhow::Result<()>;
}

/// Thread-safe append-only log buffer.
///
/// Clones share the same buffer, so a scenario can hand copies to every task
/// it spawns.
#[derive(Debug, Clone, Default)]
pub struct LogWriter {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl LogWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Captured output, with invalid UTF-8 replaced
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.lock()).into_owned()
    }

    pub fn len(&self) -> usize {
        self.buf.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.lock().is_empty()
    }
}

impl io::Write for LogWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        io::Write::write(&mut &*self, data)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Write for &LogWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.lock().extend_from_slice(data);
        Ok(data.len())
    }

    // One lock per call: a buffer passed to a single write_all never
    // interleaves with another writer's.
    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.buf.lock().extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
