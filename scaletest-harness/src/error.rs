//! Error types for the execution engine

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by the harness or an execution strategy itself.
///
/// Failures of individual runs are never reported through this type; they
/// are recorded on the [`TestRun`](crate::TestRun) and surface in
/// [`Results`](crate::Results).
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("panic: {0}")]
    Panic(String),

    #[error("Strategy error: {0}")]
    Strategy(String),

    #[error("Task join error: {0}")]
    Join(String),

    #[error(transparent)]
    Cleanup(#[from] CleanupErrors),
}

/// Terminal error of a single run.
///
/// Shared between the caller of [`TestRun::run`](crate::TestRun::run) and every
/// [`RunResult`](crate::RunResult) snapshot, hence the `Arc`.
#[derive(Debug, Clone)]
pub struct RunError(Arc<anyhow::Error>);

impl RunError {
    pub fn new(err: anyhow::Error) -> Self {
        Self(Arc::new(err))
    }

    pub fn inner(&self) -> &anyhow::Error {
        &self.0
    }

    pub fn is_panic(&self) -> bool {
        self.0.to_string().starts_with("panic: ")
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

/// Aggregated cleanup failures, one entry per run whose cleanup failed
#[derive(Debug, Default)]
pub struct CleanupErrors {
    errors: Vec<anyhow::Error>,
}

impl CleanupErrors {
    pub fn new(errors: Vec<anyhow::Error>) -> Self {
        Self { errors }
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &anyhow::Error> {
        self.errors.iter()
    }

    pub fn into_inner(self) -> Vec<anyhow::Error> {
        self.errors
    }
}

impl fmt::Display for CleanupErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} cleanup errors", self.errors.len())?;
        for (i, err) in self.errors.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{}{:#}", sep, err)?;
        }
        Ok(())
    }
}

impl std::error::Error for CleanupErrors {}

/// Why a [`RunContext`](crate::RunContext) ended
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextError {
    #[error("context canceled")]
    Cancelled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Render a caught panic payload the way `panic!` formatted it
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_errors_display() {
        let errs = CleanupErrors::new(vec![
            anyhow::anyhow!("delete workspace"),
            anyhow::anyhow!("delete user"),
        ]);
        assert_eq!(errs.len(), 2);
        assert_eq!(
            errs.to_string(),
            "2 cleanup errors: delete workspace; delete user"
        );

        let wrapped = HarnessError::from(errs);
        assert!(wrapped.to_string().starts_with("2 cleanup errors"));
    }

    #[test]
    fn test_run_error_keeps_chain() {
        let err = RunError::new(anyhow::anyhow!("connection refused").context("dial agent"));
        assert_eq!(err.to_string(), "dial agent");
        assert_eq!(format!("{:#}", err), "dial agent: connection refused");
        assert!(!err.is_panic());
        assert!(RunError::new(anyhow::anyhow!("panic: boom")).is_panic());
    }

    #[test]
    fn test_panic_message_payloads() {
        let s: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(s.as_ref()), "boom");

        let owned: Box<dyn std::any::Any + Send> = Box::new(format!("code {}", 7));
        assert_eq!(panic_message(owned.as_ref()), "code 7");

        let other: Box<dyn std::any::Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(other.as_ref()), "unknown panic payload");
    }
}
