//! Scaletest execution engine
//!
//! This crate schedules independent, possibly long-running scenarios against
//! a live deployment and summarizes them into pass/fail results. Scenarios
//! implement [`Runnable`] (and optionally [`Cleanable`]), are registered with
//! a [`TestHarness`], and are driven through a run phase and a cleanup phase
//! by pluggable [`ExecutionStrategy`] implementations. [`Barrier`] lets
//! scenarios rendezvous across phases.

pub mod barrier;
pub mod context;
pub mod error;
pub mod harness;
pub mod results;
pub mod run;
pub mod runnable;
pub mod strategy;
pub mod trace;

// Re-export main types
pub use barrier::Barrier;
pub use context::RunContext;
pub use error::{CleanupErrors, ContextError, HarnessError, RunError};
pub use harness::TestHarness;
pub use results::{Results, RunResult};
pub use run::TestRun;
pub use runnable::{Cleanable, LogWriter, Runnable};
pub use strategy::{
    test_fn, ConcurrentExecutionStrategy, ExecutionStrategy, LinearExecutionStrategy,
    ParallelExecutionStrategy, ShuffleExecutionStrategyWrapper, TestFn,
    TimeoutExecutionStrategyWrapper,
};
pub use trace::TracedRunnable;
