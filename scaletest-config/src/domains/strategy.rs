//! Execution strategy configuration

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use scaletest_harness::{
    ConcurrentExecutionStrategy, ExecutionStrategy, LinearExecutionStrategy,
    ParallelExecutionStrategy, RunContext, ShuffleExecutionStrategyWrapper,
    TimeoutExecutionStrategyWrapper,
};

use crate::error::ConfigResult;
use crate::validation::{validate_within, Validatable};

/// How one harness phase (run or cleanup) schedules its test functions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Number of concurrent jobs. 1 runs jobs one at a time, 0 runs all of
    /// them at once.
    pub concurrency: usize,

    /// Overall timeout for the phase, zero for none
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Timeout for each job, zero for none
    #[serde(with = "humantime_serde")]
    pub job_timeout: Duration,

    /// Randomize job order
    pub shuffle: bool,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            timeout: Duration::from_secs(30 * 60),
            job_timeout: Duration::from_secs(5 * 60),
            shuffle: false,
        }
    }
}

impl StrategyConfig {
    /// Build the strategy this configuration describes
    pub fn to_strategy(&self) -> Arc<dyn ExecutionStrategy> {
        let mut strategy: Arc<dyn ExecutionStrategy> = match self.concurrency {
            1 => Arc::new(LinearExecutionStrategy),
            0 => Arc::new(ConcurrentExecutionStrategy),
            limit => Arc::new(ParallelExecutionStrategy::new(limit)),
        };

        if self.shuffle {
            strategy = Arc::new(ShuffleExecutionStrategyWrapper::new(strategy));
        }

        if !self.job_timeout.is_zero() {
            strategy = Arc::new(TimeoutExecutionStrategyWrapper::new(
                self.job_timeout,
                strategy,
            ));
        }

        strategy
    }

    /// Derive the context for a whole phase from `parent`
    pub fn to_context(&self, parent: &RunContext) -> RunContext {
        if self.timeout.is_zero() {
            parent.child()
        } else {
            parent.with_timeout(self.timeout)
        }
    }
}

impl Validatable for StrategyConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_within(
            self.job_timeout,
            "job_timeout",
            self.timeout,
            "timeout",
            self.domain_name(),
        )
    }

    fn domain_name(&self) -> &'static str {
        "strategy"
    }
}
