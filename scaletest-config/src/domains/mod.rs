//! Domain-specific configuration modules

pub mod logging;
pub mod output;
pub mod strategy;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::validation::Validatable;

use self::logging::LoggingConfig;
use self::output::{parse_output_specs, OutputSpec};
use self::strategy::StrategyConfig;

/// Complete scaletest configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaletestConfig {
    /// Strategy for the run phase
    pub run: StrategyConfig,

    /// Strategy for the cleanup phase
    pub cleanup: StrategyConfig,

    /// Result outputs as `<format>[:<path>]`
    pub outputs: Vec<String>,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl ScaletestConfig {
    /// Validate all configuration domains
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.run.validate().map_err(|e| scoped("run", e))?;
        self.cleanup.validate().map_err(|e| scoped("cleanup", e))?;
        self.logging.validate()?;
        parse_output_specs(&self.outputs)?;
        Ok(())
    }

    /// Parsed output destinations, stdout first
    pub fn output_specs(&self) -> ConfigResult<Vec<OutputSpec>> {
        parse_output_specs(&self.outputs)
    }
}

// Strategy errors carry the phase they belong to.
fn scoped(phase: &str, err: ConfigError) -> ConfigError {
    match err {
        ConfigError::DomainError { domain, message } => ConfigError::DomainError {
            domain: format!("{}.{}", phase, domain),
            message,
        },
        other => other,
    }
}
