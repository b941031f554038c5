//! Configuration loading and environment variable handling

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::domains::logging::{LogFormat, LogLevel, LoggingConfig};
use crate::domains::strategy::StrategyConfig;
use crate::domains::ScaletestConfig;
use crate::error::{ConfigError, ConfigResult};

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with default prefix
    pub fn new() -> Self {
        Self {
            prefix: "SCALETEST".to_string(),
        }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load configuration from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<ScaletestConfig> {
        let path = path.as_ref();
        log::debug!("Loading scaletest config from {}", path.display());

        let content = std::fs::read_to_string(path)?;
        let mut config: ScaletestConfig = serde_yaml::from_str(&content)?;

        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<ScaletestConfig> {
        let mut config = ScaletestConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<ScaletestConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut ScaletestConfig) -> ConfigResult<()> {
        self.apply_strategy_overrides("", &mut config.run)?;
        self.apply_strategy_overrides("CLEANUP_", &mut config.cleanup)?;
        self.apply_logging_overrides(&mut config.logging)?;

        if let Ok(outputs) = self.get_env_var("OUTPUTS") {
            config.outputs = outputs
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }

        Ok(())
    }

    /// Apply strategy overrides, `scope` is prepended to each variable name
    fn apply_strategy_overrides(
        &self,
        scope: &str,
        config: &mut StrategyConfig,
    ) -> ConfigResult<()> {
        let name = format!("{}CONCURRENCY", scope);
        if let Ok(concurrency) = self.get_env_var(&name) {
            config.concurrency = concurrency
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid {}: {}", name, e)))?;
        }

        let name = format!("{}TIMEOUT", scope);
        if let Ok(timeout) = self.get_env_var(&name) {
            config.timeout = parse_duration(&name, &timeout)?;
        }

        let name = format!("{}JOB_TIMEOUT", scope);
        if let Ok(timeout) = self.get_env_var(&name) {
            config.job_timeout = parse_duration(&name, &timeout)?;
        }

        let name = format!("{}SHUFFLE", scope);
        if let Ok(shuffle) = self.get_env_var(&name) {
            config.shuffle = shuffle
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid {}: {}", name, e)))?;
        }

        Ok(())
    }

    /// Apply logging config overrides
    fn apply_logging_overrides(&self, config: &mut LoggingConfig) -> ConfigResult<()> {
        if let Ok(log_level) = self.get_env_var("LOG_LEVEL") {
            config.level = LogLevel::from_str(&log_level)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_LEVEL: {}", log_level)))?;
        }

        if let Ok(format) = self.get_env_var("LOG_FORMAT") {
            config.format = LogFormat::from_str(&format)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_FORMAT: {}", format)))?;
        }

        Ok(())
    }

    /// Get environment variable with prefix
    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        std::env::var(format!("{}_{}", self.prefix, name))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Durations accept humantime syntax, e.g. `30m` or `1h 30m`; `0` disables
fn parse_duration(name: &str, value: &str) -> ConfigResult<Duration> {
    if value.trim() == "0" {
        return Ok(Duration::ZERO);
    }
    humantime::parse_duration(value.trim())
        .map_err(|e| ConfigError::EnvError(format!("Invalid {}: {}", name, e)))
}
