//! Global subscriber initialization

use anyhow::Result;
use scaletest_config::{LogFormat, LoggingConfig};
use tracing_subscriber::EnvFilter;

/// Initialize tracing from configuration
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let env_filter = build_env_filter(config.level.as_str());
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter);

    // Use try_init to avoid panic if global subscriber already set
    let installed = match config.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().with_current_span(true).try_init(),
    };
    if installed.is_err() {
        tracing::debug!("Global tracing subscriber already initialized, skipping");
    }

    Ok(())
}

/// Initialize simple tracing for basic console output
pub fn init_simple_tracing(log_level: &str) -> Result<()> {
    let env_filter = build_env_filter(log_level);

    if tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init()
        .is_err()
    {
        tracing::debug!("Global tracing subscriber already initialized, skipping");
    }

    Ok(())
}

/// Filter from `directives`, falling back to `RUST_LOG` and then `info`
pub fn build_env_filter(directives: &str) -> EnvFilter {
    EnvFilter::try_new(directives)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scaletest_config::LogLevel;

    #[test]
    fn test_build_env_filter() {
        assert_eq!(build_env_filter("debug").to_string(), "debug");
        let filter = build_env_filter("scaletest_harness=trace,warn").to_string();
        assert!(filter.contains("scaletest_harness=trace"), "{}", filter);
    }

    #[test]
    fn test_repeated_init_is_harmless() {
        let config = LoggingConfig {
            level: LogLevel::Debug,
            format: LogFormat::Compact,
        };
        init_logging(&config).unwrap();
        init_logging(&LoggingConfig::default()).unwrap();
        init_simple_tracing("info").unwrap();

        tracing::info!("logging initialized");
    }
}
