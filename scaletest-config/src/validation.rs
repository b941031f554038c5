//! Configuration validation traits and utilities

use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};

/// Trait for validatable configuration
pub trait Validatable {
    /// Validate the configuration
    fn validate(&self) -> ConfigResult<()>;

    /// Get the domain name for error reporting
    fn domain_name(&self) -> &'static str;

    /// Helper to create a domain-specific validation error
    fn validation_error(&self, message: impl Into<String>) -> ConfigError {
        ConfigError::DomainError {
            domain: self.domain_name().to_string(),
            message: message.into(),
        }
    }
}

/// Validate that an optional limit (zero meaning unlimited) fits inside an
/// enclosing one
pub fn validate_within(
    inner: Duration,
    inner_name: &str,
    outer: Duration,
    outer_name: &str,
    domain: &str,
) -> ConfigResult<()> {
    if !outer.is_zero() && !inner.is_zero() && inner > outer {
        return Err(ConfigError::DomainError {
            domain: domain.to_string(),
            message: format!(
                "{} ({}) must not exceed {} ({})",
                inner_name,
                humantime::format_duration(inner),
                outer_name,
                humantime::format_duration(outer)
            ),
        });
    }
    Ok(())
}
