//! Configuration for scaletest runs
//!
//! Covers the execution strategy of each harness phase, result outputs and
//! logging, loaded from YAML with environment variable overrides.

pub mod error;
pub mod loader;
pub mod validation;

// Domain-specific configuration modules
pub mod domains;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use validation::Validatable;

// Re-export domain configurations
pub use domains::{
    logging::{LogFormat, LogLevel, LoggingConfig},
    output::{parse_output_specs, OutputFormat, OutputPath, OutputSpec},
    strategy::StrategyConfig,
    ScaletestConfig,
};
