//! Logging setup for scaletest
//!
//! Installs a global `tracing` subscriber. Scenario output is captured per
//! run by the harness; this covers the harness's own diagnostics.

pub mod init;

pub use init::{build_env_filter, init_logging, init_simple_tracing};
