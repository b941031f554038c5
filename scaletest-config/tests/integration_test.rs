//! Integration tests for configuration loading

use scaletest_config::{ConfigError, ConfigLoader, LogFormat, LogLevel, OutputFormat, OutputPath};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;
use temp_env::with_vars;

#[test]
fn test_default_configuration() {
    with_vars(Vec::<(&str, Option<&str>)>::new(), || {
        let config = ConfigLoader::new().from_env().unwrap();
        assert_eq!(config.run.concurrency, 1);
        assert_eq!(config.run.timeout, Duration::from_secs(30 * 60));
        assert_eq!(config.cleanup.job_timeout, Duration::from_secs(5 * 60));
        assert_eq!(config.logging.level, LogLevel::Info);
    });
}

#[test]
fn test_env_overrides() {
    with_vars(
        vec![
            ("SCALETEST_CONCURRENCY", Some("0")),
            ("SCALETEST_TIMEOUT", Some("2h")),
            ("SCALETEST_JOB_TIMEOUT", Some("10m")),
            ("SCALETEST_SHUFFLE", Some("true")),
            ("SCALETEST_CLEANUP_CONCURRENCY", Some("4")),
            ("SCALETEST_CLEANUP_TIMEOUT", Some("0")),
            ("SCALETEST_OUTPUTS", Some("json:/tmp/results.json, text")),
            ("SCALETEST_LOG_LEVEL", Some("debug")),
            ("SCALETEST_LOG_FORMAT", Some("json")),
        ],
        || {
            let config = ConfigLoader::new().from_env().unwrap();

            assert_eq!(config.run.concurrency, 0);
            assert_eq!(config.run.timeout, Duration::from_secs(7200));
            assert_eq!(config.run.job_timeout, Duration::from_secs(600));
            assert!(config.run.shuffle);

            assert_eq!(config.cleanup.concurrency, 4);
            assert_eq!(config.cleanup.timeout, Duration::ZERO);
            assert!(!config.cleanup.shuffle);

            assert_eq!(config.logging.level, LogLevel::Debug);
            assert_eq!(config.logging.format, LogFormat::Json);

            let specs = config.output_specs().unwrap();
            assert_eq!(specs.len(), 2);
            assert_eq!(specs[0].path, OutputPath::Stdout);
            assert_eq!(specs[1].format, OutputFormat::Json);
        },
    );
}

#[test]
fn test_invalid_env_values() {
    with_vars(vec![("SCALETEST_CONCURRENCY", Some("many"))], || {
        let result = ConfigLoader::new().from_env();
        assert!(matches!(result, Err(ConfigError::EnvError(_))));
    });

    with_vars(vec![("SCALETEST_CLEANUP_JOB_TIMEOUT", Some("later"))], || {
        let result = ConfigLoader::new().from_env();
        assert!(matches!(result, Err(ConfigError::EnvError(_))));
    });

    with_vars(vec![("SCALETEST_OUTPUTS", Some("text,json"))], || {
        let result = ConfigLoader::new().from_env();
        assert!(matches!(result, Err(ConfigError::OutputSpec(_))));
    });
}

#[test]
fn test_custom_prefix() {
    with_vars(vec![("LOADTEST_CONCURRENCY", Some("8"))], || {
        let config = ConfigLoader::with_prefix("LOADTEST").from_env().unwrap();
        assert_eq!(config.run.concurrency, 8);
    });
}

#[test]
fn test_yaml_file_with_env_override() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
run:
  concurrency: 10
  timeout: 1h
  job_timeout: 1m
  shuffle: true
cleanup:
  concurrency: 0
outputs:
  - text
  - json:/tmp/scaletest.json
logging:
  level: warn
"#
    )
    .unwrap();

    with_vars(vec![("SCALETEST_CLEANUP_TIMEOUT", Some("45m"))], || {
        let config = ConfigLoader::new().load(Some(file.path())).unwrap();

        assert_eq!(config.run.concurrency, 10);
        assert_eq!(config.run.timeout, Duration::from_secs(3600));
        assert_eq!(config.run.job_timeout, Duration::from_secs(60));
        assert!(config.run.shuffle);
        assert_eq!(config.cleanup.concurrency, 0);
        assert_eq!(config.cleanup.timeout, Duration::from_secs(45 * 60));
        assert_eq!(config.logging.level, LogLevel::Warn);
        assert_eq!(config.output_specs().unwrap().len(), 2);
    });
}

#[test]
fn test_job_timeout_exceeding_timeout_in_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "run:\n  timeout: 1m\n  job_timeout: 5m\n").unwrap();

    with_vars(Vec::<(&str, Option<&str>)>::new(), || {
        let result = ConfigLoader::new().from_file(file.path());
        assert!(matches!(result, Err(ConfigError::DomainError { .. })));
    });
}

#[test]
fn test_missing_file() {
    let result = ConfigLoader::new().from_file("/nonexistent/scaletest.yaml");
    assert!(matches!(result, Err(ConfigError::FileReadError(_))));
}
