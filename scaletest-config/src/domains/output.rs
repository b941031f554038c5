//! Result output destinations
//!
//! Outputs are given as `<format>[:<path>]`, e.g. `text`, `json:/tmp/out.json`.
//! A missing path or `-` means stdout.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{ConfigError, ConfigResult};

/// Rendering of a results document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("invalid output format {:?}", s)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Where a results document goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputPath {
    Stdout,
    File(PathBuf),
}

impl fmt::Display for OutputPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputPath::Stdout => write!(f, "-"),
            OutputPath::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// One parsed output destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSpec {
    pub format: OutputFormat,
    pub path: OutputPath,
}

impl OutputSpec {
    pub fn is_stdout(&self) -> bool {
        self.path == OutputPath::Stdout
    }
}

impl Default for OutputSpec {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            path: OutputPath::Stdout,
        }
    }
}

impl fmt::Display for OutputSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.format, self.path)
    }
}

/// Parse output flags into specs.
///
/// An empty list yields a single text spec on stdout. At most one spec may
/// target stdout, and it is moved to the front.
pub fn parse_output_specs(raw: &[String]) -> ConfigResult<Vec<OutputSpec>> {
    if raw.is_empty() {
        return Ok(vec![OutputSpec::default()]);
    }

    let mut stdout: Option<OutputSpec> = None;
    let mut files = Vec::with_capacity(raw.len());
    for (i, value) in raw.iter().enumerate() {
        let (format, path) = match value.split_once(':') {
            Some((format, path)) => (format, path),
            None => (value.as_str(), "-"),
        };

        let format: OutputFormat = format.parse().map_err(|e| {
            ConfigError::OutputSpec(format!("output {} ({:?}): {}", i, value, e))
        })?;

        if path.is_empty() || path == "-" {
            if stdout.is_some() {
                return Err(ConfigError::OutputSpec(format!(
                    "output {} ({:?}): multiple outputs write to stdout",
                    i, value
                )));
            }
            stdout = Some(OutputSpec {
                format,
                path: OutputPath::Stdout,
            });
        } else {
            files.push(OutputSpec {
                format,
                path: OutputPath::File(PathBuf::from(path)),
            });
        }
    }

    Ok(stdout.into_iter().chain(files).collect())
}
