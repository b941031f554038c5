//! Result output for scaletest
//!
//! Renders [`Results`] as text or JSON to stdout or to files, as described
//! by [`OutputSpec`]s.

pub mod error;

use std::fs::File;
use std::io::{self, Write};

use scaletest_config::{OutputFormat, OutputPath, OutputSpec};
use scaletest_harness::Results;
use tracing::{debug, info};

pub use error::OutputError;

/// Write `results` to the destination named by `spec`.
///
/// Files are created (truncating any existing file), flushed and synced
/// before returning.
pub fn write_results(
    spec: &OutputSpec,
    results: &Results,
    stdout: &mut dyn Write,
) -> Result<(), OutputError> {
    match &spec.path {
        OutputPath::Stdout => {
            render(spec, results, stdout)?;
            stdout.flush().map_err(|e| write_error(spec, e))?;
        }
        OutputPath::File(path) => {
            let mut file = File::create(path).map_err(|source| OutputError::Create {
                path: path.clone(),
                source,
            })?;
            render(spec, results, &mut file)?;
            file.flush().map_err(|e| write_error(spec, e))?;
            file.sync_all().map_err(|e| write_error(spec, e))?;
            info!(path = %path.display(), format = %spec.format, "wrote results");
        }
    }
    Ok(())
}

/// Write `results` to every spec in order, stopping at the first failure
pub fn write_all(
    specs: &[OutputSpec],
    results: &Results,
    stdout: &mut dyn Write,
) -> Result<(), OutputError> {
    for spec in specs {
        debug!(output = %spec, "writing results");
        write_results(spec, results, stdout)?;
    }
    Ok(())
}

fn render(spec: &OutputSpec, results: &Results, w: &mut dyn Write) -> Result<(), OutputError> {
    match spec.format {
        OutputFormat::Text => results.print_text(w).map_err(|e| write_error(spec, e)),
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *w, results).map_err(|e| encode_error(spec, e))?;
            writeln!(w).map_err(|e| write_error(spec, e))
        }
    }
}

fn write_error(spec: &OutputSpec, source: io::Error) -> OutputError {
    OutputError::Write {
        path: spec.to_string(),
        source,
    }
}

// serde_json reports writer failures as its own error type
fn encode_error(spec: &OutputSpec, err: serde_json::Error) -> OutputError {
    if err.is_io() {
        write_error(spec, io::Error::from(err))
    } else {
        OutputError::Encode(err)
    }
}
