//! Output error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors writing a results document
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("create output file {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("write output {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("encode results as JSON: {0}")]
    Encode(#[from] serde_json::Error),
}
