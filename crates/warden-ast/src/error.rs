//! Document loading errors

use std::path::PathBuf;
use thiserror::Error;

/// Result type for document loading
pub type Result<T> = std::result::Result<T, DocumentError>;

/// Failures while reading a policy document
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed policy document: {0}")]
    Json(#[from] serde_json::Error),
}
