//! Error types for JSON persistence.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by [`JsonFile::save`](super::JsonFile::save).
#[derive(Debug, Error)]
pub enum PersistError {
    /// The document came from an embedded resource and cannot be written.
    #[error("document is read-only")]
    ReadOnly,

    /// The document has no backing file path.
    #[error("document has no file path")]
    NoPath,

    /// Failed to create the parent directory.
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    /// Failed to serialize or write the document.
    #[error("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    /// Failed to delete the backing file of an empty document.
    #[error("failed to delete {}: {source}", path.display())]
    Delete { path: PathBuf, source: io::Error },
}

impl PersistError {
    /// Whether this error is a policy refusal rather than an I/O failure.
    pub fn is_policy(&self) -> bool {
        matches!(self, Self::ReadOnly | Self::NoPath)
    }
}
