//! Error types for the pack loader.

use std::io;
use std::path::PathBuf;

/// Result type for loader operations.
pub type LoaderResult<T> = Result<T, LoaderError>;

/// Errors from loader operations that change the pack root.
#[derive(Debug)]
pub enum LoaderError {
    /// No bundled pack has this name.
    UnknownBundle(String),

    /// Failed to create the pack root directory.
    CreateDirFailed { path: PathBuf, source: io::Error },

    /// Failed to write a bundled pack to disk.
    WriteFailed { path: PathBuf, source: io::Error },

    /// The written bundle did not validate as a pack.
    InvalidBundle { name: String, path: PathBuf },
}

impl std::fmt::Display for LoaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownBundle(name) => write!(f, "unknown bundled pack: {}", name),
            Self::CreateDirFailed { path, source } => {
                write!(
                    f,
                    "failed to create directory {}: {}",
                    path.display(),
                    source
                )
            }
            Self::WriteFailed { path, source } => {
                write!(f, "failed to write {}: {}", path.display(), source)
            }
            Self::InvalidBundle { name, path } => {
                write!(
                    f,
                    "bundled pack {} at {} is not a valid pack",
                    name,
                    path.display()
                )
            }
        }
    }
}

impl std::error::Error for LoaderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::CreateDirFailed { source, .. } => Some(source),
            Self::WriteFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}
