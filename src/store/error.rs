use std::io;
use thiserror::Error;

use super::path::PathError;

/// Failure of a store operation
#[derive(Debug, Error)]
pub enum StoreError {
    /// No entry at the requested path
    #[error("not found: {0}")]
    NotFound(String),

    /// Path escapes the store root, or the store refuses writes
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Underlying medium failed
    #[error("I/O failure: {0}")]
    Io(#[source] io::Error),
}

impl StoreError {
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn read_only(kind: &str) -> Self {
        Self::AccessDenied(format!("{kind} store is read-only"))
    }
}

impl From<io::Error> for StoreError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            // A file used as a directory component means no such entry
            io::ErrorKind::NotFound | io::ErrorKind::NotADirectory => {
                Self::NotFound(err.to_string())
            }
            io::ErrorKind::PermissionDenied => Self::AccessDenied(err.to_string()),
            _ => Self::Io(err),
        }
    }
}

impl From<PathError> for StoreError {
    fn from(err: PathError) -> Self {
        Self::AccessDenied(err.to_string())
    }
}
