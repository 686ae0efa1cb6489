//! Storage error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by storage backends and engines.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory traversal failed.
    #[error("Failed to traverse {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// Object store request failed.
    #[error("Object store request failed for s3://{container}/{key}: {message}")]
    ObjectStore {
        container: String,
        key: String,
        message: String,
    },

    /// Source item or location does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Location cannot be served by the backend it was routed to.
    #[error("Invalid storage location: {0}")]
    InvalidLocation(String),

    /// Background task failed to complete.
    #[error("Storage task failed: {0}")]
    Task(String),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn object(
        container: impl Into<String>,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ObjectStore {
            container: container.into(),
            key: key.into(),
            message: message.into(),
        }
    }

    /// Whether the error means the item simply does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            StorageError::NotFound(_) => true,
            StorageError::Io { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
