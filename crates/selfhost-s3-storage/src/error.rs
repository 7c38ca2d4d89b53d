//! Storage error types.
//!
//! [`StorageError`] is a closed set: callers map each variant to a protocol
//! status by pattern matching. Path-safety failures are never reported as I/O
//! errors.

use std::io;

/// Errors returned by [`Storage`](crate::Storage) operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The key does not exist, or it names a directory where an object was
    /// expected.
    #[error("The specified key does not exist: {key}")]
    NotFound {
        /// The requested key.
        key: String,
    },

    /// The key would resolve outside the bucket directory, or contains bytes
    /// that are never valid in a key.
    #[error("Invalid object key: {key:?}")]
    InvalidPath {
        /// The rejected key.
        key: String,
    },

    /// A folder-marker key (ending in `/`) was written with a non-empty body.
    #[error("Folder marker {key} must have an empty body")]
    FolderMarkerNotEmpty {
        /// The folder-marker key.
        key: String,
    },

    /// Any other filesystem failure.
    #[error("{context}: {source}")]
    Io {
        /// What the store was doing when the error occurred.
        context: &'static str,
        /// The underlying error.
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    /// Build a closure that wraps an [`io::Error`] with `context`.
    pub(crate) fn io(context: &'static str) -> impl FnOnce(io::Error) -> Self {
        move |source| Self::Io { context, source }
    }

    /// Map `NotFound` I/O errors to [`StorageError::NotFound`] for `key`, and
    /// everything else to [`StorageError::Io`].
    pub(crate) fn from_lookup(key: &str, context: &'static str, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound {
                key: key.to_owned(),
            }
        } else {
            Self::Io { context, source }
        }
    }
}
