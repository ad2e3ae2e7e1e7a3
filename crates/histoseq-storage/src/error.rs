//! Error types for histoseq-storage.
//!
//! Every failure that touches the index file carries the file path and the
//! byte offset of the failing operation. A read that comes back short is
//! reported as [`StorageError::CorruptIndex`], never as a plain I/O error.

use thiserror::Error;

use histoseq_core::CoreError;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised while building, loading or scanning an index.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The file is shorter than its header claims, or has trailing bytes.
    #[error("Corrupt index {path} at offset {offset}: {details}")]
    CorruptIndex {
        path: String,
        offset: u64,
        details: String,
    },

    /// Open, seek, read, write or rename failed.
    #[error("IO error on {path} at offset {offset}: {message}")]
    Io {
        path: String,
        offset: u64,
        message: String,
    },

    /// The request-scoped interrupt flag was raised.
    #[error("Search cancelled")]
    Cancelled,

    /// A blocking worker panicked or exited without reporting.
    #[error("Worker failed: {0}")]
    WorkerFailed(String),

    /// Invalid arguments or configuration from histoseq-core.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl StorageError {
    /// Map an I/O error at `offset` in `path`.
    ///
    /// `UnexpectedEof` means the file ended inside a record and becomes
    /// `CorruptIndex`.
    pub fn io(path: impl Into<String>, offset: u64, err: std::io::Error) -> Self {
        let path = path.into();
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            Self::CorruptIndex {
                path,
                offset,
                details: "short read".to_string(),
            }
        } else {
            Self::Io {
                path,
                offset,
                message: err.to_string(),
            }
        }
    }

    /// Create a corrupt index error.
    pub fn corrupt(path: impl Into<String>, offset: u64, details: impl Into<String>) -> Self {
        Self::CorruptIndex {
            path: path.into(),
            offset,
            details: details.into(),
        }
    }

    /// True for errors caused by the file contents rather than the environment.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::CorruptIndex { .. })
    }
}

static_assertions::assert_impl_all!(StorageError: Send, Sync, std::error::Error);
