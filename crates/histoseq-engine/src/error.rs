//! Error types for histoseq-engine.

use thiserror::Error;

use histoseq_core::CoreError;
use histoseq_storage::StorageError;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced to callers of `generate` and `build_from_corpus`.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration or argument error.
    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    /// Index build, load or search failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The tracing subscriber could not be configured.
    #[error("Logging error: {0}")]
    Logging(String),
}

impl EngineError {
    /// True when the request was cancelled through its interrupt flag.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Storage(StorageError::Cancelled))
    }
}

static_assertions::assert_impl_all!(EngineError: Send, Sync, std::error::Error);
