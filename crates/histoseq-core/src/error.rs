//! Error types for histoseq-core.
//!
//! This module defines the central error type [`CoreError`] used throughout
//! the histoseq-core crate, along with the [`CoreResult<T>`] type alias.
//!
//! Sparse-data conditions (an all-zero histogram row, a centroid that never
//! claimed a corpus position) are not errors. They are recovered where they
//! occur and only surface as `tracing` events.
//!
//! # Examples
//!
//! ```rust
//! use histoseq_core::CoreError;
//!
//! let error = CoreError::DimensionMismatch {
//!     expected: 256,
//!     actual: 128,
//! };
//! assert!(error.to_string().contains("256"));
//! ```

use thiserror::Error;

/// Top-level error type for histoseq-core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Configuration is invalid or could not be loaded.
    ///
    /// # When This Occurs
    ///
    /// - A TOML file cannot be read or parsed
    /// - A field fails `HistoseqConfig::validate()`
    /// - Environment overrides produce an unparseable value
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Vector dimension does not match the fixed feature dimension.
    ///
    /// `Constraint: vector.len() == FEATURE_DIM (256)`
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension provided
        actual: usize,
    },

    /// An argument failed a precondition.
    #[error("Invalid input: {field} - {message}")]
    InvalidInput {
        /// Name of the offending argument
        field: String,
        /// Description of the violation
        message: String,
    },
}

impl CoreError {
    /// Create an invalid input error with context.
    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<config::ConfigError> for CoreError {
    fn from(err: config::ConfigError) -> Self {
        CoreError::ConfigError(err.to_string())
    }
}

/// Result type alias for histoseq-core operations.
pub type CoreResult<T> = Result<T, CoreError>;

static_assertions::assert_impl_all!(CoreError: Send, Sync, std::error::Error);
