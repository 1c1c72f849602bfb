//! Error types for index construction, querying and evaluation

use thiserror::Error;

/// Result type alias for LSH operations
pub type Result<T> = std::result::Result<T, LshError>;

/// Error types that can occur while building or querying an index
#[derive(Error, Debug)]
pub enum LshError {
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid vector: {reason}")]
    InvalidVector { reason: String },

    #[error("Vector not found: {id}")]
    VectorNotFound { id: u64 },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl LshError {
    pub(crate) fn config(reason: impl Into<String>) -> Self {
        LshError::InvalidConfig {
            reason: reason.into(),
        }
    }
}
