//! Error types for the classifier

use thiserror::Error;

/// Result type alias for classifier operations
pub type Result<T> = std::result::Result<T, KnnError>;

/// Error types that can occur in classifier operations.
///
/// Every precondition violation of the classifier itself is reported as
/// [`KnnError::InvalidInput`]. The remaining variants only come from the
/// snapshot layer.
#[derive(Error, Debug)]
pub enum KnnError {
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Snapshot corrupted: {reason}")]
    Corrupted { reason: String },
}

impl KnnError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        KnnError::InvalidInput {
            reason: reason.into(),
        }
    }

    pub(crate) fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::invalid(format!(
            "dimension mismatch: expected {}, got {}",
            expected, actual
        ))
    }

    /// Whether this error is a caller-side precondition violation.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, KnnError::InvalidInput { .. })
    }
}
