//! Error types for document model operations.

use thiserror::Error;

/// Result type for document model operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in the document model.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Element not found in the document.
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Operation does not apply to the element's kind.
    #[error("Invalid operation on element: {0}")]
    InvalidOperation(String),

    /// Target index outside the element list.
    #[error("Index out of bounds: {index} (len {len})")]
    IndexOutOfBounds {
        /// Requested index.
        index: usize,
        /// Current list length.
        len: usize,
    },

    /// Malformed hex color string.
    #[error("Invalid color: {0}")]
    InvalidColor(String),

    /// Document serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
