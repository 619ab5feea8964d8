//! Batch error types.

use thiserror::Error;

use crate::runner::MAX_BATCH_RECORDS;

/// Result type for batch operations.
pub type BatchResult<T> = Result<T, BatchError>;

/// Errors that can occur during batch personalization and export.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The batch holds more records than the hard ceiling.
    #[error("Batch has {count} records, exceeding the {MAX_BATCH_RECORDS} record limit")]
    RecordLimitExceeded {
        /// Records in the batch.
        count: usize,
    },

    /// The requested batch does not exist.
    #[error("Batch not found: {0}")]
    BatchNotFound(String),

    /// The requested document does not exist.
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// Structural render failure (dimension limit, degenerate canvas).
    #[error("Render error: {0}")]
    Render(#[from] cardstock_render::RenderError),

    /// Document model error.
    #[error("Document error: {0}")]
    Core(#[from] cardstock_core::CoreError),

    /// Archive I/O error.
    #[error("Archive I/O error: {0}")]
    Io(#[from] std::io::Error),
}
