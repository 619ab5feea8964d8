//! Renderer error types.

use thiserror::Error;

/// Result type for render operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that can occur while building render-objects or exporting.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Asset fetch or decode failed.
    #[error("Failed to load resource: {0}")]
    Resource(String),

    /// Element construction failed.
    #[error("Builder failure: {0}")]
    Builder(String),

    /// QR code generation failed.
    #[error("QR generation failed: {0}")]
    Qr(String),

    /// Font registration or rasterization failed.
    #[error("Font error: {0}")]
    Font(String),

    /// Requested export pixels exceed the hard ceiling.
    #[error("Export dimensions {width}x{height} exceed the {max}px limit")]
    DimensionLimitExceeded {
        /// Requested output width.
        width: u32,
        /// Derived output height.
        height: u32,
        /// Hard per-axis ceiling.
        max: u32,
    },

    /// Rasterization or encoding failed.
    #[error("Export failed: {0}")]
    Export(String),

    /// Document model error.
    #[error("Document error: {0}")]
    Core(#[from] cardstock_core::CoreError),
}
