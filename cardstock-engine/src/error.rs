//! Engine error types.

use cardstock_core::ElementId;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur in the synchronization engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A gesture is already active on another element.
    #[error("Another gesture is already active (element {0})")]
    GestureInProgress(ElementId),

    /// No gesture is active on the element.
    #[error("No active gesture for element {0}")]
    NoActiveGesture(ElementId),

    /// No render handle exists for the element.
    #[error("No render handle for element {0}")]
    HandleMissing(ElementId),

    /// The element is locked against interaction.
    #[error("Element {0} is locked")]
    ElementLocked(ElementId),

    /// Document model error.
    #[error("Document error: {0}")]
    Core(#[from] cardstock_core::CoreError),
}
