//! Interaction arbiter.
//!
//! Tracks the per-element gesture state machine (`idle → interacting →
//! committing → idle`) and the document-wide lock that suspends
//! reconciliation while a gesture is active. The lock is deliberately
//! over-conservative: it covers the whole document, and commit holds it for
//! a grace window so late async completions land against settled state.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use cardstock_core::ElementId;

use crate::error::{EngineError, EngineResult};

/// Default grace window held after a gesture commits.
pub const DEFAULT_COMMIT_GRACE: Duration = Duration::from_millis(150);

/// Per-element interaction state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionState {
    /// Not interacting.
    #[default]
    Idle,
    /// A gesture is manipulating the element.
    Interacting,
    /// Gesture committed; the grace window has not elapsed yet.
    Committing,
}

/// Mutual-exclusion state for gestures and reconciliation.
#[derive(Debug)]
pub struct InteractionArbiter {
    states: HashMap<ElementId, InteractionState>,
    active: Option<ElementId>,
    grace: Duration,
    locked_until: Option<Instant>,
}

impl InteractionArbiter {
    /// Create an arbiter with the default commit grace window.
    #[must_use]
    pub fn new() -> Self {
        Self::with_grace(DEFAULT_COMMIT_GRACE)
    }

    /// Create an arbiter with a custom grace window.
    #[must_use]
    pub fn with_grace(grace: Duration) -> Self {
        Self {
            states: HashMap::new(),
            active: None,
            grace,
            locked_until: None,
        }
    }

    /// Current state of an element.
    #[must_use]
    pub fn state(&self, id: ElementId) -> InteractionState {
        self.states.get(&id).copied().unwrap_or_default()
    }

    /// Whether the element is mid-gesture.
    #[must_use]
    pub fn is_interacting(&self, id: ElementId) -> bool {
        self.state(id) == InteractionState::Interacting
    }

    /// Begin a gesture on an element, taking the document lock.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::GestureInProgress`] if another element is
    /// already interacting (single-pointer assumption).
    pub fn begin(&mut self, id: ElementId) -> EngineResult<()> {
        self.expire();
        if let Some(active) = self.active {
            if active != id {
                return Err(EngineError::GestureInProgress(active));
            }
            return Ok(());
        }
        self.active = Some(id);
        self.states.insert(id, InteractionState::Interacting);
        self.locked_until = None;
        Ok(())
    }

    /// End the gesture on an element, entering the committing grace window.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NoActiveGesture`] if the element was not
    /// interacting.
    pub fn end(&mut self, id: ElementId) -> EngineResult<()> {
        if self.active != Some(id) {
            return Err(EngineError::NoActiveGesture(id));
        }
        self.active = None;
        self.states.insert(id, InteractionState::Committing);
        self.locked_until = Some(Instant::now() + self.grace);
        Ok(())
    }

    /// Whether the document-wide lock is currently held.
    ///
    /// Expired committing states are cleaned up on the way through.
    pub fn document_locked(&mut self) -> bool {
        self.expire();
        self.active.is_some() || self.locked_until.is_some()
    }

    /// Drop any grace window immediately. Test/shutdown hook.
    pub fn force_release(&mut self) {
        self.locked_until = None;
        self.expire();
    }

    /// Transition expired committing states back to idle.
    fn expire(&mut self) {
        if let Some(deadline) = self.locked_until {
            if Instant::now() >= deadline {
                self.locked_until = None;
            }
        }
        if self.locked_until.is_none() {
            self.states
                .retain(|_, state| *state != InteractionState::Committing);
        }
    }
}

impl Default for InteractionArbiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_pointer_exclusivity() {
        let mut arbiter = InteractionArbiter::with_grace(Duration::ZERO);
        let a = ElementId::new();
        let b = ElementId::new();

        arbiter.begin(a).expect("begin a");
        assert!(matches!(
            arbiter.begin(b),
            Err(EngineError::GestureInProgress(_))
        ));
        // Re-beginning the same gesture is idempotent.
        arbiter.begin(a).expect("rebegin a");
    }

    #[test]
    fn test_lock_held_while_interacting() {
        let mut arbiter = InteractionArbiter::with_grace(Duration::ZERO);
        let id = ElementId::new();
        assert!(!arbiter.document_locked());

        arbiter.begin(id).expect("begin");
        assert!(arbiter.document_locked());
        assert_eq!(arbiter.state(id), InteractionState::Interacting);

        arbiter.end(id).expect("end");
        // Zero grace: lock clears as soon as it is observed.
        assert!(!arbiter.document_locked());
        assert_eq!(arbiter.state(id), InteractionState::Idle);
    }

    #[test]
    fn test_grace_window_holds_lock() {
        let mut arbiter = InteractionArbiter::with_grace(Duration::from_secs(60));
        let id = ElementId::new();
        arbiter.begin(id).expect("begin");
        arbiter.end(id).expect("end");

        assert!(arbiter.document_locked());
        assert_eq!(arbiter.state(id), InteractionState::Committing);

        arbiter.force_release();
        assert!(!arbiter.document_locked());
        assert_eq!(arbiter.state(id), InteractionState::Idle);
    }

    #[test]
    fn test_end_without_begin_fails() {
        let mut arbiter = InteractionArbiter::new();
        assert!(matches!(
            arbiter.end(ElementId::new()),
            Err(EngineError::NoActiveGesture(_))
        ));
    }
}
