//! Overlapping-object click disambiguation.
//!
//! Repeated clicks at (nearly) the same point cycle through the stacked
//! candidates under the pointer instead of always selecting the topmost.
//! The state machine is fully separate from reconciliation state: it holds
//! only the last click point, the candidate list it was cycling, and the
//! cycle index.

use cardstock_core::ElementId;

/// Default pixel radius within which two clicks count as "the same spot".
pub const DEFAULT_CLICK_THRESHOLD: f32 = 4.0;

/// Click-cycling state machine.
#[derive(Debug)]
pub struct ClickCycler {
    last_point: Option<(f32, f32)>,
    candidates: Vec<ElementId>,
    cycle_index: usize,
    threshold: f32,
}

impl ClickCycler {
    /// Create a cycler with the default threshold.
    #[must_use]
    pub fn new() -> Self {
        Self::with_threshold(DEFAULT_CLICK_THRESHOLD)
    }

    /// Create a cycler with a custom same-spot threshold in pixels.
    #[must_use]
    pub fn with_threshold(threshold: f32) -> Self {
        Self {
            last_point: None,
            candidates: Vec::new(),
            cycle_index: 0,
            threshold,
        }
    }

    /// Resolve a click.
    ///
    /// `candidates` are the elements under the pointer, topmost first. A
    /// click beyond the threshold from the last one, or over a different
    /// candidate stack, resets the cycle to the topmost candidate;
    /// otherwise the selection advances modulo the candidate count.
    pub fn pick(&mut self, point: (f32, f32), candidates: Vec<ElementId>) -> Option<ElementId> {
        if candidates.is_empty() {
            self.reset();
            return None;
        }

        let same_spot = self.last_point.is_some_and(|(lx, ly)| {
            let (dx, dy) = (point.0 - lx, point.1 - ly);
            (dx * dx + dy * dy).sqrt() <= self.threshold
        });

        if same_spot && candidates == self.candidates {
            self.cycle_index = (self.cycle_index + 1) % self.candidates.len();
        } else {
            self.candidates = candidates;
            self.cycle_index = 0;
        }
        self.last_point = Some(point);
        self.candidates.get(self.cycle_index).copied()
    }

    /// Clear all cycle state.
    pub fn reset(&mut self) {
        self.last_point = None;
        self.candidates.clear();
        self.cycle_index = 0;
    }
}

impl Default for ClickCycler {
    fn default() -> Self {
        Self::new()
    }
}
