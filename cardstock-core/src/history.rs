//! Bounded undo/redo history.
//!
//! Every mutation records a deep-cloned document snapshot. The history is
//! capped; when full, the oldest snapshot is discarded. Undo and redo move a
//! cursor through the snapshots and advance a monotonic marker that the
//! reconciliation engine reads to decide position authority for exactly the
//! next pass.

use crate::document::Document;

/// Default snapshot cap.
pub const DEFAULT_HISTORY_CAP: usize = 50;

/// Capped snapshot history for one document.
#[derive(Debug, Clone)]
pub struct History {
    snapshots: Vec<Document>,
    cursor: usize,
    cap: usize,
    marker: u64,
}

impl History {
    /// Create a history seeded with the document's initial state.
    #[must_use]
    pub fn new(initial: &Document) -> Self {
        Self::with_cap(initial, DEFAULT_HISTORY_CAP)
    }

    /// Create a history with a custom snapshot cap (minimum 2).
    #[must_use]
    pub fn with_cap(initial: &Document, cap: usize) -> Self {
        Self {
            snapshots: vec![initial.clone()],
            cursor: 0,
            cap: cap.max(2),
            marker: 0,
        }
    }

    /// Record a new snapshot after a mutation.
    ///
    /// Discards any redo tail, then trims from the oldest end if the cap is
    /// exceeded.
    pub fn record(&mut self, doc: &Document) {
        self.snapshots.truncate(self.cursor + 1);
        self.snapshots.push(doc.clone());
        if self.snapshots.len() > self.cap {
            self.snapshots.remove(0);
        }
        self.cursor = self.snapshots.len() - 1;
    }

    /// Step back one snapshot, if possible.
    ///
    /// Advances the authority marker; the returned snapshot is a deep clone
    /// the caller should install as the current document.
    pub fn undo(&mut self) -> Option<Document> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        self.marker += 1;
        Some(self.snapshots[self.cursor].clone())
    }

    /// Step forward one snapshot, if possible.
    pub fn redo(&mut self) -> Option<Document> {
        if self.cursor + 1 >= self.snapshots.len() {
            return None;
        }
        self.cursor += 1;
        self.marker += 1;
        Some(self.snapshots[self.cursor].clone())
    }

    /// Monotonic counter that advances only when the history pointer moves.
    #[must_use]
    pub fn marker(&self) -> u64 {
        self.marker
    }

    /// Whether undo is possible.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    /// Whether redo is possible.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    /// Number of retained snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Whether the history holds only the initial snapshot.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.len() <= 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::element::{Element, ElementKind, ShapeKind};

    fn doc_with_n(n: usize) -> Document {
        let mut doc = Document::new(350.0, 200.0);
        for _ in 0..n {
            doc.push(Element::new(ElementKind::Shape(ShapeKind::Rect {
                width: 10.0,
                height: 10.0,
                fill: Some(Color::BLACK),
                stroke: None,
                stroke_width: 0.0,
            })));
        }
        doc
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let doc0 = doc_with_n(0);
        let mut history = History::new(&doc0);

        let doc1 = doc_with_n(1);
        history.record(&doc1);

        let back = history.undo().expect("undo");
        assert_eq!(back.element_count(), 0);

        let forward = history.redo().expect("redo");
        assert_eq!(forward.element_count(), 1);
    }

    #[test]
    fn test_marker_advances_only_on_pointer_moves() {
        let doc = doc_with_n(0);
        let mut history = History::new(&doc);
        assert_eq!(history.marker(), 0);

        history.record(&doc_with_n(1));
        assert_eq!(history.marker(), 0);

        history.undo();
        assert_eq!(history.marker(), 1);
        history.redo();
        assert_eq!(history.marker(), 2);
    }

    #[test]
    fn test_record_discards_redo_tail() {
        let mut history = History::new(&doc_with_n(0));
        history.record(&doc_with_n(1));
        history.record(&doc_with_n(2));
        history.undo();
        history.undo();
        assert!(history.can_redo());

        history.record(&doc_with_n(3));
        assert!(!history.can_redo());
        let back = history.undo().expect("undo");
        assert_eq!(back.element_count(), 0);
    }

    #[test]
    fn test_cap_discards_oldest() {
        let mut history = History::with_cap(&doc_with_n(0), 3);
        for n in 1..=5 {
            history.record(&doc_with_n(n));
        }
        assert_eq!(history.len(), 3);

        // Walk back as far as possible; the oldest retained snapshot is n=3.
        while history.can_undo() {
            history.undo();
        }
        assert!(history.undo().is_none());
    }

    #[test]
    fn test_undo_at_start_is_none() {
        let mut history = History::new(&doc_with_n(0));
        assert!(history.undo().is_none());
        assert_eq!(history.marker(), 0);
    }
}
