//! Render-object registry.
//!
//! Maps element ids to their live render handles plus sync flags, and owns
//! the current render order (bottom → top). At most one handle exists per
//! id; recreation is atomic remove-then-add, preserving the order slot so
//! there is never a visible gap or duplicate.

use std::collections::HashMap;

use cardstock_core::ElementId;
use cardstock_render::RenderObject;

/// A registered handle with its synchronization flags.
#[derive(Debug)]
pub struct RegistryEntry {
    /// The live render-object.
    pub object: RenderObject,
    /// An async rebuild is in flight; the current object stays visible and
    /// reconciliation must not trigger another build.
    pub pending_create: bool,
    /// Build generation; completions carrying an older stamp are discarded.
    pub generation: u64,
}

/// Registry of live render handles.
#[derive(Debug, Default)]
pub struct RenderRegistry {
    entries: HashMap<ElementId, RegistryEntry>,
    order: Vec<ElementId>,
}

impl RenderRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handle, replacing any existing one atomically.
    ///
    /// An existing id keeps its position in the render order; a new id is
    /// placed on top.
    pub fn register(&mut self, id: ElementId, entry: RegistryEntry) {
        if self.entries.insert(id, entry).is_none() {
            self.order.push(id);
        }
    }

    /// Release a handle, removing it from the render order.
    pub fn release(&mut self, id: ElementId) -> Option<RegistryEntry> {
        let entry = self.entries.remove(&id)?;
        self.order.retain(|&other| other != id);
        Some(entry)
    }

    /// Get an entry.
    #[must_use]
    pub fn get(&self, id: ElementId) -> Option<&RegistryEntry> {
        self.entries.get(&id)
    }

    /// Get a mutable entry.
    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut RegistryEntry> {
        self.entries.get_mut(&id)
    }

    /// Whether the id has a handle.
    #[must_use]
    pub fn contains(&self, id: ElementId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Whether the id is awaiting an async build.
    #[must_use]
    pub fn is_pending(&self, id: ElementId) -> bool {
        self.entries.get(&id).is_some_and(|e| e.pending_create)
    }

    /// Registered ids, unordered.
    #[must_use]
    pub fn ids(&self) -> Vec<ElementId> {
        self.entries.keys().copied().collect()
    }

    /// Current render order, bottom first.
    #[must_use]
    pub fn order(&self) -> &[ElementId] {
        &self.order
    }

    /// Replace the render order in one atomic pass.
    ///
    /// Ids without a registered handle are ignored; registered ids missing
    /// from `desired` retain their relative position at the top.
    pub fn set_order(&mut self, desired: &[ElementId]) {
        let mut next: Vec<ElementId> = desired
            .iter()
            .copied()
            .filter(|id| self.entries.contains_key(id))
            .collect();
        for id in &self.order {
            if !next.contains(id) {
                next.push(*id);
            }
        }
        self.order = next;
    }

    /// Number of registered handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardstock_core::{Color, Element, ElementKind, ShapeKind};

    fn entry_for(element: &Element) -> RegistryEntry {
        RegistryEntry {
            object: RenderObject {
                id: element.id,
                x: element.x,
                y: element.y,
                rotation: 0.0,
                opacity: 1.0,
                scale_x: 1.0,
                scale_y: 1.0,
                width: 10.0,
                height: 10.0,
                built_kind: element.kind.clone(),
                intrinsic: None,
                raster: None,
                raster_scale: 1.0,
                placeholder: false,
                revision: 0,
            },
            pending_create: false,
            generation: 0,
        }
    }

    fn rect() -> Element {
        Element::new(ElementKind::Shape(ShapeKind::Rect {
            width: 10.0,
            height: 10.0,
            fill: Some(Color::BLACK),
            stroke: None,
            stroke_width: 0.0,
        }))
    }

    #[test]
    fn test_register_and_release() {
        let mut registry = RenderRegistry::new();
        let element = rect();
        registry.register(element.id, entry_for(&element));
        assert!(registry.contains(element.id));
        assert_eq!(registry.order(), &[element.id]);

        registry.release(element.id);
        assert!(registry.is_empty());
        assert!(registry.order().is_empty());
    }

    #[test]
    fn test_reregister_keeps_order_slot() {
        let mut registry = RenderRegistry::new();
        let a = rect();
        let b = rect();
        registry.register(a.id, entry_for(&a));
        registry.register(b.id, entry_for(&b));

        // Recreating `a` must not move it to the top.
        registry.register(a.id, entry_for(&a));
        assert_eq!(registry.order(), &[a.id, b.id]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_set_order_is_atomic_and_filters_unknown() {
        let mut registry = RenderRegistry::new();
        let a = rect();
        let b = rect();
        let ghost = rect();
        registry.register(a.id, entry_for(&a));
        registry.register(b.id, entry_for(&b));

        registry.set_order(&[ghost.id, b.id, a.id]);
        assert_eq!(registry.order(), &[b.id, a.id]);
    }
}
