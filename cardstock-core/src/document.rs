//! Ordered element documents.
//!
//! A document is the canonical, serializable description of one template:
//! an ordered element list plus canvas configuration. Z-order is defined
//! purely by list index (0 = bottom); there is no separate z field.

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::element::{Element, ElementId};
use crate::error::{CoreError, CoreResult};

/// A template document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Elements in z-order, bottom first.
    elements: Vec<Element>,
    /// Canvas width in canvas units.
    pub canvas_width: f32,
    /// Canvas height in canvas units.
    pub canvas_height: f32,
    /// Canvas background color.
    pub background_color: Color,
    /// Default export width in pixels.
    pub export_width: u32,
}

impl Document {
    /// Create an empty document with the given canvas size.
    #[must_use]
    pub fn new(canvas_width: f32, canvas_height: f32) -> Self {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let export_width = canvas_width.max(1.0) as u32;
        Self {
            elements: Vec::new(),
            canvas_width,
            canvas_height,
            background_color: Color::WHITE,
            export_width,
        }
    }

    /// Append an element to the top of the z-order.
    pub fn push(&mut self, element: Element) -> ElementId {
        let id = element.id;
        self.elements.push(element);
        id
    }

    /// Insert an element at a specific z index.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IndexOutOfBounds`] if `index` is past the end.
    pub fn insert(&mut self, index: usize, element: Element) -> CoreResult<ElementId> {
        if index > self.elements.len() {
            return Err(CoreError::IndexOutOfBounds {
                index,
                len: self.elements.len(),
            });
        }
        let id = element.id;
        self.elements.insert(index, element);
        Ok(id)
    }

    /// Remove an element.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ElementNotFound`] if the element is not present.
    pub fn remove(&mut self, id: ElementId) -> CoreResult<Element> {
        let index = self
            .index_of(id)
            .ok_or_else(|| CoreError::ElementNotFound(id.to_string()))?;
        Ok(self.elements.remove(index))
    }

    /// Move an element to a new z index, shifting the others.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ElementNotFound`] if the element is not present,
    /// or [`CoreError::IndexOutOfBounds`] if the target index is invalid.
    pub fn move_to(&mut self, id: ElementId, index: usize) -> CoreResult<()> {
        if index >= self.elements.len() {
            return Err(CoreError::IndexOutOfBounds {
                index,
                len: self.elements.len(),
            });
        }
        let from = self
            .index_of(id)
            .ok_or_else(|| CoreError::ElementNotFound(id.to_string()))?;
        let element = self.elements.remove(from);
        self.elements.insert(index, element);
        Ok(())
    }

    /// Get an element by ID.
    #[must_use]
    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.iter().find(|e| e.id == id)
    }

    /// Get a mutable reference to an element by ID.
    pub fn element_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.iter_mut().find(|e| e.id == id)
    }

    /// Z index of an element (0 = bottom).
    #[must_use]
    pub fn index_of(&self, id: ElementId) -> Option<usize> {
        self.elements.iter().position(|e| e.id == id)
    }

    /// All elements in z-order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter()
    }

    /// Element IDs in z-order.
    #[must_use]
    pub fn ids(&self) -> Vec<ElementId> {
        self.elements.iter().map(|e| e.id).collect()
    }

    /// Number of elements.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Check if the document has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Serialize to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> CoreResult<String> {
        serde_json::to_string(self).map_err(CoreError::Serialization)
    }

    /// Deserialize from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        serde_json::from_str(json).map_err(CoreError::Serialization)
    }
}
