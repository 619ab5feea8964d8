//! Template elements - the building blocks of documents.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::color::Color;

/// Unique identifier for an element.
///
/// Stable across undo/redo snapshots and batch cloning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementId(Uuid);

impl ElementId {
    /// Create a new unique element ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Text style flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextStyle {
    /// Bold weight.
    #[serde(default)]
    pub bold: bool,
    /// Italic slant.
    #[serde(default)]
    pub italic: bool,
    /// Underline decoration.
    #[serde(default)]
    pub underline: bool,
}

/// Structured meaning of a QR payload, resolved by the data-formatting
/// collaborator during batch personalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QrPayloadKind {
    /// Plain text payload.
    Text,
    /// URL payload.
    Url,
    /// `vCard` contact payload.
    VCard,
}

/// Geometric shape variants.
///
/// Circle and ellipse dimensions are always derived from radii; there is no
/// independently persisted scale for shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum ShapeKind {
    /// Axis-aligned rectangle.
    Rect {
        /// Width in canvas units.
        width: f32,
        /// Height in canvas units.
        height: f32,
        /// Fill color, if any.
        fill: Option<Color>,
        /// Stroke color, if any.
        stroke: Option<Color>,
        /// Stroke width in canvas units.
        stroke_width: f32,
    },
    /// Circle; box is 2×radius square.
    Circle {
        /// Radius in canvas units.
        radius: f32,
        /// Fill color, if any.
        fill: Option<Color>,
        /// Stroke color, if any.
        stroke: Option<Color>,
        /// Stroke width in canvas units.
        stroke_width: f32,
    },
    /// Ellipse; box is 2×rx by 2×ry.
    Ellipse {
        /// Horizontal radius.
        rx: f32,
        /// Vertical radius.
        ry: f32,
        /// Fill color, if any.
        fill: Option<Color>,
        /// Stroke color, if any.
        stroke: Option<Color>,
        /// Stroke width in canvas units.
        stroke_width: f32,
    },
    /// Line segment from the element position to position + (dx, dy).
    Line {
        /// Horizontal extent.
        dx: f32,
        /// Vertical extent.
        dy: f32,
        /// Stroke color.
        stroke: Color,
        /// Stroke width in canvas units.
        stroke_width: f32,
    },
}

/// Binding of a table cell to an element elsewhere in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellBinding {
    /// Zero-based row.
    pub row: usize,
    /// Zero-based column.
    pub col: usize,
    /// Bound element.
    pub element: ElementId,
}

/// The content an element carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ElementKind {
    /// A line of text, optionally bound to a batch field.
    Text {
        /// Text content.
        content: String,
        /// Font family name, resolved against the registered font store.
        font_family: String,
        /// Font size in canvas-unit pixels.
        font_size: u32,
        /// One or more colors. More than one renders word-by-word as a
        /// multi-color composite.
        colors: Vec<Color>,
        /// Style flags.
        #[serde(default)]
        style: TextStyle,
        /// Batch field binding, resolved against the attribute dictionary.
        #[serde(default)]
        field_id: Option<String>,
    },

    /// A raster image. The display box is decoupled from the intrinsic
    /// resolution: the source keeps its full resolution and the element
    /// stores only a display scale.
    Image {
        /// Source URI (`data:`, file path, or http/https URL).
        source: String,
        /// Intrinsic source width in pixels.
        source_width: u32,
        /// Intrinsic source height in pixels.
        source_height: u32,
        /// Horizontal display scale; box width = `source_width` × this.
        scale_x: f32,
        /// Vertical display scale; box height = `source_height` × this.
        scale_y: f32,
    },

    /// A generated QR code.
    Qr {
        /// Encoded payload string.
        payload: String,
        /// Structured payload meaning for batch regeneration.
        payload_kind: QrPayloadKind,
        /// Dark module color.
        dark: Color,
        /// Light module color.
        light: Color,
        /// Square box side length in canvas units.
        size: f32,
    },

    /// A geometric shape.
    Shape(ShapeKind),

    /// A table grid with per-row/column sizing and cell bindings.
    Table {
        /// Row count.
        rows: usize,
        /// Column count.
        cols: usize,
        /// Per-row heights in canvas units; length == `rows`.
        row_heights: Vec<f32>,
        /// Per-column widths in canvas units; length == `cols`.
        col_widths: Vec<f32>,
        /// Grid stroke color.
        stroke: Color,
        /// Grid stroke width.
        stroke_width: f32,
        /// Cell-to-element bindings.
        #[serde(default)]
        cells: Vec<CellBinding>,
    },
}

impl ElementKind {
    /// Short name for logging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Image { .. } => "image",
            Self::Qr { .. } => "qr",
            Self::Shape(_) => "shape",
            Self::Table { .. } => "table",
        }
    }
}

/// A document element: content plus placement on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Unique identifier.
    pub id: ElementId,
    /// Element content.
    pub kind: ElementKind,
    /// X position in canvas units (from left).
    pub x: f32,
    /// Y position in canvas units (from top).
    pub y: f32,
    /// Rotation in degrees, clockwise.
    #[serde(default)]
    pub rotation: f32,
    /// Opacity in [0, 1].
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    /// Locked elements are never patched by reconciliation.
    #[serde(default)]
    pub locked: bool,
    /// Excluded elements are dropped from exports.
    #[serde(default)]
    pub exclude_from_export: bool,
}

fn default_opacity() -> f32 {
    1.0
}

impl Element {
    /// Create a new element at the origin.
    #[must_use]
    pub fn new(kind: ElementKind) -> Self {
        Self {
            id: ElementId::new(),
            kind,
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            opacity: 1.0,
            locked: false,
            exclude_from_export: false,
        }
    }

    /// Set the position.
    #[must_use]
    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    /// Set the rotation in degrees.
    #[must_use]
    pub fn rotated(mut self, degrees: f32) -> Self {
        self.rotation = degrees;
        self
    }

    /// Set the opacity.
    #[must_use]
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    /// Mark the element as excluded from export.
    #[must_use]
    pub fn excluded(mut self) -> Self {
        self.exclude_from_export = true;
        self
    }

    /// The element's box in canvas units, derived per kind.
    ///
    /// Text has no fixed box (its bounds come from measurement), so it
    /// returns `None`. Circle and ellipse boxes are derived from their radii.
    #[must_use]
    pub fn size(&self) -> Option<(f32, f32)> {
        match &self.kind {
            ElementKind::Text { .. } => None,
            ElementKind::Image {
                source_width,
                source_height,
                scale_x,
                scale_y,
                ..
            } => {
                #[allow(clippy::cast_precision_loss)]
                let size = (
                    *source_width as f32 * scale_x,
                    *source_height as f32 * scale_y,
                );
                Some(size)
            }
            ElementKind::Qr { size, .. } => Some((*size, *size)),
            ElementKind::Shape(shape) => Some(match shape {
                ShapeKind::Rect { width, height, .. } => (*width, *height),
                ShapeKind::Circle { radius, .. } => (radius * 2.0, radius * 2.0),
                ShapeKind::Ellipse { rx, ry, .. } => (rx * 2.0, ry * 2.0),
                ShapeKind::Line { dx, dy, .. } => (dx.abs(), dy.abs()),
            }),
            ElementKind::Table {
                row_heights,
                col_widths,
                ..
            } => Some((col_widths.iter().sum(), row_heights.iter().sum())),
        }
    }

    /// Check if a point (in canvas coordinates) falls within this element's
    /// axis-aligned box. Text elements use a zero-size box and never hit.
    #[must_use]
    pub fn contains_point(&self, px: f32, py: f32) -> bool {
        let Some((w, h)) = self.size() else {
            return false;
        };
        px >= self.x && px <= self.x + w && py >= self.y && py <= self.y + h
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circle(radius: f32) -> Element {
        Element::new(ElementKind::Shape(ShapeKind::Circle {
            radius,
            fill: Some(Color::BLACK),
            stroke: None,
            stroke_width: 0.0,
        }))
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Element::new(ElementKind::Qr {
            payload: "a".into(),
            payload_kind: QrPayloadKind::Text,
            dark: Color::BLACK,
            light: Color::WHITE,
            size: 80.0,
        });
        let b = circle(10.0);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_circle_box_derived_from_radius() {
        let c = circle(50.0);
        assert_eq!(c.size(), Some((100.0, 100.0)));
    }

    #[test]
    fn test_image_box_is_intrinsic_times_scale() {
        let img = Element::new(ElementKind::Image {
            source: "card.png".into(),
            source_width: 400,
            source_height: 200,
            scale_x: 0.5,
            scale_y: 0.5,
        });
        assert_eq!(img.size(), Some((200.0, 100.0)));
    }

    #[test]
    fn test_contains_point() {
        let c = circle(25.0).at(100.0, 100.0);
        assert!(c.contains_point(120.0, 130.0));
        assert!(!c.contains_point(50.0, 50.0));
    }

    #[test]
    fn test_kind_serde_round_trip() {
        let e = Element::new(ElementKind::Text {
            content: "Jane Doe".into(),
            font_family: "Inter".into(),
            font_size: 18,
            colors: vec![Color::BLACK, Color::rgb(200, 30, 30)],
            style: TextStyle {
                bold: true,
                ..TextStyle::default()
            },
            field_id: Some("full_name".into()),
        });
        let json = serde_json::to_string(&e).expect("serialize");
        let back: Element = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, e);
    }
}
