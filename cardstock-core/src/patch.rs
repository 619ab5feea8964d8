//! Model patches: the typed result of translating a committed gesture back
//! into model semantics.
//!
//! Type builders produce a [`ModelPatch`] from the transient geometry a
//! render-object accumulated during a gesture; applying it is the only path
//! by which the render surface writes into the model.

use crate::element::{Element, ElementKind, ShapeKind};
use crate::error::{CoreError, CoreResult};

/// A set of model writes produced by committing a gesture.
///
/// Unset fields are left untouched. `rebuild` signals that applying the
/// patch must change the render handle's identity (full recreation, never an
/// in-place update).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelPatch {
    /// New X position.
    pub x: Option<f32>,
    /// New Y position.
    pub y: Option<f32>,
    /// New rotation in degrees.
    pub rotation: Option<f32>,
    /// New font size (text).
    pub font_size: Option<u32>,
    /// New display scale (image).
    pub image_scale: Option<(f32, f32)>,
    /// New width/height (rectangle).
    pub rect_size: Option<(f32, f32)>,
    /// New radius (circle).
    pub radius: Option<f32>,
    /// New radii (ellipse).
    pub ellipse_radii: Option<(f32, f32)>,
    /// New extents (line).
    pub line_delta: Option<(f32, f32)>,
    /// New box side (QR).
    pub qr_size: Option<f32>,
    /// Row/column size factors (table).
    pub table_scale: Option<(f32, f32)>,
    /// The handle identity must change when this patch lands.
    pub rebuild: bool,
}

impl ModelPatch {
    /// Whether the patch writes nothing and forces no rebuild.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.rebuild && *self == Self::default()
    }

    /// Apply the patch to an element.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidOperation`] if a kind-specific field is
    /// set for an element of a different kind.
    #[allow(clippy::similar_names)]
    pub fn apply_to(&self, element: &mut Element) -> CoreResult<()> {
        if let Some(x) = self.x {
            element.x = x;
        }
        if let Some(y) = self.y {
            element.y = y;
        }
        if let Some(rotation) = self.rotation {
            element.rotation = rotation;
        }

        if let Some(size) = self.font_size {
            let ElementKind::Text { font_size, .. } = &mut element.kind else {
                return Err(kind_mismatch(element, "font_size"));
            };
            *font_size = size.max(1);
        }
        if let Some((sx, sy)) = self.image_scale {
            let ElementKind::Image { scale_x, scale_y, .. } = &mut element.kind else {
                return Err(kind_mismatch(element, "image_scale"));
            };
            *scale_x = sx;
            *scale_y = sy;
        }
        if let Some((w, h)) = self.rect_size {
            let ElementKind::Shape(ShapeKind::Rect { width, height, .. }) = &mut element.kind
            else {
                return Err(kind_mismatch(element, "rect_size"));
            };
            *width = w;
            *height = h;
        }
        if let Some(r) = self.radius {
            let ElementKind::Shape(ShapeKind::Circle { radius, .. }) = &mut element.kind else {
                return Err(kind_mismatch(element, "radius"));
            };
            *radius = r;
        }
        if let Some((new_rx, new_ry)) = self.ellipse_radii {
            let ElementKind::Shape(ShapeKind::Ellipse { rx, ry, .. }) = &mut element.kind else {
                return Err(kind_mismatch(element, "ellipse_radii"));
            };
            *rx = new_rx;
            *ry = new_ry;
        }
        if let Some((new_dx, new_dy)) = self.line_delta {
            let ElementKind::Shape(ShapeKind::Line { dx, dy, .. }) = &mut element.kind else {
                return Err(kind_mismatch(element, "line_delta"));
            };
            *dx = new_dx;
            *dy = new_dy;
        }
        if let Some(side) = self.qr_size {
            let ElementKind::Qr { size, .. } = &mut element.kind else {
                return Err(kind_mismatch(element, "qr_size"));
            };
            *size = side;
        }
        if let Some((sx, sy)) = self.table_scale {
            let ElementKind::Table {
                row_heights,
                col_widths,
                ..
            } = &mut element.kind
            else {
                return Err(kind_mismatch(element, "table_scale"));
            };
            for w in col_widths.iter_mut() {
                *w *= sx;
            }
            for h in row_heights.iter_mut() {
                *h *= sy;
            }
        }
        Ok(())
    }
}

fn kind_mismatch(element: &Element, field: &str) -> CoreError {
    CoreError::InvalidOperation(format!(
        "patch field {field} does not apply to {} element {}",
        element.kind.name(),
        element.id
    ))
}
