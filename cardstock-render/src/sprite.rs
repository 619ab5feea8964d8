//! Render-objects: the live, mutable counterparts of document elements.
//!
//! A [`RenderObject`] carries committed geometry, transient gesture scale,
//! a snapshot of the element kind it was built from, and a rasterized sprite
//! ready for compositing. Vector kinds (shapes, tables) are pre-rastered at
//! build time so compositing is uniform across kinds.

use cardstock_core::{Color, ElementId, ElementKind, ShapeKind};
use tiny_skia::{
    FillRule, Paint, PathBuilder, Pixmap, PixmapPaint, Rect, Stroke, Transform,
};

/// Live render handle for one element.
#[derive(Clone)]
pub struct RenderObject {
    /// Element this handle belongs to.
    pub id: ElementId,
    /// X position in canvas units.
    pub x: f32,
    /// Y position in canvas units.
    pub y: f32,
    /// Rotation in degrees.
    pub rotation: f32,
    /// Opacity in [0, 1].
    pub opacity: f32,
    /// Transient horizontal gesture scale; 1.0 at rest.
    pub scale_x: f32,
    /// Transient vertical gesture scale; 1.0 at rest.
    pub scale_y: f32,
    /// Committed box width in canvas units.
    pub width: f32,
    /// Committed box height in canvas units.
    pub height: f32,
    /// Snapshot of the element kind this handle was built from.
    pub built_kind: ElementKind,
    /// Full intrinsic source resolution (images only).
    pub intrinsic: Option<(u32, u32)>,
    /// Rasterized sprite, if construction succeeded.
    pub raster: Option<Pixmap>,
    /// Device pixels per canvas unit the sprite was rastered at.
    pub raster_scale: f32,
    /// The neutral fallback was used because construction failed.
    pub placeholder: bool,
    /// Identity stamp; changes whenever the handle is fully rebuilt.
    pub revision: u64,
}

impl RenderObject {
    /// The box the object currently occupies, including transient scale.
    #[must_use]
    pub fn bounds(&self) -> (f32, f32, f32, f32) {
        (
            self.x,
            self.y,
            self.width * self.scale_x,
            self.height * self.scale_y,
        )
    }

    /// Composite the sprite onto `canvas` at `multiplier` device pixels per
    /// canvas unit. Objects without a raster draw nothing.
    pub fn draw_into(&self, canvas: &mut Pixmap, multiplier: f32) {
        let Some(raster) = &self.raster else {
            return;
        };
        let target_w = self.width * self.scale_x * multiplier;
        let target_h = self.height * self.scale_y * multiplier;
        if target_w < 0.5 || target_h < 0.5 {
            return;
        }

        #[allow(clippy::cast_precision_loss)]
        let sx = target_w / raster.width() as f32;
        #[allow(clippy::cast_precision_loss)]
        let sy = target_h / raster.height() as f32;
        let px = self.x * multiplier;
        let py = self.y * multiplier;

        let mut transform = Transform::from_scale(sx, sy).post_translate(px, py);
        if self.rotation.abs() > f32::EPSILON {
            transform = transform.post_concat(Transform::from_rotate_at(
                self.rotation,
                px + target_w / 2.0,
                py + target_h / 2.0,
            ));
        }

        let paint = PixmapPaint {
            opacity: self.opacity.clamp(0.0, 1.0),
            ..PixmapPaint::default()
        };
        canvas.draw_pixmap(0, 0, raster.as_ref(), &paint, transform, None);
    }
}

impl std::fmt::Debug for RenderObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderObject")
            .field("id", &self.id)
            .field("x", &self.x)
            .field("y", &self.y)
            .field("rotation", &self.rotation)
            .field("scale", &(self.scale_x, self.scale_y))
            .field("box", &(self.width, self.height))
            .field("kind", &self.built_kind.name())
            .field("placeholder", &self.placeholder)
            .field("revision", &self.revision)
            .finish_non_exhaustive()
    }
}

/// Convert a model color to a tiny-skia color.
#[must_use]
pub fn to_skia_color(color: Color) -> tiny_skia::Color {
    tiny_skia::Color::from_rgba8(color.r, color.g, color.b, color.a)
}

/// Build a pixmap from raw RGBA bytes.
#[must_use]
pub fn pixmap_from_rgba(width: u32, height: u32, data: &[u8]) -> Option<Pixmap> {
    if data.len() != (width as usize) * (height as usize) * 4 {
        return None;
    }
    let mut pixmap = Pixmap::new(width, height)?;
    let pixels = pixmap.pixels_mut();
    for (idx, px) in data.chunks_exact(4).enumerate() {
        pixels[idx] = tiny_skia::ColorU8::from_rgba(px[0], px[1], px[2], px[3]).premultiply();
    }
    Some(pixmap)
}

/// Neutral gray placeholder sprite used when a builder fails.
#[must_use]
pub fn placeholder_pixmap(width: u32, height: u32) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(width.max(1), height.max(1))?;
    pixmap.fill(tiny_skia::Color::from_rgba8(224, 224, 224, 255));

    let mut paint = Paint::default();
    paint.set_color(tiny_skia::Color::from_rgba8(153, 153, 153, 255));
    paint.anti_alias = false;
    #[allow(clippy::cast_precision_loss)]
    let rect = Rect::from_xywh(0.5, 0.5, pixmap.width() as f32 - 1.0, pixmap.height() as f32 - 1.0)?;
    let path = PathBuilder::from_rect(rect);
    let stroke = Stroke {
        width: 1.0,
        ..Stroke::default()
    };
    pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    Some(pixmap)
}

/// Rasterize a shape at `raster_scale` device pixels per canvas unit.
#[must_use]
pub fn shape_pixmap(shape: &ShapeKind, raster_scale: f32) -> Option<Pixmap> {
    let (w, h) = match shape {
        ShapeKind::Rect { width, height, .. } => (*width, *height),
        ShapeKind::Circle { radius, .. } => (radius * 2.0, radius * 2.0),
        ShapeKind::Ellipse { rx, ry, .. } => (rx * 2.0, ry * 2.0),
        ShapeKind::Line { dx, dy, .. } => (dx.abs(), dy.abs()),
    };
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let (pw, ph) = (
        ((w * raster_scale).ceil() as u32).max(1),
        ((h * raster_scale).ceil() as u32).max(1),
    );
    let mut pixmap = Pixmap::new(pw, ph)?;
    #[allow(clippy::cast_precision_loss)]
    let (pw_f, ph_f) = (pw as f32, ph as f32);

    match shape {
        ShapeKind::Rect {
            fill,
            stroke,
            stroke_width,
            ..
        } => {
            let rect = Rect::from_xywh(0.0, 0.0, pw_f, ph_f)?;
            let path = PathBuilder::from_rect(rect);
            fill_and_stroke(&mut pixmap, &path, *fill, *stroke, stroke_width * raster_scale);
        }
        ShapeKind::Circle {
            fill,
            stroke,
            stroke_width,
            ..
        } => {
            let mut pb = PathBuilder::new();
            pb.push_circle(pw_f / 2.0, ph_f / 2.0, pw_f.min(ph_f) / 2.0);
            let path = pb.finish()?;
            fill_and_stroke(&mut pixmap, &path, *fill, *stroke, stroke_width * raster_scale);
        }
        ShapeKind::Ellipse {
            fill,
            stroke,
            stroke_width,
            ..
        } => {
            let rect = Rect::from_xywh(0.0, 0.0, pw_f, ph_f)?;
            let mut pb = PathBuilder::new();
            pb.push_oval(rect);
            let path = pb.finish()?;
            fill_and_stroke(&mut pixmap, &path, *fill, *stroke, stroke_width * raster_scale);
        }
        ShapeKind::Line {
            dx,
            dy,
            stroke,
            stroke_width,
        } => {
            // Draw within the local box; negative extents flip the diagonal.
            let (x0, y0) = (
                if *dx < 0.0 { pw_f } else { 0.0 },
                if *dy < 0.0 { ph_f } else { 0.0 },
            );
            let (x1, y1) = (pw_f - x0, ph_f - y0);
            let mut pb = PathBuilder::new();
            pb.move_to(x0, y0);
            pb.line_to(x1, y1);
            let path = pb.finish()?;
            fill_and_stroke(
                &mut pixmap,
                &path,
                None,
                Some(*stroke),
                stroke_width * raster_scale,
            );
        }
    }
    Some(pixmap)
}

/// Rasterize a table grid at `raster_scale` device pixels per canvas unit.
#[must_use]
pub fn table_pixmap(
    row_heights: &[f32],
    col_widths: &[f32],
    stroke: Color,
    stroke_width: f32,
    raster_scale: f32,
) -> Option<Pixmap> {
    let total_w: f32 = col_widths.iter().sum();
    let total_h: f32 = row_heights.iter().sum();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let (pw, ph) = (
        ((total_w * raster_scale).ceil() as u32).max(1),
        ((total_h * raster_scale).ceil() as u32).max(1),
    );
    let mut pixmap = Pixmap::new(pw, ph)?;
    #[allow(clippy::cast_precision_loss)]
    let (pw_f, ph_f) = (pw as f32, ph as f32);

    let mut pb = PathBuilder::new();
    // Outer border.
    if let Some(rect) = Rect::from_xywh(0.0, 0.0, pw_f, ph_f) {
        pb.push_rect(rect);
    }
    // Interior column separators.
    let mut cursor = 0.0_f32;
    for width in &col_widths[..col_widths.len().saturating_sub(1)] {
        cursor += width * raster_scale;
        pb.move_to(cursor, 0.0);
        pb.line_to(cursor, ph_f);
    }
    // Interior row separators.
    let mut cursor = 0.0_f32;
    for height in &row_heights[..row_heights.len().saturating_sub(1)] {
        cursor += height * raster_scale;
        pb.move_to(0.0, cursor);
        pb.line_to(pw_f, cursor);
    }
    let path = pb.finish()?;

    let mut paint = Paint::default();
    paint.set_color(to_skia_color(stroke));
    paint.anti_alias = true;
    let stroke_def = Stroke {
        width: (stroke_width * raster_scale).max(1.0),
        ..Stroke::default()
    };
    pixmap.stroke_path(&path, &paint, &stroke_def, Transform::identity(), None);
    Some(pixmap)
}

fn fill_and_stroke(
    pixmap: &mut Pixmap,
    path: &tiny_skia::Path,
    fill: Option<Color>,
    stroke: Option<Color>,
    stroke_width_px: f32,
) {
    if let Some(fill) = fill {
        let mut paint = Paint::default();
        paint.set_color(to_skia_color(fill));
        paint.anti_alias = true;
        pixmap.fill_path(path, &paint, FillRule::Winding, Transform::identity(), None);
    }
    if let Some(stroke) = stroke {
        if stroke_width_px > 0.0 {
            let mut paint = Paint::default();
            paint.set_color(to_skia_color(stroke));
            paint.anti_alias = true;
            let stroke_def = Stroke {
                width: stroke_width_px,
                ..Stroke::default()
            };
            pixmap.stroke_path(path, &paint, &stroke_def, Transform::identity(), None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixmap_from_rgba_checks_length() {
        assert!(pixmap_from_rgba(2, 2, &[0; 16]).is_some());
        assert!(pixmap_from_rgba(2, 2, &[0; 15]).is_none());
    }

    #[test]
    fn test_shape_pixmap_circle_is_square() {
        let shape = ShapeKind::Circle {
            radius: 20.0,
            fill: Some(Color::BLACK),
            stroke: None,
            stroke_width: 0.0,
        };
        let pixmap = shape_pixmap(&shape, 1.0).expect("raster");
        assert_eq!((pixmap.width(), pixmap.height()), (40, 40));
        // Center is filled, corner is transparent.
        let center = pixmap.pixel(20, 20).expect("pixel");
        assert!(center.alpha() > 0);
        let corner = pixmap.pixel(0, 0).expect("pixel");
        assert_eq!(corner.alpha(), 0);
    }

    #[test]
    fn test_shape_pixmap_scales_with_raster_scale() {
        let shape = ShapeKind::Rect {
            width: 10.0,
            height: 5.0,
            fill: Some(Color::BLACK),
            stroke: None,
            stroke_width: 0.0,
        };
        let pixmap = shape_pixmap(&shape, 3.0).expect("raster");
        assert_eq!((pixmap.width(), pixmap.height()), (30, 15));
    }

    #[test]
    fn test_table_pixmap_has_grid_pixels() {
        let pixmap = table_pixmap(&[20.0, 20.0], &[30.0, 30.0, 30.0], Color::BLACK, 1.0, 1.0)
            .expect("raster");
        assert_eq!((pixmap.width(), pixmap.height()), (90, 40));
        assert!(pixmap.pixels().iter().any(|p| p.alpha() > 0));
    }

    #[test]
    fn test_placeholder_is_neutral_gray() {
        let pixmap = placeholder_pixmap(10, 10).expect("raster");
        let center = pixmap.pixel(5, 5).expect("pixel");
        assert_eq!(center.red(), 224);
    }
}
