//! Type builders: construct render-objects per element kind and translate
//! committed gesture geometry back into model semantics.
//!
//! Construction is async for kinds that fetch or generate (images, QR) and
//! for multi-color text composites. A failed build never propagates: the
//! builder logs and falls back to a neutral placeholder object.

use cardstock_core::{Element, ElementKind, ModelPatch, ShapeKind};
use tiny_skia::{Pixmap, PixmapPaint, Transform};
use tracing::warn;

use crate::assets::{decode_image, downscale_to_fit, AssetSource};
use crate::fonts::FontStore;
use crate::qr::qr_pixmap;
use crate::sprite::{
    pixmap_from_rgba, placeholder_pixmap, shape_pixmap, table_pixmap, RenderObject,
};

/// Tolerance in canvas units below which box drift is ignored.
pub const GEOMETRY_EPSILON: f32 = 0.5;

/// Fallback box side for placeholders when an element has no derivable size.
const PLACEHOLDER_SIDE: f32 = 64.0;

/// Everything a builder needs to construct sprites.
pub struct BuildContext<'a> {
    /// Source of raw asset bytes.
    pub assets: &'a dyn AssetSource,
    /// Registered font families.
    pub fonts: &'a FontStore,
    /// Device pixels per canvas unit for sprite rasters.
    pub raster_scale: f32,
    /// Cap on preview texture sides; `None` keeps full intrinsic resolution.
    pub max_texture_side: Option<u32>,
}

impl std::fmt::Debug for BuildContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildContext")
            .field("raster_scale", &self.raster_scale)
            .field("max_texture_side", &self.max_texture_side)
            .finish_non_exhaustive()
    }
}

/// Build a render-object for an element.
///
/// Position, rotation, and opacity are taken from the element as passed in;
/// callers recreating an existing handle capture the live placement into the
/// element clone at request time, so late completions never read a moved
/// handle.
pub async fn build_object(element: &Element, ctx: &BuildContext<'_>, revision: u64) -> RenderObject {
    let result = match &element.kind {
        ElementKind::Text { .. } => build_text(element, ctx),
        ElementKind::Image { .. } => build_image(element, ctx).await,
        ElementKind::Qr { .. } => build_qr(element, ctx),
        ElementKind::Shape(shape) => Ok(sprite_object(
            element,
            shape_pixmap(shape, ctx.raster_scale),
            ctx.raster_scale,
            revision,
        )),
        ElementKind::Table {
            row_heights,
            col_widths,
            stroke,
            stroke_width,
            ..
        } => Ok(sprite_object(
            element,
            table_pixmap(
                row_heights,
                col_widths,
                *stroke,
                *stroke_width,
                ctx.raster_scale,
            ),
            ctx.raster_scale,
            revision,
        )),
    };

    match result {
        Ok(mut object) => {
            object.revision = revision;
            object
        }
        Err(reason) => {
            warn!(
                element = %element.id,
                kind = element.kind.name(),
                %reason,
                "builder failed, using placeholder"
            );
            placeholder_object(element, ctx.raster_scale, revision)
        }
    }
}

/// Whether the element's content has drifted from what the handle was built
/// from, beyond tolerance, requiring an atomic rebuild.
///
/// Placeholders are not retried here: they rebuild only when the element
/// itself changes, which keeps permanently failing sources from looping.
#[must_use]
pub fn needs_rebuild(element: &Element, object: &RenderObject) -> bool {
    match (&element.kind, &object.built_kind) {
        (
            ElementKind::Text {
                content,
                font_family,
                font_size,
                colors,
                style,
                ..
            },
            ElementKind::Text {
                content: built_content,
                font_family: built_family,
                font_size: built_size,
                colors: built_colors,
                style: built_style,
                ..
            },
        ) => {
            content != built_content
                || font_family != built_family
                || font_size != built_size
                || colors != built_colors
                || style != built_style
        }

        (
            ElementKind::Image { source, .. },
            ElementKind::Image {
                source: built_source,
                ..
            },
        ) => {
            if source != built_source {
                return true;
            }
            let Some((w, h)) = element.size() else {
                return false;
            };
            (w - object.width).abs() > GEOMETRY_EPSILON
                || (h - object.height).abs() > GEOMETRY_EPSILON
        }

        (
            ElementKind::Qr { payload, size, .. },
            ElementKind::Qr {
                payload: built_payload,
                ..
            },
        ) => payload != built_payload || (size - object.width).abs() > GEOMETRY_EPSILON,

        (ElementKind::Shape(shape), ElementKind::Shape(built_shape)) => {
            shape_differs(shape, built_shape)
        }

        (
            ElementKind::Table {
                rows,
                cols,
                row_heights,
                col_widths,
                stroke,
                stroke_width,
                ..
            },
            ElementKind::Table {
                rows: built_rows,
                cols: built_cols,
                row_heights: built_row_heights,
                col_widths: built_col_widths,
                stroke: built_stroke,
                stroke_width: built_stroke_width,
                ..
            },
        ) => {
            rows != built_rows
                || cols != built_cols
                || stroke != built_stroke
                || (stroke_width - built_stroke_width).abs() > GEOMETRY_EPSILON
                || sizes_differ(row_heights, built_row_heights)
                || sizes_differ(col_widths, built_col_widths)
        }

        // Kind changed entirely.
        _ => true,
    }
}

/// Translate a handle's committed transient geometry into a model patch.
///
/// Geometry rules per kind:
/// - Text: vertical scale s → `font_size = round(old × s)`; multi-color text
///   always forces a full composite rebuild, even for an identity scale.
/// - Image: display scale multiplies by the gesture scale per axis.
/// - QR: the box side takes the larger axis factor and rebuilds.
/// - Circle/ellipse: factors write straight to radius / rx,ry.
/// - Rect/line: factors write straight to width/height extents.
/// - Table: factors write through to the row/column size vectors.
#[must_use]
pub fn apply_geometry_change(element: &Element, object: &RenderObject) -> ModelPatch {
    let mut patch = ModelPatch::default();
    if (object.x - element.x).abs() > f32::EPSILON {
        patch.x = Some(object.x);
    }
    if (object.y - element.y).abs() > f32::EPSILON {
        patch.y = Some(object.y);
    }
    if (object.rotation - element.rotation).abs() > f32::EPSILON {
        patch.rotation = Some(object.rotation);
    }

    let sx = object.scale_x;
    let sy = object.scale_y;
    let uniform = sx.max(sy);
    let scaled_x = (sx - 1.0).abs() > f32::EPSILON;
    let scaled_y = (sy - 1.0).abs() > f32::EPSILON;
    let scaled = scaled_x || scaled_y;

    match &element.kind {
        ElementKind::Text {
            font_size, colors, ..
        } => {
            if colors.len() > 1 {
                // Multi-color composites are never patched in place.
                patch.rebuild = true;
            }
            if scaled_y {
                #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let new_size = ((*font_size as f32) * sy).round().max(1.0) as u32;
                if new_size != *font_size {
                    patch.font_size = Some(new_size);
                    patch.rebuild = true;
                }
            }
        }
        ElementKind::Image { scale_x, scale_y, .. } => {
            if scaled {
                patch.image_scale = Some((scale_x * sx, scale_y * sy));
            }
        }
        ElementKind::Qr { size, .. } => {
            if scaled {
                patch.qr_size = Some(size * uniform);
                patch.rebuild = true;
            }
        }
        ElementKind::Shape(shape) => match shape {
            ShapeKind::Rect { width, height, .. } => {
                if scaled {
                    patch.rect_size = Some((width * sx, height * sy));
                }
            }
            ShapeKind::Circle { radius, .. } => {
                if scaled {
                    patch.radius = Some(radius * uniform);
                }
            }
            ShapeKind::Ellipse { rx, ry, .. } => {
                if scaled {
                    patch.ellipse_radii = Some((rx * sx, ry * sy));
                }
            }
            ShapeKind::Line { dx, dy, .. } => {
                if scaled {
                    patch.line_delta = Some((dx * sx, dy * sy));
                }
            }
        },
        ElementKind::Table { .. } => {
            if scaled {
                patch.table_scale = Some((sx, sy));
            }
        }
    }
    patch
}

fn build_text(element: &Element, ctx: &BuildContext<'_>) -> Result<RenderObject, String> {
    let ElementKind::Text {
        content,
        font_family,
        font_size,
        colors,
        ..
    } = &element.kind
    else {
        return Err("not a text element".to_string());
    };
    if colors.is_empty() {
        return Err("text element has no colors".to_string());
    }
    if !ctx.fonts.contains(font_family) {
        return Err(format!("font family {font_family} is not registered"));
    }

    #[allow(clippy::cast_precision_loss)]
    let size_model = *font_size as f32;
    let size_px = size_model * ctx.raster_scale;

    let raster = if colors.len() == 1 {
        ctx.fonts
            .raster_line(font_family, size_px, content, colors[0])
            .ok_or_else(|| "text rasterization produced no pixels".to_string())?
    } else {
        compose_multi_color(ctx.fonts, font_family, size_px, content, colors)
            .ok_or_else(|| "multi-color composite produced no pixels".to_string())?
    };

    #[allow(clippy::cast_precision_loss)]
    let (width, height) = (
        raster.width() as f32 / ctx.raster_scale,
        raster.height() as f32 / ctx.raster_scale,
    );
    Ok(RenderObject {
        id: element.id,
        x: element.x,
        y: element.y,
        rotation: element.rotation,
        opacity: element.opacity,
        scale_x: 1.0,
        scale_y: 1.0,
        width,
        height,
        built_kind: element.kind.clone(),
        intrinsic: None,
        raster: Some(raster),
        raster_scale: ctx.raster_scale,
        placeholder: false,
        revision: 0,
    })
}

/// Render each whitespace-separated word in its own color, cycling through
/// the color list, and composite the runs left-to-right.
fn compose_multi_color(
    fonts: &FontStore,
    family: &str,
    size_px: f32,
    content: &str,
    colors: &[cardstock_core::Color],
) -> Option<Pixmap> {
    let words: Vec<&str> = content.split_whitespace().collect();
    if words.is_empty() {
        return None;
    }
    let space_width = fonts.measure(family, size_px, " ").0;

    let runs: Vec<Pixmap> = words
        .iter()
        .enumerate()
        .filter_map(|(i, word)| fonts.raster_line(family, size_px, word, colors[i % colors.len()]))
        .collect();
    if runs.len() != words.len() {
        return None;
    }

    #[allow(clippy::cast_precision_loss)]
    let total_width: f32 = runs.iter().map(|r| r.width() as f32).sum::<f32>()
        + space_width * (runs.len() - 1) as f32;
    let height = runs.iter().map(Pixmap::height).max()?;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let mut composite = Pixmap::new((total_width.ceil() as u32).max(1), height)?;

    let mut caret = 0.0_f32;
    for run in &runs {
        composite.draw_pixmap(
            0,
            0,
            run.as_ref(),
            &PixmapPaint::default(),
            Transform::from_translate(caret, 0.0),
            None,
        );
        #[allow(clippy::cast_precision_loss)]
        {
            caret += run.width() as f32 + space_width;
        }
    }
    Some(composite)
}

async fn build_image(element: &Element, ctx: &BuildContext<'_>) -> Result<RenderObject, String> {
    let ElementKind::Image { source, .. } = &element.kind else {
        return Err("not an image element".to_string());
    };

    let bytes = ctx
        .assets
        .fetch(source)
        .await
        .map_err(|e| e.to_string())?;
    let full = decode_image(&bytes).map_err(|e| e.to_string())?;
    let intrinsic = (full.width, full.height);

    let texture = match ctx.max_texture_side {
        Some(cap) => downscale_to_fit(&full, cap),
        None => full,
    };
    let raster = pixmap_from_rgba(texture.width, texture.height, &texture.data)
        .ok_or_else(|| "image buffer mismatch".to_string())?;

    let (width, height) = element.size().unwrap_or((PLACEHOLDER_SIDE, PLACEHOLDER_SIDE));
    Ok(RenderObject {
        id: element.id,
        x: element.x,
        y: element.y,
        rotation: element.rotation,
        opacity: element.opacity,
        scale_x: 1.0,
        scale_y: 1.0,
        width,
        height,
        built_kind: element.kind.clone(),
        intrinsic: Some(intrinsic),
        raster: Some(raster),
        raster_scale: ctx.raster_scale,
        placeholder: false,
        revision: 0,
    })
}

fn build_qr(element: &Element, ctx: &BuildContext<'_>) -> Result<RenderObject, String> {
    let ElementKind::Qr {
        payload,
        dark,
        light,
        size,
        ..
    } = &element.kind
    else {
        return Err("not a qr element".to_string());
    };

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let side_px = ((size * ctx.raster_scale).round() as u32).max(1);
    let raster = qr_pixmap(payload, *dark, *light, side_px).map_err(|e| e.to_string())?;

    Ok(RenderObject {
        id: element.id,
        x: element.x,
        y: element.y,
        rotation: element.rotation,
        opacity: element.opacity,
        scale_x: 1.0,
        scale_y: 1.0,
        width: *size,
        height: *size,
        built_kind: element.kind.clone(),
        intrinsic: None,
        raster: Some(raster),
        raster_scale: ctx.raster_scale,
        placeholder: false,
        revision: 0,
    })
}

fn sprite_object(
    element: &Element,
    raster: Option<Pixmap>,
    raster_scale: f32,
    revision: u64,
) -> RenderObject {
    let (width, height) = element.size().unwrap_or((PLACEHOLDER_SIDE, PLACEHOLDER_SIDE));
    RenderObject {
        id: element.id,
        x: element.x,
        y: element.y,
        rotation: element.rotation,
        opacity: element.opacity,
        scale_x: 1.0,
        scale_y: 1.0,
        width,
        height,
        built_kind: element.kind.clone(),
        intrinsic: None,
        raster,
        raster_scale,
        placeholder: false,
        revision,
    }
}

fn placeholder_object(element: &Element, raster_scale: f32, revision: u64) -> RenderObject {
    let (width, height) = match element.size() {
        Some((w, h)) if w >= 1.0 && h >= 1.0 => (w, h),
        _ => (PLACEHOLDER_SIDE, PLACEHOLDER_SIDE),
    };
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let raster = placeholder_pixmap(
        (width * raster_scale).ceil() as u32,
        (height * raster_scale).ceil() as u32,
    );
    RenderObject {
        id: element.id,
        x: element.x,
        y: element.y,
        rotation: element.rotation,
        opacity: element.opacity,
        scale_x: 1.0,
        scale_y: 1.0,
        width,
        height,
        built_kind: element.kind.clone(),
        intrinsic: None,
        raster,
        raster_scale,
        placeholder: true,
        revision,
    }
}

#[allow(clippy::similar_names)]
fn shape_differs(a: &ShapeKind, b: &ShapeKind) -> bool {
    match (a, b) {
        (
            ShapeKind::Rect {
                width: w1,
                height: h1,
                fill: f1,
                stroke: s1,
                stroke_width: sw1,
            },
            ShapeKind::Rect {
                width: w2,
                height: h2,
                fill: f2,
                stroke: s2,
                stroke_width: sw2,
            },
        ) => {
            (w1 - w2).abs() > GEOMETRY_EPSILON
                || (h1 - h2).abs() > GEOMETRY_EPSILON
                || f1 != f2
                || s1 != s2
                || (sw1 - sw2).abs() > GEOMETRY_EPSILON
        }
        (
            ShapeKind::Circle {
                radius: r1,
                fill: f1,
                stroke: s1,
                stroke_width: sw1,
            },
            ShapeKind::Circle {
                radius: r2,
                fill: f2,
                stroke: s2,
                stroke_width: sw2,
            },
        ) => {
            (r1 - r2).abs() > GEOMETRY_EPSILON
                || f1 != f2
                || s1 != s2
                || (sw1 - sw2).abs() > GEOMETRY_EPSILON
        }
        (
            ShapeKind::Ellipse {
                rx: rx1,
                ry: ry1,
                fill: f1,
                stroke: s1,
                stroke_width: sw1,
            },
            ShapeKind::Ellipse {
                rx: rx2,
                ry: ry2,
                fill: f2,
                stroke: s2,
                stroke_width: sw2,
            },
        ) => {
            (rx1 - rx2).abs() > GEOMETRY_EPSILON
                || (ry1 - ry2).abs() > GEOMETRY_EPSILON
                || f1 != f2
                || s1 != s2
                || (sw1 - sw2).abs() > GEOMETRY_EPSILON
        }
        (
            ShapeKind::Line {
                dx: dx1,
                dy: dy1,
                stroke: s1,
                stroke_width: sw1,
            },
            ShapeKind::Line {
                dx: dx2,
                dy: dy2,
                stroke: s2,
                stroke_width: sw2,
            },
        ) => {
            (dx1 - dx2).abs() > GEOMETRY_EPSILON
                || (dy1 - dy2).abs() > GEOMETRY_EPSILON
                || s1 != s2
                || (sw1 - sw2).abs() > GEOMETRY_EPSILON
        }
        _ => true,
    }
}

fn sizes_differ(a: &[f32], b: &[f32]) -> bool {
    a.len() != b.len()
        || a.iter()
            .zip(b.iter())
            .any(|(x, y)| (x - y).abs() > GEOMETRY_EPSILON)
}
