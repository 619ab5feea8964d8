//! Headless one-shot export.
//!
//! Rebuilds every render-object from a document snapshot on an isolated
//! surface (no registry, no interaction state), then rasterizes to PNG or
//! JPEG. The source document is never mutated.

use cardstock_core::{Color, Document, ElementKind};
use serde::{Deserialize, Serialize};
use tiny_skia::Pixmap;
use tracing::debug;

use crate::assets::AssetSource;
use crate::builder::{build_object, BuildContext};
use crate::error::{RenderError, RenderResult};
use crate::fonts::FontStore;
use crate::sprite::{to_skia_color, RenderObject};

/// Hard per-axis ceiling on export pixel dimensions.
pub const MAX_EXPORT_DIMENSION: u32 = 10_000;

/// Inset of the text safe area from each canvas edge, in canvas units.
pub const SAFE_AREA_INSET: f32 = 30.0;

/// Lower clamp for safe-area text shrinking.
pub const TEXT_FIT_MIN: f32 = 0.5;

/// Upper clamp for safe-area text shrinking.
pub const TEXT_FIT_MAX: f32 = 1.0;

/// Export output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportImageFormat {
    /// PNG image (alpha capable).
    Png,
    /// JPEG image (opaque).
    Jpg,
}

impl ExportImageFormat {
    /// File extension without the dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpg => "jpg",
        }
    }
}

/// Configuration for one export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Output format.
    pub format: ExportImageFormat,
    /// JPEG quality in [0, 1]; ignored for PNG.
    pub quality: f32,
    /// Output width in pixels; defaults to the document's export width.
    /// Height is derived from the canvas aspect ratio.
    pub target_width: Option<u32>,
    /// Background override; defaults to the document background.
    pub background_color: Option<Color>,
    /// Skip the background rectangle entirely (PNG only).
    pub transparent_background: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: ExportImageFormat::Png,
            quality: 0.9,
            target_width: None,
            background_color: None,
            transparent_background: false,
        }
    }
}

/// Phases reported through the progress callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStep {
    /// Dimension validation.
    Prepare,
    /// Render-object construction.
    Build,
    /// Safe-area text fitting.
    Fit,
    /// Compositing.
    Rasterize,
    /// Encoding.
    Encode,
}

impl std::fmt::Display for ExportStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Prepare => "prepare",
            Self::Build => "build",
            Self::Fit => "fit",
            Self::Rasterize => "rasterize",
            Self::Encode => "encode",
        };
        write!(f, "{name}")
    }
}

/// Progress callback: `(step, fraction in [0, 1])`.
pub type ProgressFn = dyn Fn(ExportStep, f32) + Send + Sync;

/// A finished export.
#[derive(Debug, Clone)]
pub struct ExportResult {
    /// Encoded image bytes.
    pub bytes: Vec<u8>,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output format.
    pub format: ExportImageFormat,
    /// Encoded size in bytes.
    pub size_bytes: usize,
}

/// Renders document snapshots to encoded images without a live surface.
pub struct HeadlessRenderer<'a> {
    assets: &'a dyn AssetSource,
    fonts: &'a FontStore,
}

impl<'a> HeadlessRenderer<'a> {
    /// Create a renderer over the given asset and font sources.
    #[must_use]
    pub fn new(assets: &'a dyn AssetSource, fonts: &'a FontStore) -> Self {
        Self { assets, fonts }
    }

    /// Export a document snapshot.
    ///
    /// Builds every element in list order, awaiting each async builder,
    /// fits text into the safe area, drops excluded elements, composites at
    /// the requested multiplier, and encodes.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::DimensionLimitExceeded`] before any render
    /// work if the output would exceed [`MAX_EXPORT_DIMENSION`] on either
    /// axis, or [`RenderError::Export`] if rasterization/encoding fails.
    pub async fn render(
        &self,
        doc: &Document,
        config: &ExportConfig,
        progress: Option<&ProgressFn>,
    ) -> RenderResult<ExportResult> {
        report(progress, ExportStep::Prepare, 0.0);
        let (out_w, out_h, multiplier) = output_dimensions(doc, config)?;
        report(progress, ExportStep::Prepare, 1.0);

        // Images are rebuilt from their sources with no texture cap, so
        // exports always composite full-intrinsic-resolution reloads scaled
        // to the committed box.
        let ctx = BuildContext {
            assets: self.assets,
            fonts: self.fonts,
            raster_scale: multiplier,
            max_texture_side: None,
        };

        let total = doc.element_count().max(1);
        let mut objects: Vec<(bool, RenderObject)> = Vec::with_capacity(doc.element_count());
        for (index, element) in doc.elements().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            let object = build_object(element, &ctx, index as u64).await;
            objects.push((element.exclude_from_export, object));
            #[allow(clippy::cast_precision_loss)]
            report(progress, ExportStep::Build, (index + 1) as f32 / total as f32);
        }

        report(progress, ExportStep::Fit, 0.0);
        for (_, object) in &mut objects {
            fit_text_to_safe_area(object, doc.canvas_width, doc.canvas_height);
        }
        report(progress, ExportStep::Fit, 1.0);

        report(progress, ExportStep::Rasterize, 0.0);
        let mut canvas = Pixmap::new(out_w, out_h)
            .ok_or_else(|| RenderError::Export("Failed to allocate canvas".to_string()))?;

        let background = config.background_color.unwrap_or(doc.background_color);
        let paint_background =
            !(config.transparent_background && config.format == ExportImageFormat::Png);
        if paint_background {
            // Background is always composited opaque behind all elements.
            canvas.fill(to_skia_color(Color::rgb(
                background.r,
                background.g,
                background.b,
            )));
        }

        for (excluded, object) in &objects {
            if *excluded {
                debug!(element = %object.id, "skipping export-excluded element");
                continue;
            }
            object.draw_into(&mut canvas, multiplier);
        }
        report(progress, ExportStep::Rasterize, 1.0);

        report(progress, ExportStep::Encode, 0.0);
        let bytes = match config.format {
            ExportImageFormat::Png => canvas
                .encode_png()
                .map_err(|e| RenderError::Export(format!("PNG encoding failed: {e}")))?,
            ExportImageFormat::Jpg => encode_jpeg(&canvas, background, config.quality)?,
        };
        report(progress, ExportStep::Encode, 1.0);

        let size_bytes = bytes.len();
        Ok(ExportResult {
            bytes,
            width: out_w,
            height: out_h,
            format: config.format,
            size_bytes,
        })
    }
}

impl std::fmt::Debug for HeadlessRenderer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadlessRenderer").finish_non_exhaustive()
    }
}

/// Validate and compute `(width, height, multiplier)` for an export.
///
/// Exposed so batch runners can reject structurally impossible exports
/// before touching any record.
///
/// # Errors
///
/// Returns [`RenderError::DimensionLimitExceeded`] if either axis exceeds
/// the hard ceiling, or [`RenderError::Export`] for degenerate canvases.
pub fn output_dimensions(doc: &Document, config: &ExportConfig) -> RenderResult<(u32, u32, f32)> {
    if doc.canvas_width < 1.0 || doc.canvas_height < 1.0 {
        return Err(RenderError::Export(format!(
            "degenerate canvas {}x{}",
            doc.canvas_width, doc.canvas_height
        )));
    }
    let out_w = config.target_width.unwrap_or(doc.export_width).max(1);
    #[allow(clippy::cast_precision_loss)]
    let multiplier = out_w as f32 / doc.canvas_width;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let out_h = ((doc.canvas_height * multiplier).round() as u32).max(1);

    if out_w > MAX_EXPORT_DIMENSION || out_h > MAX_EXPORT_DIMENSION {
        return Err(RenderError::DimensionLimitExceeded {
            width: out_w,
            height: out_h,
            max: MAX_EXPORT_DIMENSION,
        });
    }
    Ok((out_w, out_h, multiplier))
}

/// Shrink a text object so its measured bounds fit the inset safe area.
///
/// The factor is the smaller of the width-fit and height-fit ratios, clamped
/// to `[TEXT_FIT_MIN, TEXT_FIT_MAX]`, applied as a uniform scale.
fn fit_text_to_safe_area(object: &mut RenderObject, canvas_width: f32, canvas_height: f32) {
    if !matches!(object.built_kind, ElementKind::Text { .. }) {
        return;
    }
    let safe_w = canvas_width - SAFE_AREA_INSET * 2.0;
    let safe_h = canvas_height - SAFE_AREA_INSET * 2.0;
    if safe_w <= 0.0 || safe_h <= 0.0 {
        return;
    }
    if object.width <= safe_w && object.height <= safe_h {
        return;
    }
    let factor = (safe_w / object.width)
        .min(safe_h / object.height)
        .clamp(TEXT_FIT_MIN, TEXT_FIT_MAX);
    object.scale_x = factor;
    object.scale_y = factor;
    debug!(element = %object.id, factor, "shrinking text into safe area");
}

/// Encode a pixmap as JPEG, blending alpha over the background color.
fn encode_jpeg(canvas: &Pixmap, background: Color, quality: f32) -> RenderResult<Vec<u8>> {
    use image::ImageEncoder;

    let (width, height) = (canvas.width(), canvas.height());
    let mut rgb_data = Vec::with_capacity((width * height * 3) as usize);
    for pixel in canvas.pixels() {
        let demul = pixel.demultiply();
        let alpha = f32::from(demul.alpha()) / 255.0;
        let inv = 1.0 - alpha;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            rgb_data
                .push(f32::from(demul.red()).mul_add(alpha, f32::from(background.r) * inv) as u8);
            rgb_data
                .push(f32::from(demul.green()).mul_add(alpha, f32::from(background.g) * inv) as u8);
            rgb_data
                .push(f32::from(demul.blue()).mul_add(alpha, f32::from(background.b) * inv) as u8);
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let jpeg_quality = ((quality.clamp(0.0, 1.0) * 100.0).round() as u8).max(1);
    let mut buf = std::io::Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, jpeg_quality);
    encoder
        .write_image(&rgb_data, width, height, image::ColorType::Rgb8.into())
        .map_err(|e| RenderError::Export(format!("JPEG encoding failed: {e}")))?;
    Ok(buf.into_inner())
}

fn report(progress: Option<&ProgressFn>, step: ExportStep, fraction: f32) {
    if let Some(callback) = progress {
        callback(step, fraction.clamp(0.0, 1.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardstock_core::{Element, ShapeKind};

    use crate::assets::LocalAssets;

    fn doc_with_circle() -> Document {
        let mut doc = Document::new(350.0, 200.0);
        doc.push(
            Element::new(ElementKind::Shape(ShapeKind::Circle {
                radius: 40.0,
                fill: Some(Color::rgb(20, 60, 200)),
                stroke: None,
                stroke_width: 0.0,
            }))
            .at(100.0, 60.0),
        );
        doc
    }

    #[test]
    fn test_dimension_limit_fails_fast() {
        let doc = doc_with_circle();
        let config = ExportConfig {
            target_width: Some(20_000),
            ..ExportConfig::default()
        };
        let result = output_dimensions(&doc, &config);
        assert!(matches!(
            result,
            Err(RenderError::DimensionLimitExceeded { max: 10_000, .. })
        ));
    }

    #[test]
    fn test_derived_height_can_exceed_limit() {
        // 350x200 canvas at width 9800 derives height 5600: fine. A tall
        // canvas flips the failing axis.
        let doc = Document::new(100.0, 2000.0);
        let config = ExportConfig {
            target_width: Some(600),
            ..ExportConfig::default()
        };
        let result = output_dimensions(&doc, &config);
        assert!(matches!(
            result,
            Err(RenderError::DimensionLimitExceeded { height: 12_000, .. })
        ));
    }

    #[test]
    fn test_multiplier_from_target_width() {
        let doc = doc_with_circle();
        let config = ExportConfig {
            target_width: Some(700),
            ..ExportConfig::default()
        };
        let (w, h, m) = output_dimensions(&doc, &config).expect("dims");
        assert_eq!((w, h), (700, 400));
        assert!((m - 2.0).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_png_export_magic_bytes() {
        let doc = doc_with_circle();
        let fonts = FontStore::new();
        let renderer = HeadlessRenderer::new(&LocalAssets, &fonts);
        let result = renderer
            .render(&doc, &ExportConfig::default(), None)
            .await
            .expect("export");
        assert_eq!(&result.bytes[0..4], &[137, 80, 78, 71]);
        assert_eq!(result.size_bytes, result.bytes.len());
    }

    #[tokio::test]
    async fn test_jpeg_export_magic_bytes() {
        let doc = doc_with_circle();
        let fonts = FontStore::new();
        let renderer = HeadlessRenderer::new(&LocalAssets, &fonts);
        let config = ExportConfig {
            format: ExportImageFormat::Jpg,
            quality: 0.8,
            ..ExportConfig::default()
        };
        let result = renderer.render(&doc, &config, None).await.expect("export");
        assert_eq!(result.bytes[0], 0xFF);
        assert_eq!(result.bytes[1], 0xD8);
    }

    #[tokio::test]
    async fn test_export_does_not_mutate_document() {
        let doc = doc_with_circle();
        let before = doc.clone();
        let fonts = FontStore::new();
        let renderer = HeadlessRenderer::new(&LocalAssets, &fonts);
        renderer
            .render(&doc, &ExportConfig::default(), None)
            .await
            .expect("export");
        assert_eq!(doc, before);
    }

    #[tokio::test]
    async fn test_progress_reaches_every_step() {
        use std::sync::{Arc, Mutex};

        let doc = doc_with_circle();
        let fonts = FontStore::new();
        let renderer = HeadlessRenderer::new(&LocalAssets, &fonts);

        let steps: Arc<Mutex<Vec<ExportStep>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&steps);
        let callback = move |step: ExportStep, _fraction: f32| {
            sink.lock().expect("lock").push(step);
        };
        renderer
            .render(&doc, &ExportConfig::default(), Some(&callback))
            .await
            .expect("export");

        let seen = steps.lock().expect("lock");
        for step in [
            ExportStep::Prepare,
            ExportStep::Build,
            ExportStep::Fit,
            ExportStep::Rasterize,
            ExportStep::Encode,
        ] {
            assert!(seen.contains(&step), "missing step {step}");
        }
    }

    #[test]
    fn test_safe_area_fit_clamps() {
        // A text sprite wider than the 290-unit safe width by 2x shrinks to
        // the 0.5 floor; one slightly over shrinks proportionally.
        let mut object = RenderObject {
            id: cardstock_core::ElementId::new(),
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            opacity: 1.0,
            scale_x: 1.0,
            scale_y: 1.0,
            width: 580.0,
            height: 20.0,
            built_kind: ElementKind::Text {
                content: "wide".into(),
                font_family: "Inter".into(),
                font_size: 16,
                colors: vec![Color::BLACK],
                style: cardstock_core::TextStyle::default(),
                field_id: None,
            },
            intrinsic: None,
            raster: None,
            raster_scale: 1.0,
            placeholder: false,
            revision: 0,
        };
        fit_text_to_safe_area(&mut object, 350.0, 200.0);
        assert!((object.scale_x - TEXT_FIT_MIN).abs() < f32::EPSILON);

        object.width = 300.0;
        object.scale_x = 1.0;
        object.scale_y = 1.0;
        fit_text_to_safe_area(&mut object, 350.0, 200.0);
        assert!((object.scale_x - 290.0 / 300.0).abs() < 0.001);
        assert!((object.scale_x - object.scale_y).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_excluded_elements_do_not_composite() {
        let mut doc = Document::new(100.0, 100.0);
        doc.push(
            Element::new(ElementKind::Shape(ShapeKind::Rect {
                width: 100.0,
                height: 100.0,
                fill: Some(Color::BLACK),
                stroke: None,
                stroke_width: 0.0,
            }))
            .excluded(),
        );

        let fonts = FontStore::new();
        let renderer = HeadlessRenderer::new(&LocalAssets, &fonts);
        let with_excluded = renderer
            .render(&doc, &ExportConfig::default(), None)
            .await
            .expect("export");

        let empty = Document::new(100.0, 100.0);
        let blank = renderer
            .render(&empty, &ExportConfig::default(), None)
            .await
            .expect("export");

        // The excluded black square must not darken the output.
        assert_eq!(with_excluded.bytes, blank.bytes);
    }
}
