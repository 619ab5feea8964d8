//! Font registry, text measurement, and line rasterization.
//!
//! Families are registered at runtime from TTF/OTF bytes. Measurement uses
//! real glyph metrics when the family is registered and deterministic
//! approximate metrics when it is not, so layout decisions (safe-area
//! fitting) stay total. Rasterization requires a registered family.

use std::collections::HashMap;

use ab_glyph::{Font, FontArc, ScaleFont};
use cardstock_core::Color;
use tiny_skia::Pixmap;

use crate::error::{RenderError, RenderResult};

/// Approximate advance per character, as a fraction of font size, used when
/// a family has no registered face.
const FALLBACK_ADVANCE: f32 = 0.6;

/// Approximate line height as a fraction of font size.
const FALLBACK_LINE_HEIGHT: f32 = 1.2;

/// Registry of font families available for text rendering.
#[derive(Default)]
pub struct FontStore {
    families: HashMap<String, FontArc>,
}

impl FontStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a family from raw TTF/OTF bytes.
    ///
    /// Re-registering a family replaces the previous face.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Font`] if the bytes are not a parseable font.
    pub fn register(&mut self, family: &str, bytes: Vec<u8>) -> RenderResult<()> {
        let font = FontArc::try_from_vec(bytes)
            .map_err(|e| RenderError::Font(format!("Failed to parse font for {family}: {e}")))?;
        self.families.insert(family.to_string(), font);
        Ok(())
    }

    /// Whether a family has a registered face.
    #[must_use]
    pub fn contains(&self, family: &str) -> bool {
        self.families.contains_key(family)
    }

    /// Measure a single line at the given pixel size.
    ///
    /// Returns `(width, height)`. Falls back to approximate metrics when the
    /// family is not registered.
    #[must_use]
    pub fn measure(&self, family: &str, size_px: f32, text: &str) -> (f32, f32) {
        match self.families.get(family) {
            Some(font) => measure_with(font, size_px, text),
            None => {
                #[allow(clippy::cast_precision_loss)]
                let width = text.chars().count() as f32 * size_px * FALLBACK_ADVANCE;
                (width, size_px * FALLBACK_LINE_HEIGHT)
            }
        }
    }

    /// Rasterize a single line into an anti-aliased pixmap.
    ///
    /// Returns `None` when the family is not registered or the text renders
    /// to an empty box; callers treat that as a builder failure.
    #[must_use]
    pub fn raster_line(&self, family: &str, size_px: f32, text: &str, color: Color) -> Option<Pixmap> {
        let font = self.families.get(family)?;
        let scaled = font.as_scaled(size_px);

        // Layout: advance a caret per glyph.
        let mut glyphs = Vec::new();
        let mut caret_x = 0.0_f32;
        for ch in text.chars() {
            let glyph_id = font.glyph_id(ch);
            glyphs.push((glyph_id, caret_x));
            caret_x += scaled.h_advance(glyph_id);
        }

        let ascent = scaled.ascent();
        let descent = scaled.descent();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let width = (caret_x.ceil() as u32).max(1);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let height = ((ascent - descent).ceil() as u32).max(1);

        let mut coverage = vec![0.0_f32; (width * height) as usize];
        for &(glyph_id, glyph_x) in &glyphs {
            let glyph =
                glyph_id.with_scale_and_position(size_px, ab_glyph::point(glyph_x, ascent));
            if let Some(outlined) = font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                outlined.draw(|px, py, c| {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
                    let x = px as i32 + bounds.min.x as i32;
                    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
                    let y = py as i32 + bounds.min.y as i32;
                    #[allow(clippy::cast_sign_loss)]
                    if x >= 0 && (x as u32) < width && y >= 0 && (y as u32) < height {
                        let idx = (y as u32 * width + x as u32) as usize;
                        coverage[idx] = (coverage[idx] + c).min(1.0);
                    }
                });
            }
        }

        let mut pixmap = Pixmap::new(width, height)?;
        let pixels = pixmap.pixels_mut();
        for (idx, c) in coverage.iter().enumerate() {
            if *c <= 0.0 {
                continue;
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let alpha = (f32::from(color.a) * c).round().min(255.0) as u8;
            pixels[idx] = tiny_skia::ColorU8::from_rgba(color.r, color.g, color.b, alpha)
                .premultiply();
        }
        Some(pixmap)
    }
}

impl std::fmt::Debug for FontStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontStore")
            .field("families", &self.families.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn measure_with(font: &FontArc, size_px: f32, text: &str) -> (f32, f32) {
    let scaled = font.as_scaled(size_px);
    let width: f32 = text
        .chars()
        .map(|ch| scaled.h_advance(font.glyph_id(ch)))
        .sum();
    (width, scaled.ascent() - scaled.descent())
}
