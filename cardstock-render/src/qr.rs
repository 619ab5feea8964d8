//! QR code rasterization.
//!
//! Generates the module matrix with the `qrcode` crate, then scales it into
//! a square pixmap of the requested side length. Cell scaling is integral
//! and the code is centered inside the box, so modules stay crisp.

use cardstock_core::Color;
use qrcode::{EcLevel, QrCode};
use tiny_skia::Pixmap;

use crate::error::{RenderError, RenderResult};
use crate::sprite::to_skia_color;

/// Generate a QR pixmap for `payload` with the given module colors.
///
/// The output is `side_px` × `side_px`; the code itself is centered at the
/// largest integral cell size that fits.
///
/// # Errors
///
/// Returns [`RenderError::Qr`] if the payload cannot be encoded or the side
/// is too small to hold the code.
pub fn qr_pixmap(payload: &str, dark: Color, light: Color, side_px: u32) -> RenderResult<Pixmap> {
    let code = QrCode::with_error_correction_level(payload, EcLevel::M)
        .map_err(|e| RenderError::Qr(format!("QR encoding failed: {e}")))?;

    let modules = code.width();
    #[allow(clippy::cast_possible_truncation)]
    let modules_u32 = modules as u32;
    if side_px < modules_u32 {
        return Err(RenderError::Qr(format!(
            "box of {side_px}px cannot hold {modules} modules"
        )));
    }

    let cell = (side_px / modules_u32).max(1);
    let code_px = cell * modules_u32;
    let offset = (side_px - code_px) / 2;

    let mut pixmap = Pixmap::new(side_px, side_px)
        .ok_or_else(|| RenderError::Qr("Failed to allocate QR pixmap".to_string()))?;
    pixmap.fill(to_skia_color(light));

    let dark_premul = tiny_skia::ColorU8::from_rgba(dark.r, dark.g, dark.b, dark.a).premultiply();
    let width = pixmap.width();
    let pixels = pixmap.pixels_mut();
    for qy in 0..modules {
        for qx in 0..modules {
            if code[(qx, qy)] != qrcode::Color::Dark {
                continue;
            }
            #[allow(clippy::cast_possible_truncation)]
            let (qx_u32, qy_u32) = (qx as u32, qy as u32);
            for cy in 0..cell {
                for cx in 0..cell {
                    let px = offset + qx_u32 * cell + cx;
                    let py = offset + qy_u32 * cell + cy;
                    pixels[(py * width + px) as usize] = dark_premul;
                }
            }
        }
    }

    Ok(pixmap)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qr_fills_requested_box() {
        let pixmap = qr_pixmap("https://example.com", Color::BLACK, Color::WHITE, 128)
            .expect("generate");
        assert_eq!((pixmap.width(), pixmap.height()), (128, 128));
    }

    #[test]
    fn test_qr_has_both_module_colors() {
        let pixmap =
            qr_pixmap("cardstock", Color::BLACK, Color::WHITE, 100).expect("generate");
        let pixels = pixmap.pixels();
        let dark = pixels.iter().filter(|p| p.red() == 0).count();
        let light = pixels.iter().filter(|p| p.red() == 255).count();
        assert!(dark > 0, "expected dark modules");
        assert!(light > 0, "expected light modules");
    }

    #[test]
    fn test_distinct_payloads_distinct_bitmaps() {
        let a = qr_pixmap("record-one", Color::BLACK, Color::WHITE, 96).expect("a");
        let b = qr_pixmap("record-two", Color::BLACK, Color::WHITE, 96).expect("b");
        assert_ne!(a.data(), b.data());
    }

    #[test]
    fn test_box_too_small_fails() {
        let result = qr_pixmap("some payload that needs many modules", Color::BLACK, Color::WHITE, 4);
        assert!(matches!(result, Err(RenderError::Qr(_))));
    }
}
