//! Asset loading.
//!
//! Image sources are URIs: base64 `data:` URIs, filesystem paths, or
//! http/https URLs. Decoded images are RGBA8 with their full intrinsic
//! resolution retained; preview surfaces may request a capped copy.

use async_trait::async_trait;

use crate::error::{RenderError, RenderResult};

/// Decoded image data at full intrinsic resolution.
#[derive(Debug, Clone)]
pub struct ImageData {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// RGBA pixel data (4 bytes per pixel).
    pub data: Vec<u8>,
}

/// Source of raw asset bytes, keyed by URI.
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Fetch the raw bytes behind a URI.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Resource`] if the URI cannot be resolved.
    async fn fetch(&self, uri: &str) -> RenderResult<Vec<u8>>;
}

/// Local asset source: `data:` URIs and filesystem paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalAssets;

#[async_trait]
impl AssetSource for LocalAssets {
    async fn fetch(&self, uri: &str) -> RenderResult<Vec<u8>> {
        if uri.starts_with("data:") {
            return decode_data_uri(uri);
        }
        std::fs::read(uri)
            .map_err(|e| RenderError::Resource(format!("Failed to read {uri}: {e}")))
    }
}

/// Asset source with HTTP support, delegating other schemes to [`LocalAssets`].
#[derive(Debug, Clone, Default)]
pub struct HttpAssets {
    client: reqwest::Client,
}

impl HttpAssets {
    /// Create a new HTTP asset source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AssetSource for HttpAssets {
    async fn fetch(&self, uri: &str) -> RenderResult<Vec<u8>> {
        if uri.starts_with("http://") || uri.starts_with("https://") {
            let response = self
                .client
                .get(uri)
                .send()
                .await
                .and_then(reqwest::Response::error_for_status)
                .map_err(|e| RenderError::Resource(format!("Failed to fetch {uri}: {e}")))?;
            let bytes = response
                .bytes()
                .await
                .map_err(|e| RenderError::Resource(format!("Failed to read {uri}: {e}")))?;
            return Ok(bytes.to_vec());
        }
        LocalAssets.fetch(uri).await
    }
}

/// Decode a base64 `data:` URI.
///
/// Supports the form `data:image/png;base64,iVBORw0KGgo...`.
///
/// # Errors
///
/// Returns [`RenderError::Resource`] if the URI is malformed.
pub fn decode_data_uri(uri: &str) -> RenderResult<Vec<u8>> {
    let payload = uri
        .strip_prefix("data:")
        .ok_or_else(|| RenderError::Resource("Not a data URI".to_string()))?;
    let comma = payload
        .find(',')
        .ok_or_else(|| RenderError::Resource("Invalid data URI: missing comma".to_string()))?;
    let (metadata, encoded) = payload.split_at(comma);
    let encoded = &encoded[1..];

    if !metadata.contains(";base64") {
        return Err(RenderError::Resource(
            "Unsupported data URI encoding (expected base64)".to_string(),
        ));
    }

    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| RenderError::Resource(format!("Failed to decode base64: {e}")))
}

/// Decode image bytes into RGBA8 at intrinsic resolution.
///
/// # Errors
///
/// Returns [`RenderError::Resource`] if the bytes are not a decodable image.
pub fn decode_image(data: &[u8]) -> RenderResult<ImageData> {
    let img = image::load_from_memory(data)
        .map_err(|e| RenderError::Resource(format!("Failed to decode image: {e}")))?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(ImageData {
        width,
        height,
        data: rgba.into_raw(),
    })
}

/// Return a copy downscaled so neither side exceeds `max_side`, or the
/// original when it already fits. Intrinsic data is never discarded by the
/// caller; this is only for preview textures.
#[must_use]
pub fn downscale_to_fit(image_data: &ImageData, max_side: u32) -> ImageData {
    let longest = image_data.width.max(image_data.height);
    if longest <= max_side || max_side == 0 {
        return image_data.clone();
    }
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let (new_w, new_h) = {
        let factor = f64::from(max_side) / f64::from(longest);
        (
            ((f64::from(image_data.width) * factor).round() as u32).max(1),
            ((f64::from(image_data.height) * factor).round() as u32).max(1),
        )
    };
    let buffer = image::RgbaImage::from_raw(
        image_data.width,
        image_data.height,
        image_data.data.clone(),
    );
    let Some(buffer) = buffer else {
        return image_data.clone();
    };
    let resized =
        image::imageops::resize(&buffer, new_w, new_h, image::imageops::FilterType::Triangle);
    ImageData {
        width: new_w,
        height: new_h,
        data: resized.into_raw(),
    }
}
