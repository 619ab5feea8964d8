//! # Cardstock Render
//!
//! Raster toolkit and type builders for cardstock documents, plus the
//! headless renderer used for one-shot export.
//!
//! ## Pipeline
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │            Type Builders                    │
//! ├──────────┬──────────┬──────────┬────────────┤
//! │ Text     │ Image    │ QR       │ Shape/Table│
//! │ ab_glyph │ fetch +  │ qrcode   │ tiny-skia  │
//! │ runs     │ decode   │ modules  │ paths      │
//! ├──────────┴──────────┴──────────┴────────────┤
//! │  RenderObject (sprite + live geometry)      │
//! ├─────────────────────────────────────────────┤
//! │  HeadlessRenderer: build → fit → composite  │
//! │  → encode (png / jpg)                       │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! The interactive engine (`cardstock-engine`) drives the same builders
//! against a registry; the headless renderer rebuilds everything from
//! scratch per export.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod assets;
pub mod builder;
pub mod error;
pub mod export;
pub mod fonts;
pub mod qr;
pub mod sprite;

pub use assets::{decode_image, AssetSource, HttpAssets, ImageData, LocalAssets};
pub use builder::{apply_geometry_change, build_object, needs_rebuild, BuildContext, GEOMETRY_EPSILON};
pub use error::{RenderError, RenderResult};
pub use export::{
    output_dimensions, ExportConfig, ExportImageFormat, ExportResult, ExportStep,
    HeadlessRenderer, ProgressFn, MAX_EXPORT_DIMENSION, SAFE_AREA_INSET,
};
pub use fonts::FontStore;
pub use sprite::RenderObject;

/// Render crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
