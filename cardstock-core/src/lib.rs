//! # Cardstock Core
//!
//! Canonical document model for card and label templates.
//!
//! A [`Document`] is an ordered list of typed [`Element`]s on a fixed-size
//! canvas; list index alone defines z-order (0 = bottom). The model is the
//! only persisted representation: live render-objects are always derivable
//! from it, never authoritative.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              cardstock-core                 │
//! ├─────────────────────────────────────────────┤
//! │  Document        │  History                 │
//! │  - Elements      │  - Capped snapshots      │
//! │  - Canvas config │  - Undo / redo           │
//! │  - JSON round-   │  - Authority marker      │
//! │    trip          │                          │
//! ├─────────────────────────────────────────────┤
//! │  ModelPatch      │  Field Dictionary        │
//! │  - Gesture       │  - Versioned attribute   │
//! │    write-back    │    ids for batch binding │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod color;
pub mod document;
pub mod element;
pub mod error;
pub mod fields;
pub mod history;
pub mod patch;

pub use color::Color;
pub use document::Document;
pub use element::{
    CellBinding, Element, ElementId, ElementKind, QrPayloadKind, ShapeKind, TextStyle,
};
pub use error::{CoreError, CoreResult};
pub use fields::{is_known_field, FIELD_DICTIONARY_VERSION, FIELD_IDS};
pub use history::History;
pub use patch::ModelPatch;

/// Core crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
