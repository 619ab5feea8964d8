//! Per-record document personalization.
//!
//! Clones the template document for one record, rewrites every field-bound
//! text element from the record attributes, and regenerates every QR payload
//! through the structured formatter. The template itself is never mutated.

use cardstock_core::{Document, ElementKind, QrPayloadKind};
use tracing::debug;

use crate::records::BatchRecord;

/// Structured per-record payload formatting.
///
/// The `vCard`/string formatting rules live with the data-formatting
/// collaborator; implementations of this trait bridge to it.
pub trait PayloadFormatter: Send + Sync {
    /// Produce the payload string for one QR element and one record.
    fn format(&self, kind: QrPayloadKind, record: &BatchRecord) -> String;
}

/// Deep-clone `template` and bind it to `record`.
///
/// Every text element with a `field_id` takes the record's attribute value;
/// absent or empty attributes intentionally blank the text rather than
/// leaking placeholder content into the export. Every QR element's payload
/// is regenerated from the formatter.
#[must_use]
pub fn personalize(
    template: &Document,
    record: &BatchRecord,
    formatter: &dyn PayloadFormatter,
) -> Document {
    let mut doc = template.clone();
    let ids = doc.ids();
    for id in ids {
        let Some(element) = doc.element_mut(id) else {
            continue;
        };
        match &mut element.kind {
            ElementKind::Text {
                content,
                field_id: Some(field_id),
                ..
            } => {
                let value = record.attribute(field_id).unwrap_or_default();
                debug!(element = %id, %field_id, "binding text field");
                *content = value.to_string();
            }
            ElementKind::Qr {
                payload,
                payload_kind,
                ..
            } => {
                *payload = formatter.format(*payload_kind, record);
            }
            _ => {}
        }
    }
    doc
}
