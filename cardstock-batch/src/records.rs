//! Batch records and collaborator interfaces.
//!
//! Records arrive from the batch-parsing collaborator keyed by the fixed
//! attribute dictionary (`cardstock_core::fields`). Pagination and storage
//! are the collaborator's concern; this module sees the flattened result.

use std::collections::HashMap;

use async_trait::async_trait;
use cardstock_core::Document;
use serde::{Deserialize, Serialize};

use crate::error::BatchResult;

/// One contact record, keyed by standardized attribute ids.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchRecord {
    /// Stable record identifier within the batch.
    pub id: String,
    /// Attribute values keyed by field id.
    pub attributes: HashMap<String, String>,
}

impl BatchRecord {
    /// Create a record with the given id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: HashMap::new(),
        }
    }

    /// Set an attribute. Builder-style for tests and fixtures.
    #[must_use]
    pub fn with(mut self, field_id: &str, value: &str) -> Self {
        self.attributes.insert(field_id.to_string(), value.to_string());
        self
    }

    /// Look up an attribute value. Empty strings count as absent.
    #[must_use]
    pub fn attribute(&self, field_id: &str) -> Option<&str> {
        self.attributes
            .get(field_id)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Human-readable name for filenames and progress reporting:
    /// `full_name`, then `first_name last_name`, then the record id.
    #[must_use]
    pub fn display_name(&self) -> String {
        if let Some(full) = self.attribute("full_name") {
            return full.to_string();
        }
        match (self.attribute("first_name"), self.attribute("last_name")) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.to_string(),
            (None, Some(last)) => last.to_string(),
            (None, None) => self.id.clone(),
        }
    }
}

/// A fetched batch: its display name plus all records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchData {
    /// Batch display name (used in archive filenames).
    pub batch_name: String,
    /// All records, already depaginated.
    pub records: Vec<BatchRecord>,
}

/// Collaborator interface: batch storage.
#[async_trait]
pub trait BatchSource: Send + Sync {
    /// Fetch all records of a batch.
    ///
    /// # Errors
    ///
    /// Returns [`crate::BatchError::BatchNotFound`] if the batch does not
    /// exist, or a transport error from the collaborator.
    async fn fetch_batch_records(&self, batch_id: &str) -> BatchResult<BatchData>;
}

/// Collaborator interface: document persistence.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Load a document by id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::BatchError::DocumentNotFound`] if the document does
    /// not exist, or a transport error from the collaborator.
    async fn load_document(&self, document_id: &str) -> BatchResult<Document>;
}
