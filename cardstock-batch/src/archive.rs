//! The accumulating export archive.
//!
//! Entries collect in memory as `{sanitized filename, raster bytes}` pairs;
//! container packaging (zip, upload) belongs to the batch-CRUD collaborator.
//! Filenames follow `{batch}_{3-digit-index}_{record}.{ext}` and are
//! collision-free by construction through the record index.

use std::path::Path;

use crate::error::BatchResult;

/// One exported record.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// Sanitized filename.
    pub filename: String,
    /// Encoded raster bytes.
    pub bytes: Vec<u8>,
}

/// In-memory archive of exported records.
#[derive(Debug, Default)]
pub struct BatchArchive {
    entries: Vec<ArchiveEntry>,
}

impl BatchArchive {
    /// Create an empty archive.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn push(&mut self, entry: ArchiveEntry) {
        self.entries.push(entry);
    }

    /// All entries in export order.
    #[must_use]
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the archive is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total encoded bytes across entries.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.entries.iter().map(|e| e.bytes.len()).sum()
    }

    /// Write every entry as a file under `dir`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory cannot be created or an entry
    /// cannot be written.
    pub fn write_to_dir(&self, dir: impl AsRef<Path>) -> BatchResult<()> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        for entry in &self.entries {
            std::fs::write(dir.join(&entry.filename), &entry.bytes)?;
        }
        Ok(())
    }
}

/// Sanitize a name for use in a filename.
///
/// Replaces any character that is not alphanumeric, `-`, or `_` with `_`.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Build the archive filename for one record:
/// `{sanitizedBatchName}_{3-digit-index}_{sanitizedRecordName}.{ext}`.
#[must_use]
pub fn entry_filename(batch_name: &str, index: usize, record_name: &str, ext: &str) -> String {
    format!(
        "{}_{index:03}_{}.{ext}",
        sanitize_filename(batch_name),
        sanitize_filename(record_name),
    )
}
