//! # Cardstock Batch
//!
//! Per-record batch personalization over cardstock documents.
//!
//! ## Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  fetch_batch_records(batch_id)              │
//! │        │                                    │
//! │        ▼   per record, strictly sequential  │
//! │  clone template → bind text fields →        │
//! │  regenerate QR payloads → headless render → │
//! │  append {filename, bytes} to archive        │
//! │        │                                    │
//! │        ▼                                    │
//! │  {success_count, failed_count, failed[]}    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Limits: soft warning at 200 records, hard ceiling at 1000. Cancellation
//! is polled between records; the caller chooses whether a cancelled run
//! keeps its partial archive.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod archive;
pub mod error;
pub mod personalize;
pub mod records;
pub mod runner;

pub use archive::{entry_filename, sanitize_filename, ArchiveEntry, BatchArchive};
pub use error::{BatchError, BatchResult};
pub use personalize::{personalize, PayloadFormatter};
pub use records::{BatchData, BatchRecord, BatchSource, DocumentSource};
pub use runner::{
    BatchExporter, BatchOutcome, BatchProgressFn, BatchReport, CancelPolicy, FailedRecord,
    MAX_BATCH_RECORDS, SOFT_RECORD_WARNING,
};

/// Batch crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
