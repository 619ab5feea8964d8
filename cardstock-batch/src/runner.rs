//! The sequential batch export runner.
//!
//! Processes records strictly one at a time to bound peak memory: clone the
//! template, bind the record, render headlessly, append to the archive.
//! Cancellation is cooperative, polled between records only; per-record
//! failures are caught into the report and never abort the batch.

use cardstock_core::Document;
use cardstock_render::{ExportConfig, HeadlessRenderer};
use tracing::{info, warn};

use crate::archive::{entry_filename, ArchiveEntry, BatchArchive};
use crate::error::{BatchError, BatchResult};
use crate::personalize::{personalize, PayloadFormatter};
use crate::records::BatchData;

/// Record count above which a soft warning is logged.
pub const SOFT_RECORD_WARNING: usize = 200;

/// Hard ceiling on records per batch.
pub const MAX_BATCH_RECORDS: usize = 1000;

/// What to do with already-exported records when the batch is cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelPolicy {
    /// Return the partial archive accumulated so far.
    KeepPartial,
    /// Drop everything.
    Discard,
}

/// One failed record.
#[derive(Debug, Clone)]
pub struct FailedRecord {
    /// Record id.
    pub record_id: String,
    /// Failure message.
    pub message: String,
}

/// Uniform end-of-run summary; `failed` is present even when empty.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Records exported successfully.
    pub success_count: usize,
    /// Records that failed.
    pub failed_count: usize,
    /// Failure details.
    pub failed: Vec<FailedRecord>,
}

/// Result of a batch run.
#[derive(Debug)]
pub struct BatchOutcome {
    /// End-of-run summary.
    pub report: BatchReport,
    /// The archive; `None` when cancelled under [`CancelPolicy::Discard`].
    pub archive: Option<BatchArchive>,
    /// The run was cancelled before completing.
    pub cancelled: bool,
}

/// Batch progress callback: `(current, total, status)`.
pub type BatchProgressFn<'a> = dyn Fn(usize, usize, &str) + Send + Sync + 'a;

/// Sequential per-record exporter.
pub struct BatchExporter<'a> {
    renderer: HeadlessRenderer<'a>,
    formatter: &'a dyn PayloadFormatter,
    config: ExportConfig,
    cancel_policy: CancelPolicy,
}

impl<'a> BatchExporter<'a> {
    /// Create an exporter.
    #[must_use]
    pub fn new(
        renderer: HeadlessRenderer<'a>,
        formatter: &'a dyn PayloadFormatter,
        config: ExportConfig,
        cancel_policy: CancelPolicy,
    ) -> Self {
        Self {
            renderer,
            formatter,
            config,
            cancel_policy,
        }
    }

    /// Export one record per archive entry, strictly sequentially.
    ///
    /// `cancel` is polled between records; per-record export failures are
    /// recorded and processing continues. The returned report always carries
    /// `failed`, even when empty.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::RecordLimitExceeded`] before any export work if
    /// the batch exceeds [`MAX_BATCH_RECORDS`].
    pub async fn export_batch(
        &self,
        template: &Document,
        batch: &BatchData,
        cancel: impl Fn() -> bool,
        progress: Option<&BatchProgressFn<'_>>,
    ) -> BatchResult<BatchOutcome> {
        let total = batch.records.len();
        if total > MAX_BATCH_RECORDS {
            return Err(BatchError::RecordLimitExceeded { count: total });
        }
        if total > SOFT_RECORD_WARNING {
            warn!(total, "large batch; export will take a while");
        }
        // Dimension limits are structural: the same canvas and config apply
        // to every record, so reject before touching any of them.
        cardstock_render::output_dimensions(template, &self.config)?;

        let extension = self.config.format.extension();
        let mut archive = BatchArchive::new();
        let mut report = BatchReport::default();
        let mut cancelled = false;

        for (index, record) in batch.records.iter().enumerate() {
            if cancel() {
                info!(done = index, total, "batch export cancelled");
                cancelled = true;
                break;
            }
            if let Some(callback) = progress {
                callback(index + 1, total, &record.display_name());
            }

            let bound = personalize(template, record, self.formatter);
            match self.renderer.render(&bound, &self.config, None).await {
                Ok(result) => {
                    archive.push(ArchiveEntry {
                        filename: entry_filename(
                            &batch.batch_name,
                            index,
                            &record.display_name(),
                            extension,
                        ),
                        bytes: result.bytes,
                    });
                    report.success_count += 1;
                }
                Err(error) => {
                    warn!(record = %record.id, %error, "record export failed");
                    report.failed.push(FailedRecord {
                        record_id: record.id.clone(),
                        message: error.to_string(),
                    });
                    report.failed_count += 1;
                }
            }
        }

        let archive = if cancelled && self.cancel_policy == CancelPolicy::Discard {
            None
        } else {
            Some(archive)
        };
        Ok(BatchOutcome {
            report,
            archive,
            cancelled,
        })
    }
}

impl std::fmt::Debug for BatchExporter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchExporter")
            .field("config", &self.config)
            .field("cancel_policy", &self.cancel_policy)
            .finish_non_exhaustive()
    }
}
