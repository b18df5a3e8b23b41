//! End-to-end consolidation pipeline: manifest → normalize → merge → persist.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, instrument, warn};

use leadledger_shared::{ExportManifest, Result, RunConfig, RunId, SourceType};

/// Result of one consolidation run.
#[derive(Debug)]
pub struct RunReport {
    /// Identifier for this batch run.
    pub run_id: RunId,
    /// Export files successfully normalized.
    pub files_processed: usize,
    /// Export files skipped as unreadable or malformed.
    pub files_skipped: usize,
    /// Rows that became lead records.
    pub rows_normalized: usize,
    /// Rows dropped for lacking an email.
    pub rows_skipped: usize,
    /// Ledger size before the merge.
    pub records_before: usize,
    /// Ledger size after the merge.
    pub records_after: usize,
    /// Per-source-type counts of the final ledger.
    pub summary: BTreeMap<SourceType, usize>,
    /// Total elapsed time.
    pub elapsed: std::time::Duration,
}

impl RunReport {
    /// Records added by this run (dedup means this is usually less than
    /// `rows_normalized`).
    pub fn records_added(&self) -> usize {
        self.records_after.saturating_sub(self.records_before)
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each export file is normalized.
    fn file_processed(&self, file: &str, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, report: &RunReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn file_processed(&self, _file: &str, _current: usize, _total: usize) {}
    fn done(&self, _report: &RunReport) {}
}

/// Run the consolidation pipeline over one manifest of export files.
///
/// Per-file problems (unreadable, not a table) are local: the file is logged,
/// counted, and skipped. Ledger-level load/persist failures abort the run
/// with the persisted ledger untouched.
#[instrument(skip_all, fields(files = manifest.files.len(), ledger = %config.ledger_path.display()))]
pub fn run_consolidation(
    config: &RunConfig,
    manifest: &ExportManifest,
    progress: &dyn ProgressReporter,
) -> Result<RunReport> {
    let start = Instant::now();
    let run_id = RunId::new();
    let imported_at = Utc::now();

    info!(%run_id, "starting consolidation run");

    // --- Phase 1: normalize each manifest file ---
    progress.phase("Normalizing exports");
    let total = manifest.files.len();
    let mut incoming = Vec::new();
    let mut files_processed = 0;
    let mut files_skipped = 0;
    let mut rows_skipped = 0;

    for (i, file) in manifest.files.iter().enumerate() {
        match leadledger_normalizer::normalize_file(&file.path, imported_at) {
            Ok(batch) => {
                files_processed += 1;
                rows_skipped += batch.skipped_rows;
                incoming.extend(batch.records);
                progress.file_processed(&file.path.display().to_string(), i + 1, total);
            }
            Err(e) => {
                warn!(file = %file.path.display(), error = %e, "export file skipped");
                files_skipped += 1;
            }
        }
    }
    let rows_normalized = incoming.len();

    // --- Phase 2: merge with the persisted ledger ---
    progress.phase("Merging into ledger");
    let existing = leadledger_ledger::load(&config.ledger_path)?;
    let records_before = existing.len();
    let merged = leadledger_ledger::merge(existing, incoming);

    // --- Phase 3: persist ---
    progress.phase("Persisting ledger");
    leadledger_ledger::persist(&config.ledger_path, &merged)?;

    let summary = leadledger_ledger::summarize(&merged);
    let report = RunReport {
        run_id,
        files_processed,
        files_skipped,
        rows_normalized,
        rows_skipped,
        records_before,
        records_after: merged.len(),
        summary,
        elapsed: start.elapsed(),
    };

    progress.done(&report);

    info!(
        run_id = %report.run_id,
        files_processed = report.files_processed,
        files_skipped = report.files_skipped,
        records_added = report.records_added(),
        records_total = report.records_after,
        elapsed_ms = report.elapsed.as_millis(),
        "consolidation run complete"
    );

    Ok(report)
}
