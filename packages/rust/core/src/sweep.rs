//! Retention sweeper: age-based pruning of working files.
//!
//! Raw export files accumulate in the download directory; anything older than
//! the retention threshold gets deleted. A file that cannot be deleted is
//! logged and counted, never aborts the sweep, and the ledger is not touched
//! by this path at all.

use std::path::Path;
use std::time::{Duration, SystemTime};

use tracing::{debug, info, instrument, warn};

use leadledger_shared::{LeadLedgerError, Result};

/// Outcome of one sweep pass.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Files deleted.
    pub deleted: usize,
    /// Files young enough to keep (plus non-file entries).
    pub kept: usize,
    /// Files that should have been deleted but could not be.
    pub failed: usize,
}

/// Delete regular files in `dir` whose last-modified time is older than
/// `max_age_days`. A missing directory is an empty sweep, not an error.
#[instrument]
pub fn sweep_dir(dir: &Path, max_age_days: u32) -> Result<SweepReport> {
    if !dir.exists() {
        debug!("sweep directory does not exist, nothing to do");
        return Ok(SweepReport::default());
    }

    let cutoff = SystemTime::now() - Duration::from_secs(u64::from(max_age_days) * 86_400);
    let entries = std::fs::read_dir(dir).map_err(|e| LeadLedgerError::io(dir, e))?;

    let mut report = SweepReport::default();

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "unreadable directory entry, skipping");
                report.failed += 1;
                continue;
            }
        };
        let path = entry.path();

        let modified = entry.metadata().and_then(|meta| {
            if meta.is_file() {
                meta.modified()
            } else {
                Err(std::io::Error::other("not a file"))
            }
        });

        let Ok(modified) = modified else {
            report.kept += 1;
            continue;
        };

        if modified <= cutoff {
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    debug!(path = %path.display(), "expired file deleted");
                    report.deleted += 1;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to delete expired file");
                    report.failed += 1;
                }
            }
        } else {
            report.kept += 1;
        }
    }

    info!(
        deleted = report.deleted,
        kept = report.kept,
        failed = report.failed,
        "sweep complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_directory_sweeps_nothing() {
        let report = sweep_dir(Path::new("/nonexistent/leadledger-sweep"), 30).unwrap();
        assert_eq!(report, SweepReport::default());
    }

    #[test]
    fn fresh_files_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("today.csv"), "email\n").unwrap();

        let report = sweep_dir(dir.path(), 30).unwrap();
        assert_eq!(report.deleted, 0);
        assert_eq!(report.kept, 1);
        assert!(dir.path().join("today.csv").exists());
    }

    #[test]
    fn zero_day_threshold_expires_everything() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.csv"), "email\n").unwrap();
        std::fs::write(dir.path().join("b.xlsx"), "bytes").unwrap();

        // Make sure mtimes land strictly before the cutoff on coarse clocks.
        std::thread::sleep(Duration::from_millis(1100));

        let report = sweep_dir(dir.path(), 0).unwrap();
        assert_eq!(report.deleted, 2);
        assert_eq!(report.failed, 0);
        assert!(!dir.path().join("a.csv").exists());
    }

    #[test]
    fn subdirectories_are_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("archive")).unwrap();

        std::thread::sleep(Duration::from_millis(1100));

        let report = sweep_dir(dir.path(), 0).unwrap();
        assert_eq!(report.deleted, 0);
        assert_eq!(report.kept, 1);
        assert!(dir.path().join("archive").exists());
    }
}
