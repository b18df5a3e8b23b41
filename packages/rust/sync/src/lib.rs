//! Downstream sync: push the finalized ledger to CRM/spreadsheet sinks.
//!
//! Sync is a separate, independently retryable stage that consumes the
//! already-persisted ledger file. Sinks are selected by configuration; a
//! failing sink never affects ledger correctness or the other sinks.

pub mod hubspot;
pub mod sheets;

use std::path::Path;

use tracing::{info, instrument, warn};

use leadledger_shared::{Result, SyncConfig, require_env};

pub use hubspot::HubSpotSink;
pub use sheets::SheetsSink;

/// Per-sink outcome counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Sink name for reporting.
    pub sink: &'static str,
    /// Records pushed successfully.
    pub synced: usize,
    /// Records that failed to push.
    pub failed: usize,
}

impl SyncReport {
    pub fn new(sink: &'static str) -> Self {
        Self {
            sink,
            synced: 0,
            failed: 0,
        }
    }
}

/// Push the ledger at `ledger_path` to every enabled sink, sequentially.
///
/// A sink that cannot even start (missing token, bad config) is reported as
/// fully failed rather than aborting the others.
#[instrument(skip(config))]
pub async fn dispatch(config: &SyncConfig, ledger_path: &Path) -> Result<Vec<SyncReport>> {
    let records = leadledger_ledger::load(ledger_path)?;
    info!(records = records.len(), "dispatching ledger to sinks");

    let mut reports = Vec::new();

    if config.hubspot.enabled {
        let report = match require_env(&config.hubspot.access_token_env)
            .and_then(|token| HubSpotSink::new(&config.hubspot, token))
        {
            Ok(sink) => sink.sync(&records).await,
            Err(e) => {
                warn!(error = %e, "hubspot sink unavailable");
                SyncReport {
                    sink: "hubspot",
                    synced: 0,
                    failed: records.len(),
                }
            }
        };
        reports.push(report);
    }

    if config.sheets.enabled {
        let report = match require_env(&config.sheets.token_env)
            .and_then(|token| SheetsSink::new(&config.sheets, token))
        {
            Ok(sink) => sink.sync(&records).await,
            Err(e) => {
                warn!(error = %e, "sheets sink unavailable");
                SyncReport {
                    sink: "sheets",
                    synced: 0,
                    failed: records.len(),
                }
            }
        };
        reports.push(report);
    }

    if reports.is_empty() {
        info!("no sinks enabled, nothing to dispatch");
    }

    Ok(reports)
}
