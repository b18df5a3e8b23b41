//! Consolidation Ledger — the canonical master dataset of leads.
//!
//! The ledger is a single CSV file, the sole source of truth across runs.
//! Every run loads it in full, merges one batch of newly normalized rows,
//! deduplicates by `(email, date, resource)` with first-seen-wins, orders by
//! vendor date descending, and atomically rewrites the whole file. Re-running
//! on overlapping data is a no-op by construction.

pub mod date;

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io;
use std::path::Path;

use tracing::{debug, info, instrument};

use leadledger_shared::{LeadLedgerError, LeadRecord, Result, SourceType};

/// The ledger's column order. Must stay in sync with [`LeadRecord`]'s field
/// order, which `csv` uses when serializing records.
pub const LEDGER_HEADERS: [&str; 13] = [
    "email",
    "name",
    "company",
    "phone",
    "country",
    "state",
    "city",
    "address",
    "date",
    "resource",
    "source_type",
    "source_file",
    "imported_at",
];

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Load the persisted ledger.
///
/// A missing file is the first run and yields an empty sequence. A file that
/// exists but cannot be read or parsed is fatal — better to abort than to
/// rewrite the ledger from a partial read.
#[instrument]
pub fn load(path: &Path) -> Result<Vec<LeadRecord>> {
    if !path.exists() {
        debug!("no ledger yet, starting empty");
        return Ok(Vec::new());
    }

    let file = File::open(path).map_err(|e| LeadLedgerError::io(path, e))?;
    let mut rdr = csv::Reader::from_reader(file);

    let mut records = Vec::new();
    for row in rdr.deserialize() {
        let record: LeadRecord = row.map_err(|e| {
            LeadLedgerError::parse(format!("ledger {}: {e}", path.display()))
        })?;
        records.push(record);
    }

    debug!(records = records.len(), "ledger loaded");
    Ok(records)
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Merge newly normalized rows into the existing ledger sequence.
///
/// Concatenates `existing` then `incoming` (relative order preserved within
/// each), keeps the first occurrence per `(email, date, resource)` key — so
/// prior persisted records win over re-imports of the same event — and
/// returns the result sorted by parsed vendor date, most recent first.
/// Records whose date fails to parse sort last; the sort is stable, so ties
/// and unparsable dates keep their concatenation order.
pub fn merge(existing: Vec<LeadRecord>, incoming: Vec<LeadRecord>) -> Vec<LeadRecord> {
    let mut seen: HashSet<(String, String, String)> = HashSet::new();
    let mut deduped: Vec<(Option<chrono::NaiveDateTime>, LeadRecord)> = Vec::new();

    for record in existing.into_iter().chain(incoming) {
        let key = (
            record.email.clone(),
            record.date.clone(),
            record.resource.clone(),
        );
        if seen.insert(key) {
            deduped.push((date::parse_lead_date(&record.date), record));
        }
    }

    deduped.sort_by(|(a, _), (b, _)| match (a, b) {
        (Some(a), Some(b)) => b.cmp(a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    deduped.into_iter().map(|(_, record)| record).collect()
}

// ---------------------------------------------------------------------------
// Persist
// ---------------------------------------------------------------------------

/// Atomically write the full ledger: serialize to a temp file in the same
/// directory, then rename over the target. A concurrent reader never sees a
/// truncated ledger.
#[instrument(skip(records), fields(records = records.len()))]
pub fn persist(path: &Path, records: &[LeadRecord]) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent).map_err(|e| LeadLedgerError::io(parent, e))?;

    let file_name = path
        .file_name()
        .ok_or_else(|| LeadLedgerError::validation("ledger path has no file name"))?
        .to_string_lossy();
    let temp = parent.join(format!(".{file_name}.tmp"));

    let file = File::create(&temp).map_err(|e| LeadLedgerError::io(&temp, e))?;
    let mut wtr = csv::Writer::from_writer(file);

    if records.is_empty() {
        // Keep the header row even for an empty ledger.
        wtr.write_record(LEDGER_HEADERS)
            .map_err(|e| LeadLedgerError::io(&temp, io::Error::other(e)))?;
    }
    for record in records {
        wtr.serialize(record)
            .map_err(|e| LeadLedgerError::io(&temp, io::Error::other(e)))?;
    }
    wtr.flush().map_err(|e| LeadLedgerError::io(&temp, e))?;
    drop(wtr);

    std::fs::rename(&temp, path).map_err(|e| LeadLedgerError::io(path, e))?;

    info!(path = %path.display(), records = records.len(), "ledger persisted");
    Ok(())
}

// ---------------------------------------------------------------------------
// Summarize
// ---------------------------------------------------------------------------

/// Count records per source type. Reporting only, not authoritative data.
pub fn summarize(records: &[LeadRecord]) -> BTreeMap<SourceType, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(record.source_type).or_insert(0) += 1;
    }
    counts
}
