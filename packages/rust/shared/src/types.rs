//! Core domain types for the LeadLedger pipeline.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for batch run identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// SourceType
// ---------------------------------------------------------------------------

/// Closed classification of what triggered a lead, inferred from the
/// originating export file's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SourceType {
    Datasheet,
    Whitepaper,
    Quotation,
    #[serde(rename = "Contact Inquiry")]
    ContactInquiry,
    Other,
}

impl SourceType {
    /// The label written to the ledger's `source_type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Datasheet => "Datasheet",
            Self::Whitepaper => "Whitepaper",
            Self::Quotation => "Quotation",
            Self::ContactInquiry => "Contact Inquiry",
            Self::Other => "Other",
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// LeadRecord
// ---------------------------------------------------------------------------

/// One canonical lead row. Field order is the ledger's column order.
///
/// All contact attributes are free text and may be empty; `email` is the one
/// required field (rows without it never leave the normalizer). `date` is the
/// vendor-reported event time, kept as the raw string because its format is
/// not guaranteed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadRecord {
    pub email: String,
    pub name: String,
    pub company: String,
    pub phone: String,
    pub country: String,
    pub state: String,
    pub city: String,
    pub address: String,
    pub date: String,
    pub resource: String,
    pub source_type: SourceType,
    pub source_file: String,
    pub imported_at: DateTime<Utc>,
}

impl LeadRecord {
    /// Identity key for deduplication. Two records with an equal key describe
    /// the same real-world event and collapse to the first-seen one.
    pub fn dedup_key(&self) -> (&str, &str, &str) {
        (&self.email, &self.date, &self.resource)
    }
}

// ---------------------------------------------------------------------------
// Export manifest
// ---------------------------------------------------------------------------

/// One raw export file saved by the exporter this run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedFile {
    /// Where the file was saved.
    pub path: PathBuf,
    /// Display name of the lead type as shown in the portal (e.g.
    /// `Datasheet_Downloads`).
    pub lead_type: String,
    /// SHA-256 of the downloaded bytes.
    pub sha256: String,
    /// When the download completed.
    pub saved_at: DateTime<Utc>,
}

/// The exporter's return value: exactly the files saved this run.
///
/// The consolidation pipeline consumes a manifest, never a directory glob, so
/// its input is deterministic and testable without a portal session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportManifest {
    pub files: Vec<ExportedFile>,
}

impl ExportManifest {
    /// Build a manifest from already-downloaded files (offline runs).
    pub fn from_paths(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        let files = paths
            .into_iter()
            .map(|path| {
                let lead_type = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                ExportedFile {
                    path,
                    lead_type,
                    sha256: String::new(),
                    saved_at: Utc::now(),
                }
            })
            .collect();
        Self { files }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(email: &str, date: &str, resource: &str) -> LeadRecord {
        LeadRecord {
            email: email.into(),
            name: "Ada Lovelace".into(),
            company: "Analytical Engines Ltd".into(),
            phone: String::new(),
            country: "UK".into(),
            state: String::new(),
            city: "London".into(),
            address: String::new(),
            date: date.into(),
            resource: resource.into(),
            source_type: SourceType::Datasheet,
            source_file: "datasheet_leads_2025-06-01.csv".into(),
            imported_at: Utc::now(),
        }
    }

    #[test]
    fn run_id_roundtrip() {
        let id = RunId::new();
        let s = id.to_string();
        let parsed: RunId = s.parse().expect("parse RunId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn dedup_key_ignores_contact_attributes() {
        let a = record("a@x.com", "2024-01-01", "R1");
        let mut b = record("a@x.com", "2024-01-01", "R1");
        b.company = "NewCo".into();
        assert_eq!(a.dedup_key(), b.dedup_key());

        let c = record("a@x.com", "2024-01-02", "R1");
        assert_ne!(a.dedup_key(), c.dedup_key());
    }

    #[test]
    fn source_type_labels() {
        assert_eq!(SourceType::ContactInquiry.to_string(), "Contact Inquiry");
        assert_eq!(SourceType::Datasheet.to_string(), "Datasheet");
    }

    #[test]
    fn lead_record_csv_roundtrip() {
        let rec = record("a@x.com", "2024-01-01", "LD-100");

        let mut wtr = csv::Writer::from_writer(vec![]);
        wtr.serialize(&rec).expect("serialize");
        let bytes = wtr.into_inner().expect("flush");
        let text = String::from_utf8(bytes).expect("utf8");

        // Header row is the ledger's stable column order.
        let header = text.lines().next().expect("header");
        assert_eq!(
            header,
            "email,name,company,phone,country,state,city,address,date,\
             resource,source_type,source_file,imported_at"
        );

        let mut rdr = csv::Reader::from_reader(text.as_bytes());
        let parsed: LeadRecord = rdr
            .deserialize()
            .next()
            .expect("one row")
            .expect("deserialize");
        assert_eq!(parsed, rec);
    }

    #[test]
    fn manifest_from_paths_uses_file_stem_as_lead_type() {
        let manifest = ExportManifest::from_paths(vec![PathBuf::from(
            "/tmp/exports/whitepaper_leads_2025-06-01.csv",
        )]);
        assert_eq!(manifest.files.len(), 1);
        assert_eq!(manifest.files[0].lead_type, "whitepaper_leads_2025-06-01");
    }
}
