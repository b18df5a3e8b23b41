//! Row Normalizer: raw export tables → canonical lead records.
//!
//! Vendor export schemas vary across lead types, so each canonical field is
//! resolved through a prioritized list of acceptable source-column aliases,
//! falling back to empty string. Rows without an email are dropped and
//! counted — they cannot be deduplicated or addressed downstream.

pub mod table;

use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use leadledger_shared::{LeadRecord, Result, SourceType};

pub use table::RawTable;

// ---------------------------------------------------------------------------
// Column aliases, in priority order (first present wins)
// ---------------------------------------------------------------------------

const EMAIL_ALIASES: &[&str] = &["User Email", "email"];
const NAME_ALIASES: &[&str] = &["User Name", "name"];
const COMPANY_ALIASES: &[&str] = &["User Company", "company"];
const PHONE_ALIASES: &[&str] = &["User Phone", "phone", "telephone"];
const COUNTRY_ALIASES: &[&str] = &["User Country", "country"];
const STATE_ALIASES: &[&str] = &["User State", "state"];
const CITY_ALIASES: &[&str] = &["User City", "city"];
const ADDRESS_ALIASES: &[&str] = &["User Address", "address"];
const DATE_ALIASES: &[&str] = &["Downloaded On", "downloaded_on"];

/// Output of normalizing one export table.
#[derive(Debug, Default)]
pub struct NormalizedBatch {
    /// Lead records in source row order.
    pub records: Vec<LeadRecord>,
    /// Rows dropped for lacking an email. Noise, not an error.
    pub skipped_rows: usize,
}

// ---------------------------------------------------------------------------
// Source classification
// ---------------------------------------------------------------------------

/// Classify a lead export by its file name. Case-insensitive substring
/// match, first match wins.
pub fn classify_source(file_name: &str) -> SourceType {
    let name = file_name.to_ascii_lowercase();
    if name.contains("datasheet") || name.contains("data_sheet") {
        SourceType::Datasheet
    } else if name.contains("whitepaper") {
        SourceType::Whitepaper
    } else if name.contains("quotation") {
        SourceType::Quotation
    } else if name.contains("inquiry") || name.contains("contact") {
        SourceType::ContactInquiry
    } else {
        SourceType::Other
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Normalize one export file: read it as a table, then map its rows.
pub fn normalize_file(path: &Path, imported_at: DateTime<Utc>) -> Result<NormalizedBatch> {
    let table = RawTable::from_csv_path(path)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(normalize_table(&table, &file_name, imported_at))
}

/// Map a raw table's rows into canonical lead records.
///
/// `file_name` drives the `source_type` classification and is recorded on
/// every record; `imported_at` is the batch's wall-clock ingestion time.
#[instrument(skip(table), fields(file = %file_name, rows = table.row_count()))]
pub fn normalize_table(
    table: &RawTable,
    file_name: &str,
    imported_at: DateTime<Utc>,
) -> NormalizedBatch {
    let source_type = classify_source(file_name);
    let resource = ResourceColumn::detect(table);

    let email_col = first_column(table, EMAIL_ALIASES);
    let name_col = first_column(table, NAME_ALIASES);
    let company_col = first_column(table, COMPANY_ALIASES);
    let phone_col = first_column(table, PHONE_ALIASES);
    let country_col = first_column(table, COUNTRY_ALIASES);
    let state_col = first_column(table, STATE_ALIASES);
    let city_col = first_column(table, CITY_ALIASES);
    let address_col = first_column(table, ADDRESS_ALIASES);
    let date_col = first_column(table, DATE_ALIASES);

    let mut batch = NormalizedBatch::default();

    for row in 0..table.row_count() {
        let email = cell_or_empty(table, row, email_col);
        if email.is_empty() {
            batch.skipped_rows += 1;
            continue;
        }

        batch.records.push(LeadRecord {
            email,
            name: cell_or_empty(table, row, name_col),
            company: cell_or_empty(table, row, company_col),
            phone: cell_or_empty(table, row, phone_col),
            country: cell_or_empty(table, row, country_col),
            state: cell_or_empty(table, row, state_col),
            city: cell_or_empty(table, row, city_col),
            address: cell_or_empty(table, row, address_col),
            date: cell_or_empty(table, row, date_col),
            resource: resource.resolve(table, row),
            source_type,
            source_file: file_name.to_string(),
            imported_at,
        });
    }

    debug!(
        records = batch.records.len(),
        skipped = batch.skipped_rows,
        source_type = %source_type,
        "normalized export table"
    );

    batch
}

/// Index of the first alias present in the table's header.
fn first_column(table: &RawTable, aliases: &[&str]) -> Option<usize> {
    aliases.iter().find_map(|a| table.column_index(a))
}

fn cell_or_empty(table: &RawTable, row: usize, col: Option<usize>) -> String {
    col.map(|c| table.cell(row, c).to_string()).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Resource resolution
// ---------------------------------------------------------------------------

/// Which column yields the `resource` identifier, decided once per table:
/// a part number, a document title, or the trailing path segment of a
/// product URL.
#[derive(Debug, Clone, Copy)]
enum ResourceColumn {
    PartNumber(usize),
    WhitePaperTitle(usize),
    ProductUrl(usize),
    Absent,
}

impl ResourceColumn {
    fn detect(table: &RawTable) -> Self {
        if let Some(col) = table.column_index("Part Number") {
            Self::PartNumber(col)
        } else if let Some(col) = table.column_index("White Paper Title") {
            Self::WhitePaperTitle(col)
        } else if let Some(col) = table.column_index("Product Url") {
            Self::ProductUrl(col)
        } else {
            Self::Absent
        }
    }

    fn resolve(&self, table: &RawTable, row: usize) -> String {
        match *self {
            Self::PartNumber(col) | Self::WhitePaperTitle(col) => {
                table.cell(row, col).to_string()
            }
            Self::ProductUrl(col) => trailing_segment(table.cell(row, col)),
            Self::Absent => String::new(),
        }
    }
}

/// Final non-empty `/`-segment of a URL, or empty.
fn trailing_segment(url: &str) -> String {
    url.split('/')
        .filter(|s| !s.is_empty())
        .next_back()
        .unwrap_or("")
        .to_string()
}
