//! Generic row/column table reading.
//!
//! The normalizer works on [`RawTable`]: an ordered sequence of rows, each a
//! list of string cells under string header labels. CSV is the concrete
//! format read here; binary spreadsheet exports are converted to CSV upstream
//! of the pipeline boundary.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;

use leadledger_shared::{LeadLedgerError, Result};

/// A parsed export table: header labels plus data rows.
///
/// Rows may be shorter than the header (vendor exports are ragged); missing
/// cells read as empty strings via [`RawTable::cell`].
#[derive(Debug, Clone)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Read a CSV file into a table.
    ///
    /// An unreadable file is an I/O error; a file that cannot be parsed as
    /// CSV at all is a parse error. Callers treat the latter as local to the
    /// file (skip-and-continue).
    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| LeadLedgerError::io(path, e))?;
        Self::from_csv_reader(file).map_err(|e| {
            LeadLedgerError::parse(format!("{}: {e}", path.display()))
        })
    }

    /// Read CSV from any reader into a table.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);

        let headers = rdr
            .headers()
            .map_err(|e| LeadLedgerError::parse(e.to_string()))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record.map_err(|e| LeadLedgerError::parse(e.to_string()))?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { headers, rows })
    }

    /// Index of the column whose label matches `label`, ignoring case and
    /// surrounding whitespace. Vendor export schemas vary in both.
    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(label.trim()))
    }

    /// Cell at (`row`, `col`), trimmed; empty string for missing cells.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(|s| s.trim())
            .unwrap_or("")
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
