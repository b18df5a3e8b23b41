//! Google Sheets sink: full-table rewrite of one spreadsheet range.

use reqwest::Client;
use serde_json::{Value, json};
use tracing::{info, instrument};

use leadledger_ledger::LEDGER_HEADERS;
use leadledger_shared::{LeadLedgerError, LeadRecord, Result, SheetsConfig};

use crate::SyncReport;

/// Mirrors the ledger into a spreadsheet for the humans watching it.
pub struct SheetsSink {
    client: Client,
    config: SheetsConfig,
    token: String,
}

impl SheetsSink {
    pub fn new(config: &SheetsConfig, token: String) -> Result<Self> {
        if config.sheet_id.is_empty() {
            return Err(LeadLedgerError::config(
                "sync.sheets.sheet_id is required when the sheets sink is enabled",
            ));
        }

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| LeadLedgerError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            config: config.clone(),
            token,
        })
    }

    /// Rewrite the configured range with the whole ledger. All-or-nothing:
    /// either the sheet gets every row or the report marks them all failed.
    #[instrument(skip_all, fields(records = records.len(), sheet = %self.config.sheet_id))]
    pub async fn sync(&self, records: &[LeadRecord]) -> SyncReport {
        let mut report = SyncReport::new("sheets");

        match self.put_values(records).await {
            Ok(()) => report.synced = records.len(),
            Err(e) => {
                tracing::warn!(error = %e, "sheet rewrite failed");
                report.failed = records.len();
            }
        }

        report
    }

    async fn put_values(&self, records: &[LeadRecord]) -> Result<()> {
        let url = format!(
            "{}/v4/spreadsheets/{}/values/{}?valueInputOption=RAW",
            self.config.base_url.trim_end_matches('/'),
            self.config.sheet_id,
            self.config.range,
        );

        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.token)
            .json(&values_payload(&self.config.range, records))
            .send()
            .await
            .map_err(|e| LeadLedgerError::Sync(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LeadLedgerError::Sync(format!("{url}: HTTP {status}")));
        }

        info!(rows = records.len() + 1, "sheet range rewritten");
        Ok(())
    }
}

/// Build the `values` body: header row plus one row per record, in the
/// ledger's column order.
pub fn values_payload(range: &str, records: &[LeadRecord]) -> Value {
    let mut values: Vec<Vec<String>> =
        vec![LEDGER_HEADERS.iter().map(|h| h.to_string()).collect()];
    values.extend(records.iter().map(record_row));

    json!({
        "range": range,
        "majorDimension": "ROWS",
        "values": values,
    })
}

fn record_row(record: &LeadRecord) -> Vec<String> {
    vec![
        record.email.clone(),
        record.name.clone(),
        record.company.clone(),
        record.phone.clone(),
        record.country.clone(),
        record.state.clone(),
        record.city.clone(),
        record.address.clone(),
        record.date.clone(),
        record.resource.clone(),
        record.source_type.to_string(),
        record.source_file.clone(),
        record.imported_at.to_rfc3339(),
    ]
}
