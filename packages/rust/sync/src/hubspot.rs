//! HubSpot contacts sink: create-or-update keyed by email.

use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use leadledger_shared::{HubSpotConfig, LeadLedgerError, LeadRecord, Result};

use crate::SyncReport;

/// Pushes leads into HubSpot CRM contacts.
pub struct HubSpotSink {
    client: Client,
    base_url: String,
    token: String,
}

impl HubSpotSink {
    pub fn new(config: &HubSpotConfig, token: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| LeadLedgerError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Upsert every record; per-record failures are counted, not fatal.
    #[instrument(skip_all, fields(records = records.len()))]
    pub async fn sync(&self, records: &[LeadRecord]) -> SyncReport {
        let mut report = SyncReport::new("hubspot");

        for record in records {
            match self.upsert(record).await {
                Ok(()) => report.synced += 1,
                Err(e) => {
                    warn!(email = %record.email, error = %e, "contact upsert failed");
                    report.failed += 1;
                }
            }
        }

        report
    }

    async fn upsert(&self, record: &LeadRecord) -> Result<()> {
        let properties = contact_properties(record);

        match self.find_contact_id(&record.email).await? {
            Some(id) => {
                let url = format!("{}/crm/v3/objects/contacts/{id}", self.base_url);
                let response = self
                    .client
                    .patch(&url)
                    .bearer_auth(&self.token)
                    .json(&json!({ "properties": properties }))
                    .send()
                    .await
                    .map_err(|e| LeadLedgerError::Sync(format!("{url}: {e}")))?;
                check_status(&url, response.status())?;
                debug!(email = %record.email, id = %id, "contact updated");
            }
            None => {
                let url = format!("{}/crm/v3/objects/contacts", self.base_url);
                let response = self
                    .client
                    .post(&url)
                    .bearer_auth(&self.token)
                    .json(&json!({ "properties": properties }))
                    .send()
                    .await
                    .map_err(|e| LeadLedgerError::Sync(format!("{url}: {e}")))?;
                check_status(&url, response.status())?;
                debug!(email = %record.email, "contact created");
            }
        }

        Ok(())
    }

    /// Search for an existing contact by email; `None` means create.
    async fn find_contact_id(&self, email: &str) -> Result<Option<String>> {
        let url = format!("{}/crm/v3/objects/contacts/search", self.base_url);
        let body = json!({
            "filterGroups": [{
                "filters": [{
                    "propertyName": "email",
                    "operator": "EQ",
                    "value": email,
                }]
            }],
            "properties": ["email"],
            "limit": 1,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| LeadLedgerError::Sync(format!("{url}: {e}")))?;
        check_status(&url, response.status())?;

        let parsed: Value = response
            .json()
            .await
            .map_err(|e| LeadLedgerError::Sync(format!("{url}: invalid response: {e}")))?;

        Ok(parsed["results"]
            .as_array()
            .and_then(|results| results.first())
            .and_then(|first| first["id"].as_str())
            .map(String::from))
    }
}

fn check_status(url: &str, status: reqwest::StatusCode) -> Result<()> {
    if status.is_success() {
        Ok(())
    } else {
        Err(LeadLedgerError::Sync(format!("{url}: HTTP {status}")))
    }
}

/// Map a lead record onto HubSpot contact properties, dropping empty values.
///
/// `name` splits on the first whitespace into firstname/lastname, matching
/// how the CRM models contacts.
pub fn contact_properties(record: &LeadRecord) -> Value {
    let mut words = record.name.split_whitespace();
    let firstname = words.next().unwrap_or("").to_string();
    let lastname = words.collect::<Vec<_>>().join(" ");

    let pairs = [
        ("email", record.email.clone()),
        ("firstname", firstname),
        ("lastname", lastname),
        ("company", record.company.clone()),
        ("phone", record.phone.clone()),
        ("country", record.country.clone()),
        ("state", record.state.clone()),
        ("city", record.city.clone()),
        ("address", record.address.clone()),
        ("lead_resource", record.resource.clone()),
        ("lead_source_type", record.source_type.to_string()),
        ("lead_source_file", record.source_file.clone()),
    ];

    let mut properties = serde_json::Map::new();
    for (key, value) in pairs {
        if !value.is_empty() {
            properties.insert(key.to_string(), Value::String(value));
        }
    }
    Value::Object(properties)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use leadledger_shared::SourceType;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn record(email: &str, name: &str) -> LeadRecord {
        LeadRecord {
            email: email.into(),
            name: name.into(),
            company: "Analytical Engines Ltd".into(),
            phone: String::new(),
            country: "UK".into(),
            state: String::new(),
            city: String::new(),
            address: String::new(),
            date: "2024-01-01".into(),
            resource: "LD-100".into(),
            source_type: SourceType::ContactInquiry,
            source_file: "contact_inquiries.csv".into(),
            imported_at: Utc::now(),
        }
    }

    #[test]
    fn properties_split_name_and_drop_empties() {
        let props = contact_properties(&record("a@x.com", "Ada King Lovelace"));
        assert_eq!(props["firstname"], "Ada");
        assert_eq!(props["lastname"], "King Lovelace");
        assert_eq!(props["lead_source_type"], "Contact Inquiry");
        assert_eq!(props["lead_resource"], "LD-100");
        // Empty fields are omitted entirely, not sent as "".
        assert!(props.get("phone").is_none());
        assert!(props.get("state").is_none());
    }

    #[test]
    fn single_word_name_has_no_lastname() {
        let props = contact_properties(&record("a@x.com", "Ada"));
        assert_eq!(props["firstname"], "Ada");
        assert!(props.get("lastname").is_none());
    }

    #[tokio::test]
    async fn creates_when_search_finds_nothing() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/crm/v3/objects/contacts/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/crm/v3/objects/contacts"))
            .and(body_string_contains("a@x.com"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "9001" })))
            .expect(1)
            .mount(&server)
            .await;

        let config = HubSpotConfig {
            enabled: true,
            access_token_env: "UNUSED".into(),
            base_url: server.uri(),
        };
        let sink = HubSpotSink::new(&config, "test-token".into()).unwrap();
        let report = sink.sync(&[record("a@x.com", "Ada Lovelace")]).await;

        assert_eq!(report.synced, 1);
        assert_eq!(report.failed, 0);
    }

    #[tokio::test]
    async fn updates_when_contact_exists() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/crm/v3/objects/contacts/search"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "results": [{ "id": "42" }] })),
            )
            .mount(&server)
            .await;

        Mock::given(method("PATCH"))
            .and(path("/crm/v3/objects/contacts/42"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let config = HubSpotConfig {
            enabled: true,
            access_token_env: "UNUSED".into(),
            base_url: server.uri(),
        };
        let sink = HubSpotSink::new(&config, "test-token".into()).unwrap();
        let report = sink.sync(&[record("a@x.com", "Ada Lovelace")]).await;

        assert_eq!(report.synced, 1);
    }

    #[tokio::test]
    async fn per_record_failures_are_counted_not_fatal() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/crm/v3/objects/contacts/search"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let config = HubSpotConfig {
            enabled: true,
            access_token_env: "UNUSED".into(),
            base_url: server.uri(),
        };
        let sink = HubSpotSink::new(&config, "test-token".into()).unwrap();
        let report = sink
            .sync(&[record("a@x.com", "Ada"), record("b@y.com", "Grace")])
            .await;

        assert_eq!(report.synced, 0);
        assert_eq!(report.failed, 2);
    }
}
