//! Vendor portal export client.
//!
//! Logs into the manufacturer panel, scrapes the export links for each lead
//! type, downloads the export files, and returns an [`ExportManifest`] naming
//! exactly the files saved this run. The consolidation pipeline consumes that
//! manifest — never a directory glob — so its input stays deterministic.

use std::path::Path;
use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use leadledger_shared::{
    ExportManifest, ExportedFile, LeadLedgerError, PortalConfig, PortalCredentials, Result,
};

/// User-Agent for portal requests. The panel serves browsers, not bots.
const USER_AGENT: &str = concat!(
    "Mozilla/5.0 (compatible; LeadLedger/",
    env!("CARGO_PKG_VERSION"),
    ")"
);

/// Sign-in page path on the portal base URL.
const SIGNIN_PATH: &str = "/users/signin";

/// Manufacturer control panel path on the portal base URL.
const PANEL_PATH: &str = "/manufacturer/control-panel";

static KEY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"key=([^&]+)").unwrap());
static TYPE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"type=([^&]+)").unwrap());

// ---------------------------------------------------------------------------
// Export links
// ---------------------------------------------------------------------------

/// One lead-type export offered by the control panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportLink {
    /// Lead type as encoded in the link (e.g. `Datasheet_Downloads`).
    pub lead_type: String,
    /// Account-specific download key.
    pub key: String,
}

/// Scrape export links from the control panel HTML.
///
/// Looks for anchors whose href carries both `key=` and `type=` query values;
/// the first link per lead type wins, the way the panel lists them.
pub fn discover_export_links(panel_html: &str) -> Vec<ExportLink> {
    let doc = Html::parse_document(panel_html);
    let anchor_sel = Selector::parse("a[href]").unwrap();

    let mut links: Vec<ExportLink> = Vec::new();
    for anchor in doc.select(&anchor_sel) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if !href.contains("/leads?key=") {
            continue;
        }
        let (Some(key), Some(lead_type)) = (
            KEY_RE.captures(href).map(|c| c[1].to_string()),
            TYPE_RE.captures(href).map(|c| c[1].to_string()),
        ) else {
            continue;
        };

        if links.iter().all(|l| l.lead_type != lead_type) {
            links.push(ExportLink { lead_type, key });
        }
    }

    debug!(count = links.len(), "export links discovered");
    links
}

/// Collect `name=value` pairs from hidden form inputs on the sign-in page.
/// CSRF tokens and the like ride along with the credential POST.
pub fn collect_hidden_inputs(html: &str) -> Vec<(String, String)> {
    let doc = Html::parse_document(html);
    let hidden_sel = Selector::parse("form input[type=\"hidden\"]").unwrap();

    doc.select(&hidden_sel)
        .filter_map(|input| {
            let name = input.value().attr("name")?;
            let value = input.value().attr("value").unwrap_or("");
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

/// Date-coded file name for a saved export, e.g.
/// `Datasheet_Downloads_leads_2025-08-07.xlsx`.
pub fn export_file_name(lead_type: &str, date: chrono::NaiveDate, extension: &str) -> String {
    let safe: String = lead_type
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!("{safe}_leads_{date}.{extension}")
}

/// File extension for a download, from its Content-Type. Text/CSV responses
/// are directly consumable tables; anything else is a spreadsheet blob left
/// for the external conversion step.
fn extension_for(content_type: &str) -> &'static str {
    if content_type.contains("csv") || content_type.starts_with("text/") {
        "csv"
    } else {
        "xlsx"
    }
}

// ---------------------------------------------------------------------------
// Portal client
// ---------------------------------------------------------------------------

/// Authenticated session against the vendor portal.
pub struct PortalClient {
    client: Client,
    base_url: String,
    download_base_url: String,
}

impl PortalClient {
    /// Build a client with a cookie store — the portal session lives in
    /// cookies set during login.
    pub fn new(config: &PortalConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LeadLedgerError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            download_base_url: config.download_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Log in and verify the control panel is reachable.
    #[instrument(skip_all)]
    pub async fn login(&self, creds: &PortalCredentials) -> Result<()> {
        let signin_url = format!("{}{SIGNIN_PATH}", self.base_url);

        let signin_page = self
            .get_text(&signin_url)
            .await
            .map_err(|e| LeadLedgerError::portal(format!("sign-in page: {e}")))?;

        let mut form: Vec<(String, String)> = vec![
            ("email".into(), creds.email.clone()),
            ("password".into(), creds.password.clone()),
        ];
        for (name, value) in collect_hidden_inputs(&signin_page) {
            if form.iter().all(|(n, _)| *n != name) {
                form.push((name, value));
            }
        }

        let response = self
            .client
            .post(&signin_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| LeadLedgerError::Network(format!("{signin_url}: {e}")))?;
        if !response.status().is_success() {
            return Err(LeadLedgerError::portal(format!(
                "login rejected: HTTP {}",
                response.status()
            )));
        }

        // The session is only proven by the panel actually loading.
        let panel_url = format!("{}{PANEL_PATH}", self.base_url);
        let panel = self
            .client
            .get(&panel_url)
            .send()
            .await
            .map_err(|e| LeadLedgerError::Network(format!("{panel_url}: {e}")))?;
        if !panel.status().is_success() {
            return Err(LeadLedgerError::portal(format!(
                "control panel inaccessible after login: HTTP {}",
                panel.status()
            )));
        }

        info!("portal login verified");
        Ok(())
    }

    /// Fetch the control panel HTML.
    pub async fn fetch_panel(&self) -> Result<String> {
        let panel_url = format!("{}{PANEL_PATH}", self.base_url);
        self.get_text(&panel_url).await
    }

    /// Download every discovered export into `download_dir`.
    ///
    /// Per-link failures are logged and skipped — one dead export must not
    /// lose the rest of the batch. An empty manifest is not an error.
    #[instrument(skip_all, fields(links = links.len(), dir = %download_dir.display()))]
    pub async fn download_exports(
        &self,
        links: &[ExportLink],
        download_dir: &Path,
    ) -> Result<ExportManifest> {
        std::fs::create_dir_all(download_dir)
            .map_err(|e| LeadLedgerError::io(download_dir, e))?;

        let today = Utc::now().date_naive();
        let mut manifest = ExportManifest::default();

        for link in links {
            let url = format!("{}/download?key={}", self.download_base_url, link.key);
            debug!(lead_type = %link.lead_type, "fetching export");

            let (bytes, content_type) = match self.get_bytes(&url).await {
                Ok(got) => got,
                Err(e) => {
                    warn!(lead_type = %link.lead_type, error = %e, "export download failed, skipping");
                    continue;
                }
            };

            let path = download_dir.join(export_file_name(
                &link.lead_type,
                today,
                extension_for(&content_type),
            ));
            std::fs::write(&path, &bytes).map_err(|e| LeadLedgerError::io(&path, e))?;

            let mut hasher = Sha256::new();
            hasher.update(&bytes);
            let sha256 = format!("{:x}", hasher.finalize());

            info!(lead_type = %link.lead_type, bytes = bytes.len(), path = %path.display(), "export saved");
            manifest.files.push(ExportedFile {
                path,
                lead_type: link.lead_type.clone(),
                sha256,
                saved_at: Utc::now(),
            });
        }

        Ok(manifest)
    }

    /// Log in, discover links, download everything. The one-call export run.
    pub async fn export_all(
        &self,
        creds: &PortalCredentials,
        download_dir: &Path,
    ) -> Result<ExportManifest> {
        self.login(creds).await?;
        let panel = self.fetch_panel().await?;
        let links = discover_export_links(&panel);
        if links.is_empty() {
            warn!("no export links found on the control panel");
        }
        self.download_exports(&links, download_dir).await
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| LeadLedgerError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LeadLedgerError::Network(format!("{url}: HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| LeadLedgerError::Network(format!("{url}: failed to read body: {e}")))
    }

    async fn get_bytes(&self, url: &str) -> Result<(Vec<u8>, String)> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| LeadLedgerError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LeadLedgerError::Network(format!("{url}: HTTP {status}")));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| LeadLedgerError::Network(format!("{url}: failed to read body: {e}")))?
            .to_vec();

        Ok((bytes, content_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PANEL_HTML: &str = r#"
        <html><body>
          <div class="sidebar-menu">
            <a href="/leads?key=DS-KEY-123&type=Datasheet_Downloads">Datasheet Downloads</a>
            <a href="/leads?key=DS-KEY-123&type=Datasheet_Downloads&page=2">Datasheet page 2</a>
            <a href="/leads?key=WP-KEY-456&type=Whitepaper_Downloads">Whitepaper Downloads</a>
            <a href="/dashboard">Dashboard</a>
            <a href="/leads/archive">Archive (no key)</a>
          </div>
        </body></html>
    "#;

    const SIGNIN_HTML: &str = r#"
        <html><body>
          <form action="/users/signin" method="post">
            <input type="hidden" name="__csrf" value="tok-789" />
            <input type="text" name="email" />
            <input type="password" name="password" />
          </form>
        </body></html>
    "#;

    fn test_config(base: &str) -> PortalConfig {
        PortalConfig {
            base_url: base.to_string(),
            download_base_url: base.to_string(),
            email_env: "UNUSED".into(),
            password_env: "UNUSED".into(),
            timeout_secs: 5,
        }
    }

    fn test_creds() -> PortalCredentials {
        PortalCredentials {
            email: "ops@example.com".into(),
            password: "hunter2".into(),
        }
    }

    #[test]
    fn discovers_links_and_dedupes_by_lead_type() {
        let links = discover_export_links(PANEL_HTML);
        assert_eq!(
            links,
            vec![
                ExportLink {
                    lead_type: "Datasheet_Downloads".into(),
                    key: "DS-KEY-123".into(),
                },
                ExportLink {
                    lead_type: "Whitepaper_Downloads".into(),
                    key: "WP-KEY-456".into(),
                },
            ]
        );
    }

    #[test]
    fn no_links_on_unrelated_page() {
        assert!(discover_export_links("<html><a href='/home'>home</a></html>").is_empty());
    }

    #[test]
    fn hidden_inputs_are_collected() {
        let inputs = collect_hidden_inputs(SIGNIN_HTML);
        assert_eq!(inputs, vec![("__csrf".to_string(), "tok-789".to_string())]);
    }

    #[test]
    fn export_file_names_are_date_coded_and_safe() {
        let date = chrono::NaiveDate::from_ymd_opt(2025, 8, 7).unwrap();
        assert_eq!(
            export_file_name("Datasheet_Downloads", date, "xlsx"),
            "Datasheet_Downloads_leads_2025-08-07.xlsx"
        );
        assert_eq!(
            export_file_name("Contact/Inquiry?", date, "csv"),
            "Contact_Inquiry__leads_2025-08-07.csv"
        );
    }

    #[test]
    fn extension_follows_content_type() {
        assert_eq!(extension_for("text/csv"), "csv");
        assert_eq!(extension_for("text/plain; charset=utf-8"), "csv");
        assert_eq!(
            extension_for("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
            "xlsx"
        );
        assert_eq!(extension_for(""), "xlsx");
    }

    #[tokio::test]
    async fn login_posts_credentials_with_hidden_fields() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(SIGNIN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string(SIGNIN_HTML))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path(SIGNIN_PATH))
            .and(body_string_contains("email=ops%40example.com"))
            .and(body_string_contains("__csrf=tok-789"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path(PANEL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string(PANEL_HTML))
            .mount(&server)
            .await;

        let client = PortalClient::new(&test_config(&server.uri())).unwrap();
        client.login(&test_creds()).await.unwrap();
    }

    #[tokio::test]
    async fn login_fails_when_panel_is_inaccessible() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(SIGNIN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string(SIGNIN_HTML))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(SIGNIN_PATH))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(PANEL_PATH))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = PortalClient::new(&test_config(&server.uri())).unwrap();
        let err = client.login(&test_creds()).await.unwrap_err();
        assert!(matches!(err, LeadLedgerError::Portal { .. }));
    }

    #[tokio::test]
    async fn download_saves_files_and_builds_manifest() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/download"))
            .and(query_param("key", "DS-KEY-123"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/csv")
                    .set_body_bytes(b"email\na@x.com\n".to_vec()),
            )
            .mount(&server)
            .await;

        // The whitepaper export is dead; the run must carry on without it.
        Mock::given(method("GET"))
            .and(path("/download"))
            .and(query_param("key", "WP-KEY-456"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let client = PortalClient::new(&test_config(&server.uri())).unwrap();
        let links = discover_export_links(PANEL_HTML);

        let manifest = client.download_exports(&links, dir.path()).await.unwrap();

        assert_eq!(manifest.files.len(), 1);
        let file = &manifest.files[0];
        assert_eq!(file.lead_type, "Datasheet_Downloads");
        assert!(file.path.exists());
        assert!(file.path.extension().is_some_and(|e| e == "csv"));
        assert_eq!(std::fs::read(&file.path).unwrap(), b"email\na@x.com\n");
        assert_eq!(file.sha256.len(), 64);
    }
}
