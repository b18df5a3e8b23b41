//! Application configuration for LeadLedger.
//!
//! User config lives at `~/.leadledger/leadledger.toml`.
//! CLI flags override config file values, which override defaults.
//! The file stores the *names* of credential env vars, never the secrets.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LeadLedgerError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "leadledger.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".leadledger";

// ---------------------------------------------------------------------------
// Config structs (matching leadledger.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Vendor portal settings.
    #[serde(default)]
    pub portal: PortalConfig,

    /// Downstream sink settings.
    #[serde(default)]
    pub sync: SyncConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Directory raw export files are saved to.
    #[serde(default = "default_download_dir")]
    pub download_dir: String,

    /// Path of the master ledger CSV.
    #[serde(default = "default_ledger_path")]
    pub ledger_path: String,

    /// Age threshold for the retention sweeper, in days.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            ledger_path: default_ledger_path(),
            retention_days: default_retention_days(),
        }
    }
}

fn default_download_dir() -> String {
    "~/leadledger/exports".into()
}
fn default_ledger_path() -> String {
    "~/leadledger/master_leads.csv".into()
}
fn default_retention_days() -> u32 {
    30
}

/// `[portal]` section — the vendor manufacturer panel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Site base URL (signin and control panel live here).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Host serving the export download endpoint.
    #[serde(default = "default_download_base_url")]
    pub download_base_url: String,

    /// Name of the env var holding the portal login email.
    #[serde(default = "default_email_env")]
    pub email_env: String,

    /// Name of the env var holding the portal password.
    #[serde(default = "default_password_env")]
    pub password_env: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            download_base_url: default_download_base_url(),
            email_env: default_email_env(),
            password_env: default_password_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://gophotonics.com".into()
}
fn default_download_base_url() -> String {
    "https://mpanel.gophotonics.com".into()
}
fn default_email_env() -> String {
    "GOPHOTONICS_EMAIL".into()
}
fn default_password_env() -> String {
    "GOPHOTONICS_PASSWORD".into()
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[sync]` section — which sinks run after consolidation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    /// HubSpot contacts sink.
    #[serde(default)]
    pub hubspot: HubSpotConfig,

    /// Google Sheets sink.
    #[serde(default)]
    pub sheets: SheetsConfig,
}

/// `[sync.hubspot]` — create-or-update contacts keyed by email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubSpotConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Name of the env var holding the private app access token.
    #[serde(default = "default_hubspot_token_env")]
    pub access_token_env: String,

    /// API base URL (overridable for tests).
    #[serde(default = "default_hubspot_base_url")]
    pub base_url: String,
}

impl Default for HubSpotConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            access_token_env: default_hubspot_token_env(),
            base_url: default_hubspot_base_url(),
        }
    }
}

fn default_hubspot_token_env() -> String {
    "HUBSPOT_API_KEY".into()
}
fn default_hubspot_base_url() -> String {
    "https://api.hubapi.com".into()
}

/// `[sync.sheets]` — full-table rewrite of one spreadsheet range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetsConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Target spreadsheet ID.
    #[serde(default)]
    pub sheet_id: String,

    /// Range to rewrite (A1 notation).
    #[serde(default = "default_sheet_range")]
    pub range: String,

    /// Name of the env var holding the OAuth bearer token.
    #[serde(default = "default_sheets_token_env")]
    pub token_env: String,

    /// API base URL (overridable for tests).
    #[serde(default = "default_sheets_base_url")]
    pub base_url: String,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            sheet_id: String::new(),
            range: default_sheet_range(),
            token_env: default_sheets_token_env(),
            base_url: default_sheets_base_url(),
        }
    }
}

fn default_sheet_range() -> String {
    "Sheet1!A:M".into()
}
fn default_sheets_token_env() -> String {
    "GOOGLE_SHEETS_TOKEN".into()
}
fn default_sheets_base_url() -> String {
    "https://sheets.googleapis.com".into()
}

// ---------------------------------------------------------------------------
// Runtime config (merged from config file + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime run configuration — merged from config file + CLI flags, with
/// `~` expanded to the user's home.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Directory raw export files are saved to and consumed from.
    pub download_dir: PathBuf,
    /// Path of the master ledger CSV.
    pub ledger_path: PathBuf,
    /// Age threshold for the retention sweeper, in days.
    pub retention_days: u32,
}

impl From<&AppConfig> for RunConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            download_dir: expand_home(&config.defaults.download_dir),
            ledger_path: expand_home(&config.defaults.ledger_path),
            retention_days: config.defaults.retention_days,
        }
    }
}

/// Expand a leading `~/` to the user's home directory.
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Portal login credentials, resolved from the environment at run start.
#[derive(Clone)]
pub struct PortalCredentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for PortalCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Resolve portal credentials from the env vars named in config.
pub fn portal_credentials(config: &AppConfig) -> Result<PortalCredentials> {
    let email = require_env(&config.portal.email_env)?;
    let password = require_env(&config.portal.password_env)?;
    Ok(PortalCredentials { email, password })
}

/// Read a non-empty env var or fail with a config error naming it.
pub fn require_env(var_name: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(LeadLedgerError::config(format!(
            "credential not found. Set the {var_name} environment variable."
        ))),
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.leadledger/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| LeadLedgerError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.leadledger/leadledger.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| LeadLedgerError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        LeadLedgerError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| LeadLedgerError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| LeadLedgerError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| LeadLedgerError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("download_dir"));
        assert!(toml_str.contains("GOPHOTONICS_EMAIL"));
        assert!(toml_str.contains("HUBSPOT_API_KEY"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.retention_days, 30);
        assert_eq!(parsed.portal.email_env, "GOPHOTONICS_EMAIL");
        assert!(!parsed.sync.hubspot.enabled);
    }

    #[test]
    fn config_with_sinks_enabled() {
        let toml_str = r#"
[defaults]
ledger_path = "/data/leads/master_leads.csv"

[sync.hubspot]
enabled = true

[sync.sheets]
enabled = true
sheet_id = "1AbCdEf"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert!(config.sync.hubspot.enabled);
        assert!(config.sync.sheets.enabled);
        assert_eq!(config.sync.sheets.sheet_id, "1AbCdEf");
        assert_eq!(config.sync.sheets.range, "Sheet1!A:M");
        assert_eq!(config.defaults.ledger_path, "/data/leads/master_leads.csv");
    }

    #[test]
    fn run_config_from_app_config() {
        let mut app = AppConfig::default();
        app.defaults.download_dir = "/var/leadledger/exports".into();
        app.defaults.ledger_path = "/var/leadledger/master_leads.csv".into();

        let run = RunConfig::from(&app);
        assert_eq!(run.download_dir, PathBuf::from("/var/leadledger/exports"));
        assert_eq!(run.retention_days, 30);
    }

    #[test]
    fn missing_credentials_error_names_the_var() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.portal.email_env = "LL_TEST_NONEXISTENT_EMAIL_98765".into();
        config.portal.password_env = "LL_TEST_NONEXISTENT_PASSWORD_98765".into();
        let result = portal_credentials(&config);
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("LL_TEST_NONEXISTENT_EMAIL_98765")
        );
    }

    #[test]
    fn credentials_debug_redacts_password() {
        let creds = PortalCredentials {
            email: "ops@example.com".into(),
            password: "hunter2".into(),
        };
        let debug = format!("{creds:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }
}
