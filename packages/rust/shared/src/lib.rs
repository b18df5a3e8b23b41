//! Shared types, error model, and configuration for LeadLedger.
//!
//! This crate is the foundation depended on by all other LeadLedger crates.
//! It provides:
//! - [`LeadLedgerError`] — the unified error type
//! - Domain types ([`LeadRecord`], [`SourceType`], [`ExportManifest`], [`RunId`])
//! - Configuration ([`AppConfig`], [`RunConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, HubSpotConfig, PortalConfig, PortalCredentials, RunConfig,
    SheetsConfig, SyncConfig, config_dir, config_file_path, init_config, load_config,
    load_config_from, portal_credentials, require_env,
};
pub use error::{LeadLedgerError, Result};
pub use types::{ExportManifest, ExportedFile, LeadRecord, RunId, SourceType};
