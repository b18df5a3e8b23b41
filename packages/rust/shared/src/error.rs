//! Error types for LeadLedger.
//!
//! Library crates use [`LeadLedgerError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all LeadLedger operations.
#[derive(Debug, thiserror::Error)]
pub enum LeadLedgerError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error during export or sync.
    #[error("network error: {0}")]
    Network(String),

    /// Portal session error (login, panel navigation, export discovery).
    #[error("portal error: {message}")]
    Portal { message: String },

    /// An export file or the ledger could not be parsed as a table.
    /// Local to one file during normalization; fatal for the ledger itself.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Downstream sink error (CRM/spreadsheet push).
    #[error("sync error: {0}")]
    Sync(String),

    /// Filesystem I/O error. Fatal when the path is the ledger.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (missing columns, contract violations, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LeadLedgerError>;

impl LeadLedgerError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a portal error from any displayable message.
    pub fn portal(msg: impl Into<String>) -> Self {
        Self::Portal {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
