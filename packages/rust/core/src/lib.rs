//! Core pipeline orchestration for LeadLedger.
//!
//! Ties the normalizer and ledger together into the end-to-end consolidation
//! run, and houses the retention sweeper for the download directory.

pub mod pipeline;
pub mod sweep;
