//! LeadLedger CLI — vendor lead export, consolidation, and sync tool.
//!
//! Downloads lead exports from the manufacturer portal, merges them into the
//! deduplicated master ledger, and pushes the result to configured sinks.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
