//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use leadledger_core::pipeline::{ProgressReporter, RunReport, run_consolidation};
use leadledger_core::sweep::sweep_dir;
use leadledger_exporter::PortalClient;
use leadledger_shared::{
    AppConfig, ExportManifest, RunConfig, init_config, load_config, portal_credentials,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// LeadLedger — consolidate vendor lead exports into one deduplicated ledger.
#[derive(Parser)]
#[command(
    name = "leadledger",
    version,
    about = "Download vendor lead exports, merge them into a deduplicated master ledger, and sync downstream.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Full batch: export from the portal, consolidate, sync, sweep.
    Run {
        /// Skip pushing the ledger to configured sinks.
        #[arg(long)]
        no_sync: bool,

        /// Skip the retention sweep of the download directory.
        #[arg(long)]
        no_sweep: bool,
    },

    /// Consolidate already-downloaded export files into the ledger.
    Consolidate {
        /// Export files to process (explicit manifest).
        files: Vec<String>,

        /// Process every .csv file in this directory instead.
        #[arg(short, long, conflicts_with = "files")]
        dir: Option<String>,
    },

    /// Push the current ledger to the configured sinks.
    Sync {
        /// Ledger path override.
        #[arg(long)]
        ledger: Option<String>,
    },

    /// Delete download-directory files older than the retention threshold.
    Sweep {
        /// Directory override.
        #[arg(long)]
        dir: Option<String>,

        /// Age threshold in days (overrides config).
        #[arg(long)]
        days: Option<u32>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "leadledger=info",
        1 => "leadledger=debug",
        _ => "leadledger=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run { no_sync, no_sweep } => cmd_run(no_sync, no_sweep).await,
        Command::Consolidate { files, dir } => cmd_consolidate(&files, dir.as_deref()).await,
        Command::Sync { ledger } => cmd_sync(ledger.as_deref()).await,
        Command::Sweep { dir, days } => cmd_sweep(dir.as_deref(), days).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(no_sync: bool, no_sweep: bool) -> Result<()> {
    let config = load_config()?;
    // Fail on missing credentials before touching the network.
    let creds = portal_credentials(&config)?;
    let run_config = RunConfig::from(&config);

    info!(download_dir = %run_config.download_dir.display(), "exporting leads from portal");

    let client = PortalClient::new(&config.portal)?;
    let manifest = client.export_all(&creds, &run_config.download_dir).await?;

    println!();
    println!("  Downloaded {} export file(s)", manifest.files.len());

    let reporter = CliProgress::new();
    let report = run_consolidation(&run_config, &manifest, &reporter)?;
    print_report(&report);

    if !no_sync {
        dispatch_sinks(&config, &run_config.ledger_path).await?;
    }

    if !no_sweep {
        let swept = sweep_dir(&run_config.download_dir, run_config.retention_days)?;
        if swept.deleted > 0 || swept.failed > 0 {
            println!(
                "  Sweep:  {} deleted, {} kept, {} failed",
                swept.deleted, swept.kept, swept.failed
            );
        }
    }

    Ok(())
}

async fn cmd_consolidate(files: &[String], dir: Option<&str>) -> Result<()> {
    let config = load_config()?;
    let run_config = RunConfig::from(&config);

    let manifest = match dir {
        Some(dir) => manifest_from_dir(Path::new(dir))?,
        None if files.is_empty() => manifest_from_dir(&run_config.download_dir)?,
        None => ExportManifest::from_paths(files.iter().map(PathBuf::from)),
    };

    if manifest.is_empty() {
        println!("No export files to consolidate.");
        return Ok(());
    }

    info!(files = manifest.files.len(), "consolidating exports");

    let reporter = CliProgress::new();
    let report = run_consolidation(&run_config, &manifest, &reporter)?;
    print_report(&report);

    Ok(())
}

async fn cmd_sync(ledger: Option<&str>) -> Result<()> {
    let config = load_config()?;
    let ledger_path = match ledger {
        Some(p) => PathBuf::from(p),
        None => RunConfig::from(&config).ledger_path,
    };

    if !ledger_path.exists() {
        return Err(eyre!(
            "no ledger found at '{}' — run `leadledger consolidate` first",
            ledger_path.display()
        ));
    }

    dispatch_sinks(&config, &ledger_path).await
}

async fn cmd_sweep(dir: Option<&str>, days: Option<u32>) -> Result<()> {
    let config = load_config()?;
    let run_config = RunConfig::from(&config);

    let dir = dir.map(PathBuf::from).unwrap_or(run_config.download_dir);
    let days = days.unwrap_or(run_config.retention_days);

    let report = sweep_dir(&dir, days)?;
    println!(
        "Swept {}: {} deleted, {} kept, {} failed",
        dir.display(),
        report.deleted,
        report.kept,
        report.failed
    );

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a manifest from every `.csv` file in a directory, in name order so
/// repeated runs see the same emission order.
fn manifest_from_dir(dir: &Path) -> Result<ExportManifest> {
    if !dir.exists() {
        return Ok(ExportManifest::default());
    }

    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| eyre!("cannot read '{}': {e}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "csv"))
        .collect();
    paths.sort();

    Ok(ExportManifest::from_paths(paths))
}

async fn dispatch_sinks(config: &AppConfig, ledger_path: &Path) -> Result<()> {
    let reports = leadledger_sync::dispatch(&config.sync, ledger_path).await?;

    for report in &reports {
        println!(
            "  Sync [{}]: {} pushed, {} failed",
            report.sink, report.synced, report.failed
        );
    }
    if reports.is_empty() {
        println!("  Sync:   no sinks enabled");
    }

    Ok(())
}

fn print_report(report: &RunReport) {
    println!();
    println!("  Consolidation complete");
    println!("  Run:     {}", report.run_id);
    println!(
        "  Files:   {} processed, {} skipped",
        report.files_processed, report.files_skipped
    );
    println!(
        "  Rows:    {} normalized, {} without email",
        report.rows_normalized, report.rows_skipped
    );
    println!(
        "  Ledger:  {} -> {} records (+{})",
        report.records_before,
        report.records_after,
        report.records_added()
    );
    for (source_type, count) in &report.summary {
        println!("    {source_type}: {count}");
    }
    println!("  Time:    {:.1}s", report.elapsed.as_secs_f64());
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn file_processed(&self, file: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Normalizing [{current}/{total}] {file}"));
    }

    fn done(&self, _report: &RunReport) {
        self.spinner.finish_and_clear();
    }
}
