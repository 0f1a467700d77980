//! benchsync: push SEED benchmarking records to Salesforce.
//!
//! # Usage
//!
//! ```text
//! benchsync init
//! benchsync labels
//! benchsync sync [--dry-run] [--since <TIMESTAMP>] [--advance-clock] [--json] [--every <SECS>]
//! benchsync diff <record-id>
//! benchsync status [--json]
//! ```
//!
//! Every subcommand accepts `--config <PATH>` to use a file other than
//! `~/.benchsync/config.yaml`.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    diff::DiffArgs, init::InitArgs, labels::LabelsArgs, status::StatusArgs, sync::SyncArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "benchsync",
    version,
    about = "Sync building benchmarking records from a SEED registry into Salesforce",
    long_about = None,
)]
struct Cli {
    /// Config file to use instead of ~/.benchsync/config.yaml.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a skeleton config file.
    Init(InitArgs),

    /// Create the export, violation and complied labels in the registry.
    Labels(LabelsArgs),

    /// Push every due, export-labelled record to its CRM benchmark.
    Sync(SyncArgs),

    /// Show a unified diff of what sync would push for one record.
    Diff(DiffArgs),

    /// Show the effective configuration and the persisted sync state.
    Status(StatusArgs),
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Logs go to stderr so `--json` output stays parseable. `RUST_LOG` overrides
/// the default `info` level; library `log` records are bridged in.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = cli.config;
    match cli.command {
        Commands::Init(args) => args.run(config.as_deref()),
        Commands::Labels(args) => args.run(config.as_deref()),
        Commands::Sync(args) => args.run(config.as_deref()),
        Commands::Diff(args) => args.run(config.as_deref()),
        Commands::Status(args) => args.run(config.as_deref()),
    }
}
