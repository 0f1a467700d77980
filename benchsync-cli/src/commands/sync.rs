//! `benchsync sync`: push due records to their CRM benchmarks.

use std::path::Path;
use std::thread::sleep;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use benchsync_clients::{SalesforceClient, SeedClient};
use benchsync_core::timestamp::parse_timestamp;
use benchsync_core::Config;
use benchsync_renderer::MappingEngine;
use benchsync_sync::{
    effective_last_update, run, state_store, RunOptions, RunReport, SyncContext,
};

use super::{connect, load_config, mapping_engine, Paths};

/// Arguments for `benchsync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Look up and render only; create and push nothing.
    #[arg(long)]
    pub dry_run: bool,

    /// Treat records updated after this instant as due (RFC 3339, offset required).
    /// Overrides both the state file and the config.
    #[arg(long, value_name = "TIMESTAMP")]
    pub since: Option<String>,

    /// Persist the new high-water mark after a run with no failures.
    #[arg(long, conflicts_with = "dry_run")]
    pub advance_clock: bool,

    /// Print the run report as JSON.
    #[arg(long)]
    pub json: bool,

    /// Repeat the run every SECS seconds until interrupted.
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub every: Option<u64>,
}

#[derive(Tabled)]
struct SyncedRow {
    #[tabled(rename = "record")]
    record: u64,
    #[tabled(rename = "benchmark")]
    benchmark: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "updated")]
    updated: String,
    #[tabled(rename = "payload")]
    payload: &'static str,
}

impl SyncArgs {
    pub fn run(self, config_override: Option<&Path>) -> Result<()> {
        let paths = Paths::resolve(config_override)?;
        let cfg = load_config(&paths)?;
        let since = self
            .since
            .as_deref()
            .map(parse_timestamp)
            .transpose()
            .context("invalid --since")?;

        let (registry, crm) = connect(&cfg)?;
        let engine = mapping_engine(&cfg, &paths)?;

        let Some(every) = self.every else {
            let report = self.run_once(&cfg, &paths, &registry, &crm, &engine, since)?;
            if !report.is_clean() {
                bail!("{} record(s) failed", report.failed.len());
            }
            return Ok(());
        };

        // An explicit --since only applies to the first pass; later passes
        // pick up the mark the previous pass persisted.
        let mut since = since;
        loop {
            match self.run_once(&cfg, &paths, &registry, &crm, &engine, since.take()) {
                Ok(report) if !report.is_clean() => {
                    tracing::warn!("{} record(s) failed", report.failed.len());
                }
                Ok(_) => {}
                Err(err) => tracing::error!("sync run failed: {err:#}"),
            }
            tracing::info!("next run in {every}s");
            sleep(Duration::from_secs(every));
        }
    }

    fn run_once(
        &self,
        cfg: &Config,
        paths: &Paths,
        registry: &SeedClient,
        crm: &SalesforceClient,
        engine: &MappingEngine,
        since: Option<chrono::DateTime<chrono::FixedOffset>>,
    ) -> Result<RunReport> {
        let previous = state_store::load_from(&paths.state)
            .with_context(|| format!("failed to read '{}'", paths.state.display()))?;

        let mut state = cfg.sync_state()?;
        state.last_update = effective_last_update(since, previous.last_update, state.last_update);

        let ctx = SyncContext::build(
            registry,
            &cfg.registry.organization,
            &cfg.registry.cycle,
            &state,
        )
        .context("failed to prepare sync run")?;

        let opts = RunOptions {
            dry_run: self.dry_run,
            now: Utc::now(),
            previous: Some(&previous),
        };
        let report = run(registry, crm, engine, &ctx, opts).context("sync run failed")?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize run report")?
            );
        } else {
            print_report(&report);
        }

        if self.advance_clock {
            if report.is_clean() {
                let mark = report.next_mark(&ctx.clock);
                let mut next = previous.clone();
                next.record_run(&report, mark);
                state_store::save_to(&paths.state, &next)
                    .with_context(|| format!("failed to write '{}'", paths.state.display()))?;
                if let Some(mark) = mark {
                    tracing::info!("high-water mark is now {}", mark.to_rfc3339());
                }
            } else {
                tracing::warn!("run had failures; high-water mark left unchanged");
            }
        }

        Ok(report)
    }
}

fn print_report(report: &RunReport) {
    let prefix = if report.dry_run { "[dry-run] " } else { "" };
    let verb = if report.dry_run { "would push" } else { "pushed" };

    let headline = format!(
        "{prefix}{} candidate(s): {} {verb}, {} skipped, {} failed",
        report.candidates,
        report.synced.len(),
        report.skipped.len(),
        report.failed.len(),
    );
    if report.is_clean() {
        println!("✓ {}", headline.green());
    } else {
        println!("✗ {}", headline.red());
    }

    if !report.synced.is_empty() {
        let rows: Vec<SyncedRow> = report
            .synced
            .iter()
            .map(|s| SyncedRow {
                record: s.record_id.0,
                benchmark: s.benchmark_id.clone(),
                status: s.status.to_string(),
                updated: s.updated_at.to_rfc3339(),
                payload: if s.changed { "changed" } else { "unchanged" },
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
    }

    for skipped in &report.skipped {
        println!("  {} {}: {}", "·".bright_black(), skipped.record_id, skipped.reason);
    }
    for failed in &report.failed {
        println!(
            "  {} {} while {}: {}",
            "✗".red(),
            failed.record_id,
            failed.phase,
            failed.message
        );
    }
    for warning in &report.warnings {
        println!("  {} {warning}", "!".yellow());
    }
}
