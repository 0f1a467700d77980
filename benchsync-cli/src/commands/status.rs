//! `benchsync status`: configuration and sync-state visibility. Offline.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use benchsync_core::Config;
use benchsync_sync::{effective_last_update, state_store, StateFile};

use super::{load_config, Paths};

/// Arguments for `benchsync status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct StatusReport {
    config_path: String,
    state_path: String,
    registry_url: String,
    organization: String,
    cycle: String,
    crm_instance: String,
    crm_username: String,
    export_label: String,
    violation_label: String,
    complied_label: String,
    /// Mark the next `sync` would use without `--since`.
    last_update: Option<String>,
    last_update_source: &'static str,
    last_run: Option<String>,
    tracked_records: usize,
}

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "setting")]
    key: &'static str,
    #[tabled(rename = "value")]
    value: String,
}

impl StatusArgs {
    pub fn run(self, config_override: Option<&Path>) -> Result<()> {
        let paths = Paths::resolve(config_override)?;
        let cfg = load_config(&paths)?;
        let state = state_store::load_from(&paths.state)
            .with_context(|| format!("failed to read '{}'", paths.state.display()))?;

        let report = build_report(&cfg, &paths, &state)?;
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize status JSON")?
            );
            return Ok(());
        }

        print_table(report);
        Ok(())
    }
}

fn build_report(cfg: &Config, paths: &Paths, state: &StateFile) -> Result<StatusReport> {
    let configured = cfg.sync_state()?.last_update;
    let last_update = effective_last_update(None, state.last_update, configured);
    let last_update_source = match (state.last_update, configured) {
        (Some(_), _) => "state",
        (None, Some(_)) => "config",
        (None, None) => "unset",
    };

    Ok(StatusReport {
        config_path: paths.config.display().to_string(),
        state_path: paths.state.display().to_string(),
        registry_url: cfg.registry.url.clone(),
        organization: cfg.registry.organization.clone(),
        cycle: cfg.registry.cycle.clone(),
        crm_instance: cfg.crm.instance.clone(),
        crm_username: cfg.crm.username.clone(),
        export_label: cfg.labels.export.clone(),
        violation_label: cfg.labels.violation.clone(),
        complied_label: cfg.labels.complied.clone(),
        last_update: last_update.map(|t| t.to_rfc3339()),
        last_update_source,
        last_run: state.last_run.map(|t| t.to_rfc3339()),
        tracked_records: state.digests.len(),
    })
}

fn print_table(report: StatusReport) {
    println!(
        "benchsync v{} | {} / {}",
        env!("CARGO_PKG_VERSION"),
        report.organization.bold(),
        report.cycle.bold(),
    );

    let last_update = match report.last_update {
        Some(ts) => format!("{ts} (from {})", report.last_update_source),
        None => "never (every labelled record is due)".yellow().to_string(),
    };
    let rows = vec![
        StatusRow { key: "config", value: report.config_path },
        StatusRow { key: "state", value: report.state_path },
        StatusRow { key: "registry", value: report.registry_url },
        StatusRow { key: "salesforce", value: format!("{} as {}", report.crm_instance, report.crm_username) },
        StatusRow { key: "export label", value: report.export_label },
        StatusRow { key: "violation label", value: report.violation_label },
        StatusRow { key: "complied label", value: report.complied_label },
        StatusRow { key: "last update", value: last_update },
        StatusRow { key: "last run", value: report.last_run.unwrap_or_else(|| "never".to_string()) },
        StatusRow { key: "tracked records", value: report.tracked_records.to_string() },
    ];
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}
