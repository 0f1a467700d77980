//! `benchsync labels`

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use tabled::{settings::Style, Table, Tabled};

use benchsync_clients::SeedClient;
use benchsync_sync::{context::resolve_scope, labels::ensure_labels};

use super::{load_config, Paths};

/// Get or create the three workflow labels.
#[derive(Args, Debug)]
pub struct LabelsArgs {}

#[derive(Tabled)]
struct LabelRow {
    #[tabled(rename = "role")]
    role: &'static str,
    #[tabled(rename = "label")]
    name: String,
    #[tabled(rename = "id")]
    id: u64,
}

impl LabelsArgs {
    pub fn run(self, config_override: Option<&Path>) -> Result<()> {
        let paths = Paths::resolve(config_override)?;
        let cfg = load_config(&paths)?;
        let registry = SeedClient::new(&cfg.registry, cfg.timeout());

        let scope = resolve_scope(&registry, &cfg.registry.organization, &cfg.registry.cycle)
            .context("failed to resolve organization and cycle")?;
        let names = [
            cfg.labels.export.trim(),
            cfg.labels.violation.trim(),
            cfg.labels.complied.trim(),
        ];
        let labels = ensure_labels(&registry, &scope, &names, &cfg.labels.color)
            .context("failed to create labels")?;

        let rows: Vec<LabelRow> = ["export", "violation", "complied"]
            .into_iter()
            .zip(labels)
            .map(|(role, label)| LabelRow {
                role,
                name: label.name,
                id: label.id.0,
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("✓ Labels ready in '{}'", cfg.registry.organization);
        println!("{table}");
        Ok(())
    }
}
