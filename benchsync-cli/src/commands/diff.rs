//! `benchsync diff <record-id>`: show what sync would change on a benchmark.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use benchsync_core::types::RecordId;
use benchsync_sync::{diff_record, SyncContext};

use super::{connect, load_config, mapping_engine, Paths};

/// Arguments for `benchsync diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Registry record (property view) id.
    pub record_id: u64,
}

impl DiffArgs {
    pub fn run(self, config_override: Option<&Path>) -> Result<()> {
        let paths = Paths::resolve(config_override)?;
        let cfg = load_config(&paths)?;
        let (registry, crm) = connect(&cfg)?;
        let engine = mapping_engine(&cfg, &paths)?;

        let state = cfg.sync_state()?;
        let ctx = SyncContext::build(
            &registry,
            &cfg.registry.organization,
            &cfg.registry.cycle,
            &state,
        )
        .context("failed to prepare diff")?;

        let record_id = RecordId(self.record_id);
        let result = diff_record(&registry, &crm, &engine, &ctx, record_id)
            .with_context(|| format!("diff failed for record {record_id}"))?;

        if !result.benchmark_found {
            println!(
                "Benchmark '{}' not found in Salesforce; showing the full payload.",
                result.benchmark_id
            );
        }
        if result.is_empty() {
            println!(
                "No differences for record {} ({}).",
                result.record_id, result.benchmark_id
            );
            return Ok(());
        }

        print!("{}", result.unified_diff);
        if !result.unified_diff.ends_with('\n') {
            println!();
        }
        Ok(())
    }
}
