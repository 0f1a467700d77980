//! `benchsync init`

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use benchsync_core::config;

use super::Paths;

/// Write a skeleton config file.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Replace an existing config file with a fresh skeleton.
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    pub fn run(self, config_override: Option<&Path>) -> Result<()> {
        let paths = Paths::resolve(config_override)?;

        let written = config::init_to(&paths.config, self.force)
            .with_context(|| format!("failed to write '{}'", paths.config.display()))?;
        if !written {
            println!("✓ Config already exists at {}", paths.config.display());
            println!("  Use --force to overwrite it with a fresh skeleton.");
            return Ok(());
        }

        println!("✓ Wrote skeleton config to {}", paths.config.display());
        println!("  Fill in the registry and crm credentials, then run `benchsync labels`.");
        Ok(())
    }
}
