pub mod diff;
pub mod init;
pub mod labels;
pub mod status;
pub mod sync;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use benchsync_clients::{SalesforceClient, SeedClient};
use benchsync_core::{config, Config};
use benchsync_renderer::MappingEngine;
use benchsync_sync::state_store;

/// Where the config file and the state file live for this invocation.
#[derive(Debug, Clone)]
pub struct Paths {
    pub config: PathBuf,
    pub state: PathBuf,
}

impl Paths {
    /// `--config` if given, else `~/.benchsync/config.yaml`. The state file
    /// always sits next to the config file.
    pub fn resolve(config_override: Option<&Path>) -> Result<Self> {
        let config = match config_override {
            Some(path) => path.to_path_buf(),
            None => config::config_path().context("could not determine home directory")?,
        };
        let state = state_store::state_path_beside(&config);
        Ok(Paths { config, state })
    }
}

pub fn load_config(paths: &Paths) -> Result<Config> {
    config::load_from(&paths.config)
        .with_context(|| format!("failed to load config '{}'", paths.config.display()))
}

/// Build the registry client and log in to the CRM.
pub fn connect(cfg: &Config) -> Result<(SeedClient, SalesforceClient)> {
    let timeout = cfg.timeout();
    let registry = SeedClient::new(&cfg.registry, timeout);
    let crm = SalesforceClient::login(&cfg.crm, timeout)
        .with_context(|| format!("Salesforce login failed for '{}'", cfg.crm.username))?;
    tracing::info!("logged in to {}", crm.session().instance_url);
    Ok((registry, crm))
}

/// Mapping engine with the configured template overrides. A relative
/// `sync.template_dir` is taken relative to the config file.
pub fn mapping_engine(cfg: &Config, paths: &Paths) -> Result<MappingEngine> {
    let dir = cfg.sync.template_dir.as_ref().map(|dir| {
        if dir.is_relative() {
            paths
                .config
                .parent()
                .map(|base| base.join(dir))
                .unwrap_or_else(|| dir.clone())
        } else {
            dir.clone()
        }
    });
    MappingEngine::new(dir.as_deref()).context("failed to load mapping templates")
}
