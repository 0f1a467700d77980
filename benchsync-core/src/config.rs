//! YAML configuration file.
//!
//! # Storage layout
//!
//! ```text
//! ~/.benchsync/
//!   config.yaml   (connection settings + label names, mode 0600)
//!   state.json    (sync high-water mark, written by the CLI)
//! ```
//!
//! # API pattern
//!
//! Every function touching the home directory has two forms:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! Tests must NEVER call the no-arg wrappers; always use `_at`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::timestamp::parse_timestamp;
use crate::types::SyncState;

// ---------------------------------------------------------------------------
// 1. Shape
// ---------------------------------------------------------------------------

/// Root of `config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub registry: RegistryConfig,
    pub crm: CrmConfig,
    #[serde(default)]
    pub labels: LabelsConfig,
    #[serde(default)]
    pub sync: SyncSettings,
}

/// SEED connection and scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Base URL, e.g. `https://seed-platform.org`.
    pub url: String,
    pub username: String,
    pub api_key: String,
    /// Organization name to sync from.
    pub organization: String,
    /// Reporting cycle name to sync from.
    pub cycle: String,
}

/// Salesforce connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrmConfig {
    /// Instance URL, e.g. `https://example.my.salesforce.com`.
    pub instance: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub security_token: String,
    /// Login host; `https://test.salesforce.com` for sandboxes.
    #[serde(default = "default_login_url")]
    pub login_url: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_benchmark_object")]
    pub benchmark_object: String,
    /// Custom field used by `get_benchmark_by_custom_id`.
    #[serde(default = "default_benchmark_id_field")]
    pub benchmark_id_field: String,
}

/// Registry label names that drive the sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelsConfig {
    #[serde(default = "default_export_label")]
    pub export: String,
    #[serde(default = "default_violation_label")]
    pub violation: String,
    #[serde(default = "default_complied_label")]
    pub complied: String,
    /// Color used when `benchsync labels` has to create a label.
    #[serde(default = "default_label_color")]
    pub color: String,
}

impl Default for LabelsConfig {
    fn default() -> Self {
        Self {
            export: default_export_label(),
            violation: default_violation_label(),
            complied: default_complied_label(),
            color: default_label_color(),
        }
    }
}

/// Sync behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// RFC 3339 timestamp with offset; records updated at or before it are skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<String>,
    /// Record type id for Accounts created by the resolver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_record_type: Option<String>,
    /// Directory of `.tera` mapping templates overriding the built-in ones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_dir: Option<PathBuf>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            last_update: None,
            account_record_type: None,
            template_dir: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_login_url() -> String {
    "https://login.salesforce.com".to_string()
}
fn default_api_version() -> String {
    "52.0".to_string()
}
fn default_benchmark_object() -> String {
    "Benchmark__c".to_string()
}
fn default_benchmark_id_field() -> String {
    "Salesforce_Benchmark_ID__c".to_string()
}
fn default_export_label() -> String {
    "Add to Salesforce".to_string()
}
fn default_violation_label() -> String {
    "Violation".to_string()
}
fn default_complied_label() -> String {
    "Complied".to_string()
}
fn default_label_color() -> String {
    "green".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

impl Config {
    /// Skeleton written by `benchsync init`; credentials are left blank.
    pub fn skeleton() -> Self {
        Config {
            registry: RegistryConfig {
                url: "https://seed-platform.org".to_string(),
                username: String::new(),
                api_key: String::new(),
                organization: String::new(),
                cycle: String::new(),
            },
            crm: CrmConfig {
                instance: String::new(),
                username: String::new(),
                password: String::new(),
                security_token: String::new(),
                login_url: default_login_url(),
                api_version: default_api_version(),
                benchmark_object: default_benchmark_object(),
                benchmark_id_field: default_benchmark_id_field(),
            },
            labels: LabelsConfig::default(),
            sync: SyncSettings::default(),
        }
    }

    /// Semantic checks that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require("registry.url", &self.registry.url)?;
        require("registry.username", &self.registry.username)?;
        require("registry.api_key", &self.registry.api_key)?;
        require("registry.organization", &self.registry.organization)?;
        require("registry.cycle", &self.registry.cycle)?;
        require("crm.instance", &self.crm.instance)?;
        require("crm.username", &self.crm.username)?;
        require("crm.password", &self.crm.password)?;
        require("crm.api_version", &self.crm.api_version)?;
        require("labels.export", &self.labels.export)?;
        require("labels.violation", &self.labels.violation)?;
        require("labels.complied", &self.labels.complied)?;

        if self.labels.violation.trim() == self.labels.complied.trim() {
            return Err(ConfigError::Invalid {
                field: "labels.complied",
                reason: "must differ from labels.violation".to_string(),
            });
        }
        if self.sync.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "sync.timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        self.sync_state()?;
        Ok(())
    }

    /// Build the per-run [`SyncState`]; fails on naive or malformed timestamps.
    pub fn sync_state(&self) -> Result<SyncState, ConfigError> {
        let last_update = match self.sync.last_update.as_deref() {
            Some(raw) if !raw.trim().is_empty() => Some(
                parse_timestamp(raw).map_err(|source| ConfigError::Timestamp {
                    field: "sync.last_update",
                    source,
                })?,
            ),
            _ => None,
        };
        Ok(SyncState {
            last_update,
            export_label: self.labels.export.trim().to_string(),
            violation_label: self.labels.violation.trim().to_string(),
            complied_label: self.labels.complied.trim().to_string(),
            crm_account_record_type: self
                .sync
                .account_record_type
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.sync.timeout_secs)
    }
}

fn require(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid {
            field,
            reason: "must not be empty".to_string(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// 2. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.benchsync/config.yaml`: pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(".benchsync").join("config.yaml")
}

/// `config_path_at` convenience wrapper.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(config_path_at(&home()?))
}

// ---------------------------------------------------------------------------
// 3. Load
// ---------------------------------------------------------------------------

/// Load and validate the config file at `path`.
///
/// Returns `ConfigError::ConfigNotFound` if absent,
/// `ConfigError::Parse` (with path + line context) if malformed YAML,
/// `ConfigError::Invalid` / `ConfigError::Timestamp` if semantically wrong.
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path)?;
    let config: Config = serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    config.validate()?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// 4. Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically save `config` to `path`.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
/// The file holds credentials, so it is never world-readable.
pub fn save_to(path: &Path, config: &Config) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
            set_dir_permissions(dir)?;
        }
    }
    let tmp_path = path.with_extension("yaml.tmp");
    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp_path, yaml)?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// 5. Init
// ---------------------------------------------------------------------------

/// Write a skeleton config to `path`, creating its directory (mode `0700`).
///
/// Idempotent unless `force`: an existing file is left untouched. Returns
/// whether a new file was written.
pub fn init_to(path: &Path, force: bool) -> Result<bool, ConfigError> {
    if path.exists() && !force {
        return Ok(false);
    }
    save_to(path, &Config::skeleton())?;
    Ok(true)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

pub fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
