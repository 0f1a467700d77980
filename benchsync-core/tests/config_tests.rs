//! Config load error messages, init layout, and YAML round-trips.

use assert_fs::prelude::*;
use benchsync_core::{
    config::{self, Config},
    ComplianceStatus, ConfigError,
};
use predicates::prelude::predicate;
use rstest::rstest;
use std::fs;

const FULL_YAML: &str = r#"
registry:
  url: https://seed.example.org
  username: user@example.com
  api_key: abc123
  organization: nrel
  cycle: "2023"
crm:
  instance: https://example.my.salesforce.com
  username: sf@example.com
  password: secret
  security_token: tok
labels:
  export: Add to Salesforce
  violation: Violation
  complied: Complied
sync:
  last_update: "2023-01-01T00:00:00-07:00"
  account_record_type: 0125x000000AbCdAAK
"#;

fn write_config(home: &assert_fs::TempDir, yaml: &str) {
    home.child(".benchsync/config.yaml")
        .write_str(yaml)
        .expect("write config");
}

fn load_in(home: &assert_fs::TempDir) -> Result<Config, ConfigError> {
    config::load_from(&config::config_path_at(home.path()))
}

// ---------------------------------------------------------------------------
// 1. Load error messages
// ---------------------------------------------------------------------------

#[test]
fn load_missing_config_returns_not_found() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let err = load_in(&home).unwrap_err();
    assert!(matches!(err, ConfigError::ConfigNotFound { .. }), "got: {err}");
    assert!(err.to_string().contains("config.yaml"));
}

#[test]
fn load_corrupt_yaml_returns_parse_error_with_path() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    write_config(&home, ": : corrupt : yaml : !!!\n  - broken: [unclosed");

    let err = load_in(&home).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("config.yaml"));
}

#[test]
fn load_missing_section_returns_parse_error() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    write_config(&home, "registry:\n  url: https://seed.example.org\n");
    let err = load_in(&home).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
}

#[test]
fn load_blank_credentials_is_invalid() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    write_config(&home, &FULL_YAML.replace("password: secret", "password: \"\""));
    let err = load_in(&home).unwrap_err();
    assert!(
        matches!(err, ConfigError::Invalid { field: "crm.password", .. }),
        "got: {err}"
    );
}

#[test]
fn load_full_config_applies_defaults() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    write_config(&home, FULL_YAML);
    let cfg = load_in(&home).expect("load");
    assert_eq!(cfg.crm.api_version, "52.0");
    assert_eq!(cfg.crm.benchmark_object, "Benchmark__c");
    assert_eq!(cfg.sync.timeout_secs, 30);
    let state = cfg.sync_state().expect("state");
    assert_eq!(state.export_label, "Add to Salesforce");
    assert_eq!(
        state.crm_account_record_type.as_deref(),
        Some("0125x000000AbCdAAK")
    );
    assert_eq!(
        state.last_update.map(|t| t.to_rfc3339()),
        Some("2023-01-01T00:00:00-07:00".to_string())
    );
}

// ---------------------------------------------------------------------------
// 2. Init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_skeleton_under_dot_dir() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let path = config::config_path_at(home.path());
    assert!(config::init_to(&path, false).expect("init"));
    home.child(".benchsync/config.yaml")
        .assert(predicate::path::exists());
    assert!(!path.with_extension("yaml.tmp").exists(), ".tmp must be gone");

    // Skeleton parses but does not validate until credentials are filled in.
    let err = load_in(&home).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { .. }), "got: {err}");
}

#[test]
fn save_then_load_roundtrip() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let cfg: Config = serde_yaml::from_str(FULL_YAML).expect("parse");
    let path = config::config_path_at(home.path());
    config::save_to(&path, &cfg).expect("save");
    let loaded = config::load_from(&path).expect("load");
    assert_eq!(loaded, cfg);
    let raw = fs::read_to_string(&path).expect("read");
    assert!(raw.contains("account_record_type"));
}

// ---------------------------------------------------------------------------
// 3. Parameterised round-trips
// ---------------------------------------------------------------------------

#[rstest]
#[case(ComplianceStatus::Violation, "violation")]
#[case(ComplianceStatus::Complied, "complied")]
#[case(ComplianceStatus::Neither, "neither")]
#[case(ComplianceStatus::Conflict, "conflict")]
fn status_yaml_roundtrip(#[case] status: ComplianceStatus, #[case] expected: &str) {
    let yaml = serde_yaml::to_string(&status).expect("serialize");
    assert_eq!(yaml.trim(), expected);
    let back: ComplianceStatus = serde_yaml::from_str(&yaml).expect("deserialize");
    assert_eq!(back, status);
}

#[rstest]
#[case("2023-01-01T00:00:00")]
#[case("2023-01-01")]
#[case("2023-01-01 08:30:00")]
fn naive_last_update_fails_load(#[case] stamp: &str) {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let yaml = FULL_YAML.replace("2023-01-01T00:00:00-07:00", stamp);
    write_config(&home, &yaml);
    let err = load_in(&home).unwrap_err();
    assert!(
        err.to_string().contains("no timezone offset"),
        "[{stamp}] got: {err}"
    );
}
