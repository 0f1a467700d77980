//! Offline CLI behaviour: everything here runs without a registry or CRM.

use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

fn benchsync_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("benchsync"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env_remove("RUST_LOG");
    cmd
}

fn write_config(path: &Path, last_update: Option<&str>) {
    let mut yaml = String::from(
        "registry:
  url: http://127.0.0.1:9
  username: seed@example.com
  api_key: abc123
  organization: nrel
  cycle: '2023'
crm:
  instance: https://example.my.salesforce.com
  username: sf@example.com
  password: hunter2
labels:
  export: Add to Salesforce
  violation: Violation
  complied: Complied
",
    );
    if let Some(ts) = last_update {
        yaml.push_str(&format!("sync:\n  last_update: '{ts}'\n"));
    }
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(path, yaml).expect("write config");
}

#[test]
fn help_lists_subcommands() {
    let home = TempDir::new().expect("home");
    benchsync_cmd(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("init"))
        .stdout(contains("labels"))
        .stdout(contains("sync"))
        .stdout(contains("diff"))
        .stdout(contains("status"));
}

#[test]
fn init_writes_skeleton_once() {
    let home = TempDir::new().expect("home");
    let config = home.path().join(".benchsync").join("config.yaml");

    benchsync_cmd(home.path())
        .arg("init")
        .assert()
        .success()
        .stdout(contains("Wrote skeleton config"));
    let first = fs::read_to_string(&config).expect("config written");
    assert!(first.contains("registry:"));
    assert!(first.contains("Add to Salesforce"));

    fs::write(&config, "registry: {}\n").expect("edit");
    benchsync_cmd(home.path())
        .arg("init")
        .assert()
        .success()
        .stdout(contains("already exists"));
    assert_eq!(fs::read_to_string(&config).expect("read"), "registry: {}\n");
}

#[test]
fn init_force_replaces_existing_file() {
    let home = TempDir::new().expect("home");
    let config = home.path().join("custom").join("bs.yaml");
    fs::create_dir_all(config.parent().expect("parent")).expect("mkdir");
    fs::write(&config, "garbage\n").expect("seed");

    benchsync_cmd(home.path())
        .args(["--config", config.to_str().expect("utf8"), "init", "--force"])
        .assert()
        .success();
    assert!(fs::read_to_string(&config).expect("read").contains("crm:"));
}

#[cfg(unix)]
#[test]
fn init_config_is_private() {
    use std::os::unix::fs::PermissionsExt;

    let home = TempDir::new().expect("home");
    benchsync_cmd(home.path()).arg("init").assert().success();
    let meta = fs::metadata(home.path().join(".benchsync").join("config.yaml")).expect("meta");
    assert_eq!(meta.permissions().mode() & 0o777, 0o600);
}

#[test]
fn missing_config_points_at_init() {
    let home = TempDir::new().expect("home");
    benchsync_cmd(home.path())
        .arg("status")
        .assert()
        .failure()
        .stderr(contains("benchsync init"));
    benchsync_cmd(home.path())
        .args(["sync", "--dry-run"])
        .assert()
        .failure()
        .stderr(contains("benchsync init"));
}

#[test]
fn skeleton_config_is_rejected_until_filled_in() {
    let home = TempDir::new().expect("home");
    benchsync_cmd(home.path()).arg("init").assert().success();
    benchsync_cmd(home.path())
        .arg("status")
        .assert()
        .failure()
        .stderr(contains("registry.username"));
}

#[test]
fn status_prefers_state_over_config() {
    let home = TempDir::new().expect("home");
    let dir = home.path().join(".benchsync");
    write_config(&dir.join("config.yaml"), Some("2023-01-01T00:00:00Z"));
    fs::write(
        dir.join("state.json"),
        r#"{"last_update":"2023-05-01T10:00:00-06:00","last_run":"2023-05-02T00:00:00Z","digests":{"11":"ab"}}"#,
    )
    .expect("state");

    let assert = benchsync_cmd(home.path())
        .args(["status", "--json"])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("status json");

    assert_eq!(json["last_update"], "2023-05-01T10:00:00-06:00");
    assert_eq!(json["last_update_source"], "state");
    assert_eq!(json["tracked_records"], 1);
    assert_eq!(json["organization"], "nrel");
}

#[test]
fn status_falls_back_to_configured_mark() {
    let home = TempDir::new().expect("home");
    let config = home.path().join("elsewhere").join("config.yaml");
    write_config(&config, Some("2023-01-01T00:00:00+02:00"));

    benchsync_cmd(home.path())
        .args(["--config", config.to_str().expect("utf8"), "status"])
        .assert()
        .success()
        .stdout(contains("2023-01-01T00:00:00+02:00 (from config)"))
        .stdout(contains("nrel"));
}

#[test]
fn naive_config_timestamp_is_rejected() {
    let home = TempDir::new().expect("home");
    write_config(
        &home.path().join(".benchsync").join("config.yaml"),
        Some("2023-01-01 00:00:00"),
    );
    benchsync_cmd(home.path())
        .arg("status")
        .assert()
        .failure()
        .stderr(contains("sync.last_update"));
}

#[test]
fn naive_since_is_rejected_before_connecting() {
    let home = TempDir::new().expect("home");
    write_config(&home.path().join(".benchsync").join("config.yaml"), None);
    benchsync_cmd(home.path())
        .args(["sync", "--dry-run", "--since", "2023-05-01T10:00:00"])
        .assert()
        .failure()
        .stderr(contains("invalid --since"));
}

#[test]
fn dry_run_cannot_advance_the_clock() {
    let home = TempDir::new().expect("home");
    benchsync_cmd(home.path())
        .args(["sync", "--dry-run", "--advance-clock"])
        .assert()
        .failure()
        .stderr(contains("cannot be used with"));
}
