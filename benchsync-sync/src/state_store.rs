//! State store: persisted high-water mark and per-record payload digests.
//!
//! Persists a [`StateFile`] JSON document at `<home>/.benchsync/state.json`.
//! Writes use the same atomic `.tmp` + rename pattern as the config file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use benchsync_core::types::RecordId;

use crate::error::{io_err, SyncError};
use crate::report::RunReport;

/// On-disk state payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StateFile {
    /// Effective `last_update` for the next run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<FixedOffset>>,
    /// When the last recorded run started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<DateTime<Utc>>,
    /// Record id (decimal) → hex SHA-256 of the last pushed payload.
    #[serde(default)]
    pub digests: BTreeMap<String, String>,
}

impl StateFile {
    pub fn digest_for(&self, record_id: RecordId) -> Option<&str> {
        self.digests.get(&record_id.to_string()).map(String::as_str)
    }

    /// Fold a completed run in: new mark, run time, and pushed digests.
    pub fn record_run(&mut self, report: &RunReport, last_update: Option<DateTime<FixedOffset>>) {
        self.last_update = last_update;
        self.last_run = Some(report.started_at);
        for synced in &report.synced {
            self.digests
                .insert(synced.record_id.to_string(), synced.digest.clone());
        }
    }
}

/// `state.json` in the same directory as the config file at `config`.
pub fn state_path_beside(config: &Path) -> PathBuf {
    config
        .parent()
        .map(|dir| dir.join("state.json"))
        .unwrap_or_else(|| PathBuf::from("state.json"))
}

/// Load the state store. Returns an empty state if the file does not exist.
pub fn load_from(path: &Path) -> Result<StateFile, SyncError> {
    if !path.exists() {
        return Ok(StateFile::default());
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    serde_json::from_str(&contents).map_err(|source| SyncError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Save the state store atomically.
///
/// Writes to `<path>.tmp` then renames to `<path>`.
pub fn save_to(path: &Path, state: &StateFile) -> Result<(), SyncError> {
    let Some(dir) = path.parent() else {
        return Err(io_err(path, std::io::Error::other("invalid state store path")));
    };
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let json = serde_json::to_string_pretty(state).map_err(|source| SyncError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| io_err(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use benchsync_core::fields::FieldMap;
    use benchsync_core::types::ComplianceStatus;
    use tempfile::TempDir;

    use crate::report::SyncedRecord;

    #[test]
    fn empty_state_when_file_missing() {
        let tmp = TempDir::new().unwrap();
        let state = load_from(&tmp.path().join("state.json")).unwrap();
        assert_eq!(state, StateFile::default());
    }

    #[test]
    fn roundtrip_save_load_keeps_offset() {
        let tmp = TempDir::new().unwrap();
        let mut state = StateFile {
            last_update: Some(DateTime::parse_from_rfc3339("2023-05-01T08:00:00-06:00").unwrap()),
            last_run: Some(Utc::now()),
            digests: BTreeMap::new(),
        };
        state.digests.insert("17".into(), "cafebabe".into());

        let path = tmp.path().join(".benchsync").join("state.json");
        save_to(&path, &state).unwrap();
        let loaded = load_from(&path).unwrap();
        assert_eq!(loaded, state);
        assert_eq!(loaded.digest_for(RecordId(17)), Some("cafebabe"));

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("-06:00"));
    }

    #[test]
    fn tmp_file_cleaned_up_after_save() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("state.json");
        save_to(&path, &StateFile::default()).unwrap();
        let tmp_path = path.with_extension("json.tmp");
        assert!(!tmp_path.exists(), "tmp file should be removed after rename");
    }

    #[test]
    fn corrupt_state_reports_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = load_from(&path).unwrap_err();
        assert!(err.to_string().contains("state.json"), "got: {err}");
    }

    #[test]
    fn state_lives_beside_the_config() {
        assert_eq!(
            state_path_beside(Path::new("/home/u/.benchsync/config.yaml")),
            Path::new("/home/u/.benchsync/state.json")
        );
        assert_eq!(state_path_beside(Path::new("")), Path::new("state.json"));
    }

    #[test]
    fn record_run_merges_digests() {
        let mut state = StateFile::default();
        state.digests.insert("1".into(), "old".into());
        let mut report = RunReport::new(false, Utc::now());
        report.synced.push(SyncedRecord {
            record_id: RecordId(2),
            benchmark_id: "a01".into(),
            status: ComplianceStatus::Violation,
            updated_at: DateTime::parse_from_rfc3339("2023-05-01T08:00:00+00:00").unwrap(),
            digest: "new".into(),
            changed: true,
            fields: FieldMap::new(),
        });
        let mark = Some(DateTime::parse_from_rfc3339("2023-05-01T08:00:00+00:00").unwrap());
        state.record_run(&report, mark);
        assert_eq!(state.last_update, mark);
        assert_eq!(state.last_run, Some(report.started_at));
        assert_eq!(state.digest_for(RecordId(1)), Some("old"));
        assert_eq!(state.digest_for(RecordId(2)), Some("new"));
    }
}
