//! Run report: what a sync run did to each candidate record.

use std::fmt;

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use benchsync_core::fields::FieldMap;
use benchsync_core::types::{ComplianceStatus, LabelId, RecordId};

use crate::clock::SyncClock;

/// Where a record's processing failed. Eligibility checks cannot fail; they
/// end in a [`SkipReason`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordPhase {
    Fetching,
    Resolving,
    Rendering,
    Pushing,
}

impl fmt::Display for RecordPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecordPhase::Fetching => "fetching",
            RecordPhase::Resolving => "resolving",
            RecordPhase::Rendering => "rendering",
            RecordPhase::Pushing => "pushing",
        };
        f.write_str(s)
    }
}

/// Why a record was not exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NotDue,
    MissingExternalId,
    Conflict,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::NotDue => "not due",
            SkipReason::MissingExternalId => "missing CRM benchmark id",
            SkipReason::Conflict => "conflicting compliance labels",
        };
        f.write_str(s)
    }
}

/// A record whose payload was pushed (or would have been, on a dry run).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncedRecord {
    pub record_id: RecordId,
    pub benchmark_id: String,
    pub status: ComplianceStatus,
    pub updated_at: DateTime<FixedOffset>,
    /// SHA-256 of the pushed payload.
    pub digest: String,
    /// `false` when the digest equals the one recorded for the last push.
    pub changed: bool,
    pub fields: FieldMap,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    pub record_id: RecordId,
    pub reason: SkipReason,
    pub updated_at: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedRecord {
    pub record_id: RecordId,
    pub phase: RecordPhase,
    pub message: String,
}

/// Integrity warning: label ids on a record that the catalog does not know.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelWarning {
    pub record_id: RecordId,
    pub unknown_label_ids: Vec<LabelId>,
}

impl fmt::Display for LabelWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<String> = self.unknown_label_ids.iter().map(ToString::to_string).collect();
        write!(
            f,
            "record {} carries unknown label ids: {}",
            self.record_id,
            ids.join(", ")
        )
    }
}

/// Outcome of one orchestrator run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub candidates: usize,
    pub synced: Vec<SyncedRecord>,
    pub skipped: Vec<SkippedRecord>,
    pub failed: Vec<FailedRecord>,
    pub warnings: Vec<LabelWarning>,
}

impl RunReport {
    pub fn new(dry_run: bool, started_at: DateTime<Utc>) -> Self {
        RunReport {
            dry_run,
            started_at,
            candidates: 0,
            synced: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// No record failed.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn skipped_for(&self, reason: SkipReason) -> impl Iterator<Item = &SkippedRecord> {
        self.skipped.iter().filter(move |s| s.reason == reason)
    }

    /// The high-water mark to persist after this run, starting from `clock`.
    /// Records skipped as conflicting or without a benchmark id hold it back.
    pub fn next_mark(&self, clock: &SyncClock) -> Option<DateTime<FixedOffset>> {
        clock.advanced(
            self.synced.iter().map(|s| s.updated_at),
            self.skipped
                .iter()
                .filter(|s| s.reason != SkipReason::NotDue)
                .map(|s| s.updated_at),
        )
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = if self.dry_run { "would push" } else { "pushed" };
        writeln!(
            f,
            "{} candidate(s): {} {verb}, {} skipped, {} failed, {} warning(s)",
            self.candidates,
            self.synced.len(),
            self.skipped.len(),
            self.failed.len(),
            self.warnings.len()
        )?;
        for s in &self.synced {
            let note = if s.changed { "" } else { " (unchanged)" };
            writeln!(
                f,
                "  {verb} {} -> {} [{}]{note}",
                s.record_id, s.benchmark_id, s.status
            )?;
        }
        for s in &self.skipped {
            writeln!(f, "  skipped {}: {}", s.record_id, s.reason)?;
        }
        for e in &self.failed {
            writeln!(f, "  failed {} while {}: {}", e.record_id, e.phase, e.message)?;
        }
        for w in &self.warnings {
            writeln!(f, "  warning: {w}")?;
        }
        Ok(())
    }
}

/// Hex SHA-256 of a payload's canonical JSON form.
pub fn payload_digest(fields: &FieldMap) -> String {
    let mut h = Sha256::new();
    h.update(fields.to_json().to_string().as_bytes());
    hex::encode(h.finalize())
}
