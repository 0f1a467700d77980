//! Domain types shared by every benchsync crate.
//!
//! Registry-side identifiers are integers, CRM-side identifiers are opaque
//! strings. All timestamps are offset-aware (`DateTime<FixedOffset>`); a
//! naive timestamp cannot be represented here and is rejected at the parse
//! boundary (see [`crate::timestamp`]).

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::fields::FieldMap;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Registry label identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LabelId(pub u64);

impl fmt::Display for LabelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u64> for LabelId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Registry property view identifier (the unit of export).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u64> for RecordId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Registry organization identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrgId(pub u64);

impl fmt::Display for OrgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Registry reporting-cycle identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CycleId(pub u64);

impl fmt::Display for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque CRM-assigned record id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CrmId(pub String);

impl CrmId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for CrmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for CrmId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CrmId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Registry side
// ---------------------------------------------------------------------------

/// A registry label. Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: LabelId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub show_in_list: bool,
}

/// Which records carry a given label, as reported by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelApplication {
    pub name: String,
    #[serde(default)]
    pub is_applied: Vec<RecordId>,
}

/// Explicit org/cycle selection passed to every registry call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryScope {
    pub org_id: OrgId,
    pub cycle_id: CycleId,
}

/// Postal address of a property.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub line1: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
}

/// A registry property record as seen by the sync engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub record_id: RecordId,
    pub property_name: String,
    pub updated_at: DateTime<FixedOffset>,
    #[serde(default)]
    pub assigned_label_ids: BTreeSet<LabelId>,
    #[serde(default)]
    pub address: Address,
    pub contact_email: String,
    pub contact_name: String,
    pub organization_name: String,
    pub admin_email: String,
    pub admin_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_crm_id: Option<String>,
}

impl Record {
    /// The CRM benchmark id to update, if one is populated.
    pub fn external_id(&self) -> Option<&str> {
        self.external_crm_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// Derived compliance classification of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplianceStatus {
    Violation,
    Complied,
    Neither,
    /// Both exclusive labels present; export is blocked.
    Conflict,
}

impl fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComplianceStatus::Violation => write!(f, "violation"),
            ComplianceStatus::Complied => write!(f, "complied"),
            ComplianceStatus::Neither => write!(f, "neither"),
            ComplianceStatus::Conflict => write!(f, "conflict"),
        }
    }
}

// ---------------------------------------------------------------------------
// CRM side
// ---------------------------------------------------------------------------

/// CRM Account (organization).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: CrmId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_type_id: Option<String>,
}

/// CRM Contact. `email` is the unique identity key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: CrmId,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<CrmId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

/// CRM benchmark entry a record is pushed into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Benchmark {
    pub id: CrmId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_id: Option<String>,
    #[serde(default)]
    pub fields: FieldMap,
}

// ---------------------------------------------------------------------------
// Run configuration
// ---------------------------------------------------------------------------

/// Sync settings derived from configuration once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncState {
    pub last_update: Option<DateTime<FixedOffset>>,
    pub export_label: String,
    pub violation_label: String,
    pub complied_label: String,
    pub crm_account_record_type: Option<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
