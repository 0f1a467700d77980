//! Label classifier: compliance status from a record's label set.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use benchsync_core::types::{ComplianceStatus, Label, LabelId};

/// Read-only `id → name` lookup over the run's label catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelCatalog {
    names: BTreeMap<LabelId, String>,
}

impl LabelCatalog {
    pub fn new(labels: &[Label]) -> Self {
        let names = labels.iter().map(|l| (l.id, l.name.clone())).collect();
        LabelCatalog { names }
    }

    pub fn name(&self, id: LabelId) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Result of [`classify`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub status: ComplianceStatus,
    /// Resolved names, in label-id order.
    pub label_names: Vec<String>,
    /// Assigned ids with no catalog entry.
    pub unresolved_ids: Vec<LabelId>,
}

impl Classification {
    /// Label name to render into the status field. `None` for `Neither`
    /// and `Conflict`.
    pub fn status_label<'a>(&self, violation_name: &'a str, complied_name: &'a str) -> Option<&'a str> {
        match self.status {
            ComplianceStatus::Violation => Some(violation_name),
            ComplianceStatus::Complied => Some(complied_name),
            ComplianceStatus::Neither | ComplianceStatus::Conflict => None,
        }
    }
}

/// Derive the compliance status of a label set.
///
/// Total and order-independent: ids are de-duplicated and walked in id order.
pub fn classify<'a, I>(
    assigned_label_ids: I,
    catalog: &LabelCatalog,
    violation_name: &str,
    complied_name: &str,
) -> Classification
where
    I: IntoIterator<Item = &'a LabelId>,
{
    let ids: BTreeSet<LabelId> = assigned_label_ids.into_iter().copied().collect();

    let mut label_names = Vec::with_capacity(ids.len());
    let mut unresolved_ids = Vec::new();
    for id in ids {
        match catalog.name(id) {
            Some(name) => label_names.push(name.to_string()),
            None => unresolved_ids.push(id),
        }
    }

    let violation = label_names.iter().any(|n| n == violation_name);
    let complied = label_names.iter().any(|n| n == complied_name);
    let status = match (violation, complied) {
        (true, true) => ComplianceStatus::Conflict,
        (true, false) => ComplianceStatus::Violation,
        (false, true) => ComplianceStatus::Complied,
        (false, false) => ComplianceStatus::Neither,
    };

    Classification {
        status,
        label_names,
        unresolved_ids,
    }
}
