//! Immutable per-run context.

use benchsync_core::ports::RegistryClient;
use benchsync_core::types::{RecordId, RegistryScope, SyncState};

use crate::classify::LabelCatalog;
use crate::clock::SyncClock;
use crate::error::SyncError;

/// Everything a run decides once at startup. Built by [`SyncContext::build`]
/// and shared read-only by every per-record step.
#[derive(Debug, Clone)]
pub struct SyncContext {
    pub scope: RegistryScope,
    pub clock: SyncClock,
    pub catalog: LabelCatalog,
    pub export_label: String,
    pub violation_label: String,
    pub complied_label: String,
    pub account_record_type: Option<String>,
}

impl SyncContext {
    /// Resolve org and cycle by name and fetch the label catalog.
    ///
    /// Any failure here is fatal for the run.
    pub fn build<R: RegistryClient + ?Sized>(
        registry: &R,
        org_name: &str,
        cycle_name: &str,
        state: &SyncState,
    ) -> Result<Self, SyncError> {
        let scope = resolve_scope(registry, org_name, cycle_name)?;
        let labels = registry.get_labels(&scope)?;
        tracing::debug!("label catalog: {} entries", labels.len());

        Ok(SyncContext {
            scope,
            clock: SyncClock::new(state.last_update),
            catalog: LabelCatalog::new(&labels),
            export_label: state.export_label.clone(),
            violation_label: state.violation_label.clone(),
            complied_label: state.complied_label.clone(),
            account_record_type: state.crm_account_record_type.clone(),
        })
    }

    /// Record ids carrying the export label, de-duplicated, in registry order.
    pub fn export_candidates<R: RegistryClient + ?Sized>(
        &self,
        registry: &R,
    ) -> Result<Vec<RecordId>, SyncError> {
        let wanted = [self.export_label.clone()];
        let applications = registry.get_view_ids_with_label(&self.scope, &wanted)?;

        let mut ids: Vec<RecordId> = Vec::new();
        for app in applications.iter().filter(|a| a.name == self.export_label) {
            for id in &app.is_applied {
                if !ids.contains(id) {
                    ids.push(*id);
                }
            }
        }
        Ok(ids)
    }
}

/// Org and cycle ids for the configured names.
pub fn resolve_scope<R: RegistryClient + ?Sized>(
    registry: &R,
    org_name: &str,
    cycle_name: &str,
) -> Result<RegistryScope, SyncError> {
    let org_id = registry
        .get_org_by_name(org_name)?
        .ok_or_else(|| SyncError::OrgNotFound {
            name: org_name.to_string(),
        })?;
    let cycle_id = registry
        .get_cycle_by_name(org_id, cycle_name)?
        .ok_or_else(|| SyncError::CycleNotFound {
            name: cycle_name.to_string(),
        })?;
    Ok(RegistryScope { org_id, cycle_id })
}
