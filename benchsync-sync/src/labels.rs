//! Label bootstrap for `benchsync labels`.

use benchsync_core::ports::RegistryClient;
use benchsync_core::types::{Label, RegistryScope};

use crate::error::SyncError;

/// Get or create the export, violation and complied labels, in that order.
pub fn ensure_labels<R: RegistryClient + ?Sized>(
    registry: &R,
    scope: &RegistryScope,
    names: &[&str],
    color: &str,
) -> Result<Vec<Label>, SyncError> {
    let mut labels = Vec::with_capacity(names.len());
    for name in names {
        let label = registry.get_or_create_label(scope, name, color, true)?;
        tracing::info!("label '{}' has id {}", label.name, label.id);
        labels.push(label);
    }
    Ok(labels)
}
