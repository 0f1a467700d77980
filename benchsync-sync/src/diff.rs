//! Payload diff support for `benchsync diff`.

use chrono::Utc;
use similar::TextDiff;

use benchsync_core::fields::FieldMap;
use benchsync_core::ports::{CrmClient, RegistryClient};
use benchsync_core::types::{ComplianceStatus, RecordId};
use benchsync_renderer::{MappingContext, MappingEngine};

use crate::classify::classify;
use crate::context::SyncContext;
use crate::error::SyncError;
use crate::pipeline::PENDING_ID;
use crate::resolver::Resolver;

/// What a push of one record would change on its CRM benchmark.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDiff {
    pub record_id: RecordId,
    pub benchmark_id: String,
    pub status: ComplianceStatus,
    /// `false` when the CRM has no benchmark with this record id.
    pub benchmark_found: bool,
    /// Empty when the CRM already holds the rendered values.
    pub unified_diff: String,
}

impl RecordDiff {
    pub fn is_empty(&self) -> bool {
        self.unified_diff.is_empty()
    }
}

/// Render what `sync` would push for `record_id` and compare it field by
/// field with the benchmark's current values. Nothing is created or pushed.
pub fn diff_record<R, C>(
    registry: &R,
    crm: &C,
    engine: &MappingEngine,
    ctx: &SyncContext,
    record_id: RecordId,
) -> Result<RecordDiff, SyncError>
where
    R: RegistryClient + ?Sized,
    C: CrmClient + ?Sized,
{
    let record = registry.get_property(&ctx.scope, record_id)?;
    let benchmark_id = record
        .external_id()
        .map(str::to_string)
        .ok_or(SyncError::MissingExternalId {
            record_id: record_id.0,
        })?;

    let classification = classify(
        &record.assigned_label_ids,
        &ctx.catalog,
        &ctx.violation_label,
        &ctx.complied_label,
    );

    let resolver = Resolver::new(crm, ctx.account_record_type.clone());
    let contact_id = resolver
        .lookup_contact(&record.contact_email)?
        .map_or_else(|| PENDING_ID.to_string(), |c| c.id.0);
    let admin_id = resolver
        .lookup_contact(&record.admin_email)?
        .map_or_else(|| PENDING_ID.to_string(), |c| c.id.0);

    let mapping = MappingContext::new(
        &record,
        contact_id,
        admin_id,
        &classification.label_names,
        classification.status_label(&ctx.violation_label, &ctx.complied_label),
        Utc::now(),
    );
    let rendered = engine.render_for_status(classification.status, &mapping)?;

    // Same record id `update_benchmark` PATCHes during sync.
    let current = crm.get_benchmark_by_id(&benchmark_id)?;
    let benchmark_found = current.is_some();
    let existing = current
        .map(|b| restrict_to(&b.fields, &rendered))
        .unwrap_or_default();

    let old_header = format!("a/{benchmark_id}");
    let new_header = format!("b/{benchmark_id}");
    let old_text = existing.to_lines();
    let new_text = rendered.to_lines();
    let unified_diff = if old_text == new_text {
        String::new()
    } else {
        TextDiff::from_lines(&old_text, &new_text)
            .unified_diff()
            .header(&old_header, &new_header)
            .context_radius(3)
            .to_string()
    };

    Ok(RecordDiff {
        record_id,
        benchmark_id,
        status: classification.status,
        benchmark_found,
        unified_diff,
    })
}

/// The subset of `current` that `rendered` would write.
fn restrict_to(current: &FieldMap, rendered: &FieldMap) -> FieldMap {
    current
        .iter()
        .filter(|(k, _)| rendered.contains(k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}
