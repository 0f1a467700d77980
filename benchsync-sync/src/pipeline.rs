//! Sync orchestrator: the per-record export pipeline.
//!
//! For each candidate record: fetch, clock check, external id check,
//! classify, resolve contacts, render, push. A failure in any step fails
//! that record only; the batch always runs to completion.

use chrono::{DateTime, FixedOffset, Utc};

use benchsync_core::ports::{CrmClient, RegistryClient};
use benchsync_core::types::{ComplianceStatus, Contact, CrmId, Record, RecordId};
use benchsync_renderer::{MappingContext, MappingEngine};

use crate::classify::classify;
use crate::context::SyncContext;
use crate::error::{ResolveError, SyncError};
use crate::report::{
    payload_digest, FailedRecord, LabelWarning, RecordPhase, RunReport, SkipReason,
    SkippedRecord, SyncedRecord,
};
use crate::resolver::Resolver;
use crate::state_store::StateFile;

/// Placeholder contact id rendered on dry runs when no CRM contact exists yet.
pub const PENDING_ID: &str = "pending";

/// Per-run knobs.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions<'a> {
    /// Look up only; create and push nothing.
    pub dry_run: bool,
    /// Run start; stamped into rendered payloads.
    pub now: DateTime<Utc>,
    /// Previous state, used to flag unchanged payloads.
    pub previous: Option<&'a StateFile>,
}

impl<'a> RunOptions<'a> {
    pub fn new(dry_run: bool) -> Self {
        RunOptions {
            dry_run,
            now: Utc::now(),
            previous: None,
        }
    }
}

enum Outcome {
    Synced(SyncedRecord),
    Skipped(SkipReason, DateTime<FixedOffset>),
}

struct Failure {
    phase: RecordPhase,
    message: String,
}

impl Failure {
    fn new(phase: RecordPhase, err: impl std::fmt::Display) -> Self {
        Failure {
            phase,
            message: err.to_string(),
        }
    }
}

/// Run one sync pass over every record carrying the export label.
///
/// Only a failure to list candidates is returned as an error; everything
/// after that is reported per record.
pub fn run<R, C>(
    registry: &R,
    crm: &C,
    engine: &MappingEngine,
    ctx: &SyncContext,
    opts: RunOptions<'_>,
) -> Result<RunReport, SyncError>
where
    R: RegistryClient + ?Sized,
    C: CrmClient + ?Sized,
{
    let mut report = RunReport::new(opts.dry_run, opts.now);
    let candidates = ctx.export_candidates(registry)?;
    report.candidates = candidates.len();
    tracing::info!(
        "{} record(s) carry '{}'{}",
        candidates.len(),
        ctx.export_label,
        if opts.dry_run { " [dry-run]" } else { "" }
    );

    let resolver = Resolver::new(crm, ctx.account_record_type.clone());
    for record_id in candidates {
        match process_record(registry, crm, &resolver, engine, ctx, &opts, record_id, &mut report) {
            Ok(Outcome::Synced(synced)) => {
                tracing::info!(
                    "{} record {record_id} -> {}",
                    if opts.dry_run { "would push" } else { "pushed" },
                    synced.benchmark_id
                );
                report.synced.push(synced);
            }
            Ok(Outcome::Skipped(reason, updated_at)) => {
                tracing::info!("skipped record {record_id}: {reason}");
                report.skipped.push(SkippedRecord {
                    record_id,
                    reason,
                    updated_at,
                });
            }
            Err(failure) => {
                tracing::warn!(
                    "record {record_id} failed while {}: {}",
                    failure.phase,
                    failure.message
                );
                report.failed.push(FailedRecord {
                    record_id,
                    phase: failure.phase,
                    message: failure.message,
                });
            }
        }
    }
    Ok(report)
}

#[allow(clippy::too_many_arguments)]
fn process_record<R, C>(
    registry: &R,
    crm: &C,
    resolver: &Resolver<'_, C>,
    engine: &MappingEngine,
    ctx: &SyncContext,
    opts: &RunOptions<'_>,
    record_id: RecordId,
    report: &mut RunReport,
) -> Result<Outcome, Failure>
where
    R: RegistryClient + ?Sized,
    C: CrmClient + ?Sized,
{
    let record = registry
        .get_property(&ctx.scope, record_id)
        .map_err(|e| Failure::new(RecordPhase::Fetching, e))?;

    // Evaluating
    if !ctx.clock.is_due(record.updated_at) {
        return Ok(Outcome::Skipped(SkipReason::NotDue, record.updated_at));
    }
    let Some(benchmark_id) = record.external_id().map(str::to_string) else {
        return Ok(Outcome::Skipped(SkipReason::MissingExternalId, record.updated_at));
    };

    let classification = classify(
        &record.assigned_label_ids,
        &ctx.catalog,
        &ctx.violation_label,
        &ctx.complied_label,
    );
    if !classification.unresolved_ids.is_empty() {
        let warning = LabelWarning {
            record_id,
            unknown_label_ids: classification.unresolved_ids.clone(),
        };
        tracing::warn!("{warning}");
        report.warnings.push(warning);
    }
    if classification.status == ComplianceStatus::Conflict {
        return Ok(Outcome::Skipped(SkipReason::Conflict, record.updated_at));
    }

    // Resolving
    let (contact_id, admin_id) = resolve_contacts(resolver, &record, opts.dry_run)
        .map_err(|e| Failure::new(RecordPhase::Resolving, e))?;

    // Rendering
    let status_label =
        classification.status_label(&ctx.violation_label, &ctx.complied_label);
    let mapping = MappingContext::new(
        &record,
        contact_id.as_str(),
        admin_id.as_str(),
        &classification.label_names,
        status_label,
        opts.now,
    );
    let fields = engine
        .render_for_status(classification.status, &mapping)
        .map_err(|e| Failure::new(RecordPhase::Rendering, e))?;

    // Pushing
    if !opts.dry_run {
        crm.update_benchmark(&benchmark_id, &fields)
            .map_err(|e| Failure::new(RecordPhase::Pushing, e))?;
    }

    let digest = payload_digest(&fields);
    let changed = opts
        .previous
        .and_then(|state| state.digest_for(record_id))
        .map_or(true, |prev| prev != digest);

    Ok(Outcome::Synced(SyncedRecord {
        record_id,
        benchmark_id,
        status: classification.status,
        updated_at: record.updated_at,
        digest,
        changed,
        fields,
    }))
}

/// Primary and admin contact ids. Dry runs look up only and fall back to
/// [`PENDING_ID`].
fn resolve_contacts<C: CrmClient + ?Sized>(
    resolver: &Resolver<'_, C>,
    record: &Record,
    dry_run: bool,
) -> Result<(CrmId, CrmId), ResolveError> {
    let account = &record.organization_name;
    if dry_run {
        let primary = pending_or(resolver.lookup_contact(&record.contact_email)?);
        let admin = pending_or(resolver.lookup_contact(&record.admin_email)?);
        return Ok((primary, admin));
    }
    let primary = resolver.resolve_contact(&record.contact_name, &record.contact_email, account)?;
    let admin = resolver.resolve_contact(&record.admin_name, &record.admin_email, account)?;
    Ok((primary.id, admin.id))
}

fn pending_or(contact: Option<Contact>) -> CrmId {
    contact.map_or_else(|| CrmId::from(PENDING_ID), |c| c.id)
}
