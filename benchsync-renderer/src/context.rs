//! Mapping context: the serializable payload a mapping template renders from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use benchsync_core::types::Record;

use crate::error::RenderError;

/// Everything a mapping template may reference.
///
/// Templates see `contact_id`, `admin_contact_id`, the full `record`,
/// `labels` (comma-joined resolved label names), `status_label` (`null` when
/// the record has neither status label), `updated_on` and `meta`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingContext {
    /// CRM id of the primary contact.
    pub contact_id: String,
    /// CRM id of the data-administrator contact.
    pub admin_contact_id: String,
    pub record: Record,
    pub labels: String,
    pub status_label: Option<String>,
    /// `YYYY-MM-DD` of the record's last registry update, in its own offset.
    /// Stable across reruns, unlike `meta.synced_on`.
    pub updated_on: String,
    pub meta: MetaCtx,
}

/// Run metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaCtx {
    /// `YYYY-MM-DD` of the run, UTC.
    pub synced_on: String,
    pub benchsync_version: String,
}

impl MappingContext {
    /// Build a context for one record.
    pub fn new(
        record: &Record,
        contact_id: impl Into<String>,
        admin_contact_id: impl Into<String>,
        label_names: &[String],
        status_label: Option<&str>,
        synced_at: DateTime<Utc>,
    ) -> Self {
        MappingContext {
            contact_id: contact_id.into(),
            admin_contact_id: admin_contact_id.into(),
            record: record.clone(),
            labels: join_labels(label_names),
            status_label: status_label.map(str::to_string),
            updated_on: record.updated_at.format("%Y-%m-%d").to_string(),
            meta: MetaCtx {
                synced_on: synced_at.format("%Y-%m-%d").to_string(),
                benchsync_version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }

    /// Convert to a [`tera::Context`] for rendering.
    pub fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        tera::Context::from_serialize(self).map_err(|e| RenderError::Context {
            message: e.to_string(),
        })
    }
}

/// `", "`-joined label names, in the given order.
pub fn join_labels(label_names: &[String]) -> String {
    label_names.join(", ")
}
