//! SEED registry client over the v3 REST API.
//!
//! Authentication is HTTP Basic with the account's API key in place of the
//! password. Every call is scoped with `organization_id` (and `cycle_id`
//! where the endpoint is cycle-aware) taken from an explicit
//! [`RegistryScope`].
//!
//! # Property field mapping
//!
//! | Record field       | SEED property state key                   |
//! |--------------------|-------------------------------------------|
//! | `property_name`    | `property_name`                           |
//! | `address.*`        | `address_line_1`, `city`, `state`, `postal_code` |
//! | `contact_name`     | `owner`                                   |
//! | `contact_email`    | `owner_email`                             |
//! | `organization_name`| `extra_data.Organization`, else `owner`   |
//! | `admin_name`       | `extra_data.Data Administrator`           |
//! | `admin_email`      | `extra_data.Data Administrator Email`     |
//! | `external_crm_id`  | `extra_data.Salesforce Benchmark ID`      |
//! | `updated_at`       | view `updated` (offset required)          |

use std::collections::BTreeSet;
use std::time::Duration;

use base64::Engine;
use serde_json::{json, Value};

use benchsync_core::config::RegistryConfig;
use benchsync_core::error::{RemoteError, Service};
use benchsync_core::ports::RegistryClient;
use benchsync_core::timestamp::parse_timestamp;
use benchsync_core::types::{
    Address, CycleId, Label, LabelApplication, LabelId, OrgId, Record, RecordId, RegistryScope,
};

use crate::http::{self, str_field, u64_field};

const SVC: Service = Service::Registry;

/// Blocking SEED client.
pub struct SeedClient {
    agent: ureq::Agent,
    base_url: String,
    authorization: String,
}

impl SeedClient {
    pub fn new(config: &RegistryConfig, timeout: Duration) -> Self {
        SeedClient {
            agent: http::agent(timeout),
            base_url: config.url.trim_end_matches('/').to_string(),
            authorization: basic_auth(&config.username, &config.api_key),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v3/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value, RemoteError> {
        let mut request = self
            .agent
            .get(&self.url(path))
            .set("Authorization", &self.authorization)
            .set("Accept", "application/json");
        for (key, value) in query {
            request = request.query(key, value);
        }
        http::send(SVC, request, None)
    }

    fn post(&self, path: &str, query: &[(&str, String)], body: &Value) -> Result<Value, RemoteError> {
        let mut request = self
            .agent
            .post(&self.url(path))
            .set("Authorization", &self.authorization)
            .set("Accept", "application/json");
        for (key, value) in query {
            request = request.query(key, value);
        }
        http::send(SVC, request, Some(body))
    }
}

/// `Basic base64(username:api_key)`.
pub fn basic_auth(username: &str, api_key: &str) -> String {
    let token = base64::engine::general_purpose::STANDARD.encode(format!("{username}:{api_key}"));
    format!("Basic {token}")
}

fn org_query(scope: &RegistryScope) -> Vec<(&'static str, String)> {
    vec![("organization_id", scope.org_id.to_string())]
}

fn scoped_query(scope: &RegistryScope) -> Vec<(&'static str, String)> {
    vec![
        ("organization_id", scope.org_id.to_string()),
        ("cycle_id", scope.cycle_id.to_string()),
    ]
}

impl RegistryClient for SeedClient {
    fn get_org_by_name(&self, name: &str) -> Result<Option<OrgId>, RemoteError> {
        let body = self.get("organizations/", &[("brief", "true".to_string())])?;
        find_id_by_name(&body, "organizations", name).map(|id| id.map(OrgId))
    }

    fn get_cycle_by_name(&self, org: OrgId, name: &str) -> Result<Option<CycleId>, RemoteError> {
        let body = self.get("cycles/", &[("organization_id", org.to_string())])?;
        find_id_by_name(&body, "cycles", name).map(|id| id.map(CycleId))
    }

    fn get_labels(&self, scope: &RegistryScope) -> Result<Vec<Label>, RemoteError> {
        let body = self.get("labels/", &org_query(scope))?;
        let items = list_payload(&body, "data")?;
        items.iter().map(parse_label).collect()
    }

    fn get_view_ids_with_label(
        &self,
        scope: &RegistryScope,
        label_names: &[String],
    ) -> Result<Vec<LabelApplication>, RemoteError> {
        let body = self.post(
            "properties/labels/",
            &scoped_query(scope),
            &json!({ "selected": [], "label_names": label_names }),
        )?;
        let items = list_payload(&body, "data")?;
        items.iter().map(parse_label_application).collect()
    }

    fn get_property(&self, scope: &RegistryScope, id: RecordId) -> Result<Record, RemoteError> {
        let body = self.get(&format!("properties/{id}/"), &org_query(scope))?;
        parse_record(id, &body)
    }

    fn get_or_create_label(
        &self,
        scope: &RegistryScope,
        name: &str,
        color: &str,
        show_in_list: bool,
    ) -> Result<Label, RemoteError> {
        if let Some(existing) = self.get_labels(scope)?.into_iter().find(|l| l.name == name) {
            return Ok(existing);
        }
        let body = self.post(
            "labels/",
            &org_query(scope),
            &json!({ "name": name, "color": color, "show_in_list": show_in_list }),
        )?;
        let label = parse_label(&body)?;
        tracing::info!("created registry label '{name}' ({})", label.id);
        Ok(label)
    }
}

// ---------------------------------------------------------------------------
// Response decoding
// ---------------------------------------------------------------------------

/// Either a bare array or an object wrapping one under `key`.
fn list_payload<'a>(body: &'a Value, key: &str) -> Result<&'a Vec<Value>, RemoteError> {
    body.as_array()
        .or_else(|| body.get(key).and_then(Value::as_array))
        .ok_or_else(|| RemoteError::Decode {
            service: SVC,
            message: format!("expected a list (or `{key}` list)"),
        })
}

fn find_id_by_name(body: &Value, key: &str, name: &str) -> Result<Option<u64>, RemoteError> {
    let items = list_payload(body, key)?;
    for item in items {
        if item.get("name").and_then(Value::as_str) == Some(name) {
            return u64_field(SVC, item, "id").map(Some);
        }
    }
    Ok(None)
}

fn parse_label(value: &Value) -> Result<Label, RemoteError> {
    Ok(Label {
        id: LabelId(u64_field(SVC, value, "id")?),
        name: str_field(SVC, value, "name")?.to_string(),
        color: value.get("color").and_then(Value::as_str).map(str::to_string),
        show_in_list: value
            .get("show_in_list")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    })
}

fn parse_label_application(value: &Value) -> Result<LabelApplication, RemoteError> {
    let is_applied = value
        .get("is_applied")
        .and_then(Value::as_array)
        .map(|ids| ids.iter().filter_map(Value::as_u64).map(RecordId).collect())
        .unwrap_or_default();
    Ok(LabelApplication {
        name: str_field(SVC, value, "name")?.to_string(),
        is_applied,
    })
}

fn text(state: &Value, key: &str) -> String {
    state
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default()
        .to_string()
}

fn extra(state: &Value, key: &str) -> Option<String> {
    let value = state.get("extra_data")?.get(key)?;
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    Some(s).filter(|s| !s.is_empty())
}

/// Decode a property view detail response into a [`Record`].
pub(crate) fn parse_record(id: RecordId, body: &Value) -> Result<Record, RemoteError> {
    let state = body.get("state").ok_or_else(|| RemoteError::Decode {
        service: SVC,
        message: format!("property {id} has no `state`"),
    })?;

    let updated = body
        .get("updated")
        .or_else(|| state.get("updated"))
        .and_then(Value::as_str)
        .ok_or_else(|| RemoteError::Decode {
            service: SVC,
            message: format!("property {id} has no `updated` timestamp"),
        })?;
    let updated_at = parse_timestamp(updated).map_err(|e| RemoteError::Decode {
        service: SVC,
        message: format!("property {id}: {e}"),
    })?;

    let assigned_label_ids: BTreeSet<LabelId> = body
        .get("labels")
        .and_then(Value::as_array)
        .map(|labels| {
            labels
                .iter()
                .filter_map(|l| l.as_u64().or_else(|| l.get("id").and_then(Value::as_u64)))
                .map(LabelId)
                .collect()
        })
        .unwrap_or_default();

    let owner = text(state, "owner");
    Ok(Record {
        record_id: id,
        property_name: text(state, "property_name"),
        updated_at,
        assigned_label_ids,
        address: Address {
            line1: text(state, "address_line_1"),
            city: text(state, "city"),
            state: text(state, "state"),
            postal_code: text(state, "postal_code"),
        },
        contact_email: text(state, "owner_email"),
        organization_name: extra(state, "Organization").unwrap_or_else(|| owner.clone()),
        contact_name: owner,
        admin_email: extra(state, "Data Administrator Email").unwrap_or_default(),
        admin_name: extra(state, "Data Administrator").unwrap_or_default(),
        external_crm_id: extra(state, "Salesforce Benchmark ID"),
    })
}
