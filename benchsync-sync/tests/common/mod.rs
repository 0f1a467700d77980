//! In-memory registry and CRM fakes shared by the integration tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use benchsync_core::error::{RemoteError, Service};
use benchsync_core::fields::{FieldMap, FieldValue};
use benchsync_core::ports::{CrmClient, RegistryClient};
use benchsync_core::types::{
    Account, Address, Benchmark, Contact, CrmId, CycleId, Label, LabelApplication, LabelId,
    OrgId, Record, RecordId, RegistryScope, SyncState,
};
use chrono::{DateTime, FixedOffset};

pub const EXPORT: LabelId = LabelId(1);
pub const VIOLATION: LabelId = LabelId(2);
pub const COMPLIED: LabelId = LabelId(3);

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn ts(s: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(s).expect("rfc3339 fixture")
}

pub fn sync_state(last_update: Option<&str>) -> SyncState {
    SyncState {
        last_update: last_update.map(ts),
        export_label: "Add to Salesforce".to_string(),
        violation_label: "Violation".to_string(),
        complied_label: "Complied".to_string(),
        crm_account_record_type: Some("012RT".to_string()),
    }
}

/// A record updated 2023-05-01 carrying the export label plus `extra`.
/// The admin shares the primary contact's email and organization.
pub fn record(id: u64, extra: &[LabelId]) -> Record {
    let mut labels: BTreeSet<LabelId> = extra.iter().copied().collect();
    labels.insert(EXPORT);
    Record {
        record_id: RecordId(id),
        property_name: format!("Building {id}"),
        updated_at: ts("2023-05-01T10:00:00-06:00"),
        assigned_label_ids: labels,
        address: Address {
            line1: "1617 Cole Blvd".to_string(),
            city: "Golden".to_string(),
            state: "CO".to_string(),
            postal_code: "80401".to_string(),
        },
        contact_email: "owner@example.com".to_string(),
        contact_name: "Olive Owner".to_string(),
        organization_name: "Owner Holdings".to_string(),
        admin_email: "owner@example.com".to_string(),
        admin_name: "Olive Owner".to_string(),
        external_crm_id: Some(format!("a01BENCH{id}")),
    }
}

fn label(id: LabelId, name: &str) -> Label {
    Label {
        id,
        name: name.to_string(),
        color: Some("green".to_string()),
        show_in_list: true,
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

pub struct FakeRegistry {
    pub labels: RefCell<Vec<Label>>,
    pub records: BTreeMap<RecordId, Record>,
    pub broken: HashSet<RecordId>,
    pub property_calls: Cell<usize>,
}

impl FakeRegistry {
    pub fn new(records: Vec<Record>) -> Self {
        FakeRegistry {
            labels: RefCell::new(vec![
                label(EXPORT, "Add to Salesforce"),
                label(VIOLATION, "Violation"),
                label(COMPLIED, "Complied"),
            ]),
            records: records.into_iter().map(|r| (r.record_id, r)).collect(),
            broken: HashSet::new(),
            property_calls: Cell::new(0),
        }
    }

    pub fn scope() -> RegistryScope {
        RegistryScope {
            org_id: OrgId(7),
            cycle_id: CycleId(2023),
        }
    }
}

fn registry_err(message: &str) -> RemoteError {
    RemoteError::Status {
        service: Service::Registry,
        status: 500,
        message: message.to_string(),
    }
}

impl RegistryClient for FakeRegistry {
    fn get_org_by_name(&self, name: &str) -> Result<Option<OrgId>, RemoteError> {
        Ok((name == "nrel").then_some(OrgId(7)))
    }

    fn get_cycle_by_name(&self, org: OrgId, name: &str) -> Result<Option<CycleId>, RemoteError> {
        Ok((org == OrgId(7) && name == "2023").then_some(CycleId(2023)))
    }

    fn get_labels(&self, _scope: &RegistryScope) -> Result<Vec<Label>, RemoteError> {
        Ok(self.labels.borrow().clone())
    }

    fn get_view_ids_with_label(
        &self,
        _scope: &RegistryScope,
        label_names: &[String],
    ) -> Result<Vec<LabelApplication>, RemoteError> {
        let labels = self.labels.borrow();
        Ok(label_names
            .iter()
            .map(|name| {
                let id = labels.iter().find(|l| &l.name == name).map(|l| l.id);
                let is_applied = self
                    .records
                    .values()
                    .filter(|r| id.is_some_and(|id| r.assigned_label_ids.contains(&id)))
                    .map(|r| r.record_id)
                    .collect();
                LabelApplication {
                    name: name.clone(),
                    is_applied,
                }
            })
            .collect())
    }

    fn get_property(&self, _scope: &RegistryScope, id: RecordId) -> Result<Record, RemoteError> {
        self.property_calls.set(self.property_calls.get() + 1);
        if self.broken.contains(&id) {
            return Err(registry_err("property view unavailable"));
        }
        self.records
            .get(&id)
            .cloned()
            .ok_or_else(|| registry_err("not found"))
    }

    fn get_or_create_label(
        &self,
        _scope: &RegistryScope,
        name: &str,
        color: &str,
        show_in_list: bool,
    ) -> Result<Label, RemoteError> {
        let mut labels = self.labels.borrow_mut();
        if let Some(existing) = labels.iter().find(|l| l.name == name) {
            return Ok(existing.clone());
        }
        let next = labels.iter().map(|l| l.id.0).max().unwrap_or(0) + 1;
        let created = Label {
            id: LabelId(next),
            name: name.to_string(),
            color: Some(color.to_string()),
            show_in_list,
        };
        labels.push(created.clone());
        Ok(created)
    }
}

// ---------------------------------------------------------------------------
// CRM
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeCrm {
    pub accounts: RefCell<Vec<Account>>,
    pub contacts: RefCell<Vec<Contact>>,
    /// Benchmark fields keyed by record id.
    pub benchmarks: RefCell<HashMap<String, FieldMap>>,
    /// Custom benchmark id → record id.
    pub custom_ids: RefCell<HashMap<String, String>>,
    pub updates: RefCell<Vec<(String, FieldMap)>>,
    pub fail_updates: HashSet<String>,
    /// Create contacts without linking them to the account.
    pub drop_account_link: bool,
    pub calls: Cell<usize>,
    pub creates: Cell<usize>,
    pub next_id: Cell<usize>,
}

impl FakeCrm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a benchmark under record id `id` with custom id `custom_id`.
    pub fn seed_benchmark(&self, id: &str, custom_id: &str, fields: FieldMap) {
        self.benchmarks.borrow_mut().insert(id.to_string(), fields);
        self.custom_ids
            .borrow_mut()
            .insert(custom_id.to_string(), id.to_string());
    }

    fn benchmark(&self, id: &str) -> Option<Benchmark> {
        let fields = self.benchmarks.borrow().get(id).cloned()?;
        let custom_id = self
            .custom_ids
            .borrow()
            .iter()
            .find(|(_, record_id)| record_id.as_str() == id)
            .map(|(custom, _)| custom.clone());
        Some(Benchmark {
            id: CrmId::from(id),
            custom_id,
            fields,
        })
    }

    fn tick(&self) {
        self.calls.set(self.calls.get() + 1);
    }

    fn mint(&self, prefix: &str) -> CrmId {
        let n = self.next_id.get() + 1;
        self.next_id.set(n);
        CrmId(format!("{prefix}{n:05}"))
    }

    pub fn seed_account(&self, name: &str) -> CrmId {
        let id = self.mint("001");
        self.accounts.borrow_mut().push(Account {
            id: id.clone(),
            name: name.to_string(),
            record_type_id: None,
        });
        id
    }

    pub fn seed_contact(&self, email: &str, account: &CrmId) -> CrmId {
        let id = self.mint("003");
        self.contacts.borrow_mut().push(Contact {
            id: id.clone(),
            email: email.to_string(),
            account_id: Some(account.clone()),
            last_name: Some("Seeded".to_string()),
        });
        id
    }

    pub fn accounts_named(&self, name: &str) -> usize {
        self.accounts.borrow().iter().filter(|a| a.name == name).count()
    }
}

fn crm_rejected(message: String) -> RemoteError {
    RemoteError::Rejected {
        service: Service::Crm,
        message,
    }
}

impl CrmClient for FakeCrm {
    fn find_accounts_by_name(&self, name: &str) -> Result<Vec<Account>, RemoteError> {
        self.tick();
        Ok(self
            .accounts
            .borrow()
            .iter()
            .filter(|a| a.name == name)
            .cloned()
            .collect())
    }

    fn create_account(&self, name: &str, fields: &FieldMap) -> Result<Account, RemoteError> {
        self.tick();
        if self.accounts.borrow().iter().any(|a| a.name == name) {
            return Err(crm_rejected(format!("DUPLICATE_VALUE: account '{name}'")));
        }
        self.creates.set(self.creates.get() + 1);
        let account = Account {
            id: self.mint("001"),
            name: name.to_string(),
            record_type_id: fields
                .get("RecordTypeId")
                .and_then(FieldValue::as_text)
                .map(str::to_string),
        };
        self.accounts.borrow_mut().push(account.clone());
        Ok(account)
    }

    fn update_account_by_id(&self, id: &CrmId, fields: &FieldMap) -> Result<Account, RemoteError> {
        self.tick();
        let mut accounts = self.accounts.borrow_mut();
        let account = accounts
            .iter_mut()
            .find(|a| &a.id == id)
            .ok_or_else(|| crm_rejected(format!("ENTITY_IS_DELETED: {id}")))?;
        if let Some(name) = fields.get("Name").and_then(FieldValue::as_text) {
            account.name = name.to_string();
        }
        Ok(account.clone())
    }

    fn delete_account_by_id(&self, id: &CrmId) -> Result<bool, RemoteError> {
        self.tick();
        let mut accounts = self.accounts.borrow_mut();
        let before = accounts.len();
        accounts.retain(|a| &a.id != id);
        Ok(accounts.len() < before)
    }

    fn find_contacts_by_email(&self, email: &str) -> Result<Vec<Contact>, RemoteError> {
        self.tick();
        Ok(self
            .contacts
            .borrow()
            .iter()
            .filter(|c| c.email == email)
            .cloned()
            .collect())
    }

    fn create_contact(&self, email: &str, fields: &FieldMap) -> Result<Contact, RemoteError> {
        self.tick();
        if self.contacts.borrow().iter().any(|c| c.email == email) {
            return Err(crm_rejected(format!("DUPLICATE_VALUE: contact '{email}'")));
        }
        if !fields.contains("LastName") {
            return Err(crm_rejected("REQUIRED_FIELD_MISSING: LastName".to_string()));
        }
        self.creates.set(self.creates.get() + 1);
        let account_id = if self.drop_account_link {
            None
        } else {
            fields
                .get("AccountId")
                .and_then(FieldValue::as_text)
                .map(CrmId::from)
        };
        let contact = Contact {
            id: self.mint("003"),
            email: email.to_string(),
            account_id,
            last_name: fields
                .get("LastName")
                .and_then(FieldValue::as_text)
                .map(str::to_string),
        };
        self.contacts.borrow_mut().push(contact.clone());
        Ok(contact)
    }

    fn get_benchmark_by_custom_id(
        &self,
        custom_id: &str,
    ) -> Result<Option<Benchmark>, RemoteError> {
        self.tick();
        let Some(id) = self.custom_ids.borrow().get(custom_id).cloned() else {
            return Ok(None);
        };
        Ok(self.benchmark(&id))
    }

    fn get_benchmark_by_id(&self, id: &str) -> Result<Option<Benchmark>, RemoteError> {
        self.tick();
        Ok(self.benchmark(id))
    }

    fn update_benchmark(&self, id: &str, fields: &FieldMap) -> Result<(), RemoteError> {
        self.tick();
        if self.fail_updates.contains(id) {
            return Err(RemoteError::Status {
                service: Service::Crm,
                status: 400,
                message: format!("INVALID_FIELD: benchmark {id}"),
            });
        }
        self.updates
            .borrow_mut()
            .push((id.to_string(), fields.clone()));
        self.benchmarks
            .borrow_mut()
            .insert(id.to_string(), fields.clone());
        Ok(())
    }
}
