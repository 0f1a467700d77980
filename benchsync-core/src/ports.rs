//! Capability interfaces for the two remote systems.
//!
//! The sync engine only talks to the registry and the CRM through these
//! traits. `benchsync-clients` provides the HTTP implementations; tests use
//! in-memory fakes.
//!
//! Expected-absent lookups return `Option` or an empty `Vec`. Errors are for
//! remote failures and ambiguity only.

use crate::error::RemoteError;
use crate::fields::FieldMap;
use crate::types::{
    Account, Benchmark, Contact, CrmId, CycleId, Label, LabelApplication, OrgId, Record,
    RecordId, RegistryScope,
};

/// Read access to the building registry, plus label bootstrap.
pub trait RegistryClient {
    /// Organization id for `name`, if the caller can see it.
    fn get_org_by_name(&self, name: &str) -> Result<Option<OrgId>, RemoteError>;

    /// Cycle id for `name` within `org`.
    fn get_cycle_by_name(&self, org: OrgId, name: &str) -> Result<Option<CycleId>, RemoteError>;

    /// The organization's full label catalog.
    fn get_labels(&self, scope: &RegistryScope) -> Result<Vec<Label>, RemoteError>;

    /// Record ids carrying each of `label_names` in the scoped cycle.
    fn get_view_ids_with_label(
        &self,
        scope: &RegistryScope,
        label_names: &[String],
    ) -> Result<Vec<LabelApplication>, RemoteError>;

    fn get_property(&self, scope: &RegistryScope, id: RecordId) -> Result<Record, RemoteError>;

    fn get_or_create_label(
        &self,
        scope: &RegistryScope,
        name: &str,
        color: &str,
        show_in_list: bool,
    ) -> Result<Label, RemoteError>;
}

/// Account, Contact and benchmark access in the CRM.
pub trait CrmClient {
    /// All Accounts whose name equals `name`.
    fn find_accounts_by_name(&self, name: &str) -> Result<Vec<Account>, RemoteError>;

    /// Create an Account. Implementations refuse when the name already exists.
    fn create_account(&self, name: &str, fields: &FieldMap) -> Result<Account, RemoteError>;

    fn update_account_by_id(&self, id: &CrmId, fields: &FieldMap) -> Result<Account, RemoteError>;

    /// `Ok(false)` when the CRM reports the delete did not happen.
    fn delete_account_by_id(&self, id: &CrmId) -> Result<bool, RemoteError>;

    /// All Contacts whose email equals `email`.
    fn find_contacts_by_email(&self, email: &str) -> Result<Vec<Contact>, RemoteError>;

    /// Create a Contact. Implementations refuse when the email already exists.
    fn create_contact(&self, email: &str, fields: &FieldMap) -> Result<Contact, RemoteError>;

    /// Benchmark whose custom id field equals `custom_id`.
    fn get_benchmark_by_custom_id(&self, custom_id: &str)
        -> Result<Option<Benchmark>, RemoteError>;

    /// Benchmark whose record id is `id`; `None` when the CRM has no such record.
    fn get_benchmark_by_id(&self, id: &str) -> Result<Option<Benchmark>, RemoteError>;

    /// Overwrite fields on the benchmark with record id `id`.
    fn update_benchmark(&self, id: &str, fields: &FieldMap) -> Result<(), RemoteError>;
}
