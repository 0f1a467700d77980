//! Contact/Account resolver: idempotent find-or-create in the CRM.
//!
//! Resolution order for one contact:
//!
//! 1. Contact by email. One match wins, no mutation.
//! 2. Account by name, created when absent.
//! 3. Contact created under that Account.
//!
//! More than one match for an email or an account name is an error; the
//! resolver never picks one arbitrarily and never creates a duplicate.

use benchsync_core::fields::FieldMap;
use benchsync_core::ports::CrmClient;
use benchsync_core::types::{Account, Contact, CrmId};

use crate::error::ResolveError;

/// CRM identity resolver bound to one client and one default record type.
pub struct Resolver<'a, C: CrmClient + ?Sized> {
    crm: &'a C,
    account_record_type: Option<String>,
}

impl<'a, C: CrmClient + ?Sized> Resolver<'a, C> {
    pub fn new(crm: &'a C, account_record_type: Option<String>) -> Self {
        Resolver {
            crm,
            account_record_type,
        }
    }

    /// Find or create the Contact for `email`, linked to the Account named
    /// `account_name`.
    pub fn resolve_contact(
        &self,
        name: &str,
        email: &str,
        account_name: &str,
    ) -> Result<Contact, ResolveError> {
        let email = email.trim();
        if let Some(existing) = self.lookup_contact(email)? {
            tracing::debug!("contact {email} resolved to {}", existing.id);
            return Ok(existing);
        }

        let account = self.resolve_account(account_name)?;
        let fields = contact_fields(name, email, &account.id);
        let created = self.crm.create_contact(email, &fields)?;

        if created.id.is_blank() {
            return Err(ResolveError::Incomplete {
                entity: "contact",
                key: email.to_string(),
                reason: "empty id".to_string(),
            });
        }
        if created.account_id.as_ref() != Some(&account.id) {
            return Err(ResolveError::Incomplete {
                entity: "contact",
                key: email.to_string(),
                reason: format!("not linked to account {}", account.id),
            });
        }

        tracing::info!("created contact {} for {email}", created.id);
        Ok(created)
    }

    /// Read-only lookup. `Ok(None)` when no Contact has `email`.
    pub fn lookup_contact(&self, email: &str) -> Result<Option<Contact>, ResolveError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(ResolveError::Blank {
                what: "contact email",
            });
        }
        let mut found = self.crm.find_contacts_by_email(email)?;
        match found.len() {
            0 => Ok(None),
            1 => Ok(found.pop()),
            count => Err(ResolveError::Ambiguous {
                entity: "contact",
                key: email.to_string(),
                count,
            }),
        }
    }

    /// Find or create the Account named `name`.
    pub fn resolve_account(&self, name: &str) -> Result<Account, ResolveError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ResolveError::Blank {
                what: "account name",
            });
        }
        let mut found = self.crm.find_accounts_by_name(name)?;
        match found.len() {
            0 => {}
            1 => {
                if let Some(account) = found.pop() {
                    return Ok(account);
                }
            }
            count => {
                return Err(ResolveError::Ambiguous {
                    entity: "account",
                    key: name.to_string(),
                    count,
                })
            }
        }

        let mut fields = FieldMap::new();
        if let Some(record_type) = &self.account_record_type {
            fields.insert("RecordTypeId", record_type.as_str());
        }
        let created = self.crm.create_account(name, &fields)?;
        if created.id.is_blank() {
            return Err(ResolveError::Incomplete {
                entity: "account",
                key: name.to_string(),
                reason: "empty id".to_string(),
            });
        }
        tracing::info!("created account {} for '{name}'", created.id);
        Ok(created)
    }
}

/// Contact create payload.
fn contact_fields(name: &str, email: &str, account_id: &CrmId) -> FieldMap {
    let (first, last) = split_name(name);
    let last = if last.is_empty() { email } else { last };
    let mut fields = FieldMap::new()
        .with("Email", email)
        .with("LastName", last)
        .with("AccountId", account_id.as_str());
    if let Some(first) = first {
        fields.insert("FirstName", first);
    }
    fields
}

/// Split a display name at its last whitespace into `(first, last)`.
/// Single-word names have no first name.
pub fn split_name(name: &str) -> (Option<&str>, &str) {
    let name = name.trim();
    match name.rsplit_once(char::is_whitespace) {
        Some((first, last)) => {
            let first = first.trim_end();
            (Some(first).filter(|f| !f.is_empty()), last)
        }
        None => (None, name),
    }
}
