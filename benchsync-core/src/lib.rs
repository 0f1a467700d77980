//! benchsync core library: domain types, configuration, capability traits, errors.
//!
//! - [`types`]: newtypes and domain structs (registry records, CRM entities)
//! - [`fields`]: typed CRM field payloads
//! - [`config`]: `~/.benchsync/config.yaml` load / save / init
//! - [`ports`]: [`RegistryClient`] and [`CrmClient`] capability traits
//! - [`timestamp`]: offset-aware timestamp parsing
//! - [`error`]: [`ConfigError`], [`RemoteError`]

pub mod config;
pub mod error;
pub mod fields;
pub mod ports;
pub mod timestamp;
pub mod types;

pub use config::Config;
pub use error::{ConfigError, RemoteError, Service, TimestampError};
pub use fields::{FieldMap, FieldValue};
pub use ports::{CrmClient, RegistryClient};
pub use types::{
    Account, Address, Benchmark, ComplianceStatus, Contact, CrmId, CycleId, Label,
    LabelApplication, LabelId, OrgId, Record, RecordId, RegistryScope, SyncState,
};
