//! # benchsync-clients
//!
//! Blocking HTTP implementations of the capability traits in
//! `benchsync_core::ports`:
//!
//! - [`SeedClient`]: SEED registry, v3 REST API, basic auth
//! - [`SalesforceClient`]: Salesforce CRM, SOAP login + REST/SOQL

mod http;
pub mod salesforce;
pub mod seed;

pub use salesforce::{escape_soql, SalesforceClient, Session};
pub use seed::SeedClient;
