//! Error types for benchsync-sync.

use std::path::PathBuf;

use thiserror::Error;

use benchsync_core::error::RemoteError;
use benchsync_renderer::RenderError;

/// Failures while resolving a CRM Account → Contact graph.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// More than one CRM record matched a key that must be unique.
    #[error("ambiguous {entity} for '{key}': {count} matches")]
    Ambiguous {
        entity: &'static str,
        key: String,
        count: usize,
    },

    /// The CRM accepted a create but returned a record we cannot use.
    #[error("created {entity} for '{key}' is incomplete: {reason}")]
    Incomplete {
        entity: &'static str,
        key: String,
        reason: String,
    },

    /// Nothing to resolve against.
    #[error("{what} is blank")]
    Blank { what: &'static str },

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// All errors that can arise from sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from the mapping engine.
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// A remote call failed outside per-record processing.
    #[error("{0}")]
    Remote(#[from] RemoteError),

    /// Identity resolution failed outside per-record processing.
    #[error("resolve error: {0}")]
    Resolve(#[from] ResolveError),

    /// The configured organization does not exist in the registry.
    #[error("registry organization '{name}' not found")]
    OrgNotFound { name: String },

    /// The configured cycle does not exist for the organization.
    #[error("registry cycle '{name}' not found")]
    CycleNotFound { name: String },

    /// The record has nothing to push into.
    #[error("record {record_id} has no CRM benchmark id")]
    MissingExternalId { record_id: u64 },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// State store JSON was malformed or could not be serialized.
    #[error("state store JSON error at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
