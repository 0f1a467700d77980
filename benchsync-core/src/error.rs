//! Error types for benchsync-core.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Errors from loading, validating, or saving the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure (permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error (write/save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load: includes file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`: cannot locate `~/.benchsync/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// The config file did not exist at the expected path.
    #[error("config not found at {path}; run `benchsync init` first")]
    ConfigNotFound { path: PathBuf },

    /// A field is present but unusable.
    #[error("invalid config field `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    /// A timestamp field failed to parse.
    #[error("invalid config field `{field}`: {source}")]
    Timestamp {
        field: &'static str,
        #[source]
        source: TimestampError,
    },
}

/// Timestamp parse failures. Naive timestamps are rejected, never guessed.
#[derive(Debug, Error)]
pub enum TimestampError {
    #[error("timestamp '{value}' has no timezone offset")]
    MissingOffset { value: String },

    #[error("timestamp '{value}' is not RFC 3339: {source}")]
    Invalid {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Remote system a [`RemoteError`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Registry,
    Crm,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Service::Registry => write!(f, "registry"),
            Service::Crm => write!(f, "CRM"),
        }
    }
}

/// Failures reported by the registry or CRM clients.
///
/// Server-provided text is kept verbatim in `message` so it can be surfaced
/// in the run report.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Non-success HTTP status.
    #[error("{service} returned HTTP {status}: {message}")]
    Status {
        service: Service,
        status: u16,
        message: String,
    },

    /// The request never produced a response (DNS, TLS, timeout, ...).
    #[error("{service} request failed: {message}")]
    Transport { service: Service, message: String },

    /// The response body did not have the expected shape.
    #[error("{service} response could not be decoded: {message}")]
    Decode { service: Service, message: String },

    /// The call succeeded at the HTTP level but the service refused it.
    #[error("{service} rejected the request: {message}")]
    Rejected { service: Service, message: String },

    /// More than one record matched a key that must be unique.
    #[error("{service} returned {count} {entity} records for '{key}'")]
    Ambiguous {
        service: Service,
        entity: &'static str,
        key: String,
        count: usize,
    },

    /// Login or session setup failed.
    #[error("{service} authentication failed: {message}")]
    Auth { service: Service, message: String },
}

impl RemoteError {
    pub fn service(&self) -> Service {
        match self {
            RemoteError::Status { service, .. }
            | RemoteError::Transport { service, .. }
            | RemoteError::Decode { service, .. }
            | RemoteError::Rejected { service, .. }
            | RemoteError::Ambiguous { service, .. }
            | RemoteError::Auth { service, .. } => *service,
        }
    }
}
