//! Error types for benchsync-renderer.

use std::path::PathBuf;

use thiserror::Error;

use benchsync_core::types::ComplianceStatus;

/// All errors that can arise from mapping template rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Tera failed to parse or render a template. Missing context variables
    /// end up here.
    #[error("template '{template}' failed: {message}")]
    Template { template: String, message: String },

    /// Building the tera context from [`crate::MappingContext`] failed.
    #[error("context serialization error: {message}")]
    Context { message: String },

    /// The rendered text is not JSON.
    #[error("template '{template}' did not render valid JSON: {source}")]
    InvalidJson {
        template: String,
        #[source]
        source: serde_json::Error,
    },

    /// The rendered JSON is not an object.
    #[error("template '{template}' must render a JSON object")]
    NotAnObject { template: String },

    /// A rendered field holds an array or object.
    #[error("template '{template}' rendered a non-scalar value for field `{field}`")]
    UnsupportedValue { template: String, field: String },

    /// A rendered field is outside the template's schema.
    #[error("template '{template}' rendered unknown field `{field}`")]
    UnknownField { template: String, field: String },

    /// No template exists for this status.
    #[error("no mapping template for status '{status}'")]
    NoTemplate { status: ComplianceStatus },

    /// A configured template directory does not exist.
    #[error("template directory {path} does not exist")]
    TemplateDirMissing { path: PathBuf },

    /// Filesystem error while loading user templates.
    #[error("template io error at {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
}
