//! Tera mapping engine: [`TemplateKind`] selection and [`MappingEngine`].
//!
//! # Templates
//!
//! | Kind       | Used for status        | Template name                   |
//! |------------|------------------------|---------------------------------|
//! | Violation  | `Violation`            | `benchmark_violation.json.tera` |
//! | Compliance | `Complied`, `Neither`  | `benchmark_compliance.json.tera`|
//!
//! `Conflict` has no template; the orchestrator never renders it.
//!
//! Templates render JSON objects. The output is parsed into a [`FieldMap`]
//! and every key is checked against the kind's field schema.

use std::collections::HashMap;
use std::error::Error as _;
use std::path::{Path, PathBuf};

use tera::Tera;

use benchsync_core::fields::FieldMap;
use benchsync_core::types::ComplianceStatus;

use crate::context::MappingContext;
use crate::error::RenderError;
use crate::strict;

// ---------------------------------------------------------------------------
// Embedded templates: baked into the binary at compile time via include_str!
// ---------------------------------------------------------------------------

const TPLS: &[(&str, &str)] = &[
    (
        "shared/_record_fields.tera",
        include_str!("templates/_partials/record_fields.tera"),
    ),
    (
        "benchmark_violation.json.tera",
        include_str!("templates/benchmark_violation.json.tera"),
    ),
    (
        "benchmark_compliance.json.tera",
        include_str!("templates/benchmark_compliance.json.tera"),
    ),
];

const RECORD_FIELDS: &[&str] = &[
    "Name",
    "SEED_Property_ID__c",
    "Property_Street__c",
    "Property_City__c",
    "Property_State__c",
    "Property_Postal_Code__c",
    "Organization_Name__c",
    "Benchmark_Contact__c",
    "Data_Administrator__c",
    "Labels__c",
    "Compliance_Status__c",
];

// ---------------------------------------------------------------------------
// Template loading helpers
// ---------------------------------------------------------------------------

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RenderError {
    RenderError::Io {
        path: path.into(),
        source,
    }
}

fn normalize_template_name(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/").to_lowercase()
}

fn collect_template_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), RenderError> {
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        let meta = entry.metadata().map_err(|e| io_err(&path, e))?;
        if meta.is_dir() {
            collect_template_files(&path, out)?;
        } else if meta.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

fn load_user_templates(dir: &Path) -> Result<Vec<(String, String)>, RenderError> {
    if !dir.is_dir() {
        return Err(RenderError::TemplateDirMissing {
            path: dir.to_path_buf(),
        });
    }
    let mut files = Vec::new();
    collect_template_files(dir, &mut files)?;
    let mut templates = Vec::new();
    for path in files {
        if path.extension().and_then(|s| s.to_str()) != Some("tera") {
            continue;
        }
        let rel = path.strip_prefix(dir).unwrap_or(path.as_path());
        let name = normalize_template_name(rel);
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        templates.push((name, contents));
    }
    Ok(templates)
}

fn build_tera(user_template_dir: Option<&Path>) -> Result<Tera, RenderError> {
    let mut templates: HashMap<String, String> = HashMap::new();
    for (name, content) in TPLS {
        templates.insert(
            normalize_template_name(Path::new(name)),
            (*content).to_string(),
        );
    }
    if let Some(dir) = user_template_dir {
        for (name, content) in load_user_templates(dir)? {
            templates.insert(name, content);
        }
    }

    let mut tera = Tera::default();
    let items: Vec<(String, String)> = templates.into_iter().collect();
    tera.add_raw_templates(items).map_err(|e| RenderError::Template {
        template: "<load>".to_string(),
        message: describe(&e),
    })?;
    Ok(tera)
}

/// Flatten a tera error and its causes into one line; the useful part
/// ("Variable `x` not found") is usually in a source.
fn describe(err: &tera::Error) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        parts.push(cause.to_string());
        source = cause.source();
    }
    parts.join(": ")
}

// ---------------------------------------------------------------------------
// TemplateKind
// ---------------------------------------------------------------------------

/// The two outbound mapping templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    Violation,
    Compliance,
}

impl TemplateKind {
    /// All kinds in a stable order.
    pub fn all() -> &'static [TemplateKind] {
        &[TemplateKind::Violation, TemplateKind::Compliance]
    }

    /// Template for a compliance status. `None` for `Conflict`.
    pub fn for_status(status: ComplianceStatus) -> Option<TemplateKind> {
        match status {
            ComplianceStatus::Violation => Some(TemplateKind::Violation),
            ComplianceStatus::Complied | ComplianceStatus::Neither => {
                Some(TemplateKind::Compliance)
            }
            ComplianceStatus::Conflict => None,
        }
    }

    pub fn template_name(&self) -> &'static str {
        match self {
            TemplateKind::Violation => "benchmark_violation.json.tera",
            TemplateKind::Compliance => "benchmark_compliance.json.tera",
        }
    }

    /// Fields a rendered payload may contain.
    pub fn is_known_field(&self, field: &str) -> bool {
        RECORD_FIELDS.contains(&field)
            || match self {
                TemplateKind::Violation => field == "Violation_Reported_Date__c",
                TemplateKind::Compliance => field == "Compliance_Verified_Date__c",
            }
    }

    /// Full field schema, record fields first.
    pub fn fields(&self) -> Vec<&'static str> {
        let mut fields = RECORD_FIELDS.to_vec();
        fields.push(match self {
            TemplateKind::Violation => "Violation_Reported_Date__c",
            TemplateKind::Compliance => "Compliance_Verified_Date__c",
        });
        fields
    }
}

// ---------------------------------------------------------------------------
// MappingEngine
// ---------------------------------------------------------------------------

/// Tera-based engine rendering mapping templates into [`FieldMap`]s.
///
/// `user_template_dir` may contain `.tera` files that override embedded
/// defaults; when given it must exist. Create once per run and reuse.
pub struct MappingEngine {
    tera: Tera,
    /// Context variables each kind's template references.
    variables: HashMap<TemplateKind, Vec<String>>,
}

impl MappingEngine {
    /// Engine with embedded templates plus overrides from `user_template_dir`.
    pub fn new(user_template_dir: Option<&Path>) -> Result<Self, RenderError> {
        let tera = build_tera(user_template_dir)?;
        let mut variables = HashMap::new();
        for kind in TemplateKind::all() {
            let name = kind.template_name();
            let idents =
                strict::referenced_variables(&tera, name).map_err(|e| RenderError::Template {
                    template: name.to_string(),
                    message: describe(&e),
                })?;
            variables.insert(*kind, idents);
        }
        Ok(MappingEngine { tera, variables })
    }

    /// Engine with embedded templates only.
    pub fn embedded() -> Result<Self, RenderError> {
        Self::new(None)
    }

    /// Pick the template for `status` and render it.
    pub fn render_for_status(
        &self,
        status: ComplianceStatus,
        ctx: &MappingContext,
    ) -> Result<FieldMap, RenderError> {
        let kind = TemplateKind::for_status(status).ok_or(RenderError::NoTemplate { status })?;
        self.render(kind, ctx)
    }

    /// Render `kind` against `ctx`.
    ///
    /// Fails if the template references anything missing from the context
    /// (conditions and `default` arguments included), if the output is not a flat JSON object, or if it contains a field
    /// outside the kind's schema.
    pub fn render(&self, kind: TemplateKind, ctx: &MappingContext) -> Result<FieldMap, RenderError> {
        let name = kind.template_name();
        let json = serde_json::to_value(ctx).map_err(|e| RenderError::Context {
            message: e.to_string(),
        })?;
        let idents = self.variables.get(&kind).map(Vec::as_slice).unwrap_or_default();
        if let Some(ident) = strict::first_undefined(idents, &json) {
            return Err(RenderError::Template {
                template: name.to_string(),
                message: format!("Variable `{ident}` not found in context"),
            });
        }

        let tera_ctx = ctx.to_tera_context()?;
        let rendered = self
            .tera
            .render(name, &tera_ctx)
            .map_err(|e| RenderError::Template {
                template: name.to_string(),
                message: describe(&e),
            })?;

        let value: serde_json::Value =
            serde_json::from_str(&rendered).map_err(|e| RenderError::InvalidJson {
                template: name.to_string(),
                source: e,
            })?;
        let serde_json::Value::Object(object) = value else {
            return Err(RenderError::NotAnObject {
                template: name.to_string(),
            });
        };
        let fields = FieldMap::from_json_object(object).map_err(|(field, _)| {
            RenderError::UnsupportedValue {
                template: name.to_string(),
                field,
            }
        })?;

        if let Some(field) = fields.keys().find(|f| !kind.is_known_field(f)) {
            return Err(RenderError::UnknownField {
                template: name.to_string(),
                field: field.clone(),
            });
        }
        Ok(fields)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
