//! # benchsync-renderer
//!
//! Tera-based engine that renders CRM field mappings for a registry record.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use benchsync_core::types::{ComplianceStatus, Record};
//! use benchsync_renderer::{MappingContext, MappingEngine};
//!
//! fn payload(record: &Record) {
//!     if let Ok(engine) = MappingEngine::embedded() {
//!         let ctx = MappingContext::new(record, "003A", "003B", &[], Some("Violation"), chrono::Utc::now());
//!         if let Ok(fields) = engine.render_for_status(ComplianceStatus::Violation, &ctx) {
//!             print!("{}", fields.to_lines());
//!         }
//!     }
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;
mod strict;

pub use context::MappingContext;
pub use engine::{MappingEngine, TemplateKind};
pub use error::RenderError;
