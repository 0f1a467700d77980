//! # benchsync-sync
//!
//! The synchronization decision engine.
//!
//! Build a [`SyncContext`] once, then call [`run`] to push every due record
//! carrying the export label. [`diff_record`] previews a single record and
//! [`state_store`] persists the high-water mark between runs.

pub mod classify;
pub mod clock;
pub mod context;
pub mod diff;
pub mod error;
pub mod labels;
pub mod pipeline;
pub mod report;
pub mod resolver;
pub mod state_store;

pub use classify::{classify, Classification, LabelCatalog};
pub use clock::{effective_last_update, is_due, SyncClock};
pub use context::SyncContext;
pub use diff::{diff_record, RecordDiff};
pub use error::{ResolveError, SyncError};
pub use pipeline::{run, RunOptions, PENDING_ID};
pub use report::{RecordPhase, RunReport, SkipReason};
pub use resolver::Resolver;
pub use state_store::StateFile;
