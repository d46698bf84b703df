//! curio-import
//!
//! Reconciliation core for bulk collection imports.
//!
//! Architectural decisions:
//! - Pure logic over pre-fetched lookups. No DB calls, no queue calls.
//! - Input records are immutable; everything derived (normalized dates,
//!   defaulted fields, order assignments) is produced as new values.
//! - The three output partitions of [`reconcile`] (ready, needs-lookup,
//!   skipped-owned) are disjoint and cover the input batch exactly.
//!
//! CSV parsing of spreadsheet exports lives in [`csv_ingest`]; it is the only
//! module here that touches IO, and only the read side of it.

pub mod csv_ingest;
pub mod dates;
pub mod defaults;
pub mod engine;
pub mod orders;
pub mod types;

pub use engine::{reconcile, reconcile_with_keygen, ReconcileInputs, ReconcilePlan};
pub use types::{
    ImportRecord, ItemStatus, NewCollectionEntry, NewOrderAggregate, RecordError, ReleaseRef,
    ResolvedCatalogItem,
};
