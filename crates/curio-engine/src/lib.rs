//! curio-engine
//!
//! Composition root for the import pipeline: wires the pure reconciliation
//! engine to the Postgres layer and the lookup-job dispatcher, and exposes
//! the two operations collaborators call:
//!
//! - [`ImportService::reconcile_and_dispatch`]: one import request end to
//!   end: batch reads, pure reconcile, atomic write, async dispatch.
//! - [`ImportService::job_status`]: poll a dispatched job by id.

mod service;

pub use service::{ImportError, ImportOutcome, ImportService};
