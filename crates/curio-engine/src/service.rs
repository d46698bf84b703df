//! The composed import operation.
//!
//! One reconciliation pass is synchronous on the request's critical path
//! and does a small, bounded number of batch reads (match, membership,
//! releases) before the single transactional write. The dispatcher's two
//! side effects are not transactional with the write or with each other:
//! "rows saved but dispatch failed" is a recoverable, reportable state, not
//! a reason to roll anything back.

use std::fmt;

use sqlx::PgPool;

use curio_import::{reconcile, ImportRecord, ReconcileInputs, RecordError};
use curio_jobs::{
    DispatchError, Dispatcher, JobQueue, JobStatusError, JobStatusRecord, JobStatusStore,
};

// ---------------------------------------------------------------------------
// Outcome / error types
// ---------------------------------------------------------------------------

/// What one import request accomplished.
#[derive(Clone, Debug)]
pub struct ImportOutcome {
    /// Collection entries inserted by this pass.
    pub inserted_count: u64,
    /// Records skipped because the user already owned the item.
    pub skipped_owned: usize,
    /// External ids routed to the async lookup pipeline.
    pub external_lookup_ids: Vec<i64>,
    /// Present only when something needed external lookup.
    pub job_id: Option<String>,
}

/// Import failure taxonomy. Validation and read failures happen before
/// anything is written; write failures roll back atomically; dispatch
/// failures happen after a successful write and say so.
#[derive(Debug)]
pub enum ImportError {
    /// A malformed record, rejected before reconciliation began.
    Validation { row: usize, source: RecordError },
    /// A batch read failed; nothing has been written.
    Read(anyhow::Error),
    /// The transactional write failed; no partial insert is visible.
    Write(anyhow::Error),
    /// Rows were inserted but the lookup dispatch failed. Carries what was
    /// committed so callers can report partial success.
    Dispatch {
        inserted_count: u64,
        external_lookup_ids: Vec<i64>,
        source: DispatchError,
    },
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportError::Validation { row, source } => {
                write!(f, "invalid import record at row {row}: {source}")
            }
            ImportError::Read(e) => write!(f, "import batch read failed: {e}"),
            ImportError::Write(e) => write!(f, "import batch write failed: {e}"),
            ImportError::Dispatch {
                inserted_count,
                source,
                ..
            } => write!(
                f,
                "{inserted_count} rows saved, but new-item lookup could not be queued: {source}"
            ),
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImportError::Validation { source, .. } => Some(source),
            ImportError::Read(e) | ImportError::Write(e) => Some(e.as_ref()),
            ImportError::Dispatch { source, .. } => Some(source),
        }
    }
}

// ---------------------------------------------------------------------------
// ImportService
// ---------------------------------------------------------------------------

/// The reconcile-and-dispatch engine behind one import endpoint.
pub struct ImportService<Q, S> {
    pool: PgPool,
    dispatcher: Dispatcher<Q, S>,
    catalog_source: String,
}

impl<Q: JobQueue, S: JobStatusStore> ImportService<Q, S> {
    /// `catalog_source` is the external namespace this engine reconciles
    /// against; ids from other namespaces never match.
    pub fn new(pool: PgPool, queue: Q, status: S, catalog_source: impl Into<String>) -> Self {
        Self {
            pool,
            dispatcher: Dispatcher::new(queue, status),
            catalog_source: catalog_source.into(),
        }
    }

    /// Reconcile a batch for `user_id`, persist what is resolvable, and
    /// dispatch the rest for external lookup.
    pub async fn reconcile_and_dispatch(
        &self,
        records: &[ImportRecord],
        user_id: i64,
    ) -> Result<ImportOutcome, ImportError> {
        for (row, record) in records.iter().enumerate() {
            record
                .validate()
                .map_err(|source| ImportError::Validation { row, source })?;
        }

        let external_ids: Vec<i64> = records.iter().map(|r| r.external_id).collect();
        let known = curio_db::match_catalog_items(&self.pool, &self.catalog_source, &external_ids)
            .await
            .map_err(ImportError::Read)?;

        let known_item_ids: Vec<i64> = known.iter().map(|it| it.item_id).collect();
        let owned = curio_db::owned_item_ids(&self.pool, user_id, &known_item_ids)
            .await
            .map_err(ImportError::Read)?;

        let insert_item_ids: Vec<i64> = known
            .iter()
            .map(|it| it.item_id)
            .filter(|id| !owned.contains(id))
            .collect();
        let releases = curio_db::latest_releases(&self.pool, &insert_item_ids)
            .await
            .map_err(ImportError::Read)?;

        let plan = reconcile(
            records,
            &ReconcileInputs {
                user_id,
                known_items: &known,
                owned_item_ids: &owned,
                releases: &releases,
            },
        );
        tracing::debug!(
            user_id,
            ready = plan.ready_to_insert.len(),
            orders = plan.orders_to_insert.len(),
            lookup = plan.needs_external_lookup.len(),
            skipped = plan.skipped_owned.len(),
            "batch reconciled"
        );

        let inserted_count = curio_db::insert_orders_and_entries(
            &self.pool,
            &plan.orders_to_insert,
            &plan.ready_to_insert,
        )
        .await
        .map_err(ImportError::Write)?;

        let external_lookup_ids: Vec<i64> = plan
            .needs_external_lookup
            .iter()
            .map(|r| r.external_id)
            .collect();
        let job_id = if plan.needs_external_lookup.is_empty() {
            None
        } else {
            match self
                .dispatcher
                .dispatch_lookup(user_id, &plan.needs_external_lookup)
                .await
            {
                Ok(id) => Some(id),
                Err(source) => {
                    return Err(ImportError::Dispatch {
                        inserted_count,
                        external_lookup_ids,
                        source,
                    })
                }
            }
        };

        tracing::info!(
            user_id,
            inserted = inserted_count,
            skipped = plan.skipped_owned.len(),
            lookup = external_lookup_ids.len(),
            "import batch processed"
        );
        Ok(ImportOutcome {
            inserted_count,
            skipped_owned: plan.skipped_owned.len(),
            external_lookup_ids,
            job_id,
        })
    }

    /// Poll a dispatched job. Not-found is a normal outcome, distinct from
    /// store failures.
    pub async fn job_status(&self, job_id: &str) -> Result<JobStatusRecord, JobStatusError> {
        self.dispatcher.job_status(job_id).await
    }
}
