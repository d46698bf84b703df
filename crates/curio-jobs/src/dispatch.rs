//! Dispatcher: the single choke-point between reconciliation and the
//! external-lookup infrastructure.
//!
//! A dispatch has two side effects (durable enqueue, then status write)
//! which are deliberately NOT transactional with each other. Each failure
//! mode is a distinct error variant so callers can tell "nothing was
//! queued" apart from "queued, but the job may look orphaned to pollers".
//! Nothing here retries; retry/backoff policy belongs to the caller.

use std::fmt;
use std::time::Duration;

use curio_import::ImportRecord;

use crate::queue::{JobQueue, LookupJob, QueueError};
use crate::status::{JobStatusRecord, JobStatusStore, StatusStoreError};

/// Default bounded expiry for status records: long relative to expected
/// worker latency, short enough that abandoned jobs evict themselves.
pub const DEFAULT_STATUS_TTL: Duration = Duration::from_secs(6 * 60 * 60);

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Dispatch failure modes, surfaced unretried.
#[derive(Debug)]
pub enum DispatchError {
    /// The durable enqueue failed; nothing was queued.
    Enqueue(QueueError),
    /// The job WAS queued but its status record could not be written; the
    /// caller decides whether to treat the job as orphaned.
    StatusWrite {
        job_id: String,
        source: StatusStoreError,
    },
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Enqueue(e) => write!(f, "lookup job enqueue failed: {e}"),
            DispatchError::StatusWrite { job_id, source } => write!(
                f,
                "lookup job {job_id} was queued but its status record write failed: {source}"
            ),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::Enqueue(e) => Some(e),
            DispatchError::StatusWrite { source, .. } => Some(source),
        }
    }
}

/// Status lookup outcomes that are not records.
///
/// `NotFound` covers both "expired" and "never existed", an accepted
/// simplification of the status contract. It is a normal outcome, kept
/// distinct from transport-level store errors.
#[derive(Debug)]
pub enum JobStatusError {
    NotFound(String),
    Store(StatusStoreError),
}

impl fmt::Display for JobStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatusError::NotFound(id) => write!(f, "no status record for job {id}"),
            JobStatusError::Store(e) => write!(f, "status store failed: {e}"),
        }
    }
}

impl std::error::Error for JobStatusError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            JobStatusError::NotFound(_) => None,
            JobStatusError::Store(e) => Some(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Enqueues lookup jobs and owns the status read/write conventions.
pub struct Dispatcher<Q, S> {
    queue: Q,
    status: S,
    status_ttl: Duration,
}

impl<Q: JobQueue, S: JobStatusStore> Dispatcher<Q, S> {
    pub fn new(queue: Q, status: S) -> Self {
        Self {
            queue,
            status,
            status_ttl: DEFAULT_STATUS_TTL,
        }
    }

    pub fn with_status_ttl(mut self, ttl: Duration) -> Self {
        self.status_ttl = ttl;
        self
    }

    /// Enqueue one durable lookup job for `records` and write its initial
    /// status record. Returns the opaque job id the caller hands to pollers.
    pub async fn dispatch_lookup(
        &self,
        user_id: i64,
        records: &[ImportRecord],
    ) -> Result<String, DispatchError> {
        let job = LookupJob::new(user_id, records.to_vec());
        let job_id = self
            .queue
            .enqueue(&job)
            .await
            .map_err(DispatchError::Enqueue)?;

        let record = JobStatusRecord::queued(job_id.clone());
        self.status
            .set_with_ttl(&record, self.status_ttl)
            .await
            .map_err(|source| DispatchError::StatusWrite {
                job_id: job_id.clone(),
                source,
            })?;

        tracing::info!(
            job_id = %job_id,
            user_id,
            rows = records.len(),
            "external-lookup job dispatched"
        );
        Ok(job_id)
    }

    /// Look up a job's status record; absence is `NotFound`, never a
    /// synthesized "in progress" record.
    pub async fn job_status(&self, job_id: &str) -> Result<JobStatusRecord, JobStatusError> {
        match self
            .status
            .get(job_id)
            .await
            .map_err(JobStatusError::Store)?
        {
            Some(record) => Ok(record),
            None => Err(JobStatusError::NotFound(job_id.to_string())),
        }
    }
}
