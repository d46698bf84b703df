//! Durable work-queue boundary.
//!
//! This module defines only the job payload, the queue trait, and its error
//! type. No concrete backends live here.

use std::fmt;

use serde::{Deserialize, Serialize};

use curio_import::ImportRecord;

/// Type tag carried by every external-lookup job payload.
pub const LOOKUP_JOB_TYPE: &str = "external-lookup";

/// One durable work item: the unknown-item rows of a single import batch.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LookupJob {
    /// Always [`LOOKUP_JOB_TYPE`] for jobs produced by this engine.
    pub job_type: String,
    pub user_id: i64,
    /// The records whose external ids matched nothing, untouched.
    pub records: Vec<ImportRecord>,
}

impl LookupJob {
    pub fn new(user_id: i64, records: Vec<ImportRecord>) -> Self {
        Self {
            job_type: LOOKUP_JOB_TYPE.to_string(),
            user_id,
            records,
        }
    }
}

/// Errors an enqueue may surface.
///
/// Enqueue failure is fatal to the dispatch call; retry policy belongs to
/// the caller, never to the queue.
#[derive(Debug)]
pub enum QueueError {
    /// The backing store rejected or failed the enqueue.
    Backend(String),
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueError::Backend(msg) => write!(f, "queue backend error: {msg}"),
        }
    }
}

impl std::error::Error for QueueError {}

/// Enqueue-with-payload returning an opaque job id.
///
/// Backends are expected to remove completed/failed jobs rather than retain
/// them indefinitely; this trait only covers the producing side.
#[async_trait::async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, job: &LookupJob) -> Result<String, QueueError>;
}

#[async_trait::async_trait]
impl<T: JobQueue + ?Sized> JobQueue for std::sync::Arc<T> {
    async fn enqueue(&self, job: &LookupJob) -> Result<String, QueueError> {
        (**self).enqueue(job).await
    }
}
