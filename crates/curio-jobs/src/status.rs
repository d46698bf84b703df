//! Ephemeral job-status records and the store boundary.
//!
//! A status record is created once at dispatch time and overwritten once by
//! the worker when the job completes; from this engine's perspective it is
//! read-only after dispatch. Records expire after a bounded TTL, and an
//! absent record is a distinct observable state ("not found"), not
//! equivalent to "in progress".

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status string written at dispatch time.
pub const STATUS_QUEUED: &str = "queued";

/// Key convention for the underlying key-value store.
pub fn status_key(job_id: &str) -> String {
    format!("job:{job_id}:status")
}

/// The pollable status of one dispatched lookup job.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct JobStatusRecord {
    pub job_id: String,
    /// Human-readable progress string ("queued", then whatever the worker
    /// reports).
    pub status: String,
    pub finished: bool,
    pub created_at: DateTime<Utc>,
}

impl JobStatusRecord {
    /// The record written at dispatch time: queued, not finished.
    pub fn queued(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            status: STATUS_QUEUED.to_string(),
            finished: false,
            created_at: Utc::now(),
        }
    }
}

/// Errors the status store may surface. Distinct from "not found", which is
/// a normal outcome reported by the reader, not a store failure.
#[derive(Debug)]
pub enum StatusStoreError {
    Backend(String),
}

impl fmt::Display for StatusStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusStoreError::Backend(msg) => write!(f, "status store error: {msg}"),
        }
    }
}

impl std::error::Error for StatusStoreError {}

/// Set-with-TTL / get over the ephemeral key-value store.
///
/// Implementations key records by [`status_key`]. Expired and never-written
/// keys are indistinguishable: both read back as `None`.
#[async_trait::async_trait]
pub trait JobStatusStore: Send + Sync {
    async fn set_with_ttl(
        &self,
        record: &JobStatusRecord,
        ttl: Duration,
    ) -> Result<(), StatusStoreError>;

    async fn get(&self, job_id: &str) -> Result<Option<JobStatusRecord>, StatusStoreError>;
}

#[async_trait::async_trait]
impl<T: JobStatusStore + ?Sized> JobStatusStore for std::sync::Arc<T> {
    async fn set_with_ttl(
        &self,
        record: &JobStatusRecord,
        ttl: Duration,
    ) -> Result<(), StatusStoreError> {
        (**self).set_with_ttl(record, ttl).await
    }

    async fn get(&self, job_id: &str) -> Result<Option<JobStatusRecord>, StatusStoreError> {
        (**self).get(job_id).await
    }
}
