//! In-process implementations of the queue and status-store boundaries.
//!
//! [`MokaStatusStore`] suits embedders that dispatch and poll within one
//! process: a moka cache with per-entry TTL gives the "ephemeral,
//! auto-evicting" semantics the status contract requires without external
//! infrastructure. Anything polled across processes uses
//! [`crate::PgStatusStore`] instead.
//!
//! [`MemoryJobQueue`] is a test double: it records enqueued jobs in order
//! and exposes them for assertions.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use moka::sync::Cache;
use moka::Expiry;
use uuid::Uuid;

use crate::queue::{JobQueue, LookupJob, QueueError};
use crate::status::{status_key, JobStatusRecord, JobStatusStore, StatusStoreError};

// ---------------------------------------------------------------------------
// MokaStatusStore
// ---------------------------------------------------------------------------

/// Per-entry TTL taken from the value written alongside each record.
///
/// Overwrites restart the window with the new entry's TTL; without the
/// update hook moka would keep the original entry's remaining time.
struct PerEntryTtl;

impl Expiry<String, (JobStatusRecord, Duration)> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &(JobStatusRecord, Duration),
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.1)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &(JobStatusRecord, Duration),
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.1)
    }
}

/// In-process TTL-bounded status store.
pub struct MokaStatusStore {
    cache: Cache<String, (JobStatusRecord, Duration)>,
}

impl MokaStatusStore {
    pub fn new() -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(10_000)
                .expire_after(PerEntryTtl)
                .build(),
        }
    }
}

impl Default for MokaStatusStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl JobStatusStore for MokaStatusStore {
    async fn set_with_ttl(
        &self,
        record: &JobStatusRecord,
        ttl: Duration,
    ) -> Result<(), StatusStoreError> {
        self.cache
            .insert(status_key(&record.job_id), (record.clone(), ttl));
        Ok(())
    }

    async fn get(&self, job_id: &str) -> Result<Option<JobStatusRecord>, StatusStoreError> {
        Ok(self.cache.get(&status_key(job_id)).map(|(r, _)| r))
    }
}

// ---------------------------------------------------------------------------
// MemoryJobQueue
// ---------------------------------------------------------------------------

/// In-memory queue double: records jobs in enqueue order.
#[derive(Default)]
pub struct MemoryJobQueue {
    jobs: Mutex<Vec<(String, LookupJob)>>,
}

impl MemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of `(job_id, job)` pairs in enqueue order.
    pub fn jobs(&self) -> Vec<(String, LookupJob)> {
        self.jobs.lock().expect("queue mutex poisoned").clone()
    }
}

#[async_trait::async_trait]
impl JobQueue for MemoryJobQueue {
    async fn enqueue(&self, job: &LookupJob) -> Result<String, QueueError> {
        let job_id = Uuid::new_v4().to_string();
        self.jobs
            .lock()
            .map_err(|_| QueueError::Backend("queue mutex poisoned".to_string()))?
            .push((job_id.clone(), job.clone()));
        Ok(job_id)
    }
}
