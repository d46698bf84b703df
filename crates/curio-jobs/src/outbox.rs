//! Postgres-backed durable queue: one `lookup_jobs` row per dispatched job.
//!
//! Outbox discipline: this side only inserts. The out-of-process worker
//! claims rows, does the external fetching, writes the status record, and
//! deletes the row. Completed and failed jobs are removed, not retained.

use sqlx::PgPool;
use uuid::Uuid;

use crate::queue::{JobQueue, LookupJob, QueueError};

/// Durable lookup queue over the `lookup_jobs` table.
#[derive(Clone)]
pub struct PgLookupQueue {
    pool: PgPool,
}

impl PgLookupQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl JobQueue for PgLookupQueue {
    async fn enqueue(&self, job: &LookupJob) -> Result<String, QueueError> {
        let job_id = Uuid::new_v4();
        let payload = serde_json::to_value(&job.records)
            .map_err(|e| QueueError::Backend(format!("payload serialization: {e}")))?;

        sqlx::query(
            r#"
            insert into lookup_jobs (job_id, job_type, user_id, payload)
            values ($1, $2, $3, $4)
            "#,
        )
        .bind(job_id)
        .bind(&job.job_type)
        .bind(job.user_id)
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(|e| QueueError::Backend(e.to_string()))?;

        Ok(job_id.to_string())
    }
}
