//! Postgres-backed status store: one `job_status` row per dispatched job.
//!
//! This is the shipped cross-process backing for [`JobStatusStore`]: the
//! importing process writes the initial record, the out-of-process worker
//! overwrites it on completion, and any later process can poll it. Expiry
//! is enforced on read (`expires_at > now()`); rows past their expiry are
//! also purged opportunistically on every write, so the table stays
//! bounded without a reaper.

use std::time::Duration;

use sqlx::{PgPool, Row};

use crate::status::{status_key, JobStatusRecord, JobStatusStore, StatusStoreError};

/// Shared status store over the `job_status` table.
#[derive(Clone)]
pub struct PgStatusStore {
    pool: PgPool,
}

impl PgStatusStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl JobStatusStore for PgStatusStore {
    async fn set_with_ttl(
        &self,
        record: &JobStatusRecord,
        ttl: Duration,
    ) -> Result<(), StatusStoreError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| StatusStoreError::Backend(format!("ttl out of range: {e}")))?;
        let expires_at = chrono::Utc::now() + ttl;

        sqlx::query("delete from job_status where expires_at <= now()")
            .execute(&self.pool)
            .await
            .map_err(|e| StatusStoreError::Backend(e.to_string()))?;

        sqlx::query(
            r#"
            insert into job_status (
              status_key, job_id, status, finished, created_at, expires_at
            ) values ($1, $2, $3, $4, $5, $6)
            on conflict (status_key) do update set
              status     = excluded.status,
              finished   = excluded.finished,
              expires_at = excluded.expires_at
            "#,
        )
        .bind(status_key(&record.job_id))
        .bind(&record.job_id)
        .bind(&record.status)
        .bind(record.finished)
        .bind(record.created_at)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StatusStoreError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn get(&self, job_id: &str) -> Result<Option<JobStatusRecord>, StatusStoreError> {
        let row = sqlx::query(
            r#"
            select job_id, status, finished, created_at
            from job_status
            where status_key = $1
              and expires_at > now()
            "#,
        )
        .bind(status_key(job_id))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StatusStoreError::Backend(e.to_string()))?;

        row.map(|row| {
            Ok(JobStatusRecord {
                job_id: row
                    .try_get("job_id")
                    .map_err(|e: sqlx::Error| StatusStoreError::Backend(e.to_string()))?,
                status: row
                    .try_get("status")
                    .map_err(|e: sqlx::Error| StatusStoreError::Backend(e.to_string()))?,
                finished: row
                    .try_get("finished")
                    .map_err(|e: sqlx::Error| StatusStoreError::Backend(e.to_string()))?,
                created_at: row
                    .try_get("created_at")
                    .map_err(|e: sqlx::Error| StatusStoreError::Backend(e.to_string()))?,
            })
        })
        .transpose()
    }
}
