//! PgLookupQueue writes one durable outbox row per dispatched job.
//!
//! Skips automatically when CURIO_DATABASE_URL is absent.

use curio_import::{ImportRecord, ItemStatus};
use curio_jobs::{JobQueue, LookupJob, PgLookupQueue, LOOKUP_JOB_TYPE};
use sqlx::Row;
use uuid::Uuid;

fn record(external_id: i64) -> ImportRecord {
    ImportRecord {
        external_id,
        status: ItemStatus::Wished,
        quantity: 1,
        score: String::new(),
        payment_date: None,
        shipping_date: None,
        collecting_date: None,
        price: String::new(),
        shop: String::new(),
        shipping_method: String::new(),
        note: "import note".to_string(),
        order_marker: None,
        order_date: None,
    }
}

#[tokio::test]
async fn enqueue_inserts_a_lookup_jobs_row_with_the_payload() {
    let url = match std::env::var(curio_db::ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: CURIO_DATABASE_URL not set");
            return;
        }
    };
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("connect");
    curio_db::migrate(&pool).await.expect("migrate");

    let user_id = ((Uuid::new_v4().as_u128() >> 64) as u64 >> 1) as i64;
    let queue = PgLookupQueue::new(pool.clone());
    let job = LookupJob::new(user_id, vec![record(999_999), record(888_888)]);
    let job_id = queue.enqueue(&job).await.expect("enqueue");
    let job_uuid: Uuid = job_id.parse().expect("job id is a uuid");

    let row = sqlx::query(
        "select job_type, user_id, payload from lookup_jobs where job_id = $1",
    )
    .bind(job_uuid)
    .fetch_one(&pool)
    .await
    .expect("outbox row present");

    assert_eq!(row.try_get::<String, _>("job_type").unwrap(), LOOKUP_JOB_TYPE);
    assert_eq!(row.try_get::<i64, _>("user_id").unwrap(), user_id);
    let payload: serde_json::Value = row.try_get("payload").unwrap();
    let rows = payload.as_array().expect("payload is the record array");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["external_id"], 999_999);
    assert_eq!(rows[0]["note"], "import note");

    // Leave the table clean; the worker normally deletes claimed rows.
    sqlx::query("delete from lookup_jobs where job_id = $1")
        .bind(job_uuid)
        .execute(&pool)
        .await
        .expect("cleanup");
}
