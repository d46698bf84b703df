//! Batch queries backing one reconciliation pass.
//!
//! Read queries here are the only store work on the import request's
//! critical path; each is a single round trip over the whole batch
//! (`= any($n)`), never one query per record. Empty inputs short-circuit
//! without touching the pool.

use std::collections::{BTreeSet, HashMap, HashSet};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::{PgPool, Row};

use curio_import::{NewCollectionEntry, NewOrderAggregate, ReleaseRef, ResolvedCatalogItem};

// ---------------------------------------------------------------------------
// Catalog matcher
// ---------------------------------------------------------------------------

/// Resolve external catalog ids to items within one source namespace.
///
/// Input may contain duplicates; they are de-duplicated before the lookup.
/// Ids with no match are implicitly the caller's "unknown" set (computed by
/// set difference against the input).
pub async fn match_catalog_items(
    pool: &PgPool,
    source: &str,
    external_ids: &[i64],
) -> Result<Vec<ResolvedCatalogItem>> {
    let unique: Vec<i64> = external_ids
        .iter()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if unique.is_empty() {
        return Ok(Vec::new());
    }

    let rows = sqlx::query(
        r#"
        select item_id, external_id, title
        from catalog_items
        where source = $1
          and external_id = any($2)
        order by external_id asc
        "#,
    )
    .bind(source)
    .bind(unique)
    .fetch_all(pool)
    .await
    .context("match_catalog_items query failed")?;

    rows.into_iter()
        .map(|row| {
            Ok(ResolvedCatalogItem {
                item_id: row.try_get("item_id")?,
                external_id: row.try_get("external_id")?,
                title: row.try_get("title")?,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Collection membership
// ---------------------------------------------------------------------------

/// Item ids already present in `user_id`'s collection, as a set.
///
/// This is what makes re-importing the same export idempotent: rows whose
/// item comes back here are skipped by the engine, never re-inserted.
pub async fn owned_item_ids(
    pool: &PgPool,
    user_id: i64,
    item_ids: &[i64],
) -> Result<HashSet<i64>> {
    if item_ids.is_empty() {
        return Ok(HashSet::new());
    }

    let rows = sqlx::query(
        r#"
        select distinct item_id
        from collection_entries
        where user_id = $1
          and item_id = any($2)
        "#,
    )
    .bind(user_id)
    .bind(item_ids.to_vec())
    .fetch_all(pool)
    .await
    .context("owned_item_ids query failed")?;

    rows.into_iter()
        .map(|row| row.try_get::<i64, _>("item_id").map_err(Into::into))
        .collect()
}

// ---------------------------------------------------------------------------
// Release resolver
// ---------------------------------------------------------------------------

/// Most recent release per item.
///
/// Tie-break is deterministic: the release with the latest date wins; when
/// dates tie (or are absent), the most recently-created release row wins.
/// Items with no releases are absent from the map.
pub async fn latest_releases(
    pool: &PgPool,
    item_ids: &[i64],
) -> Result<HashMap<i64, ReleaseRef>> {
    if item_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query(
        r#"
        select distinct on (item_id) item_id, release_id, release_date
        from item_releases
        where item_id = any($1)
        order by item_id, release_date desc nulls last, release_id desc
        "#,
    )
    .bind(item_ids.to_vec())
    .fetch_all(pool)
    .await
    .context("latest_releases query failed")?;

    let mut map = HashMap::with_capacity(rows.len());
    for row in rows {
        let item_id: i64 = row.try_get("item_id")?;
        let release_id: i64 = row.try_get("release_id")?;
        let release_date: Option<NaiveDate> = row.try_get("release_date")?;
        map.insert(
            item_id,
            ReleaseRef {
                release_id,
                release_date,
            },
        );
    }
    Ok(map)
}

// ---------------------------------------------------------------------------
// Transactional writer
// ---------------------------------------------------------------------------

/// Atomically persist synthesized orders and ready collection entries.
///
/// Orders are inserted first so entry foreign keys resolve; on any failure
/// the transaction rolls back and no partial writes are visible. This call
/// is NOT idempotent on its own; idempotence comes from the membership
/// check having run immediately before, within the same request.
///
/// Returns the number of entries inserted.
pub async fn insert_orders_and_entries(
    pool: &PgPool,
    orders: &[NewOrderAggregate],
    entries: &[NewCollectionEntry],
) -> Result<u64> {
    if orders.is_empty() && entries.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await.context("begin import tx failed")?;

    for order in orders {
        sqlx::query(
            r#"
            insert into order_aggregates (
              order_id, user_id, title, shop, release_month,
              payment_date, shipping_date, collecting_date, shipping_method
            ) values ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(order.order_id)
        .bind(order.user_id)
        .bind(&order.title)
        .bind(&order.shop)
        .bind(order.release_month)
        .bind(order.payment_date)
        .bind(order.shipping_date)
        .bind(order.collecting_date)
        .bind(&order.shipping_method)
        .execute(&mut *tx)
        .await
        .context("insert order_aggregates failed")?;
    }

    for entry in entries {
        sqlx::query(
            r#"
            insert into collection_entries (
              user_id, item_id, status, quantity, score, price, shop,
              shipping_method, note, payment_date, shipping_date,
              collecting_date, order_id, release_id, release_date
            ) values (
              $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15
            )
            "#,
        )
        .bind(entry.user_id)
        .bind(entry.item_id)
        .bind(entry.status.as_str())
        .bind(entry.quantity)
        .bind(&entry.score)
        .bind(&entry.price)
        .bind(&entry.shop)
        .bind(&entry.shipping_method)
        .bind(&entry.note)
        .bind(entry.payment_date)
        .bind(entry.shipping_date)
        .bind(entry.collecting_date)
        .bind(entry.order_id)
        .bind(entry.release_id)
        .bind(entry.release_date)
        .execute(&mut *tx)
        .await
        .context("insert collection_entries failed")?;
    }

    tx.commit().await.context("commit import tx failed")?;
    Ok(entries.len() as u64)
}
