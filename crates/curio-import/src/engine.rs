//! Reconciliation engine: partition an import batch against the store's view.
//!
//! Inputs are pre-fetched by the caller (catalog matches, collection
//! membership, latest releases); this module is pure and deterministic.
//!
//! Partition guarantee: for any batch, the records behind
//! `ready_to_insert`, `needs_external_lookup`, and `skipped_owned` are
//! pairwise disjoint and together equal the input batch. Re-importing rows
//! for items the user already owns is expected and harmless; those rows are
//! skipped, not errors.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::dates::NormalizedDates;
use crate::defaults::{price_or_default, score_or_default};
use crate::orders::{synthesize_orders, OrderLine};
use crate::types::{
    ImportRecord, ItemStatus, NewCollectionEntry, NewOrderAggregate, ReleaseRef,
    ResolvedCatalogItem,
};

// ---------------------------------------------------------------------------
// Inputs / outputs
// ---------------------------------------------------------------------------

/// Store lookups the engine reconciles against.
#[derive(Debug)]
pub struct ReconcileInputs<'a> {
    pub user_id: i64,
    /// Catalog items resolved from the batch's external ids.
    pub known_items: &'a [ResolvedCatalogItem],
    /// Item ids already present in this user's collection.
    pub owned_item_ids: &'a HashSet<i64>,
    /// Most recent release per item, for items destined for insertion.
    pub releases: &'a HashMap<i64, ReleaseRef>,
}

/// The three-way partition of a batch, plus the write payloads.
#[derive(Clone, Debug, Default)]
pub struct ReconcilePlan {
    /// Entry payloads for records whose item is known and not yet owned.
    pub ready_to_insert: Vec<NewCollectionEntry>,
    /// Order aggregates synthesized for "Ordered" rows in `ready_to_insert`.
    pub orders_to_insert: Vec<NewOrderAggregate>,
    /// Records whose external id matched nothing, untouched.
    pub needs_external_lookup: Vec<ImportRecord>,
    /// Records silently skipped because the user already owns the item.
    pub skipped_owned: Vec<ImportRecord>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Reconcile a batch, generating random order ids.
pub fn reconcile(records: &[ImportRecord], inputs: &ReconcileInputs<'_>) -> ReconcilePlan {
    reconcile_with_keygen(records, inputs, Uuid::new_v4)
}

/// Reconcile a batch with an injected order-id generator (deterministic in
/// tests; [`reconcile`] passes `Uuid::new_v4`).
pub fn reconcile_with_keygen(
    records: &[ImportRecord],
    inputs: &ReconcileInputs<'_>,
    new_order_id: impl FnMut() -> Uuid,
) -> ReconcilePlan {
    let by_external: HashMap<i64, &ResolvedCatalogItem> = inputs
        .known_items
        .iter()
        .map(|it| (it.external_id, it))
        .collect();

    // Dates are normalized for every record up front, independent of how the
    // record is routed.
    let dates: Vec<NormalizedDates> = records.iter().map(NormalizedDates::of).collect();

    let mut plan = ReconcilePlan::default();

    // Route each record: unknown id -> external lookup, owned -> skipped,
    // everything else is destined for insertion.
    let mut to_insert: Vec<(usize, &ResolvedCatalogItem)> = Vec::new();
    for (i, record) in records.iter().enumerate() {
        match by_external.get(&record.external_id) {
            None => plan.needs_external_lookup.push(record.clone()),
            Some(item) if inputs.owned_item_ids.contains(&item.item_id) => {
                plan.skipped_owned.push(record.clone());
            }
            Some(item) => to_insert.push((i, item)),
        }
    }

    // Synthesize orders over the "Ordered" subset of the insertable rows.
    let order_lines: Vec<OrderLine<'_>> = to_insert
        .iter()
        .filter(|(i, _)| records[*i].status == ItemStatus::Ordered)
        .map(|&(i, item)| OrderLine {
            record: &records[i],
            dates: &dates[i],
            title: Some(item.title.as_str()),
            release_date: inputs
                .releases
                .get(&item.item_id)
                .and_then(|r| r.release_date),
        })
        .collect();
    let (aggregates, assignments) = synthesize_orders(inputs.user_id, &order_lines, new_order_id);
    plan.orders_to_insert = aggregates;

    let mut order_ids = assignments.into_iter();
    for &(i, item) in &to_insert {
        let record = &records[i];
        let release = inputs.releases.get(&item.item_id);
        let order_id = if record.status == ItemStatus::Ordered {
            order_ids.next()
        } else {
            None
        };
        plan.ready_to_insert.push(NewCollectionEntry {
            user_id: inputs.user_id,
            item_id: item.item_id,
            status: record.status,
            quantity: record.quantity,
            score: score_or_default(&record.score),
            price: price_or_default(&record.price),
            shop: record.shop.clone(),
            shipping_method: record.shipping_method.clone(),
            note: record.note.clone(),
            payment_date: dates[i].payment,
            shipping_date: dates[i].shipping,
            collecting_date: dates[i].collecting,
            order_id,
            release_id: release.map(|r| r.release_id),
            release_date: release.and_then(|r| r.release_date),
        });
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(external_id: i64, status: ItemStatus) -> ImportRecord {
        ImportRecord {
            external_id,
            status,
            quantity: 1,
            score: String::new(),
            payment_date: None,
            shipping_date: None,
            collecting_date: None,
            price: String::new(),
            shop: String::new(),
            shipping_method: String::new(),
            note: String::new(),
            order_marker: None,
            order_date: None,
        }
    }

    fn item(item_id: i64, external_id: i64, title: &str) -> ResolvedCatalogItem {
        ResolvedCatalogItem {
            item_id,
            external_id,
            title: title.to_string(),
        }
    }

    #[test]
    fn partitions_are_disjoint_and_cover_the_batch() {
        let records = vec![
            record(100, ItemStatus::Owned),   // known, not owned -> ready
            record(200, ItemStatus::Owned),   // known, owned -> skipped
            record(999_999, ItemStatus::Owned), // unknown -> lookup
        ];
        let known = vec![item(1, 100, "A"), item(2, 200, "B")];
        let owned = HashSet::from([2]);
        let releases = HashMap::new();
        let plan = reconcile(
            &records,
            &ReconcileInputs {
                user_id: 7,
                known_items: &known,
                owned_item_ids: &owned,
                releases: &releases,
            },
        );

        assert_eq!(plan.ready_to_insert.len(), 1);
        assert_eq!(plan.skipped_owned.len(), 1);
        assert_eq!(plan.needs_external_lookup.len(), 1);
        assert_eq!(
            plan.ready_to_insert.len()
                + plan.skipped_owned.len()
                + plan.needs_external_lookup.len(),
            records.len()
        );
        assert_eq!(plan.ready_to_insert[0].item_id, 1);
        assert_eq!(plan.skipped_owned[0].external_id, 200);
        assert_eq!(plan.needs_external_lookup[0].external_id, 999_999);
    }

    #[test]
    fn unknown_records_are_passed_through_untouched() {
        let mut r = record(999_999, ItemStatus::Ordered);
        r.score = "9.5".to_string();
        r.payment_date = Some("garbage".to_string());
        let records = vec![r.clone()];
        let plan = reconcile(
            &records,
            &ReconcileInputs {
                user_id: 7,
                known_items: &[],
                owned_item_ids: &HashSet::new(),
                releases: &HashMap::new(),
            },
        );
        assert_eq!(plan.needs_external_lookup, vec![r]);
        assert!(plan.ready_to_insert.is_empty());
        assert!(plan.orders_to_insert.is_empty());
    }

    #[test]
    fn empty_score_and_price_take_defaults_non_empty_pass_through() {
        let mut a = record(100, ItemStatus::Owned);
        a.score = String::new();
        a.price = String::new();
        let mut b = record(200, ItemStatus::Owned);
        b.score = "8.5".to_string();
        b.price = "12800.00".to_string();
        let known = vec![item(1, 100, "A"), item(2, 200, "B")];
        let plan = reconcile(
            &[a, b],
            &ReconcileInputs {
                user_id: 7,
                known_items: &known,
                owned_item_ids: &HashSet::new(),
                releases: &HashMap::new(),
            },
        );
        assert_eq!(plan.ready_to_insert[0].score, "0.0");
        assert_eq!(plan.ready_to_insert[0].price, "0.00");
        assert_eq!(plan.ready_to_insert[1].score, "8.5");
        assert_eq!(plan.ready_to_insert[1].price, "12800.00");
    }

    #[test]
    fn ordered_rows_get_order_ids_backfilled() {
        let mut a = record(100, ItemStatus::Ordered);
        a.order_marker = Some("X".to_string());
        let mut b = record(200, ItemStatus::Ordered);
        b.order_marker = Some("X".to_string());
        let c = record(300, ItemStatus::Owned);
        let known = vec![item(1, 100, "A"), item(2, 200, "B"), item(3, 300, "C")];
        let plan = reconcile(
            &[a, b, c],
            &ReconcileInputs {
                user_id: 7,
                known_items: &known,
                owned_item_ids: &HashSet::new(),
                releases: &HashMap::new(),
            },
        );
        assert_eq!(plan.orders_to_insert.len(), 1);
        let oid = plan.orders_to_insert[0].order_id;
        assert_eq!(plan.ready_to_insert[0].order_id, Some(oid));
        assert_eq!(plan.ready_to_insert[1].order_id, Some(oid));
        assert_eq!(plan.ready_to_insert[2].order_id, None);
    }

    #[test]
    fn orders_only_synthesized_for_insertable_rows() {
        // An "Ordered" record for an already-owned item must not create an
        // aggregate; an unknown "Ordered" record goes to lookup untouched.
        let mut owned_rec = record(100, ItemStatus::Ordered);
        owned_rec.order_marker = Some("X".to_string());
        let mut unknown_rec = record(999, ItemStatus::Ordered);
        unknown_rec.order_marker = Some("X".to_string());
        let known = vec![item(1, 100, "A")];
        let owned = HashSet::from([1]);
        let plan = reconcile(
            &[owned_rec, unknown_rec],
            &ReconcileInputs {
                user_id: 7,
                known_items: &known,
                owned_item_ids: &owned,
                releases: &HashMap::new(),
            },
        );
        assert!(plan.orders_to_insert.is_empty());
        assert_eq!(plan.skipped_owned.len(), 1);
        assert_eq!(plan.needs_external_lookup.len(), 1);
    }

    #[test]
    fn release_defaults_are_linked_when_resolved() {
        let records = vec![record(100, ItemStatus::Owned), record(200, ItemStatus::Owned)];
        let known = vec![item(1, 100, "A"), item(2, 200, "B")];
        let rel_date = chrono::NaiveDate::from_ymd_opt(2024, 6, 25).unwrap();
        let releases = HashMap::from([(
            1,
            ReleaseRef {
                release_id: 11,
                release_date: Some(rel_date),
            },
        )]);
        let plan = reconcile(
            &records,
            &ReconcileInputs {
                user_id: 7,
                known_items: &known,
                owned_item_ids: &HashSet::new(),
                releases: &releases,
            },
        );
        assert_eq!(plan.ready_to_insert[0].release_id, Some(11));
        assert_eq!(plan.ready_to_insert[0].release_date, Some(rel_date));
        // Absence of a release is "no release", not an error.
        assert_eq!(plan.ready_to_insert[1].release_id, None);
        assert_eq!(plan.ready_to_insert[1].release_date, None);
    }

    #[test]
    fn duplicate_external_ids_in_batch_resolve_to_the_same_item() {
        let records = vec![record(100, ItemStatus::Owned), record(100, ItemStatus::Owned)];
        let known = vec![item(1, 100, "A")];
        let plan = reconcile(
            &records,
            &ReconcileInputs {
                user_id: 7,
                known_items: &known,
                owned_item_ids: &HashSet::new(),
                releases: &HashMap::new(),
            },
        );
        assert_eq!(plan.ready_to_insert.len(), 2);
        assert!(plan.ready_to_insert.iter().all(|e| e.item_id == 1));
    }

    #[test]
    fn normalized_dates_flow_into_entries() {
        let mut r = record(100, ItemStatus::Owned);
        r.payment_date = Some("2023-04-01".to_string());
        r.shipping_date = Some("not a date".to_string());
        let known = vec![item(1, 100, "A")];
        let plan = reconcile(
            &[r],
            &ReconcileInputs {
                user_id: 7,
                known_items: &known,
                owned_item_ids: &HashSet::new(),
                releases: &HashMap::new(),
            },
        );
        let e = &plan.ready_to_insert[0];
        assert_eq!(
            e.payment_date,
            chrono::NaiveDate::from_ymd_opt(2023, 4, 1)
        );
        assert_eq!(e.shipping_date, None);
    }
}
