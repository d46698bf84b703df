//! End-to-end reconciliation over a parsed spreadsheet export, no store
//! involved: CSV text -> ImportRecords -> reconcile plan.

use std::collections::{HashMap, HashSet};

use curio_import::csv_ingest::parse_csv_str;
use curio_import::{
    reconcile, ItemStatus, ReconcileInputs, ReleaseRef, ResolvedCatalogItem,
};

fn known(item_id: i64, external_id: i64, title: &str) -> ResolvedCatalogItem {
    ResolvedCatalogItem {
        item_id,
        external_id,
        title: title.to_string(),
    }
}

#[test]
fn csv_batch_partitions_and_groups_orders() {
    let csv = "\
external_id,status,quantity,score,price,shop,order_marker,payment_date
101,Ordered,1,,,GoodSmile,X,2024-01-05
102,Ordered,1,,,GoodSmile,X,
103,Ordered,1,,,GoodSmile,X,
104,Ordered,1,8.0,4500.00,AmiAmi,,
105,Owned,1,,,,,
666,Wished,1,,,,,
105,Owned,1,,,,,
";
    let batch = parse_csv_str(csv).expect("csv parses");
    assert!(batch.rejected.is_empty());
    assert_eq!(batch.records.len(), 7);

    // 666 is unknown to the catalog; item 5 (external 105) is already owned.
    let items = vec![
        known(1, 101, "Figma 101"),
        known(2, 102, "Figma 102"),
        known(3, 103, "Figma 103"),
        known(4, 104, "Scale 104"),
        known(5, 105, "Prize 105"),
    ];
    let owned = HashSet::from([5]);
    let releases = HashMap::from([(
        1,
        ReleaseRef {
            release_id: 900,
            release_date: chrono::NaiveDate::from_ymd_opt(2024, 7, 31),
        },
    )]);

    let plan = reconcile(
        &batch.records,
        &ReconcileInputs {
            user_id: 42,
            known_items: &items,
            owned_item_ids: &owned,
            releases: &releases,
        },
    );

    // Partition completeness by record identity.
    assert_eq!(plan.ready_to_insert.len(), 4);
    assert_eq!(plan.skipped_owned.len(), 2);
    assert_eq!(plan.needs_external_lookup.len(), 1);
    assert_eq!(
        plan.ready_to_insert.len() + plan.skipped_owned.len() + plan.needs_external_lookup.len(),
        batch.records.len()
    );
    assert_eq!(plan.needs_external_lookup[0].external_id, 666);
    assert_eq!(plan.needs_external_lookup[0].status, ItemStatus::Wished);

    // Three lines share marker X, one is marker-less: exactly 2 aggregates,
    // the first with 3 line items.
    assert_eq!(plan.orders_to_insert.len(), 2);
    let x_id = plan.orders_to_insert[0].order_id;
    let line_order_ids: Vec<_> = plan
        .ready_to_insert
        .iter()
        .filter(|e| e.status == ItemStatus::Ordered)
        .map(|e| e.order_id)
        .collect();
    assert_eq!(
        line_order_ids.iter().filter(|o| **o == Some(x_id)).count(),
        3
    );

    // Aggregate X takes its title from the first resolvable catalog title
    // and its release month from the first line item with a release date.
    assert_eq!(plan.orders_to_insert[0].title, "Figma 101");
    assert_eq!(
        plan.orders_to_insert[0].release_month,
        chrono::NaiveDate::from_ymd_opt(2024, 7, 1)
    );
    assert_eq!(
        plan.orders_to_insert[0].payment_date,
        chrono::NaiveDate::from_ymd_opt(2024, 1, 5)
    );

    // Defaulting applied on the way into entry payloads.
    let solo = plan
        .ready_to_insert
        .iter()
        .find(|e| e.item_id == 4)
        .expect("solo ordered row present");
    assert_eq!(solo.score, "8.0");
    assert_eq!(solo.price, "4500.00");
    let first = plan
        .ready_to_insert
        .iter()
        .find(|e| e.item_id == 1)
        .expect("first ordered row present");
    assert_eq!(first.score, "0.0");
    assert_eq!(first.price, "0.00");
    assert_eq!(first.release_id, Some(900));
}
