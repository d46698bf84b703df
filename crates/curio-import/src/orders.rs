//! Order synthesis: group "Ordered" line items into purchase-order aggregates.
//!
//! Grouping rules:
//! - Line items sharing a non-empty source-side order marker collapse into
//!   exactly one aggregate, in first-seen order.
//! - A marker-less line item is its own order (one aggregate per record).
//! - Shop, dates, and shipping method come from the first record in the
//!   group; the title comes from the first line item with a resolved catalog
//!   title, else a deterministic fallback embedding the marker (or the
//!   synthesized order id when there is no marker).
//!
//! Deterministic, pure logic. No IO.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use uuid::Uuid;

use crate::dates::NormalizedDates;
use crate::types::{ImportRecord, NewOrderAggregate};

/// One "Ordered" record together with its derived lookups.
#[derive(Clone, Copy, Debug)]
pub struct OrderLine<'a> {
    pub record: &'a ImportRecord,
    pub dates: &'a NormalizedDates,
    /// Title of the matched catalog item, when one resolved.
    pub title: Option<&'a str>,
    /// Most recent release date of the matched item, when one resolved.
    pub release_date: Option<NaiveDate>,
}

/// Synthesize order aggregates for `lines` and assign each line its order id.
///
/// The returned id vector is index-aligned with `lines`; lines sharing a
/// marker receive the same id. `new_order_id` is called once per distinct
/// group, in group order, so tests can inject a deterministic generator.
pub fn synthesize_orders(
    user_id: i64,
    lines: &[OrderLine<'_>],
    mut new_order_id: impl FnMut() -> Uuid,
) -> (Vec<NewOrderAggregate>, Vec<Uuid>) {
    // Groups in first-seen order; marker-less lines never share a group.
    let mut groups: Vec<(Option<&str>, Vec<usize>)> = Vec::new();
    let mut by_marker: HashMap<&str, usize> = HashMap::new();

    for (i, line) in lines.iter().enumerate() {
        let marker = line
            .record
            .order_marker
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty());
        match marker {
            Some(m) => {
                if let Some(&g) = by_marker.get(m) {
                    groups[g].1.push(i);
                } else {
                    by_marker.insert(m, groups.len());
                    groups.push((Some(m), vec![i]));
                }
            }
            None => groups.push((None, vec![i])),
        }
    }

    let mut aggregates = Vec::with_capacity(groups.len());
    let mut assignments = vec![Uuid::nil(); lines.len()];

    for (marker, members) in groups {
        let order_id = new_order_id();
        for &i in &members {
            assignments[i] = order_id;
        }

        let first = &lines[members[0]];
        let title = members
            .iter()
            .find_map(|&i| lines[i].title)
            .map(str::to_string)
            .unwrap_or_else(|| match marker {
                Some(m) => format!("Order {m}"),
                None => format!("Order {order_id}"),
            });
        let release_month = members
            .iter()
            .find_map(|&i| lines[i].release_date)
            .map(first_of_month);

        aggregates.push(NewOrderAggregate {
            order_id,
            user_id,
            title,
            shop: first.record.shop.clone(),
            release_month,
            // The order date stands in when no payment date was recorded.
            payment_date: first.dates.payment.or(first.dates.order),
            shipping_date: first.dates.shipping,
            collecting_date: first.dates.collecting,
            shipping_method: first.record.shipping_method.clone(),
        });
    }

    (aggregates, assignments)
}

fn first_of_month(d: NaiveDate) -> NaiveDate {
    d.with_day(1).unwrap_or(d)
}
