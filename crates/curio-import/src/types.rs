//! Record and payload types for the import pipeline.
//!
//! `ImportRecord` is the shape of one source row exactly as received:
//! prices and scores stay decimal strings, dates stay raw strings. The
//! normalizer and defaulting policy derive canonical values later; nothing
//! mutates a record in place.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// ItemStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of an imported collection row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemStatus {
    Owned,
    Ordered,
    Sold,
    Wished,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Owned => "Owned",
            ItemStatus::Ordered => "Ordered",
            ItemStatus::Sold => "Sold",
            ItemStatus::Wished => "Wished",
        }
    }

    /// Parse a status string as it appears in spreadsheet exports
    /// (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "owned" => Some(ItemStatus::Owned),
            "ordered" => Some(ItemStatus::Ordered),
            "sold" => Some(ItemStatus::Sold),
            "wished" => Some(ItemStatus::Wished),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// ImportRecord
// ---------------------------------------------------------------------------

/// One source row of a bulk import, exactly as received.
///
/// Decimal fields (`score`, `price`) remain strings so the defaulting policy
/// and storage layer never round-trip through floats. Date fields remain raw
/// strings until [`crate::dates::NormalizedDates`] derives canonical values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImportRecord {
    /// Externally-issued catalog id (unique within the catalog source).
    pub external_id: i64,
    pub status: ItemStatus,
    pub quantity: i32,
    /// Rating score as a decimal string; may be empty (defaults to `"0.0"`).
    pub score: String,
    pub payment_date: Option<String>,
    pub shipping_date: Option<String>,
    pub collecting_date: Option<String>,
    /// Price as a decimal string; may be empty (defaults to `"0.00"`).
    pub price: String,
    pub shop: String,
    pub shipping_method: String,
    pub note: String,
    /// Opaque source-side token tying line items to one purchase order.
    pub order_marker: Option<String>,
    pub order_date: Option<String>,
}

impl ImportRecord {
    /// Reject malformed rows before reconciliation begins.
    ///
    /// Validation failures are terminal for the whole batch; they are never
    /// retried and nothing has been written when they surface.
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.external_id <= 0 {
            return Err(RecordError::NonPositiveExternalId(self.external_id));
        }
        if self.quantity <= 0 {
            return Err(RecordError::NonPositiveQuantity(self.quantity));
        }
        Ok(())
    }
}

/// Validation failures for a single [`ImportRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    NonPositiveExternalId(i64),
    NonPositiveQuantity(i32),
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::NonPositiveExternalId(id) => {
                write!(f, "external catalog id must be positive, got {id}")
            }
            RecordError::NonPositiveQuantity(q) => {
                write!(f, "quantity must be positive, got {q}")
            }
        }
    }
}

impl std::error::Error for RecordError {}

// ---------------------------------------------------------------------------
// Lookup results handed to the engine
// ---------------------------------------------------------------------------

/// A catalog item resolved from an external id by the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedCatalogItem {
    pub item_id: i64,
    pub external_id: i64,
    pub title: String,
}

/// Most recent release of an item, as resolved by the store.
///
/// Items with no releases simply have no entry; `release_date` may still be
/// absent when the release row carries no date.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReleaseRef {
    pub release_id: i64,
    pub release_date: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// Write payloads produced by the engine
// ---------------------------------------------------------------------------

/// A collection row ready for transactional insert.
#[derive(Clone, Debug, PartialEq)]
pub struct NewCollectionEntry {
    pub user_id: i64,
    pub item_id: i64,
    pub status: ItemStatus,
    pub quantity: i32,
    /// Already defaulted: never empty.
    pub score: String,
    /// Already defaulted: never empty.
    pub price: String,
    pub shop: String,
    pub shipping_method: String,
    pub note: String,
    pub payment_date: Option<NaiveDate>,
    pub shipping_date: Option<NaiveDate>,
    pub collecting_date: Option<NaiveDate>,
    /// Set for "Ordered" rows; references an aggregate created in the same batch.
    pub order_id: Option<Uuid>,
    pub release_id: Option<i64>,
    pub release_date: Option<NaiveDate>,
}

/// A purchase-order aggregate synthesized from one or more line items.
#[derive(Clone, Debug, PartialEq)]
pub struct NewOrderAggregate {
    /// App-generated so line items in the same batch can reference it
    /// before anything is written.
    pub order_id: Uuid,
    pub user_id: i64,
    pub title: String,
    pub shop: String,
    /// First day of the month of the earliest resolvable release date
    /// among the order's line items.
    pub release_month: Option<NaiveDate>,
    pub payment_date: Option<NaiveDate>,
    pub shipping_date: Option<NaiveDate>,
    pub collecting_date: Option<NaiveDate>,
    pub shipping_method: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(external_id: i64, quantity: i32) -> ImportRecord {
        ImportRecord {
            external_id,
            status: ItemStatus::Owned,
            quantity,
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

    #[test]
    fn status_parse_is_case_insensitive() {
        assert_eq!(ItemStatus::parse("ordered"), Some(ItemStatus::Ordered));
        assert_eq!(ItemStatus::parse(" OWNED "), Some(ItemStatus::Owned));
        assert_eq!(ItemStatus::parse("unknown"), None);
    }

    #[test]
    fn status_round_trips_through_as_str() {
        for s in [
            ItemStatus::Owned,
            ItemStatus::Ordered,
            ItemStatus::Sold,
            ItemStatus::Wished,
        ] {
            assert_eq!(ItemStatus::parse(s.as_str()), Some(s));
        }
    }

    #[test]
    fn validate_rejects_non_positive_ids_and_quantities() {
        assert!(record(1, 1).validate().is_ok());
        assert_eq!(
            record(0, 1).validate(),
            Err(RecordError::NonPositiveExternalId(0))
        );
        assert_eq!(
            record(5, 0).validate(),
            Err(RecordError::NonPositiveQuantity(0))
        );
        assert_eq!(
            record(5, -3).validate(),
            Err(RecordError::NonPositiveQuantity(-3))
        );
    }

    #[test]
    fn import_record_serializes_for_job_payloads() {
        let r = record(42, 2);
        let v = serde_json::to_value(&r).expect("serialize");
        assert_eq!(v["external_id"], 42);
        assert_eq!(v["status"], "Owned");
        let back: ImportRecord = serde_json::from_value(v).expect("deserialize");
        assert_eq!(back, r);
    }
}
