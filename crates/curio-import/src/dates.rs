//! Date normalization for heterogeneous spreadsheet exports.
//!
//! Export generations disagree on date formatting, so the normalizer accepts
//! a fixed set of **unambiguous** formats and maps everything else to `None`:
//!
//! | Accepted                     | Example                |
//! |------------------------------|------------------------|
//! | ISO date                     | `2023-04-01`           |
//! | Slash ISO                    | `2023/04/01`           |
//! | ISO datetime (opt. `Z`)      | `2023-04-01T09:30:00Z` |
//! | Space-separated datetime     | `2023-04-01 09:30:00`  |
//! | Month-name forms (English)   | `April 1, 2023`, `1 Apr 2023` |
//!
//! Day/month-ambiguous forms such as `03/04/2023` are deliberately NOT
//! parsed: a dropped date is recoverable, a swapped day and month is silent
//! corruption. Unparseable, empty, or whitespace-only input never raises;
//! it normalizes to `None`.

use chrono::{NaiveDate, NaiveDateTime};

use crate::types::ImportRecord;

/// Date-only formats tried in order.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

/// Datetime formats tried in order; the date part is kept, time discarded.
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Normalize one raw date string to a canonical calendar date.
///
/// Returns `None` for `None`, empty, whitespace-only, ambiguous, or
/// unparseable input.
pub fn normalize_date(raw: Option<&str>) -> Option<NaiveDate> {
    let s = raw?.trim();
    if s.is_empty() {
        return None;
    }
    // A trailing UTC marker on datetime forms is tolerated.
    let s = s.strip_suffix('Z').unwrap_or(s);

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    None
}

/// Canonical dates derived from one [`ImportRecord`].
///
/// The record itself is never mutated; this is the derived view the engine
/// and the order synthesizer work from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NormalizedDates {
    pub payment: Option<NaiveDate>,
    pub shipping: Option<NaiveDate>,
    pub collecting: Option<NaiveDate>,
    pub order: Option<NaiveDate>,
}

impl NormalizedDates {
    pub fn of(record: &ImportRecord) -> Self {
        Self {
            payment: normalize_date(record.payment_date.as_deref()),
            shipping: normalize_date(record.shipping_date.as_deref()),
            collecting: normalize_date(record.collecting_date.as_deref()),
            order: normalize_date(record.order_date.as_deref()),
        }
    }
}
