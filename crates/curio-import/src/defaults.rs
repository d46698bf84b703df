//! Empty-string defaulting policy for decimal fields.
//!
//! Spreadsheet exports encode "no value" as an empty cell. The stored form
//! is never empty: scores default to `"0.0"`, prices to `"0.00"`. Keeping
//! this as a named policy (instead of inline checks scattered through the
//! engine) makes the behavior independently testable.

/// Default used when a score cell is empty or whitespace-only.
pub const DEFAULT_SCORE: &str = "0.0";

/// Default used when a price cell is empty or whitespace-only.
pub const DEFAULT_PRICE: &str = "0.00";

/// Stored score for a raw score cell. Non-empty values pass through unchanged.
pub fn score_or_default(raw: &str) -> String {
    if raw.trim().is_empty() {
        DEFAULT_SCORE.to_string()
    } else {
        raw.to_string()
    }
}

/// Stored price for a raw price cell. Non-empty values pass through unchanged.
pub fn price_or_default(raw: &str) -> String {
    if raw.trim().is_empty() {
        DEFAULT_PRICE.to_string()
    } else {
        raw.to_string()
    }
}
