//! CSV ingestion for collection spreadsheet exports.
//!
//! Read side only: converts a CSV file (or in-memory CSV text) into
//! [`ImportRecord`] values. No validation beyond field shape, no
//! reconciliation, no persistence; callers hand the batch to the engine.
//!
//! ## Column contract (case-insensitive, order-independent)
//!
//! | Column            | Required | Notes                                   |
//! |-------------------|----------|-----------------------------------------|
//! | `external_id`     | yes      | positive integer catalog id             |
//! | `status`          | yes      | `Owned` / `Ordered` / `Sold` / `Wished` |
//! | `quantity`        | no       | defaults to 1 when empty                |
//! | `score`           | no       | decimal string, may be empty            |
//! | `payment_date`    | no       |                                         |
//! | `shipping_date`   | no       |                                         |
//! | `collecting_date` | no       |                                         |
//! | `price`           | no       | decimal string, may be empty            |
//! | `shop`            | no       |                                         |
//! | `shipping_method` | no       |                                         |
//! | `note`            | no       |                                         |
//! | `order_marker`    | no       | opaque grouping token                   |
//! | `order_date`      | no       |                                         |
//!
//! Rows with an unparseable `external_id`, `status`, or `quantity` are
//! reported in [`CsvBatch::rejected`] and excluded from the batch; only
//! structural problems (IO, missing required header) are returned as `Err`.

use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::path::Path;

use crate::types::{ImportRecord, ItemStatus};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Structural errors produced by CSV parsing.
#[derive(Debug)]
pub enum CsvIngestError {
    /// An I/O or CSV-library error.
    Io(String),
    /// The header row is missing a required column.
    MissingHeader(&'static str),
}

impl fmt::Display for CsvIngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CsvIngestError::Io(msg) => write!(f, "csv io error: {msg}"),
            CsvIngestError::MissingHeader(col) => {
                write!(f, "csv missing required header column: '{col}'")
            }
        }
    }
}

impl std::error::Error for CsvIngestError {}

// ---------------------------------------------------------------------------
// Batch result
// ---------------------------------------------------------------------------

/// A row excluded from the batch, with the field that failed to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRow {
    /// 1-based data-row number (header not counted).
    pub row: usize,
    pub field: &'static str,
    pub raw: String,
}

/// Parsed batch plus per-row rejections.
#[derive(Debug, Default)]
pub struct CsvBatch {
    pub records: Vec<ImportRecord>,
    pub rejected: Vec<RejectedRow>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse a CSV export file at `path`.
pub fn parse_csv_file(path: &Path) -> Result<CsvBatch, CsvIngestError> {
    let file = std::fs::File::open(path).map_err(|e| CsvIngestError::Io(e.to_string()))?;
    parse_csv_reader(file)
}

/// Parse CSV text already in memory (tests, request bodies).
pub fn parse_csv_str(text: &str) -> Result<CsvBatch, CsvIngestError> {
    parse_csv_reader(text.as_bytes())
}

fn parse_csv_reader<R: Read>(reader: R) -> Result<CsvBatch, CsvIngestError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| CsvIngestError::Io(e.to_string()))?
        .clone();
    let col: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim().to_ascii_lowercase(), i))
        .collect();

    if !col.contains_key("external_id") {
        return Err(CsvIngestError::MissingHeader("external_id"));
    }
    if !col.contains_key("status") {
        return Err(CsvIngestError::MissingHeader("status"));
    }

    let get = |rec: &csv::StringRecord, name: &str| -> String {
        col.get(name)
            .and_then(|&i| rec.get(i))
            .unwrap_or("")
            .to_string()
    };
    let get_opt = |rec: &csv::StringRecord, name: &str| -> Option<String> {
        let v = get(rec, name);
        if v.is_empty() {
            None
        } else {
            Some(v)
        }
    };

    let mut batch = CsvBatch::default();
    for (idx, result) in rdr.records().enumerate() {
        let row = idx + 1;
        let rec = result.map_err(|e| CsvIngestError::Io(e.to_string()))?;

        let raw_id = get(&rec, "external_id");
        let external_id = match raw_id.parse::<i64>() {
            Ok(v) => v,
            Err(_) => {
                batch.rejected.push(RejectedRow {
                    row,
                    field: "external_id",
                    raw: raw_id,
                });
                continue;
            }
        };

        let raw_status = get(&rec, "status");
        let status = match ItemStatus::parse(&raw_status) {
            Some(s) => s,
            None => {
                batch.rejected.push(RejectedRow {
                    row,
                    field: "status",
                    raw: raw_status,
                });
                continue;
            }
        };

        let raw_quantity = get(&rec, "quantity");
        let quantity = if raw_quantity.is_empty() {
            1
        } else {
            match raw_quantity.parse::<i32>() {
                Ok(q) => q,
                Err(_) => {
                    batch.rejected.push(RejectedRow {
                        row,
                        field: "quantity",
                        raw: raw_quantity,
                    });
                    continue;
                }
            }
        };

        batch.records.push(ImportRecord {
            external_id,
            status,
            quantity,
            score: get(&rec, "score"),
            payment_date: get_opt(&rec, "payment_date"),
            shipping_date: get_opt(&rec, "shipping_date"),
            collecting_date: get_opt(&rec, "collecting_date"),
            price: get(&rec, "price"),
            shop: get(&rec, "shop"),
            shipping_method: get(&rec, "shipping_method"),
            note: get(&rec, "note"),
            order_marker: get_opt(&rec, "order_marker"),
            order_date: get_opt(&rec, "order_date"),
        });
    }

    Ok(batch)
}
