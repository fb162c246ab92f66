pub mod schema;

pub use schema::Dataset;

use crate::fetch::{GridSource, RawGrid};
use crate::normalize::{parse_amount, parse_date_batch};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

use schema::{TableSchema, DATE_ALIASES};

/// Whether a table actually came back from the collaborator. Callers compute
/// against the (possibly empty) table either way; the reason is only for
/// observability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum SourceStatus {
    Loaded,
    Unavailable(String),
}

impl SourceStatus {
    pub fn is_available(&self) -> bool {
        matches!(self, SourceStatus::Loaded)
    }
}

/// A typed table plus the status of the load that produced it.
#[derive(Debug, Clone)]
pub struct TableLoad {
    pub table: NormalizedTable,
    pub status: SourceStatus,
}

/// A worksheet after normalization: canonical numeric columns parsed from
/// currency text, every original column kept as raw text, and (for dated
/// tables) one `NaiveDate` per surviving row. Rows whose date failed both
/// parse passes are already gone.
#[derive(Debug, Clone)]
pub struct NormalizedTable {
    name: &'static str,
    len: usize,
    dates: Vec<NaiveDate>,
    numbers: HashMap<&'static str, Vec<f64>>,
    text: HashMap<String, Vec<String>>,
}

impl NormalizedTable {
    pub fn empty(name: &'static str) -> Self {
        Self {
            name,
            len: 0,
            dates: Vec::new(),
            numbers: HashMap::new(),
            text: HashMap::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Canonical numeric column; empty slice when the schema never declared
    /// the field (distinct from a declared-but-missing column, which is
    /// default-filled at load time).
    pub fn numbers(&self, field: &str) -> &[f64] {
        self.numbers.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Raw text column by original header or canonical field name.
    pub fn text(&self, column: &str) -> Option<&[String]> {
        self.text.get(column).map(Vec::as_slice)
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn date(&self, row: usize) -> Option<NaiveDate> {
        self.dates.get(row).copied()
    }

    /// The most recent row is by convention the last one the upstream job
    /// appended.
    pub fn last_number(&self, field: &str) -> Option<f64> {
        self.numbers(field).last().copied()
    }

    pub fn last_text(&self, column: &str) -> Option<&str> {
        self.text(column)?.last().map(String::as_str)
    }
}

/// Load one dataset through the collaborator and normalize it.
///
/// Every retrieval failure — network, missing source key, empty worksheet —
/// comes back as an empty table with an `Unavailable` status. Callers must
/// treat "empty" as the uniform not-available signal; nothing at this layer
/// ever propagates an error.
pub fn load(
    source: &dyn GridSource,
    dataset: Dataset,
    source_key: &str,
    worksheet: &str,
) -> TableLoad {
    let spec = dataset.schema();
    match source.fetch_grid(source_key, worksheet) {
        Ok(grid) => {
            let table = normalize_grid(&grid, spec);
            debug!(
                table = spec.name,
                rows = table.len(),
                "loaded and normalized"
            );
            TableLoad {
                table,
                status: SourceStatus::Loaded,
            }
        }
        Err(err) => {
            warn!(table = spec.name, %err, "source unavailable, substituting empty table");
            TableLoad {
                table: NormalizedTable::empty(spec.name),
                status: SourceStatus::Unavailable(err.to_string()),
            }
        }
    }
}

/// Pure half of the loader: deterministic for identical grids.
pub fn normalize_grid(grid: &RawGrid, spec: &TableSchema) -> NormalizedTable {
    // Resolve the date column and decide which rows survive.
    let date_col = if spec.dated {
        DATE_ALIASES
            .iter()
            .find_map(|alias| grid.headers.iter().position(|h| h == alias))
    } else {
        None
    };
    if spec.dated && date_col.is_none() && !grid.rows.is_empty() {
        warn!(table = spec.name, "no recognized date column in header row");
    }

    let (keep, dates): (Vec<usize>, Vec<NaiveDate>) = match date_col {
        Some(col) => {
            let raw: Vec<String> = grid
                .rows
                .iter()
                .map(|r| r.get(col).cloned().unwrap_or_default())
                .collect();
            let parsed = parse_date_batch(&raw);
            let dropped = parsed.iter().filter(|d| d.is_none()).count();
            if dropped > 0 {
                debug!(table = spec.name, dropped, "dropped rows with unparseable dates");
            }
            parsed
                .into_iter()
                .enumerate()
                .filter_map(|(i, d)| d.map(|d| (i, d)))
                .unzip()
        }
        None => ((0..grid.rows.len()).collect(), Vec::new()),
    };

    // Keep every original column as raw text, filtered to surviving rows.
    let mut text: HashMap<String, Vec<String>> = HashMap::new();
    for (col, header) in grid.headers.iter().enumerate() {
        if header.is_empty() {
            continue;
        }
        let values: Vec<String> = keep
            .iter()
            .map(|&i| grid.rows[i].get(col).cloned().unwrap_or_default())
            .collect();
        text.insert(header.clone(), values);
    }

    // Resolve declared numeric fields: first alias present wins; a field with
    // no matching column is filled with its documented default.
    let mut numbers: HashMap<&'static str, Vec<f64>> = HashMap::new();
    for field in spec.numeric {
        let resolved = field
            .aliases
            .iter()
            .find_map(|alias| text.get(*alias))
            .map(|col| col.iter().map(|v| parse_amount(v)).collect())
            .unwrap_or_else(|| {
                debug!(
                    table = spec.name,
                    field = field.canonical,
                    default = field.default,
                    "no alias matched, filling with default"
                );
                vec![field.default; keep.len()]
            });
        numbers.insert(field.canonical, resolved);
    }

    // Resolve declared text fields under their canonical names.
    for field in spec.text {
        let resolved = field
            .aliases
            .iter()
            .find_map(|alias| text.get(*alias).cloned())
            .unwrap_or_else(|| vec![String::new(); keep.len()]);
        text.insert(field.canonical.to_string(), resolved);
    }

    NormalizedTable {
        name: spec.name,
        len: keep.len(),
        dates,
        numbers,
        text,
    }
}
