use crate::cache::TtlCache;
use csv::ReaderBuilder;
use reqwest::blocking::Client;
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Cursor;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// A worksheet exactly as the remote service returned it: the first row of the
/// export becomes the header, everything else is data. Cells are untyped
/// strings; typing happens in the loader.
#[derive(Debug, Clone)]
pub struct RawGrid {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Retrieval failures. The core never distinguishes these downstream — every
/// variant is downgraded to "no data" by the loader — but the reason stays
/// inspectable for logging.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("no spreadsheet id configured for source `{0}`")]
    UnknownSource(String),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("csv decode failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("worksheet `{0}` came back empty")]
    EmptyGrid(String),
}

/// The external spreadsheet collaborator. One call per (source, worksheet)
/// pair; implementations may block on I/O, nothing else in the pipeline does.
pub trait GridSource {
    fn fetch_grid(&self, source_key: &str, worksheet: &str) -> Result<RawGrid, FetchError>;
}

/// Decode a CSV body into a grid. `flexible` because hand-maintained sheets
/// routinely have ragged trailing columns; short rows are padded to the header
/// width so downstream indexing stays rectangular.
pub fn parse_csv_grid(body: &[u8], worksheet: &str) -> Result<RawGrid, FetchError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(Cursor::new(body));

    let mut records = rdr.records();
    let headers: Vec<String> = match records.next() {
        Some(first) => first?.iter().map(|s| s.trim().to_string()).collect(),
        None => return Err(FetchError::EmptyGrid(worksheet.to_string())),
    };

    let mut rows = Vec::new();
    for record in records {
        let record = record?;
        let mut row: Vec<String> = record.iter().map(|s| s.to_string()).collect();
        row.resize(headers.len(), String::new());
        rows.push(row);
    }

    Ok(RawGrid { headers, rows })
}

/// Fetches worksheets through the spreadsheet service's CSV export endpoint.
pub struct SheetsCsvSource {
    client: Client,
    /// Logical source key → remote spreadsheet id.
    sheet_ids: HashMap<String, String>,
}

impl SheetsCsvSource {
    pub fn new(sheet_ids: HashMap<String, String>) -> Self {
        Self {
            client: Client::new(),
            sheet_ids,
        }
    }

    fn export_url(&self, sheet_id: &str, worksheet: &str) -> String {
        format!(
            "https://docs.google.com/spreadsheets/d/{}/gviz/tq?tqx=out:csv&sheet={}",
            sheet_id, worksheet
        )
    }
}

impl GridSource for SheetsCsvSource {
    fn fetch_grid(&self, source_key: &str, worksheet: &str) -> Result<RawGrid, FetchError> {
        let sheet_id = self
            .sheet_ids
            .get(source_key)
            .ok_or_else(|| FetchError::UnknownSource(source_key.to_string()))?;

        let url = self.export_url(sheet_id, worksheet);
        debug!(source = source_key, worksheet, "fetching worksheet export");
        let body = self.client.get(&url).send()?.error_for_status()?.bytes()?;

        parse_csv_grid(&body, worksheet)
    }
}

/// Wraps any source with the TTL cache so repeated pipeline passes within the
/// freshness window reuse the same grids. Only successful fetches are cached;
/// a failed source gets retried on the next pass.
pub struct CachedSource<S> {
    inner: S,
    cache: RefCell<TtlCache<(String, String), RawGrid>>,
}

impl<S> CachedSource<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            cache: RefCell::new(TtlCache::new(ttl)),
        }
    }
}

impl<S: GridSource> GridSource for CachedSource<S> {
    fn fetch_grid(&self, source_key: &str, worksheet: &str) -> Result<RawGrid, FetchError> {
        let key = (source_key.to_string(), worksheet.to_string());
        if let Some(grid) = self.cache.borrow_mut().get(&key) {
            debug!(source = source_key, worksheet, "grid served from cache");
            return Ok(grid.clone());
        }
        let grid = self.inner.fetch_grid(source_key, worksheet)?;
        self.cache.borrow_mut().insert(key, grid.clone());
        Ok(grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_body_becomes_headers_plus_rows() {
        let body = b"Fecha,Monto\n01/02/2024,\"S/ 1,200.00\"\n02/02/2024,300\n";
        let grid = parse_csv_grid(body, "BD_Ventas").unwrap();
        assert_eq!(grid.headers, vec!["Fecha", "Monto"]);
        assert_eq!(grid.rows.len(), 2);
        assert_eq!(grid.rows[0][1], "S/ 1,200.00");
    }

    #[test]
    fn ragged_rows_are_padded_to_header_width() {
        let body = b"A,B,C\n1,2\n";
        let grid = parse_csv_grid(body, "t").unwrap();
        assert_eq!(grid.rows[0], vec!["1", "2", ""]);
    }

    #[test]
    fn empty_body_is_an_error_not_a_grid() {
        assert!(matches!(
            parse_csv_grid(b"", "t"),
            Err(FetchError::EmptyGrid(_))
        ));
    }

    #[test]
    fn header_only_export_yields_zero_rows() {
        let grid = parse_csv_grid(b"Fecha,Monto\n", "t").unwrap();
        assert_eq!(grid.headers.len(), 2);
        assert!(grid.rows.is_empty());
    }

    #[test]
    fn cached_source_fetches_once_within_ttl() {
        use std::cell::Cell;

        struct Counting(Cell<usize>);
        impl GridSource for Counting {
            fn fetch_grid(&self, _s: &str, w: &str) -> Result<RawGrid, FetchError> {
                self.0.set(self.0.get() + 1);
                parse_csv_grid(b"Fecha,Monto\n01/02/2024,100\n", w)
            }
        }

        let source = CachedSource::new(Counting(Cell::new(0)), Duration::from_secs(60));
        for _ in 0..3 {
            let grid = source.fetch_grid("REGISTROS", "BD_Ventas").unwrap();
            assert_eq!(grid.rows.len(), 1);
        }
        assert_eq!(source.inner.0.get(), 1);
    }

    #[test]
    fn cached_source_does_not_cache_failures() {
        use std::cell::Cell;

        struct Failing(Cell<usize>);
        impl GridSource for Failing {
            fn fetch_grid(&self, _s: &str, w: &str) -> Result<RawGrid, FetchError> {
                self.0.set(self.0.get() + 1);
                Err(FetchError::EmptyGrid(w.to_string()))
            }
        }

        let source = CachedSource::new(Failing(Cell::new(0)), Duration::from_secs(60));
        for _ in 0..2 {
            assert!(source.fetch_grid("REGISTROS", "BD_Ventas").is_err());
        }
        assert_eq!(source.inner.0.get(), 2);
    }

    #[test]
    fn unknown_source_key_is_reported() {
        let source = SheetsCsvSource::new(HashMap::new());
        assert!(matches!(
            source.fetch_grid("REGISTROS", "BD_Ventas"),
            Err(FetchError::UnknownSource(_))
        ));
    }
}
