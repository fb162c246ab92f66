use chrono::{NaiveDate, NaiveDateTime};

/// Local convention first: the sheets are mostly typed day/month/year by hand,
/// sometimes with a time-of-day tacked on by a form.
const DAY_FIRST_FORMATS: &[&str] = &[
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d/%m/%y",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Fallback set for tables that turn out to be machine-generated: ISO dates
/// and timestamps, then month-first, then the day-first set again so a mixed
/// table keeps as many rows as possible.
const MIXED_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y",
    "%m/%d/%Y %H:%M:%S",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d/%m/%y",
];

fn parse_with(formats: &[&str], raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in formats {
        if fmt.contains("%H") {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(dt.date());
            }
        } else if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    None
}

/// Parse a whole column of date strings, timezone-naive.
///
/// First pass assumes the local day-first convention. If more than 80% of the
/// batch fails under that rule the column is evidently machine-generated in
/// another format, so the whole batch is re-parsed with the mixed set instead.
/// The selection is per batch, not per cell: a fixed single format silently
/// corrupts whichever half of the data it doesn't match, and per-cell guessing
/// flips ambiguous dates like 03/04 row by row.
///
/// Cells that fail both passes come back as `None`; the caller drops those
/// rows rather than inventing a sentinel date.
pub fn parse_date_batch(values: &[String]) -> Vec<Option<NaiveDate>> {
    let day_first: Vec<Option<NaiveDate>> = values
        .iter()
        .map(|v| parse_with(DAY_FIRST_FORMATS, v))
        .collect();

    let failed = day_first.iter().filter(|d| d.is_none()).count();
    if values.is_empty() || (failed as f64) / (values.len() as f64) <= 0.8 {
        return day_first;
    }

    values
        .iter()
        .map(|v| parse_with(MIXED_FORMATS, v))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn day_first_wins_when_most_rows_parse() {
        // 9 of 10 parse day-first; the odd one out is dropped, not the batch.
        let mut values = vec!["15/01/2024"; 9];
        values.push("not a date");
        let parsed = parse_date_batch(&batch(&values));
        assert_eq!(parsed.iter().filter(|d| d.is_some()).count(), 9);
        assert_eq!(parsed[0], NaiveDate::from_ymd_opt(2024, 1, 15));
    }

    #[test]
    fn mixed_fallback_kicks_in_on_iso_batches() {
        let values = batch(&[
            "2024-01-15T08:30:00",
            "2024-01-16T09:00:00",
            "2024-01-17T10:15:00",
            "2024-01-18T11:45:00",
            "2024-01-19T12:00:00",
        ]);
        let parsed = parse_date_batch(&values);
        assert!(parsed.iter().all(|d| d.is_some()));
        assert_eq!(parsed[0], NaiveDate::from_ymd_opt(2024, 1, 15));
    }

    #[test]
    fn ambiguous_dates_resolve_day_first() {
        let parsed = parse_date_batch(&batch(&["03/04/2024", "05/04/2024"]));
        assert_eq!(parsed[0], NaiveDate::from_ymd_opt(2024, 4, 3));
    }

    #[test]
    fn unparseable_cells_stay_none_after_both_passes() {
        let parsed = parse_date_batch(&batch(&["???", "--"]));
        assert!(parsed.iter().all(|d| d.is_none()));
    }

    #[test]
    fn empty_batch_is_empty() {
        assert!(parse_date_batch(&[]).is_empty());
    }
}
