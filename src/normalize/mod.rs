pub mod dates;

pub use dates::parse_date_batch;

use once_cell::sync::Lazy;
use regex::Regex;

/// Markers that show up inside hand-typed money/percent cells: the "S/" sol
/// symbol (with or without a trailing dot), thousands commas, percent signs
/// and stray whitespace.
static AMOUNT_NOISE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[Ss]/\.?|[,%\s]").expect("amount noise pattern is valid"));

/// Parse a free-form currency or percentage cell into an `f64`.
///
/// Lossy-safe by contract: anything that survives noise-stripping but still
/// fails numeric conversion becomes `0.0`, never an error. Already-numeric
/// text passes through unchanged, and `"45%"` yields `45.0` (the percent sign
/// is stripped, not divided out).
pub fn parse_amount(raw: &str) -> f64 {
    let cleaned = AMOUNT_NOISE.replace_all(raw.trim(), "");
    cleaned.parse::<f64>().unwrap_or(0.0)
}

/// Sanity-clamp a financial ratio expected in `[0, 1]`.
///
/// Upstream sheets record the same ratio as `60`, `60%` or `0.6` depending on
/// who typed it, so a value above 1 is divided by 100 exactly once. A ratio of
/// 0 (or anything non-finite) is replaced with `floor` so downstream divisions
/// never blow up; the floor is a configured safety default, not a derived
/// statistic.
pub fn clamp_ratio(value: f64, floor: f64) -> f64 {
    if !value.is_finite() {
        return floor;
    }
    let mut v = value;
    if v > 1.0 {
        v /= 100.0;
    }
    if v == 0.0 {
        floor
    } else {
        v
    }
}
