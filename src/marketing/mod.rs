use crate::loader::NormalizedTable;
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

/// One week of marketing performance: spend versus the revenue the closing
/// week actually produced. MER is the marketing efficiency ratio — revenue
/// per unit of advertising spend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyMarketingRecord {
    pub week_ending: NaiveDate,
    pub ad_spend: f64,
    /// Sales revenue over the seven days closing on `week_ending`.
    pub revenue: f64,
    /// Revenue / spend; 0 when nothing was spent, never a division by zero.
    pub mer: f64,
    pub reviews: f64,
    /// Week-over-week review delta; 0 for the first record.
    pub new_reviews: f64,
    pub stars: f64,
}

/// Build the weekly report from the ads table and raw sales. Rows are
/// ordered by closing date; each row's revenue windows over the closing date
/// and its six preceding days, the same week shape the spend redistribution
/// uses.
pub fn weekly_report(ads: &NormalizedTable, sales: &NormalizedTable) -> Vec<WeeklyMarketingRecord> {
    let mut revenue_by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    let amounts = sales.numbers("amount");
    for (row, date) in sales.dates().iter().enumerate() {
        *revenue_by_day.entry(*date).or_insert(0.0) += amounts.get(row).copied().unwrap_or(0.0);
    }

    let spend = ads.numbers("ad_spend");
    let reviews = ads.numbers("reviews");
    let stars = ads.numbers("stars");

    let mut weeks: Vec<(NaiveDate, usize)> = ads
        .dates()
        .iter()
        .copied()
        .enumerate()
        .map(|(row, date)| (date, row))
        .collect();
    weeks.sort_by_key(|(date, _)| *date);

    let mut report = Vec::with_capacity(weeks.len());
    let mut previous_reviews: Option<f64> = None;
    for (week_ending, row) in weeks {
        let window_start = week_ending - Duration::days(6);
        let revenue: f64 = revenue_by_day
            .range(window_start..=week_ending)
            .map(|(_, v)| v)
            .sum();

        let ad_spend = spend.get(row).copied().unwrap_or(0.0);
        let mer = if ad_spend > 0.0 { revenue / ad_spend } else { 0.0 };

        let review_count = reviews.get(row).copied().unwrap_or(0.0);
        let new_reviews = previous_reviews.map_or(0.0, |prev| review_count - prev);
        previous_reviews = Some(review_count);

        report.push(WeeklyMarketingRecord {
            week_ending,
            ad_spend,
            revenue,
            mer,
            reviews: review_count,
            new_reviews,
            stars: stars.get(row).copied().unwrap_or(0.0),
        });
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::RawGrid;
    use crate::loader::{normalize_grid, schema};

    fn sales(rows: &[(&str, &str)]) -> NormalizedTable {
        let grid = RawGrid {
            headers: vec!["Fecha".into(), "Monto".into()],
            rows: rows
                .iter()
                .map(|(f, m)| vec![f.to_string(), m.to_string()])
                .collect(),
        };
        normalize_grid(&grid, &schema::SALES)
    }

    fn ads(rows: &[(&str, &str, &str, &str)]) -> NormalizedTable {
        let grid = RawGrid {
            headers: vec![
                "Fecha_Cierre".into(),
                "Gasto_Ads".into(),
                "Google_Reviews".into(),
                "Google_Stars".into(),
            ],
            rows: rows
                .iter()
                .map(|(f, g, r, s)| {
                    vec![f.to_string(), g.to_string(), r.to_string(), s.to_string()]
                })
                .collect(),
        };
        normalize_grid(&grid, &schema::WEEKLY_ADS)
    }

    #[test]
    fn mer_is_week_revenue_over_spend() {
        // 300/day over the week closing Jan 7 → 2100; spend 700 → MER 3.
        let sales = sales(&[
            ("01/01/2024", "300"),
            ("03/01/2024", "600"),
            ("05/01/2024", "600"),
            ("07/01/2024", "600"),
            // Outside the window, must not count.
            ("08/01/2024", "500"),
        ]);
        let ads = ads(&[("07/01/2024", "700", "120", "4.6")]);
        let report = weekly_report(&ads, &sales);
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].revenue, 2100.0);
        assert_eq!(report[0].mer, 3.0);
        assert_eq!(report[0].stars, 4.6);
    }

    #[test]
    fn zero_spend_week_reports_zero_mer() {
        let sales = sales(&[("05/01/2024", "400")]);
        let ads = ads(&[("07/01/2024", "0", "120", "4.6")]);
        let report = weekly_report(&ads, &sales);
        assert_eq!(report[0].mer, 0.0);
        assert_eq!(report[0].revenue, 400.0);
    }

    #[test]
    fn new_reviews_is_forward_difference() {
        let sales = sales(&[("05/01/2024", "400")]);
        let ads = ads(&[
            ("14/01/2024", "700", "132", "4.7"),
            ("07/01/2024", "700", "120", "4.6"),
        ]);
        let report = weekly_report(&ads, &sales);
        // Sorted by closing date regardless of sheet order.
        assert_eq!(report[0].week_ending, NaiveDate::from_ymd_opt(2024, 1, 7).unwrap());
        assert_eq!(report[0].new_reviews, 0.0);
        assert_eq!(report[1].new_reviews, 12.0);
    }

    #[test]
    fn empty_ads_table_yields_empty_report() {
        let sales = sales(&[("05/01/2024", "400")]);
        let ads = ads(&[]);
        assert!(weekly_report(&ads, &sales).is_empty());
    }
}
