use crate::loader::NormalizedTable;
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// One reconciled day of business activity. The record set covers exactly the
/// days with at least one sales transaction; a day that only received
/// attributed ad spend is absent, not zero-filled (known gap, kept on purpose
/// so revenue-side aggregates stay honest).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MasterDailyRecord {
    pub date: NaiveDate,
    pub revenue: f64,
    pub units: f64,
    /// Revenue / units; 0 when no units were recorded.
    pub avg_price: f64,
    /// Ad spend attributed to this day from the weekly records.
    pub ad_spend: f64,
    pub rain: bool,
    pub competitor_pressure: bool,
    pub strike: bool,
    pub stockout: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct ContextFlags {
    rain: bool,
    competitor_pressure: bool,
    strike: bool,
    stockout: bool,
}

/// Build the unified daily series from the sales, context and weekly-ads
/// tables. An empty sales table is the designed "no data yet" state and
/// yields an empty series, never an error or a partial result.
pub fn build(
    sales: &NormalizedTable,
    context: &NormalizedTable,
    ads: &NormalizedTable,
) -> Vec<MasterDailyRecord> {
    if sales.is_empty() {
        return Vec::new();
    }

    // 1) Per-day sales aggregates. BTreeMap keeps the output ascending.
    let amounts = sales.numbers("amount");
    let quantities = sales.numbers("quantity");
    let mut daily: BTreeMap<NaiveDate, (f64, f64)> = BTreeMap::new();
    for (row, date) in sales.dates().iter().enumerate() {
        let entry = daily.entry(*date).or_insert((0.0, 0.0));
        entry.0 += amounts.get(row).copied().unwrap_or(0.0);
        entry.1 += quantities.get(row).copied().unwrap_or(0.0);
    }

    let ads_daily = redistribute_weekly_spend(ads);
    let flags = context_by_day(context);

    let records: Vec<MasterDailyRecord> = daily
        .into_iter()
        .map(|(date, (revenue, units))| {
            let avg_price = if units > 0.0 { revenue / units } else { 0.0 };
            let ctx = flags.get(&date).copied().unwrap_or_default();
            MasterDailyRecord {
                date,
                revenue,
                units,
                avg_price,
                ad_spend: ads_daily.get(&date).copied().unwrap_or(0.0),
                rain: ctx.rain,
                competitor_pressure: ctx.competitor_pressure,
                strike: ctx.strike,
                stockout: ctx.stockout,
            }
        })
        .collect();

    debug!(days = records.len(), "built master daily series");
    records
}

/// Weekly ad spend arrives as one row per closing date with that week's
/// total. Spread each total evenly (spend/7) over the closing date and its
/// six preceding days; overlapping weekly entries contribute independently,
/// so shared days accumulate both.
fn redistribute_weekly_spend(ads: &NormalizedTable) -> HashMap<NaiveDate, f64> {
    let mut by_day: HashMap<NaiveDate, f64> = HashMap::new();
    let spend = ads.numbers("ad_spend");
    for (row, close) in ads.dates().iter().enumerate() {
        let weekly = spend.get(row).copied().unwrap_or(0.0);
        let per_day = weekly / 7.0;
        for offset in 0..7 {
            *by_day.entry(*close - Duration::days(offset)).or_insert(0.0) += per_day;
        }
    }
    by_day
}

fn context_by_day(context: &NormalizedTable) -> HashMap<NaiveDate, ContextFlags> {
    let rain = context.numbers("rain");
    let competitor = context.numbers("competitor_pressure");
    let strike = context.numbers("strike");
    let stockout = context.numbers("stockout");
    let set = |col: &[f64], row: usize| col.get(row).copied().unwrap_or(0.0) > 0.0;

    context
        .dates()
        .iter()
        .enumerate()
        .map(|(row, date)| {
            (
                *date,
                ContextFlags {
                    rain: set(rain, row),
                    competitor_pressure: set(competitor, row),
                    strike: set(strike, row),
                    stockout: set(stockout, row),
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::RawGrid;
    use crate::loader::{normalize_grid, schema, NormalizedTable};

    fn table(spec: &'static schema::TableSchema, headers: &[&str], rows: &[&[&str]]) -> NormalizedTable {
        let grid = RawGrid {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        };
        normalize_grid(&grid, spec)
    }

    fn empty(spec: &'static schema::TableSchema) -> NormalizedTable {
        table(spec, &["Fecha"], &[])
    }

    #[test]
    fn two_day_series_with_no_ads_or_context() {
        let sales = table(
            &schema::SALES,
            &["Fecha", "Monto", "Cantidad"],
            &[
                &["01/01/2024", "100", "5"],
                &["02/01/2024", "150", "5"],
            ],
        );
        let records = build(&sales, &empty(&schema::DAILY_CONTEXT), &empty(&schema::WEEKLY_ADS));

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].avg_price, 20.0);
        assert_eq!(records[1].avg_price, 30.0);
        assert_eq!(records[0].ad_spend, 0.0);
        assert!(!records[0].rain && !records[0].stockout);
    }

    #[test]
    fn same_day_transactions_aggregate() {
        let sales = table(
            &schema::SALES,
            &["Fecha", "Monto", "Cantidad"],
            &[
                &["01/01/2024", "100", "4"],
                &["01/01/2024", "60", "1"],
            ],
        );
        let records = build(&sales, &empty(&schema::DAILY_CONTEXT), &empty(&schema::WEEKLY_ADS));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].revenue, 160.0);
        assert_eq!(records[0].units, 5.0);
        assert_eq!(records[0].avg_price, 32.0);
    }

    #[test]
    fn zero_units_reports_zero_avg_price() {
        let sales = table(
            &schema::SALES,
            &["Fecha", "Monto", "Cantidad"],
            &[&["01/01/2024", "100", "0"]],
        );
        let records = build(&sales, &empty(&schema::DAILY_CONTEXT), &empty(&schema::WEEKLY_ADS));
        assert_eq!(records[0].avg_price, 0.0);
    }

    #[test]
    fn overlapping_weekly_spend_accumulates_on_shared_days() {
        // Weeks closing Jan 7 and Jan 10 share Jan 4..=7.
        let sales_rows: Vec<Vec<String>> = (1..=10)
            .map(|d| vec![format!("{:02}/01/2024", d), "100".to_string(), "5".to_string()])
            .collect();
        let sales = normalize_grid(
            &RawGrid {
                headers: vec!["Fecha".into(), "Monto".into(), "Cantidad".into()],
                rows: sales_rows,
            },
            &schema::SALES,
        );
        let ads = table(
            &schema::WEEKLY_ADS,
            &["Fecha_Cierre", "Gasto_Ads"],
            &[&["07/01/2024", "700"], &["10/01/2024", "700"]],
        );

        let records = build(&sales, &empty(&schema::DAILY_CONTEXT), &ads);
        let by_day: HashMap<_, _> = records.iter().map(|r| (r.date, r.ad_spend)).collect();

        let day = |d: u32| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
        assert_eq!(by_day[&day(2)], 100.0); // only week one
        assert_eq!(by_day[&day(5)], 200.0); // both weeks overlap
        assert_eq!(by_day[&day(7)], 200.0);
        assert_eq!(by_day[&day(9)], 100.0); // only week two
    }

    #[test]
    fn context_flags_left_join_by_date() {
        let sales = table(
            &schema::SALES,
            &["Fecha", "Monto", "Cantidad"],
            &[&["01/01/2024", "100", "5"], &["02/01/2024", "80", "4"]],
        );
        let context = table(
            &schema::DAILY_CONTEXT,
            &["Fecha", "Lluvia_Intensa", "Stockout_Cierre"],
            &[&["01/01/2024", "1", "0"]],
        );
        let records = build(&sales, &context, &empty(&schema::WEEKLY_ADS));
        assert!(records[0].rain);
        assert!(!records[0].stockout);
        // No context row for day two: every flag defaults to absent.
        assert!(!records[1].rain);
    }

    #[test]
    fn empty_sales_yields_empty_series() {
        let ads = table(
            &schema::WEEKLY_ADS,
            &["Fecha_Cierre", "Gasto_Ads"],
            &[&["07/01/2024", "700"]],
        );
        let records = build(&empty(&schema::SALES), &empty(&schema::DAILY_CONTEXT), &ads);
        assert!(records.is_empty());
    }

    #[test]
    fn output_is_ascending_by_date() {
        let sales = table(
            &schema::SALES,
            &["Fecha", "Monto", "Cantidad"],
            &[
                &["05/01/2024", "100", "5"],
                &["01/01/2024", "100", "5"],
                &["03/01/2024", "100", "5"],
            ],
        );
        let records = build(&sales, &empty(&schema::DAILY_CONTEXT), &empty(&schema::WEEKLY_ADS));
        let dates: Vec<_> = records.iter().map(|r| r.date).collect();
        let mut sorted = dates.clone();
        sorted.sort();
        assert_eq!(dates, sorted);
    }
}
