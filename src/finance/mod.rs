use crate::config::SafetyDefaults;
use crate::loader::NormalizedTable;
use crate::normalize::clamp_ratio;
use serde::Serialize;
use tracing::debug;

/// Treasury directive classes for downstream presentation. The upstream sheet
/// carries a free-text order; classification is by case-sensitive substring
/// markers, first match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Directive {
    Alert,
    Growth,
    Hold,
    AwaitingData,
}

pub fn classify_directive(text: &str) -> Directive {
    if text.contains("ALERTA") {
        Directive::Alert
    } else if text.contains("CRECIMIENTO") {
        Directive::Growth
    } else if text.contains("ESPERANDO") || text.is_empty() {
        Directive::AwaitingData
    } else {
        Directive::Hold
    }
}

/// Current-state financial health. Recomputed whole from the latest treasury
/// row on every request; there are no partial updates.
#[derive(Debug, Clone, Serialize)]
pub struct FinancialSnapshot {
    /// Currency per day, read from the treasury row (externally supplied).
    pub burn_rate: f64,
    /// Fraction of revenue consumed by variable + fixed cost, sanity-clamped.
    pub cost_ratio: f64,
    /// 1 − cost ratio.
    pub contribution_margin: f64,
    /// Currency per month.
    pub fixed_cost_base: f64,
    /// 0 means "model undefined" (margin at or below the floor), not free.
    pub break_even_daily: f64,
    pub break_even_monthly: f64,
    /// Days of cash left, read from the treasury row.
    pub runway_days: f64,
    pub short_term_debt: f64,
    pub directive: Directive,
    pub directive_text: String,
}

/// Compute the snapshot from the treasury table's latest row and the
/// fixed-cost table.
///
/// Runway, burn rate and debt are externally supplied facts and pass through
/// unchanged; only the break-even figures are re-derived here. With no
/// treasury data at all the snapshot degrades to zeros and `AwaitingData`
/// rather than inventing numbers from the clamp floor.
pub fn compute_snapshot(
    treasury: &NormalizedTable,
    fixed_costs: &NormalizedTable,
    defaults: &SafetyDefaults,
) -> FinancialSnapshot {
    let summed: f64 = fixed_costs.numbers("monthly_amount").iter().sum();
    let fixed_cost_base = if summed > 0.0 {
        summed
    } else {
        debug!(
            fallback = defaults.fallback_fixed_cost_monthly,
            "fixed-cost table empty, using safety default"
        );
        defaults.fallback_fixed_cost_monthly
    };

    if treasury.is_empty() {
        return FinancialSnapshot {
            burn_rate: 0.0,
            cost_ratio: 0.0,
            contribution_margin: 0.0,
            fixed_cost_base,
            break_even_daily: 0.0,
            break_even_monthly: 0.0,
            runway_days: 0.0,
            short_term_debt: 0.0,
            directive: Directive::AwaitingData,
            directive_text: String::new(),
        };
    }

    let cost_ratio = clamp_ratio(
        treasury.last_number("cost_ratio").unwrap_or(0.0),
        defaults.cost_ratio_floor,
    );
    let contribution_margin = 1.0 - cost_ratio;

    let (break_even_monthly, break_even_daily) = if contribution_margin > defaults.margin_floor {
        let monthly = fixed_cost_base / contribution_margin;
        (monthly, monthly / 30.0)
    } else {
        (0.0, 0.0)
    };

    let directive_text = treasury.last_text("directive").unwrap_or("").to_string();

    FinancialSnapshot {
        burn_rate: treasury.last_number("burn_rate").unwrap_or(0.0),
        cost_ratio,
        contribution_margin,
        fixed_cost_base,
        break_even_daily,
        break_even_monthly,
        runway_days: treasury.last_number("runway_days").unwrap_or(0.0),
        short_term_debt: treasury.last_number("short_term_debt").unwrap_or(0.0),
        directive: classify_directive(&directive_text),
        directive_text,
    }
}
