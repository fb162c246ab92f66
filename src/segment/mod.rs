use crate::config::Settings;
use crate::loader::NormalizedTable;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Digital-wallet transfers arrive tagged with the provider and channel;
/// stripped in this order so compound prefixes ("PLIN - ") go before the bare
/// provider names.
const PROVIDER_PREFIXES: &[&str] = &[
    "PLIN - ",
    "YAPE - ",
    "TRANSFERENCIA - ",
    "IZIPAY - ",
    "INTERBANK - ",
    "BCP - ",
    "PLIN",
    "YAPE",
];

/// Identities too short to mean anything after cleanup collapse into this
/// bucket. Those entries aggregate together, intentionally losing individual
/// identity.
pub const ANONYMOUS: &str = "ANONIMO";

/// Deterministic identity key from a raw payer string. Two raw strings that
/// normalize to the same key are the same customer.
pub fn normalize_payer(raw: &str) -> String {
    let mut name = raw.to_uppercase().trim().to_string();
    for prefix in PROVIDER_PREFIXES {
        name = name.replace(prefix, "");
    }
    let name = name.trim();
    if name.chars().count() <= 2 {
        ANONYMOUS.to_string()
    } else {
        name.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// One transaction alone above the VIP threshold, no repeat visits.
    Whale,
    Vip,
    Recurring,
    Casual,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Whale => "whale",
            Tier::Vip => "VIP",
            Tier::Recurring => "recurring",
            Tier::Casual => "casual",
        }
    }
}

/// Final label: the base tier, optionally rewritten by the dormancy overlay.
/// Dormant customers keep their original tier for reporting; lost ones were
/// casual to begin with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "tier", rename_all = "lowercase")]
pub enum SegmentLabel {
    Active(Tier),
    Dormant(Tier),
    Lost,
}

impl fmt::Display for SegmentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentLabel::Active(t) => write!(f, "{}", t.as_str()),
            SegmentLabel::Dormant(t) => write!(f, "dormant ({})", t.as_str()),
            SegmentLabel::Lost => write!(f, "lost"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerProfile {
    pub identity: String,
    pub lifetime_total: f64,
    pub visit_count: u32,
    pub last_visit: NaiveDate,
    pub peak_ticket: f64,
    pub days_inactive: i64,
    pub label: SegmentLabel,
}

/// Average ticket value from the sales table, used as the base for the
/// segmentation thresholds. Per-ticket totals when a ticket id column is
/// populated, otherwise the plain mean transaction amount. 0 when there are
/// no sales; the caller substitutes the safety default.
pub fn reference_average_ticket(sales: &NormalizedTable) -> f64 {
    if sales.is_empty() {
        return 0.0;
    }
    let amounts = sales.numbers("amount");

    if let Some(tickets) = sales.text("ticket_id") {
        if tickets.iter().any(|t| !t.trim().is_empty()) {
            let mut totals: HashMap<&str, f64> = HashMap::new();
            for (row, ticket) in tickets.iter().enumerate() {
                let ticket = ticket.trim();
                if ticket.is_empty() {
                    continue;
                }
                *totals.entry(ticket).or_insert(0.0) +=
                    amounts.get(row).copied().unwrap_or(0.0);
            }
            if !totals.is_empty() {
                return totals.values().sum::<f64>() / totals.len() as f64;
            }
        }
    }

    amounts.iter().sum::<f64>() / amounts.len() as f64
}

struct Aggregate {
    total: f64,
    visits: u32,
    last_visit: NaiveDate,
    peak: f64,
}

/// Classify every customer in the payment log.
///
/// `reference_ticket` of 0 or NaN falls back to the configured default before
/// threshold derivation, so the thresholds never degenerate to zero. An empty
/// log yields an empty list.
pub fn segment(
    payments: &NormalizedTable,
    reference_ticket: f64,
    today: NaiveDate,
    settings: &Settings,
) -> Vec<CustomerProfile> {
    if payments.is_empty() {
        return Vec::new();
    }

    let reference = if reference_ticket.is_finite() && reference_ticket > 0.0 {
        reference_ticket
    } else {
        debug!(
            fallback = settings.defaults.fallback_average_ticket,
            "degenerate reference ticket, using safety default"
        );
        settings.defaults.fallback_average_ticket
    };
    let vip_threshold = reference * settings.thresholds.vip_multiplier;
    let recurring_threshold = reference * settings.thresholds.recurring_multiplier;

    let amounts = payments.numbers("amount");
    let payers = payments.text("payer").unwrap_or(&[]);

    let mut aggregates: HashMap<String, Aggregate> = HashMap::new();
    for (row, date) in payments.dates().iter().enumerate() {
        let identity = normalize_payer(payers.get(row).map(String::as_str).unwrap_or(""));
        let amount = amounts.get(row).copied().unwrap_or(0.0);
        aggregates
            .entry(identity)
            .and_modify(|agg| {
                agg.total += amount;
                agg.visits += 1;
                agg.last_visit = agg.last_visit.max(*date);
                agg.peak = agg.peak.max(amount);
            })
            .or_insert(Aggregate {
                total: amount,
                visits: 1,
                last_visit: *date,
                peak: amount,
            });
    }

    let mut profiles: Vec<CustomerProfile> = aggregates
        .into_iter()
        .map(|(identity, agg)| {
            let days_inactive = (today - agg.last_visit).num_days();

            let tier = if agg.peak >= vip_threshold && agg.visits == 1 {
                Tier::Whale
            } else if agg.total >= vip_threshold {
                Tier::Vip
            } else if agg.total >= recurring_threshold {
                Tier::Recurring
            } else {
                Tier::Casual
            };

            let label = if days_inactive > settings.thresholds.dormancy_days {
                match tier {
                    Tier::Casual => SegmentLabel::Lost,
                    other => SegmentLabel::Dormant(other),
                }
            } else {
                SegmentLabel::Active(tier)
            };

            CustomerProfile {
                identity,
                lifetime_total: agg.total,
                visit_count: agg.visits,
                last_visit: agg.last_visit,
                peak_ticket: agg.peak,
                days_inactive,
                label,
            }
        })
        .collect();

    profiles.sort_by(|a, b| {
        b.lifetime_total
            .partial_cmp(&a.lifetime_total)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.identity.cmp(&b.identity))
    });

    debug!(customers = profiles.len(), "segmented payment log");
    profiles
}
