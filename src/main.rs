use anyhow::Result;
use chrono::{Local, Utc};
use fonda::{
    config::Settings,
    fetch::{CachedSource, SheetsCsvSource},
    finance::{self, FinancialSnapshot},
    loader::{self, Dataset, NormalizedTable, SourceStatus},
    marketing::{self, WeeklyMarketingRecord},
    master::{self, MasterDailyRecord},
    segment::{self, CustomerProfile},
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Everything the presentation layer needs, recomputed whole on each run.
#[derive(Serialize)]
struct PipelineReport {
    generated_at: String,
    sources: BTreeMap<&'static str, SourceStatus>,
    master: Vec<MasterDailyRecord>,
    finance: FinancialSnapshot,
    customers: Vec<CustomerProfile>,
    marketing: Vec<WeeklyMarketingRecord>,
}

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();
    info!("startup");

    // ─── 2) settings ─────────────────────────────────────────────────
    let settings = match std::env::args().nth(1) {
        Some(path) => Settings::from_yaml_file(&path)?,
        None if Path::new("settings.yaml").exists() => Settings::from_yaml_file("settings.yaml")?,
        None => {
            warn!("no settings file, running with built-in defaults (no sheet ids)");
            Settings::default()
        }
    };

    // ─── 3) wire the collaborator behind the TTL cache ───────────────
    let source = CachedSource::new(
        SheetsCsvSource::new(settings.sheet_ids.clone()),
        Duration::from_secs(settings.cache_ttl_secs),
    );

    // ─── 4) load every dataset; failures degrade to empty tables ────
    let mut tables: HashMap<Dataset, NormalizedTable> = HashMap::new();
    let mut sources: BTreeMap<&'static str, SourceStatus> = BTreeMap::new();
    for dataset in Dataset::ALL {
        let load = match settings.location(dataset) {
            Some((source_key, worksheet)) => loader::load(&source, dataset, source_key, worksheet),
            None => {
                warn!(dataset = dataset.key(), "dataset missing from worksheet map");
                loader::TableLoad {
                    table: NormalizedTable::empty(dataset.schema().name),
                    status: SourceStatus::Unavailable("not configured".to_string()),
                }
            }
        };
        info!(
            dataset = dataset.key(),
            rows = load.table.len(),
            available = load.status.is_available(),
            "dataset loaded"
        );
        sources.insert(dataset.key(), load.status);
        tables.insert(dataset, load.table);
    }

    // ─── 5) run the pure computations ────────────────────────────────
    let sales = &tables[&Dataset::Sales];
    let master = master::build(
        sales,
        &tables[&Dataset::DailyContext],
        &tables[&Dataset::WeeklyAds],
    );
    let snapshot = finance::compute_snapshot(
        &tables[&Dataset::Treasury],
        &tables[&Dataset::FixedCosts],
        &settings.defaults,
    );
    let reference = segment::reference_average_ticket(sales);
    let customers = segment::segment(
        &tables[&Dataset::WalletPayments],
        reference,
        Local::now().date_naive(),
        &settings,
    );
    let marketing = marketing::weekly_report(&tables[&Dataset::WeeklyAds], sales);

    info!(
        days = master.len(),
        customers = customers.len(),
        weeks = marketing.len(),
        break_even_daily = snapshot.break_even_daily,
        "pipeline complete"
    );

    // ─── 6) emit one JSON document for the presentation layer ────────
    let report = PipelineReport {
        generated_at: Utc::now().to_rfc3339(),
        sources,
        master,
        finance: snapshot,
        customers,
        marketing,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
