use crate::loader::Dataset;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Where one logical dataset lives: a source key (resolved to a spreadsheet
/// id via `Settings::sheet_ids`) plus a worksheet name inside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorksheetRef {
    pub source: String,
    pub worksheet: String,
}

/// Safety defaults for degenerate inputs. These are documented fallbacks, not
/// statistically derived values; every one is overridable from the settings
/// file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyDefaults {
    /// Used when the fixed-cost table is empty or carries no amounts.
    pub fallback_fixed_cost_monthly: f64,
    /// Used when the sales table yields a 0 or non-finite average ticket.
    pub fallback_average_ticket: f64,
    /// Substituted for a cost ratio read as exactly 0.
    pub cost_ratio_floor: f64,
    /// Contribution margins at or below this report a 0 break-even.
    pub margin_floor: f64,
}

impl Default for SafetyDefaults {
    fn default() -> Self {
        Self {
            fallback_fixed_cost_monthly: 3600.0,
            fallback_average_ticket: 20.0,
            cost_ratio_floor: 0.60,
            margin_floor: 0.05,
        }
    }
}

/// Customer-segmentation thresholds. The source revisions disagree on these
/// (30 vs 45 dormancy days); one consistent set is fixed here and kept
/// configurable rather than guessing which revision was authoritative.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentThresholds {
    pub vip_multiplier: f64,
    pub recurring_multiplier: f64,
    pub dormancy_days: i64,
}

impl Default for SegmentThresholds {
    fn default() -> Self {
        Self {
            vip_multiplier: 4.0,
            recurring_multiplier: 1.5,
            dormancy_days: 45,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Logical source key → remote spreadsheet id. Empty by default; must be
    /// provided for live runs.
    pub sheet_ids: HashMap<String, String>,
    /// Dataset key → worksheet location. Defaults mirror the upstream
    /// workbook layout.
    pub worksheets: HashMap<String, WorksheetRef>,
    pub defaults: SafetyDefaults,
    pub thresholds: SegmentThresholds,
    /// How long fetched grids stay fresh in the host's cache.
    pub cache_ttl_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        let mut worksheets = HashMap::new();
        let mut map = |dataset: Dataset, source: &str, worksheet: &str| {
            worksheets.insert(
                dataset.key().to_string(),
                WorksheetRef {
                    source: source.to_string(),
                    worksheet: worksheet.to_string(),
                },
            );
        };
        map(Dataset::Sales, "REGISTROS", "BD_Ventas");
        map(Dataset::DailyContext, "REGISTROS", "Data_Diaria");
        map(Dataset::WeeklyAds, "MKT_REGISTROS", "BD_Marketing_Semanal");
        map(Dataset::Treasury, "FORECAST", "OUT_Soberania_Financiera");
        map(Dataset::FixedCosts, "CAJA", "PARAM_COSTOS_FIJOS");
        map(Dataset::WalletPayments, "MKT_RESULTADOS", "Data_Clientes_Yape");

        Self {
            sheet_ids: HashMap::new(),
            worksheets,
            defaults: SafetyDefaults::default(),
            thresholds: SegmentThresholds::default(),
            cache_ttl_secs: 600,
        }
    }
}

impl Settings {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings file {}", path.display()))?;
        serde_yaml::from_str(&raw)
            .with_context(|| format!("parsing settings file {}", path.display()))
    }

    /// Resolve where a dataset lives. `None` only if the worksheet map was
    /// overridden and left a dataset out.
    pub fn location(&self, dataset: Dataset) -> Option<(&str, &str)> {
        self.worksheets
            .get(dataset.key())
            .map(|w| (w.source.as_str(), w.worksheet.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_cover_every_dataset() {
        let settings = Settings::default();
        for dataset in Dataset::ALL {
            assert!(settings.location(dataset).is_some(), "{:?}", dataset);
        }
        assert_eq!(settings.location(Dataset::Sales).unwrap().1, "BD_Ventas");
    }

    #[test]
    fn yaml_overrides_merge_over_defaults() -> anyhow::Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(
            file,
            "sheet_ids:\n  REGISTROS: abc123\nthresholds:\n  dormancy_days: 30\n"
        )?;
        let settings = Settings::from_yaml_file(file.path())?;
        assert_eq!(settings.sheet_ids["REGISTROS"], "abc123");
        assert_eq!(settings.thresholds.dormancy_days, 30);
        // Untouched sections keep their defaults.
        assert_eq!(settings.defaults.fallback_average_ticket, 20.0);
        assert_eq!(settings.cache_ttl_secs, 600);
        Ok(())
    }

    #[test]
    fn missing_settings_file_is_an_error_with_path() {
        let err = Settings::from_yaml_file("/no/such/settings.yaml").unwrap_err();
        assert!(err.to_string().contains("/no/such/settings.yaml"));
    }
}
