//! Per-table schema descriptors.
//!
//! Upstream worksheets are maintained by hand and the same logical column
//! shows up under several spellings depending on who last edited the sheet.
//! Each descriptor lists the acceptable aliases per logical field in priority
//! order; the loader resolves them once, at load time, into canonical field
//! names so the rest of the pipeline stays strongly typed.

/// Date-bearing column names, in priority order. The first one present in a
/// header row becomes the table's event-date column.
pub const DATE_ALIASES: &[&str] = &[
    "Fecha",
    "Fecha_dt",
    "ds",
    "Marca temporal",
    "Fecha_Vencimiento",
    "Fecha_Operacion",
    "Fecha_Cierre",
    "fecha",
    "Date",
];

/// A numeric field: resolved through its alias list and parsed as currency.
/// When no alias matches the header row the whole column is filled with
/// `default` instead of failing the load.
pub struct NumericField {
    pub canonical: &'static str,
    pub aliases: &'static [&'static str],
    pub default: f64,
}

/// A free-text field, resolved the same way; missing columns resolve to empty
/// strings.
pub struct TextField {
    pub canonical: &'static str,
    pub aliases: &'static [&'static str],
}

pub struct TableSchema {
    pub name: &'static str,
    /// Whether the table is expected to carry a date column. Rows whose date
    /// fails to parse are dropped from dated tables.
    pub dated: bool,
    pub numeric: &'static [NumericField],
    pub text: &'static [TextField],
}

/// The logical datasets the pipeline consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
    Sales,
    DailyContext,
    WeeklyAds,
    Treasury,
    FixedCosts,
    WalletPayments,
}

impl Dataset {
    pub const ALL: [Dataset; 6] = [
        Dataset::Sales,
        Dataset::DailyContext,
        Dataset::WeeklyAds,
        Dataset::Treasury,
        Dataset::FixedCosts,
        Dataset::WalletPayments,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Dataset::Sales => "sales",
            Dataset::DailyContext => "daily_context",
            Dataset::WeeklyAds => "weekly_ads",
            Dataset::Treasury => "treasury",
            Dataset::FixedCosts => "fixed_costs",
            Dataset::WalletPayments => "wallet_payments",
        }
    }

    pub fn schema(self) -> &'static TableSchema {
        match self {
            Dataset::Sales => &SALES,
            Dataset::DailyContext => &DAILY_CONTEXT,
            Dataset::WeeklyAds => &WEEKLY_ADS,
            Dataset::Treasury => &TREASURY,
            Dataset::FixedCosts => &FIXED_COSTS,
            Dataset::WalletPayments => &WALLET_PAYMENTS,
        }
    }
}

pub static SALES: TableSchema = TableSchema {
    name: "sales",
    dated: true,
    numeric: &[
        NumericField {
            canonical: "amount",
            aliases: &["Total_Venta", "Total Venta", "total_venta", "Monto"],
            default: 0.0,
        },
        NumericField {
            canonical: "quantity",
            aliases: &["Cantidad"],
            default: 0.0,
        },
    ],
    text: &[TextField {
        canonical: "ticket_id",
        aliases: &["ID_Ticket"],
    }],
};

pub static DAILY_CONTEXT: TableSchema = TableSchema {
    name: "daily_context",
    dated: true,
    numeric: &[
        NumericField {
            canonical: "rain",
            aliases: &["Lluvia_Intensa"],
            default: 0.0,
        },
        NumericField {
            canonical: "competitor_pressure",
            aliases: &["Competencia_Agresiva"],
            default: 0.0,
        },
        NumericField {
            canonical: "strike",
            aliases: &["Dia_Huelga"],
            default: 0.0,
        },
        NumericField {
            canonical: "stockout",
            aliases: &["Stockout_Cierre"],
            default: 0.0,
        },
    ],
    text: &[],
};

pub static WEEKLY_ADS: TableSchema = TableSchema {
    name: "weekly_ads",
    dated: true,
    numeric: &[
        NumericField {
            canonical: "ad_spend",
            aliases: &["Gasto_Ads"],
            default: 0.0,
        },
        NumericField {
            canonical: "reviews",
            aliases: &["Google_Review", "Google_Reviews"],
            default: 0.0,
        },
        NumericField {
            canonical: "stars",
            aliases: &["Google_Stars"],
            default: 0.0,
        },
    ],
    text: &[],
};

pub static TREASURY: TableSchema = TableSchema {
    name: "treasury",
    dated: true,
    numeric: &[
        NumericField {
            canonical: "runway_days",
            aliases: &["Runway_Dias"],
            default: 0.0,
        },
        NumericField {
            canonical: "burn_rate",
            aliases: &["Burn_Rate_Diario"],
            default: 0.0,
        },
        NumericField {
            canonical: "cost_ratio",
            aliases: &["Ratio_Costo_Real"],
            default: 0.0,
        },
        NumericField {
            canonical: "short_term_debt",
            aliases: &["Deuda_TC_Auditada"],
            default: 0.0,
        },
    ],
    text: &[TextField {
        canonical: "directive",
        aliases: &["ORDEN_TESORERIA"],
    }],
};

pub static FIXED_COSTS: TableSchema = TableSchema {
    name: "fixed_costs",
    dated: false,
    numeric: &[NumericField {
        canonical: "monthly_amount",
        aliases: &["Monto_Mensual"],
        default: 0.0,
    }],
    text: &[TextField {
        canonical: "concept",
        aliases: &["Concepto"],
    }],
};

pub static WALLET_PAYMENTS: TableSchema = TableSchema {
    name: "wallet_payments",
    dated: true,
    numeric: &[NumericField {
        canonical: "amount",
        aliases: &["Monto", "monto"],
        default: 0.0,
    }],
    text: &[TextField {
        canonical: "payer",
        aliases: &["Origen", "origen"],
    }],
};
