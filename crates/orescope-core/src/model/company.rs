// ── Company domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumString};

/// Backend company identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanyId(pub i64);

impl CompanyId {
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for CompanyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for CompanyId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Development status of a mining company.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Status {
    Producer,
    Developer,
    Explorer,
    Royalty,
    Other,
}

impl Status {
    /// Map a wire status string; unknown values become `Other`.
    pub fn from_wire(raw: &str) -> Self {
        raw.trim().parse().unwrap_or(Self::Other)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Producer => "producer",
            Self::Developer => "developer",
            Self::Explorer => "explorer",
            Self::Royalty => "royalty",
            Self::Other => "other",
        }
    }
}

/// Provenance of the price shown for a company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PriceSource {
    /// Secondary price dated within the staleness window.
    Live,
    /// Secondary price older than the staleness window.
    LiveStale,
    /// Derived from market cap and shares, or the row's own price.
    Calculated,
}

impl PriceSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::LiveStale => "live-stale",
            Self::Calculated => "calculated",
        }
    }
}

/// The price attached to a record after augmentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceInfo {
    pub value: Option<f64>,
    pub currency: String,
    pub as_of: Option<DateTime<Utc>>,
    pub source: PriceSource,
}

/// The price exactly as the paginated row reported it.
///
/// Never overwritten by augmentation; the calculated fallback reads from
/// here so repeated augmentation cannot accumulate stale overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportedPrice {
    pub value: Option<f64>,
    pub currency: Option<String>,
    pub as_of: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Financials {
    pub currency: Option<String>,
    pub market_cap: Option<f64>,
    pub enterprise_value: Option<f64>,
    pub cash: Option<f64>,
    pub debt: Option<f64>,
    pub revenue: Option<f64>,
    pub net_income: Option<f64>,
    pub free_cash_flow: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapitalStructure {
    pub existing_shares: Option<f64>,
    pub fully_diluted_shares: Option<f64>,
    pub options_outstanding: Option<f64>,
}

/// Gold-equivalent estimates in millions of ounces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MineralEstimates {
    pub reserves_moz: Option<f64>,
    pub measured_indicated_moz: Option<f64>,
    pub resources_moz: Option<f64>,
    pub potential_moz: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValuationMetrics {
    pub ev_per_resource_oz: Option<f64>,
    pub ev_per_reserve_oz: Option<f64>,
    pub market_cap_per_resource_oz: Option<f64>,
}

/// Gold-equivalent production in thousands of ounces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Production {
    pub current_koz: Option<f64>,
    pub future_koz: Option<f64>,
    pub reserve_life_years: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Costs {
    pub aisc_last_year: Option<f64>,
    pub aisc_future: Option<f64>,
    pub tco_future: Option<f64>,
    pub construction_costs: Option<f64>,
}

/// A screened company, read-only from the engine's perspective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    pub ticker: Option<String>,
    pub status: Status,
    pub headquarters: Option<String>,
    pub description: Option<String>,
    pub financials: Financials,
    pub capital_structure: CapitalStructure,
    pub mineral_estimates: MineralEstimates,
    pub valuation: ValuationMetrics,
    pub production: Production,
    pub costs: Costs,
    pub reported_price: ReportedPrice,
    pub price: PriceInfo,
}

impl Company {
    /// The price derived from market cap and outstanding shares, when both
    /// are present and shares are positive.
    pub fn derived_price(&self) -> Option<f64> {
        let market_cap = self.financials.market_cap?;
        let shares = self.capital_structure.existing_shares?;
        (shares > 0.0).then(|| market_cap / shares)
    }

    /// The `calculated` price: derived when possible, otherwise whatever
    /// the row reported.
    pub fn calculated_price(&self) -> PriceInfo {
        match self.derived_price() {
            Some(value) => PriceInfo {
                value: Some(value),
                currency: self
                    .financials
                    .currency
                    .clone()
                    .or_else(|| self.reported_price.currency.clone())
                    .unwrap_or_default(),
                as_of: self.reported_price.as_of,
                source: PriceSource::Calculated,
            },
            None => PriceInfo {
                value: self.reported_price.value,
                currency: self
                    .reported_price
                    .currency
                    .clone()
                    .or_else(|| self.financials.currency.clone())
                    .unwrap_or_default(),
                as_of: self.reported_price.as_of,
                source: PriceSource::Calculated,
            },
        }
    }
}
