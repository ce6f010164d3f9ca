// ── Metrics and access tiers ──
//
// Every numeric column a user may filter or sort by, and the minimum
// subscription tier that unlocks it.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use super::company::Company;

/// Subscription tier supplied by the external authorization collaborator.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AccessTier {
    Free,
    Pro,
    Premium,
}

/// The access-tier signal as observed by the engine.
///
/// While the tier is still being resolved no fetch cycle starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TierSignal {
    #[default]
    Loading,
    Ready(AccessTier),
}

impl TierSignal {
    pub fn tier(self) -> Option<AccessTier> {
        match self {
            Self::Ready(tier) => Some(tier),
            Self::Loading => None,
        }
    }

    pub fn is_loading(self) -> bool {
        matches!(self, Self::Loading)
    }
}

/// A filterable, sortable company metric.
///
/// The string form is the backend column name, which is also the suffix of
/// the `min_<metric>` / `max_<metric>` filter parameters.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[non_exhaustive]
pub enum Metric {
    #[serde(rename = "market_cap_value")]
    #[strum(serialize = "market_cap_value")]
    MarketCap,
    #[serde(rename = "enterprise_value_value")]
    #[strum(serialize = "enterprise_value_value")]
    EnterpriseValue,
    #[serde(rename = "cash_value")]
    #[strum(serialize = "cash_value")]
    Cash,
    #[serde(rename = "debt_value")]
    #[strum(serialize = "debt_value")]
    Debt,
    #[serde(rename = "revenue_value")]
    #[strum(serialize = "revenue_value")]
    Revenue,
    #[serde(rename = "net_income_value")]
    #[strum(serialize = "net_income_value")]
    NetIncome,
    #[serde(rename = "free_cash_flow")]
    #[strum(serialize = "free_cash_flow")]
    FreeCashFlow,
    #[serde(rename = "existing_shares")]
    #[strum(serialize = "existing_shares")]
    ExistingShares,
    #[serde(rename = "fully_diluted_shares")]
    #[strum(serialize = "fully_diluted_shares")]
    FullyDilutedShares,
    #[serde(rename = "reserves_total_aueq_moz")]
    #[strum(serialize = "reserves_total_aueq_moz")]
    Reserves,
    #[serde(rename = "measured_indicated_total_aueq_moz")]
    #[strum(serialize = "measured_indicated_total_aueq_moz")]
    MeasuredIndicated,
    #[serde(rename = "resources_total_aueq_moz")]
    #[strum(serialize = "resources_total_aueq_moz")]
    Resources,
    #[serde(rename = "potential_total_aueq_moz")]
    #[strum(serialize = "potential_total_aueq_moz")]
    Potential,
    #[serde(rename = "ev_per_resource_oz_all")]
    #[strum(serialize = "ev_per_resource_oz_all")]
    EvPerResourceOz,
    #[serde(rename = "ev_per_reserve_oz_all")]
    #[strum(serialize = "ev_per_reserve_oz_all")]
    EvPerReserveOz,
    #[serde(rename = "mkt_cap_per_resource_oz_all")]
    #[strum(serialize = "mkt_cap_per_resource_oz_all")]
    MarketCapPerResourceOz,
    #[serde(rename = "current_production_total_aueq_koz")]
    #[strum(serialize = "current_production_total_aueq_koz")]
    CurrentProduction,
    #[serde(rename = "future_production_total_aueq_koz")]
    #[strum(serialize = "future_production_total_aueq_koz")]
    FutureProduction,
    #[serde(rename = "reserve_life_years")]
    #[strum(serialize = "reserve_life_years")]
    ReserveLife,
    #[serde(rename = "aisc_last_year")]
    #[strum(serialize = "aisc_last_year")]
    AiscLastYear,
    #[serde(rename = "aisc_future")]
    #[strum(serialize = "aisc_future")]
    AiscFuture,
    #[serde(rename = "tco_future")]
    #[strum(serialize = "tco_future")]
    TcoFuture,
    #[serde(rename = "construction_costs")]
    #[strum(serialize = "construction_costs")]
    ConstructionCosts,
    #[serde(rename = "share_price")]
    #[strum(serialize = "share_price")]
    SharePrice,
}

impl Metric {
    /// Backend column name.
    pub fn column(self) -> &'static str {
        match self {
            Self::MarketCap => "market_cap_value",
            Self::EnterpriseValue => "enterprise_value_value",
            Self::Cash => "cash_value",
            Self::Debt => "debt_value",
            Self::Revenue => "revenue_value",
            Self::NetIncome => "net_income_value",
            Self::FreeCashFlow => "free_cash_flow",
            Self::ExistingShares => "existing_shares",
            Self::FullyDilutedShares => "fully_diluted_shares",
            Self::Reserves => "reserves_total_aueq_moz",
            Self::MeasuredIndicated => "measured_indicated_total_aueq_moz",
            Self::Resources => "resources_total_aueq_moz",
            Self::Potential => "potential_total_aueq_moz",
            Self::EvPerResourceOz => "ev_per_resource_oz_all",
            Self::EvPerReserveOz => "ev_per_reserve_oz_all",
            Self::MarketCapPerResourceOz => "mkt_cap_per_resource_oz_all",
            Self::CurrentProduction => "current_production_total_aueq_koz",
            Self::FutureProduction => "future_production_total_aueq_koz",
            Self::ReserveLife => "reserve_life_years",
            Self::AiscLastYear => "aisc_last_year",
            Self::AiscFuture => "aisc_future",
            Self::TcoFuture => "tco_future",
            Self::ConstructionCosts => "construction_costs",
            Self::SharePrice => "share_price",
        }
    }

    /// Minimum tier allowed to filter or sort by this metric.
    pub fn required_tier(self) -> AccessTier {
        match self {
            Self::MarketCap
            | Self::EnterpriseValue
            | Self::Cash
            | Self::Debt
            | Self::ExistingShares
            | Self::SharePrice => AccessTier::Free,
            Self::Revenue
            | Self::NetIncome
            | Self::FreeCashFlow
            | Self::FullyDilutedShares
            | Self::Reserves
            | Self::MeasuredIndicated
            | Self::Resources
            | Self::CurrentProduction => AccessTier::Pro,
            Self::Potential
            | Self::EvPerResourceOz
            | Self::EvPerReserveOz
            | Self::MarketCapPerResourceOz
            | Self::FutureProduction
            | Self::ReserveLife
            | Self::AiscLastYear
            | Self::AiscFuture
            | Self::TcoFuture
            | Self::ConstructionCosts => AccessTier::Premium,
        }
    }

    pub fn is_allowed_for(self, tier: AccessTier) -> bool {
        tier >= self.required_tier()
    }

    /// Read this metric from a company record.
    pub fn value(self, company: &Company) -> Option<f64> {
        let f = &company.financials;
        let cap = &company.capital_structure;
        let est = &company.mineral_estimates;
        let val = &company.valuation;
        let prod = &company.production;
        let costs = &company.costs;
        match self {
            Self::MarketCap => f.market_cap,
            Self::EnterpriseValue => f.enterprise_value,
            Self::Cash => f.cash,
            Self::Debt => f.debt,
            Self::Revenue => f.revenue,
            Self::NetIncome => f.net_income,
            Self::FreeCashFlow => f.free_cash_flow,
            Self::ExistingShares => cap.existing_shares,
            Self::FullyDilutedShares => cap.fully_diluted_shares,
            Self::Reserves => est.reserves_moz,
            Self::MeasuredIndicated => est.measured_indicated_moz,
            Self::Resources => est.resources_moz,
            Self::Potential => est.potential_moz,
            Self::EvPerResourceOz => val.ev_per_resource_oz,
            Self::EvPerReserveOz => val.ev_per_reserve_oz,
            Self::MarketCapPerResourceOz => val.market_cap_per_resource_oz,
            Self::CurrentProduction => prod.current_koz,
            Self::FutureProduction => prod.future_koz,
            Self::ReserveLife => prod.reserve_life_years,
            Self::AiscLastYear => costs.aisc_last_year,
            Self::AiscFuture => costs.aisc_future,
            Self::TcoFuture => costs.tco_future,
            Self::ConstructionCosts => costs.construction_costs,
            Self::SharePrice => company.price.value,
        }
    }
}
