// ── API-to-domain type conversions ──
//
// Validates and coerces wire rows from `orescope_api` into canonical domain
// types. Rows that cannot identify a company are rejected here, never
// passed on half-formed.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::warn;

use orescope_api::{CompanyRow, LatestPriceRow, MetricRangeRow};

use crate::model::{
    CapitalStructure, Company, CompanyId, Costs, Financials, LatestPrice, Metric, MetricBounds,
    MetricRange, MineralEstimates, Production, ReportedPrice, Status, ValuationMetrics,
};

/// Parse a backend date or timestamp.
///
/// Accepts RFC 3339, naive `YYYY-MM-DD HH:MM:SS[.f]` / `YYYY-MM-DDTHH:MM:SS[.f]`
/// (taken as UTC), and bare dates (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Why a row was rejected at the fetch boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowRejection {
    MissingId,
    MissingName { id: i64 },
}

impl TryFrom<CompanyRow> for Company {
    type Error = RowRejection;

    fn try_from(row: CompanyRow) -> Result<Self, Self::Error> {
        let id = row.company_id.ok_or(RowRejection::MissingId)?;
        let name = non_empty(row.company_name).ok_or(RowRejection::MissingName { id })?;

        let reported_price = ReportedPrice {
            value: row.share_price,
            currency: non_empty(row.price_currency),
            as_of: row.price_date.as_deref().and_then(parse_timestamp),
        };

        let mut company = Company {
            id: CompanyId(id),
            name,
            ticker: non_empty(row.tsx_code),
            status: row
                .status
                .as_deref()
                .map_or(Status::Other, Status::from_wire),
            headquarters: non_empty(row.headquarters),
            description: non_empty(row.description),
            financials: Financials {
                currency: non_empty(row.financial_currency),
                market_cap: row.market_cap_value,
                enterprise_value: row.enterprise_value_value,
                cash: row.cash_value,
                debt: row.debt_value,
                revenue: row.revenue_value,
                net_income: row.net_income_value,
                free_cash_flow: row.free_cash_flow,
            },
            capital_structure: CapitalStructure {
                existing_shares: row.existing_shares,
                fully_diluted_shares: row.fully_diluted_shares,
                options_outstanding: row.options_outstanding,
            },
            mineral_estimates: MineralEstimates {
                reserves_moz: row.reserves_total_aueq_moz,
                measured_indicated_moz: row.measured_indicated_total_aueq_moz,
                resources_moz: row.resources_total_aueq_moz,
                potential_moz: row.potential_total_aueq_moz,
            },
            valuation: ValuationMetrics {
                ev_per_resource_oz: row.ev_per_resource_oz_all,
                ev_per_reserve_oz: row.ev_per_reserve_oz_all,
                market_cap_per_resource_oz: row.mkt_cap_per_resource_oz_all,
            },
            production: Production {
                current_koz: row.current_production_total_aueq_koz,
                future_koz: row.future_production_total_aueq_koz,
                reserve_life_years: row.reserve_life_years,
            },
            costs: Costs {
                aisc_last_year: row.aisc_last_year,
                aisc_future: row.aisc_future,
                tco_future: row.tco_future,
                construction_costs: row.construction_costs,
            },
            reported_price,
            price: crate::model::PriceInfo {
                value: None,
                currency: String::new(),
                as_of: None,
                source: crate::model::PriceSource::Calculated,
            },
        };
        company.price = company.calculated_price();
        Ok(company)
    }
}

/// Convert a batch of rows, dropping (and counting) rows that fail validation.
pub fn companies_from_rows(rows: Vec<CompanyRow>) -> (Vec<Company>, usize) {
    let mut rejected = 0;
    let companies = rows
        .into_iter()
        .filter_map(|row| match Company::try_from(row) {
            Ok(company) => Some(company),
            Err(reason) => {
                warn!(?reason, "rejecting malformed company row");
                rejected += 1;
                None
            }
        })
        .collect();
    (companies, rejected)
}

impl From<LatestPriceRow> for LatestPrice {
    fn from(row: LatestPriceRow) -> Self {
        Self {
            id: CompanyId(row.id),
            price: row.price,
            currency: non_empty(row.currency),
            as_of: row.as_of.as_deref().and_then(parse_timestamp),
        }
    }
}

/// Build metric bounds, skipping rows for metrics this build does not know.
pub fn metric_bounds_from_rows(rows: Vec<MetricRangeRow>) -> MetricBounds {
    rows.into_iter()
        .filter_map(|row| match row.metric.parse::<Metric>() {
            Ok(metric) => Some((metric, MetricRange::new(row.min_value, row.max_value))),
            Err(_) => {
                warn!(metric = %row.metric, "ignoring range for unknown metric");
                None
            }
        })
        .collect()
}
