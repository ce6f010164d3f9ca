// ── Wire types for the screening RPC functions ──
//
// Rows are flat snake_case objects. Numeric columns are decoded leniently:
// the backend serializes `numeric` columns as strings on some functions and
// as numbers on others, and a malformed value must not fail the whole page.

use serde::{Deserialize, Serialize};

/// Filter parameters forwarded verbatim to the filtering functions.
pub type FilterParams = serde_json::Map<String, serde_json::Value>;

/// Request body for `get_companies_paginated`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageQuery {
    pub page_num: u32,
    pub page_size: u32,
    pub sort_column: String,
    pub sort_direction: String,
    pub target_currency: String,
    #[serde(flatten)]
    pub filters: FilterParams,
}

/// Response of `get_companies_paginated`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageResponse {
    #[serde(default)]
    pub rows: Vec<CompanyRow>,
    #[serde(default, deserialize_with = "lenient::i64")]
    pub total_rows: Option<i64>,
}

/// One entry of `get_filtered_company_ids`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct MatchingIdRow {
    #[serde(alias = "company_id")]
    pub id: i64,
}

/// One entry of `get_latest_share_prices`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LatestPriceRow {
    #[serde(alias = "company_id")]
    pub id: i64,
    #[serde(default, alias = "price_value", deserialize_with = "lenient::f64")]
    pub price: Option<f64>,
    #[serde(default, alias = "price_currency")]
    pub currency: Option<String>,
    /// Raw date or timestamp string; parsed by the core.
    #[serde(default, alias = "price_date")]
    pub as_of: Option<String>,
}

/// One entry of `get_metric_ranges`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MetricRangeRow {
    pub metric: String,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub min_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub max_value: Option<f64>,
}

/// A company row as returned by the paginated and by-id functions.
///
/// Every field is optional on the wire; the core decides which absences
/// reject a row.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CompanyRow {
    #[serde(default, deserialize_with = "lenient::i64")]
    pub company_id: Option<i64>,
    pub company_name: Option<String>,
    pub tsx_code: Option<String>,
    pub status: Option<String>,
    pub headquarters: Option<String>,
    pub description: Option<String>,

    // Financials
    pub financial_currency: Option<String>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub market_cap_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub enterprise_value_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub cash_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub debt_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub revenue_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub net_income_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub free_cash_flow: Option<f64>,

    // Capital structure
    #[serde(default, deserialize_with = "lenient::f64")]
    pub existing_shares: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub fully_diluted_shares: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub options_outstanding: Option<f64>,

    // Mineral estimates (gold-equivalent, millions of ounces)
    #[serde(default, deserialize_with = "lenient::f64")]
    pub reserves_total_aueq_moz: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub measured_indicated_total_aueq_moz: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub resources_total_aueq_moz: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub potential_total_aueq_moz: Option<f64>,

    // Valuation
    #[serde(default, deserialize_with = "lenient::f64")]
    pub ev_per_resource_oz_all: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub ev_per_reserve_oz_all: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub mkt_cap_per_resource_oz_all: Option<f64>,

    // Production (thousands of ounces)
    #[serde(default, deserialize_with = "lenient::f64")]
    pub current_production_total_aueq_koz: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub future_production_total_aueq_koz: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub reserve_life_years: Option<f64>,

    // Costs
    #[serde(default, deserialize_with = "lenient::f64")]
    pub aisc_last_year: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub aisc_future: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub tco_future: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub construction_costs: Option<f64>,

    // Price as reported alongside the row
    #[serde(default, deserialize_with = "lenient::f64")]
    pub share_price: Option<f64>,
    pub price_currency: Option<String>,
    pub price_date: Option<String>,
}

/// Lenient numeric decoders: numbers and numeric strings are accepted,
/// everything else (including NaN/inf) becomes `None`.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub(super) fn f64<'de, D: Deserializer<'de>>(de: D) -> Result<Option<f64>, D::Error> {
        let value = Option::<Value>::deserialize(de)?;
        Ok(match value {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|v| v.is_finite()))
    }

    pub(super) fn i64<'de, D: Deserializer<'de>>(de: D) -> Result<Option<i64>, D::Error> {
        let value = Option::<Value>::deserialize(de)?;
        Ok(match value {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
            _ => None,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_strings_are_coerced() {
        let row: CompanyRow = serde_json::from_value(json!({
            "company_id": "42",
            "company_name": "Aurum Ridge",
            "market_cap_value": "1250000.5",
            "existing_shares": 1000,
            "cash_value": "n/a"
        }))
        .unwrap();

        assert_eq!(row.company_id, Some(42));
        assert_eq!(row.market_cap_value, Some(1_250_000.5));
        assert_eq!(row.existing_shares, Some(1000.0));
        assert_eq!(row.cash_value, None);
        assert_eq!(row.debt_value, None);
    }

    #[test]
    fn page_query_flattens_filters() {
        let mut filters = FilterParams::new();
        filters.insert("min_market_cap_value".into(), json!(10.0));
        let query = PageQuery {
            page_num: 2,
            page_size: 25,
            sort_column: "market_cap_value".into(),
            sort_direction: "desc".into(),
            target_currency: "USD".into(),
            filters,
        };

        let body = serde_json::to_value(&query).unwrap();
        assert_eq!(body["page_num"], 2);
        assert_eq!(body["min_market_cap_value"], 10.0);
        assert!(body.get("filters").is_none());
    }

    #[test]
    fn latest_price_accepts_aliases() {
        let row: LatestPriceRow = serde_json::from_value(json!({
            "company_id": 7,
            "price_value": "0.42",
            "price_currency": "CAD",
            "price_date": "2024-05-01"
        }))
        .unwrap();

        assert_eq!(row.id, 7);
        assert_eq!(row.price, Some(0.42));
        assert_eq!(row.currency.as_deref(), Some("CAD"));
        assert_eq!(row.as_of.as_deref(), Some("2024-05-01"));
    }
}
