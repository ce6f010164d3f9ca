//! Query translation: screening configuration → remote parameters.
//!
//! [`translate`] is pure: the same [`FilterSettings`] always produce the same
//! parameter map. Tier gating ([`gate_filters`], [`gate_sort`]) runs before
//! translation so a tier can never request a metric it has not unlocked.

use serde_json::{Value, json};
use tracing::debug;

use orescope_api::{FilterParams, PageQuery};

use crate::model::{AccessTier, Currency, FilterSettings, PageSize, SortState};

/// Parameter key for the status filter.
pub const STATUSES_KEY: &str = "statuses";
/// Parameter key for the free-text search.
pub const SEARCH_KEY: &str = "search_term";

/// Translate filter settings into the remote parameter shape.
///
/// - a non-empty status set becomes an array of strings
/// - a non-empty trimmed search term becomes a single string
/// - each present, finite bound becomes `min_<metric>` / `max_<metric>`;
///   absent or non-numeric bounds are omitted, never coerced to zero
pub fn translate(filters: &FilterSettings) -> FilterParams {
    let mut params = FilterParams::new();

    if !filters.statuses.is_empty() {
        let statuses: Vec<&str> = filters.statuses.iter().map(|s| s.as_str()).collect();
        params.insert(STATUSES_KEY.into(), json!(statuses));
    }

    let search = filters.search_term.trim();
    if !search.is_empty() {
        params.insert(SEARCH_KEY.into(), Value::String(search.to_string()));
    }

    for (metric, range) in &filters.metric_ranges {
        let column = metric.column();
        if let Some(min) = range.min.and_then(finite) {
            params.insert(format!("min_{column}"), min);
        }
        if let Some(max) = range.max.and_then(finite) {
            params.insert(format!("max_{column}"), max);
        }
    }

    params
}

fn finite(value: f64) -> Option<Value> {
    serde_json::Number::from_f64(value).map(Value::Number)
}

/// Drop metric ranges the tier may not use.
pub fn gate_filters(filters: &FilterSettings, tier: AccessTier) -> FilterSettings {
    let mut gated = filters.clone();
    gated.metric_ranges.retain(|metric, _| {
        let allowed = metric.is_allowed_for(tier);
        if !allowed {
            debug!(%metric, %tier, "dropping filter not available on tier");
        }
        allowed
    });
    gated
}

/// Replace a sort the tier may not use with the default sort.
pub fn gate_sort(sort: &SortState, tier: AccessTier) -> SortState {
    match sort.metric() {
        Some(metric) if !metric.is_allowed_for(tier) => {
            debug!(%metric, %tier, "sort not available on tier, using default");
            SortState::default()
        }
        _ => sort.clone(),
    }
}

/// Everything needed to request one page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: PageSize,
    pub sort: SortState,
    pub currency: Currency,
    pub filters: FilterParams,
}

impl PageRequest {
    /// Wire query for the paginated function.
    pub fn to_query(&self) -> PageQuery {
        PageQuery {
            page_num: self.page,
            page_size: self.page_size.get(),
            sort_column: self.sort.key.clone(),
            sort_direction: self.sort.direction.as_str().to_string(),
            target_currency: self.currency.as_str().to_string(),
            filters: self.filters.clone(),
        }
    }
}
