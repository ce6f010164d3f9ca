// ── Screening state ──
//
// The single source of truth for what the user is asking to see. Every
// setter is synchronous and pure: it edits this value and reports whether
// anything changed. Nothing here touches the network.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::CoreError;
use crate::model::{
    Currency, CompanyId, FilterSettings, Metric, MetricRange, PageSize, SortState, Status,
    TierSignal,
};

use super::view;

/// Filter, sort, pagination, currency, tier and exclusions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenState {
    pub filters: FilterSettings,
    pub sort: SortState,
    pub page: u32,
    pub page_size: PageSize,
    pub currency: Currency,
    #[serde(skip)]
    pub tier: TierSignal,
    pub exclusions: BTreeSet<CompanyId>,
    /// Total from the last published snapshot; drives page clamping.
    pub known_total: u64,
}

/// The inputs whose change requires a full cycle.
///
/// Page changes alone are not part of the key.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchKey {
    pub filters: FilterSettings,
    pub sort: SortState,
    pub page_size: PageSize,
    pub currency: Currency,
    pub tier: TierSignal,
}

impl Default for ScreenState {
    fn default() -> Self {
        Self::new(PageSize::default(), Currency::default())
    }
}

impl ScreenState {
    pub fn new(page_size: PageSize, currency: Currency) -> Self {
        Self {
            filters: FilterSettings::default(),
            sort: SortState::default(),
            page: 1,
            page_size,
            currency,
            tier: TierSignal::Loading,
            exclusions: BTreeSet::new(),
            known_total: 0,
        }
    }

    pub fn fetch_key(&self) -> FetchKey {
        FetchKey {
            filters: self.filters.clone(),
            sort: self.sort.clone(),
            page_size: self.page_size,
            currency: self.currency.clone(),
            tier: self.tier,
        }
    }

    pub fn effective_total(&self) -> u64 {
        view::effective_total(self.known_total, self.exclusions.len())
    }

    pub fn page_count(&self) -> u32 {
        view::page_count(self.effective_total(), self.page_size)
    }

    // ── Filters ──────────────────────────────────────────────────────

    pub fn set_statuses(&mut self, statuses: BTreeSet<Status>) -> bool {
        replace(&mut self.filters.statuses, statuses)
    }

    /// Set one metric range. Non-finite bounds are dropped, and a range
    /// left without bounds removes the filter.
    pub fn set_metric_range(&mut self, metric: Metric, range: MetricRange) -> bool {
        let range = range.finite();
        if range.is_unbounded() {
            return self.filters.metric_ranges.remove(&metric).is_some();
        }
        if self.filters.metric_ranges.get(&metric) == Some(&range) {
            return false;
        }
        self.filters.metric_ranges.insert(metric, range);
        true
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) -> bool {
        replace(&mut self.filters.search_term, term.into())
    }

    /// Replace all filters at once, normalizing ranges the same way
    /// [`Self::set_metric_range`] does.
    pub fn set_filters(&mut self, mut filters: FilterSettings) -> bool {
        filters.metric_ranges = filters
            .metric_ranges
            .into_iter()
            .map(|(metric, range)| (metric, range.finite()))
            .filter(|(_, range)| !range.is_unbounded())
            .collect();
        replace(&mut self.filters, filters)
    }

    // ── Sort & pagination ────────────────────────────────────────────

    /// No-op when the sort is identical to the current one.
    pub fn set_sort(&mut self, sort: SortState) -> bool {
        replace(&mut self.sort, sort)
    }

    /// Request a page. Out-of-range requests are clamped; returns the page
    /// actually selected.
    pub fn set_page(&mut self, page: u32) -> u32 {
        self.page = view::clamp_page(page, self.effective_total(), self.page_size);
        self.page
    }

    /// Accept only sizes from the allowed set.
    pub fn set_page_size(&mut self, size: u32) -> Result<bool, CoreError> {
        let size = PageSize::try_from(size)?;
        Ok(replace(&mut self.page_size, size))
    }

    // ── Context ──────────────────────────────────────────────────────

    pub fn set_currency(&mut self, currency: Currency) -> bool {
        replace(&mut self.currency, currency)
    }

    pub fn set_tier(&mut self, tier: TierSignal) -> bool {
        replace(&mut self.tier, tier)
    }

    /// Record the total of a freshly published full cycle and re-clamp.
    pub fn set_known_total(&mut self, total: u64) -> bool {
        let changed = replace(&mut self.known_total, total);
        let page = self.page;
        self.set_page(page);
        changed || page != self.page
    }

    // ── Exclusions ───────────────────────────────────────────────────

    /// Hide or un-hide one company. Returns `true` when it is now hidden.
    pub fn toggle_exclusion(&mut self, id: CompanyId) -> bool {
        let excluded = if self.exclusions.remove(&id) {
            false
        } else {
            self.exclusions.insert(id);
            true
        };
        let page = self.page;
        self.set_page(page);
        excluded
    }

    /// Restore defaults. Currency and tier are left untouched.
    pub fn reset(&mut self, page_size: PageSize) {
        self.filters = FilterSettings::default();
        self.sort = SortState::default();
        self.page = 1;
        self.page_size = page_size;
        self.exclusions.clear();
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}
