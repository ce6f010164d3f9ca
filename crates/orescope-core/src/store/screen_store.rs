// ── Observable screen store ──
//
// Wraps `ScreenState` in a `watch` channel. Setters notify subscribers only
// when the state actually changed; the orchestrator is the main subscriber.

use std::collections::BTreeSet;

use tokio::sync::watch;

use crate::error::CoreError;
use crate::model::{
    CompanyId, Currency, FilterSettings, Metric, MetricRange, PageSize, SortState, Status,
    TierSignal,
};

use super::state::ScreenState;

/// Shared, observable screening state.
pub struct ScreenStore {
    state: watch::Sender<ScreenState>,
    default_page_size: PageSize,
}

impl ScreenStore {
    pub fn new(default_page_size: PageSize, currency: Currency) -> Self {
        let (state, _) = watch::channel(ScreenState::new(default_page_size, currency));
        Self {
            state,
            default_page_size,
        }
    }

    /// Current state, cloned.
    pub fn state(&self) -> ScreenState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ScreenState> {
        self.state.subscribe()
    }

    /// Apply several edits with a single notification.
    ///
    /// `edit` returns whether it changed anything.
    pub fn update(&self, edit: impl FnOnce(&mut ScreenState) -> bool) -> bool {
        self.state.send_if_modified(edit)
    }

    pub fn set_statuses(&self, statuses: impl IntoIterator<Item = Status>) -> bool {
        let statuses: BTreeSet<Status> = statuses.into_iter().collect();
        self.update(|s| s.set_statuses(statuses))
    }

    pub fn set_metric_range(&self, metric: Metric, range: MetricRange) -> bool {
        self.update(|s| s.set_metric_range(metric, range))
    }

    pub fn set_search_term(&self, term: impl Into<String>) -> bool {
        let term = term.into();
        self.update(|s| s.set_search_term(term))
    }

    pub fn set_filters(&self, filters: FilterSettings) -> bool {
        self.update(|s| s.set_filters(filters))
    }

    pub fn set_sort(&self, sort: SortState) -> bool {
        self.update(|s| s.set_sort(sort))
    }

    /// Returns the page actually selected after clamping.
    pub fn set_page(&self, page: u32) -> u32 {
        let mut selected = 1;
        self.update(|s| {
            let before = s.page;
            selected = s.set_page(page);
            before != selected
        });
        selected
    }

    pub fn set_page_size(&self, size: u32) -> Result<bool, CoreError> {
        let mut outcome = Ok(false);
        self.update(|s| {
            outcome = s.set_page_size(size);
            matches!(outcome, Ok(true))
        });
        outcome
    }

    pub fn set_currency(&self, currency: Currency) -> bool {
        self.update(|s| s.set_currency(currency))
    }

    pub fn set_tier(&self, tier: TierSignal) -> bool {
        self.update(|s| s.set_tier(tier))
    }

    /// Returns `true` when the company is now excluded.
    pub fn toggle_exclusion(&self, id: CompanyId) -> bool {
        let mut excluded = false;
        self.state.send_modify(|s| excluded = s.toggle_exclusion(id));
        excluded
    }

    /// Restore defaults; currency is left untouched.
    pub fn reset(&self) {
        let page_size = self.default_page_size;
        self.update(|s| {
            let before = s.clone();
            s.reset(page_size);
            *s != before
        });
    }

    pub(crate) fn set_known_total(&self, total: u64) {
        self.update(|s| s.set_known_total(total));
    }

    /// Move to page 1 without clamping side effects.
    pub(crate) fn reset_page(&self) {
        self.update(|s| {
            let changed = s.page != 1;
            s.page = 1;
            changed
        });
    }
}
