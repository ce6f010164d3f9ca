// ── Screener: page fetch orchestrator ──
//
// Observes the screen store and keeps a published `FetchSnapshot` in sync
// with it. A change to filters, sort, page size, currency or tier runs a
// full cycle (page 1 + matching ids); a page change alone runs an
// incremental cycle. Results are published only by the newest cycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex as AsyncMutex, Notify, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use orescope_api::{RpcClient, TransportConfig};

use crate::config::ScreenerConfig;
use crate::convert::{companies_from_rows, metric_bounds_from_rows};
use crate::error::CoreError;
use crate::model::{
    AccessTier, Company, CompanyId, Currency, FetchSnapshot, LoadingFlags, MetricBounds,
    TierSignal,
};
use crate::price::{augment_with_prices, sort_by_price};
use crate::query::{PageRequest, gate_filters, gate_sort, translate};
use crate::remote::{RemoteSource, operations};
use crate::retry::call_with_retry;
use crate::store::{FetchKey, ScreenState, ScreenStore, ScreenView};
use crate::stream::SnapshotStream;

/// What the orchestrator is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    FullCycle,
    PageFetch { page: u32 },
}

/// Whether an incremental fetch honours the "last fetched page" marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Respect,
    Bypass,
}

/// Bookkeeping shared by all cycles. Never held across an await.
#[derive(Debug, Default)]
struct CycleState {
    generation: u64,
    /// `None` is the sentinel set at the start of every full cycle.
    last_fetched_page: Option<u32>,
    /// Inputs of the most recent full cycle.
    last_key: Option<FetchKey>,
    /// The most recent full cycle published successfully.
    full_ok: bool,
    bounds_generation: u64,
    bounds_currency: Option<Currency>,
}

enum Action {
    None,
    Full,
    Page(u32),
}

// ── Screener ─────────────────────────────────────────────────────

/// The synchronization engine's entry point.
///
/// Cheaply cloneable via `Arc<ScreenerInner>`. Works without
/// [`start()`](Self::start) for one-shot use: call
/// [`full_cycle()`](Self::full_cycle) and [`load_page()`](Self::load_page)
/// directly.
pub struct Screener<R: RemoteSource> {
    inner: Arc<ScreenerInner<R>>,
}

impl<R: RemoteSource> Clone for Screener<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct ScreenerInner<R> {
    config: ScreenerConfig,
    remote: R,
    store: ScreenStore,
    snapshot: watch::Sender<Arc<FetchSnapshot>>,
    loading: watch::Sender<LoadingFlags>,
    error: watch::Sender<Option<String>>,
    bounds: watch::Sender<Arc<MetricBounds>>,
    phase: watch::Sender<CyclePhase>,
    cycle: Mutex<CycleState>,
    /// Cleared on shutdown; results arriving afterwards are discarded.
    active: AtomicBool,
    visible: watch::Sender<bool>,
    session: watch::Sender<bool>,
    /// Wakes the observer after a cycle so it can catch up.
    nudge: Notify,
    cancel: CancellationToken,
    task_handles: AsyncMutex<Vec<JoinHandle<()>>>,
}

impl Screener<RpcClient> {
    /// Build a screener backed by the HTTP RPC client.
    pub fn connect(config: ScreenerConfig) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            timeout: config.timeout,
            ..TransportConfig::default()
        };
        let client = RpcClient::new(config.url.clone(), &config.api_key, &transport)?;
        Ok(Self::new(config, client))
    }
}

impl<R: RemoteSource> Screener<R> {
    /// Create a screener. Nothing is fetched until [`start()`](Self::start)
    /// or an explicit cycle call.
    pub fn new(config: ScreenerConfig, remote: R) -> Self {
        let store = ScreenStore::new(config.default_page_size, config.default_currency.clone());
        let (snapshot, _) = watch::channel(Arc::new(FetchSnapshot::default()));
        let (loading, _) = watch::channel(LoadingFlags::default());
        let (error, _) = watch::channel(None);
        let (bounds, _) = watch::channel(Arc::new(MetricBounds::new()));
        let (phase, _) = watch::channel(CyclePhase::Idle);
        let (visible, _) = watch::channel(true);
        let (session, _) = watch::channel(true);

        Self {
            inner: Arc::new(ScreenerInner {
                config,
                remote,
                store,
                snapshot,
                loading,
                error,
                bounds,
                phase,
                cycle: Mutex::new(CycleState::default()),
                active: AtomicBool::new(true),
                visible,
                session,
                nudge: Notify::new(),
                cancel: CancellationToken::new(),
                task_handles: AsyncMutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &ScreenerConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &ScreenStore {
        &self.inner.store
    }

    pub fn remote(&self) -> &R {
        &self.inner.remote
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Spawn the store observer and the periodic refresh task.
    pub async fn start(&self) {
        self.inner.active.store(true, Ordering::SeqCst);
        let mut handles = self.inner.task_handles.lock().await;

        let rx = self.inner.store.subscribe();
        handles.push(tokio::spawn(observer_task(
            self.clone(),
            rx,
            self.inner.cancel.child_token(),
        )));

        let interval = self.inner.config.refresh_interval;
        if interval.is_zero() {
            debug!("periodic refresh disabled");
        } else {
            handles.push(tokio::spawn(refresh_task(
                self.clone(),
                interval,
                self.inner.cancel.child_token(),
            )));
        }
        debug!("screener started");
    }

    /// Stop background tasks and discard any in-flight results.
    pub async fn shutdown(&self) {
        self.inner.active.store(false, Ordering::SeqCst);
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("screener shut down");
    }

    // ── External signals ─────────────────────────────────────────

    pub fn set_access_tier(&self, tier: TierSignal) -> bool {
        self.inner.store.set_tier(tier)
    }

    /// Whether the view is on screen. Periodic refresh pauses while hidden.
    pub fn set_visible(&self, visible: bool) {
        self.inner.visible.send_replace(visible);
    }

    /// Whether a user session exists. Periodic refresh pauses without one.
    pub fn set_session_present(&self, present: bool) {
        self.inner.session.send_replace(present);
    }

    // ── Cycles ───────────────────────────────────────────────────

    /// Run a full cycle: page 1 and the matching-id list concurrently,
    /// reconcile totals, augment prices, publish.
    ///
    /// Resets the page cursor to 1. On failure the snapshot is emptied and
    /// the error published. Returns `Ok` without fetching while the access
    /// tier is still loading or when superseded by a newer cycle.
    pub async fn full_cycle(&self) -> Result<(), CoreError> {
        let state = self.inner.store.state();
        let Some(tier) = state.tier.tier() else {
            debug!("access tier loading, full cycle deferred");
            return Ok(());
        };

        let generation = {
            let mut cycle = self.lock_cycle();
            cycle.generation = cycle.generation.wrapping_add(1);
            cycle.last_fetched_page = None;
            cycle.last_key = Some(state.fetch_key());
            cycle.full_ok = false;
            self.inner.phase.send_replace(CyclePhase::FullCycle);
            self.inner.loading.send_modify(|f| {
                f.filtered_set = true;
                f.page = true;
                f.price_augmentation = false;
            });
            cycle.generation
        };
        self.inner.store.reset_page();

        let request = build_request(&state, tier, 1);
        debug!(generation, filters = request.filters.len(), "full cycle started");

        let policy = &self.inner.config.retry;
        let remote = &self.inner.remote;
        let query = request.to_query();
        let (page_res, ids_res) = tokio::join!(
            call_with_retry(policy, operations::FETCH_PAGE, || remote.fetch_page(&query)),
            call_with_retry(policy, operations::FETCH_MATCHING_IDS, || {
                remote.fetch_matching_ids(&request.filters)
            }),
        );

        if !self.is_current(generation) {
            debug!(generation, "discarding superseded full cycle");
            return Ok(());
        }

        let (page, ids) = match (page_res, ids_res) {
            (Ok(page), Ok(ids)) => (page, ids),
            (Err(err), _) | (_, Err(err)) => {
                self.fail_full_cycle(generation, &err);
                return Err(err);
            }
        };
        // Fetch flags hand over to price augmentation in one step.
        self.update_flags(generation, |f| {
            f.filtered_set = false;
            f.page = false;
            f.price_augmentation = true;
        });

        let matching_ids: Arc<[CompanyId]> = ids.into_iter().map(|row| CompanyId(row.id)).collect();
        let total = reconcile_total(page.total_rows, matching_ids.len());
        let (companies, rejected) = companies_from_rows(page.rows);

        let items = self.augment(generation, companies, &request).await;
        if !self.is_current(generation) {
            debug!(generation, "discarding superseded full cycle");
            return Ok(());
        }

        let snapshot = FetchSnapshot {
            items,
            total_count: total,
            matching_ids,
            page: 1,
            rejected_rows: rejected,
            fetched_at: Some(Utc::now()),
        };
        let count = snapshot.items.len();
        if self.publish(generation, snapshot, 1, true) {
            self.inner.store.set_known_total(total);
            info!(total, items = count, rejected, "full cycle published");
        }
        self.inner.nudge.notify_one();
        Ok(())
    }

    /// Run a guarded incremental cycle for `page`.
    ///
    /// The page is clamped first. Skipped (returns `Ok(false)`) while
    /// another cycle is in progress or when `page` was the most recently
    /// fetched;
    /// `Ok(true)` means this call published the page.
    pub async fn load_page(&self, page: u32) -> Result<bool, CoreError> {
        let page = self.inner.store.set_page(page);
        self.fetch_page(page, Marker::Respect).await
    }

    /// Periodic refresh: a full cycle on page 1, otherwise a re-fetch of
    /// the current page that ignores the "last fetched page" marker.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        let state = self.inner.store.state();
        if state.tier.is_loading() || self.loading().any() {
            debug!("refresh skipped, screener busy");
            return Ok(());
        }
        if state.page <= 1 {
            self.full_cycle().await
        } else {
            self.fetch_page(state.page, Marker::Bypass).await.map(|_| ())
        }
    }

    /// Refresh the global metric bounds for the current currency.
    ///
    /// A failure keeps the previous bounds and never becomes the cycle error.
    pub async fn load_metric_bounds(&self) -> Result<(), CoreError> {
        let currency = self.inner.store.state().currency;
        let generation = {
            let mut cycle = self.lock_cycle();
            cycle.bounds_generation = cycle.bounds_generation.wrapping_add(1);
            cycle.bounds_currency = Some(currency.clone());
            self.inner.loading.send_modify(|f| f.ranges = true);
            cycle.bounds_generation
        };

        let remote = &self.inner.remote;
        let result = call_with_retry(&self.inner.config.retry, operations::FETCH_METRIC_RANGES, || {
            remote.fetch_metric_ranges(currency.as_str())
        })
        .await;

        {
            let cycle = self.lock_cycle();
            if cycle.bounds_generation != generation {
                return Ok(());
            }
            self.inner.loading.send_modify(|f| f.ranges = false);
        }
        self.inner.nudge.notify_one();

        if !self.inner.active.load(Ordering::SeqCst) {
            return Ok(());
        }
        match result {
            Ok(rows) => {
                let bounds = metric_bounds_from_rows(rows);
                debug!(%currency, metrics = bounds.len(), "metric bounds loaded");
                self.inner.bounds.send_replace(Arc::new(bounds));
                Ok(())
            }
            Err(err) => {
                warn!(%currency, error = %err, "metric bounds unavailable, keeping previous");
                Err(err)
            }
        }
    }

    /// Fetch specific companies, bypassing pagination. Prices go through
    /// the same augmentation as page results.
    pub async fn fetch_by_ids(&self, ids: &[CompanyId]) -> Result<Vec<Company>, CoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let raw: Vec<i64> = ids.iter().map(|id| id.get()).collect();
        let remote = &self.inner.remote;
        let rows = call_with_retry(&self.inner.config.retry, operations::FETCH_BY_IDS, || {
            remote.fetch_by_ids(&raw)
        })
        .await?;

        let (companies, rejected) = companies_from_rows(rows);
        debug!(requested = ids.len(), found = companies.len(), rejected, "fetched companies by id");
        Ok(augment_with_prices(
            remote,
            &self.inner.config.retry,
            companies,
            self.inner.config.staleness_window(),
        )
        .await)
    }

    // ── Observers ────────────────────────────────────────────────

    pub fn snapshot(&self) -> Arc<FetchSnapshot> {
        self.inner.snapshot.borrow().clone()
    }

    pub fn subscribe_snapshot(&self) -> SnapshotStream {
        SnapshotStream::new(self.inner.snapshot.subscribe())
    }

    pub fn loading(&self) -> LoadingFlags {
        *self.inner.loading.borrow()
    }

    pub fn subscribe_loading(&self) -> watch::Receiver<LoadingFlags> {
        self.inner.loading.subscribe()
    }

    /// Any loading flag, or the access tier still resolving.
    pub fn is_loading(&self) -> bool {
        self.loading().any() || self.inner.store.state().tier.is_loading()
    }

    /// The error of the most recent cycle, if it failed.
    pub fn error(&self) -> Option<String> {
        self.inner.error.borrow().clone()
    }

    pub fn subscribe_error(&self) -> watch::Receiver<Option<String>> {
        self.inner.error.subscribe()
    }

    pub fn metric_bounds(&self) -> Arc<MetricBounds> {
        self.inner.bounds.borrow().clone()
    }

    pub fn phase(&self) -> CyclePhase {
        *self.inner.phase.borrow()
    }

    /// Derived counts plus the visible page.
    pub fn view(&self) -> ScreenView {
        let state = self.inner.store.state();
        ScreenView::compute(&self.snapshot(), &state.exclusions, state.page, state.page_size)
    }

    // ── Internals ────────────────────────────────────────────────

    fn lock_cycle(&self) -> MutexGuard<'_, CycleState> {
        self.inner.cycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner.active.load(Ordering::SeqCst) && self.lock_cycle().generation == generation
    }

    fn update_flags(&self, generation: u64, edit: impl FnOnce(&mut LoadingFlags)) {
        let cycle = self.lock_cycle();
        if cycle.generation == generation {
            self.inner.loading.send_modify(edit);
        }
    }

    async fn fetch_page(&self, page: u32, marker: Marker) -> Result<bool, CoreError> {
        let state = self.inner.store.state();
        let Some(tier) = state.tier.tier() else {
            return Ok(false);
        };

        let generation = {
            let mut cycle = self.lock_cycle();
            let busy =
                self.inner.loading.borrow().any() || *self.inner.phase.borrow() != CyclePhase::Idle;
            let repeat = marker == Marker::Respect && cycle.last_fetched_page == Some(page);
            if busy || repeat {
                debug!(page, busy, repeat, "page fetch skipped");
                return Ok(false);
            }
            cycle.generation = cycle.generation.wrapping_add(1);
            cycle.last_fetched_page = Some(page);
            self.inner.phase.send_replace(CyclePhase::PageFetch { page });
            self.inner.loading.send_modify(|f| f.page = true);
            cycle.generation
        };

        let request = build_request(&state, tier, page);
        debug!(generation, page, "page fetch started");

        let remote = &self.inner.remote;
        let query = request.to_query();
        let result = call_with_retry(&self.inner.config.retry, operations::FETCH_PAGE, || {
            remote.fetch_page(&query)
        })
        .await;

        if !self.is_current(generation) {
            debug!(generation, page, "discarding superseded page fetch");
            return Ok(false);
        }

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                self.fail_page(generation, page, &err);
                return Err(err);
            }
        };
        self.update_flags(generation, |f| {
            f.page = false;
            f.price_augmentation = true;
        });

        let (companies, rejected) = companies_from_rows(response.rows);
        let items = self.augment(generation, companies, &request).await;
        if !self.is_current(generation) {
            debug!(generation, page, "discarding superseded page fetch");
            return Ok(false);
        }

        let snapshot = self.snapshot().with_page(page, items, rejected);
        let count = snapshot.items.len();
        let published = self.publish(generation, snapshot, page, false);
        if published {
            info!(page, items = count, rejected, "page published");
        }
        self.inner.nudge.notify_one();
        Ok(published)
    }

    async fn augment(
        &self,
        generation: u64,
        companies: Vec<Company>,
        request: &PageRequest,
    ) -> Vec<Company> {
        let mut items = augment_with_prices(
            &self.inner.remote,
            &self.inner.config.retry,
            companies,
            self.inner.config.staleness_window(),
        )
        .await;
        self.update_flags(generation, |f| f.price_augmentation = false);

        if request.sort.is_price() {
            sort_by_price(&mut items, request.sort.direction);
        }
        items
    }

    /// Replace the snapshot if `generation` is still current.
    fn publish(&self, generation: u64, snapshot: FetchSnapshot, page: u32, full: bool) -> bool {
        let mut cycle = self.lock_cycle();
        if cycle.generation != generation || !self.inner.active.load(Ordering::SeqCst) {
            return false;
        }
        cycle.last_fetched_page = Some(page);
        if full {
            cycle.full_ok = true;
        }
        self.inner.snapshot.send_replace(Arc::new(snapshot));
        self.inner.error.send_replace(None);
        self.inner.phase.send_replace(CyclePhase::Idle);
        true
    }

    fn fail_full_cycle(&self, generation: u64, err: &CoreError) {
        {
            let cycle = self.lock_cycle();
            if cycle.generation != generation {
                return;
            }
            self.inner.snapshot.send_replace(Arc::new(FetchSnapshot::empty()));
            self.inner.error.send_replace(Some(err.to_string()));
            self.inner.phase.send_replace(CyclePhase::Idle);
            self.inner.loading.send_modify(|f| {
                f.filtered_set = false;
                f.page = false;
                f.price_augmentation = false;
            });
        }
        self.inner.store.set_known_total(0);
        warn!(error = %err, "full cycle failed");
    }

    fn fail_page(&self, generation: u64, page: u32, err: &CoreError) {
        let cycle = self.lock_cycle();
        if cycle.generation != generation {
            return;
        }
        let snapshot = self.snapshot().with_page(page, Vec::new(), 0);
        self.inner.snapshot.send_replace(Arc::new(snapshot));
        self.inner.error.send_replace(Some(err.to_string()));
        self.inner.phase.send_replace(CyclePhase::Idle);
        self.inner.loading.send_modify(|f| {
            f.page = false;
            f.price_augmentation = false;
        });
        warn!(page, error = %err, "page fetch failed");
    }

    /// Decide what the current state requires and spawn it.
    fn dispatch(&self) {
        let state = self.inner.store.state();
        let (action, load_bounds) = {
            let mut cycle = self.lock_cycle();
            let load_bounds = cycle.bounds_currency.as_ref() != Some(&state.currency);
            let key = state.fetch_key();
            let action = if state.tier.is_loading() {
                Action::None
            } else if cycle.last_key.as_ref() != Some(&key) {
                cycle.last_key = Some(key);
                Action::Full
            } else if cycle.full_ok
                && cycle.last_fetched_page != Some(state.page)
                && !self.inner.loading.borrow().any()
            {
                Action::Page(state.page)
            } else {
                Action::None
            };
            (action, load_bounds)
        };

        if load_bounds {
            let screener = self.clone();
            tokio::spawn(async move {
                let _ = screener.load_metric_bounds().await;
            });
        }

        match action {
            Action::None => {}
            Action::Full => {
                let screener = self.clone();
                tokio::spawn(async move {
                    if let Err(e) = screener.full_cycle().await {
                        debug!(error = %e, "full cycle ended with error");
                    }
                });
            }
            Action::Page(page) => {
                let screener = self.clone();
                tokio::spawn(async move {
                    if let Err(e) = screener.fetch_page(page, Marker::Respect).await {
                        debug!(page, error = %e, "page fetch ended with error");
                    }
                });
            }
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────

fn build_request(state: &ScreenState, tier: AccessTier, page: u32) -> PageRequest {
    let filters = gate_filters(&state.filters, tier);
    PageRequest {
        page,
        page_size: state.page_size,
        sort: gate_sort(&state.sort, tier),
        currency: state.currency.clone(),
        filters: translate(&filters),
    }
}

/// The id list is authoritative when the two totals disagree.
fn reconcile_total(reported: Option<i64>, id_count: usize) -> u64 {
    let ids = u64::try_from(id_count).unwrap_or(u64::MAX);
    match reported.and_then(|n| u64::try_from(n).ok()) {
        Some(n) if n == ids => n,
        Some(n) => {
            warn!(reported = n, ids, "total count mismatch, using matching id count");
            ids
        }
        None => ids,
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// React to store changes and post-cycle nudges.
async fn observer_task<R: RemoteSource>(
    screener: Screener<R>,
    mut state_rx: watch::Receiver<ScreenState>,
    cancel: CancellationToken,
) {
    screener.dispatch();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                screener.dispatch();
            }
            () = screener.inner.nudge.notified() => screener.dispatch(),
        }
    }
}

/// Periodically refresh while visible and signed in.
async fn refresh_task<R: RemoteSource>(
    screener: Screener<R>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let visible = *screener.inner.visible.borrow();
                let session = *screener.inner.session.borrow();
                if !(visible && session) {
                    debug!(visible, session, "periodic refresh paused");
                    continue;
                }
                if let Err(e) = screener.refresh().await {
                    warn!(error = %e, "periodic refresh failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_list_wins_on_mismatch() {
        assert_eq!(reconcile_total(Some(120), 117), 117);
        assert_eq!(reconcile_total(Some(40), 40), 40);
        assert_eq!(reconcile_total(None, 12), 12);
        assert_eq!(reconcile_total(Some(-1), 3), 3);
    }
}
