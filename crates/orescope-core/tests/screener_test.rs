#![allow(clippy::unwrap_used)]
// Page fetch orchestrator tests against an in-memory backend.

mod support;

use std::sync::atomic::Ordering;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::time::Instant;

use orescope_core::{
    AccessTier, CompanyId, CoreError, CyclePhase, Metric, MetricRange, PriceSource, Screener,
    SortDirection, SortState, Status, TierSignal,
};

use support::{FakeRemote, config, latest_price, screener};

#[tokio::test(start_paused = true)]
async fn producer_screen_end_to_end() {
    let fake = FakeRemote::with_companies(40);
    *fake.prices.lock().unwrap() = (1..=10).map(|id| latest_price(id, 42.0, 1)).collect();
    let s = screener(fake, AccessTier::Free);
    s.store().set_statuses([Status::Producer]);

    s.full_cycle().await.unwrap();

    let remote = s.remote();
    assert_eq!(remote.pages_requested(), vec![1]);
    assert_eq!(remote.id_calls.load(Ordering::SeqCst), 1);
    assert_eq!(remote.price_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        remote.last_query().filters["statuses"],
        serde_json::json!(["producer"])
    );

    let snapshot = s.snapshot();
    assert_eq!(snapshot.items.len(), 25);
    assert_eq!(snapshot.total_count, 40);
    assert_eq!(snapshot.matching_ids.len(), 40);
    assert_eq!(snapshot.page, 1);

    assert_eq!(snapshot.items[0].price.source, PriceSource::Live);
    assert_eq!(snapshot.items[0].price.value, Some(42.0));
    assert_eq!(snapshot.items[20].price.source, PriceSource::Calculated);
    assert_eq!(snapshot.items[20].price.value, Some(210.0));

    let view = s.view();
    assert_eq!(view.effective_total, 40);
    assert_eq!(view.page_count, 2);
    assert_eq!(s.error(), None);
    assert_eq!(s.phase(), CyclePhase::Idle);
    assert!(!s.is_loading());
}

#[tokio::test(start_paused = true)]
async fn full_cycle_calls_run_concurrently() {
    let fake = FakeRemote::with_companies(30);
    fake.push_page_delay(Duration::from_secs(2));
    *fake.ids_delay.lock().unwrap() = Duration::from_secs(2);
    let s = screener(fake, AccessTier::Free);

    let started = Instant::now();
    s.full_cycle().await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(s.snapshot().total_count, 30);
}

#[tokio::test(start_paused = true)]
async fn id_list_count_wins_over_reported_total() {
    let fake = FakeRemote::with_companies(120);
    *fake.id_limit.lock().unwrap() = Some(117);
    let s = screener(fake, AccessTier::Free);

    s.full_cycle().await.unwrap();

    let snapshot = s.snapshot();
    assert_eq!(snapshot.total_count, 117);
    assert_eq!(snapshot.matching_ids.len(), 117);
}

#[tokio::test(start_paused = true)]
async fn exclusions_reduce_effective_total_until_reset() {
    let s = screener(FakeRemote::with_companies(50), AccessTier::Free);
    s.full_cycle().await.unwrap();

    for id in [3, 7, 11] {
        assert!(s.store().toggle_exclusion(CompanyId(id)));
    }
    let view = s.view();
    assert_eq!(view.total_count, 50);
    assert_eq!(view.effective_total, 47);
    assert_eq!(view.items.len(), 22);

    s.store().reset();
    assert_eq!(s.view().effective_total, 50);
    assert!(s.store().state().exclusions.is_empty());
}

#[tokio::test(start_paused = true)]
async fn page_requests_are_clamped() {
    let s = screener(FakeRemote::with_companies(40), AccessTier::Free);
    s.full_cycle().await.unwrap();

    assert_eq!(s.store().set_page(9), 2);
    assert_eq!(s.store().set_page(0), 1);
}

#[tokio::test(start_paused = true)]
async fn incremental_cycle_keeps_ids_and_total() {
    let s = screener(FakeRemote::with_companies(40), AccessTier::Free);
    s.full_cycle().await.unwrap();
    let first = s.snapshot();

    assert!(s.load_page(2).await.unwrap());

    let second = s.snapshot();
    assert_eq!(second.page, 2);
    assert_eq!(second.items.len(), 15);
    assert_eq!(second.items[0].id, CompanyId(26));
    assert_eq!(second.total_count, 40);
    assert!(std::sync::Arc::ptr_eq(&first.matching_ids, &second.matching_ids));
    assert_eq!(s.remote().id_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn rapid_navigation_to_same_page_fetches_once() {
    let fake = FakeRemote::with_companies(100);
    let s = screener(fake, AccessTier::Free);
    s.full_cycle().await.unwrap();
    s.remote().push_page_delay(Duration::from_secs(1));

    let (a, b) = tokio::join!(s.load_page(2), s.load_page(2));
    assert!(a.unwrap());
    assert!(!b.unwrap());
    assert_eq!(s.remote().calls_for_page(2), 1);

    // Already the last fetched page.
    assert!(!s.load_page(2).await.unwrap());
    assert_eq!(s.remote().calls_for_page(2), 1);
}

#[tokio::test(start_paused = true)]
async fn page_fetch_waits_for_running_full_cycle() {
    let fake = FakeRemote::with_companies(100);
    let s = screener(fake, AccessTier::Free);
    s.full_cycle().await.unwrap();
    *s.remote().prices_delay.lock().unwrap() = Duration::from_secs(2);

    let cycle = s.full_cycle();
    let navigate = async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let flags = s.loading();
        assert!(flags.price_augmentation);
        assert!(!flags.filtered_set && !flags.page);
        assert_eq!(s.phase(), CyclePhase::FullCycle);
        s.load_page(2).await
    };
    let (cycle, navigated) = tokio::join!(cycle, navigate);
    cycle.unwrap();
    assert!(!navigated.unwrap());

    assert_eq!(s.remote().calls_for_page(2), 0);
    assert_eq!(s.remote().pages_requested(), vec![1, 1]);
    let snapshot = s.snapshot();
    assert_eq!(snapshot.page, 1);
    assert_eq!(snapshot.total_count, 100);
    assert_eq!(s.phase(), CyclePhase::Idle);
    assert!(!s.is_loading());
}

#[tokio::test(start_paused = true)]
async fn full_cycle_failure_clears_everything() {
    let s = screener(FakeRemote::with_companies(40), AccessTier::Free);
    s.full_cycle().await.unwrap();
    assert_eq!(s.snapshot().total_count, 40);

    s.remote().fail_ids.store(true, Ordering::SeqCst);
    s.store().set_search_term("mine");
    let err = s.full_cycle().await.unwrap_err();

    assert!(matches!(err, CoreError::OperationNotFound { .. }));
    // Terminal: no retries.
    assert_eq!(s.remote().id_calls.load(Ordering::SeqCst), 2);

    let snapshot = s.snapshot();
    assert!(snapshot.items.is_empty());
    assert!(snapshot.matching_ids.is_empty());
    assert_eq!(snapshot.total_count, 0);
    assert_eq!(
        s.error().as_deref(),
        Some("The data service does not provide 'get_filtered_company_ids'")
    );
    assert_eq!(s.view().page_count, 1);
    assert!(!s.is_loading());
}

#[tokio::test(start_paused = true)]
async fn incremental_failure_keeps_totals() {
    let s = screener(FakeRemote::with_companies(40), AccessTier::Free);
    s.full_cycle().await.unwrap();

    s.remote().fail_pages.store(true, Ordering::SeqCst);
    assert!(s.load_page(2).await.is_err());

    let snapshot = s.snapshot();
    assert!(snapshot.items.is_empty());
    assert_eq!(snapshot.total_count, 40);
    assert_eq!(snapshot.matching_ids.len(), 40);
    assert!(s.error().is_some());
    assert_eq!(s.view().page_count, 2);

    // The next success replaces the error.
    s.remote().fail_pages.store(false, Ordering::SeqCst);
    assert!(s.load_page(1).await.unwrap());
    assert_eq!(s.error(), None);
    assert_eq!(s.snapshot().items.len(), 25);
}

#[tokio::test(start_paused = true)]
async fn price_sort_is_redone_after_augmentation() {
    let fake = FakeRemote::with_companies(25);
    *fake.prices.lock().unwrap() = vec![latest_price(1, 999.0, 2)];
    let s = screener(fake, AccessTier::Free);
    s.store()
        .set_sort(SortState::new("share_price", SortDirection::Descending));

    s.full_cycle().await.unwrap();

    let items = &s.snapshot().items;
    assert_eq!(items[0].id, CompanyId(1));
    assert_eq!(items[1].id, CompanyId(25));
    let prices: Vec<f64> = items.iter().filter_map(|c| c.price.value).collect();
    assert!(prices.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test(start_paused = true)]
async fn price_outage_degrades_to_calculated() {
    let fake = FakeRemote::with_companies(5);
    *fake.prices.lock().unwrap() = vec![latest_price(1, 999.0, 1)];
    fake.fail_prices.store(true, Ordering::SeqCst);
    let s = screener(fake, AccessTier::Free);

    s.full_cycle().await.unwrap();

    // One attempt plus three retries, then degrade.
    assert_eq!(s.remote().price_calls.load(Ordering::SeqCst), 4);
    let snapshot = s.snapshot();
    assert_eq!(snapshot.items.len(), 5);
    assert!(
        snapshot
            .items
            .iter()
            .all(|c| c.price.source == PriceSource::Calculated)
    );
    assert_eq!(snapshot.items[0].price.value, Some(10.0));
    assert_eq!(s.error(), None);
}

#[tokio::test(start_paused = true)]
async fn newest_cycle_wins() {
    let fake = FakeRemote::with_companies(40);
    fake.push_page_delay(Duration::from_secs(5));
    fake.push_page_delay(Duration::from_secs(1));
    let s = screener(fake, AccessTier::Free);

    let slow = s.full_cycle();
    let fast = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        s.store().set_search_term("Mine 00");
        s.full_cycle().await
    };
    let (slow, fast) = tokio::join!(slow, fast);
    slow.unwrap();
    fast.unwrap();

    // "Mine 001".."Mine 009" match the second cycle's search.
    let snapshot = s.snapshot();
    assert_eq!(snapshot.total_count, 9);
    assert_eq!(snapshot.items.len(), 9);
    assert!(!s.is_loading());
}

#[tokio::test(start_paused = true)]
async fn shutdown_discards_in_flight_results() {
    let fake = FakeRemote::with_companies(10);
    fake.push_page_delay(Duration::from_secs(5));
    let s = screener(fake, AccessTier::Free);

    let cycle = s.full_cycle();
    let stop = async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        s.shutdown().await;
    };
    let (result, ()) = tokio::join!(cycle, stop);
    result.unwrap();

    assert_eq!(s.snapshot().total_count, 0);
    assert!(s.snapshot().fetched_at.is_none());
}

#[tokio::test(start_paused = true)]
async fn nothing_is_fetched_while_tier_loads() {
    let s = Screener::new(config(), FakeRemote::with_companies(10));

    s.full_cycle().await.unwrap();
    assert!(s.remote().pages_requested().is_empty());
    assert!(s.is_loading());

    s.set_access_tier(TierSignal::Ready(AccessTier::Pro));
    assert!(!s.is_loading());
    s.full_cycle().await.unwrap();
    assert_eq!(s.remote().pages_requested(), vec![1]);
}

#[tokio::test(start_paused = true)]
async fn locked_metrics_never_reach_the_backend() {
    let s = screener(FakeRemote::with_companies(10), AccessTier::Free);
    s.store()
        .set_metric_range(Metric::AiscFuture, MetricRange::new(None, Some(1200.0)));
    s.store()
        .set_metric_range(Metric::MarketCap, MetricRange::new(Some(0.0), None));
    s.store()
        .set_sort(SortState::new("aisc_future", SortDirection::Ascending));

    s.full_cycle().await.unwrap();

    let query = s.remote().last_query();
    assert!(query.filters.get("max_aisc_future").is_none());
    assert_eq!(query.filters["min_market_cap_value"], serde_json::json!(0.0));
    assert_eq!(query.sort_column, "market_cap_value");
    assert_eq!(query.sort_direction, "desc");
}

#[tokio::test(start_paused = true)]
async fn full_cycle_resets_page_to_one() {
    let s = screener(FakeRemote::with_companies(100), AccessTier::Free);
    s.full_cycle().await.unwrap();
    s.load_page(3).await.unwrap();
    assert_eq!(s.store().state().page, 3);

    s.store().set_page_size(50).unwrap();
    s.full_cycle().await.unwrap();

    assert_eq!(s.store().state().page, 1);
    assert_eq!(s.snapshot().page, 1);
    assert_eq!(s.snapshot().items.len(), 50);
}

#[tokio::test(start_paused = true)]
async fn fetch_by_ids_bypasses_pagination_and_augments() {
    let fake = FakeRemote::with_companies(60);
    *fake.prices.lock().unwrap() = vec![latest_price(55, 7.5, 30)];
    let s = screener(fake, AccessTier::Free);

    let companies = s
        .fetch_by_ids(&[CompanyId(55), CompanyId(2)])
        .await
        .unwrap();

    assert_eq!(companies.len(), 2);
    let stale = companies.iter().find(|c| c.id == CompanyId(55)).unwrap();
    assert_eq!(stale.price.source, PriceSource::LiveStale);
    assert_eq!(stale.price.value, Some(7.5));
    assert!(s.remote().pages_requested().is_empty());

    assert!(s.fetch_by_ids(&[]).await.unwrap().is_empty());
    assert_eq!(s.remote().by_id_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn refresh_refetches_current_page() {
    let s = screener(FakeRemote::with_companies(100), AccessTier::Free);
    s.full_cycle().await.unwrap();
    s.load_page(2).await.unwrap();

    s.refresh().await.unwrap();
    assert_eq!(s.remote().calls_for_page(2), 2);
    assert_eq!(s.remote().id_calls.load(Ordering::SeqCst), 1);

    s.store().set_page(1);
    s.load_page(1).await.unwrap();
    s.refresh().await.unwrap();
    assert_eq!(s.remote().id_calls.load(Ordering::SeqCst), 2);
}
