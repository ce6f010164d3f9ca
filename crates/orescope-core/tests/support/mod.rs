//! In-memory `RemoteSource` for engine tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;
use secrecy::SecretString;
use url::Url;

use orescope_api::{
    CompanyRow, Error, FilterParams, LatestPriceRow, MatchingIdRow, MetricRangeRow, PageQuery,
    PageResponse,
};
use orescope_core::{AccessTier, RemoteSource, Screener, ScreenerConfig, TierSignal};

/// Scripted backend that records every call.
#[derive(Default)]
pub struct FakeRemote {
    pub rows: Mutex<Vec<CompanyRow>>,
    pub prices: Mutex<Vec<LatestPriceRow>>,
    /// Overrides the `total_rows` reported by the paginated call.
    pub reported_total: Mutex<Option<i64>>,
    /// Truncates the matching-id list.
    pub id_limit: Mutex<Option<usize>>,
    /// Per-call delays for the paginated call, consumed in order.
    pub page_delays: Mutex<VecDeque<Duration>>,
    pub ids_delay: Mutex<Duration>,
    pub prices_delay: Mutex<Duration>,
    pub fail_pages: AtomicBool,
    pub fail_ids: AtomicBool,
    pub fail_prices: AtomicBool,

    pub page_calls: Mutex<Vec<u32>>,
    pub queries: Mutex<Vec<PageQuery>>,
    pub id_calls: AtomicUsize,
    pub price_calls: AtomicUsize,
    pub by_id_calls: AtomicUsize,
    pub range_calls: AtomicUsize,
}

impl FakeRemote {
    pub fn with_companies(count: i64) -> Self {
        let fake = Self::default();
        *fake.rows.lock().unwrap() = (1..=count).map(row).collect();
        fake
    }

    pub fn pages_requested(&self) -> Vec<u32> {
        self.page_calls.lock().unwrap().clone()
    }

    pub fn calls_for_page(&self, page: u32) -> usize {
        self.pages_requested().iter().filter(|p| **p == page).count()
    }

    pub fn last_query(&self) -> PageQuery {
        self.queries.lock().unwrap().last().cloned().unwrap()
    }

    pub fn push_page_delay(&self, delay: Duration) {
        self.page_delays.lock().unwrap().push_back(delay);
    }

    fn matching(&self, filters: &FilterParams) -> Vec<CompanyRow> {
        let statuses: Option<Vec<String>> = filters.get("statuses").and_then(|v| {
            v.as_array()
                .map(|a| a.iter().filter_map(|s| s.as_str().map(String::from)).collect())
        });
        let search = filters
            .get("search_term")
            .and_then(|v| v.as_str())
            .map(str::to_lowercase);

        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| {
                statuses
                    .as_ref()
                    .is_none_or(|s| r.status.as_ref().is_some_and(|st| s.contains(st)))
            })
            .filter(|r| {
                search.as_ref().is_none_or(|term| {
                    r.company_name
                        .as_ref()
                        .is_some_and(|n| n.to_lowercase().contains(term))
                })
            })
            .cloned()
            .collect()
    }
}

pub fn function_missing() -> Error {
    Error::Remote {
        status: 404,
        code: Some("PGRST202".into()),
        message: "Could not find the function public.get_companies_paginated".into(),
    }
}

impl RemoteSource for FakeRemote {
    async fn fetch_page(&self, query: &PageQuery) -> Result<PageResponse, Error> {
        self.page_calls.lock().unwrap().push(query.page_num);
        self.queries.lock().unwrap().push(query.clone());
        let delay = self.page_delays.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_pages.load(Ordering::SeqCst) {
            return Err(function_missing());
        }

        let matching = self.matching(&query.filters);
        let reported = *self.reported_total.lock().unwrap();
        let total = reported.unwrap_or(i64::try_from(matching.len()).unwrap());
        let size = query.page_size as usize;
        let start = (query.page_num.saturating_sub(1) as usize) * size;
        let rows = matching.into_iter().skip(start).take(size).collect();
        Ok(PageResponse {
            rows,
            total_rows: Some(total),
        })
    }

    async fn fetch_matching_ids(&self, filters: &FilterParams) -> Result<Vec<MatchingIdRow>, Error> {
        self.id_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.ids_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_ids.load(Ordering::SeqCst) {
            return Err(function_missing());
        }

        let limit = *self.id_limit.lock().unwrap();
        let mut ids: Vec<MatchingIdRow> = self
            .matching(filters)
            .iter()
            .filter_map(|r| r.company_id.map(|id| MatchingIdRow { id }))
            .collect();
        if let Some(limit) = limit {
            ids.truncate(limit);
        }
        Ok(ids)
    }

    async fn fetch_latest_prices(&self, ids: &[i64]) -> Result<Vec<LatestPriceRow>, Error> {
        self.price_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.prices_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_prices.load(Ordering::SeqCst) {
            return Err(Error::Remote {
                status: 503,
                code: None,
                message: "price service unavailable".into(),
            });
        }
        Ok(self
            .prices
            .lock()
            .unwrap()
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn fetch_by_ids(&self, ids: &[i64]) -> Result<Vec<CompanyRow>, Error> {
        self.by_id_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.company_id.is_some_and(|id| ids.contains(&id)))
            .cloned()
            .collect())
    }

    async fn fetch_metric_ranges(&self, _currency: &str) -> Result<Vec<MetricRangeRow>, Error> {
        self.range_calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![MetricRangeRow {
            metric: "market_cap_value".into(),
            min_value: Some(0.0),
            max_value: Some(1_000_000.0),
        }])
    }
}

/// A producer with market cap `1000 * id`, 100 shares and a reported
/// price equal to its id.
pub fn row(id: i64) -> CompanyRow {
    CompanyRow {
        company_id: Some(id),
        company_name: Some(format!("Mine {id:03}")),
        tsx_code: Some(format!("M{id}")),
        status: Some("producer".into()),
        financial_currency: Some("USD".into()),
        market_cap_value: Some(1000.0 * id as f64),
        existing_shares: Some(100.0),
        share_price: Some(id as f64),
        price_currency: Some("USD".into()),
        ..CompanyRow::default()
    }
}

pub fn latest_price(id: i64, price: f64, days_old: i64) -> LatestPriceRow {
    LatestPriceRow {
        id,
        price: Some(price),
        currency: Some("USD".into()),
        as_of: Some((Utc::now() - chrono::Duration::days(days_old)).to_rfc3339()),
    }
}

pub fn config() -> ScreenerConfig {
    ScreenerConfig::new(
        Url::parse("http://localhost:54321").unwrap(),
        SecretString::from("anon-key".to_string()),
    )
}

/// Screener over `fake` with the tier already resolved.
pub fn screener(fake: FakeRemote, tier: AccessTier) -> Screener<FakeRemote> {
    let screener = Screener::new(config(), fake);
    screener.set_access_tier(TierSignal::Ready(tier));
    screener
}
