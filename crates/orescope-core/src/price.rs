//! Price augmentation pipeline.
//!
//! Merges the secondary "latest price" source into fetched companies:
//!
//! | Secondary entry                     | Result       |
//! |-------------------------------------|--------------|
//! | finite price, dated inside window   | `live`       |
//! | finite price, older or undated      | `live-stale` |
//! | absent, non-finite, or call failed  | `calculated` |
//!
//! The calculated fallback is derived from the record's reported fields
//! only, so augmenting an already-augmented page is a no-op.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::model::{Company, CompanyId, LatestPrice, PriceInfo, PriceSource, SortDirection};
use crate::remote::{RemoteSource, operations};
use crate::retry::{RetryPolicy, call_with_retry};

/// Classify one secondary entry against the staleness window.
///
/// Returns `None` when the entry is unusable and the caller must fall back.
pub fn classify(
    company: &Company,
    latest: &LatestPrice,
    now: DateTime<Utc>,
    window: Duration,
) -> Option<PriceInfo> {
    let value = latest.price.filter(|p| p.is_finite())?;

    let source = match latest.as_of {
        Some(as_of) if now - as_of <= window => PriceSource::Live,
        _ => PriceSource::LiveStale,
    };

    let currency = latest
        .currency
        .clone()
        .or_else(|| company.reported_price.currency.clone())
        .or_else(|| company.financials.currency.clone())
        .unwrap_or_default();

    Some(PriceInfo {
        value: Some(value),
        currency,
        as_of: latest.as_of,
        source,
    })
}

/// Attach prices from an already-fetched secondary batch.
///
/// When several entries exist for one id, the most recently dated wins.
pub fn apply_prices(
    companies: Vec<Company>,
    prices: &[LatestPrice],
    now: DateTime<Utc>,
    window: Duration,
) -> Vec<Company> {
    let mut by_id: HashMap<CompanyId, &LatestPrice> = HashMap::with_capacity(prices.len());
    for entry in prices {
        by_id
            .entry(entry.id)
            .and_modify(|current| {
                if entry.as_of > current.as_of {
                    *current = entry;
                }
            })
            .or_insert(entry);
    }

    companies
        .into_iter()
        .map(|mut company| {
            company.price = by_id
                .get(&company.id)
                .and_then(|latest| classify(&company, latest, now, window))
                .unwrap_or_else(|| company.calculated_price());
            company
        })
        .collect()
}

/// Every record takes the calculated path.
pub fn apply_fallback(companies: Vec<Company>) -> Vec<Company> {
    companies
        .into_iter()
        .map(|mut company| {
            company.price = company.calculated_price();
            company
        })
        .collect()
}

/// Fetch the secondary prices in one batched call and merge them.
///
/// Never fails: if the batched call fails after retries, every record is
/// degraded to its calculated price.
pub async fn augment_with_prices<R: RemoteSource>(
    remote: &R,
    policy: &RetryPolicy,
    companies: Vec<Company>,
    window: Duration,
) -> Vec<Company> {
    let ids: Vec<i64> = companies
        .iter()
        .map(|c| c.id.get())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if ids.is_empty() {
        return companies;
    }

    let result = call_with_retry(policy, operations::FETCH_LATEST_PRICES, || {
        remote.fetch_latest_prices(&ids)
    })
    .await;

    match result {
        Ok(rows) => {
            let prices: Vec<LatestPrice> = rows.into_iter().map(LatestPrice::from).collect();
            debug!(
                requested = ids.len(),
                received = prices.len(),
                "merging latest prices"
            );
            apply_prices(companies, &prices, Utc::now(), window)
        }
        Err(err) => {
            warn!(error = %err, "latest price lookup failed, using calculated prices");
            apply_fallback(companies)
        }
    }
}

/// Re-sort a page by its augmented price. Records without a price sort
/// last in either direction.
pub fn sort_by_price(items: &mut [Company], direction: SortDirection) {
    items.sort_by(|a, b| match (a.price.value, b.price.value) {
        (Some(x), Some(y)) => {
            let ord = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
            match direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}
