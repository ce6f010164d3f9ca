// ── Published engine outputs ──

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::company::{Company, CompanyId};
use super::filter::MetricRange;
use super::metric::Metric;

/// Result of one completed fetch cycle.
///
/// Replaced wholesale on every publish, never mutated in place. Page
/// fetches reuse the previous `matching_ids` allocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FetchSnapshot {
    pub items: Vec<Company>,
    pub total_count: u64,
    pub matching_ids: Arc<[CompanyId]>,
    /// Page the items belong to (0 before the first fetch).
    pub page: u32,
    /// Rows dropped at the fetch boundary for failing validation.
    pub rejected_rows: usize,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl FetchSnapshot {
    /// Snapshot published after a failed full cycle.
    pub(crate) fn empty() -> Self {
        Self::default()
    }

    /// Successor snapshot for a later page: new items, same ids and total.
    pub(crate) fn with_page(&self, page: u32, items: Vec<Company>, rejected_rows: usize) -> Self {
        Self {
            items,
            total_count: self.total_count,
            matching_ids: Arc::clone(&self.matching_ids),
            page,
            rejected_rows,
            fetched_at: Some(Utc::now()),
        }
    }
}

/// Fine-grained loading signals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadingFlags {
    pub ranges: bool,
    pub filtered_set: bool,
    pub page: bool,
    pub price_augmentation: bool,
}

impl LoadingFlags {
    pub fn any(&self) -> bool {
        self.ranges || self.filtered_set || self.page || self.price_augmentation
    }
}

/// Global min/max of every filterable metric.
pub type MetricBounds = BTreeMap<Metric, MetricRange>;

/// A validated secondary price entry.
#[derive(Debug, Clone, PartialEq)]
pub struct LatestPrice {
    pub id: CompanyId,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub as_of: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_successor_keeps_ids_and_total() {
        let first = FetchSnapshot {
            total_count: 40,
            matching_ids: (1..=40).map(CompanyId).collect(),
            page: 1,
            ..FetchSnapshot::default()
        };

        let second = first.with_page(2, Vec::new(), 0);
        assert_eq!(second.total_count, 40);
        assert_eq!(second.page, 2);
        assert!(Arc::ptr_eq(&first.matching_ids, &second.matching_ids));
    }

    #[test]
    fn flags_any() {
        assert!(!LoadingFlags::default().any());
        assert!(
            LoadingFlags {
                price_augmentation: true,
                ..LoadingFlags::default()
            }
            .any()
        );
    }
}
