// ── Derived view computer ──
//
// Pure arithmetic over the published total and the exclusion set.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;

use crate::model::{Company, CompanyId, FetchSnapshot, PageSize};

/// `max(0, total - excluded)`.
pub fn effective_total(total: u64, excluded: usize) -> u64 {
    total.saturating_sub(u64::try_from(excluded).unwrap_or(u64::MAX))
}

/// `max(1, ceil(effective_total / page_size))`.
pub fn page_count(effective_total: u64, page_size: PageSize) -> u32 {
    let pages = effective_total.div_ceil(u64::from(page_size.get()));
    u32::try_from(pages).unwrap_or(u32::MAX).max(1)
}

/// Clamp a requested page into `1..=page_count`.
pub fn clamp_page(requested: u32, effective_total: u64, page_size: PageSize) -> u32 {
    requested.clamp(1, page_count(effective_total, page_size))
}

/// What a presentation layer renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenView {
    /// Page items with excluded companies removed.
    pub items: Vec<Company>,
    pub total_count: u64,
    pub effective_total: u64,
    pub excluded: usize,
    pub page: u32,
    pub page_count: u32,
    pub page_size: PageSize,
}

impl ScreenView {
    pub fn compute(
        snapshot: &Arc<FetchSnapshot>,
        exclusions: &BTreeSet<CompanyId>,
        page: u32,
        page_size: PageSize,
    ) -> Self {
        let effective = effective_total(snapshot.total_count, exclusions.len());
        Self {
            items: snapshot
                .items
                .iter()
                .filter(|c| !exclusions.contains(&c.id))
                .cloned()
                .collect(),
            total_count: snapshot.total_count,
            effective_total: effective,
            excluded: exclusions.len(),
            page,
            page_count: page_count(effective, page_size),
            page_size,
        }
    }
}
