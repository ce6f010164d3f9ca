// ── Domain model ──
//
// Canonical types produced at the fetch boundary and consumed by the
// store, the orchestrator, and presentation layers.

pub mod company;
pub mod filter;
pub mod metric;
pub mod snapshot;

pub use company::{
    CapitalStructure, Company, CompanyId, Costs, Financials, MineralEstimates, PriceInfo,
    PriceSource, Production, ReportedPrice, Status, ValuationMetrics,
};
pub use filter::{Currency, FilterSettings, MetricRange, PageSize, SortDirection, SortState};
pub use metric::{AccessTier, Metric, TierSignal};
pub use snapshot::{FetchSnapshot, LatestPrice, LoadingFlags, MetricBounds};
