//! Filtered-dataset synchronization engine for the orescope screener.
//!
//! Keeps a paginated, sorted, filtered, currency-converted and
//! price-augmented view of the remote company dataset consistent with the
//! user's edits:
//!
//! - **[`ScreenStore`]**: single source of truth for filters, sort, page,
//!   page size, currency, access tier and the exclusion set. Setters are
//!   synchronous and never touch the network.
//!
//! - **[`Screener`]**: the page fetch orchestrator. Observes the store and
//!   runs full cycles (page 1 + matching ids, concurrently) or incremental
//!   page cycles, with last-cycle-wins publishing and a periodic refresh.
//!   Publishes an immutable [`FetchSnapshot`] consumers read via
//!   [`Screener::snapshot()`] or [`SnapshotStream`].
//!
//! - **[`RemoteSource`]**: the backend contract. [`orescope_api::RpcClient`]
//!   implements it; tests use in-memory fakes.
//!
//! - **[`retry`]**, **[`query`]**, **[`price`]**: the retry-aware caller,
//!   the pure query translator and the price augmentation pipeline.
//!
//! - **Domain model** ([`model`]): canonical `Company` records validated at
//!   the fetch boundary ([`convert`]).

pub mod config;
pub mod controller;
pub mod convert;
pub mod error;
pub mod model;
pub mod price;
pub mod query;
pub mod remote;
pub mod retry;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::ScreenerConfig;
pub use controller::{CyclePhase, Screener};
pub use error::CoreError;
pub use remote::RemoteSource;
pub use retry::RetryPolicy;
pub use store::{ScreenState, ScreenStore, ScreenView};
pub use stream::SnapshotStream;

pub use model::{
    AccessTier, CapitalStructure, Company, CompanyId, Costs, Currency, FetchSnapshot,
    FilterSettings, Financials, LoadingFlags, Metric, MetricBounds, MetricRange,
    MineralEstimates, PageSize, PriceInfo, PriceSource, Production, ReportedPrice, SortDirection,
    SortState, Status, TierSignal, ValuationMetrics,
};
