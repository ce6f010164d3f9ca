// ── Remote data collaborator ──
//
// The engine talks to the backend only through this trait. `RpcClient`
// is the production implementation; tests plug in in-memory fakes.

use std::future::Future;

use orescope_api::{
    CompanyRow, Error, FilterParams, LatestPriceRow, MatchingIdRow, MetricRangeRow, PageQuery,
    PageResponse, RpcClient, functions,
};

/// The backend operations the synchronization engine consumes.
///
/// Each method is a single attempt; retry is applied by the caller.
pub trait RemoteSource: Send + Sync + 'static {
    /// One sorted, filtered, currency-converted page plus the reported total.
    fn fetch_page(
        &self,
        query: &PageQuery,
    ) -> impl Future<Output = Result<PageResponse, Error>> + Send;

    /// Every id matching the filters.
    fn fetch_matching_ids(
        &self,
        filters: &FilterParams,
    ) -> impl Future<Output = Result<Vec<MatchingIdRow>, Error>> + Send;

    /// Latest known price per id, from the secondary price source.
    fn fetch_latest_prices(
        &self,
        ids: &[i64],
    ) -> impl Future<Output = Result<Vec<LatestPriceRow>, Error>> + Send;

    /// Full rows for specific ids, bypassing pagination.
    fn fetch_by_ids(&self, ids: &[i64])
    -> impl Future<Output = Result<Vec<CompanyRow>, Error>> + Send;

    /// Global min/max of every filterable metric in `currency`.
    fn fetch_metric_ranges(
        &self,
        currency: &str,
    ) -> impl Future<Output = Result<Vec<MetricRangeRow>, Error>> + Send;
}

/// Operation names used in logs and terminal errors.
pub(crate) mod operations {
    pub use super::functions::{
        COMPANIES_BY_IDS as FETCH_BY_IDS, COMPANIES_PAGINATED as FETCH_PAGE,
        FILTERED_COMPANY_IDS as FETCH_MATCHING_IDS, LATEST_SHARE_PRICES as FETCH_LATEST_PRICES,
        METRIC_RANGES as FETCH_METRIC_RANGES,
    };
}

impl RemoteSource for RpcClient {
    async fn fetch_page(&self, query: &PageQuery) -> Result<PageResponse, Error> {
        self.companies_page(query).await
    }

    async fn fetch_matching_ids(&self, filters: &FilterParams) -> Result<Vec<MatchingIdRow>, Error> {
        self.filtered_company_ids(filters).await
    }

    async fn fetch_latest_prices(&self, ids: &[i64]) -> Result<Vec<LatestPriceRow>, Error> {
        self.latest_share_prices(ids).await
    }

    async fn fetch_by_ids(&self, ids: &[i64]) -> Result<Vec<CompanyRow>, Error> {
        self.companies_by_ids(ids).await
    }

    async fn fetch_metric_ranges(&self, currency: &str) -> Result<Vec<MetricRangeRow>, Error> {
        self.metric_ranges(currency).await
    }
}
