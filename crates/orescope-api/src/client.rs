// RPC HTTP client
//
// Wraps `reqwest::Client` with PostgREST URL construction, error-body
// parsing, and typed wrappers for the screening functions. One call is one
// round-trip: retry policy lives in the core, not here.

use std::time::Duration;

use reqwest::StatusCode;
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::models::{
    CompanyRow, FilterParams, LatestPriceRow, MatchingIdRow, MetricRangeRow, PageQuery,
    PageResponse,
};
use crate::transport::TransportConfig;

/// PostgREST error body: `{"code": "...", "message": "...", "details": ..., "hint": ...}`.
#[derive(Deserialize)]
struct PostgrestError {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
}

/// Remote function names.
pub mod functions {
    pub const COMPANIES_PAGINATED: &str = "get_companies_paginated";
    pub const FILTERED_COMPANY_IDS: &str = "get_filtered_company_ids";
    pub const LATEST_SHARE_PRICES: &str = "get_latest_share_prices";
    pub const COMPANIES_BY_IDS: &str = "get_companies_by_ids";
    pub const METRIC_RANGES: &str = "get_metric_ranges";
}

/// HTTP client for the backend's remote procedure endpoint.
///
/// Every call is a `POST {base}/rest/v1/rpc/{function}` with a JSON body.
pub struct RpcClient {
    http: reqwest::Client,
    base_url: Url,
    /// Reported in [`Error::Timeout`]; must match the client's own timeout.
    timeout: Duration,
}

impl RpcClient {
    /// Create a client authenticated with the backend's anonymous key.
    pub fn new(base_url: Url, api_key: &SecretString, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_authenticated_client(api_key)?;
        Ok(Self {
            http,
            base_url,
            timeout: transport.timeout,
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    ///
    /// Timeouts are reported with the default transport timeout unless
    /// [`Self::with_timeout`] says otherwise.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            timeout: TransportConfig::default().timeout,
        }
    }

    /// Set the timeout reported when a request times out.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The backend base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build the URL for a remote function.
    pub(crate) fn rpc_url(&self, function: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/rest/v1/rpc/{function}"))?)
    }

    /// Invoke a remote function with a JSON body and decode its response.
    pub async fn call<P, T>(&self, function: &str, params: &P) -> Result<T, Error>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.rpc_url(function)?;
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url)
            .json(params)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.transport_error(e))?;
        trace!(%status, bytes = body.len(), "rpc response");

        if !status.is_success() {
            return Err(parse_remote_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: format!("{function}: {e}"),
            body,
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            Error::Transport(err)
        }
    }

    // ── Screening functions ──────────────────────────────────────────

    /// Fetch one sorted, filtered, currency-converted page plus the total.
    pub async fn companies_page(&self, query: &PageQuery) -> Result<PageResponse, Error> {
        self.call(functions::COMPANIES_PAGINATED, query).await
    }

    /// Fetch every company id matching the filters.
    pub async fn filtered_company_ids(&self, filters: &FilterParams) -> Result<Vec<MatchingIdRow>, Error> {
        self.call(functions::FILTERED_COMPANY_IDS, filters).await
    }

    /// Fetch the latest known share price for each id.
    pub async fn latest_share_prices(&self, ids: &[i64]) -> Result<Vec<LatestPriceRow>, Error> {
        self.call(functions::LATEST_SHARE_PRICES, &json!({ "company_ids": ids }))
            .await
    }

    /// Fetch full rows for specific ids, bypassing pagination.
    pub async fn companies_by_ids(&self, ids: &[i64]) -> Result<Vec<CompanyRow>, Error> {
        self.call(functions::COMPANIES_BY_IDS, &json!({ "company_ids": ids }))
            .await
    }

    /// Fetch the global min/max of every filterable metric.
    pub async fn metric_ranges(&self, currency: &str) -> Result<Vec<MetricRangeRow>, Error> {
        self.call(
            functions::METRIC_RANGES,
            &json!({ "target_currency": currency }),
        )
        .await
    }
}

fn parse_remote_error(status: StatusCode, body: &str) -> Error {
    let parsed: Option<PostgrestError> = serde_json::from_str(body).ok();
    let (code, message) = match parsed {
        Some(err) => {
            let message = err
                .message
                .or(err.details)
                .unwrap_or_else(|| fallback_message(status, body));
            (err.code, message)
        }
        None => (None, fallback_message(status, body)),
    };

    Error::Remote {
        status: status.as_u16(),
        code,
        message,
    }
}

fn fallback_message(status: StatusCode, body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rpc_url_tolerates_trailing_slash() {
        let client = RpcClient::with_client(
            reqwest::Client::new(),
            Url::parse("https://example.supabase.co/").expect("valid url"),
        );
        let url = client.rpc_url("get_metric_ranges").expect("valid rpc url");
        assert_eq!(
            url.as_str(),
            "https://example.supabase.co/rest/v1/rpc/get_metric_ranges"
        );
    }

    #[test]
    fn remote_error_without_json_body_uses_text() {
        let err = parse_remote_error(StatusCode::BAD_GATEWAY, "upstream down\n");
        assert!(
            matches!(err, Error::Remote { status: 502, code: None, ref message } if message == "upstream down")
        );
    }

    #[test]
    fn remote_error_empty_body_uses_reason() {
        let err = parse_remote_error(StatusCode::SERVICE_UNAVAILABLE, "");
        assert!(
            matches!(err, Error::Remote { status: 503, ref message, .. } if message == "Service Unavailable")
        );
    }
}
