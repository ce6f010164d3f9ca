// ── Runtime engine configuration ──
//
// Describes *where* the backend lives and how the engine paces itself.
// Carries credential data but never touches disk: the config crate or the
// CLI builds a `ScreenerConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::model::{Currency, PageSize};
use crate::retry::RetryPolicy;

/// Default background refresh interval.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Default staleness window for secondary prices.
pub const DEFAULT_PRICE_STALENESS: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Configuration for one screener session.
#[derive(Debug, Clone)]
pub struct ScreenerConfig {
    /// Backend base URL (e.g., `https://project.supabase.co`).
    pub url: Url,
    /// Anonymous API key sent with every request.
    pub api_key: SecretString,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retry policy for every remote call.
    pub retry: RetryPolicy,
    /// How often the background refresh runs. Zero disables it.
    pub refresh_interval: Duration,
    /// Secondary prices older than this are flagged stale.
    pub price_staleness: Duration,
    /// Page size used at mount and after reset.
    pub default_page_size: PageSize,
    /// Currency used at mount. Reset leaves currency untouched.
    pub default_currency: Currency,
}

impl ScreenerConfig {
    pub fn new(url: Url, api_key: SecretString) -> Self {
        Self {
            url,
            api_key,
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            price_staleness: DEFAULT_PRICE_STALENESS,
            default_page_size: PageSize::default(),
            default_currency: Currency::default(),
        }
    }

    /// Staleness window as a `chrono` duration for timestamp arithmetic.
    pub fn staleness_window(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.price_staleness).unwrap_or(chrono::Duration::days(7))
    }
}
