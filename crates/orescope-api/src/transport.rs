// Shared transport configuration for building reqwest::Client instances.
//
// Keeps timeout, user agent, and default-header handling in one place so
// the RPC client and tests build identical clients.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

use crate::error::Error;

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: concat!("orescope/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        self.build_client_with_headers(HeaderMap::new())
    }

    /// Build a `reqwest::Client` with additional default headers.
    pub fn build_client_with_headers(&self, headers: HeaderMap) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.as_str())
            .default_headers(headers)
            .build()
            .map_err(|e| Error::ClientBuild(e.to_string()))
    }

    /// Build a client that authenticates every request with the backend's
    /// anonymous key (`apikey` header plus a bearer token).
    pub fn build_authenticated_client(&self, api_key: &SecretString) -> Result<reqwest::Client, Error> {
        let key = api_key.expose_secret();

        let mut apikey = HeaderValue::from_str(key)
            .map_err(|e| Error::ClientBuild(format!("invalid API key header: {e}")))?;
        apikey.set_sensitive(true);

        let mut bearer = HeaderValue::from_str(&format!("Bearer {key}"))
            .map_err(|e| Error::ClientBuild(format!("invalid API key header: {e}")))?;
        bearer.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert("apikey", apikey);
        headers.insert(AUTHORIZATION, bearer);

        self.build_client_with_headers(headers)
    }
}
