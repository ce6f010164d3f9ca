use thiserror::Error;

/// PostgREST error code for "function not found in the schema cache".
pub const FUNCTION_NOT_FOUND_CODE: &str = "PGRST202";

/// Top-level error type for the `orescope-api` crate.
///
/// Covers every failure mode of a single RPC round-trip: transport,
/// remote-reported errors, and response decoding. `orescope-core`
/// classifies these for retry and maps them into user-facing messages.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    // ── Remote ──────────────────────────────────────────────────────
    /// Structured error reported by the backend (non-2xx response).
    #[error("Remote error (HTTP {status}): {message}")]
    Remote {
        status: u16,
        code: Option<String>,
        message: String,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` when the requested remote function does not exist.
    ///
    /// Requires both a not-found status and a function-not-found signal
    /// (PostgREST code or message text). A plain 404 is not enough.
    pub fn is_function_not_found(&self) -> bool {
        let Self::Remote {
            status: 404,
            code,
            message,
        } = self
        else {
            return false;
        };

        if code.as_deref() == Some(FUNCTION_NOT_FOUND_CODE) {
            return true;
        }
        let lowered = message.to_ascii_lowercase();
        lowered.contains("could not find the function") || lowered.contains("function not found")
    }
}
