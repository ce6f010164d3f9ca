// ── Core error types ──
//
// User-facing errors from orescope-core. Consumers never see raw reqwest
// errors or JSON parse failures; the `From<orescope_api::Error>` impl
// translates transport-layer errors into the engine's taxonomy:
// transient network, terminal remote, data shape, and local validation.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Transient network ────────────────────────────────────────────
    #[error("Could not reach the data service: {reason}")]
    Network { reason: String },

    #[error("The data service did not respond within {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Terminal remote ──────────────────────────────────────────────
    #[error("The data service does not provide '{operation}'")]
    OperationNotFound { operation: String },

    // ── Other remote errors ──────────────────────────────────────────
    #[error("The data service reported an error: {message}")]
    Remote {
        message: String,
        code: Option<String>,
        status: Option<u16>,
    },

    // ── Data shape ───────────────────────────────────────────────────
    #[error("Unexpected data from the data service: {message}")]
    DataShape { message: String },

    // ── Local validation ─────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal ─────────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether the retry-aware caller may try again.
    ///
    /// Only a missing remote function and local failures are terminal;
    /// every other remote or transport failure is retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::Timeout { .. } | Self::Remote { .. } | Self::DataShape { .. }
        )
    }

    /// Stamp the operation name onto a terminal not-found error.
    pub(crate) fn for_operation(self, operation: &str) -> Self {
        match self {
            Self::OperationNotFound { .. } => Self::OperationNotFound {
                operation: operation.to_string(),
            },
            other => other,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<orescope_api::Error> for CoreError {
    fn from(err: orescope_api::Error) -> Self {
        if err.is_function_not_found() {
            return CoreError::OperationNotFound {
                operation: String::from("remote function"),
            };
        }

        match err {
            orescope_api::Error::Transport(ref e) => {
                if e.is_decode() {
                    CoreError::DataShape {
                        message: e.to_string(),
                    }
                } else {
                    CoreError::Network {
                        reason: e.to_string(),
                    }
                }
            }
            orescope_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            orescope_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            orescope_api::Error::ClientBuild(message) => CoreError::Config { message },
            orescope_api::Error::Remote {
                status,
                code,
                message,
            } => CoreError::Remote {
                message,
                code,
                status: Some(status),
            },
            orescope_api::Error::Deserialization { message, body: _ } => {
                CoreError::DataShape { message }
            }
        }
    }
}
