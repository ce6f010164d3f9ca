//! Retry-aware remote caller with exponential backoff.
//!
//! Every remote invocation in the engine goes through [`call_with_retry`].
//! Transport failures and remote errors are retried with `base * factor^attempt`
//! delays; a remote error saying the function does not exist is terminal and
//! surfaces immediately. Whatever comes out is a [`CoreError`] with a
//! human-readable message.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::CoreError;

/// Retry configuration for remote calls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Total attempts = `max_retries + 1`.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Multiplicative factor for each subsequent retry.
    pub factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            factor: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Disable retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (0-based).
    ///
    /// With the defaults this is `2^attempt` seconds.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let seconds = self.base_delay.as_secs_f64() * self.factor.powi(exponent);
        Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
    }
}

/// Execute `call` until it succeeds, fails terminally, or retries run out.
///
/// `operation` names the remote function for logs and terminal errors.
pub async fn call_with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut call: F,
) -> Result<T, CoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<CoreError>,
{
    let mut attempt = 0;
    loop {
        match call().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(operation, attempt, "remote call succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) => {
                let err: CoreError = err.into();
                let err = err.for_operation(operation);

                if !err.is_retryable() {
                    warn!(operation, error = %err, "remote call failed terminally");
                    return Err(err);
                }
                if attempt >= policy.max_retries {
                    warn!(operation, attempts = attempt + 1, error = %err, "remote call retries exhausted");
                    return Err(err);
                }

                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    operation,
                    attempt = attempt + 1,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "remote call failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::time::Instant;

    fn remote_err(status: u16, code: Option<&str>, message: &str) -> orescope_api::Error {
        orescope_api::Error::Remote {
            status,
            code: code.map(String::from),
            message: message.into(),
        }
    }

    #[test]
    fn default_delays_are_powers_of_two_seconds() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn function_not_found_is_not_retried() {
        let calls = Mutex::new(0u32);
        let result: Result<(), CoreError> =
            call_with_retry(&RetryPolicy::default(), "get_companies_by_ids", || {
                *calls.lock().unwrap() += 1;
                async { Err(remote_err(404, Some("PGRST202"), "Could not find the function")) }
            })
            .await;

        assert_eq!(*calls.lock().unwrap(), 1);
        assert!(matches!(
            result,
            Err(CoreError::OperationNotFound { ref operation }) if operation == "get_companies_by_ids"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn other_remote_errors_retry_with_increasing_delay() {
        let attempts: Mutex<Vec<Instant>> = Mutex::new(Vec::new());
        let result: Result<(), CoreError> =
            call_with_retry(&RetryPolicy::default(), "get_filtered_company_ids", || {
                attempts.lock().unwrap().push(Instant::now());
                async { Err(remote_err(500, None, "boom")) }
            })
            .await;

        let attempts = attempts.into_inner().unwrap();
        assert_eq!(attempts.len(), 4, "one call plus three retries");

        let gaps: Vec<Duration> = attempts.windows(2).map(|w| w[1] - w[0]).collect();
        assert!(gaps.windows(2).all(|w| w[1] > w[0]), "gaps: {gaps:?}");
        assert!(gaps[0] >= Duration::from_secs(1));

        let err = result.unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failure() {
        let calls = Mutex::new(0u32);
        let result = call_with_retry(&RetryPolicy::default(), "get_metric_ranges", || {
            let n = {
                let mut guard = calls.lock().unwrap();
                *guard += 1;
                *guard
            };
            async move {
                if n < 3 {
                    Err(orescope_api::Error::Timeout { timeout_secs: 30 })
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn no_retry_policy_makes_one_attempt() {
        let calls = Mutex::new(0u32);
        let result: Result<(), CoreError> =
            call_with_retry(&RetryPolicy::no_retry(), "get_latest_share_prices", || {
                *calls.lock().unwrap() += 1;
                async { Err(orescope_api::Error::Timeout { timeout_secs: 5 }) }
            })
            .await;

        assert_eq!(*calls.lock().unwrap(), 1);
        assert!(matches!(result, Err(CoreError::Timeout { timeout_secs: 5 })));
    }
}
