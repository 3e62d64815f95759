use std::future::Future;
use std::time::Duration;

use crate::constants::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY};
use crate::error::VerifyError;
use crate::metrics;

/// Fixed-delay retry policy for the confirmation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts allowed after the first one.
    pub max_retries: u32,
    /// Pause before each retry.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy's retries are used up. `op` receives the zero-based attempt number.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, VerifyError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, VerifyError>>,
{
    let mut attempt = 0;
    loop {
        match op(attempt).await {
            Ok(value) => {
                metrics::VERIFY_ATTEMPTS.with_label_values(&["ok"]).inc();
                return Ok(value);
            }
            Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                metrics::VERIFY_ATTEMPTS.with_label_values(&["retried"]).inc();
                attempt += 1;
                tracing::warn!(
                    error = %e,
                    attempt,
                    max_retries = policy.max_retries,
                    delay_ms = policy.delay.as_millis() as u64,
                    "verification attempt failed, retrying"
                );
                tokio::time::sleep(policy.delay).await;
            }
            Err(e) => {
                metrics::VERIFY_ATTEMPTS.with_label_values(&["failed"]).inc();
                return Err(e);
            }
        }
    }
}
