//! Store write retry with exponential backoff.
//!
//! Every attempt is bounded by a timeout, and the number of attempts is
//! capped, so a stuck disk never blocks the ledger's write gate forever.

use super::store::StoreError;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::warn;

/// Upper bound on the delay between two attempts.
const MAX_BACKOFF: Duration = Duration::from_secs(2);

/// Bounds for one persisted write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each further retry.
    pub base_backoff: Duration,
    /// Time allowed for a single attempt.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff: Duration::from_millis(100),
            attempt_timeout: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// No retries, for callers that must not wait.
    pub fn once(attempt_timeout: Duration) -> Self {
        Self {
            max_retries: 0,
            base_backoff: Duration::ZERO,
            attempt_timeout,
        }
    }

    /// Delay before retry number `attempt` (0-based), capped at `MAX_BACKOFF`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_backoff
            .checked_mul(factor)
            .unwrap_or(MAX_BACKOFF)
            .min(MAX_BACKOFF)
    }
}

/// Retry a store operation until it succeeds, fails permanently, or the
/// policy is exhausted. Returns the last error in the latter two cases.
pub async fn retry_with_backoff<F, Fut, T>(
    policy: &RetryPolicy,
    mut operation: F,
    is_retryable: fn(&StoreError) -> bool,
) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut attempt = 0;

    loop {
        let outcome = match timeout(policy.attempt_timeout, operation()).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(policy.attempt_timeout)),
        };

        match outcome {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retryable(&err) || attempt >= policy.max_retries {
                    return Err(err);
                }

                let backoff = policy.backoff(attempt);
                warn!(
                    attempt = attempt + 1,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %err,
                    "store write failed, retrying"
                );

                sleep(backoff).await;
                attempt += 1;
            }
        }
    }
}

/// I/O failures and timeouts are transient; a document that cannot be
/// serialized will not get better on retry.
pub fn is_store_error_retryable(err: &StoreError) -> bool {
    matches!(err, StoreError::Io { .. } | StoreError::Timeout(_))
}
