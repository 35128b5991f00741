//! Retry policy for requests to the external trivia source.
use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use crate::source::FetchError;

/// Linear backoff on rate limiting. Passed explicitly to every fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_step: Duration::from_millis(8000),
        }
    }
}

impl RetryPolicy {
    /// Delay before the given retry (1-based): `attempt * backoff_step`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff_step * attempt
    }
}

/// Runs `request` until it succeeds, fails with something other than a rate
/// limit, or the policy's retries are used up. Only `FetchError::RateLimited`
/// is retried.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut request: F) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempt = 0;

    loop {
        match request().await {
            Err(FetchError::RateLimited) if attempt < policy.max_retries => {
                attempt += 1;
                let delay = policy.delay_for(attempt);
                warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "rate limited by trivia source, retrying"
                );
                sleep(delay).await;
            }
            outcome => return outcome,
        }
    }
}
