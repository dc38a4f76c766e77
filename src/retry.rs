//! Backoff policy for re-sending failed model requests.

use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Re-sends allowed after the first attempt
    pub max_retries: u32,
    pub initial_delay: Duration,
    /// Cap for the doubling delay
    pub max_delay: Duration,
}

impl RetryConfig {
    pub fn new(max_retries: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
            max_delay,
        }
    }

    /// Delay before re-send number `retry` (1-based)
    fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

/// Run `operation`, re-sending it while `is_transient` accepts the error and
/// the retry budget lasts. Any other error is returned as is.
pub async fn with_retry_if<F, Fut, T, E, P>(
    config: &RetryConfig,
    is_transient: P,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let mut retry = 0;
    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !is_transient(&err) || retry >= config.max_retries {
            return Err(err);
        }

        retry += 1;
        let delay = config.delay_for(retry);
        tracing::warn!(
            "Request failed ({}), re-sending in {:?} ({}/{})",
            err,
            delay,
            retry,
            config.max_retries
        );
        tokio::time::sleep(delay).await;
    }
}
