//! Model gateway: a transport plus the retry policy for rate limits

use std::time::Duration;

use super::client::{ChatTransport, CompletionRequest, GatewayError};
use crate::constants::{MAX_RATE_LIMIT_RETRIES, RATE_LIMIT_BACKOFF_MS};
use crate::retry::{RetryConfig, with_retry_if};

pub struct Gateway<T> {
    transport: T,
    retry: RetryConfig,
}

impl<T: ChatTransport> Gateway<T> {
    pub fn new(transport: T, rate_limit_retries: u32) -> Self {
        let backoff = Duration::from_millis(RATE_LIMIT_BACKOFF_MS);
        Self::with_retry_config(
            transport,
            RetryConfig::new(rate_limit_retries, backoff, backoff * 4),
        )
    }

    /// The retry count is clamped so a rate-limited request is re-sent at most once.
    pub fn with_retry_config(transport: T, mut retry: RetryConfig) -> Self {
        retry.max_retries = retry.max_retries.min(MAX_RATE_LIMIT_RETRIES);
        Self { transport, retry }
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send one prompt. Only rate-limit failures are retried; auth and
    /// transport failures come straight back to the caller.
    pub async fn complete(&self, request: &CompletionRequest) -> Result<String, GatewayError> {
        tracing::debug!(
            "Model request: {} prompt chars, context: {}",
            request.prompt.len(),
            request.context.is_some()
        );

        let result = with_retry_if(&self.retry, GatewayError::is_rate_limit, || {
            self.transport.send(request)
        })
        .await;

        if let Err(e) = &result {
            tracing::warn!("Model request failed: {}", e);
        }
        result
    }
}
