/*!
 * Retry decorator for providers.
 *
 * Retries live here rather than in the engine: the engine issues each
 * prompt once and takes whatever text comes back.
 */

use async_trait::async_trait;
use log::warn;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::ProviderError;
use crate::providers::{Completion, Provider};

/// Wraps a provider with exponential backoff on retryable errors
#[derive(Debug)]
pub struct RetryingProvider {
    inner: Arc<dyn Provider>,
    /// Retries after the first attempt
    max_retries: u32,
    /// Base backoff in milliseconds, doubled on each retry
    backoff_base_ms: u64,
}

impl RetryingProvider {
    pub fn new(inner: Arc<dyn Provider>, max_retries: u32, backoff_base_ms: u64) -> Self {
        Self {
            inner,
            max_retries,
            backoff_base_ms,
        }
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
        Duration::from_millis(self.backoff_base_ms.saturating_mul(factor))
    }
}

#[async_trait]
impl Provider for RetryingProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(&self, prompt: &str) -> Result<Completion, ProviderError> {
        let mut attempt = 0;
        loop {
            match self.inner.complete(prompt).await {
                Ok(completion) => return Ok(completion),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    let backoff = self.backoff_for(attempt);
                    warn!(
                        "{} request failed ({}), retrying in {:?} - attempt {}/{}",
                        self.inner.name(), e, backoff, attempt + 1, self.max_retries + 1
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        self.inner.test_connection().await
    }
}
