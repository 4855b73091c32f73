/*!
 * Adapter from fallible providers to the infallible generation port.
 */

use async_trait::async_trait;
use log::{debug, error};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{TextGenerator, generation_failure_marker};
use crate::providers::{Completion, Provider};

/// Token usage statistics for tracking API consumption
#[derive(Debug, Clone)]
pub struct TokenUsageStats {
    /// Number of generation requests issued
    pub requests: u64,

    /// Number of requests that ended in a failure marker
    pub failures: u64,

    /// Number of prompt tokens
    pub prompt_tokens: u64,

    /// Number of completion tokens
    pub completion_tokens: u64,

    /// Total number of tokens
    pub total_tokens: u64,

    /// Start time of token tracking
    pub start_time: Instant,

    /// Total time spent on API requests
    pub api_duration: Duration,

    /// Provider name
    pub provider: String,
}

impl Default for TokenUsageStats {
    fn default() -> Self {
        Self::with_provider_info(String::new())
    }
}

impl TokenUsageStats {
    /// Create new token usage stats with provider info
    pub fn with_provider_info(provider: String) -> Self {
        Self {
            requests: 0,
            failures: 0,
            prompt_tokens: 0,
            completion_tokens: 0,
            total_tokens: 0,
            start_time: Instant::now(),
            api_duration: Duration::from_secs(0),
            provider,
        }
    }

    /// Account for one successful completion
    pub fn record(&mut self, completion: &Completion, duration: Duration) {
        self.requests += 1;
        self.api_duration += duration;
        self.add_token_usage(completion.prompt_tokens, completion.completion_tokens);
    }

    /// Account for one failed request
    pub fn record_failure(&mut self, duration: Duration) {
        self.requests += 1;
        self.failures += 1;
        self.api_duration += duration;
    }

    /// Add token usage numbers
    pub fn add_token_usage(&mut self, prompt_tokens: Option<u64>, completion_tokens: Option<u64>) {
        if let Some(pt) = prompt_tokens {
            self.prompt_tokens += pt;
            self.total_tokens += pt;
        }

        if let Some(ct) = completion_tokens {
            self.completion_tokens += ct;
            self.total_tokens += ct;
        }
    }

    /// Calculate tokens per minute rate
    pub fn tokens_per_minute(&self) -> f64 {
        // Prefer API time, fall back to wall time
        let duration_minutes = if self.api_duration.as_secs_f64() > 0.0 {
            self.api_duration.as_secs_f64() / 60.0
        } else {
            self.start_time.elapsed().as_secs_f64() / 60.0
        };

        if duration_minutes > 0.0 {
            self.total_tokens as f64 / duration_minutes
        } else {
            0.0
        }
    }

    /// Generate a summary of token usage
    pub fn summary(&self) -> String {
        let elapsed_minutes = self.start_time.elapsed().as_secs_f64() / 60.0;
        let api_minutes = self.api_duration.as_secs_f64() / 60.0;

        format!(
            "Token Usage Summary:\n\
             Provider: {}\n\
             Requests: {} ({} failed)\n\
             Prompt tokens: {}\n\
             Completion tokens: {}\n\
             Total tokens: {}\n\
             Elapsed time: {:.2} minutes\n\
             API request time: {:.2} minutes\n\
             Tokens per minute: {:.2}",
            self.provider,
            self.requests,
            self.failures,
            self.prompt_tokens,
            self.completion_tokens,
            self.total_tokens,
            elapsed_minutes,
            api_minutes,
            self.tokens_per_minute()
        )
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    } else {
        text.to_string()
    }
}

/// Puts a [`Provider`] behind the [`TextGenerator`] port.
///
/// Provider errors are logged and turned into failure markers.
#[derive(Debug)]
pub struct ProviderGenerator {
    provider: Arc<dyn Provider>,
    usage: Mutex<TokenUsageStats>,
}

impl ProviderGenerator {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        let usage = TokenUsageStats::with_provider_info(provider.name().to_string());
        Self {
            provider,
            usage: Mutex::new(usage),
        }
    }

    /// The wrapped provider
    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    /// Snapshot of the usage recorded so far
    pub fn usage(&self) -> TokenUsageStats {
        self.usage.lock().clone()
    }
}

#[async_trait]
impl TextGenerator for ProviderGenerator {
    async fn generate(&self, prompt: &str) -> String {
        debug!("[{}] prompt: {}", self.provider.name(), preview(prompt, 100));

        let start = Instant::now();
        match self.provider.complete(prompt).await {
            Ok(completion) => {
                self.usage.lock().record(&completion, start.elapsed());
                completion.text
            }
            Err(e) => {
                self.usage.lock().record_failure(start.elapsed());
                error!("{} generation failed: {}", self.provider.name(), e);
                generation_failure_marker(e)
            }
        }
    }
}
