/*!
 * In-process provider with scripted behaviour.
 *
 * Used by tests and benchmarks to exercise the generation stack without a
 * network. Every clone shares one request counter, so a test can keep a
 * handle while the provider itself sits behind an `Arc<dyn Provider>`.
 */

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::errors::ProviderError;
use crate::providers::{Completion, Provider};

/// How a [`MockProvider`] answers
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    Working,
    /// Request number `k * fail_every` fails with a 503
    Intermittent { fail_every: usize },
    /// Every request fails with a 500
    Failing,
    /// Every request fails with a 401
    Unauthorized,
    Empty,
    /// Answers like `Working` after a delay
    Slow { delay_ms: u64 },
}

#[derive(Debug, Clone)]
pub struct MockProvider {
    behavior: MockBehavior,
    requests: Arc<AtomicUsize>,
    responder: Option<fn(&str) -> String>,
}

impl MockProvider {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            requests: Arc::new(AtomicUsize::new(0)),
            responder: None,
        }
    }

    /// Echoes the prompt behind a `[MOCK]` tag
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every: fail_every.max(1) })
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn unauthorized() -> Self {
        Self::new(MockBehavior::Unauthorized)
    }

    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Answer successful requests with `responder(prompt)` instead of the echo
    pub fn with_custom_response(mut self, responder: fn(&str) -> String) -> Self {
        self.responder = Some(responder);
        self
    }

    /// Requests received so far, across all clones
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn answer(&self, prompt: &str) -> Completion {
        let text = self
            .responder
            .map_or_else(|| format!("[MOCK] {}", prompt), |respond| respond(prompt));
        Completion {
            prompt_tokens: Some(prompt.len() as u64),
            completion_tokens: Some(text.len() as u64),
            text,
        }
    }

    /// The error scripted for the request with 0-based index `index`, if any
    fn scripted_error(&self, index: usize) -> Option<ProviderError> {
        match self.behavior {
            MockBehavior::Intermittent { fail_every } if (index + 1) % fail_every == 0 => {
                Some(ProviderError::ApiError {
                    message: format!("Simulated intermittent failure (request #{})", index + 1),
                    status_code: 503,
                })
            }
            MockBehavior::Failing => Some(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),
            MockBehavior::Unauthorized => Some(ProviderError::AuthenticationError(
                "Simulated invalid API key".to_string(),
            )),
            _ => None,
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, prompt: &str) -> Result<Completion, ProviderError> {
        let index = self.requests.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.scripted_error(index) {
            return Err(error);
        }

        match self.behavior {
            MockBehavior::Empty => Ok(Completion::text("")),
            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Ok(self.answer(prompt))
            }
            _ => Ok(self.answer(prompt)),
        }
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::Failing => Err(ProviderError::ConnectionError("Simulated outage".to_string())),
            MockBehavior::Unauthorized => Err(ProviderError::AuthenticationError("Simulated invalid API key".to_string())),
            _ => Ok(()),
        }
    }
}
