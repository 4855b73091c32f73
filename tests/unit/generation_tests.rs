/*!
 * Tests for the generation port, the provider adapter and retries
 */

use std::sync::Arc;

use ibut::generation::{
    generation_failure_marker, is_generation_failure, ProviderGenerator, RetryingProvider, TextGenerator,
};
use ibut::providers::mock::{MockBehavior, MockProvider};
use ibut::providers::Provider;
use ibut::errors::ProviderError;

#[tokio::test]
async fn test_providerGenerator_withRetries_shouldHideTransientFailures() {
    let mock = MockProvider::intermittent(2);
    let retrying: Arc<dyn Provider> = Arc::new(RetryingProvider::new(Arc::new(mock.clone()), 3, 1));
    let generator = ProviderGenerator::new(retrying);

    for prompt in ["one", "two", "three"] {
        let text = generator.generate(prompt).await;
        assert_eq!(text, format!("[MOCK] {}", prompt));
    }

    // Requests #2 and #4 fail and are retried
    assert_eq!(mock.request_count(), 5);
    assert_eq!(generator.usage().failures, 0);
    assert_eq!(generator.usage().requests, 3);
}

#[tokio::test]
async fn test_providerGenerator_withUnauthorizedProvider_shouldReturnMarkerOnce() {
    let mock = MockProvider::unauthorized();
    let retrying: Arc<dyn Provider> = Arc::new(RetryingProvider::new(Arc::new(mock.clone()), 5, 1));
    let generator = ProviderGenerator::new(retrying);

    let text = generator.generate("prompt").await;

    assert!(is_generation_failure(&text));
    assert!(text.starts_with("Error: Authentication error"));
    assert_eq!(mock.request_count(), 1);
}

#[tokio::test]
async fn test_arcGenerator_shouldDelegate() {
    let generator: Arc<dyn TextGenerator> = Arc::new(ProviderGenerator::new(Arc::new(MockProvider::working())));
    let shared = Arc::clone(&generator);

    assert_eq!(shared.generate("hi").await, "[MOCK] hi");
}

#[tokio::test]
async fn test_slowProvider_shouldStillAnswer() {
    let generator = ProviderGenerator::new(Arc::new(MockProvider::new(MockBehavior::Slow { delay_ms: 5 })));
    assert_eq!(generator.generate("slow").await, "[MOCK] slow");
    assert!(generator.usage().api_duration.as_millis() >= 5);
}

#[test]
fn test_failureMarker_shouldCarryErrorText() {
    let marker = generation_failure_marker(ProviderError::EmptyResponse);
    assert_eq!(marker, "Error: Provider returned an empty response");
    assert!(is_generation_failure(&marker));
    assert!(!is_generation_failure("error: lowercase is regular text"));
}
