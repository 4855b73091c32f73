/*!
 * Tests of the engine running on the real provider stack with mock providers
 */

use std::sync::Arc;

use ibut::engine::AlignmentEngine;
use ibut::generation::{is_generation_failure, ProviderGenerator, RetryingProvider};
use ibut::providers::mock::MockProvider;
use ibut::providers::Provider;

use crate::common::zh_en;

fn judge_false(prompt: &str) -> String {
    if prompt.contains("linguist, determine whether") {
        "False".to_string()
    } else {
        format!("echo {} chars", prompt.chars().count())
    }
}

#[tokio::test]
async fn test_engine_withWorkingProvider_shouldTrackUsage() {
    let mock = MockProvider::working().with_custom_response(judge_false);
    let generator = Arc::new(ProviderGenerator::new(Arc::new(mock.clone())));
    let engine = AlignmentEngine::new(generator.clone(), 3);

    let outcome = engine.translate_with_trace("人工智能正在迅速发展。", &zh_en()).await;

    assert!(outcome.converged);
    assert!(outcome.translation.starts_with("echo "));
    assert_eq!(mock.request_count(), 4);

    let usage = generator.usage();
    assert_eq!(usage.requests, 4);
    assert!(usage.prompt_tokens > 0);
    assert_eq!(usage.total_tokens, usage.prompt_tokens + usage.completion_tokens);
}

#[tokio::test]
async fn test_engine_withFailingProvider_shouldCompleteWithMarker() {
    let mock = MockProvider::failing();
    let retrying: Arc<dyn Provider> = Arc::new(RetryingProvider::new(Arc::new(mock.clone()), 1, 1));
    let generator = Arc::new(ProviderGenerator::new(retrying));
    let engine = AlignmentEngine::new(generator.clone(), 3);

    let translation = engine.translate("人工智能正在迅速发展。", &zh_en()).await;

    assert!(is_generation_failure(&translation));
    // 2 understandings + 1 judgment (aligned) + translation, each tried twice
    assert_eq!(mock.request_count(), 8);
    assert_eq!(generator.usage().failures, 4);
}

#[tokio::test]
async fn test_engine_withEmptyResponses_shouldStillTranslate() {
    let mock = MockProvider::empty();
    let engine = AlignmentEngine::new(Arc::new(ProviderGenerator::new(Arc::new(mock.clone()))), 2);

    let translation = engine.translate("A", &zh_en()).await;

    assert_eq!(translation, "");
    assert_eq!(mock.request_count(), 4);
}
