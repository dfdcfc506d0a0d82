/*!
 * Tests for prompt building and cached completions
 */

use std::sync::Arc;
use std::time::Duration;

use mdcraft::completion::{CommandMode, CompletionCache, CompletionService, build_prompt};
use mdcraft::errors::ProviderError;
use mdcraft::providers::mock::MockChatProvider;
use mdcraft::row_markers::attach_row_markers;

use crate::common::{REPORT_DOC, init_logging};

fn service_with(provider: &MockChatProvider, cache: CompletionCache) -> CompletionService {
    CompletionService::new(Arc::new(provider.clone()), cache)
}

#[test]
fn test_buildPrompt_operations_shouldCarryMarkedDocument() {
    let prompt = build_prompt(CommandMode::Operations, "Number the headings", &attach_row_markers(REPORT_DOC));

    assert!(prompt.contains("**Command**: Number the headings"));
    assert!(prompt.contains("# Introduction[ROW 1]"));
    assert!(prompt.contains("add_heading_numbering"));
}

#[test]
fn test_buildPrompt_freeForm_shouldNotListOperations() {
    let prompt = build_prompt(CommandMode::FreeForm, "Shorten it", REPORT_DOC);

    assert!(prompt.contains("Shorten it"));
    assert!(prompt.contains("This is important."));
    assert!(!prompt.contains("convert_to_mp3"));
}

#[tokio::test]
async fn test_samePromptTwiceWithinTtl_shouldCallProviderOnce() {
    init_logging();
    let provider = MockChatProvider::replying("{\"operations\": []}");
    let service = service_with(&provider, CompletionCache::default());

    let first = service.get_or_compute("prompt", "req-1").await.unwrap();
    let second = service.get_or_compute("prompt", "req-2").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(provider.request_count(), 1);
    let stats = service.cache().stats();
    assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));
}

#[tokio::test]
async fn test_expiredEntry_shouldCallProviderAgain() {
    let provider = MockChatProvider::scripted(["first", "second"]);
    let service = service_with(&provider, CompletionCache::new(10, Duration::from_millis(20)));

    assert_eq!(service.get_or_compute("prompt", "req").await.unwrap(), "first");
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(service.get_or_compute("prompt", "req").await.unwrap(), "second");

    assert_eq!(provider.request_count(), 2);
}

#[tokio::test]
async fn test_sharedCache_shouldServeOtherServiceWithSameModel() {
    let cache = CompletionCache::default();
    let first_provider = MockChatProvider::replying("cached answer");
    let second_provider = MockChatProvider::replying("fresh answer");

    service_with(&first_provider, cache.clone())
        .get_or_compute("prompt", "req")
        .await
        .unwrap();
    let answer = service_with(&second_provider, cache.clone())
        .get_or_compute("prompt", "req")
        .await
        .unwrap();

    assert_eq!(answer, "cached answer");
    assert_eq!(second_provider.request_count(), 0);
}

#[tokio::test]
async fn test_differentPrompts_shouldBeCachedSeparately() {
    let provider = MockChatProvider::scripted(["a", "b"]);
    let service = service_with(&provider, CompletionCache::default());

    assert_eq!(service.get_or_compute("one", "req").await.unwrap(), "a");
    assert_eq!(service.get_or_compute("two", "req").await.unwrap(), "b");
    assert_eq!(service.get_or_compute("one", "req").await.unwrap(), "a");

    assert_eq!(provider.request_count(), 2);
}

#[tokio::test]
async fn test_providerFailure_shouldPropagateAndStayUncached() {
    let provider = MockChatProvider::failing();
    let service = service_with(&provider, CompletionCache::default());

    assert!(service.get_or_compute("prompt", "req").await.is_err());
    assert!(service.get_or_compute("prompt", "req").await.is_err());

    assert_eq!(provider.request_count(), 2);
    assert!(service.cache().is_empty());
}

#[tokio::test]
async fn test_missingCredentials_shouldFailWithoutRequest() {
    let provider = MockChatProvider::missing_credentials();
    let service = service_with(&provider, CompletionCache::default());

    let result = service.get_or_compute("prompt", "req").await;

    assert!(matches!(result, Err(ProviderError::AuthenticationError(_))));
    assert_eq!(provider.request_count(), 0);
}

#[tokio::test]
async fn test_systemMessage_shouldPrecedePrompt() {
    let provider = MockChatProvider::replying("ok");
    let service = service_with(&provider, CompletionCache::default()).with_system_prompt("Be terse.");

    service.get_or_compute("prompt", "req").await.unwrap();

    let conversation = &provider.received()[0];
    assert_eq!(conversation[0].role, "system");
    assert_eq!(conversation[0].content, "Be terse.");
    assert_eq!(conversation[1].role, "user");
    assert_eq!(conversation[1].content, "prompt");
}

#[test]
fn test_lruEviction_shouldDropLeastRecentlyRead() {
    let cache = CompletionCache::new(2, Duration::from_secs(60));
    cache.set("a", "1");
    cache.set("b", "2");
    assert_eq!(cache.get("a").as_deref(), Some("1"));

    cache.set("c", "3");

    assert!(cache.has("a"));
    assert!(!cache.has("b"));
    assert!(cache.has("c"));
}
