/*!
 * Tests for speech planning and synthesis with mock providers
 */

use std::sync::Arc;

use mdcraft::database::Repository;
use mdcraft::document::parse;
use mdcraft::errors::SpeechError;
use mdcraft::front_matter::{FrontMatter, decode};
use mdcraft::providers::mock::{MockSpeechProvider, SpeechCall};
use mdcraft::speech::{MemoryAudioCache, SpeechSynthesizer, SqliteAudioCache, chunk_text};

use crate::common::{DIALOGUE_DOC, init_logging};

fn call(voice: &str, text: &str) -> SpeechCall {
    SpeechCall { text: text.to_string(), voice: voice.to_string() }
}

fn dialogue_audio() -> Vec<u8> {
    [
        MockSpeechProvider::audio_for("Hi Bob.", "nova"),
        MockSpeechProvider::audio_for("Hello Alice.", "onyx"),
        MockSpeechProvider::audio_for("Bye.", "nova"),
    ]
    .concat()
}

#[tokio::test]
async fn test_synthesize_dialogue_shouldSpeakEachLineWithMappedVoiceInOrder() {
    init_logging();
    let provider = MockSpeechProvider::new();
    let synth = SpeechSynthesizer::new(Arc::new(provider.clone()), Arc::new(MemoryAudioCache::new()), "alloy");
    let doc = decode(DIALOGUE_DOC).unwrap();

    let audio = synth.synthesize(&parse(&doc.body), &doc.config, "req").await.unwrap();

    assert_eq!(
        provider.calls(),
        vec![call("nova", "Hi Bob."), call("onyx", "Hello Alice."), call("nova", "Bye.")]
    );
    assert_eq!(audio, dialogue_audio());
}

#[tokio::test]
async fn test_synthesize_dialogueWithWarmSqliteCache_shouldKeepOrderWithoutCalls() {
    let repository = Repository::new_in_memory().unwrap();
    let cache = Arc::new(SqliteAudioCache::new(repository.clone()));
    let doc = decode(DIALOGUE_DOC).unwrap();
    let tree = parse(&doc.body);

    let cold = MockSpeechProvider::new();
    SpeechSynthesizer::new(Arc::new(cold.clone()), cache.clone(), "alloy")
        .synthesize(&tree, &doc.config, "cold")
        .await
        .unwrap();

    let warm = MockSpeechProvider::new();
    let audio = SpeechSynthesizer::new(Arc::new(warm.clone()), cache, "alloy")
        .synthesize(&tree, &doc.config, "warm")
        .await
        .unwrap();

    assert_eq!(cold.call_count(), 3);
    assert_eq!(warm.call_count(), 0);
    assert_eq!(audio, dialogue_audio());

    let stats = repository.get_cache_stats().await.unwrap();
    assert_eq!(stats.total_entries, 3);
    assert_eq!(stats.total_hits, 3);
}

#[tokio::test]
async fn test_synthesize_speakerMapVoice_shouldBePassedAsWritten() {
    let provider = MockSpeechProvider::new();
    let synth = SpeechSynthesizer::new(Arc::new(provider.clone()), Arc::new(MemoryAudioCache::new()), "alloy");
    let doc = decode("<!--\nspeaker_map:\n  - Speaker: Alice\n    TTS_Voice: Nova\n-->\n\n[speaker: Alice] Good morning.\n").unwrap();

    synth.synthesize(&parse(&doc.body), &doc.config, "req").await.unwrap();

    assert_eq!(provider.calls(), vec![call("Nova", "Good morning.")]);
}

#[tokio::test]
async fn test_synthesize_unknownSpeaker_shouldFailBeforeAnyCall() {
    let provider = MockSpeechProvider::new();
    let synth = SpeechSynthesizer::new(Arc::new(provider.clone()), Arc::new(MemoryAudioCache::new()), "alloy");
    let doc = decode(&DIALOGUE_DOC.replace("[speaker: Bob]", "[speaker: Carol]")).unwrap();

    let result = synth.synthesize(&parse(&doc.body), &doc.config, "req").await;

    assert!(matches!(result, Err(SpeechError::UnknownSpeaker(name)) if name == "Carol"));
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_synthesize_ttsVoice_shouldOverrideDefaultVoice() {
    let provider = MockSpeechProvider::new();
    let synth = SpeechSynthesizer::new(Arc::new(provider.clone()), Arc::new(MemoryAudioCache::new()), "alloy");
    let doc = decode("<!--\ntts_voice: echo\n-->\n\n# Notes\n\nPlain prose.\n").unwrap();

    synth.synthesize(&parse(&doc.body), &doc.config, "req").await.unwrap();

    assert_eq!(provider.calls(), vec![call("echo", "Notes Plain prose.")]);
}

#[tokio::test]
async fn test_synthesize_overBudget_shouldChunkAndStripLaterTags() {
    let provider = MockSpeechProvider::with_id3_tags();
    let synth = SpeechSynthesizer::new(Arc::new(provider.clone()), Arc::new(MemoryAudioCache::new()), "alloy")
        .with_chunk_chars(20);

    let audio = synth
        .synthesize(&parse("First sentence here. Second one.\n"), &FrontMatter::default(), "req")
        .await
        .unwrap();

    assert_eq!(
        provider.calls(),
        vec![call("alloy", "First sentence here."), call("alloy", "Second one.")]
    );
    let expected = [
        MockSpeechProvider::id3_tag(),
        MockSpeechProvider::audio_for("First sentence here.", "alloy"),
        MockSpeechProvider::audio_for("Second one.", "alloy"),
    ]
    .concat();
    assert_eq!(audio, expected);
}

#[tokio::test]
async fn test_synthesize_emptyDocument_shouldReportNoContent() {
    let provider = MockSpeechProvider::new();
    let synth = SpeechSynthesizer::new(Arc::new(provider), Arc::new(MemoryAudioCache::new()), "alloy");

    let result = synth.synthesize(&parse("```\ncode only\n```\n"), &FrontMatter::default(), "req").await;

    assert!(matches!(result, Err(SpeechError::NoContent)));
}

#[tokio::test]
async fn test_synthesize_providerFailure_shouldPropagate() {
    let provider = MockSpeechProvider::failing();
    let synth = SpeechSynthesizer::new(Arc::new(provider), Arc::new(MemoryAudioCache::new()), "alloy");

    let result = synth.synthesize(&parse("Hello.\n"), &FrontMatter::default(), "req").await;

    assert!(matches!(result, Err(SpeechError::Provider(_))));
}

#[test]
fn test_chunkText_everyChunkShouldFitBudget() {
    let text = "Short one. ".repeat(50) + &"x".repeat(75);

    let chunks = chunk_text(&text, 32);

    assert!(chunks.iter().all(|chunk| chunk.chars().count() <= 32));
    assert_eq!(chunks.concat().matches("Short one.").count(), 50);
}
