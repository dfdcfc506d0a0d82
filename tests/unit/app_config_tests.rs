/*!
 * Tests for configuration files and controller construction
 */

use mdcraft::app_config::{ChatProviderKind, Config, LogLevel};
use mdcraft::app_controller::Controller;

use crate::common::{create_temp_dir, create_test_file};

#[test]
fn test_loadOrCreate_thenSave_shouldRoundTrip() {
    let dir = create_temp_dir().unwrap();
    let path = dir.path().join("mdcraft.json");

    let mut config = Config::load_or_create(&path).unwrap();
    config.chat.provider = ChatProviderKind::Ollama;
    config.speech.default_voice = "shimmer".to_string();
    config.log_level = LogLevel::Debug;
    config.save(&path).unwrap();

    let reloaded = Config::load_or_create(&path).unwrap();
    assert_eq!(reloaded.chat.provider, ChatProviderKind::Ollama);
    assert_eq!(reloaded.chat.get_model(), "llama3.2");
    assert_eq!(reloaded.speech.default_voice, "shimmer");
    assert_eq!(reloaded.log_level, LogLevel::Debug);
}

#[test]
fn test_loadOrCreate_fullFile_shouldReadEverySection() {
    let dir = create_temp_dir().unwrap();
    let path = create_test_file(
        dir.path(),
        "mdcraft.json",
        r#"{
            "chat": {"provider": "anthropic", "model": "claude-x", "api_key": "k", "timeout_secs": 5},
            "speech": {"default_voice": "nova", "chunk_chars": 500, "cache_path": "cache.db"},
            "cache": {"capacity": 7, "ttl_secs": 30},
            "concurrent_files": 2,
            "log_level": "warn"
        }"#,
    )
    .unwrap();

    let config = Config::load_or_create(&path).unwrap();

    assert_eq!(config.chat.provider, ChatProviderKind::Anthropic);
    assert_eq!(config.chat.get_model(), "claude-x");
    assert_eq!(config.chat.get_api_key(), "k");
    assert_eq!(config.chat.timeout_secs, 5);
    assert_eq!(config.chat.retry_count, 3);
    assert_eq!(config.speech.chunk_chars, 500);
    assert_eq!(config.speech.cache_path.as_deref(), Some("cache.db"));
    assert_eq!(config.speech.model, "tts-1");
    assert_eq!((config.cache.capacity, config.cache.ttl_secs), (7, 30));
    assert_eq!(config.concurrent_files, 2);
    assert_eq!(config.log_level, LogLevel::Warn);
    assert!(config.validate().is_ok());
}

#[test]
fn test_loadOrCreate_malformedFile_shouldFail() {
    let dir = create_temp_dir().unwrap();
    let path = create_test_file(dir.path(), "mdcraft.json", "{ not json").unwrap();

    assert!(Config::load_or_create(&path).is_err());
}

#[test]
fn test_validate_outOfRangeValues_shouldFail() {
    let mut config = Config::default();
    config.chat.temperature = 2.5;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.cache.capacity = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.speech.default_voice = " ".to_string();
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.concurrent_files = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_withConfig_explicitCachePath_shouldOpenEmptySpeechCache() {
    let dir = create_temp_dir().unwrap();
    let mut config = Config::default();
    config.chat.api_key = "test-key".to_string();
    config.speech.cache_path = Some(dir.path().join("nested/speech.db").to_string_lossy().into_owned());

    let controller = Controller::with_config(config).unwrap();
    let stats = tokio_test::block_on(async { controller.speech_cache_stats().await }).unwrap();

    assert_eq!(stats.total_entries, 0);
    assert!(dir.path().join("nested/speech.db").exists());
}
