/*!
 * Common test utilities for the mdcraft test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use mdcraft::app_config::Config;
use mdcraft::app_controller::Controller;
use mdcraft::database::Repository;
use mdcraft::providers::mock::{MockChatProvider, MockSpeechProvider};

/// A short report with a title, an intro paragraph and two sections
pub const REPORT_DOC: &str = "# Introduction\n\nThis is important.\n\n## Details\n\nThe important part is here.\n\n## Summary\n\nDone.\n";

/// A two-speaker dialogue with its speaker map
pub const DIALOGUE_DOC: &str = "<!--\nspeaker_map:\n  - Speaker: Alice\n    TTS_Voice: nova\n  - Speaker: Bob\n    TTS_Voice: onyx\n-->\n\n[speaker: Alice] Hi Bob.\n[speaker: Bob] Hello Alice.\n[speaker: Alice] Bye.\n";

/// Route library logs to the test output
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Controller backed by mock providers and an in-memory speech cache
pub fn test_controller(chat: &MockChatProvider, speech: &MockSpeechProvider) -> Controller {
    test_controller_with_config(Config::default(), chat, speech)
}

/// Same as `test_controller`, with an explicit configuration
pub fn test_controller_with_config(config: Config, chat: &MockChatProvider, speech: &MockSpeechProvider) -> Controller {
    Controller::with_providers(
        config,
        Arc::new(chat.clone()),
        Arc::new(speech.clone()),
        Repository::new_in_memory().expect("in-memory database"),
    )
}
