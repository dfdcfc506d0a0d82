/*!
 * End-to-end tests of the command pipeline with mock providers
 */

use mdcraft::completion::CommandMode;
use mdcraft::errors::{CommandError, ProviderError};
use mdcraft::operations::ArtifactKind;
use mdcraft::providers::mock::{MockChatProvider, MockSpeechProvider};
use serde_json::json;

use crate::common::{DIALOGUE_DOC, REPORT_DOC, init_logging, test_controller};

#[tokio::test]
async fn test_applyCommand_introductionExample_shouldRenameAndEmphasize() {
    init_logging();
    let reply = MockChatProvider::operations_reply(&[
        ("change_heading", json!({"match": "Introduction[ROW 1]", "newText": "Overview"})),
        ("emphasize_text", json!({"text": "important", "lineNumber": 2})),
    ]);
    let chat = MockChatProvider::replying(reply);
    let controller = test_controller(&chat, &MockSpeechProvider::new());

    let result = controller
        .apply_command(
            "# Introduction\nThis is important.",
            "Rename the introduction to Overview and emphasize 'important' in the first paragraph",
            CommandMode::Operations,
            "req",
        )
        .await
        .unwrap();

    assert_eq!(result.modified_content, "# Overview\n\nThis is **important**.\n");
    assert_eq!(result.operations_applied, vec!["change_heading".to_string(), "emphasize_text".to_string()]);
    let prompt = &chat.received()[0][1].content;
    assert!(prompt.contains("# Introduction[ROW 1]\nThis is important.[ROW 2]"));
}

#[tokio::test]
async fn test_applyCommand_rowAsMarkerString_shouldTargetLaterLine() {
    let reply = MockChatProvider::operations_reply(&[("emphasize_text", json!({"text": "important", "lineNumber": "[ROW 7]"}))]);
    let controller = test_controller(&MockChatProvider::replying(reply), &MockSpeechProvider::new());

    let result = controller
        .apply_command(REPORT_DOC, "Emphasize 'important' in the details", CommandMode::Operations, "req")
        .await
        .unwrap();

    assert!(result.modified_content.contains("This is important."));
    assert!(result.modified_content.contains("The **important** part is here."));
}

#[tokio::test]
async fn test_applyCommand_sameCommandTwice_shouldAskModelOnce() {
    let reply = MockChatProvider::operations_reply(&[("add_heading_numbering", json!({}))]);
    let chat = MockChatProvider::replying(reply);
    let controller = test_controller(&chat, &MockSpeechProvider::new());

    let first = controller.apply_command(REPORT_DOC, "Number headings", CommandMode::Operations, "a").await.unwrap();
    let second = controller.apply_command(REPORT_DOC, "Number headings", CommandMode::Operations, "b").await.unwrap();

    assert_eq!(first.modified_content, second.modified_content);
    assert_eq!(chat.request_count(), 1);
    let stats = controller.completion_cache_stats();
    assert_eq!((stats.hits, stats.misses), (1, 1));
}

#[tokio::test]
async fn test_applyCommand_dialogueToMp3_shouldProduceMultiVoiceAudio() {
    init_logging();
    let reply = MockChatProvider::operations_reply(&[("convert_to_mp3", json!({}))]);
    let speech = MockSpeechProvider::new();
    let controller = test_controller(&MockChatProvider::replying(reply), &speech);

    let result = controller
        .apply_command(DIALOGUE_DOC, "Read this dialogue aloud", CommandMode::Operations, "req")
        .await
        .unwrap();

    let expected = [
        MockSpeechProvider::audio_for("Hi Bob.", "nova"),
        MockSpeechProvider::audio_for("Hello Alice.", "onyx"),
        MockSpeechProvider::audio_for("Bye.", "nova"),
    ]
    .concat();
    assert_eq!(result.artifacts[&ArtifactKind::Mp3], expected);
    assert_eq!(result.modified_content, DIALOGUE_DOC);
    assert!(!result.is_modified());
    assert_eq!(speech.call_count(), 3);
}

#[tokio::test]
async fn test_applyCommand_unknownSpeaker_shouldReportFailureAndNoAudio() {
    let reply = MockChatProvider::operations_reply(&[("convert_to_mp3", json!({})), ("convert_to_doc", json!({}))]);
    let speech = MockSpeechProvider::new();
    let controller = test_controller(&MockChatProvider::replying(reply), &speech);
    let document = DIALOGUE_DOC.replace("[speaker: Bob]", "[speaker: Mallory]");

    let result = controller
        .apply_command(&document, "Export audio and Word", CommandMode::Operations, "req")
        .await
        .unwrap();

    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].operation, "convert_to_mp3");
    assert!(result.failures[0].message.contains("Mallory"));
    assert!(!result.artifacts.contains_key(&ArtifactKind::Mp3));
    assert!(result.artifacts.contains_key(&ArtifactKind::Docx));
    assert_eq!(speech.call_count(), 0);
    assert_eq!(result.modified_content, document);
}

#[tokio::test]
async fn test_applyCommand_onlyUnknownOperations_shouldLeaveTextUntouched() {
    let reply = MockChatProvider::operations_reply(&[("make_it_pop", json!({}))]);
    let controller = test_controller(&MockChatProvider::replying(reply), &MockSpeechProvider::new());
    let original = "# Title\nunusual    spacing kept\n";

    let result = controller.apply_command(original, "Make it pop", CommandMode::Operations, "req").await.unwrap();

    assert_eq!(result.unknown_operations, vec!["make_it_pop".to_string()]);
    assert_eq!(result.modified_content, original);
}

#[tokio::test]
async fn test_applyCommand_providerFailure_shouldFailCommand() {
    let controller = test_controller(&MockChatProvider::failing(), &MockSpeechProvider::new());

    let result = controller.apply_command(REPORT_DOC, "Add a toc", CommandMode::Operations, "req").await;

    assert!(matches!(result, Err(CommandError::Provider(ProviderError::ApiError { status_code: 500, .. }))));
}

#[tokio::test]
async fn test_applyCommand_missingCredentials_shouldFailBeforeRequest() {
    let chat = MockChatProvider::missing_credentials();
    let controller = test_controller(&chat, &MockSpeechProvider::new());

    let result = controller.apply_command(REPORT_DOC, "Add a toc", CommandMode::FreeForm, "req").await;

    assert!(matches!(result, Err(CommandError::Provider(ProviderError::AuthenticationError(_)))));
    assert_eq!(chat.request_count(), 0);
}

#[tokio::test]
async fn test_applyCommand_freeForm_shouldUseReturnedDocument() {
    let chat = MockChatProvider::replying("# Introduction\n\nImportant.");
    let controller = test_controller(&chat, &MockSpeechProvider::new());

    let result = controller.apply_command(REPORT_DOC, "Condense", CommandMode::FreeForm, "req").await.unwrap();

    assert_eq!(result.modified_content, "# Introduction\n\nImportant.\n");
    assert_eq!(result.mode, CommandMode::FreeForm);
    assert!(result.operations_applied.is_empty());
    let prompt = &chat.received()[0][1].content;
    assert!(!prompt.contains("[ROW"));
}

#[tokio::test]
async fn test_applyCommand_freeFormReplyWithCodeBlock_shouldKeepTheBlock() {
    let chat = MockChatProvider::replying("# Doc\n\n```rust\nfn main() {}\n```\n\nEnd.");
    let controller = test_controller(&chat, &MockSpeechProvider::new());

    let result = controller.apply_command(REPORT_DOC, "Condense", CommandMode::FreeForm, "req").await.unwrap();

    assert_eq!(result.modified_content, "# Doc\n\n```rust\nfn main() {}\n```\n\nEnd.\n");
}

#[tokio::test]
async fn test_applyCommand_freeFormEmptyReply_shouldFail() {
    let controller = test_controller(&MockChatProvider::replying("```\n```"), &MockSpeechProvider::new());

    let result = controller.apply_command(REPORT_DOC, "Condense", CommandMode::FreeForm, "req").await;

    assert!(matches!(result, Err(CommandError::InvalidBatch(_))));
}

#[tokio::test]
async fn test_commandResult_serialized_shouldOmitArtifacts() {
    let reply = MockChatProvider::operations_reply(&[("convert_to_doc", json!({}))]);
    let controller = test_controller(&MockChatProvider::replying(reply), &MockSpeechProvider::new());

    let result = controller.apply_command(REPORT_DOC, "Export", CommandMode::Operations, "req").await.unwrap();
    let value = serde_json::to_value(&result).unwrap();

    assert_eq!(value["mode"], "operations");
    assert_eq!(value["operations_applied"], json!(["convert_to_doc"]));
    assert!(value.get("artifacts").is_none());
}
