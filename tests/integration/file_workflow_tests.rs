/*!
 * Tests for file, project and template workflows
 */

use std::fs;

use mdcraft::app_config::Config;
use mdcraft::completion::CommandMode;
use mdcraft::providers::mock::{MockChatProvider, MockSpeechProvider};
use serde_json::json;

use crate::common::{
    REPORT_DOC, create_temp_dir, create_test_file, init_logging, test_controller, test_controller_with_config,
};

const NUMBERED_REPORT: &str = "# 1 Introduction\n\nThis is important.\n\n## 1.1 Details\n\nThe important part is here.\n\n## 1.2 Summary\n\nDone.\n";

fn numbering_chat() -> MockChatProvider {
    MockChatProvider::replying(MockChatProvider::operations_reply(&[("add_heading_numbering", json!({}))]))
}

#[tokio::test]
async fn test_applyToFile_withExports_shouldWriteDocumentAndArtifacts() {
    init_logging();
    let dir = create_temp_dir().unwrap();
    let path = create_test_file(dir.path(), "report.md", REPORT_DOC).unwrap();
    let reply = MockChatProvider::operations_reply(&[
        ("change_heading", json!({"match": "Summary", "newText": "Conclusion"})),
        ("convert_to_mp3", json!({})),
        ("convert_to_doc", json!({})),
    ]);
    let speech = MockSpeechProvider::new();
    let controller = test_controller(&MockChatProvider::replying(reply), &speech);

    let report = controller
        .apply_command_to_file(&path, "Rename the summary and export", CommandMode::Operations, false)
        .await
        .unwrap();

    assert!(report.modified && report.written);
    assert!(fs::read_to_string(&path).unwrap().contains("## Conclusion"));
    assert_eq!(report.artifacts, vec![dir.path().join("report.docx"), dir.path().join("report.mp3")]);
    assert!(fs::read(dir.path().join("report.docx")).unwrap().starts_with(b"PK"));

    let calls = speech.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].text.contains("Conclusion Done."));
    assert_eq!(
        fs::read(dir.path().join("report.mp3")).unwrap(),
        MockSpeechProvider::audio_for(&calls[0].text, "alloy")
    );
}

#[tokio::test]
async fn test_applyToFile_dryRun_shouldWriteNothing() {
    let dir = create_temp_dir().unwrap();
    let path = create_test_file(dir.path(), "report.md", REPORT_DOC).unwrap();
    let reply = MockChatProvider::operations_reply(&[("add_heading_numbering", json!({})), ("convert_to_doc", json!({}))]);
    let controller = test_controller(&MockChatProvider::replying(reply), &MockSpeechProvider::new());

    let report = controller
        .apply_command_to_file(&path, "Number and export", CommandMode::Operations, true)
        .await
        .unwrap();

    assert!(report.modified);
    assert!(!report.written);
    assert!(report.artifacts.is_empty());
    assert_eq!(fs::read_to_string(&path).unwrap(), REPORT_DOC);
    assert!(!dir.path().join("report.docx").exists());
}

#[tokio::test]
async fn test_applyToFile_missingFile_shouldFail() {
    let dir = create_temp_dir().unwrap();
    let controller = test_controller(&numbering_chat(), &MockSpeechProvider::new());

    let result = controller
        .apply_command_to_file(&dir.path().join("absent.md"), "Number", CommandMode::Operations, false)
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_applyToProject_withUnreadableFile_shouldProcessTheRestAndLogIssue() {
    init_logging();
    let dir = create_temp_dir().unwrap();
    create_test_file(dir.path(), "a.md", REPORT_DOC).unwrap();
    create_test_file(dir.path(), "sub/b.markdown", REPORT_DOC).unwrap();
    create_test_file(dir.path(), "notes.txt", REPORT_DOC).unwrap();
    fs::write(dir.path().join("broken.md"), [0xff, 0xfe, 0x00, 0x23]).unwrap();

    let mut config = Config::default();
    config.concurrent_files = 2;
    let controller = test_controller_with_config(config, &numbering_chat(), &MockSpeechProvider::new());

    let report = controller
        .apply_command_to_project(dir.path(), "Number headings", CommandMode::Operations, false)
        .await
        .unwrap();

    let processed: Vec<_> = report.processed.iter().map(|file| file.path.clone()).collect();
    assert_eq!(processed, vec![dir.path().join("a.md"), dir.path().join("sub/b.markdown")]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, dir.path().join("broken.md"));

    assert_eq!(fs::read_to_string(dir.path().join("a.md")).unwrap(), NUMBERED_REPORT);
    assert_eq!(fs::read_to_string(dir.path().join("sub/b.markdown")).unwrap(), NUMBERED_REPORT);
    assert_eq!(fs::read_to_string(dir.path().join("notes.txt")).unwrap(), REPORT_DOC);

    let issues = fs::read_to_string(dir.path().join("mdcraft.issues.log")).unwrap();
    assert!(issues.contains("broken.md"));
}

#[tokio::test]
async fn test_applyToProject_dryRunWithFailure_shouldNotWriteLog() {
    let dir = create_temp_dir().unwrap();
    create_test_file(dir.path(), "a.md", REPORT_DOC).unwrap();
    fs::write(dir.path().join("broken.md"), [0xff, 0xfe]).unwrap();
    let controller = test_controller(&numbering_chat(), &MockSpeechProvider::new());

    let report = controller
        .apply_command_to_project(dir.path(), "Number headings", CommandMode::Operations, true)
        .await
        .unwrap();

    assert_eq!(report.processed.len(), 1);
    assert_eq!(report.failed.len(), 1);
    assert!(!dir.path().join("mdcraft.issues.log").exists());
    assert_eq!(fs::read_to_string(dir.path().join("a.md")).unwrap(), REPORT_DOC);
}

#[tokio::test]
async fn test_applyToProject_missingDirectory_shouldFail() {
    let dir = create_temp_dir().unwrap();
    let controller = test_controller(&numbering_chat(), &MockSpeechProvider::new());

    let result = controller
        .apply_command_to_project(&dir.path().join("nowhere"), "Number", CommandMode::Operations, false)
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_applyToProject_sameDocumentTwice_shouldShareCompletion() {
    let dir = create_temp_dir().unwrap();
    create_test_file(dir.path(), "one.md", REPORT_DOC).unwrap();
    create_test_file(dir.path(), "two.md", REPORT_DOC).unwrap();
    let chat = numbering_chat();
    let mut config = Config::default();
    config.concurrent_files = 1;
    let controller = test_controller_with_config(config, &chat, &MockSpeechProvider::new());

    controller
        .apply_command_to_project(dir.path(), "Number headings", CommandMode::Operations, false)
        .await
        .unwrap();

    assert_eq!(chat.request_count(), 1);
}

#[test]
fn test_processTemplateFile_numbering_shouldUpdateOnceThenBeStable() {
    let dir = create_temp_dir().unwrap();
    let source = format!("<!--\nnumbering: true\n-->\n\n{}", REPORT_DOC);
    let path = create_test_file(dir.path(), "template.md", &source).unwrap();
    let controller = test_controller(&MockChatProvider::failing(), &MockSpeechProvider::new());

    assert!(controller.process_template_file(&path, false).unwrap());
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        format!("<!--\nnumbering: true\n-->\n\n{}", NUMBERED_REPORT)
    );
    assert!(!controller.process_template_file(&path, false).unwrap());
}

#[test]
fn test_processTemplateFile_dryRun_shouldReportWithoutWriting() {
    let dir = create_temp_dir().unwrap();
    let source = format!("<!--\ntoc: true\n-->\n\n{}", REPORT_DOC);
    let path = create_test_file(dir.path(), "template.md", &source).unwrap();
    let controller = test_controller(&MockChatProvider::failing(), &MockSpeechProvider::new());

    assert!(controller.process_template_file(&path, true).unwrap());
    assert_eq!(fs::read_to_string(&path).unwrap(), source);
}

#[test]
fn test_processTemplate_toc_shouldInsertContentsAfterTitle() {
    let controller = test_controller(&MockChatProvider::failing(), &MockSpeechProvider::new());
    let source = format!("<!--\ntoc: true\n-->\n\n{}", REPORT_DOC);

    let output = controller.process_template(&source, "req");

    assert!(output.starts_with(
        "<!--\ntoc: true\n-->\n\n# Introduction\n\n## Table of Contents\n\n- [Details](#details)\n- [Summary](#summary)\n\n"
    ));
}
