/*!
 * Tests for the operation vocabulary, batch parsing and the engine
 */

use mdcraft::completion::strip_code_fences;
use mdcraft::document::{parse, serialize};
use mdcraft::errors::CommandError;
use mdcraft::front_matter::FrontMatter;
use mdcraft::operations::{ArtifactKind, Operation, OperationBatch, OperationEngine, OperationKind};
use serde_json::json;

use crate::common::{REPORT_DOC, init_logging};

async fn run(source: &str, operations: &[Operation]) -> (String, mdcraft::ApplyOutcome) {
    let mut tree = parse(source);
    let outcome = OperationEngine::new()
        .apply_operations(&mut tree, operations, &FrontMatter::default(), "test")
        .await;
    (serialize(&tree), outcome)
}

#[test]
fn test_operationKind_vocabulary_shouldHaveSixNamedKinds() {
    let names: Vec<&str> = OperationKind::ALL.iter().map(|kind| kind.name()).collect();

    assert_eq!(
        names,
        vec![
            "change_heading",
            "emphasize_text",
            "generate_toc",
            "add_heading_numbering",
            "convert_to_doc",
            "convert_to_mp3"
        ]
    );
    for kind in OperationKind::ALL {
        assert_eq!(OperationKind::from_name(kind.name()), Some(kind));
        assert_eq!(kind.is_export(), kind.name().starts_with("convert_"));
    }
    assert_eq!(OperationKind::from_name("make_bold"), None);
}

#[test]
fn test_batchParse_fencedReply_shouldReadOperations() {
    let reply = "```json\n{\"operations\": [{\"type\": \"generate_toc\", \"parameters\": {}}]}\n```";

    let batch = OperationBatch::parse(&strip_code_fences(reply)).unwrap();

    assert_eq!(batch.operations.len(), 1);
    assert_eq!(batch.operations[0].kind(), Some(OperationKind::GenerateToc));
}

#[test]
fn test_batchParse_withoutOperationsArray_shouldFail() {
    let result = OperationBatch::parse("{\"ops\": []}");

    assert!(matches!(result, Err(CommandError::InvalidBatch(_))));
}

#[test]
fn test_batchParse_proseReply_shouldFail() {
    let result = OperationBatch::parse("Sure! I made the heading bold.");

    assert!(matches!(result, Err(CommandError::InvalidBatch(_))));
}

#[test]
fn test_batchParse_entryWithoutType_shouldBecomeUnknown() {
    let batch = OperationBatch::parse("{\"operations\": [{\"parameters\": {}}]}").unwrap();

    assert_eq!(batch.operations[0].op_type, "");
    assert_eq!(batch.operations[0].kind(), None);
}

#[tokio::test]
async fn test_emphasize_withLineNumber_shouldOnlyTouchThatLine() {
    init_logging();
    let operations = [Operation::new(OperationKind::EmphasizeText, json!({"text": "important", "lineNumber": 3}))];

    let (output, outcome) = run(REPORT_DOC, &operations).await;

    assert!(outcome.is_clean());
    assert_eq!(
        output,
        "# Introduction\n\nThis is **important**.\n\n## Details\n\nThe important part is here.\n\n## Summary\n\nDone.\n"
    );
}

#[tokio::test]
async fn test_emphasize_withoutLineNumber_shouldTouchEveryOccurrence() {
    let operations = [Operation::new(OperationKind::EmphasizeText, json!({"text": "important"}))];

    let (output, _) = run(REPORT_DOC, &operations).await;

    assert!(output.contains("This is **important**."));
    assert!(output.contains("The **important** part"));
}

#[tokio::test]
async fn test_emphasize_appliedTwice_shouldEqualAppliedOnce() {
    let emphasize = Operation::new(OperationKind::EmphasizeText, json!({"text": "important"}));

    let (once, _) = run(REPORT_DOC, std::slice::from_ref(&emphasize)).await;
    let (twice, _) = run(REPORT_DOC, &[emphasize.clone(), emphasize]).await;

    assert_eq!(twice, once);
}

#[tokio::test]
async fn test_numbering_appliedTwice_shouldEqualAppliedOnce() {
    let numbering = Operation::bare(OperationKind::AddHeadingNumbering);

    let (once, _) = run(REPORT_DOC, std::slice::from_ref(&numbering)).await;
    let (twice, _) = run(REPORT_DOC, &[numbering.clone(), numbering]).await;

    assert_eq!(twice, once);
    assert!(once.starts_with("# 1 Introduction\n\n"));
    assert!(once.contains("## 1.1 Details"));
    assert!(once.contains("## 1.2 Summary"));
}

#[tokio::test]
async fn test_unknownAmongKnown_shouldApplyKnownInOrder() {
    init_logging();
    let operations = [
        Operation::new(OperationKind::ChangeHeading, json!({"match": "Introduction", "newText": "Overview"})),
        Operation { op_type: "shout".into(), parameters: json!({}) },
        Operation::bare(OperationKind::AddHeadingNumbering),
        Operation::new(OperationKind::EmphasizeText, json!({"text": "Done"})),
    ];

    let (output, outcome) = run(REPORT_DOC, &operations).await;

    assert_eq!(outcome.unknown, vec!["shout".to_string()]);
    assert_eq!(
        outcome.applied,
        vec![OperationKind::ChangeHeading, OperationKind::AddHeadingNumbering, OperationKind::EmphasizeText]
    );
    assert_eq!(
        output,
        "# 1 Overview\n\nThis is important.\n\n## 1.1 Details\n\nThe important part is here.\n\n## 1.2 Summary\n\n**Done**.\n"
    );
}

#[tokio::test]
async fn test_changeHeading_missingNewText_shouldFailOnlyThatOperation() {
    let operations = [
        Operation::new(OperationKind::ChangeHeading, json!({"match": "Details"})),
        Operation::new(OperationKind::ChangeHeading, json!({"match": "Summary", "newText": "Wrap-up"})),
    ];

    let (output, outcome) = run(REPORT_DOC, &operations).await;

    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].index, 0);
    assert!(output.contains("## Details"));
    assert!(output.contains("## Wrap-up"));
}

#[tokio::test]
async fn test_convertToDoc_shouldLeaveTreeUntouched() {
    let (output, outcome) = run(REPORT_DOC, &[Operation::bare(OperationKind::ConvertToDoc)]).await;

    assert_eq!(output, serialize(&parse(REPORT_DOC)));
    assert!(outcome.artifacts[&ArtifactKind::Docx].starts_with(b"PK"));
}

#[tokio::test]
async fn test_generateToc_onReport_shouldListLaterHeadings() {
    let (output, outcome) = run(REPORT_DOC, &[Operation::bare(OperationKind::GenerateToc)]).await;

    assert!(outcome.is_clean());
    assert!(output.starts_with(
        "# Introduction\n\n## Table of Contents\n\n- [Details](#details)\n- [Summary](#summary)\n\nThis is important.\n"
    ));
}
