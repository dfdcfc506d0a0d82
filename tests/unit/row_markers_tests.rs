/*!
 * Tests for the row marker codec on whole documents
 */

use mdcraft::document::{LeafKind, parse, serialize};
use mdcraft::front_matter::decode;
use mdcraft::row_markers::{attach_row_markers, has_row_markers, lift_row_markers, marker_rows, strip_row_markers};

use crate::common::{DIALOGUE_DOC, REPORT_DOC};

fn marked_round_trip(source: &str) -> String {
    let mut tree = parse(&attach_row_markers(source));
    lift_row_markers(&mut tree);
    strip_row_markers(&mut tree);
    assert!(!has_row_markers(&tree));
    serialize(&tree)
}

#[test]
fn test_attachLiftStrip_withReport_shouldMatchUnmarkedParse() {
    assert_eq!(marked_round_trip(REPORT_DOC), serialize(&parse(REPORT_DOC)));
}

#[test]
fn test_attachLiftStrip_withDialogueBody_shouldMatchUnmarkedParse() {
    let body = decode(DIALOGUE_DOC).unwrap().body;

    assert_eq!(marked_round_trip(&body), serialize(&parse(&body)));
}

#[test]
fn test_liftRowMarkers_withReport_shouldNumberEveryLine() {
    let annotated = attach_row_markers(REPORT_DOC);
    let mut tree = parse(&annotated);

    let lifted = lift_row_markers(&mut tree);

    // Blank lines carry no text, their markers are nodes straight from the parser
    let text_lines = REPORT_DOC.lines().filter(|line| !line.is_empty()).count();
    assert_eq!(lifted, text_lines);
    let rows: Vec<usize> = marker_rows(&tree).into_iter().map(|(row, _)| row).collect();
    assert_eq!(rows, (1..=REPORT_DOC.lines().count()).collect::<Vec<_>>());
}

#[test]
fn test_liftRowMarkers_withLineAlias_shouldLiftToo() {
    let mut tree = parse("Hello[LINE 1]\n");

    assert_eq!(lift_row_markers(&mut tree), 1);
    assert_eq!(marker_rows(&tree), vec![(1, LeafKind::Text)]);
}

#[test]
fn test_liftStrip_withoutMarkers_shouldBeNoOps() {
    let mut tree = parse(REPORT_DOC);
    let before = tree.clone();

    assert_eq!(lift_row_markers(&mut tree), 0);
    assert_eq!(strip_row_markers(&mut tree), 0);
    assert_eq!(tree, before);
}
