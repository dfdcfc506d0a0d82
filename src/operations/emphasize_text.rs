/*!
 * `emphasize_text`: wrap whole-word matches in strong emphasis.
 *
 * Matching is case-sensitive on word boundaries, left to right and
 * non-overlapping. Text that is already the direct child of a strong node is
 * left alone, which makes the operation idempotent.
 *
 * With a row restriction, a match is only wrapped when it sits on that source
 * line. The line of a text run is resolved, in order, from the row markers
 * among its siblings, from its own position, or from a positioned ancestor
 * that spans a single line. A match's line is that line plus the line breaks
 * before it. Pieces split off by a match keep a derived position, so later
 * row-restricted operations on the same run still resolve.
 */

use log::debug;
use regex::Regex;
use serde_json::Value;

use super::{OperationKind, optional_str, required_str};
use crate::document::{Node, NodeKind, Position};
use crate::errors::OperationError;
use crate::row_markers::{parse_row_reference, remove_marker_text};

/// Apply the operation from its wire parameters (`text`, optional `lineNumber`)
pub fn apply(tree: &mut Node, parameters: &Value) -> Result<usize, OperationError> {
    let text = remove_marker_text(&required_str(OperationKind::EmphasizeText, parameters, &["text"])?);
    if text.is_empty() {
        return Err(invalid("\"text\" must not be empty"));
    }

    let row = match optional_str(parameters, &["lineNumber", "row", "line"]) {
        Some(reference) => Some(
            parse_row_reference(&reference)
                .ok_or_else(|| invalid(&format!("unrecognized row reference \"{}\"", reference)))?,
        ),
        None => None,
    };

    Ok(emphasize_text(tree, &text, row))
}

fn invalid(message: &str) -> OperationError {
    OperationError::InvalidParameters {
        operation: OperationKind::EmphasizeText.name().to_string(),
        message: message.to_string(),
    }
}

/// Wrap every whole-word occurrence of `text` in strong emphasis.
///
/// Returns the number of occurrences wrapped.
pub fn emphasize_text(tree: &mut Node, text: &str, row: Option<usize>) -> usize {
    let pattern = match Regex::new(&word_pattern(text)) {
        Ok(pattern) => pattern,
        Err(e) => {
            debug!("Cannot build word pattern for \"{}\": {}", text, e);
            return 0;
        }
    };

    let position = tree.position;
    emphasize_in(tree, &pattern, row, position)
}

/// Escaped `text`, anchored with `\b` only on ends that are word characters
fn word_pattern(text: &str) -> String {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let leading = if text.chars().next().is_some_and(is_word) { r"\b" } else { "" };
    let trailing = if text.chars().last().is_some_and(is_word) { r"\b" } else { "" };
    format!("{}{}{}", leading, regex::escape(text), trailing)
}

fn emphasize_in(node: &mut Node, pattern: &Regex, row: Option<usize>, inherited: Option<Position>) -> usize {
    let parent_is_strong = matches!(node.kind, NodeKind::Strong);
    let mut wrapped = 0;
    let mut replacements: Vec<(usize, Vec<Node>)> = Vec::new();

    let first_lines: Vec<Option<usize>> = match row {
        Some(_) => (0..node.children.len())
            .map(|index| first_line(&node.children, index, inherited))
            .collect(),
        None => vec![None; node.children.len()],
    };

    for (index, child) in node.children.iter_mut().enumerate() {
        let scope = child.position.or(inherited);
        match &child.kind {
            NodeKind::Text(value) => {
                if parent_is_strong {
                    continue;
                }
                let (pieces, count) = split_matches(value, pattern, row, first_lines[index], child.position);
                if count > 0 {
                    wrapped += count;
                    replacements.push((index, pieces));
                }
            }
            // Literal content never gets markup
            NodeKind::Code { .. } | NodeKind::InlineCode(_) | NodeKind::Html(_) => {}
            _ => wrapped += emphasize_in(child, pattern, row, scope),
        }
    }

    for (index, pieces) in replacements.into_iter().rev() {
        node.children.splice(index..=index, pieces);
    }
    wrapped
}

/// Source line of the first character of `siblings[index]`
fn first_line(siblings: &[Node], index: usize, inherited: Option<Position>) -> Option<usize> {
    // A marker after the run closes the line the run ends on
    let mut breaks = 0;
    for sibling in &siblings[index..] {
        if let NodeKind::RowMarker { row, .. } = sibling.kind {
            return Some(row.saturating_sub(breaks));
        }
        breaks += line_breaks(sibling);
    }

    // A marker before the run closes the line the run starts on
    let mut breaks = 0;
    for sibling in siblings[..index].iter().rev() {
        if let NodeKind::RowMarker { row, .. } = sibling.kind {
            return Some(row + breaks);
        }
        breaks += line_breaks(sibling);
    }

    siblings[index]
        .position
        .or(inherited.filter(Position::is_single_line))
        .map(|position| position.start.line)
}

fn line_breaks(node: &Node) -> usize {
    match &node.kind {
        NodeKind::Text(value) => value.matches('\n').count(),
        _ => node.plain_text().matches('\n').count(),
    }
}

fn split_matches(
    value: &str,
    pattern: &Regex,
    row: Option<usize>,
    first_line: Option<usize>,
    own: Option<Position>,
) -> (Vec<Node>, usize) {
    let mut pieces = Vec::new();
    let mut cursor = 0;
    let mut count = 0;
    let slice = |range: std::ops::Range<usize>| own.map(|position| position.slice(value, range));

    for found in pattern.find_iter(value) {
        if let Some(row) = row {
            let line = first_line.map(|line| line + value[..found.start()].matches('\n').count());
            if line != Some(row) {
                continue;
            }
        }
        if found.start() > cursor {
            pieces.push(Node::text(&value[cursor..found.start()]).at(slice(cursor..found.start())));
        }
        pieces.push(
            Node::with_children(
                NodeKind::Strong,
                vec![Node::text(found.as_str()).at(slice(found.range()))],
            )
            .at(slice(found.range())),
        );
        cursor = found.end();
        count += 1;
    }

    if count > 0 && cursor < value.len() {
        pieces.push(Node::text(&value[cursor..]).at(slice(cursor..value.len())));
    }
    (pieces, count)
}
