/*!
 * Row-marker codec.
 *
 * Before a document is shown to the interpretation service every physical
 * line gets a `[ROW n]` suffix so instructions can refer to a line even after
 * the text is reflowed into a tree. `[LINE n]` is accepted everywhere as an
 * alias because models tend to echo either form.
 *
 * The parser sets aside markers that end a line, so they never change the
 * block structure, and restores them into the leaf holding that line.
 * Lifting turns embedded markers into dedicated `RowMarker` nodes; stripping
 * removes those nodes again and merges the leaves they separated. Both passes
 * first collect the edits for a child list and then splice them in reverse
 * order, so indices stay valid while editing.
 */

use log::debug;
use once_cell::sync::Lazy;
use std::ops::Range;
use regex::Regex;

use crate::document::{LeafKind, Node, NodeKind, Position};

static MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(?:ROW|LINE) (\d+)\]").unwrap());

static TRAILING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:\[(?:ROW|LINE) \d+\])+$").unwrap());

static REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*\[?\s*(?:(?:row|line)\s*)?(\d+)\s*\]?\s*$").unwrap());

/// Append `[ROW n]` (1-indexed) to the end of every physical line.
///
/// A trailing newline does not open another line, so it stays unmarked.
pub fn attach_row_markers(text: &str) -> String {
    let (content, trailing_newline) = match text.strip_suffix('\n') {
        Some(content) => (content, true),
        None => (text, false),
    };

    let mut annotated = content
        .split('\n')
        .enumerate()
        .map(|(index, line)| format!("{line}[ROW {}]", index + 1))
        .collect::<Vec<_>>()
        .join("\n");
    if trailing_newline {
        annotated.push('\n');
    }
    annotated
}

/// Split every value-carrying leaf around embedded markers.
///
/// Returns the number of marker nodes created.
pub fn lift_row_markers(tree: &mut Node) -> usize {
    // Collect: replacement pieces for each child that embeds markers
    let mut replacements: Vec<(usize, Vec<Node>)> = Vec::new();
    let mut lifted = 0;

    for (index, child) in tree.children.iter_mut().enumerate() {
        if child.kind.leaf_kind().is_some() {
            let mut pieces = take_info_string_markers(child);
            match split_leaf(child) {
                Some(split) => pieces.extend(split),
                None if !pieces.is_empty() => pieces.push(child.clone()),
                None => continue,
            }
            lifted += pieces
                .iter()
                .filter(|piece| matches!(piece.kind, NodeKind::RowMarker { .. }))
                .count();
            replacements.push((index, pieces));
        } else {
            lifted += lift_row_markers(child);
        }
    }

    // Splice back to front so earlier indices are unaffected
    for (index, pieces) in replacements.into_iter().rev() {
        tree.children.splice(index..=index, pieces);
    }

    if lifted > 0 {
        debug!("Lifted {} row marker(s) under {}", lifted, tree.kind.type_name());
    }
    lifted
}

fn split_leaf(leaf: &Node) -> Option<Vec<Node>> {
    let value = leaf.kind.value()?;
    let original = leaf.kind.leaf_kind()?;

    let mut pieces = Vec::new();
    let mut cursor = 0;
    for captures in MARKER.captures_iter(value) {
        let Some(whole) = captures.get(0) else { continue };
        // Out-of-range row numbers stay literal text
        let Some(row) = captures.get(1).and_then(|m| m.as_str().parse::<usize>().ok()) else {
            continue;
        };

        push_piece(&mut pieces, leaf, value, cursor..whole.start());
        pieces.push(Node::new(NodeKind::RowMarker { row, original }).at(piece_position(leaf, value, whole.range())));
        cursor = whole.end();
    }

    if pieces.is_empty() {
        return None;
    }
    push_piece(&mut pieces, leaf, value, cursor..value.len());

    // A code block made only of markers still renders as an empty block
    let kept_code = pieces.iter().any(|piece| matches!(piece.kind, NodeKind::Code { .. }));
    if matches!(leaf.kind, NodeKind::Code { .. }) && !kept_code {
        if let Some(kind) = leaf.kind.with_value(String::new()) {
            pieces.push(Node::new(kind));
        }
    }
    Some(pieces)
}

/// Move markers out of a code block's info string; they go in front of the block
fn take_info_string_markers(code: &mut Node) -> Vec<Node> {
    let NodeKind::Code { lang, .. } = &mut code.kind else {
        return Vec::new();
    };
    let Some(info) = lang.as_deref() else {
        return Vec::new();
    };

    let markers = marker_nodes(info, LeafKind::Text);
    if !markers.is_empty() {
        let cleaned = remove_marker_text(info);
        *lang = (!cleaned.is_empty()).then_some(cleaned);
    }
    markers
}

/// Marker nodes for every well-formed marker in `text`, left to right
pub fn marker_nodes(text: &str, original: LeafKind) -> Vec<Node> {
    MARKER
        .captures_iter(text)
        .filter_map(|captures| captures.get(1)?.as_str().parse::<usize>().ok())
        .map(|row| Node::new(NodeKind::RowMarker { row, original }))
        .collect()
}

/// Byte offset where a run of markers ending the line starts
pub fn trailing_marker_start(line: &str) -> Option<usize> {
    TRAILING.find(line).map(|found| found.start())
}

fn push_piece(pieces: &mut Vec<Node>, leaf: &Node, value: &str, range: Range<usize>) {
    if range.is_empty() {
        return;
    }
    if let Some(kind) = leaf.kind.with_value(value[range.clone()].to_string()) {
        pieces.push(Node::new(kind).at(piece_position(leaf, value, range)));
    }
}

/// Inline leaves start their value at their own position. A code block's
/// value starts after its fence, so its pieces get no position.
fn piece_position(leaf: &Node, value: &str, range: Range<usize>) -> Option<Position> {
    match leaf.kind {
        NodeKind::Code { .. } => None,
        _ => leaf.position.map(|position| position.slice(value, range)),
    }
}

/// Remove every marker node and merge the same-kind leaves it separated.
///
/// Returns the number of markers removed.
pub fn strip_row_markers(tree: &mut Node) -> usize {
    let mut removed = 0;
    // Paragraphs that only held markers (a marked blank line) vanish entirely
    let mut emptied = Vec::new();
    for (index, child) in tree.children.iter_mut().enumerate() {
        let count = strip_row_markers(child);
        if count > 0 && matches!(child.kind, NodeKind::Paragraph) && child.children.is_empty() {
            emptied.push(index);
        }
        removed += count;
    }
    for index in emptied.into_iter().rev() {
        tree.children.remove(index);
    }

    // Decide every join on the original neighbours, then remove back to front
    let markers: Vec<(usize, bool)> = tree
        .children
        .iter()
        .enumerate()
        .filter(|(_, child)| matches!(child.kind, NodeKind::RowMarker { .. }))
        .map(|(index, _)| (index, rejoins(&tree.children, index)))
        .collect();
    if markers.is_empty() {
        return removed;
    }

    for (index, rejoin) in markers.iter().rev() {
        tree.children.remove(*index);
        removed += 1;
        if *rejoin {
            merge_at(&mut tree.children, *index);
        }
    }
    trim_text_edges(tree);
    removed
}

/// Marker removal can leave the line breaks of marked blank lines at the edges
/// of an inline container; trim them and drop text that became empty.
fn trim_text_edges(container: &mut Node) {
    if matches!(container.kind, NodeKind::Root | NodeKind::Code { .. } | NodeKind::Html(_)) {
        return;
    }
    if let Some(first) = container.children.first_mut() {
        if let NodeKind::Text(value) = &mut first.kind {
            *value = value.trim_start().to_string();
        }
    }
    if let Some(last) = container.children.last_mut() {
        if let NodeKind::Text(value) = &mut last.kind {
            *value = value.trim_end().to_string();
        }
    }
    container
        .children
        .retain(|child| !matches!(&child.kind, NodeKind::Text(value) if value.is_empty()));
}

/// Whether the marker at `index` was carved out of the leaf on its left and
/// the next node, past markers carved from the same kind, is a piece of it
fn rejoins(siblings: &[Node], index: usize) -> bool {
    let NodeKind::RowMarker { original, .. } = siblings[index].kind else {
        return false;
    };
    let Some(left) = index.checked_sub(1).and_then(|previous| siblings.get(previous)) else {
        return false;
    };
    let right = siblings[index + 1..]
        .iter()
        .find(|sibling| !matches!(sibling.kind, NodeKind::RowMarker { original: next, .. } if next == original));

    left.kind.leaf_kind() == Some(original) && right.is_some_and(|right| left.kind.mergeable_with(&right.kind))
}

/// Merge the two siblings that met at `index` after a removal
fn merge_at(siblings: &mut Vec<Node>, index: usize) {
    if index == 0 || index >= siblings.len() {
        return;
    }
    if !siblings[index - 1].kind.mergeable_with(&siblings[index].kind) {
        return;
    }

    let next = siblings.remove(index);
    let previous = &mut siblings[index - 1];
    let (Some(left), Some(right)) = (previous.kind.value(), next.kind.value()) else {
        return;
    };
    let merged = match previous.kind {
        NodeKind::Code { .. } => format!("{left}{right}"),
        _ => join_values(left, right),
    };
    if let Some(kind) = previous.kind.with_value(merged) {
        previous.kind = kind;
    }
    previous.position = match (previous.position, next.position) {
        (Some(mut start), Some(end)) => {
            start.end = end.end;
            Some(start)
        }
        _ => None,
    };
}

/// Concatenate two leaf values, collapsing a blank-line run at the seam
/// down to a single blank line.
fn join_values(left: &str, right: &str) -> String {
    let left_body = left.trim_end_matches('\n');
    let right_body = right.trim_start_matches('\n');
    let newlines = (left.len() - left_body.len()) + (right.len() - right_body.len());

    format!("{}{}{}", left_body, "\n".repeat(newlines.min(2)), right_body)
}

/// Parse a row reference given as `"12"`, `"[ROW 12]"`, `"LINE 12"` and similar
pub fn parse_row_reference(text: &str) -> Option<usize> {
    REFERENCE
        .captures(text)
        .and_then(|captures| captures.get(1))
        .and_then(|m| m.as_str().parse::<usize>().ok())
        .filter(|row| *row > 0)
}

/// Remove marker literals from a free-text value echoed back by the model
pub fn remove_marker_text(text: &str) -> String {
    MARKER.replace_all(text, "").trim().to_string()
}

/// Whether a subtree still holds marker nodes
pub fn has_row_markers(tree: &Node) -> bool {
    tree.count(|node| matches!(node.kind, NodeKind::RowMarker { .. })) > 0
}

/// Rows of all marker nodes in document order, with the leaf kind they came from
pub fn marker_rows(tree: &Node) -> Vec<(usize, LeafKind)> {
    let mut rows = Vec::new();
    tree.walk(&mut |node| {
        if let NodeKind::RowMarker { row, original } = node.kind {
            rows.push((row, original));
        }
    });
    rows
}
