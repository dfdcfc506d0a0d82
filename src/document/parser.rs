/*!
 * Markdown parsing into the owned document tree.
 *
 * Events from pulldown-cmark's offset iterator are folded into `Node`s with a
 * container stack. Byte ranges are converted into 1-indexed line/column points.
 */

use std::ops::Range;

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag};

use super::{LeafKind, Node, NodeKind, Point, Position};
use crate::row_markers::{marker_nodes, trailing_marker_start};

/// Byte offsets of every line start, used to turn ranges into line numbers
struct LineIndex<'a> {
    text: &'a str,
    offsets: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    fn new(text: &'a str) -> Self {
        let mut offsets = vec![0];
        for (idx, ch) in text.char_indices() {
            if ch == '\n' {
                offsets.push(idx + 1);
            }
        }
        Self { text, offsets }
    }

    fn point(&self, byte: usize) -> Point {
        let line = match self.offsets.binary_search(&byte) {
            Ok(idx) => idx + 1,
            Err(idx) => idx,
        };
        let line_start = self.offsets[line.saturating_sub(1)];
        Point {
            line,
            column: byte - line_start + 1,
        }
    }

    /// Position of a byte range, ignoring trailing line breaks inside the range
    fn position(&self, range: &Range<usize>) -> Position {
        let bytes = self.text.as_bytes();
        let mut end = range.end.min(bytes.len());
        while end > range.start && matches!(bytes[end - 1], b'\n' | b'\r') {
            end -= 1;
        }
        Position {
            start: self.point(range.start),
            end: self.point(end),
        }
    }
}

/// Parse Markdown text into a document tree with source positions.
///
/// Row markers ending a line are set aside before tokenizing, so a marked
/// blank line still separates blocks and a marked fence still closes. They
/// are put back at the end of their line inside the leaf holding that line,
/// or as marker nodes when the line carries no text (blank lines, fences,
/// underlines, rules).
pub fn parse(text: &str) -> Node {
    let (clean, set_aside) = set_aside_markers(text);
    let mut tree = parse_clean(&clean);
    if !set_aside.is_empty() {
        let lines: Vec<&str> = clean.split('\n').collect();
        for (line, markers) in set_aside {
            restore_markers(&mut tree, &lines, line, &markers);
        }
    }
    tree
}

/// Remove trailing marker runs, remembering them per 1-indexed line
fn set_aside_markers(text: &str) -> (String, Vec<(usize, String)>) {
    let mut set_aside = Vec::new();
    let lines: Vec<&str> = text
        .split('\n')
        .enumerate()
        .map(|(index, line)| match trailing_marker_start(line) {
            Some(start) => {
                set_aside.push((index + 1, line[start..].to_string()));
                &line[..start]
            }
            None => line,
        })
        .collect();
    (lines.join("\n"), set_aside)
}

fn restore_markers(tree: &mut Node, lines: &[&str], line: usize, markers: &str) {
    let mut path = Vec::new();
    let mut slot = None;
    find_slot(tree, lines, line, &mut path, &mut slot);

    match slot {
        Some((path, offset)) => insert_into_leaf(tree, &path, offset, markers),
        None => place_marker_nodes(tree, line, markers),
    }
}

/// Last value leaf in document order that holds the end of `line`
fn find_slot(node: &Node, lines: &[&str], line: usize, path: &mut Vec<usize>, slot: &mut Option<(Vec<usize>, usize)>) {
    for (index, child) in node.children.iter().enumerate() {
        path.push(index);
        if let Some(offset) = line_end_offset(child, lines, line) {
            *slot = Some((path.clone(), offset));
        }
        find_slot(child, lines, line, path, slot);
        path.pop();
    }
}

/// Byte offset in a leaf's value where `line` ends, if the value holds that line
fn line_end_offset(leaf: &Node, lines: &[&str], line: usize) -> Option<usize> {
    let value = leaf.kind.value()?;
    let position = leaf.position?;
    let first = match leaf.kind {
        NodeKind::Code { .. } if value.is_empty() => return None,
        NodeKind::Code { .. } if opens_fence(&position, lines) => position.start.line + 1,
        _ => position.start.line,
    };
    let nth = line.checked_sub(first)?;

    let breaks: Vec<usize> = value.match_indices('\n').map(|(offset, _)| offset).collect();
    match nth.cmp(&breaks.len()) {
        std::cmp::Ordering::Less => Some(breaks[nth]),
        std::cmp::Ordering::Equal => Some(value.len()),
        std::cmp::Ordering::Greater => None,
    }
}

fn opens_fence(position: &Position, lines: &[&str]) -> bool {
    lines
        .get(position.start.line.saturating_sub(1))
        .and_then(|line| line.get(position.start.column.saturating_sub(1)..))
        .map(|rest| {
            let rest = rest.trim_start_matches(|c: char| c == '>' || c.is_whitespace());
            rest.starts_with("```") || rest.starts_with("~~~")
        })
        .unwrap_or(false)
}

fn insert_into_leaf(tree: &mut Node, path: &[usize], offset: usize, markers: &str) {
    let mut node = tree;
    for index in path {
        match node.children.get_mut(*index) {
            Some(child) => node = child,
            None => return,
        }
    }
    let Some(value) = node.kind.value() else { return };
    let mut value = value.to_string();
    value.insert_str(offset, markers);
    if let Some(kind) = node.kind.with_value(value) {
        node.kind = kind;
    }
}

/// Markers of a line without text become nodes in the innermost container
/// spanning that line, ahead of the first child starting at or after it
fn place_marker_nodes(container: &mut Node, line: usize, markers: &str) {
    if let Some(child) = container.children.iter_mut().find(|child| spans_line(child, line)) {
        place_marker_nodes(child, line, markers);
        return;
    }

    let at = container
        .children
        .iter()
        .position(|child| child.position.is_some_and(|p| p.start.line >= line))
        .unwrap_or(container.children.len());
    let point = Point { line, column: 1 };
    let nodes = marker_nodes(markers, LeafKind::Text)
        .into_iter()
        .map(|node| node.at(Some(Position { start: point, end: point })));
    container.children.splice(at..at, nodes);
}

/// Containers that can take a marker node for `line`; a list only through one of its items
fn spans_line(node: &Node, line: usize) -> bool {
    if node.kind.value().is_some() || matches!(node.kind, NodeKind::ThematicBreak | NodeKind::Break | NodeKind::RowMarker { .. }) {
        return false;
    }
    if !node.position.is_some_and(|p| p.contains_line(line)) {
        return false;
    }
    match node.kind {
        NodeKind::List { .. } => node.children.iter().any(|item| spans_line(item, line)),
        _ => true,
    }
}

fn parse_clean(text: &str) -> Node {
    let index = LineIndex::new(text);
    let mut stack: Vec<Node> = vec![Node::root().at(Some(index.position(&(0..text.len()))))];
    // One flag per open list: whether any of its items was loose
    let mut list_spread: Vec<bool> = Vec::new();

    for (event, range) in Parser::new_ext(text, Options::empty()).into_offset_iter() {
        let position = index.position(&range);
        match event {
            Event::Start(tag) => {
                if matches!(tag, Tag::List(_)) {
                    list_spread.push(false);
                }
                stack.push(Node::new(container_kind(tag)).at(Some(position)));
            }
            Event::End(_) => {
                let Some(mut node) = stack.pop() else { continue };
                finish_container(&mut node, &mut list_spread);
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    // Unbalanced end event: keep the node as the new root content
                    None => stack.push(node),
                }
            }
            Event::Text(value) => push_text(&mut stack, &value, position),
            Event::SoftBreak => push_text(&mut stack, "\n", position),
            Event::HardBreak => push_leaf(&mut stack, NodeKind::Break, position),
            Event::Code(value) => push_leaf(&mut stack, NodeKind::InlineCode(value.to_string()), position),
            Event::Html(value) | Event::InlineHtml(value) => push_html(&mut stack, &value, position),
            Event::Rule => push_leaf(&mut stack, NodeKind::ThematicBreak, position),
            _ => {}
        }
    }

    while stack.len() > 1 {
        if let Some(mut node) = stack.pop() {
            finish_container(&mut node, &mut list_spread);
            if let Some(parent) = stack.last_mut() {
                parent.children.push(node);
            }
        }
    }

    stack.pop().unwrap_or_else(Node::root)
}

fn container_kind(tag: Tag<'_>) -> NodeKind {
    match tag {
        Tag::Paragraph => NodeKind::Paragraph,
        Tag::Heading { level, .. } => NodeKind::Heading { depth: level as u8 },
        Tag::BlockQuote(_) => NodeKind::BlockQuote,
        Tag::CodeBlock(kind) => {
            let lang = match kind {
                CodeBlockKind::Fenced(info) if !info.trim().is_empty() => Some(info.trim().to_string()),
                _ => None,
            };
            NodeKind::Code {
                lang,
                value: String::new(),
            }
        }
        Tag::HtmlBlock => NodeKind::Html(String::new()),
        Tag::List(start) => NodeKind::List {
            ordered: start.is_some(),
            start,
            spread: false,
        },
        Tag::Item => NodeKind::ListItem,
        Tag::Emphasis => NodeKind::Emphasis,
        Tag::Strong => NodeKind::Strong,
        Tag::Link { dest_url, title, .. } => NodeKind::Link {
            url: dest_url.to_string(),
            title: title.to_string(),
        },
        Tag::Image { dest_url, title, .. } => NodeKind::Image {
            url: dest_url.to_string(),
            title: title.to_string(),
        },
        // Extensions are disabled, anything else is treated as a plain block
        _ => NodeKind::Paragraph,
    }
}

fn finish_container(node: &mut Node, list_spread: &mut Vec<bool>) {
    match &mut node.kind {
        NodeKind::Code { value, .. } | NodeKind::Html(value) => {
            if value.ends_with('\n') {
                value.pop();
            }
        }
        NodeKind::ListItem => {
            let loose = node
                .children
                .iter()
                .any(|child| matches!(child.kind, NodeKind::Paragraph));
            if loose {
                if let Some(flag) = list_spread.last_mut() {
                    *flag = true;
                }
            }
            wrap_inline_runs(node);
        }
        NodeKind::List { spread, .. } => {
            *spread = list_spread.pop().unwrap_or(false);
        }
        _ => {}
    }
}

/// Tight list items hold inline content directly; group it into paragraphs
/// so every list item only has block children.
fn wrap_inline_runs(item: &mut Node) {
    if item.children.iter().all(|child| child.kind.is_block()) {
        return;
    }

    let mut wrapped = Vec::with_capacity(item.children.len());
    let mut run: Vec<Node> = Vec::new();
    for child in item.children.drain(..) {
        if child.kind.is_block() {
            if !run.is_empty() {
                wrapped.push(paragraph_from(std::mem::take(&mut run)));
            }
            wrapped.push(child);
        } else {
            run.push(child);
        }
    }
    if !run.is_empty() {
        wrapped.push(paragraph_from(run));
    }
    item.children = wrapped;
}

fn paragraph_from(children: Vec<Node>) -> Node {
    let start = children.first().and_then(|node| node.position);
    let end = children.last().and_then(|node| node.position);
    let position = match (start, end) {
        (Some(start), Some(end)) => Some(Position {
            start: start.start,
            end: end.end,
        }),
        _ => None,
    };
    Node::with_children(NodeKind::Paragraph, children).at(position)
}

fn push_leaf(stack: &mut [Node], kind: NodeKind, position: Position) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Node::new(kind).at(Some(position)));
    }
}

fn push_text(stack: &mut [Node], value: &str, position: Position) {
    let Some(parent) = stack.last_mut() else { return };

    if let NodeKind::Code { value: code, .. } = &mut parent.kind {
        code.push_str(value);
        return;
    }

    if let Some(last) = parent.children.last_mut() {
        if let NodeKind::Text(existing) = &mut last.kind {
            existing.push_str(value);
            if let Some(last_position) = last.position.as_mut() {
                last_position.end = position.end;
            }
            return;
        }
    }

    parent.children.push(Node::text(value).at(Some(position)));
}

fn push_html(stack: &mut [Node], value: &str, position: Position) {
    let Some(parent) = stack.last_mut() else { return };

    if let NodeKind::Html(block) = &mut parent.kind {
        block.push_str(value);
        return;
    }
    parent
        .children
        .push(Node::new(NodeKind::Html(value.to_string())).at(Some(position)));
}
