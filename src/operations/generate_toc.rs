/*!
 * `generate_toc`: table of contents section.
 *
 * The section is introduced by a heading whose text matches
 * `(table of )?contents?` or `toc` (case-insensitive), optionally after a
 * `1.2` style number left by heading numbering. Everything between that
 * heading and the next heading is replaced by a tight, nested list linking to
 * every later heading. Anchors follow GitHub's slug rules, with `-1`, `-2`
 * suffixes for duplicates.
 *
 * Without such a heading a `## Table of Contents` section is inserted after
 * the first top-level heading, or at the very top.
 */

use std::collections::HashMap;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::document::{Node, NodeKind};

static TOC_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:\d+(?:\.\d+)*\.?\s+)?(?:(?:table[ -]of[ -])?contents?|toc)$").unwrap());

/// Title of the heading inserted when the document has none
pub const DEFAULT_TOC_TITLE: &str = "Table of Contents";

/// A heading listed in the table of contents
#[derive(Debug, Clone, PartialEq, Eq)]
struct TocEntry {
    depth: u8,
    text: String,
    slug: String,
}

/// Build or refresh the table of contents. Returns the number of entries listed.
pub fn generate_toc(tree: &mut Node) -> usize {
    let (toc_index, inserted) = match find_toc_heading(tree) {
        Some(index) => (index, false),
        None => {
            let at = tree
                .children
                .iter()
                .position(|child| matches!(child.kind, NodeKind::Heading { depth: 1 }))
                .map_or(0, |index| index + 1);
            if !tree.children[at..]
                .iter()
                .any(|child| matches!(child.kind, NodeKind::Heading { .. }))
            {
                debug!("No headings to list, skipping table of contents");
                return 0;
            }
            let heading = Node::with_children(NodeKind::Heading { depth: 2 }, vec![Node::text(DEFAULT_TOC_TITLE)]);
            tree.children.insert(at, heading);
            (at, true)
        }
    };

    // A freshly inserted heading owns no content yet
    let section_end = if inserted {
        toc_index + 1
    } else {
        tree.children[toc_index + 1..]
            .iter()
            .position(|child| matches!(child.kind, NodeKind::Heading { .. }))
            .map_or(tree.children.len(), |offset| toc_index + 1 + offset)
    };

    let entries = collect_entries(tree, section_end);
    let list = build_list(&entries);
    let listed = entries.len();

    let replacement: Vec<Node> = list.into_iter().collect();
    tree.children.splice(toc_index + 1..section_end, replacement);

    debug!("Table of contents lists {} heading(s)", listed);
    listed
}

fn find_toc_heading(tree: &Node) -> Option<usize> {
    tree.children.iter().position(is_toc_heading)
}

/// Whether a node is the heading that introduces the table of contents
pub fn is_toc_heading(node: &Node) -> bool {
    matches!(node.kind, NodeKind::Heading { .. }) && TOC_HEADING.is_match(node.plain_text().trim())
}

/// Slugs are assigned over all headings, so duplicates before the table count too
fn collect_entries(tree: &Node, section_end: usize) -> Vec<TocEntry> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut entries = Vec::new();

    for (index, child) in tree.children.iter().enumerate() {
        let listed = index >= section_end;
        let mut headings = Vec::new();
        child.walk(&mut |node| {
            if let NodeKind::Heading { depth } = node.kind {
                headings.push((depth, node.plain_text()));
            }
        });

        for (depth, text) in headings {
            let slug = unique_slug(&mut seen, &text);
            if listed {
                entries.push(TocEntry {
                    depth,
                    text: text.trim().to_string(),
                    slug,
                });
            }
        }
    }
    entries
}

/// GitHub-style anchor: lowercase, punctuation dropped, spaces to hyphens
pub fn slugify(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .chars()
        .filter_map(|ch| match ch {
            ' ' => Some('-'),
            '-' | '_' => Some(ch),
            ch if ch.is_alphanumeric() => Some(ch),
            _ => None,
        })
        .collect()
}

fn unique_slug(seen: &mut HashMap<String, usize>, text: &str) -> String {
    let base = slugify(text);
    let count = seen.entry(base.clone()).or_insert(0);
    let slug = if *count == 0 { base.clone() } else { format!("{}-{}", base, count) };
    *count += 1;
    slug
}

fn build_list(entries: &[TocEntry]) -> Option<Node> {
    if entries.is_empty() {
        return None;
    }
    let top = entries.iter().map(|entry| entry.depth).min()?;
    let mut index = 0;
    Some(build_level(entries, &mut index, top))
}

/// Consume entries into one list level; deeper entries nest under the previous item
fn build_level(entries: &[TocEntry], index: &mut usize, level_depth: u8) -> Node {
    let mut items = Vec::new();

    while *index < entries.len() && entries[*index].depth >= level_depth {
        let entry = &entries[*index];
        *index += 1;

        let link = Node::with_children(
            NodeKind::Link {
                url: format!("#{}", entry.slug),
                title: String::new(),
            },
            vec![Node::text(entry.text.clone())],
        );
        let mut children = vec![Node::with_children(NodeKind::Paragraph, vec![link])];
        if *index < entries.len() && entries[*index].depth > entry.depth {
            let nested_depth = entries[*index].depth;
            children.push(build_level(entries, index, nested_depth));
        }
        items.push(Node::with_children(NodeKind::ListItem, children));
    }

    Node::with_children(
        NodeKind::List {
            ordered: false,
            start: None,
            spread: false,
        },
        items,
    )
}
