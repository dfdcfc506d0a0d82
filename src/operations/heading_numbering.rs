//! `add_heading_numbering`: hierarchical `1.2.3` prefixes on headings.

use log::debug;

use super::generate_toc::is_toc_heading;
use crate::document::{Node, NodeKind};

/// Prefix every heading with its hierarchical number.
///
/// Counters are kept per depth; a heading resets every deeper counter. A heading
/// that already starts with its number is left alone, so numbering twice is the
/// same as numbering once. The table of contents heading is neither counted
/// nor numbered. Returns the number of headings prefixed.
pub fn add_heading_numbering(tree: &mut Node) -> usize {
    let mut counters = [0usize; 7];
    number_in(tree, &mut counters)
}

fn number_in(node: &mut Node, counters: &mut [usize; 7]) -> usize {
    if let NodeKind::Heading { depth } = node.kind {
        if is_toc_heading(node) {
            return 0;
        }
        let depth = usize::from(depth).clamp(1, 6);
        counters[depth] += 1;
        for deeper in counters.iter_mut().skip(depth + 1) {
            *deeper = 0;
        }

        let numbering = counters[1..=depth]
            .iter()
            .map(|count| count.to_string())
            .collect::<Vec<_>>()
            .join(".");
        return usize::from(prefix_heading(node, &numbering));
    }

    node.children
        .iter_mut()
        .map(|child| number_in(child, counters))
        .sum()
}

fn prefix_heading(heading: &mut Node, numbering: &str) -> bool {
    let prefix = format!("{} ", numbering);
    if heading.plain_text().trim_start().starts_with(&prefix) {
        return false;
    }

    debug!("Numbering heading \"{}\" as {}", heading.plain_text(), numbering);
    match heading.children.first_mut() {
        Some(Node { kind: NodeKind::Text(value), .. }) => {
            *value = format!("{}{}", prefix, value.trim_start());
        }
        _ => heading.children.insert(0, Node::text(prefix)),
    }
    true
}
