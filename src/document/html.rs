//! Static HTML rendering of a document tree.

use pulldown_cmark::{Options, Parser, html};

use super::{Node, serialize};

/// Render a tree to an HTML fragment.
///
/// Row markers still present in the tree are rendered as their literal text,
/// so callers strip them first.
pub fn render_html(tree: &Node) -> String {
    let markdown = serialize(tree);
    let parser = Parser::new_ext(&markdown, Options::empty());

    let mut output = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut output, parser);
    output
}
