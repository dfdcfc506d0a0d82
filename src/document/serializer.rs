/*!
 * Markdown serialization of the document tree.
 *
 * Output is normalized: ATX headings, fenced code, `-` bullets, `*` emphasis,
 * `**` strong, one blank line between blocks and a trailing newline.
 */

use super::{Node, NodeKind};

/// Serialize a tree back to Markdown text
pub fn serialize(tree: &Node) -> String {
    let body = match tree.kind {
        NodeKind::Root => blocks(&tree.children, "\n\n"),
        _ => block(tree),
    };
    if body.is_empty() {
        body
    } else {
        format!("{}\n", body.trim_end_matches('\n'))
    }
}

fn blocks(children: &[Node], separator: &str) -> String {
    children
        .iter()
        .map(block)
        .filter(|rendered| !rendered.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

fn block(node: &Node) -> String {
    match &node.kind {
        NodeKind::Root => blocks(&node.children, "\n\n"),
        NodeKind::Heading { depth } => {
            let content = inline(&node.children).replace('\n', " ");
            format!("{} {}", "#".repeat(usize::from(*depth).clamp(1, 6)), content.trim())
        }
        NodeKind::Paragraph => inline(&node.children),
        NodeKind::Code { lang, value } => {
            let fence = fence_for(value);
            format!("{fence}{}\n{value}\n{fence}", lang.as_deref().unwrap_or(""))
        }
        NodeKind::Html(value) => value.trim_end_matches('\n').to_string(),
        NodeKind::List { ordered, start, spread } => {
            let separator = if *spread { "\n\n" } else { "\n" };
            let mut number = start.unwrap_or(1);
            node.children
                .iter()
                .map(|item| {
                    let marker = if *ordered {
                        let marker = format!("{number}. ");
                        number += 1;
                        marker
                    } else {
                        "- ".to_string()
                    };
                    list_item(item, &marker, *spread)
                })
                .collect::<Vec<_>>()
                .join(separator)
        }
        NodeKind::ListItem => list_item(node, "- ", false),
        NodeKind::BlockQuote => blocks(&node.children, "\n\n")
            .lines()
            .map(|line| if line.is_empty() { ">".to_string() } else { format!("> {line}") })
            .collect::<Vec<_>>()
            .join("\n"),
        NodeKind::ThematicBreak => "---".to_string(),
        // Inline content at block level, e.g. a tree built by hand
        _ => inline(std::slice::from_ref(node)),
    }
}

fn list_item(item: &Node, marker: &str, spread: bool) -> String {
    let separator = if spread { "\n\n" } else { "\n" };
    let content = blocks(&item.children, separator);
    let indent = " ".repeat(marker.len());

    let mut out = String::from(marker);
    for (index, line) in content.lines().enumerate() {
        if index > 0 {
            out.push('\n');
            if !line.is_empty() {
                out.push_str(&indent);
            }
        }
        out.push_str(line);
    }
    out.trim_end().to_string()
}

fn fence_for(value: &str) -> String {
    let mut longest = 0;
    let mut current = 0;
    for ch in value.chars() {
        if ch == '`' {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    "`".repeat(longest.max(2) + 1)
}

fn inline(children: &[Node]) -> String {
    let mut out = String::new();
    for child in children {
        write_inline(child, &mut out);
    }
    out
}

fn write_inline(node: &Node, out: &mut String) {
    match &node.kind {
        NodeKind::Text(value) => write_text(value, out),
        NodeKind::Emphasis => {
            out.push('*');
            out.push_str(&inline(&node.children));
            out.push('*');
        }
        NodeKind::Strong => {
            out.push_str("**");
            out.push_str(&inline(&node.children));
            out.push_str("**");
        }
        NodeKind::InlineCode(value) => {
            let ticks = if value.contains('`') { "``" } else { "`" };
            let pad = if value.starts_with('`') || value.ends_with('`') { " " } else { "" };
            out.push_str(&format!("{ticks}{pad}{value}{pad}{ticks}"));
        }
        NodeKind::Html(value) => out.push_str(value),
        NodeKind::Break => out.push_str("\\\n"),
        NodeKind::Link { url, title } => {
            out.push('[');
            out.push_str(&inline(&node.children));
            out.push_str("](");
            out.push_str(&destination(url, title));
            out.push(')');
        }
        NodeKind::Image { url, title } => {
            out.push_str("![");
            out.push_str(&node.plain_text());
            out.push_str("](");
            out.push_str(&destination(url, title));
            out.push(')');
        }
        NodeKind::RowMarker { row, .. } => out.push_str(&format!("[ROW {row}]")),
        _ => out.push_str(&block(node)),
    }
}

fn destination(url: &str, title: &str) -> String {
    let url = if url.contains(' ') { format!("<{url}>") } else { url.to_string() };
    if title.is_empty() {
        url
    } else {
        format!("{url} \"{}\"", title.replace('"', "\\\""))
    }
}

/// Escape characters that would otherwise be read as markup.
/// Square brackets are only escaped when they would open an inline link, so
/// speaker tags and row markers stay readable.
fn write_text(value: &str, out: &mut String) {
    for (index, line) in value.split('\n').enumerate() {
        if index > 0 {
            out.push('\n');
        }
        let at_line_start = out.is_empty() || out.ends_with('\n');
        if at_line_start && starts_block_syntax(line) {
            out.push('\\');
        }
        let chars: Vec<char> = line.chars().collect();
        for (pos, ch) in chars.iter().enumerate() {
            match ch {
                '*' | '`' | '\\' => out.push('\\'),
                '[' if opens_link(&chars[pos..]) => out.push('\\'),
                '_' => {
                    let before = pos.checked_sub(1).and_then(|i| chars.get(i));
                    let after = chars.get(pos + 1);
                    let intraword = before.is_some_and(|c| c.is_alphanumeric())
                        && after.is_some_and(|c| c.is_alphanumeric());
                    if !intraword {
                        out.push('\\');
                    }
                }
                _ => {}
            }
            out.push(*ch);
        }
    }
}

/// `[text](` at the start of `rest`
fn opens_link(rest: &[char]) -> bool {
    rest.iter()
        .position(|c| *c == ']')
        .is_some_and(|close| rest.get(close + 1) == Some(&'('))
}

fn starts_block_syntax(line: &str) -> bool {
    let trimmed = line.trim_start();
    if trimmed.starts_with('#') || trimmed.starts_with('>') {
        return true;
    }
    // Setext underline, or a thematic break made of dashes
    let underline = trimmed.trim_end();
    if (underline.starts_with('=') || underline.starts_with('-'))
        && underline.chars().all(|c| matches!(c, '=' | '-' | ' '))
    {
        return true;
    }
    if ["- ", "+ "].iter().any(|marker| trimmed.starts_with(marker)) || trimmed == "-" {
        return true;
    }
    let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
    digits > 0 && (trimmed[digits..].starts_with(". ") || trimmed[digits..].starts_with(") "))
}
