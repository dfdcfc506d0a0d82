/*!
 * Markdown document model.
 *
 * This module holds the owned syntax tree every pipeline stage works on:
 * - `parser`: builds a tree from Markdown text (pulldown-cmark events)
 * - `serializer`: writes a tree back to Markdown
 * - `html`: renders a tree to static HTML
 *
 * Source positions are assigned at parse time only. Any node created by a
 * mutation carries no position, and positions of nodes after a mutated
 * sibling must not be trusted for the rest of the pass.
 */

pub mod html;
pub mod parser;
pub mod serializer;

use std::ops::Range;

pub use html::render_html;
pub use parser::parse;
pub use serializer::serialize;

/// A line/column location in the source text (both 1-indexed)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    /// Line number
    pub line: usize,
    /// Column number (byte based)
    pub column: usize,
}

/// Source range a node was parsed from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// First character of the node
    pub start: Point,
    /// Position just after the last character of the node
    pub end: Point,
}

impl Position {
    /// Check whether a 1-indexed source line falls inside this range
    pub fn contains_line(&self, line: usize) -> bool {
        self.start.line <= line && line <= self.end.line
    }

    /// Whether the range covers a single source line
    pub fn is_single_line(&self) -> bool {
        self.start.line == self.end.line
    }

    /// Range of `value[range]` for a leaf whose value starts at `self.start`.
    ///
    /// Line numbers are exact as long as every line break of the value is a
    /// source line break; columns after a break restart at 1.
    pub fn slice(&self, value: &str, range: Range<usize>) -> Position {
        let point = |offset: usize| {
            let before = &value[..offset];
            match before.rfind('\n') {
                Some(newline) => Point {
                    line: self.start.line + before.matches('\n').count(),
                    column: offset - newline,
                },
                None => Point {
                    line: self.start.line,
                    column: self.start.column + offset,
                },
            }
        };
        Position {
            start: point(range.start),
            end: point(range.end),
        }
    }
}

/// Leaf kinds that can carry literal text and therefore swallow a row marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafKind {
    Text,
    Html,
    InlineCode,
    Code,
}

impl LeafKind {
    /// Lowercase type name, matching `NodeKind::type_name`
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Html => "html",
            Self::InlineCode => "inlineCode",
            Self::Code => "code",
        }
    }
}

/// Type tag and type-specific fields of a node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Root,
    Heading {
        /// 1 to 6
        depth: u8,
    },
    Paragraph,
    Text(String),
    Emphasis,
    Strong,
    InlineCode(String),
    Code {
        /// Info string of a fenced block
        lang: Option<String>,
        /// Block content without the fences
        value: String,
    },
    Html(String),
    List {
        /// Numbered list
        ordered: bool,
        /// First number of an ordered list
        start: Option<u64>,
        /// Items separated by blank lines
        spread: bool,
    },
    ListItem,
    Link {
        url: String,
        title: String,
    },
    Image {
        url: String,
        title: String,
    },
    BlockQuote,
    ThematicBreak,
    Break,
    /// Ephemeral technical line marker, see `row_markers`
    RowMarker {
        /// 1-indexed physical source line
        row: usize,
        /// Kind of the leaf the marker was carved out of
        original: LeafKind,
    },
}

impl NodeKind {
    /// Lowercase type name used in logs and reports
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Heading { .. } => "heading",
            Self::Paragraph => "paragraph",
            Self::Text(_) => "text",
            Self::Emphasis => "emphasis",
            Self::Strong => "strong",
            Self::InlineCode(_) => "inlineCode",
            Self::Code { .. } => "code",
            Self::Html(_) => "html",
            Self::List { .. } => "list",
            Self::ListItem => "listItem",
            Self::Link { .. } => "link",
            Self::Image { .. } => "image",
            Self::BlockQuote => "blockquote",
            Self::ThematicBreak => "thematicBreak",
            Self::Break => "break",
            Self::RowMarker { .. } => "rowNumber",
        }
    }

    /// Literal value of a leaf that carries text
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Text(value) | Self::InlineCode(value) | Self::Html(value) => Some(value),
            Self::Code { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Leaf category of a value-carrying node
    pub fn leaf_kind(&self) -> Option<LeafKind> {
        match self {
            Self::Text(_) => Some(LeafKind::Text),
            Self::Html(_) => Some(LeafKind::Html),
            Self::InlineCode(_) => Some(LeafKind::InlineCode),
            Self::Code { .. } => Some(LeafKind::Code),
            _ => None,
        }
    }

    /// Same kind (including fields such as a code block's language) with a new value.
    /// Returns `None` for kinds that carry no value.
    pub fn with_value(&self, value: String) -> Option<NodeKind> {
        match self {
            Self::Text(_) => Some(Self::Text(value)),
            Self::Html(_) => Some(Self::Html(value)),
            Self::InlineCode(_) => Some(Self::InlineCode(value)),
            Self::Code { lang, .. } => Some(Self::Code { lang: lang.clone(), value }),
            _ => None,
        }
    }

    /// Whether two value-carrying nodes may be merged into one
    pub fn mergeable_with(&self, other: &NodeKind) -> bool {
        match (self, other) {
            (Self::Text(_), Self::Text(_)) => true,
            (Self::Html(_), Self::Html(_)) => true,
            (Self::InlineCode(_), Self::InlineCode(_)) => true,
            (Self::Code { lang: a, .. }, Self::Code { lang: b, .. }) => a == b,
            _ => false,
        }
    }

    /// Block-level kinds are separated by blank lines when serialized
    pub fn is_block(&self) -> bool {
        matches!(
            self,
            Self::Heading { .. }
                | Self::Paragraph
                | Self::Code { .. }
                | Self::List { .. }
                | Self::ListItem
                | Self::BlockQuote
                | Self::ThematicBreak
        )
    }
}

/// A node of the document tree
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Type tag and fields
    pub kind: NodeKind,
    /// Ordered children (empty for leaves)
    pub children: Vec<Node>,
    /// Source range, only present on parsed nodes
    pub position: Option<Position>,
}

impl Node {
    /// Create a node without children or position
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
            position: None,
        }
    }

    /// Create an empty document root
    pub fn root() -> Self {
        Self::new(NodeKind::Root)
    }

    /// Create a text leaf
    pub fn text(value: impl Into<String>) -> Self {
        Self::new(NodeKind::Text(value.into()))
    }

    /// Create a container with the given children
    pub fn with_children(kind: NodeKind, children: Vec<Node>) -> Self {
        Self {
            kind,
            children,
            position: None,
        }
    }

    /// Attach a source position
    pub fn at(mut self, position: Option<Position>) -> Self {
        self.position = position;
        self
    }

    /// Concatenated text content, ignoring markup and row markers
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match &self.kind {
            NodeKind::Text(value) | NodeKind::InlineCode(value) => out.push_str(value),
            NodeKind::Break => out.push('\n'),
            NodeKind::RowMarker { .. } => {}
            _ => {
                for child in &self.children {
                    child.collect_text(out);
                }
            }
        }
    }

    /// Visit this node and all descendants in document order
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Node)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    /// Count descendants (and self) matching a predicate
    pub fn count(&self, predicate: impl Fn(&Node) -> bool) -> usize {
        let mut count = 0;
        self.walk(&mut |node| {
            if predicate(node) {
                count += 1;
            }
        });
        count
    }

    /// All headings in document order
    pub fn headings(&self) -> Vec<&Node> {
        let mut headings = Vec::new();
        self.walk(&mut |node| {
            if matches!(node.kind, NodeKind::Heading { .. }) {
                headings.push(node);
            }
        });
        headings
    }
}
