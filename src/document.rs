//! Parsed Markdown document tree.
//!
//! The pipeline core never looks inside a [`Document`]; it only caches and
//! hands it to the renderer. The tree is deliberately small: enough structure
//! for the default renderer to produce HTML and rewrite cross-references.

/// A parsed Markdown file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    /// TOML front matter (`+++` fenced block), if the file had one.
    pub front_matter: Option<toml::Table>,
    /// Top-level block nodes.
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element { kind: ElementKind, children: Vec<Node> },
    Text(String),
    /// Inline code span.
    Code(String),
    /// Raw HTML, block or inline.
    Html(String),
    SoftBreak,
    HardBreak,
    Rule,
    TaskMarker(bool),
    FootnoteReference(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    Paragraph,
    Heading(u8),
    BlockQuote,
    CodeBlock { lang: Option<String> },
    /// Ordered lists carry their start number.
    List { start: Option<u64> },
    Item,
    Emphasis,
    Strong,
    Strikethrough,
    Link { dest: String, title: String },
    Image { dest: String, title: String },
    Table,
    TableHead,
    TableRow,
    TableCell,
    FootnoteDefinition(String),
    /// Container with no markup of its own (HTML blocks, unsupported extensions).
    Group,
}

impl Node {
    /// Concatenated text content, markup stripped.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Text(t) | Node::Code(t) => out.push_str(t),
            Node::SoftBreak | Node::HardBreak => out.push(' '),
            Node::Element { children, .. } => {
                for child in children {
                    child.collect_text(out);
                }
            }
            Node::Html(_) | Node::Rule | Node::TaskMarker(_) | Node::FootnoteReference(_) => {}
        }
    }

    fn collect_links<'a>(&'a self, out: &mut Vec<&'a str>) {
        if let Node::Element { kind, children } = self {
            if let ElementKind::Link { dest, .. } = kind {
                out.push(dest);
            }
            for child in children {
                child.collect_links(out);
            }
        }
    }
}

/// Plain text of a node list.
pub fn plain_text(nodes: &[Node]) -> String {
    nodes.iter().map(Node::plain_text).collect()
}

impl Document {
    /// String value of a front matter key, if present and a string.
    pub fn front_matter_str(&self, key: &str) -> Option<&str> {
        self.front_matter.as_ref()?.get(key)?.as_str()
    }

    /// Page title: front matter `title`, else the text of the first heading.
    pub fn title(&self) -> Option<String> {
        if let Some(title) = self.front_matter_str("title") {
            return Some(title.to_string());
        }
        self.nodes.iter().find_map(|node| match node {
            Node::Element {
                kind: ElementKind::Heading(_),
                children,
            } => Some(plain_text(children).trim().to_string()),
            _ => None,
        })
    }

    /// Every link destination in document order.
    pub fn links(&self) -> Vec<&str> {
        let mut out = Vec::new();
        for node in &self.nodes {
            node.collect_links(&mut out);
        }
        out
    }
}
