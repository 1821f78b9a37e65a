//! Markdown parsing: text in, [`Document`] out.
//!
//! The pipeline depends only on the [`MarkdownParser`] trait. [`CmarkParser`]
//! is the stock implementation, built on pulldown-cmark, with an optional
//! `+++` fenced TOML front matter block:
//!
//! ```text
//! +++
//! title = "Getting started"
//! route = "/start"
//! +++
//!
//! # Welcome
//! ```
//!
//! CommonMark itself has no invalid input, so malformed front matter is the
//! one way a document fails to parse.

use crate::config::FeaturesConfig;
use crate::document::{Document, ElementKind, Node};
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag};
use thiserror::Error;

/// A document that could not be parsed.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("line {line}: {message}")]
pub struct ParseError {
    /// One-based line in the source text.
    pub line: usize,
    pub message: String,
}

/// Turns raw markdown text into a document tree.
pub trait MarkdownParser {
    fn parse(&self, text: &str) -> Result<Document, ParseError>;
}

const FRONT_MATTER_FENCE: &str = "+++";

/// pulldown-cmark backed parser.
#[derive(Debug, Clone, Default)]
pub struct CmarkParser {
    features: FeaturesConfig,
}

impl CmarkParser {
    pub fn new(features: FeaturesConfig) -> Self {
        Self { features }
    }

    fn options(&self) -> Options {
        let mut opts = Options::empty();
        if self.features.tables {
            opts.insert(Options::ENABLE_TABLES);
        }
        if self.features.strikethrough {
            opts.insert(Options::ENABLE_STRIKETHROUGH);
        }
        if self.features.task_lists {
            opts.insert(Options::ENABLE_TASKLISTS);
        }
        if self.features.footnotes {
            opts.insert(Options::ENABLE_FOOTNOTES);
        }
        opts
    }
}

impl MarkdownParser for CmarkParser {
    fn parse(&self, text: &str) -> Result<Document, ParseError> {
        let (front_matter, body) = if self.features.front_matter {
            split_front_matter(text)?
        } else {
            (None, text)
        };

        let mut builder = TreeBuilder::default();
        for event in Parser::new_ext(body, self.options()) {
            builder.handle_event(event);
        }

        Ok(Document {
            front_matter,
            nodes: builder.finish(),
        })
    }
}

/// Split a leading `+++` block off the text and parse it as TOML.
fn split_front_matter(text: &str) -> Result<(Option<toml::Table>, &str), ParseError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = text.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return Ok((None, text));
    };
    if first.trim_end() != FRONT_MATTER_FENCE {
        return Ok((None, text));
    }

    let mut offset = first.len();
    for line in lines {
        if line.trim_end() == FRONT_MATTER_FENCE {
            let raw = &text[first.len()..offset];
            let table: toml::Table = toml::from_str(raw).map_err(|e| ParseError {
                // +1 for the opening fence, +1 for one-based lines
                line: e
                    .span()
                    .map_or(1, |span| raw[..span.start].matches('\n').count() + 2),
                message: format!("invalid front matter: {}", e.message()),
            })?;
            return Ok((Some(table), &text[offset + line.len()..]));
        }
        offset += line.len();
    }

    Err(ParseError {
        line: 1,
        message: format!("front matter opened with `{FRONT_MATTER_FENCE}` is never closed"),
    })
}

/// Builds a [`Node`] tree from the flat pulldown-cmark event stream.
#[derive(Default)]
struct TreeBuilder {
    /// Open elements, innermost last.
    stack: Vec<(ElementKind, Vec<Node>)>,
    root: Vec<Node>,
}

impl TreeBuilder {
    fn handle_event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.stack.push((element_kind(tag), Vec::new())),
            Event::End(_) => {
                if let Some((kind, children)) = self.stack.pop() {
                    self.push(Node::Element { kind, children });
                }
            }
            Event::Text(text) => self.push_text(&text),
            Event::Code(code) => self.push(Node::Code(code.into_string())),
            Event::Html(html) | Event::InlineHtml(html) => self.push(Node::Html(html.into_string())),
            Event::SoftBreak => self.push(Node::SoftBreak),
            Event::HardBreak => self.push(Node::HardBreak),
            Event::Rule => self.push(Node::Rule),
            Event::TaskListMarker(checked) => self.push(Node::TaskMarker(checked)),
            Event::FootnoteReference(name) => {
                self.push(Node::FootnoteReference(name.into_string()))
            }
            Event::InlineMath(math) | Event::DisplayMath(math) => {
                self.push_text(&math)
            }
        }
    }

    /// Text events arrive split at arbitrary points; merge adjacent runs.
    fn push_text(&mut self, text: &str) {
        let siblings = self.current();
        if let Some(Node::Text(prev)) = siblings.last_mut() {
            prev.push_str(text);
        } else {
            siblings.push(Node::Text(text.to_string()));
        }
    }

    fn push(&mut self, node: Node) {
        self.current().push(node);
    }

    fn current(&mut self) -> &mut Vec<Node> {
        match self.stack.last_mut() {
            Some((_, children)) => children,
            None => &mut self.root,
        }
    }

    fn finish(mut self) -> Vec<Node> {
        // Close anything left open
        while let Some((kind, children)) = self.stack.pop() {
            self.push(Node::Element { kind, children });
        }
        self.root
    }
}

fn element_kind(tag: Tag<'_>) -> ElementKind {
    match tag {
        Tag::Paragraph => ElementKind::Paragraph,
        Tag::Heading { level, .. } => ElementKind::Heading(level as u8),
        Tag::BlockQuote(_) => ElementKind::BlockQuote,
        Tag::CodeBlock(kind) => ElementKind::CodeBlock {
            lang: match kind {
                CodeBlockKind::Fenced(info) => info
                    .split_whitespace()
                    .next()
                    .map(str::to_string),
                CodeBlockKind::Indented => None,
            },
        },
        Tag::List(start) => ElementKind::List { start },
        Tag::Item => ElementKind::Item,
        Tag::Emphasis => ElementKind::Emphasis,
        Tag::Strong => ElementKind::Strong,
        Tag::Strikethrough => ElementKind::Strikethrough,
        Tag::Link {
            dest_url, title, ..
        } => ElementKind::Link {
            dest: dest_url.into_string(),
            title: title.into_string(),
        },
        Tag::Image {
            dest_url, title, ..
        } => ElementKind::Image {
            dest: dest_url.into_string(),
            title: title.into_string(),
        },
        Tag::Table(_) => ElementKind::Table,
        Tag::TableHead => ElementKind::TableHead,
        Tag::TableRow => ElementKind::TableRow,
        Tag::TableCell => ElementKind::TableCell,
        Tag::FootnoteDefinition(label) => ElementKind::FootnoteDefinition(label.into_string()),
        _ => ElementKind::Group,
    }
}
