//! Page rendering: document tree in, generated source file out.
//!
//! The conversion driver only knows the [`PageRenderer`] trait. It hands the
//! renderer a parsed [`Document`] plus a [`RenderContext`] describing where the
//! page lives and how to look up the pages it links to, and writes whatever
//! text comes back.
//!
//! [`SourceRenderer`] is the stock renderer. It turns the tree into HTML with
//! maud and wraps it in a Rust function named after the page:
//!
//! ```text
//! // Generated by mdpages from guides/intro.md. Do not edit.
//! // package: pages::guides
//!
//! use crate::layout;
//!
//! /// Getting started
//! #[allow(non_snake_case)]
//! pub fn Intro() -> String {
//!     layout::page(r#"<h1 id="getting-started">Getting started</h1>..."#)
//! }
//! ```
//!
//! ## Links
//!
//! A link to another markdown document that resolves under the markdown roots
//! is rewritten to that page's route (`./setup.md#install` →
//! `/guides/setup#install`). A `route` key in the target's front matter
//! overrides the derived route. Links that don't resolve are left as written.
//!
//! ## Front matter
//!
//! - `title`: doc comment on the generated function
//! - `route`: route used by pages linking here
//! - `root`: wrapper function for this page; `""` disables the default root

use crate::cache::CacheError;
use crate::config::{HandlersConfig, HtmlPolicy};
use crate::document::{Document, ElementKind, Node, plain_text};
use crate::naming;
use crate::resolve::reference_query;
use maud::{Markup, PreEscaped, html};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Resolve(#[from] CacheError),
    #[error("raw HTML is not allowed in {source_path}: {snippet}")]
    RawHtml {
        source_path: String,
        snippet: String,
    },
}

/// Diagnostics sink for problems that don't stop a page from rendering.
pub trait Reporter {
    fn warn(&self, source_path: &str, message: &str);
    fn info(&self, source_path: &str, message: &str);
}

/// Forwards diagnostics to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingReporter;

impl Reporter for LoggingReporter {
    fn warn(&self, source_path: &str, message: &str) {
        tracing::warn!(source = source_path, "{message}");
    }

    fn info(&self, source_path: &str, message: &str) {
        tracing::info!(source = source_path, "{message}");
    }
}

/// Callback resolving a root-relative markdown path to its parsed document.
pub type ResolveFn<'a> = dyn Fn(&str) -> Result<Option<Rc<Document>>, CacheError> + 'a;

/// Everything a renderer knows about the page it is rendering.
pub struct RenderContext<'a> {
    pub resolve: &'a ResolveFn<'a>,
    /// Wrapper function for the page body, unless front matter overrides it.
    pub default_root: Option<&'a str>,
    /// Paths emitted as `use` lines.
    pub imports: &'a [String],
    /// Forward-slash path of the source relative to its markdown root.
    pub source_path: &'a str,
    pub handlers: &'a HandlersConfig,
    /// Extension (without dot) that marks a link as a markdown reference.
    pub markdown_extension: &'a str,
    pub package: &'a str,
    pub function_name: &'a str,
    pub reporter: &'a dyn Reporter,
}

pub trait PageRenderer {
    fn render(&self, doc: &Document, ctx: &RenderContext<'_>) -> Result<String, RenderError>;
}

/// Renders pages as Rust functions returning their HTML.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceRenderer;

impl PageRenderer for SourceRenderer {
    fn render(&self, doc: &Document, ctx: &RenderContext<'_>) -> Result<String, RenderError> {
        let body = render_html(doc, ctx)?;
        Ok(page_source(doc, ctx, &body.into_string()))
    }
}

/// HTML for the document body.
pub fn render_html(doc: &Document, ctx: &RenderContext<'_>) -> Result<Markup, RenderError> {
    HtmlWriter::new(ctx).nodes(&doc.nodes)
}

/// Wrap rendered HTML into the generated source file.
fn page_source(doc: &Document, ctx: &RenderContext<'_>, body: &str) -> String {
    let mut lines = vec![
        format!(
            "// Generated by mdpages from {}. Do not edit.",
            ctx.source_path
        ),
        format!("// package: {}", ctx.package),
        String::new(),
    ];

    if !ctx.imports.is_empty() {
        for import in ctx.imports {
            lines.push(format!("use {};", import.trim().trim_end_matches(';')));
        }
        lines.push(String::new());
    }

    if let Some(title) = doc.title().filter(|t| !t.is_empty()) {
        lines.push(format!("/// {}", title.replace(['\n', '\r'], " ")));
    }
    lines.push("#[allow(non_snake_case)]".to_string());
    lines.push(format!("pub fn {}() -> String {{", ctx.function_name));

    let literal = raw_string_literal(&body.replace('\r', ""));
    let root = match doc.front_matter_str("root") {
        Some(root) => Some(root.trim()).filter(|r| !r.is_empty()),
        None => ctx.default_root,
    };
    match root {
        Some(root) => lines.push(format!("    {root}({literal})")),
        None => lines.push(format!("    String::from({literal})")),
    }
    lines.push("}".to_string());
    lines.push(String::new());

    lines.join("\n")
}

/// `s` as a raw string literal with enough `#`s that no `"#...` inside closes it.
fn raw_string_literal(s: &str) -> String {
    let mut longest = 0;
    let mut run: Option<usize> = None;
    for c in s.chars() {
        run = match (c, run) {
            ('"', _) => Some(0),
            ('#', Some(n)) => {
                longest = longest.max(n + 1);
                Some(n + 1)
            }
            _ => None,
        };
    }
    let hashes = "#".repeat(longest + 1);
    format!("r{hashes}\"{s}\"{hashes}")
}

/// Heading anchor slug: lowercase alphanumerics joined by single dashes.
fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if (c.is_whitespace() || c == '-' || c == '_') && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "section".to_string()
    } else {
        slug.to_string()
    }
}

fn non_empty(s: &str) -> Option<&str> {
    Some(s).filter(|s| !s.is_empty())
}

/// Walks one document, tracking per-page state (anchors, footnote numbers).
struct HtmlWriter<'r, 'a> {
    ctx: &'r RenderContext<'a>,
    anchors: HashSet<String>,
    footnotes: HashMap<String, usize>,
}

impl<'r, 'a> HtmlWriter<'r, 'a> {
    fn new(ctx: &'r RenderContext<'a>) -> Self {
        Self {
            ctx,
            anchors: HashSet::new(),
            footnotes: HashMap::new(),
        }
    }

    fn class(&self, element: &str) -> Option<&'a str> {
        self.ctx.handlers.class(element)
    }

    fn nodes(&mut self, nodes: &[Node]) -> Result<Markup, RenderError> {
        let mut out = String::new();
        for node in nodes {
            out.push_str(&self.node(node)?.into_string());
        }
        Ok(PreEscaped(out))
    }

    fn node(&mut self, node: &Node) -> Result<Markup, RenderError> {
        let markup = match node {
            Node::Element { kind, children } => self.element(kind, children)?,
            Node::Text(text) => html! { (text) },
            Node::Code(code) => html! { code class=[self.class("code")] { (code) } },
            Node::Html(raw) => self.raw_html(raw)?,
            Node::SoftBreak => html! { "\n" },
            Node::HardBreak => html! { br; },
            Node::Rule => html! { hr class=[self.class("hr")]; },
            Node::TaskMarker(checked) => {
                html! { input type="checkbox" disabled checked[*checked]; }
            }
            Node::FootnoteReference(name) => {
                let number = self.footnote_number(name);
                html! {
                    sup class="footnote-reference" {
                        a href={ "#fn-" (name) } { (number) }
                    }
                }
            }
        };
        Ok(markup)
    }

    fn element(&mut self, kind: &ElementKind, children: &[Node]) -> Result<Markup, RenderError> {
        let markup = match kind {
            ElementKind::Paragraph => {
                let inner = self.nodes(children)?;
                html! { p class=[self.class("p")] { (inner) } }
            }
            ElementKind::Heading(level) => self.heading(*level, children)?,
            ElementKind::BlockQuote => {
                let inner = self.nodes(children)?;
                html! { blockquote class=[self.class("blockquote")] { (inner) } }
            }
            ElementKind::CodeBlock { lang } => {
                let lang_class = lang.as_ref().map(|l| format!("language-{l}"));
                html! {
                    pre class=[self.class("pre")] {
                        code class=[lang_class] { (plain_text(children)) }
                    }
                }
            }
            ElementKind::List { start: Some(start) } => {
                let inner = self.nodes(children)?;
                let start = (*start != 1).then_some(*start);
                html! { ol start=[start] class=[self.class("ol")] { (inner) } }
            }
            ElementKind::List { start: None } => {
                let inner = self.nodes(children)?;
                html! { ul class=[self.class("ul")] { (inner) } }
            }
            ElementKind::Item => {
                let inner = self.nodes(children)?;
                html! { li class=[self.class("li")] { (inner) } }
            }
            ElementKind::Emphasis => {
                let inner = self.nodes(children)?;
                html! { em class=[self.class("em")] { (inner) } }
            }
            ElementKind::Strong => {
                let inner = self.nodes(children)?;
                html! { strong class=[self.class("strong")] { (inner) } }
            }
            ElementKind::Strikethrough => {
                let inner = self.nodes(children)?;
                html! { del class=[self.class("del")] { (inner) } }
            }
            ElementKind::Link { dest, title } => {
                let href = self.link_target(dest)?;
                let inner = self.nodes(children)?;
                html! {
                    a href=(href) title=[non_empty(title)] class=[self.class("a")] { (inner) }
                }
            }
            ElementKind::Image { dest, title } => html! {
                img src=(dest) alt=(plain_text(children)) title=[non_empty(title)] class=[self.class("img")];
            },
            ElementKind::Table => self.table(children)?,
            ElementKind::TableHead => {
                let cells = self.cells(children, true)?;
                html! { thead class=[self.class("thead")] { tr class=[self.class("tr")] { (cells) } } }
            }
            ElementKind::TableRow => {
                let cells = self.cells(children, false)?;
                html! { tr class=[self.class("tr")] { (cells) } }
            }
            ElementKind::TableCell => {
                let inner = self.nodes(children)?;
                html! { td class=[self.class("td")] { (inner) } }
            }
            ElementKind::FootnoteDefinition(label) => {
                let number = self.footnote_number(label);
                let inner = self.nodes(children)?;
                html! {
                    div class="footnote-definition" id={ "fn-" (label) } {
                        sup class="footnote-definition-label" { (number) }
                        (inner)
                    }
                }
            }
            ElementKind::Group => self.nodes(children)?,
        };
        Ok(markup)
    }

    fn heading(&mut self, level: u8, children: &[Node]) -> Result<Markup, RenderError> {
        let inner = self.nodes(children)?;
        let id = if self.ctx.handlers.heading_anchors {
            Some(self.anchor(&plain_text(children)))
        } else {
            None
        };
        let markup = match level {
            1 => html! { h1 id=[id] class=[self.class("h1")] { (inner) } },
            2 => html! { h2 id=[id] class=[self.class("h2")] { (inner) } },
            3 => html! { h3 id=[id] class=[self.class("h3")] { (inner) } },
            4 => html! { h4 id=[id] class=[self.class("h4")] { (inner) } },
            5 => html! { h5 id=[id] class=[self.class("h5")] { (inner) } },
            _ => html! { h6 id=[id] class=[self.class("h6")] { (inner) } },
        };
        Ok(markup)
    }

    /// Unique anchor for a heading; repeats get `-1`, `-2`, ...
    fn anchor(&mut self, text: &str) -> String {
        let base = slugify(text);
        if self.anchors.insert(base.clone()) {
            return base;
        }
        let mut n = 1;
        loop {
            let candidate = format!("{base}-{n}");
            if self.anchors.insert(candidate.clone()) {
                self.ctx.reporter.warn(
                    self.ctx.source_path,
                    &format!("duplicate heading anchor \"{base}\", using \"{candidate}\""),
                );
                return candidate;
            }
            n += 1;
        }
    }

    fn footnote_number(&mut self, label: &str) -> usize {
        let next = self.footnotes.len() + 1;
        *self.footnotes.entry(label.to_string()).or_insert(next)
    }

    fn table(&mut self, children: &[Node]) -> Result<Markup, RenderError> {
        let mut head = String::new();
        let mut body = String::new();
        for child in children {
            let markup = self.node(child)?.into_string();
            match child {
                Node::Element {
                    kind: ElementKind::TableHead,
                    ..
                } => head.push_str(&markup),
                _ => body.push_str(&markup),
            }
        }
        Ok(html! {
            table class=[self.class("table")] {
                (PreEscaped(head))
                @if !body.is_empty() {
                    tbody { (PreEscaped(body)) }
                }
            }
        })
    }

    fn cells(&mut self, children: &[Node], header: bool) -> Result<Markup, RenderError> {
        let mut out = String::new();
        for child in children {
            let markup = match child {
                Node::Element {
                    kind: ElementKind::TableCell,
                    children,
                } => {
                    let inner = self.nodes(children)?;
                    if header {
                        html! { th class=[self.class("th")] { (inner) } }
                    } else {
                        html! { td class=[self.class("td")] { (inner) } }
                    }
                }
                other => self.node(other)?,
            };
            out.push_str(&markup.into_string());
        }
        Ok(PreEscaped(out))
    }

    fn raw_html(&self, raw: &str) -> Result<Markup, RenderError> {
        match self.ctx.handlers.html {
            HtmlPolicy::Allow => Ok(PreEscaped(raw.to_string())),
            HtmlPolicy::Escape => Ok(html! { (raw) }),
            HtmlPolicy::Reject => Err(RenderError::RawHtml {
                source_path: self.ctx.source_path.to_string(),
                snippet: raw.trim().chars().take(60).collect(),
            }),
        }
    }

    /// Route of the page a link points to, or the link as written.
    fn link_target(&self, dest: &str) -> Result<String, RenderError> {
        let ctx = self.ctx;
        let Some(query) = reference_query(ctx.source_path, dest, ctx.markdown_extension) else {
            return Ok(dest.to_string());
        };
        let Some(target) = (ctx.resolve)(&query.path)? else {
            ctx.reporter.info(
                ctx.source_path,
                &format!("unresolved reference {dest}, left as written"),
            );
            return Ok(dest.to_string());
        };

        let route = match target.front_matter_str("route") {
            Some(route) => route.to_string(),
            None => naming::route_for(&query.path),
        };
        Ok(match query.fragment {
            Some(fragment) => format!("{route}#{fragment}"),
            None => route,
        })
    }
}
