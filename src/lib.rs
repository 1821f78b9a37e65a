//! # mdpages
//!
//! Turns a tree of markdown files into generated source files, one per page.
//! Each generated file holds a function returning the page's HTML, named after
//! the markdown file and placed in a package mirroring its directory.
//!
//! # Architecture: One Run, One Cache
//!
//! ```text
//! mdpages.toml ─→ RootSet ─→ discover ─→ ConversionUnit*
//!                                           │
//!                  DocumentCache ←─ Resolver │
//!                        │                  ↓
//!                        └──────────→ PageRenderer ─→ <output>/<dir>/<Name>.rs
//! ```
//!
//! Markdown pages link to each other, so a single run needs the same document
//! both as a page of its own and as the target of other pages' links. The
//! [`cache::DocumentCache`] guarantees each file is read and parsed once per
//! run, and every consumer sees the same in-memory tree. The cache is never
//! persisted: a fresh run always sees the files as they are on disk.
//!
//! Every file the pipeline touches must live under one of the configured
//! markdown roots. Asking the cache for anything else is an error, and a link
//! that escapes its root simply doesn't resolve.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`convert`] | Conversion driver: discovery, per-page rendering, atomic writes, link check |
//! | [`roots`] | Canonical, ordered markdown root directories |
//! | [`cache`] | Run-scoped memoizing store of parsed documents |
//! | [`resolve`] | Root-relative cross-reference lookup and link interpretation |
//! | [`parser`] | `MarkdownParser` trait and the pulldown-cmark implementation |
//! | [`document`] | Parsed document tree |
//! | [`render`] | `PageRenderer` trait, diagnostics, and the maud-based source renderer |
//! | [`naming`] | Package, function-name, and route derivation |
//! | [`config`] | `mdpages.toml` loading, validation, and merging |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Single-Threaded Runs
//!
//! A run converts pages one after another. Documents are shared as
//! `Rc<Document>` and the cache uses `RefCell`, so a cache hit is a pointer
//! copy and identity is preserved without locking.
//!
//! ## First Root Wins
//!
//! Roots are searched in configured order, resource roots before generated
//! ones. When the same relative path exists under several roots, the first
//! one shadows the rest, both for link resolution and for discovery.
//!
//! ## Collaborators Behind Traits
//!
//! Parsing and rendering sit behind [`parser::MarkdownParser`] and
//! [`render::PageRenderer`]. The driver, cache, and resolver never look inside
//! a document, so a different parser or output language plugs in without
//! touching them.

pub mod cache;
pub mod config;
pub mod convert;
pub mod document;
pub mod naming;
pub mod output;
pub mod parser;
pub mod render;
pub mod resolve;
pub mod roots;

#[cfg(test)]
pub(crate) mod test_helpers;
