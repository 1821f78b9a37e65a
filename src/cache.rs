//! Parsed-document cache for a single conversion run.
//!
//! Markdown files link to each other, so while converting a tree of them the
//! same file is often needed many times: once as a conversion unit of its
//! own, and again every time another page links to it. This module makes
//! sure each file is read and parsed at most once per run.
//!
//! # Design
//!
//! ## Keys
//!
//! Entries are keyed by the file's **canonical path** (symlinks and `..`
//! resolved), written with `/` separators. Two spellings of the same file
//! (`guides/../intro.md`, a symlink) share one entry.
//!
//! ## Identity
//!
//! Trees are handed out as [`Rc<Document>`]. A cache hit returns a clone of
//! the same `Rc`, so callers can rely on pointer identity: within one run a
//! logical document has exactly one in-memory representation. The first
//! successful parse wins and an entry is never replaced.
//!
//! ## Lifetime
//!
//! The cache lives for one run and is never persisted. Markdown files change
//! between builds; a stale tree would silently produce wrong pages.
//!
//! ## Roots
//!
//! Only files under one of the run's [`RootSet`] directories may be cached.
//! Asking for anything else is a [`CacheError::RootViolation`].

use crate::document::Document;
use crate::parser::{MarkdownParser, ParseError};
use crate::roots::{RootSet, canonicalize_lenient, invariant_path};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("{} is not under any of the markdown roots {roots}", path.display())]
    RootViolation { path: PathBuf, roots: RootSet },
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

/// Memoizing store of parsed documents, keyed by canonical path.
pub struct DocumentCache<'a> {
    parser: &'a dyn MarkdownParser,
    roots: &'a RootSet,
    entries: RefCell<HashMap<String, Rc<Document>>>,
    stats: Cell<CacheStats>,
}

impl<'a> DocumentCache<'a> {
    pub fn new(parser: &'a dyn MarkdownParser, roots: &'a RootSet) -> Self {
        Self {
            parser,
            roots,
            entries: RefCell::new(HashMap::new()),
            stats: Cell::new(CacheStats::default()),
        }
    }

    /// Roots this cache accepts files from.
    pub fn roots(&self) -> &'a RootSet {
        self.roots
    }

    /// Parsed tree for `file`, reading and parsing it on first access only.
    ///
    /// Fails with [`CacheError::RootViolation`] if the file's canonical path
    /// is outside every root, whether or not the file exists,
    /// [`CacheError::Io`] if it can't be resolved or read, and
    /// [`CacheError::Parse`] if the parser rejects it. None of these leave an
    /// entry behind.
    pub fn get(&self, file: &Path) -> Result<Rc<Document>, CacheError> {
        let canonical = match file.canonicalize() {
            Ok(canonical) => canonical,
            Err(source) => {
                // A missing file outside the roots is still a root violation.
                match canonicalize_lenient(file) {
                    Ok(lenient) if !self.roots.contains(&lenient) => {
                        return Err(CacheError::RootViolation {
                            path: lenient,
                            roots: self.roots.clone(),
                        });
                    }
                    _ => {}
                }
                return Err(CacheError::Io {
                    path: file.to_path_buf(),
                    source,
                });
            }
        };
        if !self.roots.contains(&canonical) {
            return Err(CacheError::RootViolation {
                path: canonical,
                roots: self.roots.clone(),
            });
        }

        let key = invariant_path(&canonical);
        if let Some(doc) = self.entries.borrow().get(&key) {
            self.record(|s| s.reused += 1);
            return Ok(Rc::clone(doc));
        }

        let text = std::fs::read_to_string(&canonical).map_err(|source| CacheError::Io {
            path: canonical.clone(),
            source,
        })?;
        let doc = self
            .parser
            .parse(&text)
            .map_err(|source| CacheError::Parse {
                path: canonical.clone(),
                source,
            })?;
        tracing::debug!(path = %key, "parsed markdown");
        self.record(|s| s.parsed += 1);

        // First parse wins; an existing entry is never replaced.
        let doc = Rc::clone(
            self.entries
                .borrow_mut()
                .entry(key)
                .or_insert_with(|| Rc::new(doc)),
        );
        Ok(doc)
    }

    /// Number of cached documents.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.get()
    }

    fn record(&self, update: impl FnOnce(&mut CacheStats)) {
        let mut stats = self.stats.get();
        update(&mut stats);
        self.stats.set(stats);
    }
}

/// Summary of cache behavior for a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    /// Files read and parsed.
    pub parsed: u32,
    /// Lookups answered from the cache.
    pub reused: u32,
}

impl CacheStats {
    pub fn total(&self) -> u32 {
        self.parsed + self.reused
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reused > 0 {
            write!(
                f,
                "{} parsed, {} reused ({} lookups)",
                self.parsed,
                self.reused,
                self.total()
            )
        } else {
            write!(f, "{} parsed", self.parsed)
        }
    }
}
