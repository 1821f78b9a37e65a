//! Shared test utilities for the mdpages test suite.
//!
//! Provides temp project builders, a parser that counts its calls, and a
//! reporter that records diagnostics instead of logging them.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_tree(tmp.path(), &[("content/a.md", "# A\n")]);
//!
//! let parser = CountingParser::default();
//! let roots = RootSet::resolve([tmp.path().join("content")]);
//! let cache = DocumentCache::new(&parser, &roots);
//! cache.get(&tmp.path().join("content/a.md")).unwrap();
//! assert_eq!(parser.calls(), 1);
//! ```

use std::cell::{Cell, RefCell};
use std::path::Path;

use crate::config::PipelineConfig;
use crate::document::Document;
use crate::parser::{CmarkParser, MarkdownParser, ParseError};
use crate::render::Reporter;

// =========================================================================
// Fixture setup
// =========================================================================

/// Write `(relative path, contents)` pairs under `root`, creating directories.
pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (rel, contents) in files {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, contents).unwrap();
    }
}

/// Config for a temp project: content under `content/`, output under `gen/`.
pub fn fixture_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.output.dir = "gen".to_string();
    config
}

/// Read a generated file relative to `root`.
pub fn read(root: &Path, rel: &str) -> String {
    std::fs::read_to_string(root.join(rel))
        .unwrap_or_else(|e| panic!("failed to read {rel}: {e}"))
}

// =========================================================================
// Collaborators
// =========================================================================

/// [`CmarkParser`] that counts how many times it was asked to parse.
#[derive(Default)]
pub struct CountingParser {
    inner: CmarkParser,
    calls: Cell<usize>,
}

impl CountingParser {
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl MarkdownParser for CountingParser {
    fn parse(&self, text: &str) -> Result<Document, ParseError> {
        self.calls.set(self.calls.get() + 1);
        self.inner.parse(text)
    }
}

/// Reporter that keeps every diagnostic as `"<source>: <message>"`.
#[derive(Default)]
pub struct CollectingReporter {
    warnings: RefCell<Vec<String>>,
    infos: RefCell<Vec<String>>,
}

impl CollectingReporter {
    pub fn warnings(&self) -> Vec<String> {
        self.warnings.borrow().clone()
    }

    pub fn infos(&self) -> Vec<String> {
        self.infos.borrow().clone()
    }
}

impl Reporter for CollectingReporter {
    fn warn(&self, source_path: &str, message: &str) {
        self.warnings
            .borrow_mut()
            .push(format!("{source_path}: {message}"));
    }

    fn info(&self, source_path: &str, message: &str) {
        self.infos
            .borrow_mut()
            .push(format!("{source_path}: {message}"));
    }
}
