//! Cross-references between markdown documents.
//!
//! A link such as `[setup](../setup.md#install)` inside `guides/intro.md` is
//! first turned into a root-relative query (`setup.md`, fragment `install`) by
//! [`reference_query`], then looked up under every markdown root by
//! [`Resolver::get_relative`].
//!
//! A query that matches nothing is not an error. It usually means the link
//! points at a raw file that should be served as-is (for example
//! `../public/LICENSE.md`), so the renderer leaves it untouched.

use crate::cache::{CacheError, DocumentCache};
use crate::document::Document;
use std::path::Path;
use std::rc::Rc;

/// Looks up documents by root-relative path through a [`DocumentCache`].
pub struct Resolver<'c, 'a> {
    cache: &'c DocumentCache<'a>,
}

impl<'c, 'a> Resolver<'c, 'a> {
    pub fn new(cache: &'c DocumentCache<'a>) -> Self {
        Self { cache }
    }

    /// Document at `relative_path` under the first root that has it.
    ///
    /// For each root in order, the candidate `root/relative_path` is
    /// canonicalized and accepted only if it exists, is a regular file, and
    /// is still under that same root. Candidates that escape their root are
    /// skipped, even if they happen to land inside another root. I/O errors
    /// while checking a candidate just skip that candidate.
    ///
    /// Returns `Ok(None)` when no root matches. Reading or parsing an
    /// accepted candidate can still fail, and that error is returned.
    pub fn get_relative(&self, relative_path: &str) -> Result<Option<Rc<Document>>, CacheError> {
        // A leading slash would make `join` discard the root.
        let relative = relative_path.trim_start_matches('/');
        if relative.is_empty() {
            return Ok(None);
        }

        for root in self.cache.roots().iter() {
            let Some(candidate) = candidate_in(root, relative) else {
                continue;
            };
            return self.cache.get(&candidate).map(Some);
        }
        tracing::debug!(query = relative, "reference not found under any root");
        Ok(None)
    }
}

/// Canonical path of `root/relative` if it is a file that stays inside `root`.
fn candidate_in(root: &Path, relative: &str) -> Option<std::path::PathBuf> {
    let candidate = match root.join(relative).canonicalize() {
        Ok(c) => c,
        Err(e) => {
            tracing::trace!(root = %root.display(), query = relative, error = %e, "no candidate");
            return None;
        }
    };
    let is_file = match candidate.metadata() {
        Ok(meta) => meta.is_file(),
        Err(e) => {
            tracing::trace!(path = %candidate.display(), error = %e, "candidate unreadable");
            return None;
        }
    };
    if !is_file {
        return None;
    }
    if !candidate.starts_with(root) {
        tracing::debug!(
            root = %root.display(),
            path = %candidate.display(),
            "candidate escapes its root"
        );
        return None;
    }
    Some(candidate)
}

/// A link destination turned into a root-relative lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceQuery {
    /// Forward-slash path relative to the markdown roots. May keep leading
    /// `..` segments; those never resolve.
    pub path: String,
    /// Text after `#`, if any.
    pub fragment: Option<String>,
}

/// Interpret a link destination found in the document at `source_path`.
///
/// Returns `None` for destinations that can't name another markdown document:
/// empty links, pure anchors, absolute paths, URLs with a scheme, and files
/// whose extension isn't `extension`. Relative destinations are joined with
/// the source document's directory and `.`/`..` are collapsed lexically.
///
/// - `("guides/intro.md", "./setup.md#install", "md")` → `guides/setup.md`, `install`
/// - `("guides/intro.md", "../index.md", "md")` → `index.md`
/// - `("intro.md", "../../outside.md", "md")` → `../../outside.md`
pub fn reference_query(source_path: &str, dest: &str, extension: &str) -> Option<ReferenceQuery> {
    if dest.is_empty() || dest.starts_with(['#', '/', '\\']) || has_scheme(dest) {
        return None;
    }

    let (path, fragment) = match dest.split_once('#') {
        Some((path, fragment)) => (path, Some(fragment.to_string())),
        None => (dest, None),
    };
    let path = path.split_once('?').map_or(path, |(p, _)| p);

    let is_markdown = path
        .rsplit_once('.')
        .is_some_and(|(stem, ext)| !stem.is_empty() && ext.eq_ignore_ascii_case(extension));
    if !is_markdown {
        return None;
    }

    let (source_dir, _) = crate::naming::split_relative(source_path);
    Some(ReferenceQuery {
        path: normalize_relative(source_dir, path),
        fragment: fragment.filter(|f| !f.is_empty()),
    })
}

/// `scheme:` prefix as in `https://`, `mailto:`, `data:`.
fn has_scheme(dest: &str) -> bool {
    dest.split_once(':').is_some_and(|(scheme, _)| {
        !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

/// Join `dir` and `path` and collapse `.` and `..` without touching the
/// filesystem. Leading `..` is preserved when there is nothing left to pop.
fn normalize_relative(dir: &str, path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in dir.split('/').chain(path.split(['/', '\\'])) {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|last| *last != "..") {
                    segments.pop();
                } else {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roots::RootSet;
    use crate::test_helpers::{CountingParser, write_tree};
    use tempfile::TempDir;

    // =========================================================================
    // get_relative
    // =========================================================================

    #[test]
    fn first_root_wins() {
        let tmp = TempDir::new().unwrap();
        write_tree(
            tmp.path(),
            &[("r1/shared.md", "# One\n"), ("r2/shared.md", "# Two\n")],
        );
        let roots = RootSet::resolve([tmp.path().join("r1"), tmp.path().join("r2")]);
        let parser = crate::parser::CmarkParser::default();
        let cache = DocumentCache::new(&parser, &roots);

        let doc = Resolver::new(&cache).get_relative("shared.md").unwrap().unwrap();
        assert_eq!(doc.title().as_deref(), Some("One"));
    }

    #[test]
    fn later_root_used_when_first_lacks_file() {
        let tmp = TempDir::new().unwrap();
        write_tree(
            tmp.path(),
            &[("r1/a.md", "# A\n"), ("r2/nav/menu.md", "# Menu\n")],
        );
        let roots = RootSet::resolve([tmp.path().join("r1"), tmp.path().join("r2")]);
        let parser = crate::parser::CmarkParser::default();
        let cache = DocumentCache::new(&parser, &roots);

        let doc = Resolver::new(&cache).get_relative("nav/menu.md").unwrap().unwrap();
        assert_eq!(doc.title().as_deref(), Some("Menu"));
    }

    #[test]
    fn escape_outside_all_roots_is_not_found() {
        let tmp = TempDir::new().unwrap();
        write_tree(
            tmp.path(),
            &[("project/content/a.md", "# A\n"), ("outside.md", "# Out\n")],
        );
        let roots = RootSet::resolve([tmp.path().join("project/content")]);
        let parser = CountingParser::default();
        let cache = DocumentCache::new(&parser, &roots);

        let found = Resolver::new(&cache).get_relative("../../outside.md").unwrap();
        assert!(found.is_none());
        assert_eq!(parser.calls(), 0);
    }

    #[test]
    fn escape_from_first_root_resolves_under_next_root() {
        // Under `a`, `../b/page.md` escapes the root and is skipped. Under `b`
        // it is `b/../b/page.md`, which stays inside `b`.
        let tmp = TempDir::new().unwrap();
        write_tree(tmp.path(), &[("a/x.md", "x"), ("b/page.md", "# B\n")]);
        let roots = RootSet::resolve([tmp.path().join("a"), tmp.path().join("b")]);
        let parser = CountingParser::default();
        let cache = DocumentCache::new(&parser, &roots);

        let found = Resolver::new(&cache).get_relative("../b/page.md").unwrap();
        assert_eq!(found.unwrap().title().as_deref(), Some("B"));
        assert_eq!(parser.calls(), 1);
    }

    #[test]
    fn escape_to_file_outside_every_root_is_not_found() {
        let tmp = TempDir::new().unwrap();
        write_tree(
            tmp.path(),
            &[("a/x.md", "x"), ("b/y.md", "y"), ("c/page.md", "# C\n")],
        );
        let roots = RootSet::resolve([tmp.path().join("a"), tmp.path().join("b")]);
        let parser = CountingParser::default();
        let cache = DocumentCache::new(&parser, &roots);

        let found = Resolver::new(&cache).get_relative("../c/page.md").unwrap();
        assert!(found.is_none());
        assert_eq!(parser.calls(), 0);
    }

    #[test]
    fn nested_root_miss_falls_through_to_outer_root() {
        let tmp = TempDir::new().unwrap();
        write_tree(
            tmp.path(),
            &[("outer/inner/x.md", "x"), ("outer/page.md", "# Outer\n")],
        );
        // inner listed first: "page.md" misses there, found under outer
        let roots = RootSet::resolve([tmp.path().join("outer/inner"), tmp.path().join("outer")]);
        let parser = crate::parser::CmarkParser::default();
        let cache = DocumentCache::new(&parser, &roots);

        let found = Resolver::new(&cache).get_relative("page.md").unwrap();
        assert_eq!(found.unwrap().title().as_deref(), Some("Outer"));
    }

    #[test]
    fn directory_is_not_a_match() {
        let tmp = TempDir::new().unwrap();
        write_tree(tmp.path(), &[("r/dir.md/inner.md", "x")]);
        let roots = RootSet::resolve([tmp.path().join("r")]);
        let parser = CountingParser::default();
        let cache = DocumentCache::new(&parser, &roots);

        assert!(Resolver::new(&cache).get_relative("dir.md").unwrap().is_none());
    }

    #[test]
    fn missing_file_is_not_found() {
        let tmp = TempDir::new().unwrap();
        write_tree(tmp.path(), &[("r/a.md", "x")]);
        let roots = RootSet::resolve([tmp.path().join("r")]);
        let parser = CountingParser::default();
        let cache = DocumentCache::new(&parser, &roots);

        assert!(Resolver::new(&cache).get_relative("b.md").unwrap().is_none());
    }

    #[test]
    fn leading_slash_is_root_relative() {
        let tmp = TempDir::new().unwrap();
        write_tree(tmp.path(), &[("r/a.md", "# A\n")]);
        let roots = RootSet::resolve([tmp.path().join("r")]);
        let parser = CountingParser::default();
        let cache = DocumentCache::new(&parser, &roots);

        assert!(Resolver::new(&cache).get_relative("/a.md").unwrap().is_some());
    }

    #[test]
    fn resolved_document_is_shared_with_cache() {
        let tmp = TempDir::new().unwrap();
        write_tree(tmp.path(), &[("r/a.md", "# A\n")]);
        let roots = RootSet::resolve([tmp.path().join("r")]);
        let parser = CountingParser::default();
        let cache = DocumentCache::new(&parser, &roots);

        let direct = cache.get(&tmp.path().join("r/a.md")).unwrap();
        let resolved = Resolver::new(&cache).get_relative("a.md").unwrap().unwrap();
        assert!(Rc::ptr_eq(&direct, &resolved));
        assert_eq!(parser.calls(), 1);
    }

    #[test]
    fn parse_failure_of_match_propagates() {
        let tmp = TempDir::new().unwrap();
        write_tree(tmp.path(), &[("r/bad.md", "+++\nnever closed\n")]);
        let roots = RootSet::resolve([tmp.path().join("r")]);
        let parser = crate::parser::CmarkParser::default();
        let cache = DocumentCache::new(&parser, &roots);

        let err = Resolver::new(&cache).get_relative("bad.md").unwrap_err();
        assert!(matches!(err, CacheError::Parse { .. }));
    }

    // =========================================================================
    // reference_query
    // =========================================================================

    fn query(source: &str, dest: &str) -> Option<ReferenceQuery> {
        reference_query(source, dest, "md")
    }

    #[test]
    fn sibling_reference() {
        assert_eq!(
            query("a.md", "./b.md"),
            Some(ReferenceQuery {
                path: "b.md".into(),
                fragment: None
            })
        );
    }

    #[test]
    fn nested_reference_with_fragment() {
        assert_eq!(
            query("guides/intro.md", "./setup.md#install"),
            Some(ReferenceQuery {
                path: "guides/setup.md".into(),
                fragment: Some("install".into())
            })
        );
    }

    #[test]
    fn parent_reference_collapses() {
        assert_eq!(query("guides/intro.md", "../index.md").unwrap().path, "index.md");
    }

    #[test]
    fn escaping_reference_keeps_leading_dotdot() {
        assert_eq!(
            query("intro.md", "../../outside.md").unwrap().path,
            "../../outside.md"
        );
    }

    #[test]
    fn non_document_destinations_skipped() {
        assert_eq!(query("a.md", ""), None);
        assert_eq!(query("a.md", "#section"), None);
        assert_eq!(query("a.md", "/abs/b.md"), None);
        assert_eq!(query("a.md", "https://example.com/b.md"), None);
        assert_eq!(query("a.md", "mailto:someone@example.com"), None);
        assert_eq!(query("a.md", "image.png"), None);
        assert_eq!(query("a.md", "folder/"), None);
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        assert_eq!(query("a.md", "B.MD").unwrap().path, "B.MD");
    }

    #[test]
    fn empty_fragment_dropped() {
        assert_eq!(query("a.md", "b.md#").unwrap().fragment, None);
    }
}
