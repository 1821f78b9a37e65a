//! Markdown root directories for one pipeline run.
//!
//! Every markdown file the pipeline discovers, caches, or links to must live
//! under one of these roots. Roots are canonicalized up front so containment
//! checks compare resolved paths (`..` and symlinks already applied).

use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Ordered, canonical, de-duplicated root directories.
///
/// Order matters for cross-reference resolution: when a relative path exists
/// under several roots, the first root wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootSet {
    roots: Vec<PathBuf>,
}

impl RootSet {
    /// Canonicalize `dirs` in order, dropping duplicates and anything that
    /// doesn't exist or isn't a directory.
    ///
    /// A missing root is not an error: a project simply may not have any
    /// markdown there (yet).
    pub fn resolve<I, P>(dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut roots: Vec<PathBuf> = Vec::new();
        for dir in dirs {
            let dir = dir.as_ref();
            let canonical = match dir.canonicalize() {
                Ok(c) if c.is_dir() => c,
                Ok(_) => {
                    tracing::debug!(root = %dir.display(), "skipping root: not a directory");
                    continue;
                }
                Err(e) => {
                    tracing::debug!(root = %dir.display(), error = %e, "skipping root");
                    continue;
                }
            };
            if !roots.contains(&canonical) {
                roots.push(canonical);
            }
        }
        Self { roots }
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.roots.iter().map(PathBuf::as_path)
    }

    /// Whether a canonical path lies under (or is) any root.
    pub fn contains(&self, canonical: &Path) -> bool {
        self.roots.iter().any(|root| canonical.starts_with(root))
    }

    /// First root containing `canonical`, with the path relative to it.
    pub fn root_of<'a>(&'a self, canonical: &'a Path) -> Option<(&'a Path, &'a Path)> {
        self.roots.iter().find_map(|root| {
            canonical
                .strip_prefix(root)
                .ok()
                .map(|rel| (root.as_path(), rel))
        })
    }
}

impl fmt::Display for RootSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let list: Vec<String> = self.roots.iter().map(|r| invariant_path(r)).collect();
        write!(f, "[{}]", list.join(", "))
    }
}

/// Canonical form of a path that may not exist.
///
/// The path is made absolute and `.`/`..` are collapsed lexically, then the
/// deepest existing ancestor is canonicalized and the rest appended. For an
/// existing path this equals [`Path::canonicalize`].
pub fn canonicalize_lenient(path: &Path) -> std::io::Result<PathBuf> {
    let absolute = normalize_path(&std::path::absolute(path)?);
    for ancestor in absolute.ancestors() {
        if let Ok(canonical) = ancestor.canonicalize() {
            let rest = absolute.strip_prefix(ancestor).unwrap_or(Path::new(""));
            return Ok(if rest.as_os_str().is_empty() {
                canonical
            } else {
                canonical.join(rest)
            });
        }
    }
    Ok(absolute)
}

/// Collapse `.` and `..` components without touching the filesystem.
/// Preserves leading `..` when there is nothing left to pop.
fn normalize_path(path: &Path) -> PathBuf {
    let mut components: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match components.last() {
                Some(Component::Normal(_)) => {
                    components.pop();
                }
                // `/..` is `/`
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => components.push(component),
            },
            other => components.push(other),
        }
    }
    components.iter().collect()
}

/// A path rendered with `/` separators regardless of platform.
pub fn invariant_path(path: &Path) -> String {
    let s = path.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        s.into_owned()
    } else {
        s.replace(std::path::MAIN_SEPARATOR, "/")
    }
}
