//! Conversion driver: markdown roots in, generated page sources out.
//!
//! One run of [`convert`] does the whole job:
//!
//! 1. Resolve the configured markdown directories into a [`RootSet`].
//! 2. Walk every root, resource roots first and generated directories after,
//!    and turn each markdown file into a [`ConversionUnit`].
//! 3. For each unit, fetch the tree through a run-scoped [`DocumentCache`],
//!    render it with links resolved through a [`Resolver`] over the same
//!    cache, and write the result.
//!
//! ```text
//! content/guides/intro.md
//!   relative path  guides/intro.md
//!   package        com.example.pages.guides   (base "com.example.pages", separator ".")
//!   function       Intro
//!   route          /guides/intro
//!   output         <output dir>/guides/Intro.rs
//! ```
//!
//! A document linked from many pages is still parsed once: the page that
//! converts it and every page that links to it share one cached tree.
//!
//! Any error aborts the run. Pages already written stay on disk, and the page
//! that failed never leaves a partial file behind because every write goes
//! through a temporary file in the destination directory.
//!
//! [`check`] runs steps 1 and 2, parses everything, and lists internal links
//! that resolve to nothing, without rendering or writing.

use crate::cache::{CacheError, CacheStats, DocumentCache};
use crate::config::PipelineConfig;
use crate::naming;
use crate::parser::MarkdownParser;
use crate::render::{PageRenderer, RenderContext, RenderError, Reporter};
use crate::resolve::{Resolver, reference_query};
use crate::roots::{RootSet, invariant_path};
use serde::Serialize;
use std::collections::HashSet;
use std::collections::hash_map::{Entry, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("failed to render {}: {source}", path.display())]
    Render {
        path: PathBuf,
        #[source]
        source: RenderError,
    },
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to walk markdown roots: {0}")]
    Walk(#[from] walkdir::Error),
    #[error(
        "{} and {} would both be written to {}",
        first.display(),
        second.display(),
        output.display()
    )]
    OutputCollision {
        output: PathBuf,
        first: PathBuf,
        second: PathBuf,
    },
}

/// One markdown file and everything derived from its location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionUnit {
    /// Path as found while walking its root.
    pub source: PathBuf,
    /// Forward-slash path relative to the root it was found under.
    pub relative_path: String,
    pub output_path: PathBuf,
    pub package: String,
    pub function_name: String,
    pub route: String,
}

/// What a conversion run produced.
#[derive(Debug, Serialize)]
pub struct ConvertReport {
    pub pages: Vec<PageReport>,
    pub cache: CacheStats,
}

#[derive(Debug, Serialize)]
pub struct PageReport {
    pub source: String,
    pub output: PathBuf,
    pub package: String,
    pub function_name: String,
    pub route: String,
}

/// Result of [`check`].
#[derive(Debug, Serialize)]
pub struct CheckReport {
    /// Number of markdown documents found and parsed.
    pub documents: usize,
    pub dangling: Vec<DanglingReference>,
    pub cache: CacheStats,
}

/// An internal markdown link that resolves under no root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DanglingReference {
    /// Relative path of the linking document.
    pub source: String,
    /// Link destination as written.
    pub target: String,
}

/// Convert every markdown file under the configured roots.
pub fn convert(
    config: &PipelineConfig,
    project_dir: &Path,
    parser: &dyn MarkdownParser,
    renderer: &dyn PageRenderer,
    reporter: &dyn Reporter,
) -> Result<ConvertReport, ConvertError> {
    let paths = config.paths(project_dir);
    let roots = RootSet::resolve(&paths.markdown_dirs);
    if roots.is_empty() {
        tracing::warn!("none of the markdown roots exist, nothing to convert");
    }
    let units = discover(&roots, config, &paths.output_dir)?;
    tracing::debug!(roots = %roots, files = units.len(), "discovered markdown");

    let cache = DocumentCache::new(parser, &roots);
    let resolver = Resolver::new(&cache);
    let resolve = |query: &str| resolver.get_relative(query);

    let mut pages = Vec::with_capacity(units.len());
    for unit in &units {
        let doc = cache.get(&unit.source)?;
        let ctx = RenderContext {
            resolve: &resolve,
            default_root: config.render.default_root(),
            imports: &config.render.imports,
            source_path: &unit.relative_path,
            handlers: &config.handlers,
            markdown_extension: &config.markdown.extension,
            package: &unit.package,
            function_name: &unit.function_name,
            reporter,
        };
        let text = renderer.render(&doc, &ctx).map_err(|e| match e {
            RenderError::Resolve(cache_err) => ConvertError::Cache(cache_err),
            other => ConvertError::Render {
                path: unit.source.clone(),
                source: other,
            },
        })?;
        write_atomic(&unit.output_path, &text)?;
        tracing::info!(
            source = %unit.relative_path,
            output = %unit.output_path.display(),
            "converted"
        );

        pages.push(PageReport {
            source: unit.relative_path.clone(),
            output: unit.output_path.clone(),
            package: unit.package.clone(),
            function_name: unit.function_name.clone(),
            route: unit.route.clone(),
        });
    }

    Ok(ConvertReport {
        pages,
        cache: cache.stats(),
    })
}

/// Parse every markdown file and list internal links that resolve to nothing.
///
/// Dangling links are reported, not treated as errors. Read and parse
/// failures still fail the check.
pub fn check(
    config: &PipelineConfig,
    project_dir: &Path,
    parser: &dyn MarkdownParser,
) -> Result<CheckReport, ConvertError> {
    let paths = config.paths(project_dir);
    let roots = RootSet::resolve(&paths.markdown_dirs);
    let units = discover(&roots, config, &paths.output_dir)?;

    let cache = DocumentCache::new(parser, &roots);
    let resolver = Resolver::new(&cache);
    let mut dangling = Vec::new();
    for unit in &units {
        let doc = cache.get(&unit.source)?;
        for dest in doc.links() {
            let Some(query) = reference_query(&unit.relative_path, dest, &config.markdown.extension)
            else {
                continue;
            };
            if resolver.get_relative(&query.path)?.is_none() {
                dangling.push(DanglingReference {
                    source: unit.relative_path.clone(),
                    target: dest.to_string(),
                });
            }
        }
    }

    Ok(CheckReport {
        documents: units.len(),
        dangling,
        cache: cache.stats(),
    })
}

/// Every markdown file under `roots`, in root order then file-name order.
///
/// A file reachable through several roots (nested roots, symlinks) is listed
/// once, relative to the first root that contains its resolved location. Two different files
/// that map to the same output path fail with
/// [`ConvertError::OutputCollision`].
pub fn discover(
    roots: &RootSet,
    config: &PipelineConfig,
    output_dir: &Path,
) -> Result<Vec<ConversionUnit>, ConvertError> {
    let mut seen = HashSet::new();
    let mut outputs: HashMap<PathBuf, PathBuf> = HashMap::new();
    let mut units = Vec::new();

    for root in roots.iter() {
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() || !has_extension(path, &config.markdown.extension) {
                continue;
            }
            let canonical = path.canonicalize().map_err(|source| ConvertError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            if seen.contains(&canonical) {
                continue;
            }
            // Relative to the root owning the resolved file; a symlink that
            // leaves every root keeps its walked location.
            let relative = match roots.root_of(&canonical) {
                Some((_, relative)) => relative,
                None => match path.strip_prefix(root) {
                    Ok(relative) => relative,
                    Err(_) => continue,
                },
            };
            let unit = conversion_unit(
                config,
                output_dir,
                path.to_path_buf(),
                &invariant_path(relative),
            );
            match outputs.entry(unit.output_path.clone()) {
                Entry::Occupied(first) => {
                    return Err(ConvertError::OutputCollision {
                        output: unit.output_path,
                        first: first.get().clone(),
                        second: unit.source,
                    });
                }
                Entry::Vacant(slot) => {
                    slot.insert(unit.source.clone());
                }
            }
            seen.insert(canonical);
            units.push(unit);
        }
    }
    Ok(units)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(extension))
}

fn conversion_unit(
    config: &PipelineConfig,
    output_dir: &Path,
    source: PathBuf,
    relative_path: &str,
) -> ConversionUnit {
    let (dir, file) = naming::split_relative(relative_path);
    let stem = file.rsplit_once('.').map_or(file, |(stem, _)| stem);
    let function_name = naming::function_name(stem, config.output.function_names);
    let package = naming::absolute_package(
        &config.output.base_package(),
        &naming::package_parts(dir),
        &config.output.separator,
    );

    let mut output_path = output_dir.to_path_buf();
    output_path.extend(dir.split('/').filter(|p| !p.is_empty()));
    output_path.push(format!("{function_name}.{}", config.output.extension));

    ConversionUnit {
        source,
        relative_path: relative_path.to_string(),
        output_path,
        package,
        function_name,
        route: naming::route_for(relative_path),
    }
}

/// Write through a temporary file in the destination directory, then rename.
///
/// The file ends up with the mode of the target it replaces, or `0644` for a
/// new file.
fn write_atomic(path: &Path, contents: &str) -> Result<(), ConvertError> {
    let io_err = |source: std::io::Error| ConvertError::Io {
        path: path.to_path_buf(),
        source,
    };
    let parent = path.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(parent).map_err(io_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(io_err)?;
    tmp.write_all(contents.as_bytes()).map_err(io_err)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(path).map_or(0o644, |m| m.permissions().mode() & 0o7777);
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(mode))
            .map_err(io_err)?;
    }
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}
