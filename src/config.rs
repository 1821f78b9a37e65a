//! Pipeline configuration module.
//!
//! Handles loading, validating, and merging `mdpages.toml`. User values are
//! layered on top of stock defaults, so a config file only needs the keys it
//! wants to change.
//!
//! ## Config File Location
//!
//! Place `mdpages.toml` in the project directory. Every relative path in it is
//! resolved against that directory:
//!
//! ```text
//! project/
//! ├── mdpages.toml
//! ├── content/                 # [markdown] roots
//! │   ├── index.md
//! │   └── guides/
//! │       └── intro.md
//! └── target/generated/pages/  # [output] dir
//!     ├── Index.rs
//!     └── guides/
//!         └── Intro.rs
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [markdown]
//! roots = ["content"]        # Directories scanned for markdown (in priority order)
//! generated = []             # Directories holding markdown produced by other tools
//! extension = "md"           # Markdown file extension
//!
//! [output]
//! dir = "target/generated/pages"
//! extension = "rs"
//! group = ""                 # Prefix for packages that start with "."
//! package = "pages"          # Base package of generated pages
//! separator = "::"           # Namespace separator replacing "/"
//! function_names = "capitalize"   # or "title-camel"
//!
//! [render]
//! default_root = ""          # Function wrapping every page body ("" = none)
//! imports = []               # Extra `use` lines spliced into every page
//!
//! [features]
//! tables = true
//! strikethrough = true
//! task_lists = true
//! footnotes = false
//! front_matter = true
//!
//! [handlers]
//! html = "allow"             # allow | escape | reject
//! heading_anchors = true
//!
//! [handlers.classes]
//! h1 = "title"               # CSS class per generated element
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::naming::FunctionNames;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the config file looked up in the project directory.
pub const CONFIG_FILENAME: &str = "mdpages.toml";

/// Element names that accept a CSS class through `[handlers.classes]`.
pub const CLASSABLE_ELEMENTS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "pre", "code", "ul", "ol", "li", "em",
    "strong", "del", "a", "img", "table", "thead", "tr", "th", "td", "hr",
];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("failed to serialize defaults: {0}")]
    Defaults(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Pipeline configuration loaded from `mdpages.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Where markdown comes from.
    pub markdown: MarkdownConfig,
    /// Where generated pages go and how they are named.
    pub output: OutputConfig,
    /// Values passed through to the renderer.
    pub render: RenderConfig,
    /// Markdown syntax extensions.
    pub features: FeaturesConfig,
    /// Per-element rendering behavior.
    pub handlers: HandlersConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarkdownConfig {
    /// Resource directories, in resolution priority order.
    pub roots: Vec<String>,
    /// Directories of markdown generated upstream; searched after `roots`.
    pub generated: Vec<String>,
    /// File extension (without the dot) identifying markdown files.
    pub extension: String,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            roots: vec!["content".to_string()],
            generated: Vec::new(),
            extension: "md".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Generated source root.
    pub dir: String,
    /// Extension of generated files.
    pub extension: String,
    /// Group used to qualify a package that starts with `.`.
    pub group: String,
    /// Base package of every generated page.
    pub package: String,
    /// Namespace separator that replaces directory separators.
    pub separator: String,
    /// How file stems become function names.
    pub function_names: FunctionNames,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: "target/generated/pages".to_string(),
            extension: "rs".to_string(),
            group: String::new(),
            package: "pages".to_string(),
            separator: "::".to_string(),
            function_names: FunctionNames::Capitalize,
        }
    }
}

impl OutputConfig {
    /// Base package after resolving a group-relative (`.pages`) package.
    pub fn base_package(&self) -> String {
        crate::naming::prefix_qualified_package(&self.group, &self.package)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Function wrapping each page body. Blank means no wrapper.
    pub default_root: String,
    /// Paths spliced into every generated file as `use` lines.
    pub imports: Vec<String>,
}

impl RenderConfig {
    /// The default root, or `None` when blank.
    pub fn default_root(&self) -> Option<&str> {
        Some(self.default_root.trim()).filter(|r| !r.is_empty())
    }
}

/// Markdown extensions enabled in the parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeaturesConfig {
    pub tables: bool,
    pub strikethrough: bool,
    pub task_lists: bool,
    pub footnotes: bool,
    /// Parse a leading `+++` fenced TOML block as front matter.
    pub front_matter: bool,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            tables: true,
            strikethrough: true,
            task_lists: true,
            footnotes: false,
            front_matter: true,
        }
    }
}

/// What the renderer does with raw HTML found in markdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HtmlPolicy {
    /// Emit it verbatim.
    #[default]
    Allow,
    /// Emit it as escaped text.
    Escape,
    /// Fail the conversion.
    Reject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HandlersConfig {
    pub html: HtmlPolicy,
    /// Give every heading an `id` derived from its text.
    pub heading_anchors: bool,
    /// CSS class per element name (see [`CLASSABLE_ELEMENTS`]).
    pub classes: BTreeMap<String, String>,
}

impl Default for HandlersConfig {
    fn default() -> Self {
        Self {
            html: HtmlPolicy::Allow,
            heading_anchors: true,
            classes: BTreeMap::new(),
        }
    }
}

impl HandlersConfig {
    /// Configured class for an element, if any.
    pub fn class(&self, element: &str) -> Option<&str> {
        self.classes.get(element).map(String::as_str)
    }
}

/// Absolute locations derived from a config and its project directory.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    /// Resource roots followed by generated-markdown directories.
    pub markdown_dirs: Vec<PathBuf>,
    /// Generated source root.
    pub output_dir: PathBuf,
}

impl PipelineConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.markdown.roots.is_empty() && self.markdown.generated.is_empty() {
            return Err(ConfigError::Validation(
                "markdown.roots must not be empty".into(),
            ));
        }
        for (key, ext) in [
            ("markdown.extension", &self.markdown.extension),
            ("output.extension", &self.output.extension),
        ] {
            if ext.is_empty() || ext.contains(['.', '/', '\\']) {
                return Err(ConfigError::Validation(format!(
                    "{key} must be a bare extension like \"md\", got {ext:?}"
                )));
            }
        }
        if self.output.separator.is_empty() {
            return Err(ConfigError::Validation(
                "output.separator must not be empty".into(),
            ));
        }
        if self.output.dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "output.dir must not be empty".into(),
            ));
        }
        if let Some(unknown) = self
            .handlers
            .classes
            .keys()
            .find(|k| !CLASSABLE_ELEMENTS.contains(&k.as_str()))
        {
            return Err(ConfigError::Validation(format!(
                "handlers.classes: unknown element {unknown:?}"
            )));
        }
        Ok(())
    }

    /// Resolve configured directories against the project directory.
    pub fn paths(&self, project_dir: &Path) -> ProjectPaths {
        let markdown_dirs = self
            .markdown
            .roots
            .iter()
            .chain(&self.markdown.generated)
            .map(|dir| project_dir.join(dir))
            .collect();
        ProjectPaths {
            markdown_dirs,
            output_dir: project_dir.join(&self.output.dir),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// [`PipelineConfig::default`] as a TOML table, the bottom layer every
/// `mdpages.toml` is merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(PipelineConfig::default())?)
}

/// Lay `overlay` over `base`.
///
/// Tables meet key by key, so `[output] dir = "gen"` leaves the rest of
/// `[output]` at its default. Anything else in `overlay`, arrays included,
/// replaces the value under it.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            let merged = overlay.into_iter().fold(base, |mut table, (key, value)| {
                let value = match table.remove(&key) {
                    Some(under) => merge_toml(under, value),
                    None => value,
                };
                table.insert(key, value);
                table
            });
            toml::Value::Table(merged)
        }
        (_, overlay) => overlay,
    }
}

/// The project's `mdpages.toml`, parsed but not yet checked against
/// [`PipelineConfig`]. `None` when the project has no config file.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let content = match fs::read_to_string(dir.join(CONFIG_FILENAME)) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(toml::from_str(&content)?))
}

/// Turn the stock table plus the project's table into a checked
/// [`PipelineConfig`]. Unknown keys and invalid values are errors.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<PipelineConfig, ConfigError> {
    let value = match overlay {
        Some(user) => merge_toml(base, user),
        None => base,
    };
    let config: PipelineConfig = value.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Configuration for the project in `project_dir`.
pub fn load_config(project_dir: &Path) -> Result<PipelineConfig, ConfigError> {
    let user = load_raw_config(project_dir)?;
    if user.is_none() {
        tracing::debug!(dir = %project_dir.display(), "no {CONFIG_FILENAME}, using defaults");
    }
    resolve_config(stock_defaults_value()?, user)
}

/// Returns a fully-commented stock `mdpages.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# mdpages configuration
# =====================
#
# Every option is shown with its default value. Delete what you don't need;
# anything left out falls back to the value below.

[markdown]
# Directories scanned for markdown files, relative to this file.
# When a cross-reference matches under several roots, the first listed wins.
roots = ["content"]
# Directories holding markdown produced by other tools. Searched after roots.
generated = []
# Extension identifying markdown files.
extension = "md"

[output]
# Root directory for generated sources. A page at content/guides/intro.md is
# written to <dir>/guides/Intro.<extension>.
dir = "target/generated/pages"
extension = "rs"
# Packages starting with "." are prefixed with this group.
group = ""
# Base package of every generated page. Subdirectories are appended.
package = "pages"
# Namespace separator replacing "/" in package names.
separator = "::"
# "capitalize": intro.md -> Intro, getting-started.md -> Getting_started
# "title-camel": getting-started.md -> GettingStarted
function_names = "capitalize"

[render]
# Function wrapping every page body. Empty means no wrapper.
# A page can override it with `root = "..."` in its front matter.
default_root = ""
# Paths added as `use` lines to every generated file.
imports = []

[features]
tables = true
strikethrough = true
task_lists = true
footnotes = false
# Parse a leading +++ fenced TOML block as page front matter.
front_matter = true

[handlers]
# Raw HTML in markdown: "allow", "escape", or "reject" (fails the build).
html = "allow"
# Give headings an id derived from their text.
heading_anchors = true

# CSS class per generated element, e.g. h1 = "title".
[handlers.classes]
"##
}
