//! CLI output formatting for `convert` and `check`.
//!
//! Each page leads with its positional index and source path, with the names
//! derived for it shown as indented context lines.
//!
//! # Output Format
//!
//! ## Convert
//!
//! ```text
//! Pages
//! 001 guides/intro.md → gen/guides/Intro.rs
//!     Package: pages::guides
//!     Function: Intro
//!     Route: /guides/intro
//!
//! Converted 1 page
//! Cache: 2 parsed, 1 reused (3 lookups)
//! ```
//!
//! ## Check
//!
//! ```text
//! Checked 2 documents
//! Dangling references
//!     a.md → gone.md
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::convert::{CheckReport, ConvertReport};
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `1 page`, `2 pages`.
fn count(n: usize, singular: &str, plural: &str) -> String {
    if n == 1 {
        format!("{n} {singular}")
    } else {
        format!("{n} {plural}")
    }
}

/// `path` relative to `base` when it lies under it, for shorter output.
fn display_path(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .display()
        .to_string()
}

// ============================================================================
// Convert
// ============================================================================

/// Format the result of a conversion run.
pub fn format_convert_output(report: &ConvertReport, project_dir: &Path) -> Vec<String> {
    let mut lines = Vec::new();

    if !report.pages.is_empty() {
        lines.push("Pages".to_string());
        for (i, page) in report.pages.iter().enumerate() {
            lines.push(format!(
                "{} {} → {}",
                format_index(i + 1),
                page.source,
                display_path(&page.output, project_dir)
            ));
            lines.push(format!("{}Package: {}", indent(1), page.package));
            lines.push(format!("{}Function: {}", indent(1), page.function_name));
            lines.push(format!("{}Route: {}", indent(1), page.route));
        }
        lines.push(String::new());
    }

    lines.push(format!(
        "Converted {}",
        count(report.pages.len(), "page", "pages")
    ));
    lines.push(format!("Cache: {}", report.cache));
    lines
}

pub fn print_convert_output(report: &ConvertReport, project_dir: &Path) {
    for line in format_convert_output(report, project_dir) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// Format the result of a link check.
pub fn format_check_output(report: &CheckReport) -> Vec<String> {
    let mut lines = vec![format!(
        "Checked {}",
        count(report.documents, "document", "documents")
    )];

    if report.dangling.is_empty() {
        lines.push("No dangling references".to_string());
    } else {
        lines.push("Dangling references".to_string());
        for dangling in &report.dangling {
            lines.push(format!(
                "{}{} → {}",
                indent(1),
                dangling.source,
                dangling.target
            ));
        }
    }
    lines
}

pub fn print_check_output(report: &CheckReport) {
    for line in format_check_output(report) {
        println!("{}", line);
    }
}
