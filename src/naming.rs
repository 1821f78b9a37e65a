//! Centralized naming rules for generated pages.
//!
//! Every Markdown file maps to three names derived purely from its path
//! relative to the root it was found under:
//!
//! - **Package**: the configured base package followed by the file's directory
//!   parts, joined with the configured separator.
//!   `guides/intro.md` + `com.example.pages` → `com.example.pages.guides`
//! - **Function name**: the file stem with its first letter capitalized
//!   (or converted to TitleCamelCase, see [`FunctionNames`]).
//!   `intro.md` → `Intro`
//! - **Route**: the kebab-case URL of the page.
//!   `guides/GettingStarted.md` → `/guides/getting-started`
//!
//! The case conversion helpers are shared by all three.

use serde::{Deserialize, Serialize};

/// Rule used to turn a Markdown file stem into a generated function name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FunctionNames {
    /// Uppercase the first letter only: `getting-started` → `Getting_started`.
    #[default]
    Capitalize,
    /// Kebab-case to TitleCamelCase: `getting-started` → `GettingStarted`.
    TitleCamel,
}

/// Uppercase the first character, leaving the rest untouched.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `ExampleText` → `example-text`, `ABCExample` → `abc-example`.
///
/// A dash is inserted before an uppercase letter that follows a lowercase
/// letter or digit, and before the last capital of an acronym run that is
/// followed by a lowercase letter.
pub fn title_camel_case_to_kebab_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower)
            {
                out.push('-');
            }
        }
        out.extend(c.to_lowercase());
    }
    out
}

/// `exampleText` → `example-text`. Same rules as the TitleCamelCase variant.
pub fn camel_case_to_kebab_case(s: &str) -> String {
    title_camel_case_to_kebab_case(s)
}

/// `example-text` → `ExampleText`.
pub fn kebab_case_to_title_camel_case(s: &str) -> String {
    s.split('-').filter(|p| !p.is_empty()).map(capitalize).collect()
}

/// `example-text` → `exampleText`.
pub fn kebab_case_to_camel_case(s: &str) -> String {
    let mut parts = s.split('-').filter(|p| !p.is_empty());
    let Some(first) = parts.next() else {
        return String::new();
    };
    std::iter::once(first.to_string())
        .chain(parts.map(capitalize))
        .collect()
}

/// Strict and reserved Rust keywords, plus `_`.
const KEYWORDS: &[&str] = &[
    "_", "abstract", "as", "async", "await", "become", "box", "break", "const", "continue",
    "crate", "do", "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if",
    "impl", "in", "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv",
    "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true", "try",
    "type", "typeof", "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

/// Replace characters that can't appear in an identifier with `_`, and
/// prefix `_` when the result would start with a digit or is a keyword.
pub fn sanitize_identifier(s: &str) -> String {
    let mut out: String = s
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.is_empty()
        || out.starts_with(|c: char| c.is_ascii_digit())
        || KEYWORDS.contains(&out.as_str())
    {
        out.insert(0, '_');
    }
    out
}

/// Generated function (and output file) name for a Markdown file stem.
pub fn function_name(stem: &str, rule: FunctionNames) -> String {
    let raw = match rule {
        FunctionNames::Capitalize => capitalize(stem),
        FunctionNames::TitleCamel => kebab_case_to_title_camel_case(stem),
    };
    sanitize_identifier(&raw)
}

/// Package parts for a forward-slash relative *directory* (`""` for the root).
///
/// `guides/getting-started` → `["guides", "getting_started"]`
pub fn package_parts(relative_dir: &str) -> Vec<String> {
    relative_dir
        .split('/')
        .filter(|p| !p.is_empty())
        .map(sanitize_identifier)
        .collect()
}

/// Join a base package with directory parts using `separator`.
pub fn absolute_package(base: &str, parts: &[String], separator: &str) -> String {
    std::iter::once(base)
        .chain(parts.iter().map(String::as_str))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

/// Resolve a package that may be relative to the project group.
///
/// A package starting with `.` is appended to `group`; anything else is
/// already fully qualified.
/// - `("com.example", ".pages")` → `com.example.pages`
/// - `("com.example", "org.other.pages")` → `org.other.pages`
pub fn prefix_qualified_package(group: &str, package: &str) -> String {
    match package.strip_prefix('.') {
        Some(rest) if group.is_empty() => rest.to_string(),
        Some(rest) => format!("{group}.{rest}"),
        None => package.to_string(),
    }
}

/// Route of the page generated from a forward-slash relative Markdown path.
///
/// Directories are kept as written; the stem is normalized through camelCase
/// so `getting-started.md`, `gettingStarted.md` and `GettingStarted.md` all
/// map to `getting-started`.
pub fn route_for(relative_path: &str) -> String {
    let (dir, file) = split_relative(relative_path);
    let stem = file.rsplit_once('.').map_or(file, |(stem, _)| stem);
    let slug = camel_case_to_kebab_case(&kebab_case_to_camel_case(stem));
    if dir.is_empty() {
        format!("/{slug}")
    } else {
        format!("/{dir}/{slug}")
    }
}

/// Split a forward-slash relative path into `(directory, file name)`.
pub fn split_relative(relative_path: &str) -> (&str, &str) {
    relative_path.rsplit_once('/').unwrap_or(("", relative_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_camel_case_to_kebab_case_cases() {
        let cases = [
            ("ExampleText", "example-text"),
            ("ExampleTextPartTwo", "example-text-part-two"),
            ("ExampleABC", "example-abc"),
            ("ABCExample", "abc-example"),
            ("Pascal", "pascal"),
            ("ALLCAPS", "allcaps"),
            ("lowercase", "lowercase"),
        ];
        for (before, after) in cases {
            assert_eq!(title_camel_case_to_kebab_case(before), after, "input {before}");
        }
    }

    #[test]
    fn kebab_case_to_title_camel_case_cases() {
        let cases = [
            ("example-text", "ExampleText"),
            ("example-text-part-two", "ExampleTextPartTwo"),
            ("pascal", "Pascal"),
        ];
        for (before, after) in cases {
            assert_eq!(kebab_case_to_title_camel_case(before), after, "input {before}");
        }
    }

    #[test]
    fn camel_case_to_kebab_case_cases() {
        let cases = [
            ("exampleText", "example-text"),
            ("exampleTextPartTwo", "example-text-part-two"),
            ("exampleABC", "example-abc"),
            ("lowercase", "lowercase"),
        ];
        for (before, after) in cases {
            assert_eq!(camel_case_to_kebab_case(before), after, "input {before}");
        }
    }

    #[test]
    fn kebab_case_to_camel_case_cases() {
        let cases = [
            ("example-text", "exampleText"),
            ("example-text-part-two", "exampleTextPartTwo"),
            ("lowercase", "lowercase"),
        ];
        for (before, after) in cases {
            assert_eq!(kebab_case_to_camel_case(before), after, "input {before}");
        }
    }

    #[test]
    fn capitalize_first_letter_only() {
        assert_eq!(capitalize("intro"), "Intro");
        assert_eq!(capitalize("getting-started"), "Getting-started");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn function_name_capitalize_rule() {
        assert_eq!(function_name("intro", FunctionNames::Capitalize), "Intro");
        assert_eq!(
            function_name("getting-started", FunctionNames::Capitalize),
            "Getting_started"
        );
    }

    #[test]
    fn function_name_title_camel_rule() {
        assert_eq!(
            function_name("getting-started", FunctionNames::TitleCamel),
            "GettingStarted"
        );
    }

    #[test]
    fn function_name_leading_digit_is_prefixed() {
        assert_eq!(function_name("404", FunctionNames::Capitalize), "_404");
    }

    #[test]
    fn keywords_are_prefixed() {
        assert_eq!(function_name("self", FunctionNames::Capitalize), "_Self");
        assert_eq!(function_name("self", FunctionNames::TitleCamel), "_Self");
        assert_eq!(function_name("selfie", FunctionNames::Capitalize), "Selfie");
        assert_eq!(package_parts("type/fn/guides"), vec!["_type", "_fn", "guides"]);
        assert_eq!(sanitize_identifier(""), "_");
        assert_eq!(sanitize_identifier("_"), "__");
    }

    #[test]
    fn package_parts_sanitized() {
        assert_eq!(package_parts(""), Vec::<String>::new());
        assert_eq!(package_parts("guides"), vec!["guides"]);
        assert_eq!(
            package_parts("guides/getting-started"),
            vec!["guides", "getting_started"]
        );
    }

    #[test]
    fn absolute_package_joins_with_separator() {
        let parts = vec!["guides".to_string()];
        assert_eq!(
            absolute_package("com.example.pages", &parts, "."),
            "com.example.pages.guides"
        );
        assert_eq!(absolute_package("pages", &parts, "::"), "pages::guides");
        assert_eq!(absolute_package("pages", &[], "::"), "pages");
        assert_eq!(absolute_package("", &parts, "::"), "guides");
    }

    #[test]
    fn prefix_qualified_package_cases() {
        assert_eq!(
            prefix_qualified_package("com.example", ".pages"),
            "com.example.pages"
        );
        assert_eq!(
            prefix_qualified_package("com.example", "org.other.pages"),
            "org.other.pages"
        );
        assert_eq!(prefix_qualified_package("", ".pages"), "pages");
    }

    #[test]
    fn route_for_paths() {
        assert_eq!(route_for("intro.md"), "/intro");
        assert_eq!(route_for("guides/intro.md"), "/guides/intro");
        assert_eq!(route_for("guides/GettingStarted.md"), "/guides/getting-started");
        assert_eq!(route_for("guides/getting-started.md"), "/guides/getting-started");
        assert_eq!(route_for("guides/gettingStarted.md"), "/guides/getting-started");
    }
}
