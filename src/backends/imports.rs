//! Import extraction and resolution
//!
//! Pulls literal module specifiers out of JavaScript/TypeScript source with
//! a handful of regexes and resolves the relative ones to files on disk.
//! This is a heuristic, not a parser: a specifier inside a comment or a
//! string literal that looks like an import is picked up too.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use tracing::trace;

use crate::core::file_reader::FileRecord;
use crate::core::model::FileDependencies;
use crate::core::paths::{join_relative, parent_dir};

/// Extensions tried, in order, when resolving a specifier
pub const RESOLVE_EXTENSIONS: &[&str] = &[".ts", ".tsx", ".js", ".jsx", ".mjs", ".cjs"];

/// Source extensions (without dot) the dependency graph considers
pub const SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs"];

/// `import x from '...'`, `import { a } from '...'`, `import '...'`
static STATIC_IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^\s*import\s+(?:type\s+)?(?:[\w*${}\s,]+?\s+from\s+)?['"]([^'"\n]+)['"]"#)
        .expect("Invalid STATIC_IMPORT_RE regex")
});

/// `import('...')`
static DYNAMIC_IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bimport\s*\(\s*['"]([^'"\n]+)['"]\s*\)"#)
        .expect("Invalid DYNAMIC_IMPORT_RE regex")
});

/// `require('...')`
static REQUIRE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\brequire\s*\(\s*['"]([^'"\n]+)['"]\s*\)"#).expect("Invalid REQUIRE_RE regex")
});

/// `export * from '...'`, `export * as ns from '...'`, `export { a } from '...'`
static EXPORT_FROM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?m)^\s*export\s+(?:type\s+)?(?:\*(?:\s+as\s+[\w$]+)?|\{[^}]*\})\s*from\s+['"]([^'"\n]+)['"]"#,
    )
    .expect("Invalid EXPORT_FROM_RE regex")
});

/// Literal specifiers found in source text, split into imports and re-exports
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Specifiers {
    pub imports: Vec<String>,
    pub exports: Vec<String>,
}

fn collect(re: &Regex, text: &str, out: &mut Vec<String>) {
    for caps in re.captures_iter(text) {
        if let Some(m) = caps.get(1) {
            out.push(m.as_str().to_string());
        }
    }
}

/// Extract raw specifiers from source text
pub fn extract_specifiers(text: &str) -> Specifiers {
    let mut specifiers = Specifiers::default();
    collect(&STATIC_IMPORT_RE, text, &mut specifiers.imports);
    collect(&DYNAMIC_IMPORT_RE, text, &mut specifiers.imports);
    collect(&REQUIRE_RE, text, &mut specifiers.imports);
    collect(&EXPORT_FROM_RE, text, &mut specifiers.exports);
    specifiers
}

/// True for `./x` and `../x` specifiers
pub fn is_relative_specifier(specifier: &str) -> bool {
    specifier.starts_with("./") || specifier.starts_with("../")
}

/// Resolve a relative specifier imported from `from_file` (root-relative).
///
/// Tries the exact path, then the path plus each extension, then
/// `index` plus each extension inside the path as a directory. The first
/// existing file wins. Package specifiers and anything resolving outside
/// the root return `None`.
pub fn resolve_import_path(root: &Path, specifier: &str, from_file: &str) -> Option<String> {
    if !is_relative_specifier(specifier) {
        return None;
    }

    let base = join_relative(parent_dir(from_file), specifier)?;
    if base.is_empty() {
        return None;
    }

    let candidates = std::iter::once(base.clone())
        .chain(RESOLVE_EXTENSIONS.iter().map(|ext| format!("{}{}", base, ext)))
        .chain(
            RESOLVE_EXTENSIONS
                .iter()
                .map(|ext| format!("{}/index{}", base, ext)),
        );

    for candidate in candidates {
        if root.join(&candidate).is_file() {
            return Some(candidate);
        }
    }

    trace!(specifier, from = from_file, "unresolved relative import");
    None
}

fn resolve_all(root: &Path, specifiers: &[String], from_file: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    specifiers
        .iter()
        .filter_map(|s| resolve_import_path(root, s, from_file))
        .filter(|resolved| seen.insert(resolved.clone()))
        .collect()
}

/// Resolve the imports and re-exports of one file.
///
/// An unreadable or missing file yields empty sets.
pub fn extract_dependencies(root: &Path, rel_file: &str) -> FileDependencies {
    let record = FileRecord::new(root, rel_file);
    let Some(text) = record.text() else {
        return FileDependencies::default();
    };

    let specifiers = extract_specifiers(text);
    FileDependencies {
        imports: resolve_all(root, &specifiers.imports, rel_file),
        exports: resolve_all(root, &specifiers.exports, rel_file),
    }
}
