//! File scanning backend
//!
//! Uses walkdir for iterative traversal. Infrastructure directories are
//! always pruned; everything else goes through the ignore matcher before it
//! is returned.

use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::backends::ignore_rules::IgnoreMatcher;
use crate::core::paths::{extension, make_relative, resolve_in_root};

/// Directories never descended into, whatever the ignore rules say
pub const INFRA_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    "bower_components",
    ".yarn",
    ".pnpm-store",
    "vendor",
    "target",
    "dist",
    "build",
    "out",
    ".next",
    ".nuxt",
    "coverage",
    "__pycache__",
    ".venv",
    ".cache",
];

/// True if a directory name is on the hard-coded skip list
pub fn is_infra_dir(name: &OsStr) -> bool {
    name.to_str()
        .map(|n| INFRA_DIRS.contains(&n))
        .unwrap_or(false)
}

pub(crate) fn has_infra_component(rel: &str) -> bool {
    rel.split('/').any(|part| INFRA_DIRS.contains(&part))
}

/// Normalize an extension filter: strip leading dots, drop blanks
pub fn normalize_extensions(extensions: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_string())
        .filter(|e| !e.is_empty())
        .collect();
    normalized.sort();
    normalized.dedup();
    normalized
}

fn extension_allowed(rel: &str, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    match extension(rel) {
        Some(ext) => extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)),
        None => false,
    }
}

/// Walk the repository and return root-relative file paths in traversal
/// order: depth first, entries sorted by name within each directory. This
/// is the order `rg --sort path` reports in.
///
/// `roots` scopes the walk to specific files or directories (relative to
/// `root`); an empty slice walks the whole repository. Roots that do not
/// exist or point outside the repository are skipped.
pub fn walk_files(
    root: &Path,
    roots: &[String],
    extensions: &[String],
    matcher: &IgnoreMatcher,
) -> Vec<String> {
    let extensions = normalize_extensions(extensions);
    let scopes: Vec<String> = if roots.is_empty() {
        vec![String::new()]
    } else {
        roots.to_vec()
    };

    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for scope in &scopes {
        let (abs, rel) = match resolve_in_root(root, scope) {
            Some(resolved) => resolved,
            None => {
                warn!(path = %scope, "skipping search root outside the repository");
                continue;
            }
        };

        let metadata = match std::fs::metadata(&abs) {
            Ok(m) => m,
            Err(e) => {
                debug!(path = %scope, error = %e, "skipping unreadable search root");
                continue;
            }
        };

        if has_infra_component(&rel) {
            debug!(path = %rel, "search root is inside an infrastructure directory");
            continue;
        }

        if metadata.is_file() {
            if !matcher.is_ignored(&rel, false)
                && extension_allowed(&rel, &extensions)
                && seen.insert(rel.clone())
            {
                files.push(rel);
            }
            continue;
        }

        let walker = WalkDir::new(&abs)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                if entry.depth() == 0 || !entry.file_type().is_dir() {
                    return true;
                }
                if is_infra_dir(entry.file_name()) {
                    return false;
                }
                match make_relative(entry.path(), root) {
                    Some(dir_rel) => !matcher.is_ignored(&dir_rel, true),
                    None => false,
                }
            });

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    debug!(error = %e, "walk error");
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let file_rel = match make_relative(entry.path(), root) {
                Some(r) => r,
                None => continue,
            };

            if matcher.is_ignored(&file_rel, false) || !extension_allowed(&file_rel, &extensions) {
                continue;
            }

            if seen.insert(file_rel.clone()) {
                files.push(file_rel);
            }
        }
    }

    debug!(count = files.len(), "walked files");
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::ignore_rules::OverrideFile;
    use std::fs::{self, File};
    use tempfile::tempdir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        File::create(path).unwrap();
    }

    fn no_rules(root: &Path) -> IgnoreMatcher {
        IgnoreMatcher::build(root, &[])
    }

    #[test]
    fn test_walk_empty_dir() {
        let temp = tempdir().unwrap();
        let files = walk_files(temp.path(), &[], &[], &no_rules(temp.path()));
        assert!(files.is_empty());
    }

    #[test]
    fn test_walk_sorted_and_relative() {
        let temp = tempdir().unwrap();
        touch(temp.path(), "b.ts");
        touch(temp.path(), "a.ts");
        touch(temp.path(), "sub/c.ts");

        let files = walk_files(temp.path(), &[], &[], &no_rules(temp.path()));
        assert_eq!(files, vec!["a.ts", "b.ts", "sub/c.ts"]);
    }

    #[test]
    fn test_walk_skips_infra_dirs() {
        let temp = tempdir().unwrap();
        touch(temp.path(), "src/a.ts");
        touch(temp.path(), ".git/HEAD");
        touch(temp.path(), "vendor/lib.js");
        touch(temp.path(), "target/debug/out.js");

        let files = walk_files(temp.path(), &[], &[], &no_rules(temp.path()));
        assert_eq!(files, vec!["src/a.ts"]);
    }

    #[test]
    fn test_walk_extension_filter() {
        let temp = tempdir().unwrap();
        touch(temp.path(), "a.ts");
        touch(temp.path(), "b.js");
        touch(temp.path(), "README.md");

        let exts = vec![".ts".to_string(), "js".to_string()];
        let files = walk_files(temp.path(), &[], &exts, &no_rules(temp.path()));
        assert_eq!(files, vec!["a.ts", "b.js"]);
    }

    #[test]
    fn test_walk_order_is_per_directory() {
        let temp = tempdir().unwrap();
        touch(temp.path(), "a.ts");
        touch(temp.path(), "a/x.ts");
        touch(temp.path(), "B.ts");

        let files = walk_files(temp.path(), &[], &[], &no_rules(temp.path()));
        assert_eq!(files, vec!["B.ts", "a/x.ts", "a.ts"]);
    }

    #[test]
    fn test_walk_explicit_roots() {
        let temp = tempdir().unwrap();
        touch(temp.path(), "src/a.ts");
        touch(temp.path(), "src/b.ts");
        touch(temp.path(), "lib/c.ts");

        let roots = vec![
            "src".to_string(),
            "src/a.ts".to_string(),
            "missing".to_string(),
            "../outside".to_string(),
        ];
        let files = walk_files(temp.path(), &roots, &[], &no_rules(temp.path()));
        assert_eq!(files, vec!["src/a.ts", "src/b.ts"]);
    }

    #[test]
    fn test_walk_applies_ignore_rules() {
        let temp = tempdir().unwrap();
        touch(temp.path(), "src/x.generated.ts");
        touch(temp.path(), "src/x.ts");
        touch(temp.path(), "fixtures/data.ts");

        let overrides = vec![
            OverrideFile::new("src", vec!["*.generated.ts".to_string()]),
            OverrideFile::new("", vec!["fixtures/".to_string()]),
        ];
        let matcher = IgnoreMatcher::build(temp.path(), &overrides);

        let files = walk_files(temp.path(), &[], &[], &matcher);
        assert_eq!(files, vec!["src/x.ts"]);
    }

    #[test]
    fn test_normalize_extensions() {
        let exts = vec![".ts".into(), "ts".into(), " ".into(), "js".into()];
        assert_eq!(normalize_extensions(&exts), vec!["js", "ts"]);
    }
}
