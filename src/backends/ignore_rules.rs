//! Layered ignore rules
//!
//! Built-in defaults plus every `.codepressignore` in the repository,
//! compiled with the `ignore` crate's gitignore matcher. Rules from a
//! nested override file are rebased onto that file's directory so they
//! only ever affect their own subtree.

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::backends::scan::is_infra_dir;
use crate::core::paths::{make_relative, parent_dir};

/// Name of the repo-local override file
pub const IGNORE_FILE_NAME: &str = ".codepressignore";

/// Patterns excluded in every repository. Override files cannot re-include
/// anything matched here.
pub const DEFAULT_PATTERNS: &[&str] = &[
    "node_modules/",
    "bower_components/",
    "dist/",
    "build/",
    "coverage/",
    "*.min.js",
    "*.min.css",
    "*.map",
    "*.lock",
    "package-lock.json",
    "pnpm-lock.yaml",
    "*.png",
    "*.jpg",
    "*.jpeg",
    "*.gif",
    "*.ico",
    "*.webp",
    "*.pdf",
    "*.zip",
    "*.gz",
    "*.tar",
    "*.woff",
    "*.woff2",
    "*.ttf",
    "*.eot",
    "*.exe",
    "*.dll",
    "*.so",
    "*.dylib",
];

/// One override file: its directory (root-relative, "" for the root) and
/// its raw rule lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideFile {
    pub anchor_dir: String,
    pub path: PathBuf,
    pub lines: Vec<String>,
}

impl OverrideFile {
    pub fn new(anchor_dir: impl Into<String>, lines: Vec<String>) -> Self {
        let anchor_dir = anchor_dir.into().replace('\\', "/");
        let anchor_dir = anchor_dir.trim_matches('/').to_string();
        Self {
            path: PathBuf::from(&anchor_dir).join(IGNORE_FILE_NAME),
            anchor_dir,
            lines,
        }
    }
}

/// Find and read every override file under the root.
///
/// Unreadable files are logged and skipped.
pub fn discover_override_files(root: &Path) -> Vec<OverrideFile> {
    let mut found = Vec::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            !(e.file_type().is_dir() && e.depth() > 0 && is_infra_dir(e.file_name()))
        });

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };

        if !entry.file_type().is_file() || entry.file_name() != IGNORE_FILE_NAME {
            continue;
        }

        let rel = match make_relative(entry.path(), root) {
            Some(r) => r,
            None => continue,
        };

        match fs::read_to_string(entry.path()) {
            Ok(content) => {
                let lines = content.lines().map(str::to_string).collect();
                let mut file = OverrideFile::new(parent_dir(&rel), lines);
                file.path = entry.path().to_path_buf();
                found.push(file);
            }
            Err(e) => {
                warn!(path = %rel, error = %e, "skipping unreadable ignore file");
            }
        }
    }

    debug!(count = found.len(), "discovered override files");
    found
}

/// Rebase one override rule onto its anchor directory.
///
/// Returns `None` for blank lines, comments and negations (re-inclusion is
/// not supported).
pub fn rebase_pattern(anchor_dir: &str, line: &str) -> Option<String> {
    let pattern = line.trim().replace('\\', "/");
    if pattern.is_empty() || pattern.starts_with('#') {
        return None;
    }
    if pattern.starts_with('!') {
        debug!(pattern = %pattern, "negated ignore rules are not supported");
        return None;
    }

    let dir = anchor_dir.replace('\\', "/");
    let dir = dir.trim_matches('/');
    if dir.is_empty() {
        return Some(pattern);
    }

    // A slash anywhere but the end pins the pattern to the file's directory
    let anchored = pattern.trim_end_matches('/').contains('/');
    let rebased = if anchored {
        format!("{}/{}", dir, pattern.trim_start_matches('/'))
    } else {
        format!("{}/**/{}", dir, pattern)
    };
    Some(rebased)
}

/// Compiled ignore predicate over root-relative paths
#[derive(Debug, Clone)]
pub struct IgnoreMatcher {
    defaults: Gitignore,
    overrides: Gitignore,
}

impl IgnoreMatcher {
    /// Compile defaults first, then each override file in order
    pub fn build(root: &Path, overrides: &[OverrideFile]) -> Self {
        let mut defaults = GitignoreBuilder::new(root);
        for pattern in DEFAULT_PATTERNS {
            if let Err(e) = defaults.add_line(None, pattern) {
                warn!(pattern = *pattern, error = %e, "invalid default ignore pattern");
            }
        }

        let mut custom = GitignoreBuilder::new(root);
        for file in overrides {
            for line in &file.lines {
                let Some(rebased) = rebase_pattern(&file.anchor_dir, line) else {
                    continue;
                };
                if let Err(e) = custom.add_line(Some(file.path.clone()), &rebased) {
                    warn!(
                        file = %file.path.display(),
                        pattern = %rebased,
                        error = %e,
                        "skipping invalid ignore pattern"
                    );
                }
            }
        }

        Self {
            defaults: build_or_empty(defaults),
            overrides: build_or_empty(custom),
        }
    }

    /// Discover override files under the root and compile them
    pub fn for_root(root: &Path) -> (Self, Vec<OverrideFile>) {
        let overrides = discover_override_files(root);
        (Self::build(root, &overrides), overrides)
    }

    /// True if the path (or any parent directory) is excluded
    pub fn is_ignored(&self, rel_path: &str, is_dir: bool) -> bool {
        let rel = rel_path.trim_start_matches("./").trim_start_matches('/');
        if rel.is_empty() {
            return false;
        }

        self.defaults
            .matched_path_or_any_parents(rel, is_dir)
            .is_ignore()
            || self
                .overrides
                .matched_path_or_any_parents(rel, is_dir)
                .is_ignore()
    }
}

fn build_or_empty(builder: GitignoreBuilder) -> Gitignore {
    match builder.build() {
        Ok(gi) => gi,
        Err(e) => {
            warn!(error = %e, "failed to compile ignore rules");
            Gitignore::empty()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_rebase_pattern() {
        assert_eq!(rebase_pattern("", "*.log"), Some("*.log".into()));
        assert_eq!(
            rebase_pattern("src", "*.generated.ts"),
            Some("src/**/*.generated.ts".into())
        );
        assert_eq!(rebase_pattern("a/b", "/tmp"), Some("a/b/tmp".into()));
        assert_eq!(rebase_pattern("a\\b", "c\\d"), Some("a/b/c/d".into()));
        assert_eq!(rebase_pattern("a", "**/gen/"), Some("a/**/gen/".into()));
        assert_eq!(rebase_pattern("a", "tmp/"), Some("a/**/tmp/".into()));
        assert_eq!(rebase_pattern("src", "# comment"), None);
        assert_eq!(rebase_pattern("src", "   "), None);
        assert_eq!(rebase_pattern("src", "!keep.ts"), None);
    }

    #[test]
    fn test_defaults_always_apply() {
        let root = Path::new("/repo");
        let matcher = IgnoreMatcher::build(root, &[]);

        assert!(matcher.is_ignored("node_modules/react/index.js", false));
        assert!(matcher.is_ignored("web/app.min.js", false));
        assert!(!matcher.is_ignored("src/app.ts", false));
    }

    #[test]
    fn test_defaults_cannot_be_reincluded() {
        let root = Path::new("/repo");
        let overrides = vec![OverrideFile::new("", lines(&["!*.min.js", "!dist/"]))];
        let matcher = IgnoreMatcher::build(root, &overrides);

        assert!(matcher.is_ignored("app.min.js", false));
        assert!(matcher.is_ignored("dist/bundle.js", false));
    }

    #[test]
    fn test_nested_rules_stay_in_subtree() {
        let root = Path::new("/repo");
        let overrides = vec![OverrideFile::new("a/b", lines(&["*.snap", "/local.ts"]))];
        let matcher = IgnoreMatcher::build(root, &overrides);

        assert!(matcher.is_ignored("a/b/x.snap", false));
        assert!(matcher.is_ignored("a/b/deep/x.snap", false));
        assert!(matcher.is_ignored("a/b/local.ts", false));
        assert!(!matcher.is_ignored("a/x.snap", false));
        assert!(!matcher.is_ignored("x.snap", false));
        assert!(!matcher.is_ignored("a/b/deep/local.ts", false));
        assert!(!matcher.is_ignored("c/b/x.snap", false));
    }

    #[test]
    fn test_directory_rule_excludes_children() {
        let root = Path::new("/repo");
        let overrides = vec![OverrideFile::new("", lines(&["fixtures/"]))];
        let matcher = IgnoreMatcher::build(root, &overrides);

        assert!(matcher.is_ignored("fixtures", true));
        assert!(matcher.is_ignored("test/fixtures/data.ts", false));
    }

    #[test]
    fn test_discover_override_files() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("src/nested")).unwrap();
        fs::create_dir_all(temp.path().join("node_modules/pkg")).unwrap();
        fs::write(temp.path().join(".codepressignore"), "*.log\n").unwrap();
        fs::write(
            temp.path().join("src/nested/.codepressignore"),
            "# generated\n*.gen.ts\n",
        )
        .unwrap();
        fs::write(temp.path().join("node_modules/pkg/.codepressignore"), "*").unwrap();

        let found = discover_override_files(temp.path());
        let anchors: Vec<_> = found.iter().map(|f| f.anchor_dir.as_str()).collect();
        assert_eq!(anchors, vec!["", "src/nested"]);
        assert_eq!(found[1].lines, lines(&["# generated", "*.gen.ts"]));
    }

    #[test]
    fn test_for_root_generated_files() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("src")).unwrap();
        fs::write(temp.path().join("src/.codepressignore"), "*.generated.ts\n").unwrap();

        let (matcher, overrides) = IgnoreMatcher::for_root(temp.path());
        assert_eq!(overrides.len(), 1);
        assert!(matcher.is_ignored("src/x.generated.ts", false));
        assert!(!matcher.is_ignored("x.generated.ts", false));
        assert!(!matcher.is_ignored("src/x.ts", false));
    }
}
