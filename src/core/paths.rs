//! Path normalization utilities
//!
//! Every path handed back to a caller is relative to the repository root and
//! uses '/' as separator. Nothing here touches the filesystem except
//! `resolve_in_root`, which only stats.

use std::path::{Path, PathBuf};

/// Normalize a path to use '/' as separator (for cross-platform consistency)
pub fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Make a path relative to the root directory
pub fn make_relative(path: &Path, root: &Path) -> Option<String> {
    path.strip_prefix(root).ok().map(normalize_path)
}

/// Lexically clean a relative path: collapse `.`, resolve `..` and unify
/// separators. Returns `None` if the path climbs above its starting point
/// or is absolute.
pub fn clean_relative(path: &str) -> Option<String> {
    let unified = path.replace('\\', "/");
    if unified.starts_with('/') {
        return None;
    }

    let mut parts: Vec<&str> = Vec::new();
    for part in unified.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

/// Join a root-relative directory and a relative path, then clean the result.
pub fn join_relative(dir: &str, rel: &str) -> Option<String> {
    if dir.is_empty() {
        clean_relative(rel)
    } else {
        clean_relative(&format!("{}/{}", dir, rel))
    }
}

/// Parent directory of a root-relative path ("" for top-level entries)
pub fn parent_dir(rel: &str) -> &str {
    rel.rfind('/').map(|idx| &rel[..idx]).unwrap_or("")
}

/// Interpret a caller-supplied path against the root.
///
/// Absolute paths must live under the root; relative ones are cleaned
/// lexically. The returned string is the root-relative form.
pub fn to_root_relative(root: &Path, requested: &str) -> Option<String> {
    let requested_path = Path::new(requested);
    if requested_path.is_absolute() {
        let rel = make_relative(requested_path, root)?;
        return clean_relative(&rel);
    }
    clean_relative(requested)
}

/// Resolve a caller-supplied path to (absolute, relative) if it stays
/// within the root. Symlinks pointing outside the root are rejected.
pub fn resolve_in_root(root: &Path, requested: &str) -> Option<(PathBuf, String)> {
    let rel = to_root_relative(root, requested)?;
    let abs = if rel.is_empty() {
        root.to_path_buf()
    } else {
        root.join(&rel)
    };

    if let (Ok(canonical), Ok(canonical_root)) = (abs.canonicalize(), root.canonicalize()) {
        if !canonical.starts_with(&canonical_root) {
            return None;
        }
    }

    Some((abs, rel))
}

/// Extension of a relative path without the dot
pub fn extension(rel: &str) -> Option<&str> {
    let name = rel.rsplit('/').next().unwrap_or(rel);
    let idx = name.rfind('.')?;
    if idx == 0 {
        return None;
    }
    Some(&name[idx + 1..])
}
