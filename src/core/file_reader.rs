//! File reading strategies
//!
//! Provides consistent handling for:
//! - Non-UTF-8 files (lossy conversion)
//! - Binary files (skipped by scanners)
//! - Lazily loaded content that is read at most once per operation

use once_cell::unsync::OnceCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Outcome of reading a file as text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextContent {
    /// UTF-8 (possibly lossily converted) text
    Text(String),
    /// The file contains a NUL byte
    Binary,
}

impl TextContent {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            TextContent::Text(s) => Some(s),
            TextContent::Binary => None,
        }
    }
}

/// Check if a byte buffer looks binary (contains a NUL byte anywhere)
pub fn looks_binary(bytes: &[u8]) -> bool {
    bytes.contains(&0)
}

/// Whether the file at `path` is binary. Unreadable files are not.
pub fn is_binary_file(path: &Path) -> bool {
    fs::read(path).map(|bytes| looks_binary(&bytes)).unwrap_or(false)
}

/// Read a file as text, converting invalid UTF-8 lossily.
pub fn read_text(path: &Path) -> std::io::Result<TextContent> {
    let bytes = fs::read(path)?;
    if looks_binary(&bytes) {
        return Ok(TextContent::Binary);
    }

    let content = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    };
    Ok(TextContent::Text(content))
}

/// A repository file with lazily loaded text.
///
/// Content is read on first access and cached for the lifetime of the
/// record; read failures and binary files both surface as `None`.
#[derive(Debug)]
pub struct FileRecord {
    rel_path: String,
    abs_path: PathBuf,
    content: OnceCell<Option<String>>,
}

impl FileRecord {
    pub fn new(root: &Path, rel_path: impl Into<String>) -> Self {
        let rel_path = rel_path.into();
        let abs_path = root.join(&rel_path);
        Self {
            rel_path,
            abs_path,
            content: OnceCell::new(),
        }
    }

    pub fn rel_path(&self) -> &str {
        &self.rel_path
    }

    /// File text, loaded on first call
    pub fn text(&self) -> Option<&str> {
        self.content
            .get_or_init(|| match read_text(&self.abs_path) {
                Ok(TextContent::Text(s)) => Some(s),
                Ok(TextContent::Binary) => {
                    tracing::debug!(path = %self.rel_path, "skipping binary file");
                    None
                }
                Err(e) => {
                    tracing::debug!(path = %self.rel_path, error = %e, "unreadable file");
                    None
                }
            })
            .as_deref()
    }

    /// File lines (empty if the file is unreadable or binary)
    pub fn lines(&self) -> Vec<&str> {
        self.text().map(|t| t.lines().collect()).unwrap_or_default()
    }
}

/// Records opened during one logical operation, keyed by relative path
#[derive(Debug)]
pub struct FileSet {
    root: PathBuf,
    records: HashMap<String, FileRecord>,
}

impl FileSet {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            records: HashMap::new(),
        }
    }

    /// Get the record for a path, creating it on first use
    pub fn get(&mut self, rel_path: &str) -> &FileRecord {
        let root = &self.root;
        self.records
            .entry(rel_path.to_string())
            .or_insert_with(|| FileRecord::new(root, rel_path))
    }
}
