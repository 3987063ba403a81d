//! Text search
//!
//! A search runs through the first available `Matcher`: ripgrep when it
//! can be spawned, otherwise the in-process scanner. Any failure of the
//! external matcher (missing binary, error exit, timeout, oversized output)
//! drops through to the next one, so callers only ever see a slower answer.

use regex::{Regex, RegexBuilder};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::backends::ignore_rules::{IgnoreMatcher, OverrideFile};
use crate::backends::rg::RipgrepMatcher;
use crate::backends::scan::{normalize_extensions, walk_files};
use crate::config::EngineConfig;
use crate::core::file_reader::FileSet;
use crate::core::model::{EngineError, MatchOutcome, MatchRecord, SearchRequest};

/// Failure of a matcher backend; always recovered by falling back
#[derive(Debug, Error)]
pub enum MatcherError {
    #[error("{0} is not available")]
    Unavailable(String),

    #[error("failed to start {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("output exceeded {0} bytes")]
    OutputTooLarge(usize),

    #[error("exited with {0}")]
    ExitStatus(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// How the query text is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    /// Literal substring
    Fixed,
    /// Regular expression (also used for word-boundary literals)
    Regex,
}

/// A validated search request, ready for any matcher
#[derive(Debug, Clone)]
pub struct PreparedQuery {
    /// The query as the caller wrote it
    pub query: String,
    /// Pattern handed to the matcher (escaped and wrapped as needed)
    pub pattern: String,
    pub mode: QueryMode,
    pub case_sensitive: bool,
    pub extensions: Vec<String>,
    pub paths: Vec<String>,
    pub max_results: usize,
    regex: Option<Regex>,
    needle: String,
}

impl PreparedQuery {
    pub fn new(request: &SearchRequest) -> Result<Self, EngineError> {
        if request.query.is_empty() {
            return Err(EngineError::EmptyQuery);
        }

        let (pattern, mode) = match (request.regex, request.word_boundary) {
            (false, false) => (request.query.clone(), QueryMode::Fixed),
            (false, true) => (
                format!(r"\b{}\b", regex::escape(&request.query)),
                QueryMode::Regex,
            ),
            (true, false) => (request.query.clone(), QueryMode::Regex),
            (true, true) => (format!(r"\b(?:{})\b", request.query), QueryMode::Regex),
        };

        let regex = match mode {
            QueryMode::Fixed => None,
            QueryMode::Regex => Some(
                RegexBuilder::new(&pattern)
                    .case_insensitive(!request.case_sensitive)
                    .build()
                    .map_err(|e| EngineError::InvalidPattern(e.to_string()))?,
            ),
        };

        let needle = if request.case_sensitive {
            request.query.clone()
        } else {
            request.query.to_lowercase()
        };

        Ok(Self {
            query: request.query.clone(),
            pattern,
            mode,
            case_sensitive: request.case_sensitive,
            extensions: normalize_extensions(&request.extensions),
            paths: request.paths.clone(),
            max_results: request.max_results.max(1),
            regex,
            needle,
        })
    }

    /// Test one line against the query
    pub fn is_match(&self, line: &str) -> bool {
        match &self.regex {
            Some(re) => re.is_match(line),
            None if self.case_sensitive => line.contains(&self.needle),
            None => line.to_lowercase().contains(&self.needle),
        }
    }
}

/// Repository state shared by every matcher for one search
pub struct SearchContext<'a> {
    pub root: &'a Path,
    pub ignore: &'a IgnoreMatcher,
    pub overrides: &'a [OverrideFile],
}

/// A search backend
pub trait Matcher {
    fn name(&self) -> &'static str;

    /// Probed before every search
    fn is_available(&self) -> bool;

    fn find(
        &self,
        ctx: &SearchContext<'_>,
        query: &PreparedQuery,
        files: &mut FileSet,
    ) -> Result<MatchOutcome, MatcherError>;
}

/// In-process line scanner over the walked file set
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanMatcher;

impl Matcher for ScanMatcher {
    fn name(&self) -> &'static str {
        "scan"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn find(
        &self,
        ctx: &SearchContext<'_>,
        query: &PreparedQuery,
        files: &mut FileSet,
    ) -> Result<MatchOutcome, MatcherError> {
        let candidates = walk_files(ctx.root, &query.paths, &query.extensions, ctx.ignore);
        let mut outcome = MatchOutcome::default();
        let mut count = 0usize;

        for rel in candidates {
            let record = files.get(&rel);
            let Some(text) = record.text() else {
                continue;
            };

            for (idx, line) in text.lines().enumerate() {
                if !query.is_match(line) {
                    continue;
                }
                if count == query.max_results {
                    outcome.truncated = true;
                    return Ok(outcome);
                }
                outcome.push(MatchRecord {
                    path: rel.clone(),
                    line: idx + 1,
                });
                count += 1;
            }
        }

        Ok(outcome)
    }
}

/// Matchers in preference order for the given configuration
pub fn matchers(config: &EngineConfig) -> Vec<Box<dyn Matcher>> {
    let mut list: Vec<Box<dyn Matcher>> = Vec::new();
    if config.use_external_matcher {
        list.push(Box::new(RipgrepMatcher::from_config(config)));
    }
    list.push(Box::new(ScanMatcher));
    list
}

/// Run the query through the first matcher that is available and succeeds
pub fn find_matches(
    ctx: &SearchContext<'_>,
    query: &PreparedQuery,
    files: &mut FileSet,
    config: &EngineConfig,
) -> MatchOutcome {
    for matcher in matchers(config) {
        if !matcher.is_available() {
            debug!(matcher = matcher.name(), "matcher unavailable");
            continue;
        }

        match matcher.find(ctx, query, files) {
            Ok(outcome) => {
                debug!(
                    matcher = matcher.name(),
                    matches = outcome.total(),
                    truncated = outcome.truncated,
                    "search finished"
                );
                return outcome;
            }
            Err(e) => {
                warn!(matcher = matcher.name(), error = %e, "matcher failed, falling back");
            }
        }
    }

    MatchOutcome::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn scan(root: &Path, request: &SearchRequest) -> MatchOutcome {
        let ignore = IgnoreMatcher::build(root, &[]);
        let ctx = SearchContext {
            root,
            ignore: &ignore,
            overrides: &[],
        };
        let query = PreparedQuery::new(request).unwrap();
        let mut files = FileSet::new(root);
        ScanMatcher.find(&ctx, &query, &mut files).unwrap()
    }

    #[test]
    fn test_prepare_fixed() {
        let q = PreparedQuery::new(&SearchRequest::new("a.b")).unwrap();
        assert_eq!(q.mode, QueryMode::Fixed);
        assert_eq!(q.pattern, "a.b");
        assert!(q.is_match("x A.B y"));
        assert!(!q.is_match("aXb"));
    }

    #[test]
    fn test_prepare_word_boundary_literal() {
        let q = PreparedQuery::new(&SearchRequest::new("a.b").word_boundary(true)).unwrap();
        assert_eq!(q.mode, QueryMode::Regex);
        assert_eq!(q.pattern, r"\ba\.b\b");
        assert!(q.is_match("use a.b;"));
        assert!(!q.is_match("aXb"));
        assert!(!q.is_match("xa.bc"));
    }

    #[test]
    fn test_prepare_word_boundary_regex() {
        let q = PreparedQuery::new(
            &SearchRequest::new("foo|bar")
                .regex(true)
                .word_boundary(true)
                .case_sensitive(true),
        )
        .unwrap();
        assert_eq!(q.pattern, r"\b(?:foo|bar)\b");
        assert!(q.is_match("call bar()"));
        assert!(!q.is_match("foobar"));
        assert!(!q.is_match("BAR"));
    }

    #[test]
    fn test_prepare_invalid_regex() {
        let err = PreparedQuery::new(&SearchRequest::new("(unclosed").regex(true)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidPattern(_)));
    }

    #[test]
    fn test_prepare_empty_query() {
        let err = PreparedQuery::new(&SearchRequest::new("")).unwrap_err();
        assert!(matches!(err, EngineError::EmptyQuery));
    }

    #[test]
    fn test_case_sensitivity() {
        let insensitive = PreparedQuery::new(&SearchRequest::new("TODO")).unwrap();
        assert!(insensitive.is_match("// todo: fix"));

        let sensitive = PreparedQuery::new(&SearchRequest::new("TODO").case_sensitive(true)).unwrap();
        assert!(!sensitive.is_match("// todo: fix"));
    }

    #[test]
    fn test_scan_finds_lines() {
        let temp = tempdir().unwrap();
        write(temp.path(), "a.ts", "const x = 1;\n// todo: fix\n");
        write(temp.path(), "b.ts", "nothing here\n");

        let outcome = scan(temp.path(), &SearchRequest::new("TODO"));
        assert_eq!(outcome.files.len(), 1);
        assert_eq!(outcome.files[0].path, "a.ts");
        assert_eq!(outcome.files[0].lines, vec![2]);
        assert!(!outcome.truncated);
    }

    #[test]
    fn test_scan_truncates_mid_file() {
        let temp = tempdir().unwrap();
        write(temp.path(), "a.ts", "hit\nhit\nhit\n");
        write(temp.path(), "b.ts", "hit\n");

        let outcome = scan(temp.path(), &SearchRequest::new("hit").max_results(2));
        assert_eq!(outcome.total(), 2);
        assert_eq!(outcome.files[0].lines, vec![1, 2]);
        assert!(outcome.truncated);
    }

    #[test]
    fn test_scan_exact_cap_is_not_truncated() {
        let temp = tempdir().unwrap();
        write(temp.path(), "a.ts", "hit\nhit\n");

        let outcome = scan(temp.path(), &SearchRequest::new("hit").max_results(2));
        assert_eq!(outcome.total(), 2);
        assert!(!outcome.truncated);
    }

    #[test]
    fn test_scan_respects_scope_and_extensions() {
        let temp = tempdir().unwrap();
        write(temp.path(), "src/a.ts", "needle\n");
        write(temp.path(), "src/a.md", "needle\n");
        write(temp.path(), "lib/b.ts", "needle\n");

        let request = SearchRequest::new("needle")
            .paths(["src"])
            .extensions(["ts"]);
        let outcome = scan(temp.path(), &request);
        let paths: Vec<_> = outcome.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["src/a.ts"]);
    }

    #[test]
    fn test_scan_skips_binary_files() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("blob.dat"), b"needle\0\0").unwrap();
        write(temp.path(), "a.txt", "needle\n");

        let outcome = scan(temp.path(), &SearchRequest::new("needle"));
        let paths: Vec<_> = outcome.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["a.txt"]);
    }

    #[test]
    fn test_matchers_order() {
        let config = EngineConfig::default();
        let names: Vec<_> = matchers(&config).iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["ripgrep", "scan"]);

        let config = EngineConfig {
            use_external_matcher: false,
            ..EngineConfig::default()
        };
        let names: Vec<_> = matchers(&config).iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["scan"]);
    }

    #[test]
    fn test_find_matches_falls_back_when_binary_missing() {
        let temp = tempdir().unwrap();
        write(temp.path(), "a.ts", "needle\n");

        let config = EngineConfig {
            ripgrep_binary: "/nonexistent/bin/rg".into(),
            ..EngineConfig::default()
        };
        let ignore = IgnoreMatcher::build(temp.path(), &[]);
        let ctx = SearchContext {
            root: temp.path(),
            ignore: &ignore,
            overrides: &[],
        };
        let query = PreparedQuery::new(&SearchRequest::new("needle")).unwrap();
        let mut files = FileSet::new(temp.path());

        let outcome = find_matches(&ctx, &query, &mut files, &config);
        assert_eq!(outcome.total(), 1);
    }
}
