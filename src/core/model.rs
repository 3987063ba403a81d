//! Shared result model
//!
//! Search matches, import sets and dependency graphs are produced in these
//! shapes before being rendered to text for the caller.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of context lines around a match
pub const DEFAULT_CONTEXT_LINES: usize = 5;

/// Default cap on total matches per search
pub const DEFAULT_MAX_RESULTS: usize = 200;

/// Errors raised inside the engine.
///
/// None of these cross the tool boundary: the engine turns each into a
/// readable line of text.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Path is outside the repository root: {0}")]
    OutsideRoot(String),

    #[error("Invalid search pattern: {0}")]
    InvalidPattern(String),

    #[error("Search query is empty")]
    EmptyQuery,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A full-text search request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default)]
    pub regex: bool,
    #[serde(default)]
    pub word_boundary: bool,
    /// Extensions to include, without the leading dot
    #[serde(default)]
    pub extensions: Vec<String>,
    /// Root-relative files or directories to scope the search to
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default = "default_context_lines")]
    pub context_lines: usize,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_context_lines() -> usize {
    DEFAULT_CONTEXT_LINES
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

impl SearchRequest {
    /// Create a plain, case-insensitive request with default limits
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            case_sensitive: false,
            regex: false,
            word_boundary: false,
            extensions: Vec::new(),
            paths: Vec::new(),
            context_lines: DEFAULT_CONTEXT_LINES,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    pub fn case_sensitive(mut self, yes: bool) -> Self {
        self.case_sensitive = yes;
        self
    }

    pub fn regex(mut self, yes: bool) -> Self {
        self.regex = yes;
        self
    }

    pub fn word_boundary(mut self, yes: bool) -> Self {
        self.word_boundary = yes;
        self
    }

    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn context_lines(mut self, lines: usize) -> Self {
        self.context_lines = lines;
        self
    }

    pub fn max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }
}

/// A single match: root-relative file and one-based line number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub path: String,
    pub line: usize,
}

/// Matches in one file, in line order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMatches {
    pub path: String,
    pub lines: Vec<usize>,
}

/// Everything a matcher found for one request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub files: Vec<FileMatches>,
    /// The match cap was hit and scanning stopped early
    pub truncated: bool,
}

impl MatchOutcome {
    pub fn total(&self) -> usize {
        self.files.iter().map(|f| f.lines.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Append a match, merging with the previous file group when possible
    pub fn push(&mut self, record: MatchRecord) {
        match self.files.last_mut() {
            Some(last) if last.path == record.path => last.lines.push(record.line),
            _ => self.files.push(FileMatches {
                path: record.path,
                lines: vec![record.line],
            }),
        }
    }
}

/// Resolved module references of one source file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDependencies {
    /// Files pulled in by import statements, dynamic imports and require calls
    pub imports: Vec<String>,
    /// Files re-exported through `export ... from`
    pub exports: Vec<String>,
}

impl FileDependencies {
    /// Imports followed by re-exports, de-duplicated in discovery order
    pub fn all_targets(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.imports
            .iter()
            .chain(self.exports.iter())
            .filter(|p| seen.insert(p.as_str()))
            .cloned()
            .collect()
    }
}

/// One visited node of a dependency graph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Traversal depth at first visit (the seed is 1)
    pub depth: usize,
    pub imports: Vec<String>,
    pub imported_by: Vec<String>,
}

/// Bounded dependency graph around a seed file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepGraph {
    pub seed: String,
    pub max_depth: usize,
    /// Nodes in first-visit order
    pub nodes: IndexMap<String, GraphNode>,
    /// Import cycles among the visited nodes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cycles: Vec<Vec<String>>,
}

impl DepGraph {
    pub fn new(seed: impl Into<String>, max_depth: usize) -> Self {
        Self {
            seed: seed.into(),
            max_depth,
            nodes: IndexMap::new(),
            cycles: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&GraphNode> {
        self.nodes.get(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_outcome_groups_by_file() {
        let mut outcome = MatchOutcome::default();
        outcome.push(MatchRecord {
            path: "a.ts".into(),
            line: 1,
        });
        outcome.push(MatchRecord {
            path: "a.ts".into(),
            line: 4,
        });
        outcome.push(MatchRecord {
            path: "b.ts".into(),
            line: 2,
        });

        assert_eq!(outcome.files.len(), 2);
        assert_eq!(outcome.files[0].lines, vec![1, 4]);
        assert_eq!(outcome.total(), 3);
    }

    #[test]
    fn test_search_request_defaults() {
        let req = SearchRequest::new("TODO");
        assert_eq!(req.context_lines, DEFAULT_CONTEXT_LINES);
        assert_eq!(req.max_results, DEFAULT_MAX_RESULTS);
        assert!(!req.case_sensitive);
    }

    #[test]
    fn test_search_request_deserialize_defaults() {
        let req: SearchRequest = serde_json::from_str(r#"{"query": "foo"}"#).unwrap();
        assert_eq!(req, SearchRequest::new("foo"));
    }

    #[test]
    fn test_file_dependencies_all_targets() {
        let deps = FileDependencies {
            imports: vec!["b.ts".into(), "c.ts".into()],
            exports: vec!["c.ts".into(), "d.ts".into()],
        };
        assert_eq!(deps.all_targets(), vec!["b.ts", "c.ts", "d.ts"]);
    }

    #[test]
    fn test_engine_error_messages() {
        let err = EngineError::NotFound("src/x.ts".into());
        assert_eq!(err.to_string(), "File not found: src/x.ts");
    }

    #[test]
    fn test_dep_graph_serializes_in_visit_order() {
        let mut graph = DepGraph::new("z.ts", 2);
        graph.nodes.insert("z.ts".into(), GraphNode::default());
        graph.nodes.insert("a.ts".into(), GraphNode::default());

        let json = serde_json::to_string(&graph).unwrap();
        assert!(json.find("z.ts\":").unwrap() < json.find("a.ts\":").unwrap());
    }
}
