//! Engine facade
//!
//! The five tool operations an agent host calls. Every operation returns
//! plain text; failures become a readable line instead of an error.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::backends::deps::build_graph;
use crate::backends::ignore_rules::IgnoreMatcher;
use crate::backends::search::{find_matches, PreparedQuery, SearchContext};
use crate::cache::store::{cache_key, ResultCache};
use crate::config::EngineConfig;
use crate::core::file_reader::{read_text, FileSet, TextContent};
use crate::core::model::{
    DepGraph, EngineError, MatchOutcome, MatchRecord, SearchRequest, DEFAULT_MAX_RESULTS,
};
use crate::core::paths::resolve_in_root;
use crate::core::render::{render_dep_graph, render_matches};
use crate::core::util::{command_exists, truncate_string};

/// Code context engine bound to one repository root
pub struct Engine {
    root: PathBuf,
    config: EngineConfig,
    cache: ResultCache,
}

impl Engine {
    /// Open an engine on `root`, which must be an existing directory
    pub fn new(root: impl AsRef<Path>, config: EngineConfig) -> Result<Self, EngineError> {
        let requested = root.as_ref();
        let root = requested
            .canonicalize()
            .map_err(|_| EngineError::NotFound(requested.display().to_string()))?;
        if !root.is_dir() {
            return Err(EngineError::NotFound(requested.display().to_string()));
        }

        let cache = ResultCache::new(config.cache_capacity());
        debug!(root = %root.display(), "engine ready");
        Ok(Self {
            root,
            config,
            cache,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// True when searches will go through the external matcher
    pub fn external_matcher_available(&self) -> bool {
        self.config.use_external_matcher && command_exists(&self.config.ripgrep_binary)
    }

    /// Return the full content of each requested file.
    ///
    /// Every entry gets a `=== path ===` header; missing, binary or
    /// out-of-root paths get an error marker instead of content.
    pub fn fetch_files(&self, paths: &[String]) -> String {
        let mut sections = Vec::with_capacity(paths.len());

        for requested in paths {
            let section = match self.read_file(requested) {
                Ok((rel, content)) => format!("=== {} ===\n{}", rel, content),
                Err(e) => format!("=== {} ===\n[error: {}]", requested, e),
            };
            sections.push(section);
        }

        sections.join("\n")
    }

    fn read_file(&self, requested: &str) -> Result<(String, String), EngineError> {
        let (abs, rel) = resolve_in_root(&self.root, requested)
            .ok_or_else(|| EngineError::OutsideRoot(requested.to_string()))?;
        if rel.is_empty() || !abs.is_file() {
            return Err(EngineError::NotFound(requested.to_string()));
        }

        let text = match read_text(&abs)? {
            TextContent::Text(text) => text,
            TextContent::Binary => return Ok((rel, "[binary file omitted]".to_string())),
        };

        let total = text.len();
        let (mut content, truncated) = truncate_string(&text, self.config.max_file_bytes);
        if truncated {
            let shown = content.len();
            if !content.ends_with('\n') {
                content.push('\n');
            }
            content.push_str(&format!(
                "[truncated: showing the first {} of {} bytes]\n",
                shown,
                total
            ));
        }
        Ok((rel, content))
    }

    /// Literal, case-sensitive search inside a single file
    pub fn fetch_snippet(&self, path: &str, search_text: &str, context_lines: usize) -> String {
        match self.snippet(path, search_text, context_lines) {
            Ok(report) => report,
            Err(e) => e.to_string(),
        }
    }

    fn snippet(
        &self,
        path: &str,
        search_text: &str,
        context_lines: usize,
    ) -> Result<String, EngineError> {
        if search_text.is_empty() {
            return Err(EngineError::EmptyQuery);
        }
        let (abs, rel) = resolve_in_root(&self.root, path)
            .ok_or_else(|| EngineError::OutsideRoot(path.to_string()))?;
        if rel.is_empty() || !abs.is_file() {
            return Err(EngineError::NotFound(path.to_string()));
        }

        let mut files = FileSet::new(&self.root);
        let mut outcome = MatchOutcome::default();
        let lines = files.get(&rel).lines();
        for (idx, line) in lines.iter().enumerate() {
            if !line.contains(search_text) {
                continue;
            }
            if outcome.total() == DEFAULT_MAX_RESULTS {
                outcome.truncated = true;
                break;
            }
            outcome.push(MatchRecord {
                path: rel.clone(),
                line: idx + 1,
            });
        }

        Ok(render_matches(
            search_text,
            &outcome,
            &mut files,
            context_lines,
            DEFAULT_MAX_RESULTS,
        ))
    }

    /// Build the dependency graph around `path`
    pub fn dependency_graph(&self, path: &str, depth: usize) -> Result<DepGraph, EngineError> {
        let (matcher, _) = IgnoreMatcher::for_root(&self.root);
        build_graph(&self.root, path, depth, &matcher)
    }

    /// Dependency graph report around `path`
    pub fn dep_graph(&self, path: &str, depth: usize) -> String {
        match self.dependency_graph(path, depth) {
            Ok(graph) => render_dep_graph(&graph),
            Err(e) => e.to_string(),
        }
    }

    /// Full-text search across the repository, served from the cache when
    /// an equivalent request was seen before.
    pub fn search_repo(&mut self, request: &SearchRequest) -> String {
        let key = cache_key(request);
        if let Some(report) = self.cache.get(&key) {
            debug!(query = %request.query, "search served from cache");
            return report.clone();
        }

        let report = self.run_search(request);
        self.cache.put(key, report.clone());
        report
    }

    fn run_search(&self, request: &SearchRequest) -> String {
        let query = match PreparedQuery::new(request) {
            Ok(query) => query,
            Err(e) => return e.to_string(),
        };

        let (ignore, overrides) = IgnoreMatcher::for_root(&self.root);
        let ctx = SearchContext {
            root: &self.root,
            ignore: &ignore,
            overrides: &overrides,
        };
        let mut files = FileSet::new(&self.root);
        let outcome = find_matches(&ctx, &query, &mut files, &self.config);
        info!(
            query = %request.query,
            matches = outcome.total(),
            files = outcome.files.len(),
            "search complete"
        );

        render_matches(
            &request.query,
            &outcome,
            &mut files,
            request.context_lines,
            query.max_results,
        )
    }

    /// Drop every cached search report
    pub fn reset_cache(&mut self) -> String {
        let dropped = self.cache.len();
        self.cache.clear();
        debug!(dropped, "search cache cleared");
        "Search cache cleared".to_string()
    }
}
