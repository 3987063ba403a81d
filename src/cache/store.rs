//! Search result cache
//!
//! Finished search reports keyed by a canonical form of the request.
//! Strictly bounded; the least recently used entry goes first.

use lru::LruCache;
use serde::Serialize;
use std::num::NonZeroUsize;

use crate::backends::scan::normalize_extensions;
use crate::core::model::SearchRequest;

/// Canonical request shape. List parameters are sorted so requests that
/// differ only in list order share an entry.
#[derive(Debug, Serialize)]
struct CacheKey<'a> {
    query: &'a str,
    case_sensitive: bool,
    regex: bool,
    word_boundary: bool,
    extensions: Vec<String>,
    paths: Vec<String>,
    context_lines: usize,
    max_results: usize,
}

fn canonical_paths(paths: &[String]) -> Vec<String> {
    let mut paths: Vec<String> = paths
        .iter()
        .map(|p| p.trim().replace('\\', "/").trim_end_matches('/').to_string())
        .filter(|p| !p.is_empty())
        .collect();
    paths.sort();
    paths.dedup();
    paths
}

/// Build the cache key for a request
pub fn cache_key(request: &SearchRequest) -> String {
    let key = CacheKey {
        query: &request.query,
        case_sensitive: request.case_sensitive,
        regex: request.regex,
        word_boundary: request.word_boundary,
        extensions: normalize_extensions(&request.extensions),
        paths: canonical_paths(&request.paths),
        context_lines: request.context_lines,
        max_results: request.max_results,
    };
    serde_json::to_string(&key).unwrap_or_else(|_| format!("{:?}", key))
}

/// LRU map from cache key to rendered report
pub struct ResultCache {
    entries: LruCache<String, String>,
    hits: u64,
    misses: u64,
}

impl ResultCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Look up a report, marking it most recently used
    pub fn get(&mut self, key: &str) -> Option<&String> {
        match self.entries.get(key) {
            Some(report) => {
                self.hits += 1;
                Some(report)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Store a report, evicting the least recently used entry when full
    pub fn put(&mut self, key: String, report: String) {
        self.entries.put(key, report);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}
