//! Dependency graph analysis
//!
//! Answers "what does this file depend on" and "what depends on this file"
//! for a bounded neighbourhood around a seed file. Traversal is breadth
//! first: the seed is depth 1 and nodes keep the depth of their first
//! visit.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use tracing::debug;

use crate::backends::ignore_rules::IgnoreMatcher;
use crate::backends::imports::{extract_dependencies, SOURCE_EXTENSIONS};
use crate::backends::scan::walk_files;
use crate::core::model::{DepGraph, EngineError, GraphNode};
use crate::core::paths::resolve_in_root;

/// Import targets per file, computed once per graph build and restricted to
/// the enumerated source files.
struct ImportIndex<'a> {
    root: &'a Path,
    sources: HashSet<&'a str>,
    targets: HashMap<String, Vec<String>>,
}

impl<'a> ImportIndex<'a> {
    fn new(root: &'a Path, sources: &'a [String]) -> Self {
        Self {
            root,
            sources: sources.iter().map(String::as_str).collect(),
            targets: HashMap::new(),
        }
    }

    fn targets(&mut self, file: &str) -> &[String] {
        if !self.targets.contains_key(file) {
            let resolved: Vec<String> = extract_dependencies(self.root, file)
                .all_targets()
                .into_iter()
                .filter(|t| self.sources.contains(t.as_str()))
                .collect();
            self.targets.insert(file.to_string(), resolved);
        }
        self.targets.get(file).map(Vec::as_slice).unwrap_or(&[])
    }

    fn imports(&mut self, candidate: &str, target: &str) -> bool {
        self.targets(candidate).iter().any(|t| t == target)
    }
}

/// Build the dependency graph around `seed`.
///
/// `max_depth` is clamped to at least 1 (the seed alone). Fails with
/// `NotFound` when the seed is not a file on disk.
pub fn build_graph(
    root: &Path,
    seed: &str,
    max_depth: usize,
    matcher: &IgnoreMatcher,
) -> Result<DepGraph, EngineError> {
    let (abs, seed_rel) =
        resolve_in_root(root, seed).ok_or_else(|| EngineError::OutsideRoot(seed.to_string()))?;
    if seed_rel.is_empty() || !abs.is_file() {
        return Err(EngineError::NotFound(seed.to_string()));
    }

    let max_depth = max_depth.max(1);
    let extensions: Vec<String> = SOURCE_EXTENSIONS.iter().map(|e| e.to_string()).collect();
    let sources = walk_files(root, &[], &extensions, matcher);
    let mut index = ImportIndex::new(root, &sources);

    let mut graph = DepGraph::new(seed_rel.clone(), max_depth);
    let mut visited: HashSet<String> = HashSet::new();
    let mut frontier: VecDeque<(String, usize)> = VecDeque::new();
    visited.insert(seed_rel.clone());
    frontier.push_back((seed_rel, 1));

    while let Some((file, depth)) = frontier.pop_front() {
        let imports = index.targets(&file).to_vec();
        let imported_by: Vec<String> = sources
            .iter()
            .filter(|candidate| index.imports(candidate, &file))
            .cloned()
            .collect();

        if depth < max_depth {
            for next in imports.iter().chain(imported_by.iter()) {
                if visited.insert(next.clone()) {
                    frontier.push_back((next.clone(), depth + 1));
                }
            }
        }

        graph.nodes.insert(
            file,
            GraphNode {
                depth,
                imports,
                imported_by,
            },
        );
    }

    graph.cycles = find_cycles(&graph);
    debug!(
        seed = %graph.seed,
        nodes = graph.len(),
        cycles = graph.cycles.len(),
        "built dependency graph"
    );
    Ok(graph)
}

/// Detect import cycles among the visited nodes
pub fn find_cycles(graph: &DepGraph) -> Vec<Vec<String>> {
    let mut cycles = Vec::new();
    let mut visited = HashSet::new();
    let mut rec_stack = HashSet::new();
    let mut path = Vec::new();

    for file in graph.nodes.keys() {
        if !visited.contains(file.as_str()) {
            dfs_cycle(graph, file, &mut visited, &mut rec_stack, &mut path, &mut cycles);
        }
    }

    cycles
}

fn dfs_cycle<'g>(
    graph: &'g DepGraph,
    node: &'g str,
    visited: &mut HashSet<&'g str>,
    rec_stack: &mut HashSet<&'g str>,
    path: &mut Vec<&'g str>,
    cycles: &mut Vec<Vec<String>>,
) {
    visited.insert(node);
    rec_stack.insert(node);
    path.push(node);

    if let Some(entry) = graph.nodes.get(node) {
        for dep in &entry.imports {
            let dep = dep.as_str();
            if !graph.nodes.contains_key(dep) {
                continue;
            }
            if !visited.contains(dep) {
                dfs_cycle(graph, dep, visited, rec_stack, path, cycles);
            } else if rec_stack.contains(dep) {
                let start = path.iter().position(|p| *p == dep).unwrap_or(0);
                cycles.push(path[start..].iter().map(|p| p.to_string()).collect());
            }
        }
    }

    path.pop();
    rec_stack.remove(node);
}
