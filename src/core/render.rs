//! Renderer module
//!
//! Turns match outcomes and dependency graphs into the plain-text reports
//! handed back to the calling agent. Both search backends go through
//! `render_matches`, so their reports are byte-identical for the same hits.

use std::fmt::Write;

use crate::core::file_reader::FileSet;
use crate::core::model::{DepGraph, MatchOutcome};
use crate::core::util::plural;

/// Prefix of the matched line inside a context window
const MATCH_MARKER: &str = ">";
/// Prefix of surrounding context lines
const CONTEXT_MARKER: &str = " ";

/// Sentinel report for a query without hits
pub fn no_matches(query: &str) -> String {
    format!("No matches found for \"{}\"", query)
}

/// Trailer appended when the match cap was reached
pub fn truncation_marker(max_results: usize) -> String {
    format!(
        "[Results truncated: showing the first {}]",
        plural(max_results, "match", "matches")
    )
}

/// Render a grouped match report.
///
/// Each match gets a numbered window of `context_lines` lines before and
/// after it; the matched line is prefixed with `>`.
pub fn render_matches(
    query: &str,
    outcome: &MatchOutcome,
    files: &mut FileSet,
    context_lines: usize,
    max_results: usize,
) -> String {
    if outcome.is_empty() {
        return no_matches(query);
    }

    let mut output = String::new();
    let _ = writeln!(
        output,
        "Found {} for \"{}\" in {}{}",
        plural(outcome.total(), "match", "matches"),
        query,
        plural(outcome.files.len(), "file", "files"),
        if outcome.truncated { " (truncated)" } else { "" }
    );

    for file in &outcome.files {
        let _ = writeln!(
            output,
            "\n## {} ({})",
            file.path,
            plural(file.lines.len(), "match", "matches")
        );

        let record = files.get(&file.path);
        let lines = record.lines();

        for &line in &file.lines {
            output.push('\n');
            let _ = writeln!(output, "Line {}:", line);
            render_window(&mut output, &lines, line, context_lines);
        }
    }

    if outcome.truncated {
        output.push('\n');
        output.push_str(&truncation_marker(max_results));
        output.push('\n');
    }

    output
}

fn render_window(output: &mut String, lines: &[&str], line: usize, context_lines: usize) {
    if line == 0 || line > lines.len() {
        return;
    }

    let start = line.saturating_sub(context_lines).max(1);
    let end = (line + context_lines).min(lines.len());
    let width = end.to_string().len();

    for n in start..=end {
        let marker = if n == line { MATCH_MARKER } else { CONTEXT_MARKER };
        let _ = writeln!(
            output,
            "{} {:>width$} | {}",
            marker,
            n,
            lines[n - 1],
            width = width
        );
    }
}

/// Render a dependency graph as an indented text report
pub fn render_dep_graph(graph: &DepGraph) -> String {
    let mut output = String::new();
    let _ = writeln!(
        output,
        "Dependency graph for {} (depth {}, {})",
        graph.seed,
        graph.max_depth,
        plural(graph.len(), "file", "files")
    );

    for (path, node) in &graph.nodes {
        let _ = writeln!(output, "\n{} [depth {}]", path, node.depth);
        render_edge_list(&mut output, "imports", &node.imports);
        render_edge_list(&mut output, "imported by", &node.imported_by);
    }

    if !graph.cycles.is_empty() {
        output.push_str("\nCycles:\n");
        for cycle in &graph.cycles {
            let _ = writeln!(output, "  - {} -> {}", cycle.join(" -> "), cycle[0]);
        }
    }

    output
}

fn render_edge_list(output: &mut String, label: &str, paths: &[String]) {
    if paths.is_empty() {
        let _ = writeln!(output, "  {}: (none)", label);
        return;
    }

    let _ = writeln!(output, "  {}:", label);
    for path in paths {
        let _ = writeln!(output, "    - {}", path);
    }
}
