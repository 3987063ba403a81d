//! CLI module - Command-line interface definitions and handlers

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use codepress_scope::backends::doctor;
use codepress_scope::config::{
    EngineConfig, DEFAULT_CACHE_CAPACITY, DEFAULT_MAX_FILE_BYTES, DEFAULT_MAX_OUTPUT_BYTES,
    DEFAULT_SEARCH_TIMEOUT_MS,
};
use codepress_scope::core::model::{SearchRequest, DEFAULT_CONTEXT_LINES, DEFAULT_MAX_RESULTS};
use codepress_scope::engine::Engine;

/// codepress - serve code context (files, search hits, dependency graphs) to coding agents.
#[derive(Parser, Debug)]
#[command(name = "codepress")]
#[command(
    author,
    version,
    about,
    long_about = r#"codepress answers the questions a coding agent asks about a repository
and prints plain-text reports ready to paste into a prompt.

Every path in a report is relative to ROOT. Files matched by the built-in
ignore patterns or by any .codepressignore are never returned.

Examples:
    codepress search "TODO" --ext ts --ext tsx
    codepress search "use(State|Effect)" --regex --path src
    codepress deps src/index.ts --depth 2
    codepress fetch package.json src/index.ts
    codepress snippet src/app.ts "createServer" --context 3
"#
)]
pub struct Cli {
    /// Repository root for all operations.
    #[arg(
        long,
        global = true,
        default_value = ".",
        value_name = "ROOT",
        env = "CODEPRESS_ROOT",
        long_help = "Repository root for all operations (defaults to the current directory).\n\n\
Relative paths given to any command are interpreted against this root, and\n\
paths outside it are rejected."
    )]
    pub root: PathBuf,

    /// Quiet mode (errors only on stderr).
    #[arg(
        short,
        long,
        global = true,
        conflicts_with = "verbose",
        long_help = "Only log errors to stderr. Reports are still printed to stdout.\n\n\
RUST_LOG, when set, takes precedence."
    )]
    pub quiet: bool,

    /// Verbose mode (debug diagnostics on stderr).
    #[arg(
        short,
        long,
        global = true,
        long_help = "Log debug diagnostics (matcher selection, fallbacks, cache hits) to stderr.\n\n\
RUST_LOG, when set, takes precedence."
    )]
    pub verbose: bool,

    /// ripgrep executable to use for searches.
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        env = "CODEPRESS_RG_BINARY",
        default_value = "rg"
    )]
    pub rg_binary: String,

    /// Always use the built-in scanner instead of ripgrep.
    #[arg(long, global = true, env = "CODEPRESS_NO_EXTERNAL_MATCHER")]
    pub no_external_matcher: bool,

    /// Timeout for one ripgrep run, in milliseconds.
    #[arg(
        long,
        global = true,
        value_name = "MS",
        env = "CODEPRESS_SEARCH_TIMEOUT_MS",
        default_value_t = DEFAULT_SEARCH_TIMEOUT_MS,
        long_help = "Wall-clock limit for one ripgrep run, in milliseconds.\n\n\
When it expires the process is killed and the search falls back to the\n\
built-in scanner."
    )]
    pub search_timeout_ms: u64,

    /// Maximum bytes of ripgrep output to accept.
    #[arg(
        long,
        global = true,
        value_name = "BYTES",
        env = "CODEPRESS_MAX_OUTPUT_BYTES",
        default_value_t = DEFAULT_MAX_OUTPUT_BYTES
    )]
    pub max_output_bytes: usize,

    /// Number of search reports kept in the cache.
    #[arg(
        long,
        global = true,
        value_name = "N",
        env = "CODEPRESS_CACHE_CAPACITY",
        default_value_t = DEFAULT_CACHE_CAPACITY
    )]
    pub cache_capacity: usize,

    /// Maximum bytes returned per fetched file.
    #[arg(
        long,
        global = true,
        value_name = "BYTES",
        env = "CODEPRESS_MAX_FILE_BYTES",
        default_value_t = DEFAULT_MAX_FILE_BYTES
    )]
    pub max_file_bytes: usize,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            ripgrep_binary: self.rg_binary.clone(),
            use_external_matcher: !self.no_external_matcher,
            search_timeout_ms: self.search_timeout_ms,
            max_output_bytes: self.max_output_bytes,
            cache_capacity: self.cache_capacity,
            max_file_bytes: self.max_file_bytes,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Full-text search across the repository.
    #[command(
        long_about = r#"Search every non-ignored file under ROOT and print the matches grouped by
file, each with a numbered window of surrounding lines.

QUERY is a literal string unless --regex is given. Matching is
case-insensitive unless --case-sensitive is given. ripgrep is used when
available; otherwise the built-in scanner produces the same report.

Examples:
    codepress search "TODO"
    codepress search "fetchUser" --word --ext ts
    codepress search "import .* from 'react'" --regex --path src --max-results 50
"#
    )]
    Search {
        /// Text or pattern to search for.
        #[arg(value_name = "QUERY")]
        query: String,

        /// Match case exactly.
        #[arg(long)]
        case_sensitive: bool,

        /// Treat QUERY as a regular expression.
        #[arg(long)]
        regex: bool,

        /// Only match QUERY at word boundaries.
        #[arg(long)]
        word: bool,

        /// Restrict to files with this extension (repeatable).
        #[arg(long = "ext", value_name = "EXT")]
        extensions: Vec<String>,

        /// Restrict to this file or directory under ROOT (repeatable).
        #[arg(long = "path", value_name = "PATH")]
        paths: Vec<String>,

        /// Lines of context around each match.
        #[arg(long, value_name = "N", default_value_t = DEFAULT_CONTEXT_LINES)]
        context: usize,

        /// Stop after this many matches.
        #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_RESULTS)]
        max_results: usize,
    },

    /// Show what a file imports and what imports it.
    #[command(
        long_about = "Build the dependency graph around FILE by following relative\n\
JavaScript/TypeScript imports, re-exports and require calls in both directions.\n\n\
FILE itself is depth 1; --depth 2 adds its direct neighbours, and so on.\n\
Package imports (e.g. 'react') are not followed.\n\n\
Examples:\n\
  codepress deps src/index.ts\n\
  codepress deps src/api/client.ts --depth 3 --json\n"
    )]
    Deps {
        /// Seed file (relative to ROOT unless absolute).
        #[arg(value_name = "FILE")]
        file: String,

        /// Traversal depth (1 = the file alone).
        #[arg(long, value_name = "N", default_value_t = 1)]
        depth: usize,

        /// Print the graph as JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Print the content of one or more files.
    #[command(
        long_about = "Print each file under a `=== path ===` header. Files that are missing,\n\
outside ROOT or unreadable get an error marker instead of content.\n\n\
Example:\n\
  codepress fetch package.json src/index.ts\n"
    )]
    Fetch {
        /// Files to print (relative to ROOT unless absolute).
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<String>,
    },

    /// Find exact text in one file and show it in context.
    #[command(
        long_about = "Case-sensitive literal search inside a single file, reported in the same\n\
format as `search`.\n\n\
Example:\n\
  codepress snippet src/server.ts \"app.listen\" --context 3\n"
    )]
    Snippet {
        /// File to search (relative to ROOT unless absolute).
        #[arg(value_name = "PATH")]
        path: String,

        /// Exact text to find.
        #[arg(value_name = "TEXT")]
        text: String,

        /// Lines of context around each match.
        #[arg(long, value_name = "N", default_value_t = DEFAULT_CONTEXT_LINES)]
        context: usize,
    },

    /// Check external dependencies and ignore configuration.
    #[command(
        long_about = "Report whether ripgrep is available (searches fall back to the built-in\n\
scanner when it is not) and list the .codepressignore files found under ROOT.\n\n\
Example:\n\
  codepress doctor\n"
    )]
    Doctor,
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> Result<()> {
    let config = cli.engine_config();
    let mut engine = Engine::new(&cli.root, config)
        .with_context(|| format!("Cannot open repository root {}", cli.root.display()))?;

    match cli.command {
        Commands::Search {
            query,
            case_sensitive,
            regex,
            word,
            extensions,
            paths,
            context,
            max_results,
        } => {
            let request = SearchRequest::new(query)
                .case_sensitive(case_sensitive)
                .regex(regex)
                .word_boundary(word)
                .extensions(extensions)
                .paths(paths)
                .context_lines(context)
                .max_results(max_results);
            print_report(&engine.search_repo(&request));
        }

        Commands::Deps { file, depth, json } => {
            if json {
                let graph = engine.dependency_graph(&file, depth)?;
                println!("{}", serde_json::to_string_pretty(&graph)?);
            } else {
                print_report(&engine.dep_graph(&file, depth));
            }
        }

        Commands::Fetch { paths } => print_report(&engine.fetch_files(&paths)),

        Commands::Snippet {
            path,
            text,
            context,
        } => print_report(&engine.fetch_snippet(&path, &text, context)),

        Commands::Doctor => print_report(&doctor::report(engine.root(), engine.config())),
    }

    Ok(())
}

fn print_report(report: &str) {
    if report.ends_with('\n') {
        print!("{}", report);
    } else {
        println!("{}", report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_from_flags() {
        let cli = Cli::parse_from([
            "codepress",
            "--no-external-matcher",
            "--cache-capacity",
            "4",
            "search",
            "TODO",
        ]);
        let config = cli.engine_config();
        assert!(!config.use_external_matcher);
        assert_eq!(config.cache_capacity, 4);
        assert_eq!(config.ripgrep_binary, "rg");
    }

    #[test]
    fn test_search_flags() {
        let cli = Cli::parse_from([
            "codepress", "search", "foo", "--ext", "ts", "--ext", "js", "--path", "src", "--word",
        ]);
        match cli.command {
            Commands::Search {
                extensions,
                paths,
                word,
                context,
                ..
            } => {
                assert_eq!(extensions, vec!["ts", "js"]);
                assert_eq!(paths, vec!["src"]);
                assert!(word);
                assert_eq!(context, DEFAULT_CONTEXT_LINES);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
