//! ripgrep integration
//!
//! Runs `rg --json` under a timeout and an output cap, then parses the
//! match events into a `MatchOutcome`. Paths rg reports are re-checked
//! against the infrastructure skip list, the layered ignore rules and the
//! binary-file rule, so the result matches what the built-in scanner sees.

use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::backends::ignore_rules::IgnoreMatcher;
use crate::backends::scan::{has_infra_component, INFRA_DIRS};
use crate::backends::search::{Matcher, MatcherError, PreparedQuery, QueryMode, SearchContext};
use crate::config::EngineConfig;
use crate::core::file_reader::{is_binary_file, FileSet};
use crate::core::model::{MatchOutcome, MatchRecord};
use crate::core::paths::{clean_relative, make_relative, to_root_relative};
use crate::core::util::command_exists;

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const READ_CHUNK: usize = 64 * 1024;

/// One line of `rg --json` output. Only `match` events carry what we need;
/// everything else deserializes with empty data and is skipped.
#[derive(Debug, Deserialize)]
struct RgEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: RgEventData,
}

#[derive(Debug, Default, Deserialize)]
struct RgEventData {
    path: Option<RgText>,
    line_number: Option<u64>,
}

/// rg emits `{"text": ...}` for UTF-8 data and `{"bytes": ...}` otherwise
#[derive(Debug, Deserialize)]
struct RgText {
    text: Option<String>,
}

/// External matcher backed by the ripgrep binary
#[derive(Debug, Clone)]
pub struct RipgrepMatcher {
    binary: String,
    timeout: Duration,
    max_output_bytes: usize,
}

impl RipgrepMatcher {
    pub fn new(binary: impl Into<String>, timeout: Duration, max_output_bytes: usize) -> Self {
        Self {
            binary: binary.into(),
            timeout,
            max_output_bytes,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.ripgrep_binary.clone(),
            config.search_timeout(),
            config.max_output_bytes,
        )
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Assemble the rg invocation, or `None` when every scope path was
    /// rejected and there is nothing to search.
    fn build_command(&self, ctx: &SearchContext<'_>, query: &PreparedQuery) -> Option<Command> {
        let mut cmd = Command::new(&self.binary);
        cmd.current_dir(ctx.root)
            .arg("--json")
            .arg("--line-number")
            .arg("--sort")
            .arg("path")
            .arg("--no-config")
            .arg("--no-ignore")
            .arg("--hidden")
            // Binary detection happens in the post-filter
            .arg("--text")
            .arg("--encoding")
            .arg("none");

        cmd.arg(if query.case_sensitive {
            "--case-sensitive"
        } else {
            "--ignore-case"
        });
        if query.mode == QueryMode::Fixed {
            cmd.arg("--fixed-strings");
        }

        for ext in &query.extensions {
            cmd.arg("-g").arg(format!("*.{}", ext));
        }
        for dir in INFRA_DIRS {
            cmd.arg("-g").arg(format!("!{}/", dir));
        }
        // Root-level override rules anchor correctly against the working
        // directory; nested ones are applied by the post-filter.
        for file in ctx.overrides.iter().filter(|f| f.anchor_dir.is_empty()) {
            cmd.arg("--ignore-file").arg(&file.path);
        }

        cmd.arg("-e").arg(&query.pattern).arg("--");

        if query.paths.is_empty() {
            cmd.arg(".");
        } else {
            let scopes: Vec<String> = query
                .paths
                .iter()
                .filter_map(|p| to_root_relative(ctx.root, p))
                .filter(|rel| ctx.root.join(rel).exists())
                .filter(|rel| !has_infra_component(rel))
                .collect();
            if scopes.is_empty() {
                return None;
            }
            for scope in scopes {
                cmd.arg(if scope.is_empty() { ".".to_string() } else { scope });
            }
        }

        Some(cmd)
    }
}

impl Matcher for RipgrepMatcher {
    fn name(&self) -> &'static str {
        "ripgrep"
    }

    fn is_available(&self) -> bool {
        command_exists(&self.binary)
    }

    fn find(
        &self,
        ctx: &SearchContext<'_>,
        query: &PreparedQuery,
        _files: &mut FileSet,
    ) -> Result<MatchOutcome, MatcherError> {
        let Some(cmd) = self.build_command(ctx, query) else {
            return Ok(MatchOutcome::default());
        };

        debug!(binary = %self.binary, pattern = %query.pattern, "running ripgrep");
        let (status, stdout) = run_bounded(cmd, &self.binary, self.timeout, self.max_output_bytes)?;

        // rg exits 1 when nothing matched
        match status.code() {
            Some(0) | Some(1) => {}
            _ => return Err(MatcherError::ExitStatus(status.to_string())),
        }

        let stdout = String::from_utf8_lossy(&stdout);
        Ok(parse_json_output(
            &stdout,
            ctx.root,
            ctx.ignore,
            query.max_results,
        ))
    }
}

/// Parse `rg --json` output into grouped matches.
///
/// Malformed lines and non-match events are skipped. Paths are normalized
/// to root-relative form and dropped when they sit under an infrastructure
/// directory, the ignore rules exclude them, or the file contains a NUL.
pub fn parse_json_output(
    stdout: &str,
    root: &Path,
    ignore: &IgnoreMatcher,
    max_results: usize,
) -> MatchOutcome {
    let mut outcome = MatchOutcome::default();
    let mut count = 0usize;
    let mut binary: HashMap<String, bool> = HashMap::new();

    for line in stdout.lines() {
        if line.trim().is_empty() {
            continue;
        }

        let event: RgEvent = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(e) => {
                trace!(error = %e, "skipping malformed rg line");
                continue;
            }
        };
        if event.kind != "match" {
            continue;
        }

        let Some(raw_path) = event.data.path.and_then(|p| p.text) else {
            continue;
        };
        let Some(line_number) = event
            .data
            .line_number
            .and_then(|n| usize::try_from(n).ok())
        else {
            continue;
        };
        let Some(rel) = normalize_rg_path(&raw_path, root) else {
            continue;
        };
        if has_infra_component(&rel) || ignore.is_ignored(&rel, false) {
            continue;
        }
        let is_binary = *binary
            .entry(rel.clone())
            .or_insert_with(|| is_binary_file(&root.join(&rel)));
        if is_binary {
            continue;
        }

        if count == max_results {
            outcome.truncated = true;
            break;
        }
        outcome.push(MatchRecord {
            path: rel,
            line: line_number,
        });
        count += 1;
    }

    outcome
}

fn normalize_rg_path(raw: &str, root: &Path) -> Option<String> {
    let path = Path::new(raw);
    let rel = if path.is_absolute() {
        make_relative(path, root)?
    } else {
        raw.to_string()
    };
    let rel = clean_relative(rel.strip_prefix("./").unwrap_or(&rel))?;
    if rel.is_empty() {
        None
    } else {
        Some(rel)
    }
}

/// Run a command with stdout captured, killing it when it outlives
/// `timeout` or writes more than `max_bytes`.
///
/// On those paths the reader thread is detached rather than joined: a
/// grandchild that inherited the pipe can keep it open after the child dies.
fn run_bounded(
    mut cmd: Command,
    binary: &str,
    timeout: Duration,
    max_bytes: usize,
) -> Result<(ExitStatus, Vec<u8>), MatcherError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());

    let mut child = cmd.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            MatcherError::Unavailable(binary.to_string())
        } else {
            MatcherError::Spawn {
                binary: binary.to_string(),
                source: e,
            }
        }
    })?;

    let Some(mut stdout) = child.stdout.take() else {
        stop(&mut child);
        return Err(MatcherError::Io(std::io::Error::other(
            "child stdout was not captured",
        )));
    };

    let overflow = Arc::new(AtomicBool::new(false));
    let reader_overflow = Arc::clone(&overflow);
    let reader = thread::spawn(move || {
        let mut buf = Vec::new();
        let mut chunk = vec![0u8; READ_CHUNK];
        loop {
            match stdout.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    if buf.len() + n > max_bytes {
                        reader_overflow.store(true, Ordering::SeqCst);
                        break;
                    }
                    buf.extend_from_slice(&chunk[..n]);
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
        buf
    });

    let start = Instant::now();
    let status = loop {
        if overflow.load(Ordering::SeqCst) {
            stop(&mut child);
            return Err(MatcherError::OutputTooLarge(max_bytes));
        }

        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if start.elapsed() >= timeout {
                    stop(&mut child);
                    return Err(MatcherError::Timeout(timeout));
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                stop(&mut child);
                return Err(MatcherError::Io(e));
            }
        }
    };

    // The child is gone but a leftover grandchild may still hold stdout
    while !reader.is_finished() {
        if start.elapsed() >= timeout {
            return Err(MatcherError::Timeout(timeout));
        }
        thread::sleep(POLL_INTERVAL);
    }

    let buf = reader
        .join()
        .map_err(|_| MatcherError::Io(std::io::Error::other("stdout reader panicked")))?;
    if overflow.load(Ordering::SeqCst) {
        return Err(MatcherError::OutputTooLarge(max_bytes));
    }

    Ok((status, buf))
}

fn stop(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}
