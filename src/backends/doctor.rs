//! Doctor - environment checks for the search backends

use std::fmt::Write;
use std::path::Path;

use crate::backends::ignore_rules::{discover_override_files, IGNORE_FILE_NAME};
use crate::config::EngineConfig;
use crate::core::util::command_exists;

/// Availability of one external dependency
#[derive(Debug, Clone)]
pub struct DependencyStatus {
    pub name: String,
    pub available: bool,
    pub command: Option<String>,
    pub required: bool,
    pub notes: Option<String>,
}

impl DependencyStatus {
    pub fn to_line(&self) -> String {
        let status = if self.available { "ok" } else { "missing" };
        let required = if self.required {
            "required"
        } else {
            "optional"
        };

        let mut line = format!(
            "[{}] {} ({}) - {}",
            status,
            self.name,
            required,
            self.command
                .as_ref()
                .map(|c| format!("found: {}", c))
                .unwrap_or_else(|| "not found".to_string())
        );

        if let Some(notes) = &self.notes {
            let _ = write!(line, "\n  Note: {}", notes);
        }
        line
    }
}

/// Check the external tools the engine can use
pub fn check_dependencies(config: &EngineConfig) -> Vec<DependencyStatus> {
    let rg_available = config.use_external_matcher && command_exists(&config.ripgrep_binary);
    let notes = if !config.use_external_matcher {
        "external matcher disabled; searches use the built-in scanner"
    } else if rg_available {
        "searches run through ripgrep"
    } else {
        "searches fall back to the built-in scanner. Install: brew install ripgrep / cargo install ripgrep"
    };

    vec![DependencyStatus {
        name: "ripgrep".to_string(),
        available: rg_available,
        command: rg_available.then(|| config.ripgrep_binary.clone()),
        required: false,
        notes: Some(notes.to_string()),
    }]
}

/// Full doctor report for a repository root
pub fn report(root: &Path, config: &EngineConfig) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Root: {}", root.display());

    for status in check_dependencies(config) {
        let _ = writeln!(output, "{}", status.to_line());
    }

    let overrides = discover_override_files(root);
    if overrides.is_empty() {
        let _ = writeln!(output, "No {} files found", IGNORE_FILE_NAME);
    } else {
        let _ = writeln!(output, "{} files:", IGNORE_FILE_NAME);
        for file in &overrides {
            let _ = writeln!(
                output,
                "  - {} ({} lines)",
                file.path.display(),
                file.lines.len()
            );
        }
    }

    let _ = writeln!(output, "Cache capacity: {}", config.cache_capacity());
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_missing_ripgrep_is_optional() {
        let config = EngineConfig {
            ripgrep_binary: "/nonexistent/bin/rg".into(),
            ..EngineConfig::default()
        };
        let deps = check_dependencies(&config);
        assert_eq!(deps.len(), 1);
        assert!(!deps[0].available);
        assert!(!deps[0].required);
        assert!(deps[0].to_line().starts_with("[missing] ripgrep (optional) - not found"));
    }

    #[test]
    fn test_disabled_matcher() {
        let config = EngineConfig {
            use_external_matcher: false,
            ..EngineConfig::default()
        };
        let deps = check_dependencies(&config);
        assert!(!deps[0].available);
        assert!(deps[0].to_line().contains("external matcher disabled"));
    }

    #[test]
    fn test_report_lists_override_files() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("src")).unwrap();
        fs::write(temp.path().join("src/.codepressignore"), "*.generated.ts\n").unwrap();

        let out = report(temp.path(), &EngineConfig::default());
        assert!(out.contains(".codepressignore files:"));
        assert!(out.contains("src/.codepressignore"));
        assert!(out.contains("Cache capacity: 128"));
    }
}
