//! Engine configuration
//!
//! Hosts build an `EngineConfig` directly or deserialize one; the CLI maps
//! its flags and `CODEPRESS_*` environment variables onto it.

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::time::Duration;

/// Default wall-clock limit for one external search
pub const DEFAULT_SEARCH_TIMEOUT_MS: u64 = 30_000;

/// Default cap on captured matcher output
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 16 * 1024 * 1024;

/// Default number of cached search reports
pub const DEFAULT_CACHE_CAPACITY: usize = 128;

/// Default cap on the bytes returned per fetched file
pub const DEFAULT_MAX_FILE_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Name or path of the ripgrep executable
    pub ripgrep_binary: String,
    /// Try ripgrep before the in-process scanner
    pub use_external_matcher: bool,
    pub search_timeout_ms: u64,
    pub max_output_bytes: usize,
    pub cache_capacity: usize,
    pub max_file_bytes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ripgrep_binary: "rg".to_string(),
            use_external_matcher: true,
            search_timeout_ms: DEFAULT_SEARCH_TIMEOUT_MS,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

impl EngineConfig {
    pub fn search_timeout(&self) -> Duration {
        Duration::from_millis(self.search_timeout_ms)
    }

    /// Cache capacity, never below one entry
    pub fn cache_capacity(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.cache_capacity).unwrap_or(NonZeroUsize::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.ripgrep_binary, "rg");
        assert!(config.use_external_matcher);
        assert_eq!(config.search_timeout(), Duration::from_secs(30));
        assert_eq!(config.cache_capacity().get(), DEFAULT_CACHE_CAPACITY);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let config = EngineConfig {
            cache_capacity: 0,
            ..EngineConfig::default()
        };
        assert_eq!(config.cache_capacity().get(), 1);
    }

    #[test]
    fn test_partial_deserialize() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"use_external_matcher": false, "cache_capacity": 4}"#).unwrap();
        assert!(!config.use_external_matcher);
        assert_eq!(config.cache_capacity, 4);
        assert_eq!(config.ripgrep_binary, "rg");
    }
}
