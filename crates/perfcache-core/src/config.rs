//! Cache configuration.
//!
//! Loaded from TOML; every field is optional and falls back to its default.
//!
//! ```toml
//! key_strategy = "sequential"
//! slow_enumeration_ms = 500
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, CacheResult};
use crate::key::KeyStrategy;

fn default_slow_enumeration_ms() -> u64 {
    250
}

/// Tunables for [`CounterFacade`](crate::CounterFacade).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// How integer keys are derived.
    pub key_strategy: KeyStrategy,

    /// First-time category binding slower than this is logged as a warning.
    pub slow_enumeration_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            key_strategy: KeyStrategy::default(),
            slow_enumeration_ms: default_slow_enumeration_ms(),
        }
    }
}

impl CacheConfig {
    /// Parses configuration from TOML text.
    pub fn from_toml_str(content: &str) -> CacheResult<Self> {
        toml::from_str(content)
            .map_err(|e| CacheError::config(format!("Failed to parse config: {}", e)))
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> CacheResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            CacheError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            CacheError::Config { message } => {
                CacheError::config(format!("{} ({})", message, path.display()))
            }
            other => other,
        })
    }

    /// Serializes the configuration back to TOML.
    pub fn to_toml_string(&self) -> CacheResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| CacheError::config(format!("Failed to serialize config: {}", e)))
    }

    /// Threshold above which a category build is reported as slow.
    pub fn slow_enumeration(&self) -> Duration {
        Duration::from_millis(self.slow_enumeration_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.key_strategy, KeyStrategy::Hash);
        assert_eq!(config.slow_enumeration(), Duration::from_millis(250));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = CacheConfig::from_toml_str(r#"key_strategy = "sequential""#).unwrap();
        assert_eq!(config.key_strategy, KeyStrategy::Sequential);
        assert_eq!(config.slow_enumeration_ms, 250);

        let empty = CacheConfig::from_toml_str("").unwrap();
        assert_eq!(empty, CacheConfig::default());
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            CacheConfig::from_toml_str("key_strategy = \"random\""),
            Err(CacheError::Config { .. })
        ));
        assert!(matches!(
            CacheConfig::from_toml_str("slow_enumeration_ms = ["),
            Err(CacheError::Config { .. })
        ));
    }

    #[test]
    fn test_toml_serialization() {
        let config = CacheConfig {
            key_strategy: KeyStrategy::Sequential,
            slow_enumeration_ms: 10,
        };
        let text = config.to_toml_string().unwrap();
        assert!(text.contains("sequential"));
        assert_eq!(CacheConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "slow_enumeration_ms = 1000").unwrap();
        let config = CacheConfig::from_file(file.path()).unwrap();
        assert_eq!(config.slow_enumeration_ms, 1000);

        assert!(matches!(
            CacheConfig::from_file("/nonexistent/perfcache.toml"),
            Err(CacheError::Config { .. })
        ));
    }
}
