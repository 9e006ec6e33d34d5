//! Typed, serde-deserialized configuration loaded once at startup.
//!
//! Replaces the "dynamic attribute-chain" configuration walk of the
//! original implementation with a plain struct; services take the slices
//! they need as constructor parameters rather than reaching into a global.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::pagination::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_format: LogFormat,
    pub request_timeout_secs: u64,
    pub default_page_limit: usize,
    pub max_page_limit: usize,
    pub metadata_backend: MetadataBackendConfig,
    pub block_backend: BlockBackendConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            log_format: LogFormat::Auto,
            request_timeout_secs: 30,
            default_page_limit: DEFAULT_PAGE_LIMIT,
            max_page_limit: MAX_PAGE_LIMIT,
            metadata_backend: MetadataBackendConfig::default(),
            block_backend: BlockBackendConfig::default(),
        }
    }
}

/// Selects the metadata backend implementation by a configuration tag
/// (see `backends::registry`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataBackendConfig {
    pub kind: String,
}

impl Default for MetadataBackendConfig {
    fn default() -> Self {
        Self {
            kind: "memory".to_string(),
        }
    }
}

/// Selects the block storage backend implementation by a configuration tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockBackendConfig {
    pub kind: String,
    /// Root directory for the `filesystem` backend.
    pub base_dir: String,
}

impl Default for BlockBackendConfig {
    fn default() -> Self {
        Self {
            kind: "memory".to_string(),
            base_dir: "./deuce-data/blocks".to_string(),
        }
    }
}

/// Log output format. `Auto` resolves to `Json` when stdout is not a TTY,
/// and to `Text` otherwise, mirroring tools that want machine-readable
/// logs in production and readable ones in a developer's terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Text,
    Auto,
}

impl LogFormat {
    pub fn resolve(self) -> Self {
        match self {
            LogFormat::Auto => {
                if atty_stdout_is_terminal() {
                    LogFormat::Text
                } else {
                    LogFormat::Json
                }
            }
            other => other,
        }
    }
}

fn atty_stdout_is_terminal() -> bool {
    use std::io::IsTerminal;
    std::io::stdout().is_terminal()
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| Error::BadRequest(format!("failed to read config {}: {e}", path.display())))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::BadRequest(format!("failed to parse config {}: {e}", path.display())))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_in_memory_backends() {
        let config = Config::default();
        assert_eq!(config.metadata_backend.kind, "memory");
        assert_eq!(config.block_backend.kind, "memory");
        assert_eq!(config.default_page_limit, DEFAULT_PAGE_LIMIT);
    }

    #[test]
    fn from_file_parses_toml() {
        let dir = std::env::temp_dir().join(format!("deuce-config-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "host = \"0.0.0.0\"\nport = 9000\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9000);

        std::fs::remove_dir_all(&dir).ok();
    }
}
