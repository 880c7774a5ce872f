//! Configuration management for tijo
//!
//! Config is stored at ~/.config/tijo/config.toml

use crate::error::{TijoError, TijoResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Default template registry API
pub const DEFAULT_API_URL: &str = "http://api.tijo.io/v1";

/// Default cache folder, `~` is expanded against the home directory
pub const DEFAULT_CACHE_DIR: &str = "~/.tijo";

/// Default number of templates kept per command
pub const DEFAULT_LRU_CAPACITY: usize = 100;

/// Default number of commands kept warm in memory
pub const DEFAULT_REGISTRY_CAPACITY: usize = 1000;

/// Default HTTP timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Config directory name
const CONFIG_DIR: &str = "tijo";

/// Config file name
const CONFIG_FILE: &str = "config.toml";

/// tijo configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the template registry
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Cache folder; an empty string disables caching
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,

    /// Per-command template capacity (0 = unbounded)
    #[serde(default = "default_lru_capacity")]
    pub lru_capacity: usize,

    /// Number of per-command caches held in memory (0 = unbounded)
    #[serde(default = "default_registry_capacity")]
    pub registry_capacity: usize,

    /// HTTP timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Skip TLS certificate verification
    #[serde(default)]
    pub insecure: bool,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_cache_dir() -> String {
    DEFAULT_CACHE_DIR.to_string()
}

fn default_lru_capacity() -> usize {
    DEFAULT_LRU_CAPACITY
}

fn default_registry_capacity() -> usize {
    DEFAULT_REGISTRY_CAPACITY
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            cache_dir: default_cache_dir(),
            lru_capacity: default_lru_capacity(),
            registry_capacity: default_registry_capacity(),
            timeout_secs: default_timeout_secs(),
            insecure: false,
        }
    }
}

impl Config {
    /// Get the config directory path (~/.config/tijo/)
    pub fn dir_path() -> TijoResult<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(CONFIG_DIR))
            .ok_or_else(|| TijoError::ConfigError("Could not determine config directory".into()))
    }

    /// Get the config file path (~/.config/tijo/config.toml)
    pub fn file_path() -> TijoResult<PathBuf> {
        Self::dir_path().map(|p| p.join(CONFIG_FILE))
    }

    /// Check if config file exists
    pub fn exists() -> bool {
        Self::file_path().map(|p| p.exists()).unwrap_or(false)
    }

    /// Load config from file, returning defaults if file doesn't exist
    pub fn load() -> TijoResult<Self> {
        let path = Self::file_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path).map_err(TijoError::IoError)?;
        Self::from_toml(&contents)
    }

    /// Parse config contents; blank input yields defaults
    pub fn from_toml(contents: &str) -> TijoResult<Self> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        toml::from_str(contents)
            .map_err(|e| TijoError::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Save config to file, creating directories if needed
    pub fn save(&self) -> TijoResult<()> {
        let dir = Self::dir_path()?;
        let path = Self::file_path()?;

        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(TijoError::IoError)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| TijoError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        fs::write(&path, contents).map_err(TijoError::IoError)?;

        Ok(())
    }

    /// Validate the config values
    pub fn validate(&self) -> TijoResult<()> {
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(TijoError::ConfigError(
                "API URL must start with http:// or https://".into(),
            ));
        }

        if self.timeout_secs == 0 {
            return Err(TijoError::ConfigError(
                "Timeout must be at least one second".into(),
            ));
        }

        Ok(())
    }

    /// Resolved cache folder, or `None` when caching is disabled
    pub fn cache_path(&self) -> Option<PathBuf> {
        expand_home(&self.cache_dir)
    }
}

/// Expand a leading `~` to the home directory. Blank paths disable caching.
pub fn expand_home(path: &str) -> Option<PathBuf> {
    let path = path.trim();
    if path.is_empty() {
        return None;
    }

    if path == "~" {
        return dirs::home_dir();
    }

    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir().map(|home| home.join(rest)),
        None => Some(PathBuf::from(path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_config_uses_defaults() {
        let config = Config::from_toml("  \n").unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.lru_capacity, DEFAULT_LRU_CAPACITY);
        assert_eq!(config.registry_capacity, DEFAULT_REGISTRY_CAPACITY);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(!config.insecure);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config = Config::from_toml("lru_capacity = 5\ncache_dir = \"/tmp/tijo\"").unwrap();
        assert_eq!(config.lru_capacity, 5);
        assert_eq!(config.cache_path(), Some(PathBuf::from("/tmp/tijo")));
        assert_eq!(config.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = Config::from_toml("lru_capacity = \"many\"").unwrap_err();
        assert!(matches!(err, TijoError::ConfigError(_)));
    }

    #[test]
    fn test_validate() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.api_url = "ftp://api.tijo.io".into();
        assert!(config.validate().is_err());

        config.api_url = DEFAULT_API_URL.into();
        config.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home(""), None);
        assert_eq!(expand_home("/var/cache"), Some(PathBuf::from("/var/cache")));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/.tijo"), Some(home.join(".tijo")));
        }
    }
}
