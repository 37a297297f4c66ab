//! Configuration loading.
//!
//! Configuration is loaded from a TOML file with the following resolution order:
//! 1. Explicit path (must exist)
//! 2. `$FLEAMARK_CONFIG` (must exist when set)
//! 3. `<config dir>/fleamark/config.toml` (e.g. `~/.config/fleamark/config.toml`)
//! 4. Built-in defaults
//!
//! Every field has a default, so a partial file is fine. The recognition
//! service API key is never stored in the file; `[recognizer] api_key_env`
//! names the environment variable that holds it.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::{CacheConfig, SearchCacheConfig};
use crate::recognizer::{RecognitionStrategy, RetryConfig};
use crate::{FleamarkError, Result};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "FLEAMARK_CONFIG";

/// Library configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub recognition: RecognitionConfig,
    #[serde(default)]
    pub recognizer: Option<RecognizerConfig>,
}

/// Cache sizing and sweep period.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CacheSection {
    /// Expiry sweep period in seconds; 0 disables the sweep (default: 60).
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    #[serde(default)]
    pub text: StoreConfig,
    #[serde(default)]
    pub image: StoreConfig,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval(),
            text: StoreConfig::default(),
            image: StoreConfig::default(),
        }
    }
}

fn default_sweep_interval() -> u64 {
    60
}

/// Capacity and TTL of one cache store.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StoreConfig {
    /// Maximum entries before LRU eviction (default: 100).
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    /// Default entry lifetime in seconds (default: 300).
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            ttl_secs: default_ttl(),
        }
    }
}

impl StoreConfig {
    fn to_cache_config(&self) -> CacheConfig {
        CacheConfig::new()
            .max_entries(self.max_entries)
            .ttl(Duration::from_secs(self.ttl_secs))
    }
}

fn default_max_entries() -> usize {
    100
}

fn default_ttl() -> u64 {
    300
}

/// Snapshot storage.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StorageConfig {
    /// Persist caches across restarts (default: true).
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Snapshot directory (default: `<cache dir>/fleamark`).
    #[serde(default)]
    pub dir: Option<PathBuf>,
    /// Largest snapshot blob accepted, in bytes.
    #[serde(default)]
    pub max_blob_bytes: Option<usize>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
            max_blob_bytes: None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Recognition behaviour.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecognitionConfig {
    #[serde(default)]
    pub strategy: RecognitionStrategy,
    /// Deadline for a single recognizer call in milliseconds (default: 15000).
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Largest accepted image in bytes (default: 10 MiB).
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: u64,
    #[serde(default)]
    pub retry: RetrySection,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            strategy: RecognitionStrategy::default(),
            timeout_ms: default_timeout_ms(),
            max_image_bytes: default_max_image_bytes(),
            retry: RetrySection::default(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    15_000
}

fn default_max_image_bytes() -> u64 {
    10 * 1024 * 1024
}

/// Retry policy for the primary recognizer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RetrySection {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    30_000
}

/// Remote recognition service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecognizerConfig {
    pub base_url: String,
    /// Environment variable holding the bearer token (default: FLEAMARK_RECOGNIZER_KEY).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_api_key_env() -> String {
    "FLEAMARK_RECOGNIZER_KEY".to_string()
}

impl RecognizerConfig {
    /// The API key from the configured environment variable, if set.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// Falls back to defaults when no file is found; an explicitly named
    /// file that does not exist is an error.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Parse a TOML config file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            FleamarkError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            FleamarkError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    /// Resolve the config file path, if any.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            return Self::require(path.to_path_buf());
        }

        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR).filter(|p| !p.is_empty()) {
            return Self::require(PathBuf::from(path));
        }

        if let Some(dir) = dirs::config_dir() {
            let user_config = dir.join("fleamark").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        Ok(None)
    }

    fn require(path: PathBuf) -> Result<Option<PathBuf>> {
        if path.exists() {
            Ok(Some(path))
        } else {
            Err(FleamarkError::Configuration(format!(
                "Config file not found: {path:?}"
            )))
        }
    }

    /// Cache sizing for both stores.
    pub fn search_cache_config(&self) -> SearchCacheConfig {
        let sweep = self.cache.sweep_interval_secs;
        SearchCacheConfig {
            text: self.cache.text.to_cache_config(),
            image: self.cache.image.to_cache_config(),
            sweep_interval: (sweep > 0).then(|| Duration::from_secs(sweep)),
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        let retry = &self.recognition.retry;
        RetryConfig::new()
            .max_attempts(retry.max_attempts)
            .initial_delay(Duration::from_millis(retry.initial_delay_ms))
            .max_delay(Duration::from_millis(retry.max_delay_ms))
    }

    pub fn recognition_timeout(&self) -> Duration {
        Duration::from_millis(self.recognition.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.cache.sweep_interval_secs, 60);
        assert_eq!(config.cache.text.max_entries, 100);
        assert_eq!(config.cache.image.ttl_secs, 300);
        assert!(config.storage.enabled);
        assert_eq!(config.recognition.strategy, RecognitionStrategy::PrimaryWithFallback);
        assert_eq!(config.recognition_timeout(), Duration::from_secs(15));
        assert_eq!(config.recognition.max_image_bytes, 10 * 1024 * 1024);
        assert_eq!(config.retry_config(), RetryConfig::default());
        assert!(config.recognizer.is_none());
    }

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
            [cache.text]
            max_entries = 20
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.cache.text.max_entries, 20);
        // Defaults preserved
        assert_eq!(config.cache.text.ttl_secs, 300);
        assert_eq!(config.cache.image.max_entries, 100);
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
            [cache]
            sweep_interval_secs = 0

            [cache.text]
            max_entries = 50
            ttl_secs = 60

            [cache.image]
            max_entries = 10
            ttl_secs = 3600

            [storage]
            dir = "/var/cache/fleamark"
            max_blob_bytes = 1048576

            [recognition]
            strategy = "fallback_only"
            timeout_ms = 2500
            max_image_bytes = 1024

            [recognition.retry]
            max_attempts = 5
            initial_delay_ms = 100
            max_delay_ms = 1000

            [recognizer]
            base_url = "http://localhost:8080"
        "#;
        let config: Config = toml::from_str(toml).unwrap();

        let cache = config.search_cache_config();
        assert_eq!(cache.sweep_interval, None);
        assert_eq!(cache.text.max_entries, 50);
        assert_eq!(cache.image.ttl, Duration::from_secs(3600));

        assert_eq!(config.storage.dir, Some(PathBuf::from("/var/cache/fleamark")));
        assert_eq!(config.storage.max_blob_bytes, Some(1_048_576));
        assert_eq!(config.recognition.strategy, RecognitionStrategy::FallbackOnly);
        assert_eq!(config.recognition_timeout(), Duration::from_millis(2500));

        let retry = config.retry_config();
        assert_eq!(retry.max_attempts, 5);
        assert_eq!(retry.initial_delay, Duration::from_millis(100));
        assert_eq!(retry.max_delay, Duration::from_secs(1));

        let recognizer = config.recognizer.unwrap();
        assert_eq!(recognizer.base_url, "http://localhost:8080");
        assert_eq!(recognizer.api_key_env, "FLEAMARK_RECOGNIZER_KEY");
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        let toml = r#"
            [recognition]
            strategy = "whatever"
        "#;
        assert!(toml::from_str::<Config>(toml).is_err());
    }

    #[test]
    fn config_not_found_returns_error() {
        let result = Config::load(Some(Path::new("/nonexistent/config.toml")));
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Config file not found"));
    }

    #[test]
    fn load_from_file_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[recognition]\ntimeout_ms = 100\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.recognition.timeout_ms, 100);

        fs::write(&path, "[recognition\n").unwrap();
        let err = Config::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
