//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (FOLIO_*)
//! 2. TOML config file (if FOLIO_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Which backend holds original media files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Local,
    S3,
}

/// Media storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend selection. Set via FOLIO_STORAGE__BACKEND (`local` or `s3`).
    #[serde(default)]
    pub backend: StorageBackend,

    /// Root directory for the local backend.
    #[serde(default = "default_media_root")]
    pub media_root: PathBuf,

    /// Bucket name for the S3 backend.
    #[serde(default)]
    pub s3_bucket: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { backend: StorageBackend::Local, media_root: default_media_root(), s3_bucket: None }
    }
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (FOLIO_*)
/// 2. TOML config file (if FOLIO_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite database.
    ///
    /// Set via FOLIO_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Address the HTTP server binds to.
    ///
    /// Set via FOLIO_BIND_ADDR environment variable.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Global prefix of every image cache key.
    ///
    /// Set via FOLIO_CACHE_PRE_KEY environment variable.
    #[serde(default = "default_cache_pre_key")]
    pub cache_pre_key: String,

    #[serde(default)]
    pub storage: StorageConfig,

    /// User-Agent string for outbound HTTP requests.
    ///
    /// Set via FOLIO_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to download per asset.
    ///
    /// Set via FOLIO_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via FOLIO_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Extra attempts for a failed outbound request.
    ///
    /// Set via FOLIO_RETRIES environment variable.
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Base delay between retries, doubled after each attempt.
    ///
    /// Set via FOLIO_RETRY_BACKOFF_MS environment variable.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./folio.sqlite")
}

fn default_bind_addr() -> String {
    "127.0.0.1:8080".into()
}

fn default_cache_pre_key() -> String {
    "folio".into()
}

fn default_media_root() -> PathBuf {
    PathBuf::from("./media")
}

fn default_user_agent() -> String {
    "folio/0.1".into()
}

fn default_max_bytes() -> usize {
    20_971_520 // 20MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_retries() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    500
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            bind_addr: default_bind_addr(),
            cache_pre_key: default_cache_pre_key(),
            storage: StorageConfig::default(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            retries: default_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Base retry delay as Duration.
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `FOLIO_`
    /// 2. TOML file from `FOLIO_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("FOLIO_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("FOLIO_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Bucket name for the S3 backend.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if no bucket is configured.
    pub fn require_s3_bucket(&self) -> Result<&str, ConfigError> {
        self.storage.s3_bucket.as_deref().ok_or_else(|| ConfigError::Missing {
            field: "storage.s3_bucket".into(),
            hint: "Set FOLIO_STORAGE__S3_BUCKET environment variable".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./folio.sqlite"));
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.cache_pre_key, "folio");
        assert_eq!(config.storage.backend, StorageBackend::Local);
        assert_eq!(config.storage.media_root, PathBuf::from("./media"));
        assert_eq!(config.user_agent, "folio/0.1");
        assert_eq!(config.max_bytes, 20_971_520);
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.retries, 2);
    }

    #[test]
    fn test_durations() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
        assert_eq!(config.retry_backoff(), Duration::from_millis(500));
    }

    #[test]
    fn test_require_s3_bucket_missing() {
        let config = AppConfig::default();
        let result = config.require_s3_bucket();
        assert!(matches!(result, Err(ConfigError::Missing { .. })));
    }

    #[test]
    fn test_require_s3_bucket_present() {
        let storage = StorageConfig { s3_bucket: Some("media".into()), ..Default::default() };
        let config = AppConfig { storage, ..Default::default() };
        assert_eq!(config.require_s3_bucket().unwrap(), "media");
    }

    #[test]
    fn test_storage_backend_deserialize() {
        let backend: StorageBackend = serde_json::from_str("\"s3\"").unwrap();
        assert_eq!(backend, StorageBackend::S3);
    }
}
