//! Checks applied to a loaded [`AppConfig`].

use std::ops::RangeInclusive;

use crate::config::{AppConfig, StorageBackend};
use thiserror::Error;

const MAX_BYTES: RangeInclusive<usize> = 1..=200 * 1024 * 1024;
const TIMEOUT_MS: RangeInclusive<u64> = 100..=300_000;
const MAX_RETRIES: u32 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.to_string(), reason: reason.into() }
}

fn in_range<T>(field: &str, value: T, range: RangeInclusive<T>) -> Result<(), ConfigError>
where
    T: PartialOrd + std::fmt::Display,
{
    if range.contains(&value) {
        Ok(())
    } else {
        Err(invalid(field, format!("{value} is outside {}..={}", range.start(), range.end())))
    }
}

impl AppConfig {
    /// Reject values the server or the link repairer cannot work with.
    ///
    /// # Errors
    ///
    /// `ConfigError::Invalid` for out-of-range byte limits, timeouts or retry
    /// counts and for a blank user agent or cache prefix;
    /// `ConfigError::Missing` for the S3 backend without a bucket.
    pub fn validate(&self) -> Result<(), ConfigError> {
        in_range("max_bytes", self.max_bytes, MAX_BYTES)?;
        in_range("timeout_ms", self.timeout_ms, TIMEOUT_MS)?;
        in_range("retries", self.retries, 0..=MAX_RETRIES)?;

        if self.user_agent.trim().is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }
        if self.cache_pre_key.trim().is_empty() {
            return Err(invalid("cache_pre_key", "must not be empty"));
        }
        if self.cache_pre_key.contains(char::is_whitespace) {
            return Err(invalid("cache_pre_key", "must not contain whitespace"));
        }

        if self.storage.backend == StorageBackend::S3 {
            self.require_s3_bucket()?;
        }

        Ok(())
    }
}
