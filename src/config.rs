//! Sieve configuration with sensible defaults.
//!
//! [`SieveConfig`] controls classifier retries, caching, ranking heuristics
//! and reading-mode extraction. Every section uses `#[serde(default)]`, so a
//! TOML file only needs the keys it overrides.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SieveError};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SieveConfig {
    /// Classification client retry and timeout settings.
    pub client: ClientConfig,
    /// Result cache settings.
    pub cache: CacheConfig,
    /// Ranking behaviour.
    pub ranking: RankingConfig,
    /// Reading-mode content extraction.
    pub reading: ReadingConfig,
}

/// Classification client settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Total attempts per request, including the first.
    pub max_attempts: u32,
    /// Backoff unit in milliseconds; the wait after attempt `n` is `n * unit`.
    pub backoff_base_ms: u64,
    /// Per-attempt timeout in seconds. `0` disables the timeout.
    pub attempt_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base_ms: 1000,
            attempt_timeout_secs: 30,
        }
    }
}

impl ClientConfig {
    /// Per-attempt timeout, if enabled.
    pub fn attempt_timeout(&self) -> Option<Duration> {
        (self.attempt_timeout_secs > 0).then(|| Duration::from_secs(self.attempt_timeout_secs))
    }
}

/// Result cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Seconds an entry lives after insertion.
    pub ttl_seconds: u64,
    /// Maximum number of cached outcomes.
    pub max_entries: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 3600,
            max_entries: 10_000,
        }
    }
}

/// Ranking behaviour.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Treat blocks whose class, id or attributes carry an ad marker as ads
    /// without asking the backend.
    pub heuristic_prefilter: bool,
}

/// Reading-mode extraction settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadingConfig {
    /// Maximum characters of page content sent for summarisation.
    pub max_chars: usize,
}

impl Default for ReadingConfig {
    fn default() -> Self {
        Self {
            max_chars: crate::content::DEFAULT_MAX_CHARS,
        }
    }
}

impl SieveConfig {
    /// Parse a TOML document and validate it.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(raw).map_err(|e| SieveError::Config(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SieveError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `client.max_attempts` must be greater than 0
    /// - `cache.ttl_seconds` must be greater than 0
    /// - `cache.max_entries` must be greater than 0
    /// - `reading.max_chars` must be greater than 0
    pub fn validate(&self) -> Result<()> {
        if self.client.max_attempts == 0 {
            return Err(SieveError::Config(
                "client.max_attempts must be greater than 0".into(),
            ));
        }
        if self.cache.ttl_seconds == 0 {
            return Err(SieveError::Config(
                "cache.ttl_seconds must be greater than 0".into(),
            ));
        }
        if self.cache.max_entries == 0 {
            return Err(SieveError::Config(
                "cache.max_entries must be greater than 0".into(),
            ));
        }
        if self.reading.max_chars == 0 {
            return Err(SieveError::Config(
                "reading.max_chars must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}
