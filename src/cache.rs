//! In-memory TTL cache for classification outcomes.
//!
//! Keyed by request fingerprint. Uses [`moka`] for async-friendly caching
//! with a fixed time-to-live, a capacity bound and coalesced initialisation:
//! concurrent [`ResultCache::get_or_try_insert`] calls for one fingerprint
//! share a single computation.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use crate::config::CacheConfig;
use crate::error::SieveError;
use crate::types::ClassificationResult;

/// Shared, cloneable cache handle. Clones see the same entries.
#[derive(Clone)]
pub struct ResultCache {
    inner: Cache<String, ClassificationResult>,
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("entries", &self.inner.entry_count())
            .finish()
    }
}

impl ResultCache {
    /// Build a cache from configuration.
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_limits(Duration::from_secs(config.ttl_seconds), config.max_entries)
    }

    /// Build a cache with an explicit TTL and capacity.
    pub fn with_limits(ttl: Duration, max_entries: u64) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_entries)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Look up an unexpired outcome.
    pub async fn get(&self, fingerprint: &str) -> Option<ClassificationResult> {
        self.inner.get(fingerprint).await
    }

    /// Store an outcome, replacing any earlier one.
    pub async fn insert(&self, fingerprint: impl Into<String>, result: ClassificationResult) {
        self.inner.insert(fingerprint.into(), result).await;
    }

    /// Return the cached outcome or run `init` to produce it.
    ///
    /// Only one `init` runs per fingerprint at a time; concurrent callers
    /// wait for it and share its outcome. An error is returned to every
    /// waiter and nothing is cached.
    pub async fn get_or_try_insert<F>(
        &self,
        fingerprint: &str,
        init: F,
    ) -> std::result::Result<ClassificationResult, Arc<SieveError>>
    where
        F: Future<Output = std::result::Result<ClassificationResult, SieveError>>,
    {
        self.inner.try_get_with(fingerprint.to_owned(), init).await
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.inner.invalidate_all();
    }

    /// Approximate number of live entries.
    pub async fn len(&self) -> u64 {
        self.inner.run_pending_tasks().await;
        self.inner.entry_count()
    }

    /// Whether the cache holds no live entries.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}
