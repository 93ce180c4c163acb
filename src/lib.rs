//! # serp-sieve
//!
//! Ad filtering and relevance reranking for search result pages.
//!
//! Given a parsed result page and its address, the crate finds the
//! engine's result blocks, asks an external language-model classifier
//! whether each block is an ad and how relevant it is to the query, hides
//! the ads and reorders the rest by descending relevance.
//!
//! ## Design
//!
//! - Google, Bing and Baidu result pages, each behind a [`ResultExtractor`]
//! - Concurrent classification with per-fragment fallback: a failed ad
//!   check keeps the result, a failed score counts as zero
//! - Bing answer boxes are pinned: never classified, always first
//! - Retries with linear backoff, reply validation and a bounded TTL cache
//!   with single-flight coalescing of identical requests
//! - Cancellable passes: starting a pass supersedes the one in flight
//! - Reading mode: main-content extraction, summaries and keywords
//!
//! ## Security
//!
//! - API keys never appear in `Debug` output or error messages
//! - Queries and page text are logged only at trace level

pub mod backend;
pub mod cache;
pub mod client;
pub mod config;
pub mod content;
pub mod credentials;
pub mod engine;
pub mod engines;
pub mod error;
pub mod flags;
pub mod heuristics;
pub mod page;
pub mod pass;
pub mod query;
pub mod ranking;
pub mod reading;
pub mod reorder;
pub mod stats;
pub mod text;
pub mod types;

use std::sync::Arc;

pub use backend::{ClassificationBackend, HttpBackend};
pub use cache::ResultCache;
pub use client::{ClassificationClient, RetryPolicy};
pub use config::SieveConfig;
pub use content::{extract_content, PageContent};
pub use credentials::{CredentialSource, EnvCredentials, Provider, StaticCredentials};
pub use engine::ResultExtractor;
pub use error::{Result, SieveError};
pub use flags::{FeatureFlags, FlagChange, FlagStore};
pub use page::Page;
pub use pass::{PassReport, PassStatus, Sieve};
pub use ranking::{RankOutcome, Ranking, RankingEngine};
pub use reading::{reading_progress, ReadingAssistant, ReadingPresenter, ReadingSummary};
pub use stats::{DailyStats, NoopStats, StatsSink};
pub use types::{
    ClassificationRequest, ClassificationResult, EndpointKind, EngineKind, RankedEntry,
    ResultFragment,
};

/// Shared state for one browsing session, built from a validated config.
#[derive(Debug, Clone)]
pub struct Session {
    /// Pass driver for result pages.
    pub sieve: Arc<Sieve>,
    /// Reading-mode summariser sharing the same client and cache.
    pub reading: ReadingAssistant,
    /// Client shared by both.
    pub client: Arc<ClassificationClient>,
}

/// Wire a [`Session`] from `config`.
///
/// The same `stats` sink receives API-call, ad-blocked and reordered
/// notifications.
///
/// # Errors
///
/// Returns [`SieveError::Config`] if `config` fails validation.
///
/// # Examples
///
/// ```no_run
/// # fn example() -> serp_sieve::Result<()> {
/// use std::sync::Arc;
/// use serp_sieve::{EnvCredentials, FlagStore, HttpBackend, NoopStats, SieveConfig};
///
/// let config = SieveConfig::default();
/// let session = serp_sieve::session(
///     &config,
///     Arc::new(HttpBackend::new(&config.client)?),
///     Arc::new(EnvCredentials),
///     Arc::new(FlagStore::default()),
///     Arc::new(NoopStats),
/// )?;
/// # let _ = session;
/// # Ok(())
/// # }
/// ```
pub fn session(
    config: &SieveConfig,
    backend: Arc<dyn ClassificationBackend>,
    credentials: Arc<dyn CredentialSource>,
    flags: Arc<FlagStore>,
    stats: Arc<dyn StatsSink>,
) -> Result<Session> {
    config.validate()?;

    let client = Arc::new(
        ClassificationClient::new(
            backend,
            credentials,
            ResultCache::new(&config.cache),
            &config.client,
        )
        .with_stats(stats.clone()),
    );
    let sieve = Sieve::new(client.clone(), flags.clone())
        .with_stats(stats)
        .with_ranking_config(config.ranking.clone());
    let reading = ReadingAssistant::new(client.clone(), flags, config.reading.clone());

    Ok(Session {
        sieve: Arc::new(sieve),
        reading,
        client,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ScriptedBackend;

    fn build(config: &SieveConfig) -> Result<Session> {
        session(
            config,
            Arc::new(ScriptedBackend::new(|_, _| Ok(serde_json::json!({})))),
            Arc::new(StaticCredentials::missing_key(Provider::OpenAi)),
            Arc::new(FlagStore::default()),
            Arc::new(NoopStats),
        )
    }

    #[test]
    fn session_validates_zero_attempts() {
        let mut config = SieveConfig::default();
        config.client.max_attempts = 0;
        let err = build(&config).expect_err("invalid");
        assert_eq!(err.code(), "CONFIG_INVALID");
        assert!(err.to_string().contains("max_attempts"));
    }

    #[test]
    fn session_validates_zero_ttl() {
        let mut config = SieveConfig::default();
        config.cache.ttl_seconds = 0;
        assert!(build(&config).is_err());
    }

    #[test]
    fn session_shares_one_client() {
        let session = build(&SieveConfig::default()).expect("valid");
        assert_eq!(session.sieve.latest_generation(), 0);
        assert_eq!(session.client.retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn public_types_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Sieve>();
        assert_send_sync::<ClassificationClient>();
        assert_send_sync::<ResultCache>();
        assert_send_sync::<ReadingAssistant>();
        assert_send_sync::<SieveError>();
    }
}
