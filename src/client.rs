//! Classify-or-score requests with retry, validation and caching.
//!
//! [`ClassificationClient::request`] is the only way the ranking and
//! reading code reaches a backend. Each request:
//!
//! 1. returns an unexpired cached outcome for its fingerprint, if any
//! 2. otherwise joins (or starts) the single in-flight computation for that
//!    fingerprint
//! 3. resolves credentials; a missing key fails at once
//! 4. makes up to `max_attempts` backend calls, validating each reply and
//!    sleeping `base * attempt` between failures
//! 5. caches the first valid outcome, or fails with
//!    [`SieveError::Backend`] once the budget is spent

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::backend::ClassificationBackend;
use crate::cache::ResultCache;
use crate::config::ClientConfig;
use crate::credentials::{ApiCredentials, CredentialSource};
use crate::error::{Result, SieveError};
use crate::stats::{NoopStats, StatsSink};
use crate::types::{ClassificationRequest, ClassificationResult, EndpointKind};

/// Attempt budget and linear backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Backoff unit; the wait after failed attempt `n` is `n * base_delay`.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&ClientConfig::default())
    }
}

impl RetryPolicy {
    /// Policy described by `config`.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.backoff_base_ms),
        }
    }

    /// Wait after failed attempt `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

/// Shared entry point to the classifier.
pub struct ClassificationClient {
    backend: Arc<dyn ClassificationBackend>,
    credentials: Arc<dyn CredentialSource>,
    cache: ResultCache,
    stats: Arc<dyn StatsSink>,
    policy: RetryPolicy,
    attempt_timeout: Option<Duration>,
}

impl std::fmt::Debug for ClassificationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassificationClient")
            .field("cache", &self.cache)
            .field("policy", &self.policy)
            .field("attempt_timeout", &self.attempt_timeout)
            .finish()
    }
}

impl ClassificationClient {
    /// Client over `backend` with settings from `config`.
    pub fn new(
        backend: Arc<dyn ClassificationBackend>,
        credentials: Arc<dyn CredentialSource>,
        cache: ResultCache,
        config: &ClientConfig,
    ) -> Self {
        Self {
            backend,
            credentials,
            cache,
            stats: Arc::new(NoopStats),
            policy: RetryPolicy::from_config(config),
            attempt_timeout: config.attempt_timeout(),
        }
    }

    /// Report successful backend calls to `stats`.
    pub fn with_stats(mut self, stats: Arc<dyn StatsSink>) -> Self {
        self.stats = stats;
        self
    }

    /// Override the retry policy.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The outcome cache this client reads and writes.
    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Current retry policy.
    pub fn retry_policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Resolve `request` to a validated outcome.
    ///
    /// # Errors
    ///
    /// - [`SieveError::Config`] when no API key is configured (no attempt
    ///   is made)
    /// - [`SieveError::Backend`] when every attempt failed
    pub async fn request(&self, request: &ClassificationRequest) -> Result<ClassificationResult> {
        if let Some(hit) = self.cache.get(&request.fingerprint).await {
            tracing::trace!(endpoint = %request.endpoint, "classification cache hit");
            return Ok(hit);
        }
        self.cache
            .get_or_try_insert(&request.fingerprint, self.fetch(request))
            .await
            .map_err(|shared| (*shared).clone())
    }

    async fn fetch(&self, request: &ClassificationRequest) -> Result<ClassificationResult> {
        let credentials = self.credentials.credentials().await?.authorize()?;

        let max_attempts = self.policy.max_attempts;
        let mut last_error: Option<SieveError> = None;

        for attempt in 1..=max_attempts {
            match self.attempt(&credentials, request).await {
                Ok(result) => {
                    tracing::trace!(endpoint = %request.endpoint, attempt, "classification succeeded");
                    return Ok(result);
                }
                Err(error) if !error.is_retryable() => return Err(error),
                Err(error) => {
                    tracing::warn!(
                        endpoint = %request.endpoint,
                        attempt,
                        max_attempts,
                        error = %error,
                        "classification attempt failed"
                    );
                    last_error = Some(error);
                }
            }
            if attempt < max_attempts {
                tokio::time::sleep(self.policy.delay_after(attempt)).await;
            }
        }

        Err(SieveError::Backend {
            attempts: max_attempts,
            last_error: last_error.map(|e| e.to_string()).unwrap_or_default(),
        })
    }

    async fn attempt(
        &self,
        credentials: &ApiCredentials,
        request: &ClassificationRequest,
    ) -> Result<ClassificationResult> {
        let call = self.backend.call(credentials, request);
        let reply = match self.attempt_timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                SieveError::Transport(format!("attempt timed out after {}ms", limit.as_millis()))
            })??,
            None => call.await?,
        };
        let result = validate(request.endpoint, &reply)?;
        self.stats.record_api_call();
        Ok(result)
    }
}

/// Check a backend reply against the shape `endpoint` requires.
///
/// # Errors
///
/// Returns [`SieveError::Validation`] when a field is missing, has the
/// wrong type, or (for relevance) lies outside `[0, 1]`.
pub fn validate(endpoint: EndpointKind, reply: &Value) -> Result<ClassificationResult> {
    match endpoint {
        EndpointKind::AdCheck => reply
            .get("isAd")
            .and_then(Value::as_bool)
            .map(|is_ad| ClassificationResult::AdCheck { is_ad })
            .ok_or_else(|| SieveError::Validation("isAd must be a boolean".into())),
        EndpointKind::Relevance => {
            let score = reply
                .get("relevanceScore")
                .and_then(Value::as_f64)
                .ok_or_else(|| SieveError::Validation("relevanceScore must be a number".into()))?;
            if !(0.0..=1.0).contains(&score) {
                return Err(SieveError::Validation(format!(
                    "relevanceScore {score} outside [0, 1]"
                )));
            }
            Ok(ClassificationResult::Relevance { score })
        }
        EndpointKind::Summarize => {
            let summary = reply
                .get("summary")
                .and_then(Value::as_str)
                .ok_or_else(|| SieveError::Validation("summary must be a string".into()))?;
            let keywords = reply
                .get("keywords")
                .and_then(Value::as_array)
                .ok_or_else(|| SieveError::Validation("keywords must be an array".into()))?
                .iter()
                .map(|k| {
                    k.as_str().map(str::to_owned).ok_or_else(|| {
                        SieveError::Validation("keywords must contain only strings".into())
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(ClassificationResult::Summary {
                summary: summary.to_owned(),
                keywords,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ScriptedBackend;
    use crate::credentials::{Provider, ProviderCredentials, StaticCredentials};
    use crate::stats::DailyStats;
    use serde_json::json;

    fn keyed() -> Arc<dyn CredentialSource> {
        Arc::new(StaticCredentials::new(ProviderCredentials::new(
            Provider::OpenAi,
            "gpt-3.5-turbo",
            "sk-test",
        )))
    }

    fn client(backend: Arc<ScriptedBackend>) -> ClassificationClient {
        ClassificationClient::new(
            backend,
            keyed(),
            ResultCache::default(),
            &ClientConfig::default(),
        )
    }

    // ── validation ───────────────────────────────────────────

    #[test]
    fn validate_ad_check() {
        assert_eq!(
            validate(EndpointKind::AdCheck, &json!({"isAd": true})),
            Ok(ClassificationResult::AdCheck { is_ad: true })
        );
        assert!(validate(EndpointKind::AdCheck, &json!({"isAd": "yes"})).is_err());
        assert!(validate(EndpointKind::AdCheck, &json!({})).is_err());
    }

    #[test]
    fn validate_relevance_range() {
        assert_eq!(
            validate(EndpointKind::Relevance, &json!({"relevanceScore": 0})),
            Ok(ClassificationResult::Relevance { score: 0.0 })
        );
        assert_eq!(
            validate(EndpointKind::Relevance, &json!({"relevanceScore": 1.0})),
            Ok(ClassificationResult::Relevance { score: 1.0 })
        );
        assert!(validate(EndpointKind::Relevance, &json!({"relevanceScore": 1.5})).is_err());
        assert!(validate(EndpointKind::Relevance, &json!({"relevanceScore": -0.1})).is_err());
        assert!(validate(EndpointKind::Relevance, &json!({"relevanceScore": "0.5"})).is_err());
    }

    #[test]
    fn validate_summary_shape() {
        assert_eq!(
            validate(
                EndpointKind::Summarize,
                &json!({"summary": "s", "keywords": ["a", "b"]})
            ),
            Ok(ClassificationResult::Summary {
                summary: "s".into(),
                keywords: vec!["a".into(), "b".into()],
            })
        );
        assert!(validate(EndpointKind::Summarize, &json!({"summary": "s"})).is_err());
        assert!(validate(
            EndpointKind::Summarize,
            &json!({"summary": "s", "keywords": [1]})
        )
        .is_err());
    }

    #[test]
    fn retry_policy_is_linear() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
    }

    // ── request flow ─────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn success_is_cached_and_replayed() {
        let backend = Arc::new(ScriptedBackend::new(|_, _| Ok(json!({"relevanceScore": 0.9}))));
        let client = client(backend.clone());
        let req = ClassificationRequest::relevance("Rust book", "rust");

        let first = client.request(&req).await.expect("first");
        let second = client.request(&req).await.expect("second");

        assert_eq!(first, ClassificationResult::Relevance { score: 0.9 });
        assert_eq!(first, second);
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_with_linear_backoff_then_succeeds() {
        let backend = Arc::new(ScriptedBackend::new(|_, attempt| {
            if attempt < 3 {
                Err(SieveError::Transport("connection reset".into()))
            } else {
                Ok(json!({"isAd": false}))
            }
        }));
        let client = client(backend.clone());
        let started = tokio::time::Instant::now();

        let result = client
            .request(&ClassificationRequest::ad_check("x", "q"))
            .await
            .expect("third attempt succeeds");

        assert_eq!(result, ClassificationResult::AdCheck { is_ad: false });
        assert_eq!(backend.calls(), 3);
        // 1s after attempt 1, 2s after attempt 2.
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_replies_exhaust_budget() {
        let stats = Arc::new(DailyStats::with_clock(|| 1));
        let backend = Arc::new(ScriptedBackend::new(|_, _| Ok(json!({"relevanceScore": 7}))));
        let client = client(backend.clone()).with_stats(stats.clone());
        let req = ClassificationRequest::relevance("x", "q");

        let err = client.request(&req).await.unwrap_err();

        assert_eq!(backend.calls(), 3);
        match err {
            SieveError::Backend {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 3);
                assert!(last_error.contains("outside [0, 1]"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(client.cache().get(&req.fingerprint).await.is_none());
        assert_eq!(stats.total_api_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_key_fails_fast_without_calls() {
        let backend = Arc::new(ScriptedBackend::new(|_, _| Ok(json!({"isAd": true}))));
        let client = ClassificationClient::new(
            backend.clone(),
            Arc::new(StaticCredentials::missing_key(Provider::SiliconFlow)),
            ResultCache::default(),
            &ClientConfig::default(),
        );
        let started = tokio::time::Instant::now();

        let err = client
            .request(&ClassificationRequest::ad_check("x", "q"))
            .await
            .unwrap_err();

        assert_eq!(err.code(), "CONFIG_INVALID");
        assert_eq!(backend.calls(), 0);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_attempt_times_out_and_counts_as_failure() {
        let backend = Arc::new(
            ScriptedBackend::new(|_, _| Ok(json!({"isAd": false})))
                .with_latency(Duration::from_secs(60)),
        );
        let config = ClientConfig {
            attempt_timeout_secs: 5,
            ..ClientConfig::default()
        };
        let client = ClassificationClient::new(backend.clone(), keyed(), ResultCache::default(), &config);

        let err = client
            .request(&ClassificationRequest::ad_check("x", "q"))
            .await
            .unwrap_err();

        assert_eq!(err.code(), "BACKEND_EXHAUSTED");
        assert!(err.to_string().contains("timed out"));
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_duplicates_share_one_call() {
        let backend = Arc::new(
            ScriptedBackend::new(|_, _| Ok(json!({"isAd": true})))
                .with_latency(Duration::from_millis(200)),
        );
        let client = client(backend.clone());
        let req = ClassificationRequest::ad_check("Sponsored mouse", "mouse");

        let results = futures::future::join_all((0..5).map(|_| client.request(&req))).await;

        assert_eq!(backend.calls(), 1);
        for result in results {
            assert_eq!(result, Ok(ClassificationResult::AdCheck { is_ad: true }));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_duplicates_share_one_failure() {
        let backend = Arc::new(
            ScriptedBackend::new(|_, _| Err(SieveError::Transport("down".into())))
                .with_latency(Duration::from_millis(10)),
        );
        let client = client(backend.clone());
        let req = ClassificationRequest::relevance("x", "q");

        let results = futures::future::join_all((0..3).map(|_| client.request(&req))).await;

        assert_eq!(backend.calls(), 3);
        for result in results {
            assert_eq!(result.unwrap_err().code(), "BACKEND_EXHAUSTED");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn successful_calls_are_reported_to_stats() {
        let stats = Arc::new(DailyStats::with_clock(|| 1));
        let backend = Arc::new(ScriptedBackend::new(|_, _| Ok(json!({"isAd": false}))));
        let client = client(backend).with_stats(stats.clone());

        client
            .request(&ClassificationRequest::ad_check("a", "q"))
            .await
            .expect("ok");
        client
            .request(&ClassificationRequest::ad_check("b", "q"))
            .await
            .expect("ok");

        assert_eq!(stats.total_api_calls(), 2);
    }
}
