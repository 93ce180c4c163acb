//! Deterministic in-process backend.
//!
//! [`ScriptedBackend`] answers from a closure instead of the network and
//! counts every call, which makes retry, caching and coalescing behaviour
//! observable in tests and offline runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::ClassificationBackend;
use crate::credentials::ApiCredentials;
use crate::error::Result;
use crate::types::{ClassificationRequest, EndpointKind};

type Responder = dyn Fn(&ClassificationRequest, u32) -> Result<Value> + Send + Sync;

/// Backend driven by a responder closure.
///
/// The responder receives the request and the 1-based number of times this
/// fingerprint has been called, so a script can fail the first attempts and
/// succeed later.
pub struct ScriptedBackend {
    responder: Box<Responder>,
    latency: Duration,
    total: AtomicU32,
    per_fingerprint: Mutex<HashMap<String, u32>>,
    per_endpoint: Mutex<HashMap<EndpointKind, u32>>,
}

impl std::fmt::Debug for ScriptedBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedBackend")
            .field("latency", &self.latency)
            .field("calls", &self.calls())
            .finish()
    }
}

impl ScriptedBackend {
    /// Backend answering with `responder`.
    pub fn new(
        responder: impl Fn(&ClassificationRequest, u32) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            latency: Duration::ZERO,
            total: AtomicU32::new(0),
            per_fingerprint: Mutex::new(HashMap::new()),
            per_endpoint: Mutex::new(HashMap::new()),
        }
    }

    /// Delay every reply by `latency` (observes paused tokio time).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Total calls received.
    pub fn calls(&self) -> u32 {
        self.total.load(Ordering::SeqCst)
    }

    /// Calls received for `endpoint`.
    pub fn calls_for(&self, endpoint: EndpointKind) -> u32 {
        lock(&self.per_endpoint).get(&endpoint).copied().unwrap_or(0)
    }

    fn record(&self, request: &ClassificationRequest) -> u32 {
        self.total.fetch_add(1, Ordering::SeqCst);
        *lock(&self.per_endpoint).entry(request.endpoint).or_default() += 1;
        let mut seen = lock(&self.per_fingerprint);
        let count = seen.entry(request.fingerprint.clone()).or_default();
        *count += 1;
        *count
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[async_trait]
impl ClassificationBackend for ScriptedBackend {
    async fn call(
        &self,
        _credentials: &ApiCredentials,
        request: &ClassificationRequest,
    ) -> Result<Value> {
        let attempt = self.record(request);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        (self.responder)(request, attempt)
    }
}
