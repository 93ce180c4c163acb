//! Usage statistics hooks.
//!
//! The [`StatsSink`] trait receives fire-and-forget notifications from the
//! client and the pass driver. [`NoopStats`] discards them; [`DailyStats`]
//! keeps per-day counters in memory.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

const SECONDS_PER_DAY: u64 = 86_400;

/// Receives usage notifications.
///
/// Implementations must be cheap and must not block; they are called from
/// inside the classification path.
pub trait StatsSink: Send + Sync {
    /// One backend call returned a reply that passed validation.
    fn record_api_call(&self);

    /// `count` results were hidden as ads in one pass.
    fn record_ad_blocked(&self, count: u64);

    /// A result page was reordered.
    fn record_search_reordered(&self);
}

/// Discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStats;

impl StatsSink for NoopStats {
    fn record_api_call(&self) {}
    fn record_ad_blocked(&self, _count: u64) {}
    fn record_search_reordered(&self) {}
}

/// Counters for one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyCounts {
    /// Results hidden as ads.
    pub ads_blocked: u64,
    /// Backend calls that returned a reply.
    pub api_calls: u64,
    /// Pages whose results were reordered.
    pub searches_reordered: u64,
}

/// In-memory per-day counters, keyed by days since the Unix epoch (UTC).
pub struct DailyStats {
    clock: fn() -> u64,
    days: Mutex<BTreeMap<u64, DailyCounts>>,
    total_api_calls: AtomicU64,
}

impl std::fmt::Debug for DailyStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DailyStats")
            .field("total_api_calls", &self.total_api_calls.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for DailyStats {
    fn default() -> Self {
        Self::with_clock(current_day)
    }
}

impl DailyStats {
    /// Counters keyed by the wall-clock day.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters keyed by `clock()`.
    pub fn with_clock(clock: fn() -> u64) -> Self {
        Self {
            clock,
            days: Mutex::new(BTreeMap::new()),
            total_api_calls: AtomicU64::new(0),
        }
    }

    /// Counters for today.
    pub fn today(&self) -> DailyCounts {
        self.for_day((self.clock)())
    }

    /// Counters for `day`; zero if nothing was recorded.
    pub fn for_day(&self, day: u64) -> DailyCounts {
        match self.days.lock() {
            Ok(days) => days.get(&day).copied().unwrap_or_default(),
            Err(poisoned) => poisoned.into_inner().get(&day).copied().unwrap_or_default(),
        }
    }

    /// Backend calls across all days.
    pub fn total_api_calls(&self) -> u64 {
        self.total_api_calls.load(Ordering::Relaxed)
    }

    fn bump(&self, edit: impl FnOnce(&mut DailyCounts)) {
        let day = (self.clock)();
        let mut days = match self.days.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        edit(days.entry(day).or_default());
    }
}

impl StatsSink for DailyStats {
    fn record_api_call(&self) {
        self.total_api_calls.fetch_add(1, Ordering::Relaxed);
        self.bump(|c| c.api_calls += 1);
    }

    fn record_ad_blocked(&self, count: u64) {
        if count > 0 {
            self.bump(|c| c.ads_blocked += count);
        }
    }

    fn record_search_reordered(&self) {
        self.bump(|c| c.searches_reordered += 1);
    }
}

/// Days since the Unix epoch, UTC.
pub fn current_day() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() / SECONDS_PER_DAY)
        .unwrap_or(0)
}
