//! Feature flags and the store that publishes flag changes.
//!
//! Flags are read once at the start of each pass and handed to the core in
//! a [`PassContext`](crate::ranking::PassContext); the core never writes
//! them. Writers go through [`FlagStore`], whose subscribers are woken on
//! every effective change.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// User-facing switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FeatureFlags {
    /// Hide results the classifier marks as ads.
    pub ad_blocking: bool,
    /// Reorder organic results by relevance.
    pub search_reordering: bool,
    /// Summarise pages in reading mode.
    pub context_suggestions: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            ad_blocking: true,
            search_reordering: true,
            context_suggestions: true,
        }
    }
}

impl FeatureFlags {
    /// Every feature off.
    pub fn disabled() -> Self {
        Self {
            ad_blocking: false,
            search_reordering: false,
            context_suggestions: false,
        }
    }
}

/// A flag transition reported by [`FlagStore::set`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagChange {
    /// Flags before the write.
    pub previous: FeatureFlags,
    /// Flags after the write.
    pub next: FeatureFlags,
}

/// Holds the current flags and notifies subscribers of changes.
#[derive(Debug)]
pub struct FlagStore {
    tx: watch::Sender<FeatureFlags>,
}

impl Default for FlagStore {
    fn default() -> Self {
        Self::new(FeatureFlags::default())
    }
}

impl FlagStore {
    /// Store seeded with `flags`.
    pub fn new(flags: FeatureFlags) -> Self {
        let (tx, _rx) = watch::channel(flags);
        Self { tx }
    }

    /// Snapshot of the current flags.
    pub fn current(&self) -> FeatureFlags {
        *self.tx.borrow()
    }

    /// Replace the flags. Returns the transition, or `None` when `next`
    /// equals the current value (subscribers are not woken then).
    pub fn set(&self, next: FeatureFlags) -> Option<FlagChange> {
        let mut previous = next;
        let changed = self.tx.send_if_modified(|current| {
            previous = *current;
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
        if changed {
            tracing::debug!(?previous, ?next, "feature flags changed");
        }
        changed.then_some(FlagChange { previous, next })
    }

    /// Modify the flags in place; see [`set`](Self::set).
    pub fn update(&self, edit: impl FnOnce(&mut FeatureFlags)) -> Option<FlagChange> {
        let mut next = self.current();
        edit(&mut next);
        self.set(next)
    }

    /// Receiver that observes every subsequent change.
    pub fn subscribe(&self) -> watch::Receiver<FeatureFlags> {
        self.tx.subscribe()
    }
}
