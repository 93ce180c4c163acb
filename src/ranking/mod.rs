//! Ranking engine: classify, score and order one pass's fragments.
//!
//! # Pipeline
//!
//! 1. Split pinned from rankable candidates, preserving order
//! 2. Fan out ad checks and relevance scores concurrently with
//!    [`futures::future::join_all`]
//! 3. Fall back per fragment on failure (not an ad, score `0.0`)
//! 4. Sort answers first, then by descending score, ties in document order

pub mod context;
pub mod order;
pub mod ranker;

pub use context::{Candidate, PassContext};
pub use order::{compare_entries, sort_entries};
pub use ranker::{RankOutcome, Ranking, RankingEngine};
