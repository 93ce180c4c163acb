//! Final ordering of ranked entries.
//!
//! Answers (pinned entries) precede everything else; the rest sort by
//! descending score. The sort is stable, so equal keys keep the order the
//! entries were supplied in, which callers arrange to be document order.

use std::cmp::Ordering;

use crate::types::RankedEntry;

/// Pinned-first, then descending score. NaN scores compare equal.
pub fn compare_entries(a: &RankedEntry, b: &RankedEntry) -> Ordering {
    match (a.is_answer, b.is_answer) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (true, true) => Ordering::Equal,
        (false, false) => b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal),
    }
}

/// Sort `entries` in place with [`compare_entries`].
pub fn sort_entries(entries: &mut [RankedEntry]) {
    entries.sort_by(compare_entries);
}
