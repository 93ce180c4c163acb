//! Applies a ranking to the page tree and restores natural order.
//!
//! Entries are grouped by parent container. Within a container the slots
//! the ranked fragments currently occupy are refilled in ranked order;
//! every other child keeps its position. Re-applying the same ranking
//! moves nothing.

use std::collections::HashSet;

use ego_tree::NodeId;

use crate::engine::extractor_for;
use crate::error::Result;
use crate::page::Page;
use crate::types::{EngineKind, RankedEntry};

/// What an [`apply`] or [`restore`] call changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReorderReport {
    /// Containers visited.
    pub containers: usize,
    /// Child positions that changed.
    pub moved: usize,
    /// Entries ignored because their node had no parent.
    pub skipped: usize,
}

/// Reflow the page so each container lists its ranked fragments in order.
pub fn apply(page: &mut Page, entries: &[RankedEntry]) -> ReorderReport {
    let mut report = ReorderReport::default();
    let mut seen: HashSet<NodeId> = HashSet::new();
    let mut groups: Vec<(NodeId, Vec<NodeId>)> = Vec::new();

    for entry in entries {
        let node = entry.fragment.node;
        if !seen.insert(node) {
            continue;
        }
        let Some(parent) = page.parent_of(node) else {
            tracing::trace!(fragment = %entry.fragment.id, "fragment has no parent, skipping");
            report.skipped += 1;
            continue;
        };
        match groups.iter_mut().find(|(container, _)| *container == parent) {
            Some((_, members)) => members.push(node),
            None => groups.push((parent, vec![node])),
        }
    }

    for (container, ranked) in groups {
        page.record_natural_order(container);
        let order = refill_slots(&page.children_of(container), &ranked);
        report.moved += page.set_children(container, &order);
        report.containers += 1;
        for node in ranked {
            page.mark_reordered(node);
        }
    }

    tracing::debug!(
        containers = report.containers,
        moved = report.moved,
        skipped = report.skipped,
        "ranking applied"
    );
    report
}

/// Put the ranked nodes into the slots they currently occupy, in ranked order.
fn refill_slots(current: &[NodeId], ranked: &[NodeId]) -> Vec<NodeId> {
    let members: HashSet<NodeId> = ranked.iter().copied().collect();
    let mut next = ranked.iter().copied();
    current
        .iter()
        .map(|&child| {
            if members.contains(&child) {
                next.next().unwrap_or(child)
            } else {
                child
            }
        })
        .collect()
}

/// Undo reordering for `engine`'s result containers.
///
/// Clears every reorder marker, re-extracts fragments with the engine's
/// adapter and puts each of their containers back in the order recorded
/// before its first reflow. Children that appeared after recording keep
/// their current relative order at the end.
///
/// # Errors
///
/// Propagates selector parse failures from the adapter.
pub fn restore(page: &mut Page, engine: EngineKind) -> Result<ReorderReport> {
    let cleared = page.clear_reorder_markers();
    let fragments = extractor_for(engine).extract(page)?;

    let mut containers: Vec<NodeId> = Vec::new();
    for fragment in &fragments {
        if let Some(parent) = page.parent_of(fragment.node) {
            if page.natural_order(parent).is_some() && !containers.contains(&parent) {
                containers.push(parent);
            }
        }
    }

    let mut report = ReorderReport::default();
    for container in containers {
        let current = page.children_of(container);
        let present: HashSet<NodeId> = current.iter().copied().collect();
        let mut order: Vec<NodeId> = page
            .natural_order(container)
            .unwrap_or_default()
            .iter()
            .copied()
            .filter(|child| present.contains(child))
            .collect();
        let recorded: HashSet<NodeId> = order.iter().copied().collect();
        order.extend(current.iter().copied().filter(|c| !recorded.contains(c)));

        report.moved += page.set_children(container, &order);
        report.containers += 1;
    }

    tracing::debug!(
        %engine,
        markers = cleared,
        containers = report.containers,
        moved = report.moved,
        "natural order restored"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FragmentId, ResultFragment};
    use scraper::Selector;

    fn select(page: &Page, css: &str) -> Vec<NodeId> {
        let sel = Selector::parse(css).expect("selector");
        page.select(&sel).map(|e| e.id()).collect()
    }

    fn texts(page: &Page, css: &str) -> Vec<String> {
        let sel = Selector::parse(css).expect("selector");
        page.select(&sel).map(|e| e.text().collect::<String>()).collect()
    }

    fn entry(id: usize, node: NodeId, score: f64) -> RankedEntry {
        RankedEntry {
            fragment: ResultFragment {
                id: FragmentId(id),
                engine: EngineKind::Bing,
                is_pinned: false,
                node,
            },
            score,
            is_answer: false,
        }
    }

    const BING: &str = r#"<html><body><ol id="b_results">
        <li class="b_algo">one</li><li class="b_algo">two</li><li class="b_algo">three</li>
    </ol></body></html>"#;

    fn reversed(page: &Page) -> Vec<RankedEntry> {
        let nodes = select(page, "li");
        nodes
            .iter()
            .enumerate()
            .rev()
            .map(|(i, &n)| entry(i, n, i as f64))
            .collect()
    }

    #[test]
    fn apply_reorders_container() {
        let mut page = Page::parse(BING);
        let entries = reversed(&page);
        let report = apply(&mut page, &entries);
        assert_eq!(texts(&page, "li"), vec!["three", "two", "one"]);
        assert_eq!(report.containers, 1);
        assert_eq!(report.moved, 2);
        assert!(entries.iter().all(|e| page.is_reordered(e.fragment.node)));
    }

    #[test]
    fn apply_twice_moves_nothing() {
        let mut page = Page::parse(BING);
        let entries = reversed(&page);
        apply(&mut page, &entries);
        let mutations = page.structural_mutations();

        let second = apply(&mut page, &entries);

        assert_eq!(second.moved, 0);
        assert_eq!(page.structural_mutations(), mutations);
        assert_eq!(texts(&page, "li"), vec!["three", "two", "one"]);
    }

    #[test]
    fn non_ranked_children_keep_their_slots() {
        let mut page = Page::parse(
            "<div id=\"c\"><p>a</p><span>divider</span><p>b</p><p>c</p></div>",
        );
        let ps = select(&page, "p");
        // Rank c, a, b; the span stays between the first two slots.
        let entries = vec![entry(2, ps[2], 0.9), entry(0, ps[0], 0.5), entry(1, ps[1], 0.1)];
        apply(&mut page, &entries);
        assert_eq!(texts(&page, "#c > *"), vec!["c", "divider", "a", "b"]);
    }

    #[test]
    fn entries_group_by_container() {
        let mut page = Page::parse(
            "<div id=\"l\"><p>l1</p><p>l2</p></div><div id=\"r\"><p>r1</p><p>r2</p></div>",
        );
        let ps = select(&page, "p");
        let entries = vec![
            entry(3, ps[3], 0.9),
            entry(1, ps[1], 0.8),
            entry(2, ps[2], 0.2),
            entry(0, ps[0], 0.1),
        ];
        let report = apply(&mut page, &entries);
        assert_eq!(report.containers, 2);
        assert_eq!(texts(&page, "#l > p"), vec!["l2", "l1"]);
        assert_eq!(texts(&page, "#r > p"), vec!["r2", "r1"]);
    }

    #[test]
    fn parentless_entries_are_skipped() {
        let mut page = Page::parse(BING);
        let root = page.document().tree.root().id();
        let report = apply(&mut page, &[entry(0, root, 1.0)]);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.moved, 0);
    }

    #[test]
    fn hidden_unranked_children_stay_in_place() {
        let mut page = Page::parse(BING);
        let nodes = select(&page, "li");
        page.hide(nodes[0]);
        // "one" was blocked; rank three above two.
        let entries = vec![entry(2, nodes[2], 0.9), entry(1, nodes[1], 0.5)];
        apply(&mut page, &entries);
        assert_eq!(texts(&page, "li"), vec!["one", "three", "two"]);
        assert!(page.is_hidden(nodes[0]));
    }

    #[test]
    fn restore_returns_natural_order() {
        let mut page = Page::parse(BING);
        let entries = reversed(&page);
        apply(&mut page, &entries);

        let report = restore(&mut page, EngineKind::Bing).expect("restore");

        assert_eq!(texts(&page, "li"), vec!["one", "two", "three"]);
        assert_eq!(report.moved, 2);
        assert!(entries.iter().all(|e| !page.is_reordered(e.fragment.node)));
    }

    #[test]
    fn restore_after_repeated_applies_uses_first_order() {
        let mut page = Page::parse(BING);
        let entries = reversed(&page);
        apply(&mut page, &entries);
        let nodes = select(&page, "li");
        // nodes now three, two, one; rank two first.
        apply(&mut page, &[entry(1, nodes[1], 0.9), entry(0, nodes[0], 0.5), entry(2, nodes[2], 0.1)]);

        restore(&mut page, EngineKind::Bing).expect("restore");
        assert_eq!(texts(&page, "li"), vec!["one", "two", "three"]);
    }

    #[test]
    fn restore_without_apply_is_noop() {
        let mut page = Page::parse(BING);
        let report = restore(&mut page, EngineKind::Bing).expect("restore");
        assert_eq!(report, ReorderReport::default());
        assert_eq!(page.structural_mutations(), 0);
    }
}
