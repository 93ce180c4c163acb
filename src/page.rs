//! A search result page snapshot plus its presentation state.
//!
//! The parsed document is mutated in place when results are reflowed.
//! Hide/show directives and reorder markers live beside the tree rather
//! than in element attributes, so the original markup is never rewritten.

use std::collections::{HashMap, HashSet};

use ego_tree::NodeId;
use scraper::element_ref::Select;
use scraper::{ElementRef, Html, Selector};

/// One result page and the presentation state applied to it.
#[derive(Debug, Clone)]
pub struct Page {
    document: Html,
    hidden: HashSet<NodeId>,
    reordered: HashSet<NodeId>,
    /// Container -> children in the order first seen, before any reflow.
    natural_order: HashMap<NodeId, Vec<NodeId>>,
    structural_mutations: u64,
}

impl Page {
    /// Parse a full HTML document.
    pub fn parse(html: &str) -> Self {
        Self::from_document(Html::parse_document(html))
    }

    /// Wrap an already-parsed document.
    pub fn from_document(document: Html) -> Self {
        Self {
            document,
            hidden: HashSet::new(),
            reordered: HashSet::new(),
            natural_order: HashMap::new(),
            structural_mutations: 0,
        }
    }

    /// The underlying document.
    pub fn document(&self) -> &Html {
        &self.document
    }

    /// Elements matching `selector`, in current document order.
    ///
    /// `Html::select` walks the node arena, which keeps parse order after a
    /// reflow; this walks the tree instead.
    pub fn select<'a, 'b>(&'a self, selector: &'b Selector) -> Select<'a, 'b> {
        self.document.root_element().select(selector)
    }

    /// Serialise the current (possibly reflowed) document.
    pub fn html(&self) -> String {
        self.document.html()
    }

    /// Resolve a node handle to an element, if it still refers to one.
    pub fn element(&self, node: NodeId) -> Option<ElementRef<'_>> {
        self.document.tree.get(node).and_then(ElementRef::wrap)
    }

    /// Parent of `node`, if attached.
    pub fn parent_of(&self, node: NodeId) -> Option<NodeId> {
        self.document
            .tree
            .get(node)
            .and_then(|n| n.parent())
            .map(|p| p.id())
    }

    /// Child handles of `node` in current order.
    pub fn children_of(&self, node: NodeId) -> Vec<NodeId> {
        self.document
            .tree
            .get(node)
            .map(|n| n.children().map(|c| c.id()).collect())
            .unwrap_or_default()
    }

    /// Apply the "hidden" presentation state. Returns true if it changed.
    pub fn hide(&mut self, node: NodeId) -> bool {
        self.hidden.insert(node)
    }

    /// Remove the "hidden" presentation state. Returns true if it changed.
    pub fn show(&mut self, node: NodeId) -> bool {
        self.hidden.remove(&node)
    }

    /// Whether the presentation layer hides `node`.
    pub fn is_hidden(&self, node: NodeId) -> bool {
        self.hidden.contains(&node)
    }

    /// Number of hidden nodes.
    pub fn hidden_count(&self) -> usize {
        self.hidden.len()
    }

    /// Unhide everything; returns how many nodes were hidden.
    pub fn show_all(&mut self) -> usize {
        let count = self.hidden.len();
        self.hidden.clear();
        count
    }

    /// Whether `node` carries a reorder marker.
    pub fn is_reordered(&self, node: NodeId) -> bool {
        self.reordered.contains(&node)
    }

    pub(crate) fn mark_reordered(&mut self, node: NodeId) {
        self.reordered.insert(node);
    }

    /// Drop every reorder marker; returns how many were set.
    pub fn clear_reorder_markers(&mut self) -> usize {
        let count = self.reordered.len();
        self.reordered.clear();
        count
    }

    /// Remember the current child order of `container` unless already known.
    pub(crate) fn record_natural_order(&mut self, container: NodeId) {
        if !self.natural_order.contains_key(&container) {
            let children = self.children_of(container);
            self.natural_order.insert(container, children);
        }
    }

    /// Child order of `container` before its first reflow.
    pub fn natural_order(&self, container: NodeId) -> Option<&[NodeId]> {
        self.natural_order.get(&container).map(Vec::as_slice)
    }

    /// Number of child moves performed on the tree so far.
    pub fn structural_mutations(&self) -> u64 {
        self.structural_mutations
    }

    /// Rewrite `container`'s child list to `order`.
    ///
    /// `order` must be a permutation of the current children. Returns the
    /// number of positions that changed; an unchanged order touches nothing.
    pub(crate) fn set_children(&mut self, container: NodeId, order: &[NodeId]) -> usize {
        let current = self.children_of(container);
        if current.as_slice() == order {
            return 0;
        }
        if current.len() != order.len() || order.iter().any(|id| !current.contains(id)) {
            tracing::warn!("refusing to reflow container with a mismatched child set");
            return 0;
        }

        let moved = current.iter().zip(order).filter(|(a, b)| a != b).count();
        for &child in order {
            if let Some(mut node) = self.document.tree.get_mut(child) {
                node.detach();
            }
            if let Some(mut parent) = self.document.tree.get_mut(container) {
                parent.append_id(child);
            }
        }
        self.structural_mutations += moved as u64;
        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(page: &Page, css: &str) -> Vec<NodeId> {
        let sel = Selector::parse(css).expect("selector");
        page.select(&sel).map(|e| e.id()).collect()
    }

    fn texts(page: &Page, css: &str) -> Vec<String> {
        let sel = Selector::parse(css).expect("selector");
        page.select(&sel).map(|e| e.text().collect::<String>()).collect()
    }

    const LIST: &str = "<html><body><ul id=\"r\"><li>a</li><li>b</li><li>c</li></ul></body></html>";

    #[test]
    fn hide_and_show_toggle_state() {
        let mut page = Page::parse(LIST);
        let items = ids(&page, "li");
        assert!(page.hide(items[0]));
        assert!(!page.hide(items[0]));
        assert!(page.is_hidden(items[0]));
        assert!(page.show(items[0]));
        assert!(!page.is_hidden(items[0]));
    }

    #[test]
    fn show_all_reports_count() {
        let mut page = Page::parse(LIST);
        for id in ids(&page, "li") {
            page.hide(id);
        }
        assert_eq!(page.show_all(), 3);
        assert_eq!(page.hidden_count(), 0);
    }

    #[test]
    fn set_children_reorders_tree() {
        let mut page = Page::parse(LIST);
        let container = ids(&page, "#r")[0];
        let mut order = page.children_of(container);
        order.reverse();
        let moved = page.set_children(container, &order);
        assert_eq!(moved, 2);
        assert_eq!(texts(&page, "li"), vec!["c", "b", "a"]);
        assert_eq!(page.structural_mutations(), 2);
    }

    #[test]
    fn set_children_same_order_is_noop() {
        let mut page = Page::parse(LIST);
        let container = ids(&page, "#r")[0];
        let order = page.children_of(container);
        assert_eq!(page.set_children(container, &order), 0);
        assert_eq!(page.structural_mutations(), 0);
    }

    #[test]
    fn set_children_rejects_foreign_nodes() {
        let mut page = Page::parse(LIST);
        let container = ids(&page, "#r")[0];
        let body = ids(&page, "body")[0];
        let mut order = page.children_of(container);
        order[0] = body;
        assert_eq!(page.set_children(container, &order), 0);
        assert_eq!(texts(&page, "li"), vec!["a", "b", "c"]);
    }

    #[test]
    fn natural_order_recorded_once() {
        let mut page = Page::parse(LIST);
        let container = ids(&page, "#r")[0];
        page.record_natural_order(container);
        let original = page.natural_order(container).expect("recorded").to_vec();

        let mut order = page.children_of(container);
        order.reverse();
        page.set_children(container, &order);
        page.record_natural_order(container);

        assert_eq!(page.natural_order(container), Some(original.as_slice()));
    }

    #[test]
    fn element_resolves_and_parent_links() {
        let page = Page::parse(LIST);
        let item = ids(&page, "li")[1];
        let el = page.element(item).expect("element");
        assert_eq!(el.value().name(), "li");
        let parent = page.parent_of(item).expect("parent");
        assert_eq!(parent, ids(&page, "#r")[0]);
    }
}
