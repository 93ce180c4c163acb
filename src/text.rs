//! Visible-text flattening for result fragments.
//!
//! [`visible_text`] walks a fragment's subtree and keeps only text a reader
//! would see: non-rendering elements are skipped, as is anything hidden by
//! markup, inline style, or the [`Page`] presentation layer.

use ego_tree::{NodeId, NodeRef};
use scraper::node::Element;
use scraper::Node;

use crate::page::Page;

/// Elements whose content is never rendered as text.
const NON_RENDERED_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Flatten the subtree at `node` into its visible text.
///
/// Each text run has its whitespace collapsed, non-empty runs are joined by
/// single spaces, and the result is trimmed. A stale handle yields an empty
/// string. The root's own presentation state is ignored so that a block an
/// earlier pass hid can still be re-evaluated; markup and inline-style
/// hiding apply to the root as well.
pub fn visible_text(page: &Page, node: NodeId) -> String {
    let Some(root) = page.document().tree.get(node) else {
        return String::new();
    };

    let mut runs: Vec<String> = Vec::new();
    let mut stack: Vec<NodeRef<'_, Node>> = vec![root];

    while let Some(current) = stack.pop() {
        match current.value() {
            Node::Text(text) => {
                let run = collapse_whitespace(text);
                if !run.is_empty() {
                    runs.push(run);
                }
                continue;
            }
            Node::Element(element) => {
                let hidden_by_page = current.id() != node && page.is_hidden(current.id());
                if hidden_by_page || !is_rendered(element) {
                    continue;
                }
            }
            Node::Comment(_) | Node::ProcessingInstruction(_) | Node::Doctype(_) => continue,
            Node::Document | Node::Fragment => {}
        }
        // Reverse so the stack pops children in document order.
        let children: Vec<_> = current.children().collect();
        stack.extend(children.into_iter().rev());
    }

    runs.join(" ")
}

/// Collapse every whitespace sequence in `text` to one space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_rendered(element: &Element) -> bool {
    if NON_RENDERED_TAGS.contains(&element.name()) {
        return false;
    }
    if element.attr("hidden").is_some() {
        return false;
    }
    !element.attr("style").is_some_and(style_hides)
}

/// Whether an inline style declaration hides its element.
fn style_hides(style: &str) -> bool {
    style.split(';').any(|decl| {
        let Some((property, value)) = decl.split_once(':') else {
            return false;
        };
        let property = property.trim().to_ascii_lowercase();
        let value = value
            .trim()
            .trim_end_matches("!important")
            .trim()
            .to_ascii_lowercase();
        matches!(
            (property.as_str(), value.as_str()),
            ("display", "none") | ("visibility", "hidden")
        )
    })
}
