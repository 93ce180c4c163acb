//! HTML content extraction for reading mode.
//!
//! Parses the page, skips non-content subtrees (scripts, styles,
//! navigation, frames), picks the main content area and returns clean text
//! sized for a summarisation request.

use ego_tree::NodeRef;
use scraper::{ElementRef, Html, Node, Selector};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SieveError};
use crate::text::collapse_whitespace;

/// Default maximum characters to return from extracted content.
pub const DEFAULT_MAX_CHARS: usize = 100_000;

/// Marker appended when text is cut at the character limit.
pub const TRUNCATION_MARKER: &str = "[Content truncated]";

/// Elements whose subtrees never contribute readable text.
const BOILERPLATE_TAGS: &[&str] = &[
    "script", "style", "nav", "footer", "header", "aside", "noscript", "svg", "iframe",
];

/// Content roots in priority order.
const CONTENT_ROOTS: &[&str] = &["article", "main", "[role=\"main\"]", "body"];

/// Readable content of one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContent {
    /// Address the content was taken from.
    pub url: String,
    /// Text of the `<title>` element, or empty.
    pub title: String,
    /// Main text, whitespace-collapsed and possibly truncated.
    pub text: String,
    /// Whitespace-separated words in `text`.
    pub word_count: usize,
}

/// Extract readable text content from raw HTML.
///
/// # Errors
///
/// Returns [`SieveError::Parse`] if no extractable content is found.
pub fn extract_content(html: &str, url: &str) -> Result<PageContent> {
    extract_content_with_limit(html, url, DEFAULT_MAX_CHARS)
}

/// Same as [`extract_content`] with a custom character limit.
///
/// The limit counts characters, not bytes.
///
/// # Errors
///
/// Returns [`SieveError::Parse`] if no extractable content is found.
pub fn extract_content_with_limit(html: &str, url: &str, max_chars: usize) -> Result<PageContent> {
    let document = Html::parse_document(html);

    let title = extract_title(&document);
    let text = extract_main_text(&document);
    if text.is_empty() {
        return Err(SieveError::Parse("no extractable content found".into()));
    }

    let text = truncate_to_limit(&text, max_chars);
    let word_count = text.split_whitespace().count();
    tracing::trace!(url, word_count, "page content extracted");

    Ok(PageContent {
        url: url.to_owned(),
        title,
        text,
        word_count,
    })
}

fn extract_title(document: &Html) -> String {
    let Ok(selector) = Selector::parse("title") else {
        return String::new();
    };
    document
        .root_element()
        .select(&selector)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .unwrap_or_default()
}

/// Text of the first content root with any readable text.
fn extract_main_text(document: &Html) -> String {
    for css in CONTENT_ROOTS {
        let Ok(selector) = Selector::parse(css) else {
            continue;
        };
        if let Some(root) = document.root_element().select(&selector).next() {
            let text = readable_text(root);
            if !text.is_empty() {
                return text;
            }
        }
    }
    String::new()
}

/// Collect the text under `root`, skipping boilerplate subtrees.
fn readable_text(root: ElementRef<'_>) -> String {
    let mut runs: Vec<String> = Vec::new();
    let mut stack: Vec<NodeRef<'_, Node>> = vec![*root];

    while let Some(current) = stack.pop() {
        match current.value() {
            Node::Text(text) => {
                let run = collapse_whitespace(text);
                if !run.is_empty() {
                    runs.push(run);
                }
                continue;
            }
            Node::Element(element) if BOILERPLATE_TAGS.contains(&element.name()) => continue,
            Node::Element(_) | Node::Document | Node::Fragment => {}
            _ => continue,
        }
        let children: Vec<_> = current.children().collect();
        stack.extend(children.into_iter().rev());
    }

    runs.join(" ")
}

/// Cut `text` to `max_chars` characters and append the truncation marker.
fn truncate_to_limit(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_owned(),
        Some((end, _)) => {
            let mut truncated = text[..end].trim_end().to_owned();
            truncated.push_str("\n\n");
            truncated.push_str(TRUNCATION_MARKER);
            truncated
        }
    }
}
