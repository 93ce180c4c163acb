//! Markup-based ad detection that needs no backend call.
//!
//! A block is flagged when its class, id or any attribute value, or the
//! `src` of an iframe inside it, contains an ad-marker token. Matching is
//! per token (split on non-alphanumeric characters) so that `header` or
//! `download` never match `ad`.

use ego_tree::NodeId;
use scraper::{ElementRef, Selector};

use crate::page::Page;

/// Tokens that mark an element as an advertisement.
pub const AD_INDICATORS: &[&str] = &[
    "ad",
    "ads",
    "advertisement",
    "sponsored",
    "promotion",
    "banner",
    "adsense",
    "adwords",
    "doubleclick",
];

/// Whether the block at `node` carries an ad marker in its own markup.
pub fn looks_like_ad(page: &Page, node: NodeId) -> bool {
    let Some(element) = page.element(node) else {
        return false;
    };
    if element
        .value()
        .attrs()
        .any(|(_, value)| contains_indicator(value))
    {
        return true;
    }
    has_ad_iframe(&element)
}

fn has_ad_iframe(element: &ElementRef<'_>) -> bool {
    let Ok(selector) = Selector::parse("iframe[src]") else {
        return false;
    };
    element
        .select(&selector)
        .filter_map(|frame| frame.value().attr("src"))
        .any(contains_indicator)
}

/// Whether `value` contains one of [`AD_INDICATORS`] as a whole token.
pub fn contains_indicator(value: &str) -> bool {
    value
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| !token.is_empty())
        .any(|token| {
            let token = token.to_ascii_lowercase();
            AD_INDICATORS.contains(&token.as_str())
        })
}
