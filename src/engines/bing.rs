//! Bing result extraction. Bing is the only engine with pinned answer blocks.
//!
//! Every top-level `li` under `#b_results` is a candidate. Instant-answer
//! boxes carry the `b_ans` class and are pinned: they are never classified
//! and always stay at the top.

use scraper::ElementRef;

use crate::engine::ResultExtractor;
use crate::types::EngineKind;

/// Class marking Bing's instant-answer blocks.
const ANSWER_CLASS: &str = "b_ans";

/// Bing result block extractor.
pub struct BingExtractor;

impl ResultExtractor for BingExtractor {
    fn engine_kind(&self) -> EngineKind {
        EngineKind::Bing
    }

    fn selectors(&self) -> &'static [&'static str] {
        &["#b_results > li"]
    }

    fn is_pinned(&self, element: &ElementRef<'_>) -> bool {
        element.value().classes().any(|c| c == ANSWER_CLASS)
    }
}
