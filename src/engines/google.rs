//! Google result extraction.
//!
//! Organic results are `.g` blocks under `#search` / `#rso`; shopping grids
//! and the top/right commercial units are extracted too so that the ad
//! check can see them. Google has no pinned blocks.

use crate::engine::ResultExtractor;
use crate::types::EngineKind;

/// Google result block extractor.
pub struct GoogleExtractor;

impl ResultExtractor for GoogleExtractor {
    fn engine_kind(&self) -> EngineKind {
        EngineKind::Google
    }

    fn selectors(&self) -> &'static [&'static str] {
        &[
            "#search .g",
            "#rso .g",
            "div[data-sokoban-grid]",
            ".commercial-unit-desktop-top",
            ".commercial-unit-desktop-rhs",
        ]
    }
}
