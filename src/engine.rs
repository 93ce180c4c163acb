//! Trait definition for per-engine result extraction.
//!
//! Each search engine (Google, Bing, Baidu) implements [`ResultExtractor`]
//! with a static selector set describing where its result blocks live.
//! [`extractor_for`] and [`extractor_for_host`] form the static dispatch
//! table that picks the strategy for a page.

use std::collections::HashSet;

use ego_tree::NodeId;
use scraper::{ElementRef, Selector};

use crate::engines::{BaiduExtractor, BingExtractor, GoogleExtractor};
use crate::error::{Result, SieveError};
use crate::page::Page;
use crate::types::{EngineKind, FragmentId, ResultFragment};

/// A pluggable result-block extraction strategy.
///
/// Implementors only describe *where* blocks live and which of them are
/// pinned; the shared [`extract`](ResultExtractor::extract) walks the page.
pub trait ResultExtractor: Send + Sync {
    /// Returns which [`EngineKind`] this strategy handles.
    fn engine_kind(&self) -> EngineKind;

    /// CSS selectors for result blocks. Matches are emitted in document
    /// order regardless of which selector matched.
    fn selectors(&self) -> &'static [&'static str];

    /// Whether a matched block is exempt from classification.
    fn is_pinned(&self, _element: &ElementRef<'_>) -> bool {
        false
    }

    /// Extract result fragments from `page` in document order.
    ///
    /// A block nested inside an already-matched block is skipped.
    ///
    /// # Errors
    ///
    /// Returns [`SieveError::Parse`] if a selector fails to parse.
    fn extract(&self, page: &Page) -> Result<Vec<ResultFragment>> {
        let joined = self.selectors().join(", ");
        let selector = Selector::parse(&joined)
            .map_err(|e| SieveError::Parse(format!("invalid result selector: {e:?}")))?;

        let engine = self.engine_kind();
        let mut seen: HashSet<NodeId> = HashSet::new();
        let mut fragments = Vec::new();

        for element in page.select(&selector) {
            let nested = element.ancestors().any(|a| seen.contains(&a.id()));
            if nested {
                continue;
            }
            seen.insert(element.id());
            fragments.push(ResultFragment {
                id: FragmentId(fragments.len()),
                engine,
                is_pinned: self.is_pinned(&element),
                node: element.id(),
            });
        }

        tracing::debug!(
            %engine,
            count = fragments.len(),
            pinned = fragments.iter().filter(|f| f.is_pinned).count(),
            "result fragments extracted"
        );
        Ok(fragments)
    }
}

/// Strategy for a known engine.
pub fn extractor_for(engine: EngineKind) -> &'static dyn ResultExtractor {
    match engine {
        EngineKind::Google => &GoogleExtractor,
        EngineKind::Bing => &BingExtractor,
        EngineKind::Baidu => &BaiduExtractor,
    }
}

/// Strategy for a page host, if any engine's host pattern matches.
pub fn extractor_for_host(host: &str) -> Option<&'static dyn ResultExtractor> {
    EngineKind::detect(host).map(extractor_for)
}

/// Extract fragments for `host`, or nothing when no engine matches.
///
/// # Errors
///
/// Propagates selector parse failures from the matched strategy.
pub fn extract_for_host(host: &str, page: &Page) -> Result<Vec<ResultFragment>> {
    match extractor_for_host(host) {
        Some(extractor) => extractor.extract(page),
        None => {
            tracing::trace!(host, "no engine adapter for host");
            Ok(Vec::new())
        }
    }
}
