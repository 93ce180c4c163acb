//! Core types: engines, fragments, classification requests and results.

use ego_tree::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Search engines whose result pages can be analysed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineKind {
    /// Google web search.
    Google,
    /// Bing web search. The only engine with pinned answer blocks.
    Bing,
    /// Baidu web search.
    Baidu,
}

impl EngineKind {
    /// Returns the human-readable name of this engine.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Google => "Google",
            Self::Bing => "Bing",
            Self::Baidu => "Baidu",
        }
    }

    /// Substring that identifies this engine in a page host.
    pub fn host_pattern(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Bing => "bing",
            Self::Baidu => "baidu",
        }
    }

    /// Returns all engine variants in host-matching priority order.
    pub fn all() -> &'static [EngineKind] {
        &[Self::Google, Self::Bing, Self::Baidu]
    }

    /// Select the engine whose host pattern occurs in `host`.
    pub fn detect(host: &str) -> Option<EngineKind> {
        let host = host.to_ascii_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|engine| host.contains(engine.host_pattern()))
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which classifier endpoint a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EndpointKind {
    /// Is this block an advertisement?
    AdCheck,
    /// How relevant is this block to the query?
    Relevance,
    /// Summarise a page and pick keywords.
    Summarize,
}

impl EndpointKind {
    /// Endpoint name used on the wire and in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AdCheck => "analyzeContent",
            Self::Relevance => "calculateRelevance",
            Self::Summarize => "analyzeReading",
        }
    }
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single classify-or-score request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationRequest {
    /// Stable hash of `(content, query, endpoint)`.
    pub fingerprint: String,
    /// Visible text (or page content) to classify.
    pub content: String,
    /// Active search query, if the endpoint uses one.
    pub query: Option<String>,
    /// Target endpoint.
    pub endpoint: EndpointKind,
}

impl ClassificationRequest {
    /// Build a request and derive its fingerprint.
    pub fn new(endpoint: EndpointKind, content: impl Into<String>, query: Option<&str>) -> Self {
        let content = content.into();
        let query = query.map(str::to_owned);
        let fingerprint = fingerprint(endpoint, &content, query.as_deref());
        Self {
            fingerprint,
            content,
            query,
            endpoint,
        }
    }

    /// Ad check for a result block's visible text.
    pub fn ad_check(content: impl Into<String>, query: &str) -> Self {
        Self::new(EndpointKind::AdCheck, content, Some(query))
    }

    /// Relevance score of a result block's visible text against the query.
    pub fn relevance(content: impl Into<String>, query: &str) -> Self {
        Self::new(EndpointKind::Relevance, content, Some(query))
    }

    /// Summary and keywords for a page's main content.
    pub fn summarize(content: impl Into<String>) -> Self {
        Self::new(EndpointKind::Summarize, content, None)
    }
}

/// Compute the hex BLAKE3 fingerprint of a request's identity.
///
/// Fields are length-prefixed so that no two distinct triples collide by
/// concatenation.
pub fn fingerprint(endpoint: EndpointKind, content: &str, query: Option<&str>) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(endpoint.name().as_bytes());
    match query {
        Some(q) => {
            hasher.update(&[1]);
            hasher.update(&(q.len() as u64).to_le_bytes());
            hasher.update(q.as_bytes());
        }
        None => {
            hasher.update(&[0]);
        }
    }
    hasher.update(&(content.len() as u64).to_le_bytes());
    hasher.update(content.as_bytes());
    hasher.finalize().to_hex().to_string()
}

/// A validated classifier outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassificationResult {
    /// Ad check verdict.
    AdCheck {
        /// Whether the block is an advertisement.
        is_ad: bool,
    },
    /// Relevance score, always within `[0, 1]`.
    Relevance {
        /// Relevance of the block to the query.
        score: f64,
    },
    /// Page summary.
    Summary {
        /// Short prose summary.
        summary: String,
        /// Keywords in the order the backend returned them.
        keywords: Vec<String>,
    },
}

impl ClassificationResult {
    /// Endpoint this result answers.
    pub fn endpoint(&self) -> EndpointKind {
        match self {
            Self::AdCheck { .. } => EndpointKind::AdCheck,
            Self::Relevance { .. } => EndpointKind::Relevance,
            Self::Summary { .. } => EndpointKind::Summarize,
        }
    }
}

/// Document-order index of a fragment within one analysis pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FragmentId(pub usize);

impl fmt::Display for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One candidate result block extracted from a page snapshot.
///
/// `node` is the handle of the underlying element; the fragment is only
/// meaningful for the [`Page`](crate::page::Page) it was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResultFragment {
    /// Position among the pass's fragments.
    pub id: FragmentId,
    /// Engine whose adapter produced this fragment.
    pub engine: EngineKind,
    /// Pinned fragments skip classification and always rank first.
    pub is_pinned: bool,
    /// Underlying DOM node.
    pub node: NodeId,
}

/// A fragment's place in the final ordering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedEntry {
    /// The ranked fragment.
    pub fragment: ResultFragment,
    /// Relevance score; `0.0` for pinned entries and unscored results.
    pub score: f64,
    /// True for pinned answer blocks.
    pub is_answer: bool,
}
