//! Per-pass inputs to the ranking engine.

use tokio_util::sync::CancellationToken;

use crate::flags::FeatureFlags;
use crate::types::ResultFragment;

/// Everything one pass needs besides the candidates themselves.
///
/// Flags are a snapshot taken when the pass began; later flag changes do
/// not affect a pass already under way.
#[derive(Debug, Clone)]
pub struct PassContext {
    /// Pass number; only the newest generation may commit.
    pub generation: u64,
    /// Active search query.
    pub query: String,
    /// Flag snapshot.
    pub flags: FeatureFlags,
    /// Fires when a newer pass supersedes this one.
    pub cancel: CancellationToken,
}

impl PassContext {
    /// Context for a standalone pass that is never cancelled.
    pub fn new(query: impl Into<String>, flags: FeatureFlags) -> Self {
        Self {
            generation: 0,
            query: query.into(),
            flags,
            cancel: CancellationToken::new(),
        }
    }

    /// Whether a newer pass has superseded this one.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// A fragment together with the text it is classified by.
///
/// Text is extracted on the calling task before fan-out, so concurrent
/// classification never touches the document.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// The extracted fragment.
    pub fragment: ResultFragment,
    /// Visible text of the fragment.
    pub text: String,
    /// Whether the markup heuristic already flagged this block as an ad.
    pub heuristic_ad: bool,
}

impl Candidate {
    /// Candidate without a heuristic verdict.
    pub fn new(fragment: ResultFragment, text: impl Into<String>) -> Self {
        Self {
            fragment,
            text: text.into(),
            heuristic_ad: false,
        }
    }
}
