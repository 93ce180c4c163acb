//! Reading mode: page summaries, keywords and scroll progress.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::client::ClassificationClient;
use crate::config::ReadingConfig;
use crate::content::{extract_content_with_limit, PageContent};
use crate::error::Result;
use crate::flags::FlagStore;
use crate::types::{ClassificationRequest, ClassificationResult};

/// Summary and keywords for one page. Empty when unavailable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingSummary {
    /// Short prose summary.
    pub summary: String,
    /// Key terms, in the order the classifier returned them.
    pub keywords: Vec<String>,
}

impl ReadingSummary {
    /// Whether there is nothing to show.
    pub fn is_empty(&self) -> bool {
        self.summary.is_empty() && self.keywords.is_empty()
    }
}

/// Receives reading-mode updates for display.
pub trait ReadingPresenter: Send + Sync {
    /// A summary is ready (possibly empty).
    fn show_summary(&self, summary: &ReadingSummary);

    /// Reading progress changed; `percent` is in `[0, 100]`.
    fn show_progress(&self, percent: f64);
}

/// Summarises pages through the classifier when context suggestions are on.
#[derive(Debug, Clone)]
pub struct ReadingAssistant {
    client: Arc<ClassificationClient>,
    flags: Arc<FlagStore>,
    config: ReadingConfig,
}

impl ReadingAssistant {
    /// Assistant summarising through `client`, gated by `flags`.
    pub fn new(client: Arc<ClassificationClient>, flags: Arc<FlagStore>, config: ReadingConfig) -> Self {
        Self {
            client,
            flags,
            config,
        }
    }

    /// Extract `html` with the configured character limit.
    ///
    /// # Errors
    ///
    /// Returns [`SieveError::Parse`](crate::SieveError::Parse) when the page
    /// has no readable text.
    pub fn extract(&self, html: &str, url: &str) -> Result<PageContent> {
        extract_content_with_limit(html, url, self.config.max_chars)
    }

    /// Summarise `content`.
    ///
    /// Returns an empty summary without a backend call when context
    /// suggestions are off or the content is empty, and an empty summary on
    /// any classifier failure.
    pub async fn summarize(&self, content: &PageContent) -> ReadingSummary {
        if !self.flags.current().context_suggestions {
            tracing::trace!("context suggestions off, not summarising");
            return ReadingSummary::default();
        }
        if content.text.trim().is_empty() {
            return ReadingSummary::default();
        }

        let request = ClassificationRequest::summarize(content.text.as_str());
        match self.client.request(&request).await {
            Ok(ClassificationResult::Summary { summary, keywords }) => {
                ReadingSummary { summary, keywords }
            }
            Ok(other) => {
                tracing::warn!(endpoint = %other.endpoint(), "unexpected summary result");
                ReadingSummary::default()
            }
            Err(error) => {
                tracing::warn!(url = %content.url, error = %error, "summary failed");
                ReadingSummary::default()
            }
        }
    }

    /// Summarise `content` and hand the result to `presenter`.
    pub async fn present(
        &self,
        content: &PageContent,
        presenter: &dyn ReadingPresenter,
    ) -> ReadingSummary {
        let summary = self.summarize(content).await;
        presenter.show_summary(&summary);
        summary
    }

    /// Compute [`reading_progress`] for a scroll position and push it to
    /// `presenter`.
    pub fn report_progress(
        &self,
        presenter: &dyn ReadingPresenter,
        scroll_top: f64,
        scroll_height: f64,
        viewport_height: f64,
    ) -> f64 {
        let percent = reading_progress(scroll_top, scroll_height, viewport_height);
        presenter.show_progress(percent);
        percent
    }
}

/// Percentage of the document scrolled past, clamped to `[0, 100]`.
///
/// A document no taller than the viewport counts as fully read. Non-finite
/// input yields `0`.
pub fn reading_progress(scroll_top: f64, scroll_height: f64, viewport_height: f64) -> f64 {
    let scrollable = scroll_height - viewport_height;
    if !scrollable.is_finite() || !scroll_top.is_finite() {
        return 0.0;
    }
    if scrollable <= 0.0 {
        return 100.0;
    }
    (scroll_top / scrollable * 100.0).clamp(0.0, 100.0)
}
