//! Fan-out classification and scoring of one pass's candidates.

use std::sync::Arc;

use crate::client::ClassificationClient;
use crate::types::{ClassificationRequest, ClassificationResult, RankedEntry, ResultFragment};

use super::context::{Candidate, PassContext};
use super::order::sort_entries;

/// Ordering produced by a completed pass. Nothing here touches the page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ranking {
    /// Answers first, then organic results by descending score.
    pub entries: Vec<RankedEntry>,
    /// Fragments classified as ads, in document order, for the caller to
    /// hide.
    pub blocked: Vec<ResultFragment>,
}

/// Result of [`RankingEngine::rank`].
#[derive(Debug, Clone, PartialEq)]
pub enum RankOutcome {
    /// The pass ran to completion.
    Ranked(Ranking),
    /// A newer pass started first; late results were discarded.
    Superseded,
}

impl RankOutcome {
    /// The ranking, if the pass completed.
    pub fn into_ranking(self) -> Option<Ranking> {
        match self {
            Self::Ranked(ranking) => Some(ranking),
            Self::Superseded => None,
        }
    }
}

enum Verdict {
    Blocked(ResultFragment),
    Kept(RankedEntry),
}

/// Classifies and scores candidates through a [`ClassificationClient`].
///
/// Classifier failures never escape: a failed ad check counts as organic
/// and a failed relevance score counts as `0.0`.
#[derive(Debug, Clone)]
pub struct RankingEngine {
    client: Arc<ClassificationClient>,
}

impl RankingEngine {
    /// Engine sending requests through `client`.
    pub fn new(client: Arc<ClassificationClient>) -> Self {
        Self { client }
    }

    /// The underlying client.
    pub fn client(&self) -> &ClassificationClient {
        &self.client
    }

    /// Rank `candidates` for the pass described by `ctx`.
    ///
    /// Pinned candidates are never sent to the classifier. Every rankable
    /// candidate is evaluated concurrently on the calling task; the sort
    /// only starts after all of them have finished or fallen back.
    pub async fn rank(&self, ctx: &PassContext, candidates: Vec<Candidate>) -> RankOutcome {
        if ctx.is_cancelled() {
            return RankOutcome::Superseded;
        }

        let (pinned, rankable): (Vec<Candidate>, Vec<Candidate>) =
            candidates.into_iter().partition(|c| c.fragment.is_pinned);

        let evaluations =
            futures::future::join_all(rankable.iter().map(|candidate| self.evaluate(ctx, candidate)));

        let verdicts = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => {
                tracing::debug!(generation = ctx.generation, "pass superseded during classification");
                return RankOutcome::Superseded;
            }
            verdicts = evaluations => verdicts,
        };

        let mut entries: Vec<RankedEntry> = pinned
            .iter()
            .map(|c| RankedEntry {
                fragment: c.fragment,
                score: 0.0,
                is_answer: true,
            })
            .collect();
        let mut blocked = Vec::new();
        for verdict in verdicts {
            match verdict {
                Verdict::Blocked(fragment) => blocked.push(fragment),
                Verdict::Kept(entry) => entries.push(entry),
            }
        }

        // Document order first, so the stable sort breaks ties by position.
        entries.sort_by_key(|e| e.fragment.id);
        sort_entries(&mut entries);

        tracing::debug!(
            generation = ctx.generation,
            answers = pinned.len(),
            ranked = entries.len() - pinned.len(),
            blocked = blocked.len(),
            "pass ranked"
        );

        RankOutcome::Ranked(Ranking { entries, blocked })
    }

    async fn evaluate(&self, ctx: &PassContext, candidate: &Candidate) -> Verdict {
        let fragment = candidate.fragment;
        if ctx.flags.ad_blocking && self.is_ad(ctx, candidate).await {
            return Verdict::Blocked(fragment);
        }
        let score = if ctx.flags.search_reordering {
            self.relevance(ctx, candidate).await
        } else {
            0.0
        };
        Verdict::Kept(RankedEntry {
            fragment,
            score,
            is_answer: false,
        })
    }

    async fn is_ad(&self, ctx: &PassContext, candidate: &Candidate) -> bool {
        if candidate.heuristic_ad {
            tracing::trace!(fragment = %candidate.fragment.id, "ad marker in markup");
            return true;
        }
        if candidate.text.is_empty() {
            return false;
        }
        let request = ClassificationRequest::ad_check(candidate.text.as_str(), &ctx.query);
        match self.client.request(&request).await {
            Ok(ClassificationResult::AdCheck { is_ad }) => is_ad,
            Ok(other) => {
                tracing::warn!(
                    fragment = %candidate.fragment.id,
                    endpoint = %other.endpoint(),
                    "unexpected ad check result"
                );
                false
            }
            Err(error) => {
                tracing::warn!(
                    fragment = %candidate.fragment.id,
                    error = %error,
                    "ad check failed, keeping result"
                );
                false
            }
        }
    }

    async fn relevance(&self, ctx: &PassContext, candidate: &Candidate) -> f64 {
        if candidate.text.is_empty() {
            return 0.0;
        }
        let request = ClassificationRequest::relevance(candidate.text.as_str(), &ctx.query);
        match self.client.request(&request).await {
            Ok(ClassificationResult::Relevance { score }) => score,
            Ok(other) => {
                tracing::warn!(
                    fragment = %candidate.fragment.id,
                    endpoint = %other.endpoint(),
                    "unexpected relevance result"
                );
                0.0
            }
            Err(error) => {
                tracing::warn!(
                    fragment = %candidate.fragment.id,
                    error = %error,
                    "relevance scoring failed, using 0"
                );
                0.0
            }
        }
    }
}
