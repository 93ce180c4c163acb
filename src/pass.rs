//! One analysis pass over a result page: prepare, rank, commit.
//!
//! A pass is split in three so the page is only borrowed when needed:
//!
//! - [`Sieve::prepare`] reads the page (query, engine, fragments, text),
//!   snapshots the flags and starts a new generation, cancelling the
//!   previous pass
//! - [`Sieve::run`] classifies and ranks without touching the page
//! - [`Sieve::commit`] hides blocked ads and reflows the results, unless a
//!   newer pass has started in the meantime
//!
//! [`Sieve::analyze`] chains the three.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::client::ClassificationClient;
use crate::config::RankingConfig;
use crate::engine::extractor_for;
use crate::error::Result;
use crate::flags::{FeatureFlags, FlagChange, FlagStore};
use crate::heuristics::looks_like_ad;
use crate::page::Page;
use crate::query::query_from_url;
use crate::ranking::{Candidate, PassContext, RankOutcome, RankingEngine};
use crate::reorder::{self, ReorderReport};
use crate::stats::{NoopStats, StatsSink};
use crate::text::visible_text;
use crate::types::{EngineKind, RankedEntry, ResultFragment};

/// Page data gathered by [`Sieve::prepare`], ready to rank.
#[derive(Debug, Clone)]
pub struct PreparedPass {
    context: PassContext,
    engine: EngineKind,
    candidates: Vec<Candidate>,
}

impl PreparedPass {
    /// Generation number of this pass.
    pub fn generation(&self) -> u64 {
        self.context.generation
    }

    /// Detected engine.
    pub fn engine(&self) -> EngineKind {
        self.engine
    }

    /// Active search query.
    pub fn query(&self) -> &str {
        &self.context.query
    }

    /// Flags the pass was started with.
    pub fn flags(&self) -> FeatureFlags {
        self.context.flags
    }

    /// Extracted fragments with their text.
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }
}

/// A ranked pass waiting to be committed.
#[derive(Debug, Clone)]
pub struct RankedPass {
    context: PassContext,
    engine: EngineKind,
    outcome: RankOutcome,
}

impl RankedPass {
    /// Generation number of this pass.
    pub fn generation(&self) -> u64 {
        self.context.generation
    }

    /// Ranking result, or [`RankOutcome::Superseded`].
    pub fn outcome(&self) -> &RankOutcome {
        &self.outcome
    }
}

/// Whether a pass reached the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassStatus {
    /// Directives and reorder were applied.
    Committed,
    /// A newer pass started first; the page was left alone.
    Superseded,
}

/// What a committed (or discarded) pass did.
#[derive(Debug, Clone, PartialEq)]
pub struct PassReport {
    /// Generation number of the pass.
    pub generation: u64,
    /// Detected engine.
    pub engine: EngineKind,
    /// Active search query.
    pub query: String,
    /// Whether anything was applied.
    pub status: PassStatus,
    /// Final ordering, answers first.
    pub entries: Vec<RankedEntry>,
    /// Fragments classified as ads.
    pub blocked: Vec<ResultFragment>,
    /// Ads hidden by this pass that were visible before it.
    pub newly_hidden: usize,
    /// Ranked results an earlier pass had hidden, shown again.
    pub newly_shown: usize,
    /// Reflow summary; all zero when reordering is off.
    pub reorder: ReorderReport,
}

impl PassReport {
    fn superseded(pass: &RankedPass) -> Self {
        Self {
            generation: pass.context.generation,
            engine: pass.engine,
            query: pass.context.query.clone(),
            status: PassStatus::Superseded,
            entries: Vec::new(),
            blocked: Vec::new(),
            newly_hidden: 0,
            newly_shown: 0,
            reorder: ReorderReport::default(),
        }
    }
}

/// Effect of [`Sieve::apply_flag_change`] on the page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlagChangeReport {
    /// Results unhidden because ad blocking was switched off.
    pub shown: usize,
    /// Natural-order restore, when reordering was switched off.
    pub restored: ReorderReport,
}

/// Drives analysis passes for one page session.
///
/// Only the newest pass may commit. Starting a pass cancels the one before
/// it, so its in-flight classification stops at the next await and its
/// results never reach the page.
pub struct Sieve {
    ranker: RankingEngine,
    flags: Arc<FlagStore>,
    stats: Arc<dyn StatsSink>,
    ranking: RankingConfig,
    generation: AtomicU64,
    current: Mutex<CancellationToken>,
}

impl std::fmt::Debug for Sieve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sieve")
            .field("flags", &self.flags.current())
            .field("ranking", &self.ranking)
            .field("generation", &self.latest_generation())
            .finish()
    }
}

impl Sieve {
    /// Driver classifying through `client` with flags read from `flags`.
    pub fn new(client: Arc<ClassificationClient>, flags: Arc<FlagStore>) -> Self {
        Self {
            ranker: RankingEngine::new(client),
            flags,
            stats: Arc::new(NoopStats),
            ranking: RankingConfig::default(),
            generation: AtomicU64::new(0),
            current: Mutex::new(CancellationToken::new()),
        }
    }

    /// Report hidden ads and reordered pages to `stats`.
    pub fn with_stats(mut self, stats: Arc<dyn StatsSink>) -> Self {
        self.stats = stats;
        self
    }

    /// Use `config` for candidate preparation.
    pub fn with_ranking_config(mut self, config: RankingConfig) -> Self {
        self.ranking = config;
        self
    }

    /// The flag store passes snapshot.
    pub fn flags(&self) -> &FlagStore {
        &self.flags
    }

    /// Receiver notified on every flag change.
    pub fn flag_changes(&self) -> watch::Receiver<FeatureFlags> {
        self.flags.subscribe()
    }

    /// Generation of the most recently started pass; `0` before the first.
    pub fn latest_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Cancel the pass currently in flight, if any.
    pub fn cancel_current(&self) {
        self.lock_current().cancel();
    }

    /// Gather everything a pass needs from `page`.
    ///
    /// Returns `Ok(None)` when `address` carries no search query or no
    /// engine matches its host; no generation is started then.
    ///
    /// # Errors
    ///
    /// Propagates selector parse failures from the engine adapter.
    pub fn prepare(&self, page: &Page, address: &str) -> Result<Option<PreparedPass>> {
        let Ok(url) = Url::parse(address) else {
            tracing::debug!("page address is not a URL, skipping pass");
            return Ok(None);
        };
        let Some(engine) = url.host_str().and_then(EngineKind::detect) else {
            tracing::debug!("no engine for page host, skipping pass");
            return Ok(None);
        };
        let Some(query) = query_from_url(&url) else {
            tracing::debug!(%engine, "no search query on page, skipping pass");
            return Ok(None);
        };
        tracing::trace!(%engine, query = %query, "preparing pass");

        let fragments = extractor_for(engine).extract(page)?;
        let candidates: Vec<Candidate> = fragments
            .into_iter()
            .map(|fragment| {
                let mut candidate = Candidate::new(fragment, visible_text(page, fragment.node));
                candidate.heuristic_ad =
                    self.ranking.heuristic_prefilter && looks_like_ad(page, fragment.node);
                candidate
            })
            .collect();

        let flags = self.flags.current();
        let (generation, cancel) = self.begin_generation();
        tracing::debug!(
            generation,
            %engine,
            fragments = candidates.len(),
            "pass prepared"
        );

        Ok(Some(PreparedPass {
            context: PassContext {
                generation,
                query,
                flags,
                cancel,
            },
            engine,
            candidates,
        }))
    }

    /// Classify and rank a prepared pass.
    pub async fn run(&self, pass: PreparedPass) -> RankedPass {
        let outcome = self.ranker.rank(&pass.context, pass.candidates).await;
        RankedPass {
            context: pass.context,
            engine: pass.engine,
            outcome,
        }
    }

    /// Apply a ranked pass to `page`.
    ///
    /// With ad blocking on, blocked fragments are hidden and ranked ones are
    /// shown, so a block re-judged as organic reappears. A pass that was cancelled, or that is no longer the newest
    /// generation, leaves the page untouched.
    pub fn commit(&self, page: &mut Page, pass: RankedPass) -> PassReport {
        let latest = self.latest_generation();
        if pass.context.generation != latest || pass.context.is_cancelled() {
            tracing::debug!(
                generation = pass.context.generation,
                latest,
                "discarding superseded pass"
            );
            return PassReport::superseded(&pass);
        }
        let ranking = match &pass.outcome {
            RankOutcome::Ranked(ranking) => ranking,
            RankOutcome::Superseded => return PassReport::superseded(&pass),
        };
        let flags = pass.context.flags;

        let mut newly_hidden = 0;
        let mut newly_shown = 0;
        if flags.ad_blocking {
            newly_shown = ranking
                .entries
                .iter()
                .filter(|entry| !entry.is_answer && page.show(entry.fragment.node))
                .count();
            newly_hidden = ranking
                .blocked
                .iter()
                .filter(|fragment| page.hide(fragment.node))
                .count();
            if newly_hidden > 0 {
                self.stats.record_ad_blocked(newly_hidden as u64);
            }
        }

        let mut reorder = ReorderReport::default();
        if flags.search_reordering {
            reorder = reorder::apply(page, &ranking.entries);
            if reorder.moved > 0 {
                self.stats.record_search_reordered();
            }
        }

        tracing::debug!(
            generation = pass.context.generation,
            newly_hidden,
            newly_shown,
            moved = reorder.moved,
            "pass committed"
        );

        PassReport {
            generation: pass.context.generation,
            engine: pass.engine,
            query: pass.context.query.clone(),
            status: PassStatus::Committed,
            entries: ranking.entries.clone(),
            blocked: ranking.blocked.clone(),
            newly_hidden,
            newly_shown,
            reorder,
        }
    }

    /// Prepare, run and commit a pass over `page`.
    ///
    /// # Errors
    ///
    /// Propagates selector parse failures from the engine adapter.
    pub async fn analyze(&self, page: &mut Page, address: &str) -> Result<Option<PassReport>> {
        let Some(prepared) = self.prepare(page, address)? else {
            return Ok(None);
        };
        let ranked = self.run(prepared).await;
        Ok(Some(self.commit(page, ranked)))
    }

    /// Undo what disabled flags had applied to `page`.
    ///
    /// Cancels the pass in flight, whose flag snapshot is now stale. When
    /// ad blocking was switched off every hidden result is shown again;
    /// when reordering was switched off `engine`'s containers return to
    /// natural order. The caller should then run a fresh pass.
    ///
    /// # Errors
    ///
    /// Propagates selector parse failures from the engine adapter.
    pub fn apply_flag_change(
        &self,
        page: &mut Page,
        engine: EngineKind,
        change: FlagChange,
    ) -> Result<FlagChangeReport> {
        self.cancel_current();
        let FlagChange { previous, next } = change;

        let mut report = FlagChangeReport::default();
        if previous.ad_blocking && !next.ad_blocking {
            report.shown = page.show_all();
        }
        if previous.search_reordering && !next.search_reordering {
            report.restored = reorder::restore(page, engine)?;
        }

        tracing::debug!(
            shown = report.shown,
            restored = report.restored.moved,
            "flag change applied"
        );
        Ok(report)
    }

    fn begin_generation(&self) -> (u64, CancellationToken) {
        let mut current = self.lock_current();
        current.cancel();
        let token = CancellationToken::new();
        *current = token.clone();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        (generation, token)
    }

    fn lock_current(&self) -> std::sync::MutexGuard<'_, CancellationToken> {
        self.current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
