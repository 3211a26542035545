//! Cover remediation
//!
//! Replaces a bad cover with the best untried candidate from the asset
//! source. Every fix attempt moves through the same sequence: resolve the
//! game's identity, fetch candidates, filter against history, select,
//! download, and only then commit the attempt to history. A failed download
//! never burns a candidate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use thiserror::Error;

use crate::error::Error;
use crate::models::{BatchFixItem, BatchFixReport, FixProgress, FixRequest, FixSuccess};
use crate::services::audit_orchestrator::RunningGuard;
use crate::services::{
    AssetCache, AssetClass, AssetSource, CacheError, CoverCandidate, SourceError, SourceGame,
};
use crate::store::{FixHistoryStore, StoreError};

/// Delay between batch items, twice the client's own request spacing, so
/// sustained batch runs stay clear of the source's rate limit
pub const BATCH_ITEM_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Error)]
pub enum FixError {
    #[error("No match in asset source catalog for \"{title}\"")]
    SourceNotFound { title: String },

    #[error("Source game {source_game_id} has no {class} candidates")]
    NoCandidates { source_game_id: i64, class: AssetClass },

    #[error("All {tried} candidates already tried for game {game_id}; clear its fix history to retry")]
    CandidatesExhausted { game_id: i64, tried: usize },

    #[error("{0}")]
    Cache(#[from] CacheError),

    #[error("Asset source error: {0}")]
    Source(#[from] SourceError),

    #[error("History store error: {0}")]
    Store(#[from] StoreError),
}

/// Replaces covers one game at a time
pub struct RemediationEngine<S, C> {
    source: S,
    cache: C,
    history: Arc<FixHistoryStore>,
    batch_running: Arc<AtomicBool>,
    // Published for synchronous pollers. Guards wrap a single clone or
    // store, never an await, so a panic cannot poison this lock.
    batch_progress: RwLock<Option<FixProgress>>,
    batch_item_delay: Duration,
}

impl<S: AssetSource, C: AssetCache> RemediationEngine<S, C> {
    pub fn new(source: S, cache: C, history: Arc<FixHistoryStore>) -> Self {
        Self {
            source,
            cache,
            history,
            batch_running: Arc::new(AtomicBool::new(false)),
            batch_progress: RwLock::new(None),
            batch_item_delay: BATCH_ITEM_DELAY,
        }
    }

    /// Override the inter-item batch delay; tests run with zero
    pub fn with_batch_item_delay(mut self, delay: Duration) -> Self {
        self.batch_item_delay = delay;
        self
    }

    pub fn is_batch_running(&self) -> bool {
        self.batch_running.load(Ordering::SeqCst)
    }

    /// Snapshot of the current (or most recent) batch run
    pub fn batch_progress(&self) -> Option<FixProgress> {
        self.batch_progress.read().unwrap().clone()
    }

    /// Replace one game's cover with the best candidate not yet tried
    ///
    /// The three no-progress outcomes stay distinct: the game may be unknown
    /// to the source ([`FixError::SourceNotFound`]), known but without any
    /// cover candidates ([`FixError::NoCandidates`]), or known with every
    /// candidate already tried ([`FixError::CandidatesExhausted`]).
    pub async fn fix_cover(&self, request: &FixRequest) -> Result<FixSuccess, FixError> {
        let game = self.resolve_identity(request).await?;
        tracing::debug!(
            game_id = request.game_id,
            source_game_id = game.id,
            source_name = %game.name,
            "Resolved game against asset source"
        );

        let candidates = self.source.list_candidates(&game, AssetClass::Cover).await?;
        if candidates.is_empty() {
            return Err(FixError::NoCandidates { source_game_id: game.id, class: AssetClass::Cover });
        }

        let history = self.history.entry_for(request.game_id).await?;
        let total = candidates.len();
        let untried: Vec<CoverCandidate> = candidates
            .into_iter()
            .filter(|c| !history.contains_candidate(&c.id) && !history.contains_url(&c.url))
            .collect();
        let Some(pick) = select_candidate(untried) else {
            return Err(FixError::CandidatesExhausted { game_id: request.game_id, tried: total });
        };
        tracing::info!(
            game_id = request.game_id,
            candidate_id = %pick.id,
            quality = pick.quality_score,
            "Selected replacement cover"
        );

        let local_path = self.cache.store_cover(request.game_id, &pick.url).await?;
        // Only a completed download reaches the ledger; a failed fetch must
        // leave the candidate available for retry
        self.history.record_attempt(request.game_id, &pick.id, &pick.url).await?;

        tracing::info!(game_id = request.game_id, path = %local_path.display(), "Cover fix committed");
        Ok(FixSuccess {
            game_id: request.game_id,
            candidate_id: pick.id,
            resolved_url: pick.url,
            local_path,
        })
    }

    /// Fix a list of games sequentially
    ///
    /// One report row per request, in input order; a failing item is
    /// recorded and the batch moves on. Only one batch runs at a time.
    pub async fn fix_batch(&self, requests: &[FixRequest]) -> Result<BatchFixReport, Error> {
        let _run = RunningGuard::claim(&self.batch_running).ok_or(Error::FixInProgress)?;

        let mut progress = FixProgress::new(requests.len());
        self.publish(&progress);
        tracing::info!(total = requests.len(), "Starting batch cover fix");

        let mut items = Vec::with_capacity(requests.len());
        for (index, request) in requests.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.batch_item_delay).await;
            }
            progress.current_game_id = Some(request.game_id);
            self.publish(&progress);

            match self.fix_cover(request).await {
                Ok(success) => {
                    progress.succeeded += 1;
                    items.push(BatchFixItem {
                        game_id: request.game_id,
                        success: true,
                        resolved_url: Some(success.resolved_url),
                        error: None,
                    });
                }
                Err(e) => {
                    progress.failed += 1;
                    tracing::warn!(game_id = request.game_id, error = %e, "Batch fix item failed");
                    items.push(BatchFixItem {
                        game_id: request.game_id,
                        success: false,
                        resolved_url: None,
                        error: Some(e.to_string()),
                    });
                }
            }
            progress.completed += 1;
            progress.current_game_id = None;
            self.publish(&progress);
        }

        tracing::info!(
            total = requests.len(),
            succeeded = progress.succeeded,
            failed = progress.failed,
            "Batch cover fix finished"
        );
        Ok(BatchFixReport { succeeded: progress.succeeded, failed: progress.failed, items })
    }

    /// Resolve the game against the source catalog: exact Steam app id
    /// lookup first, title search as fallback
    async fn resolve_identity(&self, request: &FixRequest) -> Result<SourceGame, FixError> {
        if let Some(app_id) = request.steam_app_id {
            if let Some(game) = self.source.lookup_by_steam_app_id(app_id).await? {
                return Ok(game);
            }
            tracing::debug!(
                game_id = request.game_id,
                steam_app_id = app_id,
                "Steam app id unknown to source, falling back to title search"
            );
        }
        let mut matches = self.source.search_by_title(&request.title).await?;
        if matches.is_empty() {
            return Err(FixError::SourceNotFound { title: request.title.clone() });
        }
        Ok(matches.remove(0))
    }

    fn publish(&self, progress: &FixProgress) {
        *self.batch_progress.write().unwrap() = Some(progress.clone());
    }
}

/// Best remaining candidate: clean ones outrank adult or humor flagged
/// ones, then higher source quality wins
fn select_candidate(mut candidates: Vec<CoverCandidate>) -> Option<CoverCandidate> {
    if candidates.is_empty() {
        return None;
    }
    candidates.sort_by(|a, b| {
        let a_flagged = a.is_adult || a.is_humor;
        let b_flagged = b.is_adult || b.is_humor;
        a_flagged
            .cmp(&b_flagged)
            .then_with(|| b.quality_score.total_cmp(&a.quality_score))
    });
    candidates.into_iter().next()
}
