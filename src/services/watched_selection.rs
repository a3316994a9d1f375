use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::{
    cache::{CacheKey, DataCache},
    error::{OrchestratorError, OrchestratorResult},
    gateway::MovieListGateway,
    models::{MovieId, MovieMetadata, SearchHit, SelectionItem},
    services::{
        acquisition::acquire_watched,
        rollback::{compensate, Compensation},
        selection::{PickRejection, SelectionMachine},
    },
};

/// Result of picking a movie in the watched-selection flow
#[derive(Debug)]
pub enum PickOutcome {
    /// The movie is now watched and held as a settled selection
    Settled {
        item: SelectionItem,
        /// The movie had been marked as watched before this pick
        already_watched: bool,
    },
    /// The guard refused the pick; nothing was sent to the server
    Rejected(PickRejection),
    /// The flow was abandoned while the pick was in flight; the remote state stands
    Discarded,
    /// The acquisition failed and the pick was removed from the selection
    Failed(OrchestratorError),
}

/// Result of undoing a selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoOutcome {
    RolledBack(Compensation),
    /// No settled item for this movie (unknown, still pending, or already undoing)
    NotSettled,
}

/// Orchestrates the "mark movies as watched" step of onboarding
///
/// The selection machine lock is never held across a gateway call, so picks for different
/// movies may run concurrently while picks for the same movie are rejected by the guard.
pub struct WatchedSelectionFlow {
    session_id: Uuid,
    gateway: Arc<dyn MovieListGateway>,
    cache: Arc<dyn DataCache>,
    machine: Mutex<SelectionMachine>,
}

impl WatchedSelectionFlow {
    pub fn new(
        gateway: Arc<dyn MovieListGateway>,
        cache: Arc<dyn DataCache>,
        max_selected: usize,
    ) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            gateway,
            cache,
            machine: Mutex::new(SelectionMachine::new(max_selected)),
        }
    }

    pub fn max_selected(&self) -> usize {
        self.machine.lock().max_selected()
    }

    /// Snapshot of the current selection, in pick order
    pub fn items(&self) -> Vec<SelectionItem> {
        self.machine.lock().items().to_vec()
    }

    pub fn can_pick(&self, movie_id: &MovieId) -> bool {
        self.machine.lock().can_pick(movie_id)
    }

    /// Seeds the selection with movies the user already watched
    ///
    /// Uses the cached watched list when present, otherwise fetches it and caches the result.
    pub async fn prefill_from_watched(&self) -> OrchestratorResult<usize> {
        let watched = match self.cache.read(CacheKey::Watched) {
            Some(records) => records,
            None => {
                let records = self.gateway.list_target().await?;
                self.cache.write(CacheKey::Watched, records.clone());
                records
            }
        };

        let added = self.machine.lock().prefill(&watched);

        tracing::debug!(session_id = %self.session_id, added, "Prefilled selection from watched list");

        Ok(added)
    }

    pub async fn pick_hit(&self, hit: &SearchHit) -> PickOutcome {
        self.pick(hit.tconst.clone(), MovieMetadata::from(hit)).await
    }

    /// Picks a movie and makes sure it ends up marked as watched
    pub async fn pick(&self, movie_id: MovieId, metadata: MovieMetadata) -> PickOutcome {
        let begun = self.machine.lock().begin_pick(movie_id.clone(), metadata);
        if let Err(rejection) = begun {
            tracing::info!(session_id = %self.session_id, movie_id = %movie_id, reason = %rejection, "Pick rejected");
            return PickOutcome::Rejected(rejection);
        }

        let result = acquire_watched(self.gateway.as_ref(), &movie_id).await;

        // Either step may have changed the server lists, even on failure
        self.cache.invalidate(CacheKey::Watchlist);
        self.cache.invalidate(CacheKey::Watched);

        let mut machine = self.machine.lock();
        match result {
            Ok(acquisition) => {
                machine.commit_pick(&movie_id, acquisition.record_id, acquisition.origin);

                match machine.get(&movie_id).filter(|i| i.is_settled()) {
                    Some(item) => PickOutcome::Settled {
                        item: item.clone(),
                        already_watched: acquisition.already_watched(),
                    },
                    None => {
                        tracing::info!(session_id = %self.session_id, movie_id = %movie_id, "Pick settled after the selection was discarded");
                        PickOutcome::Discarded
                    }
                }
            }
            Err(e) => {
                machine.abandon_pick(&movie_id);
                tracing::warn!(
                    session_id = %self.session_id,
                    movie_id = %movie_id,
                    kind = e.kind(),
                    error = %e,
                    "Pick failed"
                );
                PickOutcome::Failed(e)
            }
        }
    }

    /// Retracts a settled selection, compensating on the server first
    ///
    /// The item stays visible (as undoing) until the server confirms. If the compensating
    /// call fails, the item returns to settled and `RollbackFailed` is returned.
    pub async fn undo(&self, movie_id: &MovieId) -> OrchestratorResult<UndoOutcome> {
        let settled = self.machine.lock().begin_undo(movie_id);
        let Some(settled) = settled else {
            return Ok(UndoOutcome::NotSettled);
        };

        let (Some(record_id), Some(origin)) = (settled.record_id, settled.origin) else {
            // Settled items always carry both; treat anything else as a local-only item
            self.machine.lock().remove_settled(movie_id);
            return Ok(UndoOutcome::NotSettled);
        };

        match compensate(self.gateway.as_ref(), movie_id, record_id, origin).await {
            Ok(compensation) => {
                self.machine.lock().remove_settled(movie_id);
                self.cache.invalidate(CacheKey::Watchlist);
                self.cache.invalidate(CacheKey::Watched);
                Ok(UndoOutcome::RolledBack(compensation))
            }
            Err(e) => {
                self.machine.lock().cancel_undo(movie_id);
                tracing::warn!(
                    session_id = %self.session_id,
                    movie_id = %movie_id,
                    record_id,
                    error = %e,
                    "Rollback failed, selection kept"
                );
                Err(OrchestratorError::RollbackFailed {
                    movie_id: movie_id.clone(),
                    source: Box::new(e),
                })
            }
        }
    }

    /// Abandons the flow, dropping every selection without compensation
    pub fn abandon(&self) -> Vec<SelectionItem> {
        let dropped = self.machine.lock().discard();
        tracing::debug!(session_id = %self.session_id, dropped = dropped.len(), "Selection abandoned");
        dropped
    }
}
