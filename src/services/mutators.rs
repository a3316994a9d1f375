use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::instrument;

use crate::{
    cache::{CacheKey, DataCache},
    error::{GatewayResult, OrchestratorResult},
    gateway::MovieListGateway,
    models::{RecordId, UserMovie},
};

/// Single-step list actions with optimistic cache updates
///
/// Each action snapshots the affected cached collection, renders the post-action list
/// immediately, and writes the snapshot back unchanged if the server call fails.
pub struct ListMutators {
    gateway: Arc<dyn MovieListGateway>,
    cache: Arc<dyn DataCache>,
    /// Records deleted from the watchlist that can still be restored
    deleted: Mutex<HashMap<RecordId, UserMovie>>,
}

impl ListMutators {
    pub fn new(gateway: Arc<dyn MovieListGateway>, cache: Arc<dyn DataCache>) -> Self {
        Self {
            gateway,
            cache,
            deleted: Mutex::new(HashMap::new()),
        }
    }

    /// Removes `record_id` from the cached `key` while `remote` runs
    ///
    /// Returns the removed record, if it was cached. On success every key in `stale` is
    /// invalidated; on failure the snapshot is restored verbatim.
    async fn optimistic_remove<F>(
        &self,
        key: CacheKey,
        record_id: RecordId,
        stale: &[CacheKey],
        on_mutate: impl FnOnce(Option<&UserMovie>),
        remote: F,
    ) -> OrchestratorResult<Option<UserMovie>>
    where
        F: Future<Output = GatewayResult<()>>,
    {
        self.cache.cancel_in_flight(key);

        let snapshot = self.cache.read(key);
        let removed = snapshot
            .as_ref()
            .and_then(|records| records.iter().find(|r| r.id == record_id).cloned());

        if let Some(records) = &snapshot {
            let next: Vec<UserMovie> = records
                .iter()
                .filter(|r| r.id != record_id)
                .cloned()
                .collect();
            self.cache.write(key, next);
        }
        on_mutate(removed.as_ref());

        match remote.await {
            Ok(()) => {
                for k in stale {
                    self.cache.invalidate(*k);
                }
                Ok(removed)
            }
            Err(e) => {
                if let Some(records) = snapshot {
                    self.cache.write(key, records);
                }
                tracing::warn!(key = %key, record_id, error = %e, "Optimistic update rolled back");
                Err(e.into())
            }
        }
    }

    /// Marks a watchlist record as watched
    #[instrument(skip(self))]
    pub async fn mark_as_watched(
        &self,
        record_id: RecordId,
    ) -> OrchestratorResult<Option<UserMovie>> {
        let movie = self
            .optimistic_remove(
                CacheKey::Watchlist,
                record_id,
                &[CacheKey::Watchlist, CacheKey::Watched],
                |_| {},
                self.gateway.transform_to_target(record_id),
            )
            .await?;

        tracing::info!("Marked as watched");
        Ok(movie)
    }

    /// Deletes a watchlist record, keeping its value so the deletion can be undone
    #[instrument(skip(self))]
    pub async fn delete_with_undo(
        &self,
        record_id: RecordId,
    ) -> OrchestratorResult<Option<UserMovie>> {
        let result = self
            .optimistic_remove(
                CacheKey::Watchlist,
                record_id,
                &[CacheKey::Watchlist],
                |removed| {
                    if let Some(record) = removed {
                        self.deleted.lock().insert(record_id, record.clone());
                    }
                },
                self.gateway.remove(record_id),
            )
            .await;

        match result {
            Ok(movie) => {
                tracing::info!(undoable = movie.is_some(), "Deleted from watchlist");
                Ok(movie)
            }
            Err(e) => {
                self.deleted.lock().remove(&record_id);
                Err(e)
            }
        }
    }

    /// Restores a record removed by [`delete_with_undo`](Self::delete_with_undo)
    ///
    /// Returns `Ok(None)` when there is nothing to undo for this id. The kept value survives
    /// a failed attempt so the undo can be retried.
    #[instrument(skip(self))]
    pub async fn undo_delete(
        &self,
        record_id: RecordId,
    ) -> OrchestratorResult<Option<UserMovie>> {
        let kept = self.deleted.lock().get(&record_id).cloned();
        let Some(record) = kept else {
            return Ok(None);
        };

        self.gateway.transform_to_source(record_id).await?;

        self.deleted.lock().remove(&record_id);
        self.cache.invalidate(CacheKey::Watchlist);

        tracing::info!("Deletion undone");
        Ok(Some(record))
    }

    /// Moves a watched record back to the watchlist
    #[instrument(skip(self))]
    pub async fn restore_to_watchlist(
        &self,
        record_id: RecordId,
    ) -> OrchestratorResult<Option<UserMovie>> {
        let movie = self
            .optimistic_remove(
                CacheKey::Watched,
                record_id,
                &[CacheKey::Watched, CacheKey::Watchlist],
                |_| {},
                self.gateway.transform_to_source(record_id),
            )
            .await?;

        tracing::info!("Restored to watchlist");
        Ok(movie)
    }

    /// Whether a deleted record is still waiting for a possible undo
    pub fn can_undo_delete(&self, record_id: RecordId) -> bool {
        self.deleted.lock().contains_key(&record_id)
    }
}
