use std::collections::{HashMap, VecDeque};

use chrono::Utc;
use parking_lot::Mutex;

use crate::{
    error::{GatewayError, GatewayResult},
    gateway::{MovieListGateway, MovieSearch},
    models::{MovieDetails, MovieId, RecordId, SearchHit, UserMovie},
};

/// Gateway operation, used for call logs and failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOp {
    AddToSource,
    ListSource,
    TransformToTarget,
    ListTarget,
    TransformToSource,
    Remove,
    Search,
}

struct StoredRecord {
    record: UserMovie,
    /// Soft-deleted records are hidden from every listing until restored
    deleted: bool,
}

#[derive(Default)]
struct Store {
    next_id: RecordId,
    records: Vec<StoredRecord>,
    catalog: Vec<SearchHit>,
    calls: Vec<GatewayOp>,
    failures: HashMap<GatewayOp, VecDeque<GatewayError>>,
}

impl Store {
    fn get_mut(&mut self, record_id: RecordId) -> GatewayResult<&mut StoredRecord> {
        self.records
            .iter_mut()
            .find(|r| r.record.id == record_id)
            .ok_or_else(|| GatewayError::NotFound(format!("record {}", record_id)))
    }

    fn visible(&self) -> impl Iterator<Item = &UserMovie> {
        self.records.iter().filter(|r| !r.deleted).map(|r| &r.record)
    }

    fn details_for(&self, movie_id: &MovieId) -> MovieDetails {
        let hit = self.catalog.iter().find(|h| &h.tconst == movie_id);
        MovieDetails {
            tconst: movie_id.clone(),
            primary_title: hit
                .map(|h| h.primary_title.clone())
                .unwrap_or_else(|| movie_id.to_string()),
            start_year: hit.and_then(|h| h.start_year),
            genres: None,
            avg_rating: hit.and_then(|h| h.avg_rating.clone()),
            poster_path: hit.and_then(|h| h.poster_path.clone()),
        }
    }

    fn insert(&mut self, movie_id: &MovieId, watched: bool) -> RecordId {
        self.next_id += 1;
        let now = Utc::now();
        let record = UserMovie {
            id: self.next_id,
            watchlisted_at: Some(now),
            watched_at: watched.then_some(now),
            movie: self.details_for(movie_id),
            availability: Vec::new(),
        };
        self.records.push(StoredRecord {
            record,
            deleted: false,
        });
        self.next_id
    }
}

/// In-process gateway with the same list semantics as the REST resource
///
/// The watchlist lists every record with a `watchlisted_at`, watched or not, and the
/// watched history lists every record with a `watched_at`. `remove` is a soft delete: the
/// record disappears from both lists but keeps its id, so `transform_to_source` can bring
/// it back and a later `add_to_source` revives it. Each call yields to the scheduler once
/// so that concurrent flows interleave the way they would over the network.
#[derive(Default)]
pub struct InMemoryGateway {
    store: Mutex<Store>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers display metadata used when a record is created for this movie
    pub fn with_catalog(self, hits: Vec<SearchHit>) -> Self {
        self.store.lock().catalog = hits;
        self
    }

    /// Seeds a record that is on the watchlist and not watched
    pub fn seed_watchlist(&self, movie_id: impl Into<MovieId>) -> RecordId {
        self.store.lock().insert(&movie_id.into(), false)
    }

    /// Seeds a record that is already watched
    pub fn seed_watched(&self, movie_id: impl Into<MovieId>) -> RecordId {
        self.store.lock().insert(&movie_id.into(), true)
    }

    /// Makes the next call of `op` fail with `error`
    ///
    /// Several failures for the same operation are consumed in order.
    pub fn fail_next(&self, op: GatewayOp, error: GatewayError) {
        self.store
            .lock()
            .failures
            .entry(op)
            .or_default()
            .push_back(error);
    }

    /// Deletes a record behind the orchestrator's back
    pub fn delete_externally(&self, record_id: RecordId) {
        let mut store = self.store.lock();
        if let Ok(stored) = store.get_mut(record_id) {
            stored.deleted = true;
        }
    }

    /// Records visible to the user, in creation order
    pub fn records(&self) -> Vec<UserMovie> {
        self.store.lock().visible().cloned().collect()
    }

    pub fn records_for(&self, movie_id: &MovieId) -> Vec<UserMovie> {
        self.store
            .lock()
            .visible()
            .filter(|r| r.movie_id() == movie_id)
            .cloned()
            .collect()
    }

    pub fn calls(&self) -> Vec<GatewayOp> {
        self.store.lock().calls.clone()
    }

    pub fn call_count(&self, op: GatewayOp) -> usize {
        self.store.lock().calls.iter().filter(|c| **c == op).count()
    }

    /// Logs the call and pops an injected failure, if any
    async fn enter(&self, op: GatewayOp) -> GatewayResult<()> {
        tokio::task::yield_now().await;

        let mut store = self.store.lock();
        store.calls.push(op);
        match store.failures.get_mut(&op).and_then(|q| q.pop_front()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl MovieListGateway for InMemoryGateway {
    async fn add_to_source(&self, movie_id: &MovieId) -> GatewayResult<RecordId> {
        self.enter(GatewayOp::AddToSource).await?;

        let mut store = self.store.lock();
        if store.visible().any(|r| r.movie_id() == movie_id) {
            return Err(GatewayError::Conflict(format!(
                "{} is already on the user's lists",
                movie_id
            )));
        }

        if let Some(stored) = store
            .records
            .iter_mut()
            .find(|r| r.deleted && r.record.movie_id() == movie_id)
        {
            stored.deleted = false;
            stored.record.watchlisted_at = Some(Utc::now());
            stored.record.watched_at = None;
            return Ok(stored.record.id);
        }

        Ok(store.insert(movie_id, false))
    }

    async fn list_source(&self) -> GatewayResult<Vec<UserMovie>> {
        self.enter(GatewayOp::ListSource).await?;

        let store = self.store.lock();
        Ok(store
            .visible()
            .filter(|r| r.watchlisted_at.is_some())
            .cloned()
            .collect())
    }

    async fn transform_to_target(&self, record_id: RecordId) -> GatewayResult<()> {
        self.enter(GatewayOp::TransformToTarget).await?;

        let mut store = self.store.lock();
        let stored = store.get_mut(record_id)?;
        if stored.deleted {
            return Err(GatewayError::NotFound(format!("record {}", record_id)));
        }
        let record = &mut stored.record;

        if record.watched_at.is_some() {
            return Err(GatewayError::Conflict(
                "Movie is already marked as watched".to_string(),
            ));
        }
        record.watched_at = Some(Utc::now());

        Ok(())
    }

    async fn list_target(&self) -> GatewayResult<Vec<UserMovie>> {
        self.enter(GatewayOp::ListTarget).await?;

        let store = self.store.lock();
        Ok(store
            .visible()
            .filter(|r| r.watched_at.is_some())
            .cloned()
            .collect())
    }

    async fn transform_to_source(&self, record_id: RecordId) -> GatewayResult<()> {
        self.enter(GatewayOp::TransformToSource).await?;

        let mut store = self.store.lock();
        let stored = store.get_mut(record_id)?;
        stored.deleted = false;
        let record = &mut stored.record;

        record.watched_at = None;
        if record.watchlisted_at.is_none() {
            record.watchlisted_at = Some(Utc::now());
        }

        Ok(())
    }

    async fn remove(&self, record_id: RecordId) -> GatewayResult<()> {
        self.enter(GatewayOp::Remove).await?;

        let mut store = self.store.lock();
        let stored = store.get_mut(record_id)?;
        if stored.deleted {
            return Err(GatewayError::NotFound(format!("record {}", record_id)));
        }
        stored.deleted = true;

        Ok(())
    }
}

#[async_trait::async_trait]
impl MovieSearch for InMemoryGateway {
    async fn search_movies(&self, query: &str) -> GatewayResult<Vec<SearchHit>> {
        self.enter(GatewayOp::Search).await?;

        let needle = query.to_lowercase();
        let store = self.store.lock();
        Ok(store
            .catalog
            .iter()
            .filter(|h| h.primary_title.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }
}
