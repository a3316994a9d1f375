use std::fmt::Display;

use crate::models::{ListStatus, UserMovie};

pub mod query_cache;

pub use query_cache::{QueryCache, RefetchWorkerHandle};

/// Cached collections addressed by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Watchlist,
    Watched,
}

impl CacheKey {
    pub fn status(&self) -> ListStatus {
        match self {
            CacheKey::Watchlist => ListStatus::Watchlist,
            CacheKey::Watched => ListStatus::Watched,
        }
    }
}

impl From<ListStatus> for CacheKey {
    fn from(status: ListStatus) -> Self {
        match status {
            ListStatus::Watchlist => CacheKey::Watchlist,
            ListStatus::Watched => CacheKey::Watched,
        }
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "user-movies:{}", self.status())
    }
}

/// Narrow view of the reactive data cache used by the orchestrator
///
/// All methods are synchronous: they touch local state only, and a refetch scheduled by
/// `invalidate` runs in the background.
pub trait DataCache: Send + Sync {
    /// Current cached collection, or `None` if the key was never fetched
    fn read(&self, key: CacheKey) -> Option<Vec<UserMovie>>;

    /// Replace the cached collection for a key
    fn write(&self, key: CacheKey, records: Vec<UserMovie>);

    /// Mark a key stale and schedule a background refetch
    fn invalidate(&self, key: CacheKey);

    /// Discard the result of any refetch currently in flight for a key
    fn cancel_in_flight(&self, key: CacheKey);
}
