use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::instrument;

use crate::{error::OrchestratorResult, gateway::MovieSearch, models::SearchHit};

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Results(Vec<SearchHit>),
    /// Query below the minimum length; no request was made
    TooShort,
    /// A newer query started while this one was in flight
    Superseded,
}

/// Picker search where only the latest query's results are delivered
pub struct SearchSession {
    search: Arc<dyn MovieSearch>,
    min_chars: usize,
    generation: AtomicU64,
}

impl SearchSession {
    pub fn new(search: Arc<dyn MovieSearch>, min_chars: usize) -> Self {
        Self {
            search,
            min_chars,
            generation: AtomicU64::new(0),
        }
    }

    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> OrchestratorResult<SearchOutcome> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let query = query.trim();
        if query.chars().count() < self.min_chars {
            return Ok(SearchOutcome::TooShort);
        }

        let result = self.search.search_movies(query).await;

        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(generation, "Search superseded");
            return Ok(SearchOutcome::Superseded);
        }

        let hits = result?;
        tracing::debug!(count = hits.len(), "Search results");
        Ok(SearchOutcome::Results(hits))
    }

    /// Drops whatever search is in flight, e.g. when the picker closes
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}
