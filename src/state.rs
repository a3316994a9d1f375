use std::sync::Arc;

use crate::{
    cache::{QueryCache, RefetchWorkerHandle},
    config::Config,
    gateway::{HttpMovieListGateway, MovieListGateway, MovieSearch},
    services::{ListMutators, SearchSession, WatchedSelectionFlow},
};

/// Shared application context
///
/// Cloning is cheap; every clone shares the same gateway and cache.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub gateway: Arc<dyn MovieListGateway>,
    pub search: Arc<dyn MovieSearch>,
    pub cache: Arc<QueryCache>,
}

impl AppState {
    pub fn new(
        config: Config,
        gateway: Arc<dyn MovieListGateway>,
        search: Arc<dyn MovieSearch>,
        cache: QueryCache,
    ) -> Self {
        Self {
            config,
            gateway,
            search,
            cache: Arc::new(cache),
        }
    }

    /// Wires the REST gateway to a cache that refetches invalidated lists
    ///
    /// Must be called inside a Tokio runtime. The returned handle stops the refetch worker.
    pub fn from_config(config: Config) -> anyhow::Result<(Self, RefetchWorkerHandle)> {
        let http = Arc::new(HttpMovieListGateway::new(&config)?);
        let (cache, worker) = QueryCache::with_refetch(http.clone());

        tracing::info!(api_url = %config.api_base_url, "Application state initialized");

        Ok((Self::new(config, http.clone(), http, cache), worker))
    }

    /// Starts a fresh onboarding selection
    pub fn watched_selection(&self) -> WatchedSelectionFlow {
        WatchedSelectionFlow::new(
            self.gateway.clone(),
            self.cache.clone(),
            self.config.max_selected,
        )
    }

    pub fn list_mutators(&self) -> ListMutators {
        ListMutators::new(self.gateway.clone(), self.cache.clone())
    }

    pub fn search_session(&self) -> SearchSession {
        SearchSession::new(self.search.clone(), self.config.search_min_chars)
    }
}
