/// Remote movie-list gateway abstraction
///
/// The orchestrator never talks HTTP directly. Everything it needs from the server goes
/// through [`MovieListGateway`], which has a REST implementation for production and an
/// in-memory implementation for tests and offline use.
use crate::{
    error::GatewayResult,
    models::{MovieId, RecordId, SearchHit, UserMovie},
};

pub mod http;
pub mod memory;

pub use http::HttpMovieListGateway;
pub use memory::{GatewayOp, InMemoryGateway};

/// Operations over the user's "user movie" records
///
/// The source collection is the watchlist and the target collection is the watched history.
/// None of these calls is atomic with respect to the others.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MovieListGateway: Send + Sync {
    /// Add a movie to the watchlist
    ///
    /// Fails with `Conflict` when the user already has a record for this movie.
    async fn add_to_source(&self, movie_id: &MovieId) -> GatewayResult<RecordId>;

    /// List records currently on the watchlist
    async fn list_source(&self) -> GatewayResult<Vec<UserMovie>>;

    /// Mark a record as watched
    ///
    /// Fails with `Conflict` when the record is already watched.
    async fn transform_to_target(&self, record_id: RecordId) -> GatewayResult<()>;

    /// List records in the watched history
    async fn list_target(&self) -> GatewayResult<Vec<UserMovie>>;

    /// Restore a watched record back to the watchlist
    async fn transform_to_source(&self, record_id: RecordId) -> GatewayResult<()>;

    /// Delete a record
    async fn remove(&self, record_id: RecordId) -> GatewayResult<()>;
}

/// Movie search backing the picker
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MovieSearch: Send + Sync {
    async fn search_movies(&self, query: &str) -> GatewayResult<Vec<SearchHit>>;
}

/// Locate a record by movie id within a listed collection
pub fn find_by_movie<'a>(records: &'a [UserMovie], movie_id: &MovieId) -> Option<&'a UserMovie> {
    records.iter().find(|r| r.movie_id() == movie_id)
}
