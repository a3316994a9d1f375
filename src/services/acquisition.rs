use std::future::Future;

use tracing::instrument;

use crate::{
    error::{GatewayResult, OrchestratorError, OrchestratorResult},
    gateway::{find_by_movie, MovieListGateway},
    models::{ListStatus, MovieId, Origin, RecordId},
};

/// Terminal state of a successful acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Acquisition {
    pub record_id: RecordId,
    pub origin: Origin,
}

impl Acquisition {
    /// True when the movie was already watched before this flow touched it
    pub fn already_watched(&self) -> bool {
        self.origin == Origin::FoundInTargetList
    }
}

enum Attempt<T> {
    /// The call itself succeeded
    Done(T),
    /// The call conflicted and the existing record was located
    Found(RecordId),
}

/// Runs `attempt`; on a conflict, lists `collection` and locates the movie's record
///
/// A conflict whose record cannot be found is `ConflictUnresolvable`: the record is never
/// guessed.
async fn attempt_or_find<T, F>(
    gateway: &dyn MovieListGateway,
    movie_id: &MovieId,
    collection: ListStatus,
    attempt: F,
) -> OrchestratorResult<Attempt<T>>
where
    F: Future<Output = GatewayResult<T>>,
{
    match attempt.await {
        Ok(value) => Ok(Attempt::Done(value)),
        Err(e) if e.is_conflict() => {
            tracing::debug!(movie_id = %movie_id, collection = %collection, "Conflict, looking up existing record");

            let records = match collection {
                ListStatus::Watchlist => gateway.list_source().await?,
                ListStatus::Watched => gateway.list_target().await?,
            };

            find_by_movie(&records, movie_id)
                .map(|r| Attempt::Found(r.id))
                .ok_or_else(|| OrchestratorError::ConflictUnresolvable {
                    movie_id: movie_id.clone(),
                    collection,
                })
        }
        Err(e) => Err(e.into()),
    }
}

/// Ensures `movie_id` ends up as a watched record
///
/// Step A puts the movie on the watchlist (or finds it there). Step B marks that record as
/// watched (or finds it already watched). A Step B failure leaves the Step A record in
/// place: the movie is still legitimately on the watchlist.
///
/// Not safe to run twice concurrently for the same movie; callers serialize through the
/// selection guard.
#[instrument(skip_all, fields(movie_id = %movie_id))]
pub async fn acquire_watched(
    gateway: &dyn MovieListGateway,
    movie_id: &MovieId,
) -> OrchestratorResult<Acquisition> {
    let (record_id, origin) = match attempt_or_find(
        gateway,
        movie_id,
        ListStatus::Watchlist,
        gateway.add_to_source(movie_id),
    )
    .await?
    {
        Attempt::Done(record_id) => (record_id, Origin::Created),
        Attempt::Found(record_id) => (record_id, Origin::FoundInSourceList),
    };

    tracing::debug!(record_id, origin = %origin, "Watchlist step complete");

    let acquisition = match attempt_or_find(
        gateway,
        movie_id,
        ListStatus::Watched,
        gateway.transform_to_target(record_id),
    )
    .await?
    {
        Attempt::Done(()) => Acquisition { record_id, origin },
        Attempt::Found(found_id) => Acquisition {
            record_id: found_id,
            origin: Origin::FoundInTargetList,
        },
    };

    tracing::info!(
        record_id = acquisition.record_id,
        origin = %acquisition.origin,
        "Movie acquired as watched"
    );

    Ok(acquisition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use crate::gateway::MockMovieListGateway;
    use crate::models::UserMovie;

    fn conflict() -> GatewayError {
        GatewayError::Conflict("already exists".to_string())
    }

    #[tokio::test]
    async fn test_fresh_movie_is_created() {
        let mut gateway = MockMovieListGateway::new();
        gateway
            .expect_add_to_source()
            .withf(|m| m.as_str() == "tt1")
            .times(1)
            .returning(|_| Ok(42));
        gateway
            .expect_transform_to_target()
            .withf(|id| *id == 42)
            .times(1)
            .returning(|_| Ok(()));
        gateway.expect_list_source().never();
        gateway.expect_list_target().never();

        let result = acquire_watched(&gateway, &MovieId::new("tt1")).await.unwrap();

        assert_eq!(
            result,
            Acquisition {
                record_id: 42,
                origin: Origin::Created
            }
        );
        assert!(!result.already_watched());
    }

    #[tokio::test]
    async fn test_conflict_on_add_finds_watchlist_record() {
        let mut gateway = MockMovieListGateway::new();
        gateway
            .expect_add_to_source()
            .returning(|_| Err(conflict()));
        gateway.expect_list_source().times(1).returning(|| {
            Ok(vec![
                UserMovie::fixture(3, "tt9", false),
                UserMovie::fixture(7, "tt2", false),
            ])
        });
        gateway
            .expect_transform_to_target()
            .withf(|id| *id == 7)
            .times(1)
            .returning(|_| Ok(()));

        let result = acquire_watched(&gateway, &MovieId::new("tt2")).await.unwrap();

        assert_eq!(result.record_id, 7);
        assert_eq!(result.origin, Origin::FoundInSourceList);
    }

    #[tokio::test]
    async fn test_conflict_on_mark_finds_watched_record() {
        let mut gateway = MockMovieListGateway::new();
        gateway.expect_add_to_source().returning(|_| Ok(9));
        gateway
            .expect_transform_to_target()
            .returning(|_| Err(conflict()));
        gateway
            .expect_list_target()
            .times(1)
            .returning(|| Ok(vec![UserMovie::fixture(9, "tt3", true)]));

        let result = acquire_watched(&gateway, &MovieId::new("tt3")).await.unwrap();

        assert_eq!(result.record_id, 9);
        assert_eq!(result.origin, Origin::FoundInTargetList);
        assert!(result.already_watched());
    }

    #[tokio::test]
    async fn test_watched_lookup_overwrites_record_id() {
        let mut gateway = MockMovieListGateway::new();
        gateway
            .expect_add_to_source()
            .returning(|_| Err(conflict()));
        gateway
            .expect_list_source()
            .returning(|| Ok(vec![UserMovie::fixture(11, "tt4", true)]));
        gateway
            .expect_transform_to_target()
            .returning(|_| Err(conflict()));
        gateway
            .expect_list_target()
            .returning(|| Ok(vec![UserMovie::fixture(12, "tt4", true)]));

        let result = acquire_watched(&gateway, &MovieId::new("tt4")).await.unwrap();

        assert_eq!(result.record_id, 12);
        assert_eq!(result.origin, Origin::FoundInTargetList);
    }

    #[tokio::test]
    async fn test_conflict_without_watchlist_record_is_unresolvable() {
        let mut gateway = MockMovieListGateway::new();
        gateway
            .expect_add_to_source()
            .returning(|_| Err(conflict()));
        gateway.expect_list_source().returning(|| Ok(Vec::new()));
        gateway.expect_transform_to_target().never();

        let err = acquire_watched(&gateway, &MovieId::new("tt5"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OrchestratorError::ConflictUnresolvable {
                collection: ListStatus::Watchlist,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_conflict_without_watched_record_is_unresolvable() {
        let mut gateway = MockMovieListGateway::new();
        gateway.expect_add_to_source().returning(|_| Ok(1));
        gateway
            .expect_transform_to_target()
            .returning(|_| Err(conflict()));
        gateway
            .expect_list_target()
            .returning(|| Ok(vec![UserMovie::fixture(2, "other", true)]));

        let err = acquire_watched(&gateway, &MovieId::new("tt6"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "conflict_unresolvable");
    }

    #[tokio::test]
    async fn test_rejected_mark_keeps_watchlist_record() {
        let mut gateway = MockMovieListGateway::new();
        gateway.expect_add_to_source().returning(|_| Ok(5));
        gateway.expect_transform_to_target().returning(|_| {
            Err(GatewayError::Rejected {
                status: 400,
                message: "invalid".to_string(),
            })
        });
        gateway.expect_remove().never();
        gateway.expect_transform_to_source().never();

        let err = acquire_watched(&gateway, &MovieId::new("tt7"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "transform_rejected");
    }

    #[tokio::test]
    async fn test_transport_failure_on_add() {
        let mut gateway = MockMovieListGateway::new();
        gateway
            .expect_add_to_source()
            .returning(|_| Err(GatewayError::Transport("503".to_string())));
        gateway.expect_transform_to_target().never();

        let err = acquire_watched(&gateway, &MovieId::new("tt8"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "transport");
    }

    #[tokio::test]
    async fn test_lookup_transport_failure_is_transport() {
        let mut gateway = MockMovieListGateway::new();
        gateway
            .expect_add_to_source()
            .returning(|_| Err(conflict()));
        gateway
            .expect_list_source()
            .returning(|| Err(GatewayError::Transport("reset".to_string())));

        let err = acquire_watched(&gateway, &MovieId::new("tt9"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "transport");
    }
}
