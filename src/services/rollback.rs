use tracing::instrument;

use crate::{
    error::OrchestratorResult,
    gateway::MovieListGateway,
    models::{MovieId, Origin, RecordId},
};

/// Compensating action chosen for a settled selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compensation {
    /// The record only exists because of this flow
    Remove,
    /// The record pre-existed the flow; put it back on the watchlist
    RestoreToSource,
}

impl Compensation {
    pub fn for_origin(origin: Origin) -> Self {
        match origin {
            Origin::Created => Compensation::Remove,
            Origin::FoundInSourceList | Origin::FoundInTargetList => Compensation::RestoreToSource,
        }
    }
}

/// Undoes a successful acquisition according to how the record got there
#[instrument(skip_all, fields(movie_id = %movie_id, record_id = record_id, origin = %origin))]
pub async fn compensate(
    gateway: &dyn MovieListGateway,
    movie_id: &MovieId,
    record_id: RecordId,
    origin: Origin,
) -> OrchestratorResult<Compensation> {
    let compensation = Compensation::for_origin(origin);

    match compensation {
        Compensation::Remove => gateway.remove(record_id).await?,
        Compensation::RestoreToSource => gateway.transform_to_source(record_id).await?,
    }

    tracing::info!(compensation = ?compensation, "Selection rolled back");

    Ok(compensation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use crate::gateway::MockMovieListGateway;

    #[test]
    fn test_compensation_for_origin() {
        assert_eq!(Compensation::for_origin(Origin::Created), Compensation::Remove);
        assert_eq!(
            Compensation::for_origin(Origin::FoundInSourceList),
            Compensation::RestoreToSource
        );
        assert_eq!(
            Compensation::for_origin(Origin::FoundInTargetList),
            Compensation::RestoreToSource
        );
    }

    #[tokio::test]
    async fn test_created_origin_removes_record() {
        let mut gateway = MockMovieListGateway::new();
        gateway
            .expect_remove()
            .withf(|id| *id == 42)
            .times(1)
            .returning(|_| Ok(()));
        gateway.expect_transform_to_source().never();

        let result = compensate(&gateway, &MovieId::new("tt1"), 42, Origin::Created)
            .await
            .unwrap();

        assert_eq!(result, Compensation::Remove);
    }

    #[tokio::test]
    async fn test_found_in_source_origin_restores_record() {
        let mut gateway = MockMovieListGateway::new();
        gateway
            .expect_transform_to_source()
            .withf(|id| *id == 7)
            .times(1)
            .returning(|_| Ok(()));
        gateway.expect_remove().never();

        let result = compensate(&gateway, &MovieId::new("tt2"), 7, Origin::FoundInSourceList)
            .await
            .unwrap();

        assert_eq!(result, Compensation::RestoreToSource);
    }

    #[tokio::test]
    async fn test_found_in_target_origin_restores_record() {
        let mut gateway = MockMovieListGateway::new();
        gateway
            .expect_transform_to_source()
            .times(1)
            .returning(|_| Ok(()));
        gateway.expect_remove().never();

        let result = compensate(&gateway, &MovieId::new("tt3"), 9, Origin::FoundInTargetList)
            .await
            .unwrap();

        assert_eq!(result, Compensation::RestoreToSource);
    }

    #[tokio::test]
    async fn test_gateway_failure_is_returned() {
        let mut gateway = MockMovieListGateway::new();
        gateway
            .expect_remove()
            .returning(|_| Err(GatewayError::Transport("timeout".to_string())));

        let err = compensate(&gateway, &MovieId::new("tt1"), 1, Origin::Created)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "transport");
    }
}
