use crate::models::{ListStatus, MovieId};

/// Errors returned by a movie-list gateway
#[derive(thiserror::Error, Debug)]
pub enum GatewayError {
    /// The record already exists, or is already in the requested state
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl GatewayError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, GatewayError::Conflict(_))
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors surfaced by the selection flow and the list mutators
#[derive(thiserror::Error, Debug)]
pub enum OrchestratorError {
    /// The server reported "already exists" but the follow-up lookup could not find the record
    #[error("Conflict for {movie_id} could not be resolved: record missing from {collection}")]
    ConflictUnresolvable {
        movie_id: MovieId,
        collection: ListStatus,
    },

    #[error("Transform rejected: {0}")]
    TransformRejected(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Rollback failed for {movie_id}: {source}")]
    RollbackFailed {
        movie_id: MovieId,
        #[source]
        source: Box<OrchestratorError>,
    },
}

impl OrchestratorError {
    /// Short machine-readable kind, used as a log field
    pub fn kind(&self) -> &'static str {
        match self {
            OrchestratorError::ConflictUnresolvable { .. } => "conflict_unresolvable",
            OrchestratorError::TransformRejected(_) => "transform_rejected",
            OrchestratorError::Transport(_) => "transport",
            OrchestratorError::RollbackFailed { .. } => "rollback_failed",
        }
    }

    /// Message suitable for a transient notification
    pub fn user_message(&self) -> String {
        match self {
            OrchestratorError::ConflictUnresolvable { collection, .. } => {
                format!("Could not find the movie on your {} list", collection)
            }
            OrchestratorError::TransformRejected(_) => {
                "The server rejected the change to this movie".to_string()
            }
            OrchestratorError::Transport(_) => {
                "A server error occurred. Please try again later".to_string()
            }
            OrchestratorError::RollbackFailed { source, .. } => match source.as_ref() {
                OrchestratorError::Transport(_) => {
                    "A server error occurred. Please try again later".to_string()
                }
                _ => "Could not undo the operation".to_string(),
            },
        }
    }
}

impl From<GatewayError> for OrchestratorError {
    fn from(err: GatewayError) -> Self {
        match err {
            // An unresolved conflict outside the acquisition lookups is a business rejection
            GatewayError::Conflict(msg) => OrchestratorError::TransformRejected(msg),
            GatewayError::Rejected { status, message } => {
                OrchestratorError::TransformRejected(format!("{} ({})", message, status))
            }
            GatewayError::NotFound(msg) => OrchestratorError::TransformRejected(msg),
            GatewayError::Transport(msg) => OrchestratorError::Transport(msg),
            GatewayError::Http(e) => OrchestratorError::Transport(e.to_string()),
        }
    }
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_conflict_detection() {
        assert!(GatewayError::Conflict("exists".to_string()).is_conflict());
        assert!(!GatewayError::Transport("down".to_string()).is_conflict());
    }

    #[test]
    fn test_gateway_error_classification() {
        let rejected: OrchestratorError = GatewayError::Rejected {
            status: 400,
            message: "invalid action".to_string(),
        }
        .into();
        assert_eq!(rejected.kind(), "transform_rejected");

        let transport: OrchestratorError = GatewayError::Transport("502".to_string()).into();
        assert_eq!(transport.kind(), "transport");

        let missing: OrchestratorError = GatewayError::NotFound("record 9".to_string()).into();
        assert_eq!(missing.kind(), "transform_rejected");
    }

    #[test]
    fn test_unresolvable_conflict_message_names_collection() {
        let err = OrchestratorError::ConflictUnresolvable {
            movie_id: MovieId::new("tt2"),
            collection: ListStatus::Watchlist,
        };
        assert!(err.to_string().contains("tt2"));
        assert!(err.user_message().contains("watchlist"));
    }

    #[test]
    fn test_rollback_failure_keeps_cause() {
        let err = OrchestratorError::RollbackFailed {
            movie_id: MovieId::new("tt1"),
            source: Box::new(OrchestratorError::Transport("timeout".to_string())),
        };
        assert_eq!(err.kind(), "rollback_failed");
        assert!(err.to_string().contains("timeout"));
        assert!(err.user_message().contains("server error"));
    }
}
