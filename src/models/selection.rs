use serde::{Deserialize, Serialize};
use std::fmt::Display;

use super::{MovieId, RecordId, SearchHit, UserMovie};

/// How a settled selection reached its remote state
///
/// This is the only input to the rollback decision, so it is fixed at settlement
/// and never inferred afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// The record was added to the watchlist by this flow
    Created,
    /// The record was already on the watchlist
    FoundInSourceList,
    /// The record was already marked as watched
    FoundInTargetList,
}

impl Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Origin::Created => "created",
            Origin::FoundInSourceList => "found_in_source_list",
            Origin::FoundInTargetList => "found_in_target_list",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStatus {
    /// Acquisition in flight
    Pending,
    /// Remote state confirmed; `record_id` and `origin` are fixed
    Settled,
    /// Rollback in flight; reverts to `Settled` if it fails
    Undoing,
}

/// Display metadata carried alongside a selection, opaque to the orchestrator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieMetadata {
    pub title: String,
    pub year: Option<i32>,
    pub poster_url: Option<String>,
}

impl From<&SearchHit> for MovieMetadata {
    fn from(hit: &SearchHit) -> Self {
        Self {
            title: hit.primary_title.clone(),
            year: hit.start_year,
            poster_url: hit.poster_path.clone(),
        }
    }
}

impl From<&UserMovie> for MovieMetadata {
    fn from(record: &UserMovie) -> Self {
        Self {
            title: record.movie.primary_title.clone(),
            year: record.movie.start_year,
            poster_url: record.movie.poster_path.clone(),
        }
    }
}

/// One movie tracked by a selection flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionItem {
    pub movie_id: MovieId,
    pub metadata: MovieMetadata,
    pub record_id: Option<RecordId>,
    pub origin: Option<Origin>,
    pub status: SelectionStatus,
}

impl SelectionItem {
    pub(crate) fn pending(movie_id: MovieId, metadata: MovieMetadata) -> Self {
        Self {
            movie_id,
            metadata,
            record_id: None,
            origin: None,
            status: SelectionStatus::Pending,
        }
    }

    pub(crate) fn settled(
        movie_id: MovieId,
        metadata: MovieMetadata,
        record_id: RecordId,
        origin: Origin,
    ) -> Self {
        Self {
            movie_id,
            metadata,
            record_id: Some(record_id),
            origin: Some(origin),
            status: SelectionStatus::Settled,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.status == SelectionStatus::Settled
    }
}
