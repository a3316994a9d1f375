use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{MovieId, RecordId};

/// Movie details nested in a user movie record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieDetails {
    pub tconst: MovieId,
    pub primary_title: String,
    pub start_year: Option<i32>,
    #[serde(default)]
    pub genres: Option<Vec<String>>,
    /// Decimal rating as the API serializes it (e.g. "8.7")
    #[serde(default)]
    pub avg_rating: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
}

/// Availability of a movie on one of the user's platforms
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlatformAvailability {
    pub platform_id: i64,
    pub platform_name: String,
    pub is_available: Option<bool>,
}

/// A movie on the user's watchlist or watched history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserMovie {
    pub id: RecordId,
    pub watchlisted_at: Option<DateTime<Utc>>,
    pub watched_at: Option<DateTime<Utc>>,
    pub movie: MovieDetails,
    #[serde(default)]
    pub availability: Vec<PlatformAvailability>,
}

impl UserMovie {
    pub fn movie_id(&self) -> &MovieId {
        &self.movie.tconst
    }

    pub fn is_watched(&self) -> bool {
        self.watched_at.is_some()
    }
}

#[cfg(test)]
impl UserMovie {
    /// Minimal record for tests
    pub(crate) fn fixture(id: RecordId, tconst: &str, watched: bool) -> Self {
        let now = Utc::now();
        Self {
            id,
            watchlisted_at: Some(now),
            watched_at: watched.then_some(now),
            movie: MovieDetails {
                tconst: MovieId::new(tconst),
                primary_title: format!("Movie {}", tconst),
                start_year: None,
                genres: None,
                avg_rating: None,
                poster_path: None,
            },
            availability: Vec::new(),
        }
    }
}

/// Action accepted by `PATCH /user-movies/<id>/`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserMovieAction {
    MarkAsWatched,
    RestoreToWatchlist,
}

/// Movie search result feeding the picker
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub tconst: MovieId,
    pub primary_title: String,
    pub start_year: Option<i32>,
    #[serde(default)]
    pub avg_rating: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
}
