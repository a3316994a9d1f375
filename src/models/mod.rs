use serde::{Deserialize, Serialize};
use std::fmt::Display;

pub mod selection;
pub mod user_movie;

pub use selection::{MovieMetadata, Origin, SelectionItem, SelectionStatus};
pub use user_movie::{MovieDetails, PlatformAvailability, SearchHit, UserMovie, UserMovieAction};

/// Numeric id of a `user_movie` record on the server
pub type RecordId = i64;

/// External movie identifier (an IMDB `tconst`, e.g. "tt0111161")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovieId(String);

impl MovieId {
    pub fn new(tconst: impl Into<String>) -> Self {
        Self(tconst.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for MovieId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MovieId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for MovieId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Which server-side list a record is queried from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListStatus {
    /// Source collection: titles the user wants to watch
    Watchlist,
    /// Target collection: titles the user has watched
    Watched,
}

impl ListStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListStatus::Watchlist => "watchlist",
            ListStatus::Watched => "watched",
        }
    }
}

impl Display for ListStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movie_id_display() {
        let id = MovieId::new("tt1375666");
        assert_eq!(format!("{}", id), "tt1375666");
    }

    #[test]
    fn test_movie_id_serde_is_transparent() {
        let id = MovieId::from("tt1375666");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#""tt1375666""#);

        let deserialized: MovieId = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, id);
    }

    #[test]
    fn test_list_status_query_value() {
        assert_eq!(ListStatus::Watchlist.as_str(), "watchlist");
        assert_eq!(ListStatus::Watched.to_string(), "watched");
        assert_eq!(
            serde_json::to_string(&ListStatus::Watched).unwrap(),
            r#""watched""#
        );
    }
}
