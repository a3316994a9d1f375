use std::collections::HashSet;

use thiserror::Error;

use crate::models::{
    MovieId, MovieMetadata, Origin, RecordId, SelectionItem, SelectionStatus, UserMovie,
};

/// Why a pick was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PickRejection {
    #[error("You can pick at most {max} movies")]
    LimitReached { max: usize },
    #[error("This movie has already been selected")]
    AlreadySelected,
    #[error("This movie is still being saved")]
    InFlight,
}

/// Bounded, ordered selection of movies for one UI flow
///
/// Every transition is synchronous and infallible. Calls that no longer apply (for example
/// committing a pick the user already removed) do nothing, since they can legitimately race
/// with user actions.
#[derive(Debug, Clone)]
pub struct SelectionMachine {
    max_selected: usize,
    items: Vec<SelectionItem>,
    // Movies whose acquisition has not finished; survives `discard`
    in_flight: HashSet<MovieId>,
    prefilled: bool,
}

impl SelectionMachine {
    pub fn new(max_selected: usize) -> Self {
        Self {
            max_selected,
            items: Vec::new(),
            in_flight: HashSet::new(),
            prefilled: false,
        }
    }

    pub fn max_selected(&self) -> usize {
        self.max_selected
    }

    pub fn items(&self) -> &[SelectionItem] {
        &self.items
    }

    pub fn get(&self, movie_id: &MovieId) -> Option<&SelectionItem> {
        self.items.iter().find(|i| &i.movie_id == movie_id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn settled_count(&self) -> usize {
        self.items.iter().filter(|i| i.is_settled()).count()
    }

    pub fn can_pick(&self, movie_id: &MovieId) -> bool {
        self.check_pick(movie_id).is_ok()
    }

    /// Same guard as [`can_pick`](Self::can_pick), reporting the reason for a refusal
    pub fn check_pick(&self, movie_id: &MovieId) -> Result<(), PickRejection> {
        if self.items.len() >= self.max_selected {
            return Err(PickRejection::LimitReached {
                max: self.max_selected,
            });
        }
        if self.get(movie_id).is_some() {
            return Err(PickRejection::AlreadySelected);
        }
        if self.in_flight.contains(movie_id) {
            return Err(PickRejection::InFlight);
        }
        Ok(())
    }

    /// Appends a pending item; the caller must follow with the acquisition protocol
    pub fn begin_pick(
        &mut self,
        movie_id: MovieId,
        metadata: MovieMetadata,
    ) -> Result<(), PickRejection> {
        self.check_pick(&movie_id)?;
        self.in_flight.insert(movie_id.clone());
        self.items.push(SelectionItem::pending(movie_id, metadata));
        Ok(())
    }

    /// Settles a pending item, fixing its record id and origin
    pub fn commit_pick(&mut self, movie_id: &MovieId, record_id: RecordId, origin: Origin) {
        self.in_flight.remove(movie_id);
        match self
            .items
            .iter_mut()
            .find(|i| &i.movie_id == movie_id && i.status == SelectionStatus::Pending)
        {
            Some(item) => {
                item.record_id = Some(record_id);
                item.origin = Some(origin);
                item.status = SelectionStatus::Settled;
            }
            None => {
                tracing::debug!(movie_id = %movie_id, "Commit for a pick that is no longer pending");
            }
        }
    }

    /// Removes an item whatever its status
    pub fn abandon_pick(&mut self, movie_id: &MovieId) {
        self.in_flight.remove(movie_id);
        self.items.retain(|i| &i.movie_id != movie_id);
    }

    /// Marks a settled item as undoing and returns its settled state for the rollback
    pub fn begin_undo(&mut self, movie_id: &MovieId) -> Option<SelectionItem> {
        let item = self
            .items
            .iter_mut()
            .find(|i| &i.movie_id == movie_id && i.status == SelectionStatus::Settled)?;
        let settled = item.clone();
        item.status = SelectionStatus::Undoing;
        Some(settled)
    }

    /// Reverts an undoing item back to settled after a failed rollback
    pub fn cancel_undo(&mut self, movie_id: &MovieId) {
        if let Some(item) = self
            .items
            .iter_mut()
            .find(|i| &i.movie_id == movie_id && i.status == SelectionStatus::Undoing)
        {
            item.status = SelectionStatus::Settled;
        }
    }

    /// Removes a settled or undoing item after a successful rollback
    pub fn remove_settled(&mut self, movie_id: &MovieId) {
        self.items
            .retain(|i| &i.movie_id != movie_id || i.status == SelectionStatus::Pending);
    }

    /// Seeds the selection with records the user has already watched
    ///
    /// Runs at most once per machine and never exceeds `max_selected`. Returns how many
    /// items were added.
    pub fn prefill(&mut self, watched: &[UserMovie]) -> usize {
        if self.prefilled {
            return 0;
        }
        if watched.is_empty() {
            return 0;
        }
        self.prefilled = true;

        let mut added = 0;
        for record in watched {
            if self.check_pick(record.movie_id()).is_err() {
                continue;
            }
            self.items.push(SelectionItem::settled(
                record.movie_id().clone(),
                MovieMetadata::from(record),
                record.id,
                Origin::FoundInTargetList,
            ));
            added += 1;
        }
        added
    }

    /// Drops every item without any server-side compensation
    ///
    /// Picks still in flight keep blocking a new pick of the same movie until their
    /// acquisition finishes.
    pub fn discard(&mut self) -> Vec<SelectionItem> {
        std::mem::take(&mut self.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MovieDetails;

    fn id(s: &str) -> MovieId {
        MovieId::new(s)
    }

    fn meta(title: &str) -> MovieMetadata {
        MovieMetadata {
            title: title.to_string(),
            ..MovieMetadata::default()
        }
    }

    fn watched_record(record_id: RecordId, tconst: &str) -> UserMovie {
        UserMovie {
            id: record_id,
            watchlisted_at: None,
            watched_at: Some(chrono::Utc::now()),
            movie: MovieDetails {
                tconst: id(tconst),
                primary_title: format!("Movie {}", tconst),
                start_year: Some(2001),
                genres: None,
                avg_rating: None,
                poster_path: None,
            },
            availability: Vec::new(),
        }
    }

    #[test]
    fn test_can_pick_false_after_begin_pick() {
        let mut machine = SelectionMachine::new(3);
        assert!(machine.can_pick(&id("tt1")));

        machine.begin_pick(id("tt1"), meta("One")).unwrap();

        assert!(!machine.can_pick(&id("tt1")));
        assert_eq!(
            machine.check_pick(&id("tt1")),
            Err(PickRejection::AlreadySelected)
        );
        assert!(machine.can_pick(&id("tt2")));
    }

    #[test]
    fn test_limit_counts_pending_and_settled() {
        let mut machine = SelectionMachine::new(2);
        machine.begin_pick(id("tt1"), meta("One")).unwrap();
        machine.commit_pick(&id("tt1"), 1, Origin::Created);
        machine.begin_pick(id("tt2"), meta("Two")).unwrap();

        assert_eq!(
            machine.begin_pick(id("tt3"), meta("Three")),
            Err(PickRejection::LimitReached { max: 2 })
        );
        assert_eq!(machine.len(), 2);
    }

    #[test]
    fn test_commit_pick_settles_with_record_and_origin() {
        let mut machine = SelectionMachine::new(3);
        machine.begin_pick(id("tt1"), meta("One")).unwrap();
        machine.commit_pick(&id("tt1"), 42, Origin::Created);

        let item = machine.get(&id("tt1")).unwrap();
        assert_eq!(item.status, SelectionStatus::Settled);
        assert_eq!(item.record_id, Some(42));
        assert_eq!(item.origin, Some(Origin::Created));
    }

    #[test]
    fn test_commit_after_abandon_is_noop() {
        let mut machine = SelectionMachine::new(3);
        machine.begin_pick(id("tt1"), meta("One")).unwrap();
        machine.abandon_pick(&id("tt1"));
        machine.commit_pick(&id("tt1"), 42, Origin::Created);

        assert!(machine.is_empty());
    }

    #[test]
    fn test_commit_never_overwrites_settled_origin() {
        let mut machine = SelectionMachine::new(3);
        machine.begin_pick(id("tt1"), meta("One")).unwrap();
        machine.commit_pick(&id("tt1"), 42, Origin::Created);
        machine.commit_pick(&id("tt1"), 7, Origin::FoundInTargetList);

        let item = machine.get(&id("tt1")).unwrap();
        assert_eq!(item.record_id, Some(42));
        assert_eq!(item.origin, Some(Origin::Created));
    }

    #[test]
    fn test_commit_unknown_movie_is_noop() {
        let mut machine = SelectionMachine::new(3);
        machine.commit_pick(&id("tt9"), 1, Origin::Created);
        assert!(machine.is_empty());
    }

    #[test]
    fn test_abandon_removes_any_status() {
        let mut machine = SelectionMachine::new(3);
        machine.begin_pick(id("tt1"), meta("One")).unwrap();
        machine.commit_pick(&id("tt1"), 1, Origin::Created);
        machine.begin_pick(id("tt2"), meta("Two")).unwrap();

        machine.abandon_pick(&id("tt1"));
        machine.abandon_pick(&id("tt2"));

        assert!(machine.is_empty());
    }

    #[test]
    fn test_undo_cycle() {
        let mut machine = SelectionMachine::new(3);
        machine.begin_pick(id("tt1"), meta("One")).unwrap();
        machine.commit_pick(&id("tt1"), 5, Origin::FoundInSourceList);

        let snapshot = machine.begin_undo(&id("tt1")).unwrap();
        assert_eq!(snapshot.status, SelectionStatus::Settled);
        assert_eq!(
            machine.get(&id("tt1")).unwrap().status,
            SelectionStatus::Undoing
        );
        assert!(machine.begin_undo(&id("tt1")).is_none());

        machine.cancel_undo(&id("tt1"));
        assert_eq!(
            machine.get(&id("tt1")).unwrap().status,
            SelectionStatus::Settled
        );

        machine.begin_undo(&id("tt1")).unwrap();
        machine.remove_settled(&id("tt1"));
        assert!(machine.is_empty());
    }

    #[test]
    fn test_begin_undo_ignores_pending() {
        let mut machine = SelectionMachine::new(3);
        machine.begin_pick(id("tt1"), meta("One")).unwrap();
        assert!(machine.begin_undo(&id("tt1")).is_none());
    }

    #[test]
    fn test_remove_settled_keeps_pending() {
        let mut machine = SelectionMachine::new(3);
        machine.begin_pick(id("tt1"), meta("One")).unwrap();
        machine.remove_settled(&id("tt1"));
        assert_eq!(machine.len(), 1);
    }

    #[test]
    fn test_prefill_truncates_and_runs_once() {
        let mut machine = SelectionMachine::new(3);
        let watched: Vec<UserMovie> = (1..=5)
            .map(|n| watched_record(n, &format!("tt{}", n)))
            .collect();

        assert_eq!(machine.prefill(&watched), 3);
        assert_eq!(machine.settled_count(), 3);
        assert!(machine
            .items()
            .iter()
            .all(|i| i.origin == Some(Origin::FoundInTargetList) && i.record_id.is_some()));

        machine.abandon_pick(&id("tt1"));
        assert_eq!(machine.prefill(&watched), 0);
        assert_eq!(machine.len(), 2);
    }

    #[test]
    fn test_prefill_skips_duplicates() {
        let mut machine = SelectionMachine::new(3);
        let watched = vec![watched_record(1, "tt1"), watched_record(2, "tt1")];

        assert_eq!(machine.prefill(&watched), 1);
        assert_eq!(machine.get(&id("tt1")).unwrap().record_id, Some(1));
    }

    #[test]
    fn test_prefill_with_empty_list_can_run_later() {
        let mut machine = SelectionMachine::new(3);
        assert_eq!(machine.prefill(&[]), 0);
        assert_eq!(machine.prefill(&[watched_record(1, "tt1")]), 1);
    }

    #[test]
    fn test_discard_clears_everything() {
        let mut machine = SelectionMachine::new(3);
        machine.begin_pick(id("tt1"), meta("One")).unwrap();
        machine.begin_pick(id("tt2"), meta("Two")).unwrap();

        let dropped = machine.discard();
        assert_eq!(dropped.len(), 2);
        assert!(machine.is_empty());
    }

    #[test]
    fn test_discard_blocks_repick_until_in_flight_pick_finishes() {
        let mut machine = SelectionMachine::new(3);
        machine.begin_pick(id("tt1"), meta("One")).unwrap();
        machine.discard();

        assert_eq!(machine.check_pick(&id("tt1")), Err(PickRejection::InFlight));

        machine.commit_pick(&id("tt1"), 1, Origin::Created);
        assert!(machine.is_empty());
        assert!(machine.can_pick(&id("tt1")));
    }

    #[test]
    fn test_distinct_picks_all_settle() {
        let mut machine = SelectionMachine::new(3);
        for (n, tconst) in ["tt1", "tt2", "tt3"].iter().enumerate() {
            machine.begin_pick(id(tconst), meta(tconst)).unwrap();
            machine.commit_pick(&id(tconst), n as RecordId + 1, Origin::Created);
        }

        assert_eq!(machine.settled_count(), 3);
        assert!(!machine.can_pick(&id("tt4")));
        assert!(machine
            .items()
            .iter()
            .all(|i| i.record_id.is_some() && i.origin.is_some()));
    }
}
