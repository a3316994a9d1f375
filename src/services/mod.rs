pub mod acquisition;
pub mod mutators;
pub mod rollback;
pub mod search;
pub mod selection;
pub mod watched_selection;

pub use acquisition::{acquire_watched, Acquisition};
pub use mutators::ListMutators;
pub use rollback::{compensate, Compensation};
pub use search::{SearchOutcome, SearchSession};
pub use selection::{PickRejection, SelectionMachine};
pub use watched_selection::{PickOutcome, UndoOutcome, WatchedSelectionFlow};
