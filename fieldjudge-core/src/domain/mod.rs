//! Domain types for vertical and horizontal field events.

pub mod athlete;
pub mod attempt;
pub mod height;
pub mod ids;

pub use athlete::{AthleteState, AthleteStatus};
pub use attempt::{
    AppendError, AttemptOutcome, HeightRecord, ParseOutcomeError, ELIMINATION_FAILURES,
    MAX_ATTEMPTS_PER_HEIGHT,
};
pub use height::Height;
pub use ids::{AthleteId, EventId};
