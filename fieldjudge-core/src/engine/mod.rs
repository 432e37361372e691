//! Vertical-jump officiating engine.
//!
//! An official reports an outcome, the attempt log is appended, the
//! elimination rules re-derive the athlete's status and best height, and the
//! scheduler picks the next athlete or raises the bar. Every derived value is
//! recomputed from the log on each transition.

pub mod elimination;
pub mod error;
pub mod scheduler;
pub mod state;

pub use elimination::{
    best_height, carried_failures, direct_failures, finish_outcome, is_finished_at_height,
    status_after, total_failures, FinishOutcome,
};
pub use error::EngineError;
pub use scheduler::{active_pool, decide, next_athlete, Progress};
pub use state::{transition, AuditEntry, Command, CompetitionState, EngineEvent, VerticalConfig};
