//! Typed errors returned by every mutating engine operation.
//!
//! A rejected command never changes state. Persistence failures belong to the
//! shell, not the engine.

use crate::domain::{AthleteId, AthleteStatus, Height};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("athlete {0} is not on the roster")]
    UnknownAthlete(AthleteId),

    #[error("athlete {athlete} has already used every attempt at {height}")]
    SlotsExhausted { athlete: AthleteId, height: Height },

    #[error("athlete {athlete} cannot jump at {height} (status: {status})")]
    AthleteNotActive {
        athlete: AthleteId,
        height: Height,
        status: AthleteStatus,
    },

    #[error("height {requested} is not above the current height {current}")]
    NonMonotonicHeight { requested: Height, current: Height },

    #[error("no athlete is eligible to jump")]
    EmptyActivePool,

    #[error("athlete {athlete} has no attempts to undo at {height}")]
    UndoOnEmptyLog { athlete: AthleteId, height: Height },

    #[error("athlete {athlete} has later attempts than {height}; undo from {latest} first")]
    UndoOutOfOrder {
        athlete: AthleteId,
        height: Height,
        latest: Height,
    },

    #[error("invalid height ladder: {0}")]
    InvalidLadder(String),

    #[error("invalid attempt log: {0}")]
    InvalidLog(String),
}
