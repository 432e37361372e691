//! Elimination rules: pure functions over one athlete's attempt log.
//!
//! Failures are consecutive across heights: fails taken before a pass travel
//! with the athlete to the next height they actually attempt, and only a
//! clear wipes them. Three consecutive failures end the competition.

use crate::domain::{
    AthleteState, AthleteStatus, AttemptOutcome, Height, ELIMINATION_FAILURES,
};
use serde::{Deserialize, Serialize};

/// How an athlete's business at a height ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishOutcome {
    Cleared,
    Passed,
    Eliminated,
    Retired,
}

/// Failures carried into `height` from lower heights.
///
/// Walks the athlete's records below `height` from the top down. A record
/// containing a clear stops the walk; any other record (one that ended in a
/// pass) contributes its fails. Heights the athlete never touched are skipped.
pub fn carried_failures(athlete: &AthleteState, height: Height) -> u8 {
    let mut carried = 0u8;
    for (_, record) in athlete.records.range(..height).rev() {
        if record.cleared() {
            break;
        }
        carried = carried.saturating_add(record.failures());
    }
    carried
}

/// Fails recorded at `height` itself.
pub fn direct_failures(athlete: &AthleteState, height: Height) -> u8 {
    athlete.record(height).map_or(0, |r| r.failures())
}

pub fn total_failures(athlete: &AthleteState, height: Height) -> u8 {
    direct_failures(athlete, height).saturating_add(carried_failures(athlete, height))
}

/// True once the athlete has nothing more to do at `height`.
pub fn is_finished_at_height(athlete: &AthleteState, height: Height) -> bool {
    let closed = athlete.record(height).is_some_and(|r| r.is_closed());
    closed || total_failures(athlete, height) >= ELIMINATION_FAILURES
}

/// Highest cleared height.
pub fn best_height(athlete: &AthleteState) -> Option<Height> {
    athlete
        .records()
        .rev()
        .find(|(_, r)| r.cleared())
        .map(|(h, _)| h)
}

/// Status derived from the log and the withdrawal flag alone.
pub fn status_after(athlete: &AthleteState) -> AthleteStatus {
    if athlete.withdrawn {
        return if athlete.has_attempted() {
            AthleteStatus::Retired
        } else {
            AthleteStatus::DidNotStart
        };
    }
    let out = athlete
        .records()
        .any(|(h, _)| total_failures(athlete, h) >= ELIMINATION_FAILURES);
    match (out, best_height(athlete)) {
        (false, _) => AthleteStatus::Active,
        (true, Some(_)) => AthleteStatus::Eliminated,
        (true, None) => AthleteStatus::NoHeight,
    }
}

/// Recompute every derived field from the raw log.
pub fn refresh(athlete: &mut AthleteState) {
    athlete.best_height = best_height(athlete);
    athlete.status = status_after(athlete);
}

/// How the athlete finished at `height`, if they have.
pub fn finish_outcome(athlete: &AthleteState, height: Height) -> Option<FinishOutcome> {
    let record = athlete.record(height);
    match record.and_then(|r| r.last()) {
        Some(AttemptOutcome::Clear) => Some(FinishOutcome::Cleared),
        Some(AttemptOutcome::Pass) => Some(FinishOutcome::Passed),
        Some(AttemptOutcome::Retired) => Some(FinishOutcome::Retired),
        _ if total_failures(athlete, height) >= ELIMINATION_FAILURES => {
            Some(FinishOutcome::Eliminated)
        }
        _ => None,
    }
}
