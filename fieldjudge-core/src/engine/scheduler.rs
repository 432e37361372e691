//! Progression scheduler: who jumps next at the current height.
//!
//! Round-robin by fewest attempts taken at the height, ties broken by the
//! fixed competition order starting after whoever jumped last. Nobody takes a
//! second attempt at a height before everyone still in contention there has
//! taken their first.

use crate::domain::{AthleteId, AthleteState};
use crate::engine::elimination;
use crate::engine::error::EngineError;
use crate::engine::state::CompetitionState;
use serde::{Deserialize, Serialize};

/// What the official should do next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "next", content = "athlete", rename_all = "snake_case")]
pub enum Progress {
    /// Call this athlete to the runway.
    Next(AthleteId),
    /// Nobody left at this height; raise the bar.
    HeightExhausted,
    /// Nobody left at all.
    CompetitionOver,
}

/// Athletes still to finish at the current height, in competition order.
pub fn active_pool(state: &CompetitionState) -> Vec<&AthleteState> {
    let height = state.current_height();
    state
        .athletes()
        .iter()
        .filter(|a| a.status().is_active() && !elimination::is_finished_at_height(a, height))
        .collect()
}

/// Pick the next athlete from the active pool.
///
/// With `last_acted` unset (start of a height) the first eligible athlete in
/// competition order is chosen.
pub fn next_athlete(
    state: &CompetitionState,
    last_acted: Option<&AthleteId>,
) -> Result<AthleteId, EngineError> {
    let height = state.current_height();
    let pool = active_pool(state);
    let fewest = pool
        .iter()
        .map(|a| a.attempts_at(height))
        .min()
        .ok_or(EngineError::EmptyActivePool)?;
    let round: Vec<&AthleteState> = pool
        .into_iter()
        .filter(|a| a.attempts_at(height) == fewest)
        .collect();

    let after = last_acted
        .and_then(|id| state.athlete(id))
        .map(|a| a.entry_index);
    let chosen = after
        .and_then(|pos| round.iter().find(|a| a.entry_index > pos))
        .or_else(|| round.first())
        .ok_or(EngineError::EmptyActivePool)?;
    Ok(chosen.id.clone())
}

/// Decide the next step from the state's own `last_acted`.
pub fn decide(state: &CompetitionState) -> Progress {
    match next_athlete(state, state.last_acted()) {
        Ok(id) => Progress::Next(id),
        Err(_) if state.has_active_athletes() => Progress::HeightExhausted,
        Err(_) => Progress::CompetitionOver,
    }
}
