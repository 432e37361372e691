//! Competition state and the command-driven state machine.
//!
//! `CompetitionState` is the one owned value an officiating shell holds per
//! vertical event. Every command is validated in full before anything is
//! touched, so a rejected command leaves the state exactly as it was. After
//! each accepted command the affected athlete's derived fields are recomputed
//! from the raw attempt log.

use crate::domain::{
    AppendError, AthleteId, AthleteState, AthleteStatus, AttemptOutcome, EventId, Height,
    HeightRecord, ELIMINATION_FAILURES, MAX_ATTEMPTS_PER_HEIGHT,
};
use crate::engine::elimination::{self, FinishOutcome};
use crate::engine::error::EngineError;
use crate::engine::scheduler;
use crate::ladder::HeightLadder;
use crate::persistence::{AttemptRow, AttemptSlot, RecordedOutcome};
use crate::roster::Roster;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Configuration of one vertical event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerticalConfig {
    pub start_height: Height,
    /// Centimetres added when raising past the last announced height.
    pub increment: u32,
    /// Announced heights above the start height.
    #[serde(default)]
    pub heights: Vec<Height>,
    /// Raise the bar automatically once nobody is left to jump at it.
    #[serde(default = "default_auto_advance")]
    pub auto_advance: bool,
}

fn default_auto_advance() -> bool {
    true
}

impl Default for VerticalConfig {
    fn default() -> Self {
        Self {
            start_height: Height(120),
            increment: 5,
            heights: Vec::new(),
            auto_advance: true,
        }
    }
}

impl VerticalConfig {
    pub fn new(start_height: Height, increment: u32) -> Self {
        Self {
            start_height,
            increment,
            ..Self::default()
        }
    }

    pub fn with_heights(mut self, heights: Vec<Height>) -> Self {
        self.heights = heights;
        self
    }

    pub fn with_auto_advance(mut self, auto_advance: bool) -> Self {
        self.auto_advance = auto_advance;
        self
    }

    pub fn ladder(&self) -> Result<HeightLadder, EngineError> {
        let mut heights = vec![self.start_height];
        heights.extend(self.heights.iter().copied());
        HeightLadder::new(heights, self.increment)
    }
}

/// An official's instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Record an outcome at the current height.
    Record {
        athlete: AthleteId,
        outcome: AttemptOutcome,
    },
    /// Remove the most recent slot at `height`.
    Undo { athlete: AthleteId, height: Height },
    /// Withdraw an athlete from the event.
    Retire { athlete: AthleteId },
    /// Move the bar to the next height.
    Raise,
    /// Move the bar to an arbitrary height.
    JumpTo { height: Height, allow_lower: bool },
}

/// Something that happened as a result of a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    AttemptRecorded {
        athlete: AthleteId,
        height: Height,
        attempt_number: u8,
        outcome: AttemptOutcome,
    },
    AttemptUndone {
        athlete: AthleteId,
        height: Height,
        outcome: AttemptOutcome,
        status: AthleteStatus,
    },
    /// The athlete has nothing more to do at `height`.
    AthleteFinished {
        athlete: AthleteId,
        height: Height,
        outcome: FinishOutcome,
    },
    AthleteRetired {
        athlete: AthleteId,
        /// Height carrying the `r` marker, if one was written.
        height: Option<Height>,
        status: AthleteStatus,
    },
    HeightChanged {
        from: Height,
        to: Height,
        automatic: bool,
    },
    /// No athlete is active any more.
    CompetitionOver,
}

/// Audit trail entry for an accepted command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub sequence: u64,
    /// Bar height when the command was accepted.
    pub height: Height,
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitionState {
    event_id: EventId,
    config: VerticalConfig,
    ladder: HeightLadder,
    /// Athletes in fixed competition order.
    athletes: Vec<AthleteState>,
    last_acted: Option<AthleteId>,
    audit_trail: Vec<AuditEntry>,
}

impl CompetitionState {
    /// Fresh event: every roster entry active with an empty log.
    pub fn new(roster: &Roster, config: VerticalConfig) -> Result<Self, EngineError> {
        let ladder = config.ladder()?;
        let athletes = roster
            .athletes
            .iter()
            .enumerate()
            .map(|(i, entry)| AthleteState::new(entry.id.clone(), entry.name.clone(), i))
            .collect();
        Ok(Self {
            event_id: roster.event_id.clone(),
            config,
            ladder,
            athletes,
            last_acted: None,
            audit_trail: Vec::new(),
        })
    }

    // ── Accessors ──────────────────────────────────────────────────────

    pub fn event_id(&self) -> &EventId {
        &self.event_id
    }

    pub fn config(&self) -> &VerticalConfig {
        &self.config
    }

    pub fn ladder(&self) -> &HeightLadder {
        &self.ladder
    }

    pub fn current_height(&self) -> Height {
        self.ladder.current()
    }

    pub fn athletes(&self) -> &[AthleteState] {
        &self.athletes
    }

    pub fn athlete(&self, id: &AthleteId) -> Option<&AthleteState> {
        self.athletes.iter().find(|a| &a.id == id)
    }

    pub fn last_acted(&self) -> Option<&AthleteId> {
        self.last_acted.as_ref()
    }

    pub fn audit_trail(&self) -> &[AuditEntry] {
        &self.audit_trail
    }

    /// True while at least one athlete can still jump.
    pub fn has_active_athletes(&self) -> bool {
        self.athletes.iter().any(|a| a.status().is_active())
    }

    // ── Commands ───────────────────────────────────────────────────────

    /// Apply a command in place.
    ///
    /// On error the state is unchanged.
    pub fn apply(&mut self, command: Command) -> Result<Vec<EngineEvent>, EngineError> {
        let height = self.ladder.current();
        let events = match &command {
            Command::Record { athlete, outcome } => self.apply_record(athlete, *outcome)?,
            Command::Undo { athlete, height } => self.apply_undo(athlete, *height)?,
            Command::Retire { athlete } => {
                let idx = self.index_of(athlete)?;
                self.apply_retire(idx)?
            }
            Command::Raise => self.apply_raise()?,
            Command::JumpTo {
                height,
                allow_lower,
            } => self.apply_jump_to(*height, *allow_lower)?,
        };
        debug!(event = %self.event_id, ?command, "command accepted");
        self.audit_trail.push(AuditEntry {
            sequence: self.audit_trail.len() as u64,
            height,
            command,
        });
        Ok(events)
    }

    pub fn record(
        &mut self,
        athlete: &AthleteId,
        outcome: AttemptOutcome,
    ) -> Result<Vec<EngineEvent>, EngineError> {
        self.apply(Command::Record {
            athlete: athlete.clone(),
            outcome,
        })
    }

    pub fn undo_last(
        &mut self,
        athlete: &AthleteId,
        height: Height,
    ) -> Result<Vec<EngineEvent>, EngineError> {
        self.apply(Command::Undo {
            athlete: athlete.clone(),
            height,
        })
    }

    pub fn retire(&mut self, athlete: &AthleteId) -> Result<Vec<EngineEvent>, EngineError> {
        self.apply(Command::Retire {
            athlete: athlete.clone(),
        })
    }

    pub fn raise(&mut self) -> Result<Vec<EngineEvent>, EngineError> {
        self.apply(Command::Raise)
    }

    pub fn jump_to(
        &mut self,
        height: Height,
        allow_lower: bool,
    ) -> Result<Vec<EngineEvent>, EngineError> {
        self.apply(Command::JumpTo {
            height,
            allow_lower,
        })
    }

    // ── Command handlers ───────────────────────────────────────────────

    fn apply_record(
        &mut self,
        athlete_id: &AthleteId,
        outcome: AttemptOutcome,
    ) -> Result<Vec<EngineEvent>, EngineError> {
        let idx = self.index_of(athlete_id)?;
        if outcome == AttemptOutcome::Retired {
            return self.apply_retire(idx);
        }

        let height = self.ladder.current();
        let athlete = &self.athletes[idx];
        if athlete.attempts_at(height) >= MAX_ATTEMPTS_PER_HEIGHT {
            return Err(EngineError::SlotsExhausted {
                athlete: athlete_id.clone(),
                height,
            });
        }
        if !athlete.status().is_active() || elimination::is_finished_at_height(athlete, height) {
            return Err(not_active(athlete, height));
        }

        let athlete = &mut self.athletes[idx];
        athlete
            .records
            .entry(height)
            .or_default()
            .push(outcome)
            .map_err(|e| match e {
                AppendError::Full => EngineError::SlotsExhausted {
                    athlete: athlete_id.clone(),
                    height,
                },
                AppendError::Closed => EngineError::AthleteNotActive {
                    athlete: athlete_id.clone(),
                    height,
                    status: AthleteStatus::Active,
                },
            })?;
        elimination::refresh(athlete);

        let mut events = vec![EngineEvent::AttemptRecorded {
            athlete: athlete_id.clone(),
            height,
            attempt_number: athlete.attempts_at(height) as u8,
            outcome,
        }];
        if let Some(finish) = elimination::finish_outcome(athlete, height) {
            info!(athlete = %athlete_id, %height, ?finish, "athlete finished at height");
            events.push(EngineEvent::AthleteFinished {
                athlete: athlete_id.clone(),
                height,
                outcome: finish,
            });
        }
        self.last_acted = Some(athlete_id.clone());
        self.auto_advance(&mut events);
        Ok(events)
    }

    fn apply_undo(
        &mut self,
        athlete_id: &AthleteId,
        height: Height,
    ) -> Result<Vec<EngineEvent>, EngineError> {
        let idx = self.index_of(athlete_id)?;
        let athlete = &self.athletes[idx];
        let has_slots = athlete.record(height).is_some_and(|r| !r.is_empty());
        if !has_slots {
            return Err(EngineError::UndoOnEmptyLog {
                athlete: athlete_id.clone(),
                height,
            });
        }
        if let Some(latest) = athlete.latest_height() {
            if latest != height {
                return Err(EngineError::UndoOutOfOrder {
                    athlete: athlete_id.clone(),
                    height,
                    latest,
                });
            }
        }

        let athlete = &mut self.athletes[idx];
        let mut removed = None;
        if let Some(record) = athlete.records.get_mut(&height) {
            removed = record.pop();
            if record.is_empty() {
                athlete.records.remove(&height);
            }
        }
        let Some(outcome) = removed else {
            return Err(EngineError::UndoOnEmptyLog {
                athlete: athlete_id.clone(),
                height,
            });
        };
        if outcome == AttemptOutcome::Retired {
            athlete.withdrawn = false;
        }
        elimination::refresh(athlete);
        let status = athlete.status();
        let reopened = status.is_active() && !elimination::is_finished_at_height(athlete, height);
        info!(athlete = %athlete_id, %height, ?outcome, %status, "attempt undone");

        let mut events = vec![EngineEvent::AttemptUndone {
            athlete: athlete_id.clone(),
            height,
            outcome,
            status,
        }];
        if reopened {
            self.seek_back(height, &mut events);
        }
        Ok(events)
    }

    /// Return the bar to `height` after an undo reopened it, as long as nobody
    /// has a slot above it yet.
    fn seek_back(&mut self, height: Height, events: &mut Vec<EngineEvent>) {
        let from = self.ladder.current();
        let moved_on = self
            .athletes
            .iter()
            .any(|a| a.latest_height().is_some_and(|h| h > height));
        if height >= from || moved_on {
            return;
        }
        if !self.ladder.seek(height) {
            return;
        }
        self.last_acted = None;
        info!(event = %self.event_id, %from, to = %height, "bar lowered after undo");
        events.push(EngineEvent::HeightChanged {
            from,
            to: height,
            automatic: true,
        });
    }

    fn apply_retire(&mut self, idx: usize) -> Result<Vec<EngineEvent>, EngineError> {
        let current = self.ladder.current();
        let athlete = &self.athletes[idx];
        if !athlete.status().is_active() {
            return Err(not_active(athlete, current));
        }

        // The `r` goes where the athlete would jump next: the current height if
        // still open there, otherwise the next rung.
        let open = |h: Height| athlete.record(h).map_or(true, |r| !r.is_closed() && !r.is_full());
        let marker_height = if open(current) {
            Some(current)
        } else if open(self.ladder.peek_next()) {
            Some(self.ladder.peek_next())
        } else {
            None
        };

        let athlete = &mut self.athletes[idx];
        if let Some(h) = marker_height {
            let mut record = athlete.records.get(&h).cloned().unwrap_or_default();
            if record.push(AttemptOutcome::Retired).is_ok() {
                athlete.records.insert(h, record);
            }
        }
        athlete.withdrawn = true;
        elimination::refresh(athlete);
        info!(athlete = %athlete.id, status = %athlete.status(), "athlete withdrawn");

        let mut events = vec![EngineEvent::AthleteRetired {
            athlete: athlete.id.clone(),
            height: marker_height,
            status: athlete.status(),
        }];
        self.auto_advance(&mut events);
        Ok(events)
    }

    fn apply_raise(&mut self) -> Result<Vec<EngineEvent>, EngineError> {
        if !self.has_active_athletes() {
            return Err(EngineError::EmptyActivePool);
        }
        let from = self.ladder.current();
        let to = self.ladder.raise();
        self.last_acted = None;
        info!(event = %self.event_id, %from, %to, "bar raised");
        Ok(vec![EngineEvent::HeightChanged {
            from,
            to,
            automatic: false,
        }])
    }

    fn apply_jump_to(
        &mut self,
        height: Height,
        allow_lower: bool,
    ) -> Result<Vec<EngineEvent>, EngineError> {
        let from = self.ladder.current();
        let to = self.ladder.jump_to(height, allow_lower)?;
        self.last_acted = None;
        info!(event = %self.event_id, %from, %to, allow_lower, "bar moved");
        Ok(vec![EngineEvent::HeightChanged {
            from,
            to,
            automatic: false,
        }])
    }

    /// Raise the bar once the current height is exhausted, or announce the end.
    fn auto_advance(&mut self, events: &mut Vec<EngineEvent>) {
        if !scheduler::active_pool(self).is_empty() {
            return;
        }
        if !self.has_active_athletes() {
            info!(event = %self.event_id, "competition over");
            events.push(EngineEvent::CompetitionOver);
            return;
        }
        if !self.config.auto_advance {
            return;
        }
        let from = self.ladder.current();
        let to = self.ladder.raise();
        self.last_acted = None;
        info!(event = %self.event_id, %from, %to, "height exhausted, bar raised");
        events.push(EngineEvent::HeightChanged {
            from,
            to,
            automatic: true,
        });
    }

    fn index_of(&self, id: &AthleteId) -> Result<usize, EngineError> {
        self.athletes
            .iter()
            .position(|a| &a.id == id)
            .ok_or_else(|| EngineError::UnknownAthlete(id.clone()))
    }

    // ── Rehydration & digest ───────────────────────────────────────────

    /// Rebuild an event from persisted rows.
    ///
    /// Rows for other events are ignored. The cursor lands on the highest
    /// height anybody jumped or passed at (the start height when there is
    /// none), and the bar is auto-advanced if that height is already done.
    pub fn rehydrate(
        roster: &Roster,
        config: VerticalConfig,
        rows: &[AttemptRow],
    ) -> Result<Self, EngineError> {
        let mut state = Self::new(roster, config)?;

        let mut grouped: BTreeMap<(usize, Height), BTreeMap<u8, AttemptOutcome>> = BTreeMap::new();
        for row in rows {
            if row.key.event_id != state.event_id {
                continue;
            }
            let (AttemptSlot::Height(height), RecordedOutcome::Vertical(outcome)) =
                (row.key.slot, row.outcome)
            else {
                return Err(EngineError::InvalidLog(format!(
                    "non-vertical row for athlete {}",
                    row.key.athlete_id
                )));
            };
            let idx = state.index_of(&row.key.athlete_id).map_err(|_| {
                EngineError::InvalidLog(format!("athlete {} not on roster", row.key.athlete_id))
            })?;
            grouped
                .entry((idx, height))
                .or_default()
                .insert(row.key.attempt_number, outcome);
        }

        for ((idx, height), slots) in grouped {
            let athlete = &mut state.athletes[idx];
            let contiguous = slots.keys().copied().eq(1..=slots.len() as u8);
            if !contiguous {
                return Err(EngineError::InvalidLog(format!(
                    "athlete {} has gaps in attempt numbers at {height}",
                    athlete.id
                )));
            }
            let outcomes: Vec<AttemptOutcome> = slots.into_values().collect();
            let record = HeightRecord::from_attempts(&outcomes).map_err(|e| {
                EngineError::InvalidLog(format!("athlete {} at {height}: {e}", athlete.id))
            })?;
            if record.retired() {
                athlete.withdrawn = true;
            }
            athlete.records.insert(height, record);
        }

        for athlete in &mut state.athletes {
            check_no_attempts_after_exit(athlete)?;
            elimination::refresh(athlete);
        }

        let mut heights: Vec<Height> = state.ladder.heights().to_vec();
        heights.extend(state.athletes.iter().flat_map(|a| a.records.keys().copied()));
        heights.sort_unstable();
        heights.dedup();
        state.ladder = HeightLadder::new(heights, state.config.increment)?;

        let contested = state
            .athletes
            .iter()
            .flat_map(|a| a.records())
            .filter(|(_, r)| r.attempts().iter().any(|o| *o != AttemptOutcome::Retired))
            .map(|(h, _)| h)
            .max();
        if let Some(height) = contested {
            state.ladder.seek(height);
        }

        let mut ignored = Vec::new();
        state.auto_advance(&mut ignored);
        info!(
            event = %state.event_id,
            rows = rows.len(),
            height = %state.current_height(),
            "event rehydrated"
        );
        Ok(state)
    }

    /// BLAKE3 digest of the attempt log in competition order.
    ///
    /// Two states with the same roster order and the same slots produce the
    /// same digest, regardless of how they were reached.
    pub fn log_digest(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.event_id.as_str().as_bytes());
        for athlete in &self.athletes {
            hasher.update(b"\n");
            hasher.update(athlete.id.as_str().as_bytes());
            for (height, record) in athlete.records() {
                hasher.update(format!("|{}:{}", height.as_cm(), record).as_bytes());
            }
        }
        hasher.finalize().to_hex().to_string()
    }
}

/// Pure form of [`CompetitionState::apply`]: the input state is untouched.
pub fn transition(
    state: &CompetitionState,
    command: Command,
) -> Result<(CompetitionState, Vec<EngineEvent>), EngineError> {
    let mut next = state.clone();
    let events = next.apply(command)?;
    Ok((next, events))
}

fn not_active(athlete: &AthleteState, height: Height) -> EngineError {
    EngineError::AthleteNotActive {
        athlete: athlete.id.clone(),
        height,
        status: athlete.status(),
    }
}

/// A stored log may not continue past three consecutive failures or a
/// withdrawal marker.
fn check_no_attempts_after_exit(athlete: &AthleteState) -> Result<(), EngineError> {
    let mut exit: Option<Height> = None;
    for (height, record) in athlete.records() {
        if let Some(out_at) = exit {
            return Err(EngineError::InvalidLog(format!(
                "athlete {} has attempts at {height} after leaving at {out_at}",
                athlete.id
            )));
        }
        if record.retired() || elimination::total_failures(athlete, height) >= ELIMINATION_FAILURES
        {
            exit = Some(height);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AttemptOutcome::*;

    fn roster(ids: &[&str]) -> Roster {
        Roster::from_ids(EventId::from("hj"), ids.iter().copied()).unwrap()
    }

    fn state(ids: &[&str], heights: &[u32]) -> CompetitionState {
        let config = VerticalConfig::new(Height(heights[0]), 5)
            .with_heights(heights[1..].iter().copied().map(Height).collect());
        CompetitionState::new(&roster(ids), config).unwrap()
    }

    fn id(s: &str) -> AthleteId {
        AthleteId::from(s)
    }

    #[test]
    fn config_builds_ladder() {
        let config = VerticalConfig::new(Height(120), 3).with_heights(vec![Height(125)]);
        let ladder = config.ladder().unwrap();
        assert_eq!(ladder.heights(), &[Height(120), Height(125)]);
        assert_eq!(ladder.increment(), 3);
    }

    #[test]
    fn config_from_toml_defaults_auto_advance() {
        let config: VerticalConfig = toml::from_str("start_height = 150\nincrement = 4").unwrap();
        assert!(config.auto_advance);
        assert!(config.heights.is_empty());
    }

    #[test]
    fn record_appends_and_emits() {
        let mut s = state(&["a", "b"], &[120, 125]);
        let events = s.record(&id("a"), Fail).unwrap();
        assert_eq!(
            events,
            vec![EngineEvent::AttemptRecorded {
                athlete: id("a"),
                height: Height(120),
                attempt_number: 1,
                outcome: Fail,
            }]
        );
        assert_eq!(s.last_acted(), Some(&id("a")));
        assert_eq!(s.audit_trail().len(), 1);
    }

    #[test]
    fn clear_emits_finish() {
        let mut s = state(&["a", "b"], &[120, 125]);
        let events = s.record(&id("a"), Clear).unwrap();
        assert!(events.contains(&EngineEvent::AthleteFinished {
            athlete: id("a"),
            height: Height(120),
            outcome: FinishOutcome::Cleared,
        }));
        assert_eq!(s.athlete(&id("a")).unwrap().best_height(), Some(Height(120)));
    }

    #[test]
    fn unknown_athlete_is_rejected() {
        let mut s = state(&["a"], &[120]);
        assert_eq!(
            s.record(&id("zz"), Fail).unwrap_err(),
            EngineError::UnknownAthlete(id("zz"))
        );
    }

    #[test]
    fn rejected_record_leaves_state_unchanged() {
        let mut s = state(&["a", "b"], &[120, 125]);
        s.record(&id("a"), Clear).unwrap();
        let before = s.clone();
        let err = s.record(&id("a"), Fail).unwrap_err();
        assert!(matches!(err, EngineError::AthleteNotActive { .. }));
        assert_eq!(s, before);
    }

    #[test]
    fn fourth_attempt_is_slots_exhausted() {
        let mut s = state(&["a", "b"], &[120, 125]);
        s.record(&id("a"), Fail).unwrap();
        s.record(&id("a"), Fail).unwrap();
        s.record(&id("a"), Clear).unwrap();
        let before = s.clone();
        assert_eq!(
            s.record(&id("a"), Fail).unwrap_err(),
            EngineError::SlotsExhausted {
                athlete: id("a"),
                height: Height(120)
            }
        );
        assert_eq!(s, before);
    }

    #[test]
    fn auto_advance_when_height_exhausted() {
        let mut s = state(&["a", "b"], &[120, 125]);
        s.record(&id("a"), Clear).unwrap();
        let events = s.record(&id("b"), Pass).unwrap();
        assert!(events.contains(&EngineEvent::HeightChanged {
            from: Height(120),
            to: Height(125),
            automatic: true,
        }));
        assert_eq!(s.current_height(), Height(125));
        assert_eq!(s.last_acted(), None);
    }

    #[test]
    fn no_auto_advance_when_disabled() {
        let config = VerticalConfig::new(Height(120), 5).with_auto_advance(false);
        let mut s = CompetitionState::new(&roster(&["a"]), config).unwrap();
        s.record(&id("a"), Clear).unwrap();
        assert_eq!(s.current_height(), Height(120));
        s.raise().unwrap();
        assert_eq!(s.current_height(), Height(125));
    }

    #[test]
    fn last_elimination_ends_competition() {
        let mut s = state(&["a"], &[120]);
        s.record(&id("a"), Fail).unwrap();
        s.record(&id("a"), Fail).unwrap();
        let events = s.record(&id("a"), Fail).unwrap();
        assert!(events.contains(&EngineEvent::CompetitionOver));
        assert_eq!(s.athlete(&id("a")).unwrap().status(), AthleteStatus::NoHeight);
        assert_eq!(s.raise().unwrap_err(), EngineError::EmptyActivePool);
    }

    #[test]
    fn undo_restores_activity() {
        let mut s = state(&["a", "b"], &[120]);
        s.record(&id("a"), Clear).unwrap();
        s.record(&id("b"), Clear).unwrap();
        assert_eq!(s.current_height(), Height(125));
        for _ in 0..3 {
            s.record(&id("a"), Fail).unwrap();
        }
        assert_eq!(s.athlete(&id("a")).unwrap().status(), AthleteStatus::Eliminated);

        let events = s.undo_last(&id("a"), Height(125)).unwrap();
        assert_eq!(
            events,
            vec![EngineEvent::AttemptUndone {
                athlete: id("a"),
                height: Height(125),
                outcome: Fail,
                status: AthleteStatus::Active,
            }]
        );
        assert_eq!(s.athlete(&id("a")).unwrap().attempts_at(Height(125)), 2);
    }

    #[test]
    fn undo_reverses_auto_advance() {
        let mut s = state(&["a", "b"], &[120, 125]);
        s.record(&id("a"), Clear).unwrap();
        for _ in 0..3 {
            s.record(&id("b"), Fail).unwrap();
        }
        assert_eq!(s.current_height(), Height(125));

        let events = s.undo_last(&id("b"), Height(120)).unwrap();
        assert_eq!(
            events[1],
            EngineEvent::HeightChanged {
                from: Height(125),
                to: Height(120),
                automatic: true,
            }
        );
        assert_eq!(s.current_height(), Height(120));

        s.record(&id("b"), Clear).unwrap();
        let b = s.athlete(&id("b")).unwrap();
        assert_eq!(b.record(Height(120)).unwrap().to_string(), "XXO");
        assert_eq!(b.attempts_at(Height(125)), 0);
        assert_eq!(s.current_height(), Height(125));
    }

    #[test]
    fn undo_keeps_bar_once_next_height_is_contested() {
        let mut s = state(&["a", "b"], &[120, 125]);
        s.record(&id("a"), Clear).unwrap();
        for _ in 0..3 {
            s.record(&id("b"), Fail).unwrap();
        }
        s.record(&id("a"), Fail).unwrap();

        let events = s.undo_last(&id("b"), Height(120)).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(s.current_height(), Height(125));
    }

    #[test]
    fn undo_on_empty_height() {
        let mut s = state(&["a"], &[120]);
        assert!(matches!(
            s.undo_last(&id("a"), Height(120)),
            Err(EngineError::UndoOnEmptyLog { .. })
        ));
    }

    #[test]
    fn undo_must_target_latest_height() {
        let mut s = state(&["a", "b"], &[120, 125]);
        s.record(&id("a"), Clear).unwrap();
        s.record(&id("b"), Clear).unwrap();
        s.record(&id("a"), Fail).unwrap();
        assert_eq!(
            s.undo_last(&id("a"), Height(120)).unwrap_err(),
            EngineError::UndoOutOfOrder {
                athlete: id("a"),
                height: Height(120),
                latest: Height(125),
            }
        );
    }

    #[test]
    fn retire_mid_height_writes_marker() {
        let mut s = state(&["a", "b"], &[120, 125]);
        s.record(&id("a"), Fail).unwrap();
        let events = s.retire(&id("a")).unwrap();
        assert_eq!(
            events[0],
            EngineEvent::AthleteRetired {
                athlete: id("a"),
                height: Some(Height(120)),
                status: AthleteStatus::Retired,
            }
        );
        let a = s.athlete(&id("a")).unwrap();
        assert_eq!(a.record(Height(120)).unwrap().to_string(), "Xr");
        assert_eq!(a.total_failures(), 1);
    }

    #[test]
    fn retire_without_jumping_is_dns() {
        let mut s = state(&["a", "b"], &[120, 125]);
        s.retire(&id("a")).unwrap();
        assert_eq!(s.athlete(&id("a")).unwrap().status(), AthleteStatus::DidNotStart);
        assert!(matches!(
            s.record(&id("a"), Fail),
            Err(EngineError::AthleteNotActive { .. })
        ));
    }

    #[test]
    fn retire_after_only_passing_is_retired() {
        let mut s = state(&["a", "b"], &[120, 125, 130]);
        s.record(&id("a"), Pass).unwrap();
        s.retire(&id("a")).unwrap();
        let a = s.athlete(&id("a")).unwrap();
        assert_eq!(a.status(), AthleteStatus::Retired);
        assert_eq!(a.best_height(), None);

        let standings = crate::standings::rank_athletes(s.athletes());
        let a = standings.iter().find(|st| st.athlete == id("a")).unwrap();
        assert_eq!(a.classification, crate::standings::Classification::NoMark);
    }

    #[test]
    fn retire_after_clearing_marks_next_height() {
        let mut s = state(&["a", "b"], &[120, 125]);
        s.record(&id("a"), Clear).unwrap();
        let events = s.retire(&id("a")).unwrap();
        assert!(matches!(
            events[0],
            EngineEvent::AthleteRetired { height: Some(Height(125)), .. }
        ));
        let a = s.athlete(&id("a")).unwrap();
        assert_eq!(a.status(), AthleteStatus::Retired);
        assert_eq!(a.best_height(), Some(Height(120)));
    }

    #[test]
    fn undoing_marker_reinstates() {
        let mut s = state(&["a", "b"], &[120, 125]);
        s.record(&id("a"), Fail).unwrap();
        s.retire(&id("a")).unwrap();
        s.undo_last(&id("a"), Height(120)).unwrap();
        let a = s.athlete(&id("a")).unwrap();
        assert_eq!(a.status(), AthleteStatus::Active);
        assert!(!a.is_withdrawn());
    }

    #[test]
    fn record_retired_outcome_retires() {
        let mut s = state(&["a", "b"], &[120]);
        s.record(&id("a"), Fail).unwrap();
        s.record(&id("a"), Retired).unwrap();
        assert_eq!(s.athlete(&id("a")).unwrap().status(), AthleteStatus::Retired);
    }

    #[test]
    fn jump_to_requires_increase() {
        let mut s = state(&["a"], &[120, 125]);
        let before = s.clone();
        assert!(matches!(
            s.jump_to(Height(120), false),
            Err(EngineError::NonMonotonicHeight { .. })
        ));
        assert_eq!(s, before);
        s.jump_to(Height(140), false).unwrap();
        assert_eq!(s.current_height(), Height(140));
    }

    #[test]
    fn transition_is_pure() {
        let s = state(&["a", "b"], &[120]);
        let (next, events) = transition(
            &s,
            Command::Record {
                athlete: id("a"),
                outcome: Fail,
            },
        )
        .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(s.athlete(&id("a")).unwrap().attempts_at(Height(120)), 0);
        assert_eq!(next.athlete(&id("a")).unwrap().attempts_at(Height(120)), 1);
    }

    #[test]
    fn digest_tracks_log_only() {
        let mut a = state(&["a", "b"], &[120]);
        let mut b = state(&["a", "b"], &[120]);
        a.record(&id("a"), Fail).unwrap();
        b.record(&id("a"), Clear).unwrap();
        assert_ne!(a.log_digest(), b.log_digest());
        b.undo_last(&id("a"), Height(120)).unwrap();
        b.record(&id("a"), Fail).unwrap();
        assert_eq!(a.log_digest(), b.log_digest());
    }

    #[test]
    fn command_serializes_tagged() {
        let json = serde_json::to_string(&Command::Raise).unwrap();
        assert_eq!(json, r#"{"command":"raise"}"#);
    }
}
