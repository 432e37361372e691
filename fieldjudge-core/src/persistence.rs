//! Persistence contract: what the engine hands to, and reads back from, the
//! external attempt store.
//!
//! Rows are keyed by their natural key `(event, athlete, height|round,
//! attempt number)` and every save is an upsert, so repeated or reordered
//! saves converge on the same stored log.

use crate::domain::{AthleteId, AthleteState, AttemptOutcome, EventId, Height};
use crate::domain::MAX_ATTEMPTS_PER_HEIGHT;
use crate::horizontal::HorizontalAttempt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Where an attempt sits: a bar height (vertical) or a round (horizontal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptSlot {
    Height(Height),
    Round(u8),
}

/// Natural key of a persisted attempt.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AttemptKey {
    pub event_id: EventId,
    pub athlete_id: AthleteId,
    pub slot: AttemptSlot,
    /// 1-based slot number within the height (always 1 for rounds).
    pub attempt_number: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RecordedOutcome {
    Vertical(AttemptOutcome),
    Horizontal(HorizontalAttempt),
    /// Horizontal withdrawal, stored in the round after the athlete's last attempt.
    Withdrawn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRow {
    pub key: AttemptKey,
    pub outcome: RecordedOutcome,
}

/// Failure reported by the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("save failed: {message}")]
pub struct SaveError {
    pub message: String,
    /// Transient failures may be retried unchanged.
    pub retryable: bool,
}

impl SaveError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }
}

/// The persistence collaborator.
pub trait AttemptStore {
    /// Upsert one attempt on its natural key.
    fn save_attempt(&mut self, row: &AttemptRow) -> Result<(), SaveError>;

    /// Remove one attempt; removing an absent key succeeds.
    fn clear_attempt(&mut self, key: &AttemptKey) -> Result<(), SaveError>;

    /// Every stored attempt of an event, in natural-key order.
    fn load_attempts(&self, event_id: &EventId) -> Result<Vec<AttemptRow>, SaveError>;

    /// Remember where the bar stands. Stores without a cursor ignore it.
    fn save_bar(&mut self, _event_id: &EventId, _height: Height) -> Result<(), SaveError> {
        Ok(())
    }

    fn load_bar(&self, _event_id: &EventId) -> Result<Option<Height>, SaveError> {
        Ok(None)
    }
}

/// Full replacement of one athlete's slots at one height or round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSet {
    pub upserts: Vec<AttemptRow>,
    pub clears: Vec<AttemptKey>,
}

impl WriteSet {
    /// Rows mirroring `athlete`'s record at `height`; unused slots are cleared.
    pub fn for_height(event_id: &EventId, athlete: &AthleteState, height: Height) -> Self {
        let attempts = athlete.record(height).map_or(&[][..], |r| r.attempts());
        let mut set = Self::default();
        for number in 1..=MAX_ATTEMPTS_PER_HEIGHT {
            let key = AttemptKey {
                event_id: event_id.clone(),
                athlete_id: athlete.id.clone(),
                slot: AttemptSlot::Height(height),
                attempt_number: number as u8,
            };
            match attempts.get(number - 1) {
                Some(outcome) => set.upserts.push(AttemptRow {
                    key,
                    outcome: RecordedOutcome::Vertical(*outcome),
                }),
                None => set.clears.push(key),
            }
        }
        set
    }

    /// Row for one horizontal round, or a clear when the round is empty.
    pub fn for_round(
        event_id: &EventId,
        athlete_id: &AthleteId,
        round: u8,
        attempt: Option<HorizontalAttempt>,
    ) -> Self {
        let key = AttemptKey {
            event_id: event_id.clone(),
            athlete_id: athlete_id.clone(),
            slot: AttemptSlot::Round(round),
            attempt_number: 1,
        };
        match attempt {
            Some(a) => Self {
                upserts: vec![AttemptRow {
                    key,
                    outcome: RecordedOutcome::Horizontal(a),
                }],
                clears: Vec::new(),
            },
            None => Self {
                upserts: Vec::new(),
                clears: vec![key],
            },
        }
    }

    /// Withdrawal marker in `round`, the first round the athlete will not jump.
    pub fn withdrawal(event_id: &EventId, athlete_id: &AthleteId, round: u8) -> Self {
        Self {
            upserts: vec![AttemptRow {
                key: AttemptKey {
                    event_id: event_id.clone(),
                    athlete_id: athlete_id.clone(),
                    slot: AttemptSlot::Round(round),
                    attempt_number: 1,
                },
                outcome: RecordedOutcome::Withdrawn,
            }],
            clears: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.clears.is_empty()
    }

    /// Push every write to `store`, stopping at the first failure.
    pub fn apply_to(&self, store: &mut dyn AttemptStore) -> Result<(), SaveError> {
        for row in &self.upserts {
            store.save_attempt(row)?;
        }
        for key in &self.clears {
            store.clear_attempt(key)?;
        }
        Ok(())
    }
}

/// In-process store keyed by natural key.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAttemptStore {
    rows: BTreeMap<AttemptKey, RecordedOutcome>,
    bars: BTreeMap<EventId, Height>,
}

impl InMemoryAttemptStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl AttemptStore for InMemoryAttemptStore {
    fn save_attempt(&mut self, row: &AttemptRow) -> Result<(), SaveError> {
        self.rows.insert(row.key.clone(), row.outcome);
        Ok(())
    }

    fn clear_attempt(&mut self, key: &AttemptKey) -> Result<(), SaveError> {
        self.rows.remove(key);
        Ok(())
    }

    fn load_attempts(&self, event_id: &EventId) -> Result<Vec<AttemptRow>, SaveError> {
        Ok(self
            .rows
            .iter()
            .filter(|(k, _)| &k.event_id == event_id)
            .map(|(k, o)| AttemptRow {
                key: k.clone(),
                outcome: *o,
            })
            .collect())
    }

    fn save_bar(&mut self, event_id: &EventId, height: Height) -> Result<(), SaveError> {
        self.bars.insert(event_id.clone(), height);
        Ok(())
    }

    fn load_bar(&self, event_id: &EventId) -> Result<Option<Height>, SaveError> {
        Ok(self.bars.get(event_id).copied())
    }
}
