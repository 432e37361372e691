//! Round-robin officiating for horizontal events (throws, long and triple jump).
//!
//! No ladder and no carry-over: each round every athlete still in the event
//! takes one attempt, in competition order. A round closes once nobody in it
//! is left to jump.

use crate::domain::{AthleteId, EventId};
use crate::persistence::{AttemptRow, AttemptSlot, RecordedOutcome};
use crate::roster::Roster;
use crate::standings::Classification;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HorizontalError {
    #[error("athlete {0} is not on the roster")]
    UnknownAthlete(AthleteId),

    #[error("athlete {athlete} has used all {rounds} rounds")]
    RoundsExhausted { athlete: AthleteId, rounds: u8 },

    #[error("athlete {athlete} has already jumped in round {round}")]
    NotInRound { athlete: AthleteId, round: u8 },

    #[error("athlete {0} has withdrawn")]
    Withdrawn(AthleteId),

    #[error("athlete {athlete} has no attempt to undo in round {round}")]
    NothingToUndo { athlete: AthleteId, round: u8 },

    #[error("round {round} still has athletes to jump")]
    RoundInProgress { round: u8 },

    #[error("no athlete is eligible to jump")]
    EmptyActivePool,

    #[error("an event needs between 1 and {MAX_ROUNDS} rounds")]
    InvalidRounds,

    #[error("invalid attempt log: {0}")]
    InvalidLog(String),
}

/// Most rounds an event may have; the round after the last must fit a `u8`.
pub const MAX_ROUNDS: u8 = u8::MAX - 1;

/// One attempt in a horizontal event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "cm", rename_all = "snake_case")]
pub enum HorizontalAttempt {
    /// Valid attempt measured in centimetres.
    Mark(u32),
    Foul,
    Pass,
}

impl HorizontalAttempt {
    pub fn mark(self) -> Option<u32> {
        match self {
            Self::Mark(cm) => Some(cm),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HorizontalEntry {
    pub id: AthleteId,
    pub name: String,
    pub entry_index: usize,
    attempts: Vec<HorizontalAttempt>,
    withdrawn: bool,
}

impl HorizontalEntry {
    pub fn attempts(&self) -> &[HorizontalAttempt] {
        &self.attempts
    }

    pub fn is_withdrawn(&self) -> bool {
        self.withdrawn
    }

    pub fn best_mark(&self) -> Option<u32> {
        self.attempts.iter().filter_map(|a| a.mark()).max()
    }

    /// Valid marks, longest first.
    pub fn marks_desc(&self) -> Vec<u32> {
        let mut marks: Vec<u32> = self.attempts.iter().filter_map(|a| a.mark()).collect();
        marks.sort_unstable_by(|a, b| b.cmp(a));
        marks
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HorizontalStanding {
    pub place: Option<u32>,
    pub athlete: AthleteId,
    pub name: String,
    pub best_mark: Option<u32>,
    pub classification: Classification,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HorizontalEvent {
    event_id: EventId,
    rounds: u8,
    /// 1-based; `rounds + 1` once the final round has closed.
    current_round: u8,
    entries: Vec<HorizontalEntry>,
    last_acted: Option<AthleteId>,
}

impl HorizontalEvent {
    pub fn new(roster: &Roster, rounds: u8) -> Result<Self, HorizontalError> {
        if rounds == 0 || rounds > MAX_ROUNDS {
            return Err(HorizontalError::InvalidRounds);
        }
        let entries = roster
            .athletes
            .iter()
            .enumerate()
            .map(|(i, e)| HorizontalEntry {
                id: e.id.clone(),
                name: e.name.clone(),
                entry_index: i,
                attempts: Vec::new(),
                withdrawn: false,
            })
            .collect();
        Ok(Self {
            event_id: roster.event_id.clone(),
            rounds,
            current_round: 1,
            entries,
            last_acted: None,
        })
    }

    pub fn event_id(&self) -> &EventId {
        &self.event_id
    }

    pub fn rounds(&self) -> u8 {
        self.rounds
    }

    pub fn current_round(&self) -> u8 {
        self.current_round
    }

    pub fn is_complete(&self) -> bool {
        self.current_round > self.rounds
    }

    pub fn entries(&self) -> &[HorizontalEntry] {
        &self.entries
    }

    pub fn entry(&self, id: &AthleteId) -> Option<&HorizontalEntry> {
        self.entries.iter().find(|e| &e.id == id)
    }

    pub fn last_acted(&self) -> Option<&AthleteId> {
        self.last_acted.as_ref()
    }

    /// Athletes who still owe an attempt in the current round.
    pub fn active_pool(&self) -> Vec<&HorizontalEntry> {
        if self.is_complete() {
            return Vec::new();
        }
        let round = usize::from(self.current_round);
        self.entries
            .iter()
            .filter(|e| !e.withdrawn && e.attempts.len() < round)
            .collect()
    }

    /// Same selection rule as the vertical scheduler: fewest attempts first,
    /// then the first in competition order after `last_acted`.
    pub fn next_athlete(
        &self,
        last_acted: Option<&AthleteId>,
    ) -> Result<AthleteId, HorizontalError> {
        let pool = self.active_pool();
        let fewest = pool
            .iter()
            .map(|e| e.attempts.len())
            .min()
            .ok_or(HorizontalError::EmptyActivePool)?;
        let round: Vec<&HorizontalEntry> = pool
            .into_iter()
            .filter(|e| e.attempts.len() == fewest)
            .collect();
        let after = last_acted
            .and_then(|id| self.entry(id))
            .map(|e| e.entry_index);
        let chosen = after
            .and_then(|pos| round.iter().find(|e| e.entry_index > pos))
            .or_else(|| round.first())
            .ok_or(HorizontalError::EmptyActivePool)?;
        Ok(chosen.id.clone())
    }

    /// Record the athlete's attempt for the current round; returns the round.
    pub fn record(
        &mut self,
        athlete: &AthleteId,
        attempt: HorizontalAttempt,
    ) -> Result<u8, HorizontalError> {
        let idx = self.index_of(athlete)?;
        let entry = &self.entries[idx];
        if entry.attempts.len() >= usize::from(self.rounds) {
            return Err(HorizontalError::RoundsExhausted {
                athlete: athlete.clone(),
                rounds: self.rounds,
            });
        }
        if entry.withdrawn {
            return Err(HorizontalError::Withdrawn(athlete.clone()));
        }
        if entry.attempts.len() >= usize::from(self.current_round) {
            return Err(HorizontalError::NotInRound {
                athlete: athlete.clone(),
                round: self.current_round,
            });
        }

        self.entries[idx].attempts.push(attempt);
        let round = self.entries[idx].attempts.len() as u8;
        self.last_acted = Some(athlete.clone());
        debug!(event = %self.event_id, %athlete, round, ?attempt, "horizontal attempt recorded");
        Ok(round)
    }

    /// Remove the athlete's attempt in the current round.
    pub fn undo_last(
        &mut self,
        athlete: &AthleteId,
    ) -> Result<HorizontalAttempt, HorizontalError> {
        let idx = self.index_of(athlete)?;
        let round = self.current_round;
        let entry = &mut self.entries[idx];
        if entry.withdrawn {
            return Err(HorizontalError::Withdrawn(athlete.clone()));
        }
        if entry.attempts.len() != usize::from(round) {
            return Err(HorizontalError::NothingToUndo {
                athlete: athlete.clone(),
                round,
            });
        }
        let attempt = entry
            .attempts
            .pop()
            .ok_or_else(|| HorizontalError::NothingToUndo {
                athlete: athlete.clone(),
                round,
            })?;
        debug!(event = %self.event_id, %athlete, round, "horizontal attempt undone");
        Ok(attempt)
    }

    /// Take the athlete out of every remaining round.
    ///
    /// Returns the round that carries the withdrawal marker: the one after the
    /// athlete's last attempt.
    pub fn withdraw(&mut self, athlete: &AthleteId) -> Result<u8, HorizontalError> {
        let idx = self.index_of(athlete)?;
        let entry = &self.entries[idx];
        if entry.withdrawn {
            return Err(HorizontalError::Withdrawn(athlete.clone()));
        }
        if entry.attempts.len() >= usize::from(self.rounds) {
            return Err(HorizontalError::RoundsExhausted {
                athlete: athlete.clone(),
                rounds: self.rounds,
            });
        }
        let entry = &mut self.entries[idx];
        entry.withdrawn = true;
        let round = entry.attempts.len() as u8 + 1;
        info!(event = %self.event_id, %athlete, round, "athlete withdrawn");
        Ok(round)
    }

    /// Close the current round once its pool is empty.
    ///
    /// Returns the new round, or `None` when the final round has closed.
    pub fn close_round(&mut self) -> Result<Option<u8>, HorizontalError> {
        if self.is_complete() {
            return Ok(None);
        }
        if !self.active_pool().is_empty() {
            return Err(HorizontalError::RoundInProgress {
                round: self.current_round,
            });
        }
        self.current_round += 1;
        self.last_acted = None;
        info!(event = %self.event_id, round = self.current_round, "round closed");
        Ok((!self.is_complete()).then_some(self.current_round))
    }

    /// Places by best mark, then by the next-best marks in turn.
    pub fn rank(&self) -> Vec<HorizontalStanding> {
        let mut ranked: Vec<(&HorizontalEntry, Vec<u32>)> = Vec::new();
        let mut no_mark = Vec::new();
        let mut dns = Vec::new();
        for entry in &self.entries {
            let marks = entry.marks_desc();
            if !marks.is_empty() {
                ranked.push((entry, marks));
            } else if !entry.attempts.is_empty() {
                no_mark.push(entry);
            } else {
                dns.push(entry);
            }
        }
        ranked.sort_by_key(|(_, marks)| Reverse(marks.clone()));

        let mut out = Vec::with_capacity(self.entries.len());
        let mut place = 0u32;
        let mut previous: Option<&Vec<u32>> = None;
        for (i, (entry, marks)) in ranked.iter().enumerate() {
            if previous != Some(marks) {
                place = i as u32 + 1;
                previous = Some(marks);
            }
            out.push(HorizontalStanding {
                place: Some(place),
                athlete: entry.id.clone(),
                name: entry.name.clone(),
                best_mark: marks.first().copied(),
                classification: Classification::Ranked,
            });
        }
        for (entry, classification) in no_mark
            .into_iter()
            .map(|e| (e, Classification::NoMark))
            .chain(dns.into_iter().map(|e| (e, Classification::DidNotStart)))
        {
            out.push(HorizontalStanding {
                place: None,
                athlete: entry.id.clone(),
                name: entry.name.clone(),
                best_mark: None,
                classification,
            });
        }
        out
    }

    /// Rebuild from persisted rows, withdrawal markers included.
    ///
    /// The current round is the lowest one that some athlete still in the
    /// event has not jumped yet.
    pub fn rehydrate(
        roster: &Roster,
        rounds: u8,
        rows: &[AttemptRow],
    ) -> Result<Self, HorizontalError> {
        let mut event = Self::new(roster, rounds)?;
        let mut grouped: BTreeMap<usize, BTreeMap<u8, HorizontalAttempt>> = BTreeMap::new();
        let mut withdrawals: BTreeMap<usize, u8> = BTreeMap::new();
        for row in rows {
            if row.key.event_id != event.event_id {
                continue;
            }
            let idx = event.index_of(&row.key.athlete_id)?;
            match (row.key.slot, row.outcome) {
                (AttemptSlot::Round(round), RecordedOutcome::Horizontal(attempt)) => {
                    grouped.entry(idx).or_default().insert(round, attempt);
                }
                (AttemptSlot::Round(round), RecordedOutcome::Withdrawn) => {
                    withdrawals.insert(idx, round);
                }
                _ => {
                    return Err(HorizontalError::InvalidLog(format!(
                        "non-horizontal row for athlete {}",
                        row.key.athlete_id
                    )))
                }
            }
        }
        for (idx, by_round) in grouped {
            let contiguous = by_round.keys().copied().eq(1..=by_round.len() as u8);
            if !contiguous || by_round.len() > usize::from(rounds) {
                return Err(HorizontalError::InvalidLog(format!(
                    "athlete {} has gaps or extra rounds",
                    event.entries[idx].id
                )));
            }
            event.entries[idx].attempts = by_round.into_values().collect();
        }
        for (idx, round) in withdrawals {
            let entry = &mut event.entries[idx];
            if usize::from(round) != entry.attempts.len() + 1 {
                return Err(HorizontalError::InvalidLog(format!(
                    "athlete {} withdrew in round {round} after {} attempts",
                    entry.id,
                    entry.attempts.len()
                )));
            }
            entry.withdrawn = true;
        }

        let still_in = event
            .entries
            .iter()
            .filter(|e| !e.withdrawn)
            .map(|e| e.attempts.len())
            .min();
        let lowest = still_in
            .or_else(|| event.entries.iter().map(|e| e.attempts.len()).max())
            .unwrap_or(0);
        let next = (lowest + 1).min(usize::from(rounds) + 1);
        event.current_round = u8::try_from(next).unwrap_or(u8::MAX);
        info!(
            event = %event.event_id,
            rows = rows.len(),
            round = event.current_round,
            "horizontal event rehydrated"
        );
        Ok(event)
    }

    fn index_of(&self, id: &AthleteId) -> Result<usize, HorizontalError> {
        self.entries
            .iter()
            .position(|e| &e.id == id)
            .ok_or_else(|| HorizontalError::UnknownAthlete(id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{AttemptStore, InMemoryAttemptStore, WriteSet};
    use HorizontalAttempt::*;

    fn event(ids: &[&str], rounds: u8) -> HorizontalEvent {
        let roster = Roster::from_ids(EventId::from("sp"), ids.iter().copied()).unwrap();
        HorizontalEvent::new(&roster, rounds).unwrap()
    }

    fn id(s: &str) -> AthleteId {
        AthleteId::from(s)
    }

    #[test]
    fn round_count_bounds() {
        let roster = Roster::from_ids(EventId::from("sp"), ["a"]).unwrap();
        assert_eq!(
            HorizontalEvent::new(&roster, 0).unwrap_err(),
            HorizontalError::InvalidRounds
        );
        assert_eq!(
            HorizontalEvent::new(&roster, u8::MAX).unwrap_err(),
            HorizontalError::InvalidRounds
        );
        assert!(HorizontalEvent::new(&roster, MAX_ROUNDS).is_ok());
    }

    #[test]
    fn round_robin_in_entry_order() {
        let mut e = event(&["a", "b", "c"], 3);
        assert_eq!(e.next_athlete(None).unwrap(), id("a"));
        e.record(&id("a"), Mark(1200)).unwrap();
        assert_eq!(e.next_athlete(e.last_acted()).unwrap(), id("b"));
        e.record(&id("b"), Foul).unwrap();
        e.record(&id("c"), Pass).unwrap();
        assert_eq!(e.next_athlete(e.last_acted()), Err(HorizontalError::EmptyActivePool));
    }

    #[test]
    fn one_attempt_per_round() {
        let mut e = event(&["a", "b"], 3);
        e.record(&id("a"), Mark(1000)).unwrap();
        assert_eq!(
            e.record(&id("a"), Mark(1100)).unwrap_err(),
            HorizontalError::NotInRound {
                athlete: id("a"),
                round: 1
            }
        );
    }

    #[test]
    fn round_closes_only_when_empty() {
        let mut e = event(&["a", "b"], 2);
        e.record(&id("a"), Mark(1000)).unwrap();
        assert_eq!(
            e.close_round().unwrap_err(),
            HorizontalError::RoundInProgress { round: 1 }
        );
        e.record(&id("b"), Mark(900)).unwrap();
        assert_eq!(e.close_round().unwrap(), Some(2));
        assert_eq!(e.last_acted(), None);
        e.record(&id("a"), Foul).unwrap();
        e.record(&id("b"), Foul).unwrap();
        assert_eq!(e.close_round().unwrap(), None);
        assert!(e.is_complete());
        assert!(e.active_pool().is_empty());
        assert_eq!(
            e.record(&id("a"), Mark(1)).unwrap_err(),
            HorizontalError::RoundsExhausted {
                athlete: id("a"),
                rounds: 2
            }
        );
    }

    #[test]
    fn withdrawn_athlete_leaves_pool() {
        let mut e = event(&["a", "b"], 3);
        e.withdraw(&id("b")).unwrap();
        e.record(&id("a"), Mark(800)).unwrap();
        assert!(e.active_pool().is_empty());
        assert_eq!(e.record(&id("b"), Foul).unwrap_err(), HorizontalError::Withdrawn(id("b")));
    }

    #[test]
    fn undo_only_in_current_round() {
        let mut e = event(&["a"], 3);
        assert!(matches!(e.undo_last(&id("a")), Err(HorizontalError::NothingToUndo { .. })));
        e.record(&id("a"), Mark(700)).unwrap();
        e.close_round().unwrap();
        assert!(matches!(e.undo_last(&id("a")), Err(HorizontalError::NothingToUndo { .. })));
        e.record(&id("a"), Foul).unwrap();
        assert_eq!(e.undo_last(&id("a")).unwrap(), Foul);
    }

    #[test]
    fn ranking_uses_next_best_marks() {
        let mut e = event(&["a", "b", "c", "d", "e"], 2);
        e.record(&id("a"), Mark(1500)).unwrap();
        e.record(&id("b"), Mark(1500)).unwrap();
        e.record(&id("c"), Mark(1400)).unwrap();
        e.record(&id("d"), Foul).unwrap();
        e.record(&id("e"), Pass).unwrap();
        e.close_round().unwrap();
        e.record(&id("a"), Mark(1300)).unwrap();
        e.record(&id("b"), Mark(1450)).unwrap();
        e.record(&id("c"), Foul).unwrap();
        e.record(&id("d"), Foul).unwrap();
        e.record(&id("e"), Pass).unwrap();

        let standings = e.rank();
        let summary: Vec<_> = standings
            .iter()
            .map(|s| (s.athlete.as_str(), s.place, s.classification))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("b", Some(1), Classification::Ranked),
                ("a", Some(2), Classification::Ranked),
                ("c", Some(3), Classification::Ranked),
                ("d", None, Classification::NoMark),
                ("e", None, Classification::NoMark),
            ]
        );
    }

    #[test]
    fn identical_series_share_place() {
        let mut e = event(&["a", "b", "c"], 1);
        e.record(&id("a"), Mark(1000)).unwrap();
        e.record(&id("b"), Mark(1000)).unwrap();
        e.record(&id("c"), Mark(900)).unwrap();
        let places: Vec<_> = e.rank().iter().map(|s| s.place).collect();
        assert_eq!(places, vec![Some(1), Some(1), Some(3)]);
    }

    #[test]
    fn rehydrates_rounds() {
        use crate::persistence::AttemptKey;
        let mut e = event(&["a", "b"], 3);
        let mut store = InMemoryAttemptStore::new();
        for (who, attempt) in [("a", Mark(1000)), ("b", Foul)] {
            let round = e.record(&id(who), attempt).unwrap();
            WriteSet::for_round(e.event_id(), &id(who), round, Some(attempt))
                .apply_to(&mut store)
                .unwrap();
        }
        e.close_round().unwrap();
        e.record(&id("a"), Mark(1100)).unwrap();
        WriteSet::for_round(e.event_id(), &id("a"), 2, Some(Mark(1100)))
            .apply_to(&mut store)
            .unwrap();

        let rows = store.load_attempts(e.event_id()).unwrap();
        let roster = Roster::from_ids(EventId::from("sp"), ["a", "b"]).unwrap();
        let back = HorizontalEvent::rehydrate(&roster, 3, &rows).unwrap();
        assert_eq!(back.current_round(), 2);
        assert_eq!(back.entry(&id("a")).unwrap().attempts(), &[Mark(1000), Mark(1100)]);
        assert_eq!(back.next_athlete(None).unwrap(), id("b"));

        let bad = vec![AttemptRow {
            key: AttemptKey {
                event_id: EventId::from("sp"),
                athlete_id: id("a"),
                slot: AttemptSlot::Round(2),
                attempt_number: 1,
            },
            outcome: RecordedOutcome::Horizontal(Foul),
        }];
        assert!(matches!(
            HorizontalEvent::rehydrate(&roster, 3, &bad),
            Err(HorizontalError::InvalidLog(_))
        ));
    }

    fn rows_of(e: &HorizontalEvent, writes: &[WriteSet]) -> Vec<AttemptRow> {
        let mut store = InMemoryAttemptStore::new();
        for w in writes {
            w.apply_to(&mut store).unwrap();
        }
        store.load_attempts(e.event_id()).unwrap()
    }

    #[test]
    fn withdrawal_survives_rehydrate() {
        let mut e = event(&["a", "b", "c"], 3);
        let mut writes = Vec::new();
        for who in ["a", "b", "c"] {
            let round = e.record(&id(who), Mark(900)).unwrap();
            writes.push(WriteSet::for_round(e.event_id(), &id(who), round, Some(Mark(900))));
        }
        e.close_round().unwrap();
        let marker = e.withdraw(&id("b")).unwrap();
        assert_eq!(marker, 2);
        writes.push(WriteSet::withdrawal(e.event_id(), &id("b"), marker));
        for who in ["a", "c"] {
            let round = e.record(&id(who), Foul).unwrap();
            writes.push(WriteSet::for_round(e.event_id(), &id(who), round, Some(Foul)));
        }
        assert_eq!(e.close_round().unwrap(), Some(3));

        let roster = Roster::from_ids(EventId::from("sp"), ["a", "b", "c"]).unwrap();
        let back = HorizontalEvent::rehydrate(&roster, 3, &rows_of(&e, &writes)).unwrap();
        assert_eq!(back.current_round(), 3);
        assert!(back.entry(&id("b")).unwrap().is_withdrawn());
        assert_eq!(back.entry(&id("b")).unwrap().attempts(), &[Mark(900)]);
        assert_eq!(back.next_athlete(None).unwrap(), id("a"));
    }

    #[test]
    fn withdrawn_athlete_cannot_undo() {
        let mut e = event(&["a", "b"], 3);
        e.record(&id("a"), Mark(900)).unwrap();
        e.withdraw(&id("a")).unwrap();
        assert_eq!(e.undo_last(&id("a")).unwrap_err(), HorizontalError::Withdrawn(id("a")));
        assert_eq!(e.entry(&id("a")).unwrap().attempts(), &[Mark(900)]);
    }

    #[test]
    fn withdrawal_before_any_attempt_is_dns() {
        let mut e = event(&["a", "b"], 1);
        assert_eq!(e.withdraw(&id("b")).unwrap(), 1);
        e.record(&id("a"), Foul).unwrap();
        assert_eq!(e.close_round().unwrap(), None);
        let standings = e.rank();
        assert_eq!(standings[0].classification, Classification::NoMark);
        assert_eq!(standings[1].classification, Classification::DidNotStart);
        assert_eq!(
            e.withdraw(&id("a")).unwrap_err(),
            HorizontalError::RoundsExhausted {
                athlete: id("a"),
                rounds: 1
            }
        );
    }

    #[test]
    fn misplaced_withdrawal_marker_is_rejected() {
        let e = event(&["a"], 3);
        let writes = [
            WriteSet::for_round(e.event_id(), &id("a"), 1, Some(Mark(700))),
            WriteSet::withdrawal(e.event_id(), &id("a"), 3),
        ];
        let roster = Roster::from_ids(EventId::from("sp"), ["a"]).unwrap();
        assert!(matches!(
            HorizontalEvent::rehydrate(&roster, 3, &rows_of(&e, &writes)),
            Err(HorizontalError::InvalidLog(_))
        ));
    }

    #[test]
    fn every_round_done_at_max_rounds() {
        let e = event(&["a"], MAX_ROUNDS);
        let writes: Vec<WriteSet> = (1..=MAX_ROUNDS)
            .map(|round| WriteSet::for_round(e.event_id(), &id("a"), round, Some(Foul)))
            .collect();
        let roster = Roster::from_ids(EventId::from("sp"), ["a"]).unwrap();
        let back = HorizontalEvent::rehydrate(&roster, MAX_ROUNDS, &rows_of(&e, &writes)).unwrap();
        assert_eq!(back.current_round(), u8::MAX);
        assert!(back.is_complete());
    }
}
