//! Officiating sessions: the engine plus its persistence collaborator.
//!
//! A command is applied to the in-memory state first. The writes it implies
//! are then queued and tried once; a failed save never rolls the state back.
//! It stays queued as a dirty entry and is reported through
//! [`Applied::save_error`] so the shell can alert and later call
//! [`OfficiatingSession::flush_dirty`]. Saves are full upserts of one athlete
//! at one height (or round), so retries in any order converge.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use fieldjudge_core::domain::{AthleteId, EventId, Height};
use fieldjudge_core::engine::{
    decide, Command, CompetitionState, EngineError, EngineEvent, Progress, VerticalConfig,
};
use fieldjudge_core::horizontal::{
    HorizontalAttempt, HorizontalError, HorizontalEvent, HorizontalStanding,
};
use fieldjudge_core::persistence::{AttemptStore, SaveError, WriteSet};
use fieldjudge_core::roster::{Roster, RosterError, RosterProvider};
use fieldjudge_core::standings::{rank, Standing};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, Discipline, SessionConfig};
use crate::store::JsonlAttemptStore;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Horizontal(#[from] HorizontalError),

    #[error(transparent)]
    Roster(#[from] RosterError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A save the store will never accept.
    #[error(transparent)]
    Save(#[from] SaveError),

    #[error("{pending} writes still unsaved after {attempts} attempts each: {last}")]
    SaveExhausted {
        pending: usize,
        attempts: u32,
        last: SaveError,
    },
}

/// A queued write, identified by what it mirrors.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PendingWrite {
    Height { athlete: AthleteId, height: Height },
    Round { athlete: AthleteId, round: u8 },
    Bar,
}

impl fmt::Display for PendingWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Height { athlete, height } => write!(f, "{athlete}@{height}"),
            Self::Round { athlete, round } => write!(f, "{athlete}#R{round}"),
            Self::Bar => write!(f, "bar"),
        }
    }
}

/// Result of an accepted command.
#[derive(Debug, Clone, PartialEq)]
pub struct Applied<E> {
    pub events: Vec<E>,
    /// Set when at least one write failed and is now dirty.
    pub save_error: Option<SaveError>,
}

/// Try each dirty write once; successes leave the set.
fn save_once<F>(dirty: &mut BTreeSet<PendingWrite>, mut write: F) -> Option<SaveError>
where
    F: FnMut(&PendingWrite) -> Result<(), SaveError>,
{
    let mut failed = None;
    let pending: Vec<PendingWrite> = dirty.iter().cloned().collect();
    for entry in pending {
        match write(&entry) {
            Ok(()) => {
                dirty.remove(&entry);
            }
            Err(e) => {
                warn!(
                    write = %entry,
                    error = %e,
                    retryable = e.retryable,
                    "save failed, entry left dirty"
                );
                failed = Some(e);
            }
        }
    }
    failed
}

/// Retry every dirty write up to `max_retries` times.
fn flush<F>(
    dirty: &mut BTreeSet<PendingWrite>,
    max_retries: u32,
    mut write: F,
) -> Result<usize, SessionError>
where
    F: FnMut(&PendingWrite) -> Result<(), SaveError>,
{
    let attempts = max_retries.max(1);
    let mut flushed = 0;
    let mut last = None;
    let pending: Vec<PendingWrite> = dirty.iter().cloned().collect();
    for entry in pending {
        for attempt in 1..=attempts {
            match write(&entry) {
                Ok(()) => {
                    dirty.remove(&entry);
                    flushed += 1;
                    break;
                }
                Err(e) if e.retryable => {
                    warn!(write = %entry, attempt, error = %e, "retrying save");
                    last = Some(e);
                }
                Err(e) => return Err(SessionError::Save(e)),
            }
        }
    }
    match last {
        Some(last) if !dirty.is_empty() => Err(SessionError::SaveExhausted {
            pending: dirty.len(),
            attempts,
            last,
        }),
        _ => {
            debug!(flushed, "dirty writes flushed");
            Ok(flushed)
        }
    }
}

// ── Vertical ─────────────────────────────────────────────────────────

/// One vertical event being officiated.
#[derive(Debug)]
pub struct OfficiatingSession<S> {
    state: CompetitionState,
    store: S,
    dirty: BTreeSet<PendingWrite>,
    max_retries: u32,
}

impl<S: AttemptStore> OfficiatingSession<S> {
    /// Fresh event with an empty log.
    pub fn new(
        roster: &Roster,
        config: VerticalConfig,
        store: S,
        max_retries: u32,
    ) -> Result<Self, SessionError> {
        Ok(Self {
            state: CompetitionState::new(roster, config)?,
            store,
            dirty: BTreeSet::new(),
            max_retries,
        })
    }

    /// Rebuild the event from whatever the store holds.
    pub fn resume(
        roster: &Roster,
        config: VerticalConfig,
        store: S,
        max_retries: u32,
    ) -> Result<Self, SessionError> {
        let rows = store.load_attempts(&roster.event_id)?;
        let mut state = CompetitionState::rehydrate(roster, config, &rows)?;
        if let Some(bar) = store.load_bar(&roster.event_id)? {
            if bar != state.current_height() {
                state.jump_to(bar, true)?;
            }
        }
        info!(
            event = %roster.event_id,
            rows = rows.len(),
            height = %state.current_height(),
            "session resumed"
        );
        Ok(Self {
            state,
            store,
            dirty: BTreeSet::new(),
            max_retries,
        })
    }

    pub fn state(&self) -> &CompetitionState {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn pending_writes(&self) -> impl Iterator<Item = &PendingWrite> {
        self.dirty.iter()
    }

    pub fn is_clean(&self) -> bool {
        self.dirty.is_empty()
    }

    /// Apply a command, then try to save what it touched.
    ///
    /// Engine rejections are errors and leave everything unchanged. Save
    /// failures are not: the state has moved on and the write is dirty.
    pub fn apply(&mut self, command: Command) -> Result<Applied<EngineEvent>, SessionError> {
        let events = self.state.apply(command)?;
        self.dirty.extend(writes_for(&events));
        let state = &self.state;
        let store = &mut self.store;
        let save_error = save_once(&mut self.dirty, |w| write_vertical(state, store, w));
        Ok(Applied { events, save_error })
    }

    /// Retry dirty writes; returns how many were saved.
    pub fn flush_dirty(&mut self) -> Result<usize, SessionError> {
        let state = &self.state;
        let store = &mut self.store;
        flush(&mut self.dirty, self.max_retries, |w| write_vertical(state, store, w))
    }

    pub fn next(&self) -> Progress {
        decide(&self.state)
    }

    pub fn standings(&self) -> Vec<Standing> {
        rank(&self.state)
    }
}

fn writes_for(events: &[EngineEvent]) -> Vec<PendingWrite> {
    events
        .iter()
        .filter_map(|event| match event {
            EngineEvent::AttemptRecorded { athlete, height, .. }
            | EngineEvent::AttemptUndone { athlete, height, .. } => Some(PendingWrite::Height {
                athlete: athlete.clone(),
                height: *height,
            }),
            EngineEvent::AthleteRetired {
                athlete,
                height: Some(height),
                ..
            } => Some(PendingWrite::Height {
                athlete: athlete.clone(),
                height: *height,
            }),
            EngineEvent::HeightChanged { .. } => Some(PendingWrite::Bar),
            _ => None,
        })
        .collect()
}

fn write_vertical<S: AttemptStore>(
    state: &CompetitionState,
    store: &mut S,
    write: &PendingWrite,
) -> Result<(), SaveError> {
    match write {
        PendingWrite::Height { athlete, height } => match state.athlete(athlete) {
            Some(a) => WriteSet::for_height(state.event_id(), a, *height).apply_to(store),
            None => Ok(()),
        },
        PendingWrite::Bar => store.save_bar(state.event_id(), state.current_height()),
        PendingWrite::Round { .. } => Ok(()),
    }
}

// ── Horizontal ───────────────────────────────────────────────────────

/// One horizontal event being officiated.
#[derive(Debug)]
pub struct HorizontalSession<S> {
    event: HorizontalEvent,
    store: S,
    dirty: BTreeSet<PendingWrite>,
    max_retries: u32,
}

impl<S: AttemptStore> HorizontalSession<S> {
    pub fn new(
        roster: &Roster,
        rounds: u8,
        store: S,
        max_retries: u32,
    ) -> Result<Self, SessionError> {
        Ok(Self {
            event: HorizontalEvent::new(roster, rounds)?,
            store,
            dirty: BTreeSet::new(),
            max_retries,
        })
    }

    pub fn resume(
        roster: &Roster,
        rounds: u8,
        store: S,
        max_retries: u32,
    ) -> Result<Self, SessionError> {
        let rows = store.load_attempts(&roster.event_id)?;
        let event = HorizontalEvent::rehydrate(roster, rounds, &rows)?;
        info!(
            event = %roster.event_id,
            rows = rows.len(),
            round = event.current_round(),
            "session resumed"
        );
        Ok(Self {
            event,
            store,
            dirty: BTreeSet::new(),
            max_retries,
        })
    }

    pub fn event(&self) -> &HorizontalEvent {
        &self.event
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn is_clean(&self) -> bool {
        self.dirty.is_empty()
    }

    /// Record an attempt; returns the round it landed in.
    pub fn record(
        &mut self,
        athlete: &AthleteId,
        attempt: HorizontalAttempt,
    ) -> Result<Applied<u8>, SessionError> {
        let round = self.event.record(athlete, attempt)?;
        Ok(self.after(athlete, round))
    }

    pub fn undo_last(&mut self, athlete: &AthleteId) -> Result<Applied<u8>, SessionError> {
        let round = self.event.current_round();
        self.event.undo_last(athlete)?;
        Ok(self.after(athlete, round))
    }

    /// Withdraw an athlete; returns the round that carries the marker.
    pub fn withdraw(&mut self, athlete: &AthleteId) -> Result<Applied<u8>, SessionError> {
        let round = self.event.withdraw(athlete)?;
        Ok(self.after(athlete, round))
    }

    pub fn close_round(&mut self) -> Result<Option<u8>, SessionError> {
        Ok(self.event.close_round()?)
    }

    pub fn flush_dirty(&mut self) -> Result<usize, SessionError> {
        let event = &self.event;
        let store = &mut self.store;
        flush(&mut self.dirty, self.max_retries, |w| write_horizontal(event, store, w))
    }

    pub fn next(&self) -> Option<AthleteId> {
        self.event.next_athlete(self.event.last_acted()).ok()
    }

    pub fn standings(&self) -> Vec<HorizontalStanding> {
        self.event.rank()
    }

    fn after(&mut self, athlete: &AthleteId, round: u8) -> Applied<u8> {
        self.dirty.insert(PendingWrite::Round {
            athlete: athlete.clone(),
            round,
        });
        let event = &self.event;
        let store = &mut self.store;
        let save_error = save_once(&mut self.dirty, |w| write_horizontal(event, store, w));
        Applied {
            events: vec![round],
            save_error,
        }
    }
}

fn write_horizontal<S: AttemptStore>(
    event: &HorizontalEvent,
    store: &mut S,
    write: &PendingWrite,
) -> Result<(), SaveError> {
    match write {
        PendingWrite::Round { athlete, round } => {
            let Some(entry) = event.entry(athlete) else {
                return Ok(());
            };
            let index = usize::from(*round).saturating_sub(1);
            let set = if entry.is_withdrawn() && index == entry.attempts().len() {
                WriteSet::withdrawal(event.event_id(), athlete, *round)
            } else {
                let attempt = entry.attempts().get(index).copied();
                WriteSet::for_round(event.event_id(), athlete, *round, attempt)
            };
            set.apply_to(store)
        }
        PendingWrite::Height { .. } | PendingWrite::Bar => Ok(()),
    }
}

// ── Opening from config ──────────────────────────────────────────────

/// Roster provider backed by one TOML file.
#[derive(Debug, Clone)]
pub struct RosterFile(pub PathBuf);

impl RosterProvider for RosterFile {
    fn load_roster(&self, event_id: &EventId) -> Result<Roster, RosterError> {
        let roster = Roster::from_file(&self.0)?;
        if &roster.event_id != event_id {
            return Err(RosterError::UnknownEvent(event_id.clone()));
        }
        Ok(roster)
    }
}

fn require(config: &SessionConfig, discipline: Discipline) -> Result<(), SessionError> {
    if config.discipline != discipline {
        return Err(ConfigError::Invalid(format!(
            "event {} is {:?}, not {:?}",
            config.event_id, config.discipline, discipline
        ))
        .into());
    }
    Ok(())
}

/// Resume a vertical event from its config, roster file, and JSONL store.
pub fn open_vertical(
    config: &SessionConfig,
) -> Result<OfficiatingSession<JsonlAttemptStore>, SessionError> {
    require(config, Discipline::Vertical)?;
    let roster = RosterFile(config.roster.clone()).load_roster(&config.event_id)?;
    OfficiatingSession::resume(
        &roster,
        config.vertical.clone(),
        JsonlAttemptStore::new(&config.store),
        config.max_retries,
    )
}

/// Resume a horizontal event from its config, roster file, and JSONL store.
pub fn open_horizontal(
    config: &SessionConfig,
) -> Result<HorizontalSession<JsonlAttemptStore>, SessionError> {
    require(config, Discipline::Horizontal)?;
    let roster = RosterFile(config.roster.clone()).load_roster(&config.event_id)?;
    HorizontalSession::resume(
        &roster,
        config.rounds,
        JsonlAttemptStore::new(&config.store),
        config.max_retries,
    )
}
