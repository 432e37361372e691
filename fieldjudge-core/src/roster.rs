//! Roster: the fixed competition order supplied before an event starts.
//!
//! The order is authoritative: round-robin ties are broken by it. Rosters can
//! be written as TOML:
//!
//! ```toml
//! event_id = "hj-women"
//!
//! [[athletes]]
//! id = "117"
//! name = "A. Example"
//! ```

use crate::domain::{AthleteId, EventId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("read roster file: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse roster TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("athlete {0} appears twice in the roster")]
    DuplicateAthlete(AthleteId),

    #[error("roster for {0} is empty")]
    Empty(EventId),

    #[error("no roster for event {0}")]
    UnknownEvent(EventId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub id: AthleteId,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    pub event_id: EventId,
    pub athletes: Vec<RosterEntry>,
}

impl Roster {
    /// Build a roster, rejecting empty lists and duplicate ids.
    pub fn new(event_id: EventId, athletes: Vec<RosterEntry>) -> Result<Self, RosterError> {
        let roster = Self { event_id, athletes };
        roster.validate()?;
        Ok(roster)
    }

    /// Roster from bare ids, names defaulting to the id.
    pub fn from_ids<I, S>(event_id: EventId, ids: I) -> Result<Self, RosterError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let athletes = ids
            .into_iter()
            .map(|s| {
                let id: String = s.into();
                RosterEntry {
                    name: id.clone(),
                    id: AthleteId(id),
                }
            })
            .collect();
        Self::new(event_id, athletes)
    }

    pub fn from_file(path: &Path) -> Result<Self, RosterError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, RosterError> {
        let roster: Self = toml::from_str(content)?;
        roster.validate()?;
        Ok(roster)
    }

    pub fn len(&self) -> usize {
        self.athletes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.athletes.is_empty()
    }

    fn validate(&self) -> Result<(), RosterError> {
        if self.athletes.is_empty() {
            return Err(RosterError::Empty(self.event_id.clone()));
        }
        let mut seen = HashSet::new();
        for entry in &self.athletes {
            if !seen.insert(&entry.id) {
                return Err(RosterError::DuplicateAthlete(entry.id.clone()));
            }
        }
        Ok(())
    }
}

/// Supplies the ordered participant list for an event.
pub trait RosterProvider {
    fn load_roster(&self, event_id: &EventId) -> Result<Roster, RosterError>;
}

/// A provider holding rosters already in memory.
impl RosterProvider for Vec<Roster> {
    fn load_roster(&self, event_id: &EventId) -> Result<Roster, RosterError> {
        self.iter()
            .find(|r| &r.event_id == event_id)
            .cloned()
            .ok_or_else(|| RosterError::UnknownEvent(event_id.clone()))
    }
}
