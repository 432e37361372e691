//! Per-athlete competition state.
//!
//! The raw inputs are the attempt log (`records`) and the withdrawal flag.
//! `status` and `best_height` are derived and only ever written by
//! [`crate::engine::elimination::refresh`], which recomputes them from scratch.

use super::attempt::{AttemptOutcome, HeightRecord};
use super::height::Height;
use super::ids::AthleteId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Where an athlete stands in the competition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AthleteStatus {
    /// Still has attempts to take.
    Active,
    /// Three consecutive failures after clearing at least one height.
    Eliminated,
    /// Withdrew after taking at least one jump.
    Retired,
    /// Three consecutive failures without ever clearing (NM).
    NoHeight,
    /// Withdrew without ever jumping (DNS).
    DidNotStart,
}

impl AthleteStatus {
    pub fn is_active(self) -> bool {
        self == Self::Active
    }

    /// Out on failures, with or without a mark.
    pub fn is_eliminated(self) -> bool {
        matches!(self, Self::Eliminated | Self::NoHeight)
    }
}

impl fmt::Display for AthleteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Active => "active",
            Self::Eliminated => "eliminated",
            Self::Retired => "retired",
            Self::NoHeight => "NM",
            Self::DidNotStart => "DNS",
        };
        write!(f, "{label}")
    }
}

/// One competitor in a vertical event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AthleteState {
    pub id: AthleteId,
    pub name: String,
    /// Position in the fixed competition order (0-based).
    pub entry_index: usize,
    pub(crate) records: BTreeMap<Height, HeightRecord>,
    pub(crate) withdrawn: bool,
    pub(crate) status: AthleteStatus,
    pub(crate) best_height: Option<Height>,
}

impl AthleteState {
    pub fn new(id: AthleteId, name: impl Into<String>, entry_index: usize) -> Self {
        Self {
            id,
            name: name.into(),
            entry_index,
            records: BTreeMap::new(),
            withdrawn: false,
            status: AthleteStatus::Active,
            best_height: None,
        }
    }

    pub fn status(&self) -> AthleteStatus {
        self.status
    }

    /// Highest height the athlete has cleared.
    pub fn best_height(&self) -> Option<Height> {
        self.best_height
    }

    pub fn is_withdrawn(&self) -> bool {
        self.withdrawn
    }

    pub fn record(&self, height: Height) -> Option<&HeightRecord> {
        self.records.get(&height)
    }

    /// All records in ascending height order.
    pub fn records(&self) -> impl DoubleEndedIterator<Item = (Height, &HeightRecord)> {
        self.records.iter().map(|(h, r)| (*h, r))
    }

    /// Highest height with at least one filled slot.
    pub fn latest_height(&self) -> Option<Height> {
        self.records
            .iter()
            .rev()
            .find(|(_, r)| !r.is_empty())
            .map(|(h, _)| *h)
    }

    /// Number of filled slots at `height`.
    pub fn attempts_at(&self, height: Height) -> usize {
        self.records.get(&height).map_or(0, HeightRecord::len)
    }

    /// Failures recorded directly at each height, summed over the event.
    pub fn total_failures(&self) -> u32 {
        self.records.values().map(|r| u32::from(r.failures())).sum()
    }

    /// True once any slot other than a retirement marker is filled.
    ///
    /// A pass counts: only an athlete with no attempt of any kind is DNS.
    pub fn has_attempted(&self) -> bool {
        self.records
            .values()
            .flat_map(|r| r.attempts())
            .any(|o| *o != AttemptOutcome::Retired)
    }
}
