//! Final standings for a vertical event.
//!
//! Athletes with a cleared height are placed by, in order:
//! 1. best height, higher first
//! 2. failures at the best height, fewer first
//! 3. failures over the whole competition, fewer first
//!
//! Athletes still level after all three share a place, and the next athlete
//! down is placed as if the tied ones had distinct places (1, 2, 2, 4).
//! Athletes who attempted without clearing (NM) and athletes with no attempt
//! of any kind (DNS) follow unplaced, each group in competition order. A pass
//! is an attempt.

use crate::domain::{AthleteId, AthleteState, AthleteStatus, Height};
use crate::engine::CompetitionState;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Ranked,
    NoMark,
    DidNotStart,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    /// `None` for NM and DNS.
    pub place: Option<u32>,
    pub athlete: AthleteId,
    pub name: String,
    pub best_height: Option<Height>,
    pub failures_at_best: u8,
    pub total_failures: u32,
    pub status: AthleteStatus,
    pub classification: Classification,
    /// Scoresheet per contested height, e.g. `(120, "XO")`.
    pub scoresheet: Vec<(Height, String)>,
}

pub fn rank(state: &CompetitionState) -> Vec<Standing> {
    rank_athletes(state.athletes())
}

pub fn rank_athletes(athletes: &[AthleteState]) -> Vec<Standing> {
    let mut ranked = Vec::new();
    let mut no_mark = Vec::new();
    let mut dns = Vec::new();

    let mut ordered: Vec<&AthleteState> = athletes.iter().collect();
    ordered.sort_by_key(|a| a.entry_index);

    for athlete in ordered {
        let standing = standing_for(athlete);
        match standing.classification {
            Classification::Ranked => ranked.push(standing),
            Classification::NoMark => no_mark.push(standing),
            Classification::DidNotStart => dns.push(standing),
        }
    }

    // Stable sort keeps competition order inside a tie.
    ranked.sort_by_key(sort_key);

    let mut place = 0u32;
    let mut previous: Option<(Reverse<Option<Height>>, u8, u32)> = None;
    for (i, standing) in ranked.iter_mut().enumerate() {
        let key = sort_key(standing);
        if previous != Some(key) {
            place = i as u32 + 1;
            previous = Some(key);
        }
        standing.place = Some(place);
    }

    ranked.extend(no_mark);
    ranked.extend(dns);
    ranked
}

fn sort_key(s: &Standing) -> (Reverse<Option<Height>>, u8, u32) {
    (Reverse(s.best_height), s.failures_at_best, s.total_failures)
}

fn standing_for(athlete: &AthleteState) -> Standing {
    let best_height = athlete.best_height();
    let classification = match best_height {
        Some(_) => Classification::Ranked,
        None if athlete.has_attempted() => Classification::NoMark,
        None => Classification::DidNotStart,
    };
    Standing {
        place: None,
        athlete: athlete.id.clone(),
        name: athlete.name.clone(),
        best_height,
        failures_at_best: best_height
            .and_then(|h| athlete.record(h))
            .map_or(0, |r| r.failures()),
        total_failures: athlete.total_failures(),
        status: athlete.status(),
        classification,
        scoresheet: athlete
            .records()
            .map(|(h, r)| (h, r.to_string()))
            .collect(),
    }
}
