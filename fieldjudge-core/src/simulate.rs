//! Seeded simulation of a full vertical competition.
//!
//! Each athlete gets an ability height drawn from their own RNG stream. Sub-seeds
//! come from BLAKE3 over `(master seed, athlete id)`, so adding an athlete to the
//! roster does not change how the others jump.

use crate::domain::{AthleteId, AttemptOutcome, EventId, Height};
use crate::engine::{decide, CompetitionState, EngineError, Progress, VerticalConfig};
use crate::roster::{Roster, RosterEntry, RosterError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Roster(#[from] RosterError),
    #[error("simulation did not finish within {0} steps")]
    StepLimit(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub seed: u64,
    pub athletes: usize,
    pub vertical: VerticalConfig,
    /// Ability heights are drawn from `start + [0, spread]` centimetres.
    pub spread: u32,
    /// Chance that an athlete who has cleared something passes a fresh height.
    pub pass_rate: f64,
    /// Chance per call that an athlete withdraws instead of jumping.
    pub retire_rate: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            athletes: 12,
            vertical: VerticalConfig::default(),
            spread: 60,
            pass_rate: 0.1,
            retire_rate: 0.005,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub state: CompetitionState,
    /// Commands accepted by the engine, including bar raises.
    pub steps: usize,
}

/// Deterministic per-athlete seed.
pub fn athlete_seed(master_seed: u64, athlete: &AthleteId) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&master_seed.to_le_bytes());
    hasher.update(athlete.as_str().as_bytes());
    let hash = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}

/// Roster of `count` athletes named `A01`, `A02`, ...
pub fn synthetic_roster(event_id: EventId, count: usize) -> Result<Roster, RosterError> {
    let athletes = (1..=count)
        .map(|i| RosterEntry {
            id: AthleteId::new(format!("A{i:02}")),
            name: format!("Athlete {i}"),
        })
        .collect();
    Roster::new(event_id, athletes)
}

struct Jumper {
    rng: StdRng,
    ability: Height,
}

impl Jumper {
    fn new(master_seed: u64, id: &AthleteId, config: &SimulationConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(athlete_seed(master_seed, id));
        let ability = config
            .vertical
            .start_height
            .raised_by(rng.gen_range(0..=config.spread));
        Self { rng, ability }
    }

    fn clear_probability(&self, height: Height) -> f64 {
        let margin = f64::from(self.ability.as_cm()) - f64::from(height.as_cm());
        (0.5 + margin / 20.0).clamp(0.05, 0.95)
    }

    fn attempt(
        &mut self,
        state: &CompetitionState,
        id: &AthleteId,
        config: &SimulationConfig,
    ) -> AttemptOutcome {
        let height = state.current_height();
        let fresh = state.athlete(id).is_some_and(|a| a.attempts_at(height) == 0);
        let has_mark = state.athlete(id).is_some_and(|a| a.best_height().is_some());
        if self.rng.gen_bool(config.retire_rate) {
            return AttemptOutcome::Retired;
        }
        if fresh && has_mark && height < self.ability && self.rng.gen_bool(config.pass_rate) {
            return AttemptOutcome::Pass;
        }
        if self.rng.gen_bool(self.clear_probability(height)) {
            AttemptOutcome::Clear
        } else {
            AttemptOutcome::Fail
        }
    }
}

/// Run a whole competition to its end.
pub fn run(config: &SimulationConfig) -> Result<SimulationReport, SimulationError> {
    let roster = synthetic_roster(EventId::from("sim"), config.athletes)?;
    run_with_roster(&roster, config)
}

pub fn run_with_roster(
    roster: &Roster,
    config: &SimulationConfig,
) -> Result<SimulationReport, SimulationError> {
    let mut state = CompetitionState::new(roster, config.vertical.clone())?;
    let mut jumpers: HashMap<AthleteId, Jumper> = roster
        .athletes
        .iter()
        .map(|e| (e.id.clone(), Jumper::new(config.seed, &e.id, config)))
        .collect();

    // Every athlete leaves within a bounded number of heights past their ability.
    let limit = roster.len() * 256 + 64;
    for steps in 0..limit {
        match decide(&state) {
            Progress::Next(id) => {
                let Some(jumper) = jumpers.get_mut(&id) else {
                    return Err(EngineError::UnknownAthlete(id).into());
                };
                let outcome = jumper.attempt(&state, &id, config);
                debug!(athlete = %id, height = %state.current_height(), ?outcome, "simulated attempt");
                state.record(&id, outcome)?;
            }
            Progress::HeightExhausted => {
                state.raise()?;
            }
            Progress::CompetitionOver => {
                return Ok(SimulationReport { state, steps });
            }
        }
    }
    Err(SimulationError::StepLimit(limit))
}
