//! Attempt outcomes and the per-height attempt record.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Attempts an athlete may take at a single height.
pub const MAX_ATTEMPTS_PER_HEIGHT: usize = 3;

/// Failures (direct plus carried) that end an athlete's competition.
pub const ELIMINATION_FAILURES: u8 = 3;

/// Outcome of one attempt slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Bar cleared (`O`).
    Clear,
    /// Failed attempt (`X`).
    Fail,
    /// Athlete elected not to jump the rest of this height (`-`).
    Pass,
    /// Athlete withdrew; display marker only, never a failure (`r`).
    Retired,
}

impl AttemptOutcome {
    /// Scoresheet symbol.
    pub fn symbol(self) -> char {
        match self {
            Self::Clear => 'O',
            Self::Fail => 'X',
            Self::Pass => '-',
            Self::Retired => 'r',
        }
    }
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Error parsing a scoresheet symbol.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown attempt symbol: {0:?}")]
pub struct ParseOutcomeError(pub String);

impl FromStr for AttemptOutcome {
    type Err = ParseOutcomeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "O" | "o" | "clear" => Ok(Self::Clear),
            "X" | "x" | "fail" => Ok(Self::Fail),
            "-" | "pass" => Ok(Self::Pass),
            "r" | "R" | "retired" => Ok(Self::Retired),
            other => Err(ParseOutcomeError(other.to_string())),
        }
    }
}

/// Why an outcome could not be appended to a [`HeightRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AppendError {
    #[error("all {MAX_ATTEMPTS_PER_HEIGHT} attempt slots are filled")]
    Full,
    #[error("height already closed by a clear, pass or retirement")]
    Closed,
}

/// One athlete's attempts at one height, in slot order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeightRecord {
    attempts: Vec<AttemptOutcome>,
}

impl HeightRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from raw slots, enforcing the slot invariants.
    pub fn from_attempts(attempts: &[AttemptOutcome]) -> Result<Self, AppendError> {
        let mut record = Self::new();
        for &outcome in attempts {
            record.push(outcome)?;
        }
        Ok(record)
    }

    /// Append to the next empty slot.
    ///
    /// Nothing may follow a `Clear`, `Pass` or `Retired` marker, and no more
    /// than three slots are ever filled.
    pub fn push(&mut self, outcome: AttemptOutcome) -> Result<(), AppendError> {
        if self.is_full() {
            return Err(AppendError::Full);
        }
        if self.is_closed() {
            return Err(AppendError::Closed);
        }
        self.attempts.push(outcome);
        Ok(())
    }

    /// Remove and return the most recent slot.
    pub fn pop(&mut self) -> Option<AttemptOutcome> {
        self.attempts.pop()
    }

    pub fn attempts(&self) -> &[AttemptOutcome] {
        &self.attempts
    }

    pub fn last(&self) -> Option<AttemptOutcome> {
        self.attempts.last().copied()
    }

    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.attempts.len() >= MAX_ATTEMPTS_PER_HEIGHT
    }

    pub fn cleared(&self) -> bool {
        self.attempts.contains(&AttemptOutcome::Clear)
    }

    pub fn passed(&self) -> bool {
        self.attempts.contains(&AttemptOutcome::Pass)
    }

    pub fn retired(&self) -> bool {
        self.attempts.contains(&AttemptOutcome::Retired)
    }

    /// A clear, pass or retirement marker ends the athlete's business here.
    pub fn is_closed(&self) -> bool {
        self.cleared() || self.passed() || self.retired()
    }

    pub fn failures(&self) -> u8 {
        self.attempts
            .iter()
            .filter(|o| **o == AttemptOutcome::Fail)
            .count() as u8
    }
}

impl fmt::Display for HeightRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for outcome in &self.attempts {
            write!(f, "{}", outcome.symbol())?;
        }
        Ok(())
    }
}
