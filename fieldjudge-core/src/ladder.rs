//! Height ladder: the ordered bar heights of one vertical event and the cursor
//! pointing at the height currently being contested.
//!
//! The ladder only enforces its own shape (non-empty, strictly increasing).
//! Whether anybody is left to jump is the caller's concern.

use crate::domain::Height;
use crate::engine::EngineError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeightLadder {
    heights: Vec<Height>,
    current_index: usize,
    /// Step used to extend the ladder past its last announced height.
    increment: u32,
}

impl HeightLadder {
    /// Build a ladder from announced heights, cursor on the first one.
    pub fn new(heights: Vec<Height>, increment: u32) -> Result<Self, EngineError> {
        if heights.is_empty() {
            return Err(EngineError::InvalidLadder("no heights".into()));
        }
        if increment == 0 {
            return Err(EngineError::InvalidLadder("increment must be positive".into()));
        }
        if let Some(pair) = heights.windows(2).find(|w| w[0] >= w[1]) {
            return Err(EngineError::InvalidLadder(format!(
                "{} is followed by {}",
                pair[0], pair[1]
            )));
        }
        Ok(Self {
            heights,
            current_index: 0,
            increment,
        })
    }

    pub fn heights(&self) -> &[Height] {
        &self.heights
    }

    pub fn current(&self) -> Height {
        self.heights[self.current_index]
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn increment(&self) -> u32 {
        self.increment
    }

    pub fn position(&self, height: Height) -> Option<usize> {
        self.heights.binary_search(&height).ok()
    }

    /// Move to the next rung, extending the ladder by `increment` if needed.
    pub fn raise(&mut self) -> Height {
        if self.current_index + 1 >= self.heights.len() {
            let next = self.current().raised_by(self.increment);
            self.heights.push(next);
        }
        self.current_index += 1;
        self.current()
    }

    /// Put the cursor on an existing rung. Returns false if `height` is not on
    /// the ladder.
    pub(crate) fn seek(&mut self, height: Height) -> bool {
        match self.position(height) {
            Some(idx) => {
                self.current_index = idx;
                true
            }
            None => false,
        }
    }

    /// Height after the cursor, without moving it.
    pub fn peek_next(&self) -> Height {
        self.heights
            .get(self.current_index + 1)
            .copied()
            .unwrap_or_else(|| self.current().raised_by(self.increment))
    }

    /// Make `height` current.
    ///
    /// Moving up drops the never-contested rungs between the old and the new
    /// height. Moving down (or staying) is only accepted with `allow_lower`,
    /// which officials use to correct a mistaken raise.
    pub fn jump_to(&mut self, height: Height, allow_lower: bool) -> Result<Height, EngineError> {
        let current = self.current();
        if height <= current {
            if !allow_lower {
                return Err(EngineError::NonMonotonicHeight {
                    requested: height,
                    current,
                });
            }
            self.current_index = match self.heights.binary_search(&height) {
                Ok(idx) => idx,
                Err(idx) => {
                    self.heights.insert(idx, height);
                    idx
                }
            };
            return Ok(height);
        }

        let first_after = self.current_index + 1;
        let keep_from = self.heights[first_after..]
            .iter()
            .position(|h| *h >= height)
            .map_or(self.heights.len(), |p| first_after + p);
        self.heights.drain(first_after..keep_from);
        if self.heights.get(first_after) != Some(&height) {
            self.heights.insert(first_after, height);
        }
        self.current_index = first_after;
        Ok(height)
    }
}
