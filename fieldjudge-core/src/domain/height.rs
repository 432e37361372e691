//! Bar heights in whole centimetres.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A bar height in centimetres.
///
/// Rendered in metres with two decimals, the way heights are announced
/// (`Height(125)` displays as `1.25m`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Height(pub u32);

impl Height {
    pub const fn cm(cm: u32) -> Self {
        Self(cm)
    }

    pub fn as_cm(self) -> u32 {
        self.0
    }

    /// Height raised by `increment` centimetres.
    pub fn raised_by(self, increment: u32) -> Self {
        Self(self.0.saturating_add(increment))
    }
}

impl fmt::Display for Height {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}m", self.0 / 100, self.0 % 100)
    }
}

impl From<u32> for Height {
    fn from(cm: u32) -> Self {
        Self(cm)
    }
}
