//! Post-modification invariants.
//!
//! A clamp rule is enforced after a write, never before: modifications may
//! overshoot and are pulled back into range rather than rejected.

use serde::{Deserialize, Serialize};

use super::attribute::Attribute;

/// The invariant an attribute's value must satisfy after every write.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum ClampRule {
    /// Any value is allowed.
    #[default]
    Unclamped,
    /// `value >= min`
    AtLeast(f32),
    /// `min <= value <= current(max)`, where the upper bound is another
    /// attribute's current value.
    Between { min: f32, max: Attribute },
}

impl ClampRule {
    /// The attribute this rule reads its upper bound from, if any.
    #[must_use]
    pub fn bound(&self) -> Option<Attribute> {
        match self {
            ClampRule::Between { max, .. } => Some(*max),
            _ => None,
        }
    }

    /// Clamp `value`. `upper` is the current value of the bound attribute,
    /// `None` if the store does not carry it, in which case only the lower
    /// limit applies.
    #[must_use]
    pub fn apply(&self, value: f32, upper: Option<f32>) -> f32 {
        match *self {
            ClampRule::Unclamped => value,
            ClampRule::AtLeast(min) => value.max(min),
            ClampRule::Between { min, .. } => match upper {
                // An upper bound below the floor collapses the range to the floor.
                Some(max) => value.min(max).max(min),
                None => value.max(min),
            },
        }
    }
}
