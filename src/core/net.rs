//! Authority and prediction primitives.
//!
//! The simulation runs once on the authority and, for locally predicted
//! abilities, speculatively on the owning client. Each side owns a separate
//! [`AbilitySystem`](crate::system::AbilitySystem); the client tags every
//! effect it applies during a predicted activation with a [`PredictionKey`]
//! so that an authoritative rejection can remove exactly those effects.

use serde::{Deserialize, Serialize};

/// Which side of the authority boundary a component runs on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NetSide {
    /// The authoritative simulation. Outcomes here always win.
    #[default]
    Authority,
    /// An owning client that may predict.
    Client,
}

impl NetSide {
    /// Check if this is the authoritative side.
    #[must_use]
    pub const fn is_authority(self) -> bool {
        matches!(self, NetSide::Authority)
    }
}

/// Identifies one predicted activation and everything it applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PredictionKey(pub u32);

impl PredictionKey {
    /// Create a new prediction key.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw key value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for PredictionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Prediction({})", self.0)
    }
}

/// Allocates prediction keys, monotonically, starting at 1.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PredictionKeyGenerator {
    last: u32,
}

impl PredictionKeyGenerator {
    /// Create a new generator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next key.
    pub fn next_key(&mut self) -> PredictionKey {
        self.last += 1;
        PredictionKey(self.last)
    }
}
