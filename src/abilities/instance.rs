//! Per-grant activation state.

use serde::{Deserialize, Serialize};

use crate::core::PredictionKey;
use crate::effects::ActiveEffectHandle;

/// Handle to one granted ability on one actor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AbilitySpecHandle(pub u32);

impl AbilitySpecHandle {
    /// Get the raw handle value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for AbilitySpecHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AbilitySpec({})", self.0)
    }
}

/// Where an ability is in its activation lifecycle.
///
/// `Granted → Activating → Committed → Running → Ending → Granted`.
/// Any state after `Granted` may jump straight to `Ending`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AbilityState {
    /// Idle; may be activated.
    #[default]
    Granted,
    /// Validating the actor and the execution side.
    Activating,
    /// Cost paid and cooldown started.
    Committed,
    /// Behavior is running.
    Running,
    /// Cleanup in progress.
    Ending,
}

/// The activation context of one granted ability.
#[derive(Clone, Debug, Default)]
pub struct AbilityInstance {
    pub(crate) state: AbilityState,
    /// Number of activations opened so far.
    pub(crate) activations: u32,
    pub(crate) committed: bool,
    pub(crate) owned_tags_applied: bool,
    pub(crate) prediction_key: Option<PredictionKey>,
    /// The activation was requested by the other side of the boundary.
    pub(crate) remote: bool,
    pub(crate) owned_handles: Vec<ActiveEffectHandle>,
}

impl AbilityInstance {
    #[must_use]
    pub fn state(&self) -> AbilityState {
        self.state
    }

    /// An activation scope is open.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state != AbilityState::Granted
    }

    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.committed
    }

    #[must_use]
    pub fn activation_count(&self) -> u32 {
        self.activations
    }

    #[must_use]
    pub fn prediction_key(&self) -> Option<PredictionKey> {
        self.prediction_key
    }

    /// Effect handles removed when the current activation ends.
    #[must_use]
    pub fn owned_handles(&self) -> &[ActiveEffectHandle] {
        &self.owned_handles
    }

    pub(crate) fn begin(&mut self, prediction_key: Option<PredictionKey>, remote: bool) {
        self.state = AbilityState::Activating;
        self.activations += 1;
        self.committed = false;
        self.owned_tags_applied = false;
        self.prediction_key = prediction_key;
        self.remote = remote;
    }

    /// Close a scope that was handed to the authority instead of running.
    pub(crate) fn defer(&mut self) {
        self.state = AbilityState::Granted;
        self.prediction_key = None;
        self.remote = false;
    }

    pub(crate) fn finish(&mut self) {
        self.state = AbilityState::Granted;
        self.committed = false;
        self.owned_tags_applied = false;
        self.prediction_key = None;
        self.remote = false;
    }
}
