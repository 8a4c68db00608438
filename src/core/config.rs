//! Runtime configuration.
//!
//! Hosts configure the well-known labels the runtime reacts to (the dead tag
//! that drives target rebinding, the zero-health event that triggers death
//! abilities, the in-air tags cleared on landing) rather than having them
//! hardcoded. Configuration is plain serde data and can be loaded from JSON;
//! missing fields fall back to the defaults.
//!
//! ```
//! use rust_abilities::core::SystemConfig;
//!
//! let config = SystemConfig::from_json(r#"{ "initial_acquire_delay": 1.5 }"#).unwrap();
//! assert_eq!(config.initial_acquire_delay, Some(1.5));
//! assert_eq!(config.dead_tag.as_str(), "State.Dead");
//! ```

use serde::{Deserialize, Serialize};
use smallvec::smallvec;
use thiserror::Error;

use crate::tags::{GameplayTag, TagContainer};

/// Which actors are eligible targets for an observer's acquisition scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CandidatePolicy {
    /// Only player-controlled actors (enemies hunt players).
    #[default]
    PlayersOnly,
    /// Any actor other than the observer.
    AnyOther,
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{field} must not be negative (got {value})")]
    Negative { field: &'static str, value: f32 },
}

/// Configuration shared by every actor in a world.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Marks an actor as dead. Dead actors are never acquired as targets.
    pub dead_tag: GameplayTag,

    /// Physics takeover starts once when this tag first appears.
    pub ragdoll_tag: GameplayTag,

    /// While present, rotation follows the aim instead of movement.
    pub firing_tag: GameplayTag,

    /// Gameplay event sent when Health drops from above zero to zero.
    pub zero_health_event: GameplayTag,

    /// Effects matching these tags are removed when the actor lands.
    pub in_air_tags: TagContainer,

    /// One-shot delayed re-acquisition after spawn. `None` disables it.
    pub initial_acquire_delay: Option<f32>,

    /// Seconds a ragdolled actor lingers before it is destroyed.
    pub ragdoll_life_span: f32,

    /// Who an observer may target.
    pub candidate_policy: CandidatePolicy,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            dead_tag: GameplayTag::new("State.Dead"),
            ragdoll_tag: GameplayTag::new("State.Ragdoll"),
            firing_tag: GameplayTag::new("State.Firing"),
            zero_health_event: GameplayTag::new("Event.ZeroHealth"),
            in_air_tags: smallvec![GameplayTag::new("State.InAir")],
            initial_acquire_delay: Some(0.5),
            ragdoll_life_span: 3.0,
            candidate_policy: CandidatePolicy::default(),
        }
    }
}

impl SystemConfig {
    /// Parse configuration from JSON and validate it.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the runtime cannot honor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(delay) = self.initial_acquire_delay {
            if delay < 0.0 {
                return Err(ConfigError::Negative {
                    field: "initial_acquire_delay",
                    value: delay,
                });
            }
        }
        if self.ragdoll_life_span < 0.0 {
            return Err(ConfigError::Negative {
                field: "ragdoll_life_span",
                value: self.ragdoll_life_span,
            });
        }
        Ok(())
    }

    /// Set the delayed re-acquisition (builder pattern).
    #[must_use]
    pub fn with_initial_acquire_delay(mut self, delay: Option<f32>) -> Self {
        self.initial_acquire_delay = delay;
        self
    }

    /// Set the candidate policy (builder pattern).
    #[must_use]
    pub fn with_candidate_policy(mut self, policy: CandidatePolicy) -> Self {
        self.candidate_policy = policy;
        self
    }

    /// Set the dead tag (builder pattern).
    #[must_use]
    pub fn with_dead_tag(mut self, tag: impl Into<GameplayTag>) -> Self {
        self.dead_tag = tag.into();
        self
    }

    /// Set the ragdoll life span (builder pattern).
    #[must_use]
    pub fn with_ragdoll_life_span(mut self, seconds: f32) -> Self {
        self.ragdoll_life_span = seconds;
        self
    }
}
