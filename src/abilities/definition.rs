//! Ability definitions.
//!
//! An [`AbilityDefinition`] is immutable content shared by every actor the
//! ability is granted to. It declares the policies the runtime enforces
//! (where the ability may execute, whether it may own effect handles), the
//! tags that gate it, what committing it costs, and which effects it applies
//! at start and end. Ability-specific logic lives in the
//! [`AbilityBehavior`](super::AbilityBehavior) named by `behavior`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::effects::EffectDefinition;
use crate::tags::{GameplayTag, TagContainer};

/// Unique identifier for an ability definition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AbilityId(pub u32);

impl AbilityId {
    /// Create a new ability ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for AbilityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ability({})", self.0)
    }
}

/// Where an activation may execute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NetExecutionPolicy {
    /// Runs on the client immediately under a prediction key, then on the
    /// authority, which confirms or rejects.
    #[default]
    LocalPredicted,
    /// Runs only where it was triggered, never crosses the boundary.
    LocalOnly,
    /// Runs only on the authority. A client activation is cancelled.
    AuthorityOnly,
    /// Runs only on the authority. A client activation is forwarded to the
    /// authority and deferred locally.
    ServerOnly,
}

/// Whether an ability keeps per-actor state between its hooks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InstancingPolicy {
    /// Shared, stateless. Cannot own effect handles.
    NonInstanced,
    /// One stateful instance per owning actor.
    #[default]
    InstancedPerActor,
}

/// Logical input slots delivered by the input layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputSlot {
    Jump,
    Crouch,
    Sprint,
    PrimaryAttack,
    Interact,
    Skill1,
    Skill2,
    Skill3,
    Skill4,
}

/// Immutable ability content.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AbilityDefinition {
    pub id: AbilityId,

    /// Human-readable name (for logs).
    pub name: String,

    /// Key of the behavior in the [`BehaviorRegistry`](super::BehaviorRegistry).
    /// Empty selects the basic behavior.
    #[serde(default)]
    pub behavior: String,

    #[serde(default)]
    pub net_execution: NetExecutionPolicy,

    #[serde(default)]
    pub instancing: InstancingPolicy,

    #[serde(default)]
    pub input_slot: Option<InputSlot>,

    /// End immediately after the behavior's activation hook returns.
    #[serde(default)]
    pub auto_end: bool,

    /// Labels describing the ability, matched by cancel/activate-by-tag.
    #[serde(default)]
    pub ability_tags: TagContainer,

    /// Added to the owner while the ability runs.
    #[serde(default)]
    pub activation_owned_tags: TagContainer,

    /// The owner must carry all of these to activate.
    #[serde(default)]
    pub activation_required_tags: TagContainer,

    /// The owner must carry none of these to activate.
    #[serde(default)]
    pub activation_blocked_tags: TagContainer,

    /// Gameplay events that activate this ability.
    #[serde(default)]
    pub trigger_events: TagContainer,

    /// Instant effect paid on commit. Additive modifiers must not drive their
    /// attribute below zero.
    #[serde(default)]
    pub cost: Option<Arc<EffectDefinition>>,

    /// Timed effect started on commit. Its granted tags are the cooldown tags.
    #[serde(default)]
    pub cooldown: Option<Arc<EffectDefinition>>,

    /// Applied on activation and never tracked.
    #[serde(default)]
    pub start_effects: Vec<Arc<EffectDefinition>>,

    /// Applied on activation and removed on end. Only honored for instanced
    /// abilities.
    #[serde(default)]
    pub tracked_effects: Vec<Arc<EffectDefinition>>,

    /// Applied when a committed activation ends.
    #[serde(default)]
    pub end_effects: Vec<Arc<EffectDefinition>>,
}

impl AbilityDefinition {
    /// Create a locally predicted, instanced ability with no effects.
    pub fn new(id: AbilityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            behavior: String::new(),
            net_execution: NetExecutionPolicy::default(),
            instancing: InstancingPolicy::default(),
            input_slot: None,
            auto_end: false,
            ability_tags: TagContainer::new(),
            activation_owned_tags: TagContainer::new(),
            activation_required_tags: TagContainer::new(),
            activation_blocked_tags: TagContainer::new(),
            trigger_events: TagContainer::new(),
            cost: None,
            cooldown: None,
            start_effects: Vec::new(),
            tracked_effects: Vec::new(),
            end_effects: Vec::new(),
        }
    }

    /// Set the behavior key (builder pattern).
    #[must_use]
    pub fn with_behavior(mut self, key: impl Into<String>) -> Self {
        self.behavior = key.into();
        self
    }

    /// Set the net execution policy (builder pattern).
    #[must_use]
    pub fn with_net_execution(mut self, policy: NetExecutionPolicy) -> Self {
        self.net_execution = policy;
        self
    }

    /// Set the instancing policy (builder pattern).
    #[must_use]
    pub fn with_instancing(mut self, policy: InstancingPolicy) -> Self {
        self.instancing = policy;
        self
    }

    /// Bind an input slot (builder pattern).
    #[must_use]
    pub fn with_input(mut self, slot: InputSlot) -> Self {
        self.input_slot = Some(slot);
        self
    }

    /// End right after activation (builder pattern).
    #[must_use]
    pub fn auto_ending(mut self) -> Self {
        self.auto_end = true;
        self
    }

    #[must_use]
    pub fn with_ability_tag(mut self, tag: impl Into<GameplayTag>) -> Self {
        self.ability_tags.push(tag.into());
        self
    }

    #[must_use]
    pub fn with_owned_tag(mut self, tag: impl Into<GameplayTag>) -> Self {
        self.activation_owned_tags.push(tag.into());
        self
    }

    #[must_use]
    pub fn with_required_tag(mut self, tag: impl Into<GameplayTag>) -> Self {
        self.activation_required_tags.push(tag.into());
        self
    }

    #[must_use]
    pub fn with_blocked_tag(mut self, tag: impl Into<GameplayTag>) -> Self {
        self.activation_blocked_tags.push(tag.into());
        self
    }

    #[must_use]
    pub fn triggered_by(mut self, event: impl Into<GameplayTag>) -> Self {
        self.trigger_events.push(event.into());
        self
    }

    #[must_use]
    pub fn with_cost(mut self, cost: Arc<EffectDefinition>) -> Self {
        self.cost = Some(cost);
        self
    }

    #[must_use]
    pub fn with_cooldown(mut self, cooldown: Arc<EffectDefinition>) -> Self {
        self.cooldown = Some(cooldown);
        self
    }

    #[must_use]
    pub fn with_start_effect(mut self, effect: Arc<EffectDefinition>) -> Self {
        self.start_effects.push(effect);
        self
    }

    #[must_use]
    pub fn with_tracked_effect(mut self, effect: Arc<EffectDefinition>) -> Self {
        self.tracked_effects.push(effect);
        self
    }

    #[must_use]
    pub fn with_end_effect(mut self, effect: Arc<EffectDefinition>) -> Self {
        self.end_effects.push(effect);
        self
    }

    /// The labels that mark this ability as cooling down.
    #[must_use]
    pub fn cooldown_tags(&self) -> &[GameplayTag] {
        match &self.cooldown {
            Some(cooldown) => &cooldown.granted_tags,
            None => &[],
        }
    }

    #[must_use]
    pub fn is_instanced(&self) -> bool {
        self.instancing == InstancingPolicy::InstancedPerActor
    }
}
