//! Ability behavior hooks and the collaborators they see.
//!
//! The runtime drives every ability through the same state machine; an
//! [`AbilityBehavior`] only supplies the ability-specific parts:
//!
//! - `can_activate`: extra pre-checks (movement capability queries)
//! - `modify_cost` / `modify_cooldown`: adjust the commit specs
//! - `on_activated`: gameplay once committed
//! - `on_input_released`: react to the bound input slot being released
//! - `on_ended`: undo whatever `on_activated` started
//!
//! Hooks receive an [`AbilityContext`] giving access to the owner's
//! attributes, tags and effects plus its [`Avatar`].

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::warn;

use crate::attributes::AttributeStore;
use crate::core::{ActorId, NetSide, PredictionKey};
use crate::effects::{
    ActiveEffectHandle, ApplicationFailure, EffectContext, EffectDefinition, EffectHandleTable, EffectSpec,
};
use crate::tags::StatusTagIndex;

use super::definition::AbilityDefinition;
use super::instance::AbilitySpecHandle;
use super::interact::{InteractTarget, InteractableId};

/// The owner's body in the world, as seen by abilities.
///
/// This is the movement and interaction collaborator: capability queries
/// consumed by ability pre-checks, plus requests. The runtime never
/// simulates movement itself.
pub trait Avatar {
    /// An avatar pending destruction is no longer valid.
    fn is_valid(&self) -> bool {
        true
    }

    fn can_jump(&self) -> bool {
        true
    }

    fn can_crouch(&self) -> bool {
        true
    }

    fn is_falling(&self) -> bool {
        false
    }

    fn jump(&mut self) {}

    fn crouch(&mut self) {}

    fn uncrouch(&mut self) {}

    /// The interactable the owner would use right now, if any.
    fn interact_target(&self) -> Option<InteractTarget> {
        None
    }

    /// Use `target`. `false` if it no longer accepts the owner.
    fn interact(&mut self, _target: InteractableId) -> bool {
        false
    }
}

/// An avatar with default answers to every query. Useful for headless
/// actors and tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullAvatar;

impl Avatar for NullAvatar {}

/// What the runtime should do after a behavior hook returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BehaviorOutcome {
    /// Keep running until an external trigger ends the ability.
    #[default]
    Continue,
    /// End normally.
    End,
    /// End cancelled.
    Cancel,
}

/// Everything a behavior hook may touch.
pub struct AbilityContext<'a> {
    pub actor: ActorId,
    pub side: NetSide,
    pub handle: AbilitySpecHandle,
    pub definition: &'a AbilityDefinition,
    pub attributes: &'a mut AttributeStore,
    pub tags: &'a mut StatusTagIndex,
    pub effects: &'a mut EffectHandleTable,
    pub avatar: &'a mut dyn Avatar,
    pub(crate) prediction_key: Option<PredictionKey>,
    pub(crate) owned_handles: &'a mut Vec<ActiveEffectHandle>,
}

impl AbilityContext<'_> {
    /// The key this activation is predicted under, if any.
    #[must_use]
    pub fn prediction_key(&self) -> Option<PredictionKey> {
        self.prediction_key
    }

    /// Effect handles this activation will remove when it ends.
    #[must_use]
    pub fn owned_handles(&self) -> &[ActiveEffectHandle] {
        self.owned_handles.as_slice()
    }

    /// A spec for `definition` instigated by the owner.
    #[must_use]
    pub fn make_spec(&self, definition: Arc<EffectDefinition>) -> EffectSpec {
        EffectSpec::new(definition).with_context(EffectContext::from_actor(self.actor))
    }

    /// Apply an effect to the owner and forget it.
    pub fn apply_effect(&mut self, spec: EffectSpec) -> Result<ActiveEffectHandle, ApplicationFailure> {
        self.effects
            .apply(self.attributes, self.tags, spec, self.prediction_key)
    }

    /// Apply an effect to the owner and remove it when this activation ends.
    ///
    /// Non-instanced abilities cannot own handles: nothing is applied and
    /// `Ok(None)` is returned.
    pub fn apply_tracked_effect(
        &mut self,
        spec: EffectSpec,
    ) -> Result<Option<ActiveEffectHandle>, ApplicationFailure> {
        if !self.definition.is_instanced() {
            warn!(
                ability = %self.definition.name,
                actor = %self.actor,
                effect = %spec.definition.id,
                "non-instanced ability cannot track effects"
            );
            return Ok(None);
        }
        let handle = self.apply_effect(spec)?;
        self.owned_handles.push(handle);
        Ok(Some(handle))
    }
}

/// Ability-specific logic invoked by the shared state machine.
pub trait AbilityBehavior {
    /// Extra activation pre-check, evaluated during commit.
    fn can_activate(&self, _ctx: &AbilityContext<'_>) -> bool {
        true
    }

    /// Adjust the cost spec before it is checked and paid.
    fn modify_cost(&self, _spec: &mut EffectSpec, _ctx: &AbilityContext<'_>) {}

    /// Adjust the cooldown spec before it is applied.
    fn modify_cooldown(&self, _spec: &mut EffectSpec, _ctx: &AbilityContext<'_>) {}

    /// Runs once the activation has committed and its start effects applied.
    fn on_activated(&mut self, _ctx: &mut AbilityContext<'_>) -> BehaviorOutcome {
        BehaviorOutcome::Continue
    }

    /// The bound input slot was released while running.
    fn on_input_released(&mut self, _ctx: &mut AbilityContext<'_>) -> BehaviorOutcome {
        BehaviorOutcome::Continue
    }

    /// Runs inside End, after owned effects are removed.
    fn on_ended(&mut self, _ctx: &mut AbilityContext<'_>, _was_cancelled: bool) {}
}

/// Creates a fresh behavior for each grant.
pub type BehaviorFactory = fn() -> Box<dyn AbilityBehavior>;

/// Maps behavior keys used in definitions to factories.
#[derive(Clone, Debug, Default)]
pub struct BehaviorRegistry {
    factories: FxHashMap<String, BehaviorFactory>,
}

impl BehaviorRegistry {
    /// Create an empty registry. Only the basic behavior (empty key) resolves.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in behavior.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        super::behaviors::register_builtins(&mut registry);
        registry
    }

    /// Register a factory under `key`, replacing any previous one.
    pub fn register(&mut self, key: impl Into<String>, factory: BehaviorFactory) {
        self.factories.insert(key.into(), factory);
    }

    /// Check if `key` resolves.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        key.is_empty() || self.factories.contains_key(key)
    }

    /// Instantiate the behavior for `key`.
    #[must_use]
    pub fn create(&self, key: &str) -> Option<Box<dyn AbilityBehavior>> {
        if key.is_empty() {
            return Some(Box::new(super::behaviors::BasicBehavior));
        }
        self.factories.get(key).map(|factory| factory())
    }

    /// Registered keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

/// Shared, immutable registry handed to every runtime.
pub type SharedBehaviors = Arc<BehaviorRegistry>;
