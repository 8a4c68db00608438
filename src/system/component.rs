//! The per-actor ability system component.

use std::sync::Arc;

use tracing::debug;

use crate::abilities::{
    AbilityActivated, AbilityDefinition, AbilityEnded, AbilityError, AbilityId, AbilityRuntime, AbilitySpecHandle,
    ActivationOutcome, ActorParts, Avatar, InputSlot, NetMessage, SharedBehaviors,
};
use crate::attributes::{Attribute, AttributeChange, AttributeError, AttributeStore};
use crate::core::{ActorId, DelegateHandle, NetSide, SystemConfig};
use crate::effects::{
    ActiveEffectHandle, ApplicationFailure, EffectApplied, EffectContext, EffectDefinition, EffectHandleTable,
    EffectRemoved, EffectSpec,
};
use crate::tags::{GameplayTag, StatusTagIndex, TagCountChanged, TagEventKind, TagSubscription};

/// Owns one actor's attributes, status tags, active effects and abilities.
///
/// Every mutation goes through this component, so it can watch Health:
/// when Health drops from above zero to zero or below, the configured
/// zero-health gameplay event is sent to the actor's abilities (which is
/// how the death ability fires).
pub struct AbilitySystem {
    owner: ActorId,
    side: NetSide,
    config: Arc<SystemConfig>,
    attributes: AttributeStore,
    tags: StatusTagIndex,
    effects: EffectHandleTable,
    abilities: AbilityRuntime,
    avatar: Option<Box<dyn Avatar>>,
}

impl std::fmt::Debug for AbilitySystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AbilitySystem")
            .field("owner", &self.owner)
            .field("side", &self.side)
            .field("attributes", &self.attributes)
            .field("tags", &self.tags)
            .field("effects", &self.effects)
            .field("abilities", &self.abilities)
            .field("has_avatar", &self.avatar.is_some())
            .finish()
    }
}

impl AbilitySystem {
    /// Create a component with the default configuration and no avatar.
    pub fn new(owner: ActorId, side: NetSide, attributes: AttributeStore, behaviors: SharedBehaviors) -> Self {
        Self {
            owner,
            side,
            config: Arc::new(SystemConfig::default()),
            attributes,
            tags: StatusTagIndex::new(),
            effects: EffectHandleTable::new(owner),
            abilities: AbilityRuntime::new(owner, behaviors),
            avatar: None,
        }
    }

    /// Attach the avatar abilities act through (builder pattern).
    #[must_use]
    pub fn with_avatar(mut self, avatar: Box<dyn Avatar>) -> Self {
        self.avatar = Some(avatar);
        self
    }

    /// Use a shared configuration (builder pattern).
    #[must_use]
    pub fn with_config(mut self, config: Arc<SystemConfig>) -> Self {
        self.config = config;
        self
    }

    // === Accessors ===

    #[must_use]
    pub fn owner(&self) -> ActorId {
        self.owner
    }

    #[must_use]
    pub fn side(&self) -> NetSide {
        self.side
    }

    #[must_use]
    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    #[must_use]
    pub fn attributes(&self) -> &AttributeStore {
        &self.attributes
    }

    #[must_use]
    pub fn tags(&self) -> &StatusTagIndex {
        &self.tags
    }

    #[must_use]
    pub fn effects(&self) -> &EffectHandleTable {
        &self.effects
    }

    #[must_use]
    pub fn abilities(&self) -> &AbilityRuntime {
        &self.abilities
    }

    #[must_use]
    pub fn avatar(&self) -> Option<&dyn Avatar> {
        self.avatar.as_deref()
    }

    pub fn set_avatar(&mut self, avatar: Option<Box<dyn Avatar>>) {
        self.avatar = avatar;
    }

    /// Current value of `attribute`.
    pub fn value(&self, attribute: Attribute) -> Result<f32, AttributeError> {
        self.attributes.value(attribute)
    }

    #[must_use]
    pub fn has_tag(&self, tag: &GameplayTag) -> bool {
        self.tags.has_tag(tag)
    }

    /// Check if the actor carries the configured dead tag.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.tags.has_matching(&self.config.dead_tag)
    }

    // === Effects ===

    /// A spec for `definition` instigated by this actor.
    #[must_use]
    pub fn make_outgoing_spec(&self, definition: Arc<EffectDefinition>) -> EffectSpec {
        EffectSpec::new(definition).with_context(EffectContext::from_actor(self.owner))
    }

    /// Apply an effect to this actor.
    pub fn apply_effect_to_self(&mut self, spec: EffectSpec) -> Result<ActiveEffectHandle, ApplicationFailure> {
        let before = self.health();
        let result = self
            .effects
            .apply(&mut self.attributes, &mut self.tags, spec, None);
        self.check_zero_health(before);
        result
    }

    /// Remove one active effect. Unknown or already removed handles are a
    /// no-op returning `false`.
    pub fn remove_effect(&mut self, handle: ActiveEffectHandle) -> bool {
        let before = self.health();
        let removed = self
            .effects
            .remove(handle, &mut self.attributes, &mut self.tags);
        self.check_zero_health(before);
        removed
    }

    /// Remove every active effect whose tags match `query`.
    pub fn remove_effects_with_tags(&mut self, query: &[GameplayTag]) -> usize {
        let before = self.health();
        let removed = self
            .effects
            .remove_with_tags(query, &mut self.attributes, &mut self.tags);
        self.check_zero_health(before);
        removed
    }

    /// The actor touched the ground: in-air effects are removed. Only the
    /// authority reacts; clients wait for the authoritative state.
    pub fn landed(&mut self) -> usize {
        if !self.side.is_authority() {
            return 0;
        }
        let in_air = self.config.in_air_tags.clone();
        let removed = self.remove_effects_with_tags(&in_air);
        debug!(actor = %self.owner, removed, "landed");
        removed
    }

    /// Advance timed effects by `dt` seconds.
    pub fn tick(&mut self, dt: f32) -> Vec<ActiveEffectHandle> {
        let before = self.health();
        let expired = self.effects.tick(dt, &mut self.attributes, &mut self.tags);
        self.check_zero_health(before);
        expired
    }

    // === Abilities ===

    /// Grant an ability.
    pub fn grant_ability(&mut self, definition: Arc<AbilityDefinition>) -> Result<AbilitySpecHandle, AbilityError> {
        self.abilities.grant(definition)
    }

    /// End and remove a granted ability.
    pub fn clear_ability(&mut self, handle: AbilitySpecHandle) -> Result<(), AbilityError> {
        self.mutate(|runtime, parts| runtime.clear_ability(handle, parts))
    }

    pub fn try_activate(&mut self, handle: AbilitySpecHandle) -> Result<ActivationOutcome, AbilityError> {
        self.mutate(|runtime, parts| runtime.try_activate(handle, parts))
    }

    /// Activate the first grant of `ability`.
    pub fn try_activate_ability(&mut self, ability: AbilityId) -> Result<ActivationOutcome, AbilityError> {
        let handle = self.abilities.find(ability).ok_or(AbilityError::NotGranted(ability))?;
        self.try_activate(handle)
    }

    pub fn try_activate_by_tags(&mut self, query: &[GameplayTag]) -> Vec<(AbilitySpecHandle, ActivationOutcome)> {
        self.mutate(|runtime, parts| runtime.try_activate_by_tags(query, parts))
    }

    pub fn end_ability(&mut self, handle: AbilitySpecHandle, was_cancelled: bool) -> Result<bool, AbilityError> {
        self.mutate(|runtime, parts| runtime.end_ability(handle, parts, was_cancelled))
    }

    pub fn cancel_ability(&mut self, handle: AbilitySpecHandle) -> Result<bool, AbilityError> {
        self.end_ability(handle, true)
    }

    pub fn cancel_abilities_with_tags(&mut self, query: &[GameplayTag]) -> usize {
        self.mutate(|runtime, parts| runtime.cancel_abilities_with_tags(query, parts))
    }

    pub fn cancel_all_abilities(&mut self) -> usize {
        self.mutate(|runtime, parts| runtime.cancel_all(parts))
    }

    pub fn input_pressed(&mut self, slot: InputSlot) -> Vec<(AbilitySpecHandle, ActivationOutcome)> {
        self.mutate(|runtime, parts| runtime.input_pressed(slot, parts))
    }

    pub fn input_released(&mut self, slot: InputSlot) -> usize {
        self.mutate(|runtime, parts| runtime.input_released(slot, parts))
    }

    /// Deliver a gameplay event to abilities triggered by it.
    pub fn send_gameplay_event(&mut self, event: &GameplayTag) -> Vec<(AbilitySpecHandle, ActivationOutcome)> {
        self.mutate(|runtime, parts| runtime.handle_gameplay_event(event, parts))
    }

    /// Handle a message from the other side of the authority boundary.
    pub fn receive(&mut self, message: NetMessage) -> Result<(), AbilityError> {
        self.mutate(|runtime, parts| runtime.receive(message, parts))
    }

    /// Take every message queued for the other side.
    pub fn drain_outbox(&mut self) -> Vec<NetMessage> {
        self.abilities.drain_outbox()
    }

    // === Subscriptions ===

    pub fn subscribe_attribute(
        &mut self,
        attribute: Attribute,
        callback: impl FnMut(&AttributeChange) + 'static,
    ) -> Result<DelegateHandle, AttributeError> {
        self.attributes.subscribe(attribute, callback)
    }

    pub fn unsubscribe_attribute(&mut self, attribute: Attribute, handle: DelegateHandle) -> bool {
        self.attributes.unsubscribe(attribute, handle)
    }

    pub fn subscribe_tag(
        &mut self,
        tag: &GameplayTag,
        kind: TagEventKind,
        callback: impl FnMut(&TagCountChanged) + 'static,
    ) -> TagSubscription {
        self.tags.subscribe(tag, kind, callback)
    }

    pub fn unsubscribe_tag(&mut self, subscription: &TagSubscription) -> bool {
        self.tags.unsubscribe(subscription)
    }

    pub fn subscribe_effect_applied(&mut self, callback: impl FnMut(&EffectApplied) + 'static) -> DelegateHandle {
        self.effects.subscribe_applied(callback)
    }

    pub fn subscribe_effect_removed(&mut self, callback: impl FnMut(&EffectRemoved) + 'static) -> DelegateHandle {
        self.effects.subscribe_removed(callback)
    }

    pub fn unsubscribe_effect_applied(&mut self, handle: DelegateHandle) -> bool {
        self.effects.unsubscribe_applied(handle)
    }

    pub fn unsubscribe_effect_removed(&mut self, handle: DelegateHandle) -> bool {
        self.effects.unsubscribe_removed(handle)
    }

    pub fn subscribe_ability_activated(
        &mut self,
        callback: impl FnMut(&AbilityActivated) + 'static,
    ) -> DelegateHandle {
        self.abilities.subscribe_activated(callback)
    }

    pub fn subscribe_ability_ended(&mut self, callback: impl FnMut(&AbilityEnded) + 'static) -> DelegateHandle {
        self.abilities.subscribe_ended(callback)
    }

    pub fn unsubscribe_ability_activated(&mut self, handle: DelegateHandle) -> bool {
        self.abilities.unsubscribe_activated(handle)
    }

    pub fn unsubscribe_ability_ended(&mut self, handle: DelegateHandle) -> bool {
        self.abilities.unsubscribe_ended(handle)
    }

    // === Internals ===

    fn health(&self) -> Option<f32> {
        self.attributes.value(Attribute::Health).ok()
    }

    /// Run `f` against the runtime with split access to the other parts,
    /// then check for a zero-health crossing.
    fn mutate<R>(&mut self, f: impl FnOnce(&mut AbilityRuntime, &mut ActorParts<'_>) -> R) -> R {
        let before = self.health();
        let Self {
            owner,
            side,
            attributes,
            tags,
            effects,
            abilities,
            avatar,
            ..
        } = self;
        let mut parts = ActorParts {
            actor: *owner,
            side: *side,
            attributes,
            tags,
            effects,
            avatar: avatar.as_deref_mut(),
        };
        let result = f(abilities, &mut parts);
        self.check_zero_health(before);
        result
    }

    fn check_zero_health(&mut self, before: Option<f32>) {
        let (Some(before), Some(after)) = (before, self.health()) else {
            return;
        };
        if before > 0.0 && after <= 0.0 {
            let event = self.config.zero_health_event.clone();
            debug!(actor = %self.owner, %event, "health reached zero");
            self.mutate(|runtime, parts| runtime.handle_gameplay_event(&event, parts));
        }
    }
}
