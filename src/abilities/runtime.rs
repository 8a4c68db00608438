//! The per-actor ability runtime and its activation state machine.
//!
//! ## Activation
//!
//! 1. The avatar must be present and valid, otherwise the activation ends
//!    cancelled.
//! 2. The definition's [`NetExecutionPolicy`] is checked against the side
//!    the runtime runs on. A client may predict, forward the request to the
//!    authority (deferred, nothing runs locally) or be refused (ends
//!    cancelled).
//! 3. Commit: activation tags, the behavior's pre-check, cooldown tags and
//!    cost are checked, then the cost is paid and the cooldown started. Any
//!    failure ends the activation cancelled and is logged with the ability
//!    and the actor.
//! 4. Activation-owned tags are added, start effects are applied (failures
//!    are logged and skipped) and, for instanced abilities, tracked effects
//!    are applied and their handles recorded.
//! 5. The behavior's `on_activated` hook runs.
//! 6. Auto-ending abilities end immediately; others keep running until an
//!    input release, an explicit cancel, a gameplay decision or an
//!    authoritative correction ends them.
//!
//! ## Ending
//!
//! [`AbilityRuntime::end_ability`] is the single cleanup funnel and is safe to
//! call at any point, any number of times: owned effect handles are removed,
//! end effects applied (committed activations only), the behavior's
//! `on_ended` hook invoked, activation-owned tags removed, the prediction
//! key released and `ability_ended` notified. Ending an ability that is not
//! active does nothing.
//!
//! ## Prediction
//!
//! A client that predicts allocates a [`PredictionKey`], runs the ability
//! with every effect tagged by that key and queues a `TryActivate` message.
//! The authority runs the same activation and answers with
//! `ActivationConfirmed` or `ActivationRejected`. A rejection ends the
//! client's instance cancelled and removes every effect applied under the
//! key, whether the instance tracked it or not.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::attributes::{AttributeStore, ModOp};
use crate::core::{
    ActorId, DelegateHandle, MulticastDelegate, NetSide, PredictionKey, PredictionKeyGenerator,
};
use crate::effects::{ApplicationFailure, EffectHandleTable, EffectSpec};
use crate::tags::{any_matches, GameplayTag, StatusTagIndex};

use super::behavior::{AbilityBehavior, AbilityContext, Avatar, BehaviorOutcome, SharedBehaviors};
use super::definition::{AbilityDefinition, AbilityId, InputSlot, NetExecutionPolicy};
use super::error::{AbilityError, ActivationFailure, FailureKind};
use super::instance::{AbilityInstance, AbilitySpecHandle, AbilityState};
use super::message::NetMessage;

/// Mutable access to the owner's components for the duration of one call.
pub struct ActorParts<'a> {
    pub actor: ActorId,
    pub side: NetSide,
    pub attributes: &'a mut AttributeStore,
    pub tags: &'a mut StatusTagIndex,
    pub effects: &'a mut EffectHandleTable,
    pub avatar: Option<&'a mut (dyn Avatar + 'static)>,
}

/// One ability granted to the owner.
pub struct AbilitySpec {
    pub handle: AbilitySpecHandle,
    pub definition: Arc<AbilityDefinition>,
    pub instance: AbilityInstance,
    behavior: Box<dyn AbilityBehavior>,
    input_held: bool,
}

impl AbilitySpec {
    /// Whether the bound input slot is currently held.
    #[must_use]
    pub fn is_input_held(&self) -> bool {
        self.input_held
    }
}

impl std::fmt::Debug for AbilitySpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AbilitySpec")
            .field("handle", &self.handle)
            .field("ability", &self.definition.id)
            .field("instance", &self.instance)
            .field("input_held", &self.input_held)
            .finish_non_exhaustive()
    }
}

/// Notification that an ability committed and started running.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AbilityActivated {
    /// Owner of the ability.
    pub actor: ActorId,
    /// Definition that was activated.
    pub ability: AbilityId,
    /// The grant that ran.
    pub handle: AbilitySpecHandle,
    /// Set while the activation is a client prediction, or a confirmed one
    /// on the authority.
    pub prediction_key: Option<PredictionKey>,
}

/// Notification that an activation scope closed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AbilityEnded {
    /// Owner of the ability.
    pub actor: ActorId,
    /// Definition whose activation ended.
    pub ability: AbilityId,
    /// The grant that ended.
    pub handle: AbilitySpecHandle,
    /// `true` when cancelled or refused rather than ended normally.
    pub was_cancelled: bool,
}

/// Result of an activation attempt.
#[derive(Clone, Debug, PartialEq)]
pub enum ActivationOutcome {
    /// Committed and ran. `ended` is set if it already finished.
    Activated { ended: bool },
    /// Handed to the authority; nothing ran locally.
    Deferred,
    /// Did not commit. The activation (if one was opened) ended cancelled.
    Failed(ActivationFailure),
}

impl ActivationOutcome {
    #[must_use]
    pub fn is_activated(&self) -> bool {
        matches!(self, ActivationOutcome::Activated { .. })
    }

    #[must_use]
    pub fn failure(&self) -> Option<&ActivationFailure> {
        match self {
            ActivationOutcome::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

enum NetGate {
    Run,
    Predict,
    Forward,
    Refuse,
}

fn net_gate(policy: NetExecutionPolicy, side: NetSide) -> NetGate {
    match (policy, side) {
        (_, NetSide::Authority) | (NetExecutionPolicy::LocalOnly, NetSide::Client) => NetGate::Run,
        (NetExecutionPolicy::LocalPredicted, NetSide::Client) => NetGate::Predict,
        (NetExecutionPolicy::ServerOnly, NetSide::Client) => NetGate::Forward,
        (NetExecutionPolicy::AuthorityOnly, NetSide::Client) => NetGate::Refuse,
    }
}

fn context<'b>(
    parts: &'b mut ActorParts<'_>,
    definition: &'b AbilityDefinition,
    handle: AbilitySpecHandle,
    instance: &'b mut AbilityInstance,
) -> Option<AbilityContext<'b>> {
    let avatar = parts.avatar.as_deref_mut()?;
    // Only a predicting client tags its effects.
    let prediction_key = match parts.side {
        NetSide::Authority => None,
        NetSide::Client => instance.prediction_key,
    };
    Some(AbilityContext {
        actor: parts.actor,
        side: parts.side,
        handle,
        definition,
        attributes: &mut *parts.attributes,
        tags: &mut *parts.tags,
        effects: &mut *parts.effects,
        avatar,
        prediction_key,
        owned_handles: &mut instance.owned_handles,
    })
}

fn check_cost(spec: &EffectSpec, attributes: &AttributeStore) -> Result<(), ActivationFailure> {
    let modifications = spec.resolve_modifiers().map_err(ActivationFailure::CostFailed)?;
    for (attribute, modification) in modifications {
        if modification.op != ModOp::Add || modification.magnitude >= 0.0 {
            continue;
        }
        let available = attributes.value(attribute).map_err(|_| {
            ActivationFailure::CostFailed(ApplicationFailure::UnknownAttribute {
                effect: spec.definition.id,
                attribute,
            })
        })?;
        if available + modification.magnitude < 0.0 {
            return Err(ActivationFailure::InsufficientCost {
                attribute,
                required: -modification.magnitude,
                available,
            });
        }
    }
    Ok(())
}

/// Granted abilities of one actor and their activation state.
#[derive(Debug)]
pub struct AbilityRuntime {
    owner: ActorId,
    behaviors: SharedBehaviors,

    /// Granted abilities in grant order.
    specs: Vec<AbilitySpec>,

    next_handle: u32,
    prediction_keys: PredictionKeyGenerator,
    outbox: Vec<NetMessage>,

    on_activated: MulticastDelegate<AbilityActivated>,
    on_ended: MulticastDelegate<AbilityEnded>,
}

impl AbilityRuntime {
    /// Create a runtime for `owner` resolving behaviors through `behaviors`.
    pub fn new(owner: ActorId, behaviors: SharedBehaviors) -> Self {
        Self {
            owner,
            behaviors,
            specs: Vec::new(),
            next_handle: 1,
            prediction_keys: PredictionKeyGenerator::new(),
            outbox: Vec::new(),
            on_activated: MulticastDelegate::new(),
            on_ended: MulticastDelegate::new(),
        }
    }

    #[must_use]
    pub fn owner(&self) -> ActorId {
        self.owner
    }

    // === Granting ===

    /// Grant an ability, instantiating its behavior from the registry.
    pub fn grant(&mut self, definition: Arc<AbilityDefinition>) -> Result<AbilitySpecHandle, AbilityError> {
        let behavior = self
            .behaviors
            .create(&definition.behavior)
            .ok_or_else(|| AbilityError::UnknownBehavior(definition.behavior.clone()))?;
        Ok(self.grant_with_behavior(definition, behavior))
    }

    /// Grant an ability with an explicit behavior.
    pub fn grant_with_behavior(
        &mut self,
        definition: Arc<AbilityDefinition>,
        behavior: Box<dyn AbilityBehavior>,
    ) -> AbilitySpecHandle {
        let handle = AbilitySpecHandle(self.next_handle);
        self.next_handle += 1;
        debug!(ability = %definition.name, actor = %self.owner, %handle, "granted ability");
        self.specs.push(AbilitySpec {
            handle,
            definition,
            instance: AbilityInstance::default(),
            behavior,
            input_held: false,
        });
        handle
    }

    /// End (cancelled) and remove a granted ability.
    pub fn clear_ability(
        &mut self,
        handle: AbilitySpecHandle,
        parts: &mut ActorParts<'_>,
    ) -> Result<(), AbilityError> {
        let index = self.index_of(handle)?;
        self.end_at(index, parts, true, true);
        let spec = self.specs.remove(index);
        debug!(ability = %spec.definition.name, actor = %self.owner, %handle, "cleared ability");
        Ok(())
    }

    // === Queries ===

    #[must_use]
    pub fn spec(&self, handle: AbilitySpecHandle) -> Option<&AbilitySpec> {
        self.specs.iter().find(|s| s.handle == handle)
    }

    /// The first grant of `ability`.
    #[must_use]
    pub fn find(&self, ability: AbilityId) -> Option<AbilitySpecHandle> {
        self.specs
            .iter()
            .find(|s| s.definition.id == ability)
            .map(|s| s.handle)
    }

    #[must_use]
    pub fn state(&self, handle: AbilitySpecHandle) -> Option<AbilityState> {
        self.spec(handle).map(|s| s.instance.state())
    }

    #[must_use]
    pub fn is_active(&self, handle: AbilitySpecHandle) -> bool {
        self.spec(handle).is_some_and(|s| s.instance.is_active())
    }

    /// Number of abilities with an open activation scope.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.specs.iter().filter(|s| s.instance.is_active()).count()
    }

    /// Iterate over granted abilities in grant order.
    pub fn iter(&self) -> impl Iterator<Item = &AbilitySpec> {
        self.specs.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    // === Activation ===

    /// Try to activate a granted ability.
    pub fn try_activate(
        &mut self,
        handle: AbilitySpecHandle,
        parts: &mut ActorParts<'_>,
    ) -> Result<ActivationOutcome, AbilityError> {
        self.activate(handle, parts, None, false)
    }

    /// Try to activate every idle ability whose ability tags match `query`.
    pub fn try_activate_by_tags(
        &mut self,
        query: &[GameplayTag],
        parts: &mut ActorParts<'_>,
    ) -> Vec<(AbilitySpecHandle, ActivationOutcome)> {
        let handles: Vec<AbilitySpecHandle> = self
            .specs
            .iter()
            .filter(|s| !s.instance.is_active() && any_matches(&s.definition.ability_tags, query))
            .map(|s| s.handle)
            .collect();
        self.activate_all(handles, parts)
    }

    /// Activate every idle ability triggered by the gameplay event `event`.
    pub fn handle_gameplay_event(
        &mut self,
        event: &GameplayTag,
        parts: &mut ActorParts<'_>,
    ) -> Vec<(AbilitySpecHandle, ActivationOutcome)> {
        let handles: Vec<AbilitySpecHandle> = self
            .specs
            .iter()
            .filter(|s| {
                !s.instance.is_active() && s.definition.trigger_events.iter().any(|t| event.matches(t))
            })
            .map(|s| s.handle)
            .collect();
        if !handles.is_empty() {
            debug!(actor = %self.owner, %event, abilities = handles.len(), "gameplay event triggers abilities");
        }
        self.activate_all(handles, parts)
    }

    /// The input layer pressed `slot`: activate idle abilities bound to it.
    pub fn input_pressed(
        &mut self,
        slot: InputSlot,
        parts: &mut ActorParts<'_>,
    ) -> Vec<(AbilitySpecHandle, ActivationOutcome)> {
        let mut handles = Vec::new();
        for spec in &mut self.specs {
            if spec.definition.input_slot == Some(slot) {
                spec.input_held = true;
                if !spec.instance.is_active() {
                    handles.push(spec.handle);
                }
            }
        }
        self.activate_all(handles, parts)
    }

    /// The input layer released `slot`. Returns how many abilities ended.
    pub fn input_released(&mut self, slot: InputSlot, parts: &mut ActorParts<'_>) -> usize {
        let mut ended = 0;
        for index in 0..self.specs.len() {
            let spec = &mut self.specs[index];
            if spec.definition.input_slot != Some(slot) {
                continue;
            }
            spec.input_held = false;
            if spec.instance.state() != AbilityState::Running {
                continue;
            }
            let definition = Arc::clone(&spec.definition);
            let AbilitySpec {
                behavior,
                instance,
                handle,
                ..
            } = spec;
            let outcome = match context(parts, &definition, *handle, instance) {
                Some(mut ctx) => behavior.on_input_released(&mut ctx),
                None => BehaviorOutcome::Cancel,
            };
            if self.apply_outcome(index, parts, outcome) {
                ended += 1;
            }
        }
        ended
    }

    // === Ending ===

    /// End an active ability. Returns `true` if this call closed an
    /// activation; ending an idle ability is a no-op.
    pub fn end_ability(
        &mut self,
        handle: AbilitySpecHandle,
        parts: &mut ActorParts<'_>,
        was_cancelled: bool,
    ) -> Result<bool, AbilityError> {
        let index = self.index_of(handle)?;
        Ok(self.end_at(index, parts, was_cancelled, true))
    }

    /// End an active ability as cancelled.
    pub fn cancel_ability(
        &mut self,
        handle: AbilitySpecHandle,
        parts: &mut ActorParts<'_>,
    ) -> Result<bool, AbilityError> {
        self.end_ability(handle, parts, true)
    }

    /// Cancel every active ability whose ability tags match `query`.
    pub fn cancel_abilities_with_tags(&mut self, query: &[GameplayTag], parts: &mut ActorParts<'_>) -> usize {
        let mut cancelled = 0;
        for index in 0..self.specs.len() {
            if any_matches(&self.specs[index].definition.ability_tags, query)
                && self.end_at(index, parts, true, true)
            {
                cancelled += 1;
            }
        }
        cancelled
    }

    /// Cancel every active ability.
    pub fn cancel_all(&mut self, parts: &mut ActorParts<'_>) -> usize {
        let mut cancelled = 0;
        for index in 0..self.specs.len() {
            if self.end_at(index, parts, true, true) {
                cancelled += 1;
            }
        }
        cancelled
    }

    // === Authority boundary ===

    /// Handle a message from the other side of the boundary.
    pub fn receive(&mut self, message: NetMessage, parts: &mut ActorParts<'_>) -> Result<(), AbilityError> {
        match message {
            NetMessage::TryActivate { ability, key } => {
                if !parts.side.is_authority() {
                    debug!(actor = %self.owner, %ability, "ignoring activation request on a client");
                    return Ok(());
                }
                let Some(handle) = self.find(ability) else {
                    if let Some(key) = key {
                        self.outbox.push(NetMessage::ActivationRejected { ability, key });
                    }
                    return Err(AbilityError::NotGranted(ability));
                };
                self.activate(handle, parts, key, true)?;
            }
            NetMessage::ActivationConfirmed { ability, key } => {
                let confirmed = parts.effects.confirm_predicted(key);
                debug!(actor = %self.owner, %ability, %key, confirmed, "prediction confirmed");
            }
            NetMessage::ActivationRejected { ability, key } => {
                if let Some(index) = self
                    .specs
                    .iter()
                    .position(|s| s.instance.is_active() && s.instance.prediction_key == Some(key))
                {
                    self.end_at(index, parts, true, false);
                }
                let removed = parts
                    .effects
                    .remove_predicted(key, parts.attributes, parts.tags);
                warn!(actor = %self.owner, %ability, %key, removed, "prediction rejected by authority");
            }
            NetMessage::AbilityEnded { ability, was_cancelled } => {
                if let Some(index) = self.specs.iter().position(|s| s.definition.id == ability) {
                    self.end_at(index, parts, was_cancelled, false);
                }
            }
        }
        Ok(())
    }

    /// Messages queued for the other side.
    #[must_use]
    pub fn outbox(&self) -> &[NetMessage] {
        &self.outbox
    }

    /// Take every queued message.
    pub fn drain_outbox(&mut self) -> Vec<NetMessage> {
        std::mem::take(&mut self.outbox)
    }

    // === Notifications ===

    pub fn subscribe_activated(&mut self, callback: impl FnMut(&AbilityActivated) + 'static) -> DelegateHandle {
        self.on_activated.add(callback)
    }

    pub fn unsubscribe_activated(&mut self, handle: DelegateHandle) -> bool {
        self.on_activated.remove(handle)
    }

    pub fn subscribe_ended(&mut self, callback: impl FnMut(&AbilityEnded) + 'static) -> DelegateHandle {
        self.on_ended.add(callback)
    }

    pub fn unsubscribe_ended(&mut self, handle: DelegateHandle) -> bool {
        self.on_ended.remove(handle)
    }

    // === State machine ===

    fn index_of(&self, handle: AbilitySpecHandle) -> Result<usize, AbilityError> {
        self.specs
            .iter()
            .position(|s| s.handle == handle)
            .ok_or(AbilityError::UnknownSpec(handle))
    }

    fn activate_all(
        &mut self,
        handles: Vec<AbilitySpecHandle>,
        parts: &mut ActorParts<'_>,
    ) -> Vec<(AbilitySpecHandle, ActivationOutcome)> {
        handles
            .into_iter()
            .filter_map(|handle| {
                self.activate(handle, parts, None, false)
                    .ok()
                    .map(|outcome| (handle, outcome))
            })
            .collect()
    }

    fn activate(
        &mut self,
        handle: AbilitySpecHandle,
        parts: &mut ActorParts<'_>,
        remote_key: Option<PredictionKey>,
        remote: bool,
    ) -> Result<ActivationOutcome, AbilityError> {
        let index = self.index_of(handle)?;
        let definition = Arc::clone(&self.specs[index].definition);

        if self.specs[index].instance.is_active() {
            debug!(ability = %definition.name, actor = %parts.actor, "activation refused: already active");
            if let (true, Some(key)) = (remote, remote_key) {
                self.outbox.push(NetMessage::ActivationRejected {
                    ability: definition.id,
                    key,
                });
            }
            return Ok(ActivationOutcome::Failed(ActivationFailure::AlreadyActive));
        }

        self.specs[index].instance.begin(remote_key, remote);

        if !parts.avatar.as_deref().is_some_and(|a| a.is_valid()) {
            return Ok(self.fail(index, parts, ActivationFailure::InvalidAvatar));
        }

        match net_gate(definition.net_execution, parts.side) {
            NetGate::Run => {}
            NetGate::Predict => {
                let key = self.prediction_keys.next_key();
                self.specs[index].instance.prediction_key = Some(key);
            }
            NetGate::Forward => {
                self.specs[index].instance.defer();
                self.outbox.push(NetMessage::TryActivate {
                    ability: definition.id,
                    key: None,
                });
                debug!(ability = %definition.name, actor = %parts.actor, "forwarded activation to authority");
                return Ok(ActivationOutcome::Deferred);
            }
            NetGate::Refuse => {
                let failure = ActivationFailure::NetSideMismatch {
                    policy: definition.net_execution,
                    side: parts.side,
                };
                return Ok(self.fail(index, parts, failure));
            }
        }

        if let Err(failure) = self.commit(index, parts) {
            return Ok(self.fail(index, parts, failure));
        }

        let instance = &self.specs[index].instance;
        match (parts.side, instance.prediction_key) {
            (NetSide::Client, Some(key)) => self.outbox.push(NetMessage::TryActivate {
                ability: definition.id,
                key: Some(key),
            }),
            (NetSide::Authority, Some(key)) if instance.remote => {
                self.outbox.push(NetMessage::ActivationConfirmed {
                    ability: definition.id,
                    key,
                })
            }
            _ => {}
        }

        self.start(index, parts);

        let outcome = {
            let spec = &mut self.specs[index];
            spec.instance.state = AbilityState::Running;
            let AbilitySpec {
                behavior,
                instance,
                handle,
                ..
            } = spec;
            match context(parts, &definition, *handle, instance) {
                Some(mut ctx) => behavior.on_activated(&mut ctx),
                None => BehaviorOutcome::Cancel,
            }
        };
        let outcome = match outcome {
            BehaviorOutcome::Continue if definition.auto_end => BehaviorOutcome::End,
            other => other,
        };
        self.apply_outcome(index, parts, outcome);

        Ok(ActivationOutcome::Activated {
            ended: !self.specs[index].instance.is_active(),
        })
    }

    fn commit(&mut self, index: usize, parts: &mut ActorParts<'_>) -> Result<(), ActivationFailure> {
        let spec = &mut self.specs[index];
        let definition = Arc::clone(&spec.definition);

        if let Some(tag) = definition
            .activation_blocked_tags
            .iter()
            .find(|t| parts.tags.has_matching(t))
        {
            return Err(ActivationFailure::Blocked(tag.clone()));
        }
        if let Some(tag) = definition
            .activation_required_tags
            .iter()
            .find(|t| !parts.tags.has_matching(t))
        {
            return Err(ActivationFailure::MissingTag(tag.clone()));
        }
        if let Some(tag) = definition
            .cooldown_tags()
            .iter()
            .find(|t| parts.tags.has_matching(t))
        {
            return Err(ActivationFailure::OnCooldown(tag.clone()));
        }

        let AbilitySpec {
            behavior,
            instance,
            handle,
            ..
        } = spec;
        let Some(mut ctx) = context(parts, &definition, *handle, instance) else {
            return Err(ActivationFailure::InvalidAvatar);
        };
        if !behavior.can_activate(&ctx) {
            return Err(ActivationFailure::BehaviorRejected);
        }

        if let Some(cost) = &definition.cost {
            let mut cost_spec = ctx.make_spec(Arc::clone(cost));
            behavior.modify_cost(&mut cost_spec, &ctx);
            check_cost(&cost_spec, &*ctx.attributes)?;
            ctx.apply_effect(cost_spec)
                .map_err(ActivationFailure::CostFailed)?;
        }
        if let Some(cooldown) = &definition.cooldown {
            let mut cooldown_spec = ctx.make_spec(Arc::clone(cooldown));
            behavior.modify_cooldown(&mut cooldown_spec, &ctx);
            ctx.apply_effect(cooldown_spec)
                .map_err(ActivationFailure::CooldownFailed)?;
        }

        instance.committed = true;
        instance.state = AbilityState::Committed;
        Ok(())
    }

    /// Owned tags, the activated notification, start and tracked effects.
    fn start(&mut self, index: usize, parts: &mut ActorParts<'_>) {
        let spec = &mut self.specs[index];
        let definition = Arc::clone(&spec.definition);

        parts.tags.add_tags(&definition.activation_owned_tags);
        spec.instance.owned_tags_applied = true;

        let activated = AbilityActivated {
            actor: parts.actor,
            ability: definition.id,
            handle: spec.handle,
            prediction_key: spec.instance.prediction_key,
        };

        let AbilitySpec { instance, handle, .. } = spec;
        if let Some(mut ctx) = context(parts, &definition, *handle, instance) {
            for effect in &definition.start_effects {
                let effect_spec = ctx.make_spec(Arc::clone(effect));
                if let Err(err) = ctx.apply_effect(effect_spec) {
                    warn!(ability = %definition.name, actor = %ctx.actor, effect = %effect.name, %err, "ability failed to apply startup effect");
                }
            }
            if definition.is_instanced() {
                for effect in &definition.tracked_effects {
                    let effect_spec = ctx.make_spec(Arc::clone(effect));
                    if let Err(err) = ctx.apply_tracked_effect(effect_spec) {
                        warn!(ability = %definition.name, actor = %ctx.actor, effect = %effect.name, %err, "ability failed to apply runtime effect");
                    }
                }
            } else if !definition.tracked_effects.is_empty() {
                debug!(ability = %definition.name, "non-instanced ability skips tracked effects");
            }
        }

        debug!(ability = %definition.name, actor = %parts.actor, key = ?activated.prediction_key, "ability activated");
        self.on_activated.broadcast(&activated);
    }

    fn apply_outcome(&mut self, index: usize, parts: &mut ActorParts<'_>, outcome: BehaviorOutcome) -> bool {
        match outcome {
            BehaviorOutcome::Continue => false,
            BehaviorOutcome::End => self.end_at(index, parts, false, true),
            BehaviorOutcome::Cancel => self.end_at(index, parts, true, true),
        }
    }

    fn fail(&mut self, index: usize, parts: &mut ActorParts<'_>, failure: ActivationFailure) -> ActivationOutcome {
        let spec = &self.specs[index];
        let definition = &spec.definition;
        match failure.kind() {
            FailureKind::Validation => {
                warn!(ability = %definition.name, actor = %parts.actor, %failure, "ability activation invalid")
            }
            FailureKind::Commit => {
                warn!(ability = %definition.name, actor = %parts.actor, %failure, "ability failed to commit")
            }
        }
        if parts.side.is_authority() && spec.instance.remote {
            if let Some(key) = spec.instance.prediction_key {
                self.outbox.push(NetMessage::ActivationRejected {
                    ability: definition.id,
                    key,
                });
            }
        }
        self.end_at(index, parts, true, false);
        ActivationOutcome::Failed(failure)
    }

    /// The cleanup funnel. `replicate` queues an `AbilityEnded` message for
    /// the other side when it knows about this activation.
    fn end_at(&mut self, index: usize, parts: &mut ActorParts<'_>, was_cancelled: bool, replicate: bool) -> bool {
        let spec = &mut self.specs[index];
        if !spec.instance.is_active() || spec.instance.state == AbilityState::Ending {
            return false;
        }
        spec.instance.state = AbilityState::Ending;
        let definition = Arc::clone(&spec.definition);
        let committed = spec.instance.committed;

        for handle in std::mem::take(&mut spec.instance.owned_handles) {
            parts.effects.remove(handle, parts.attributes, parts.tags);
        }

        let AbilitySpec {
            behavior,
            instance,
            handle,
            ..
        } = spec;
        if let Some(mut ctx) = context(parts, &definition, *handle, instance) {
            if committed {
                for effect in &definition.end_effects {
                    let effect_spec = ctx.make_spec(Arc::clone(effect));
                    if let Err(err) = ctx.apply_effect(effect_spec) {
                        warn!(ability = %definition.name, actor = %ctx.actor, effect = %effect.name, %err, "ability failed to apply end effect");
                    }
                }
            }
            behavior.on_ended(&mut ctx, was_cancelled);
        }
        // The end hook may have tracked more effects.
        for handle in std::mem::take(&mut instance.owned_handles) {
            parts.effects.remove(handle, parts.attributes, parts.tags);
        }

        if instance.owned_tags_applied {
            parts.tags.remove_tags(&definition.activation_owned_tags);
        }

        let key = instance.prediction_key;
        let remote = instance.remote;
        let handle = *handle;
        instance.finish();

        if replicate && committed {
            let notify_other_side = match parts.side {
                NetSide::Authority => remote,
                NetSide::Client => key.is_some(),
            };
            if notify_other_side {
                self.outbox.push(NetMessage::AbilityEnded {
                    ability: definition.id,
                    was_cancelled,
                });
            }
        }

        debug!(ability = %definition.name, actor = %parts.actor, was_cancelled, "ability ended");
        self.on_ended.broadcast(&AbilityEnded {
            actor: parts.actor,
            ability: definition.id,
            handle,
            was_cancelled,
        });
        true
    }
}
