//! Active effect bookkeeping.
//!
//! Each actor owns one `EffectHandleTable` holding the effects currently
//! active on it. Applying an effect returns an [`ActiveEffectHandle`]; the
//! handle is the only way to remove that specific instance later.
//!
//! ## Handles
//!
//! Handles are allocated monotonically and never recycled, so a stale handle
//! can never alias a newer effect. Removing a handle that is unknown,
//! already removed, expired, or belongs to an instant effect is a no-op that
//! returns `false` and notifies nobody.
//!
//! ## Prediction
//!
//! Effects applied during a predicted activation carry the activation's
//! [`PredictionKey`]. If the authority rejects the activation,
//! [`EffectHandleTable::remove_predicted`] removes exactly those effects,
//! including ones applied fire-and-forget.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::attributes::{AttributeStore, ModifierSource};
use crate::core::{ActorId, DelegateHandle, MulticastDelegate, PredictionKey};
use crate::tags::{any_matches, GameplayTag, StatusTagIndex};

use super::definition::{EffectId, EffectSpec};
use super::error::ApplicationFailure;

/// Stable handle to one applied effect instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActiveEffectHandle(pub u64);

impl ActiveEffectHandle {
    /// Never issued by any table.
    pub const INVALID: Self = Self(0);

    /// Get the raw handle value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Check whether this handle could have been issued by a table.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }

    pub(crate) const fn modifier_source(self) -> ModifierSource {
        ModifierSource(self.0)
    }
}

impl std::fmt::Display for ActiveEffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ActiveEffect({})", self.0)
    }
}

/// An effect currently active on the table's owner.
#[derive(Clone, Debug)]
pub struct ActiveEffect {
    pub handle: ActiveEffectHandle,
    pub spec: EffectSpec,
    /// Seconds left for timed effects, `None` for infinite ones.
    pub remaining: Option<f32>,
    /// Set while the effect is provisional on a predicting client.
    pub prediction_key: Option<PredictionKey>,
}

impl ActiveEffect {
    #[must_use]
    pub fn effect_id(&self) -> EffectId {
        self.spec.definition.id
    }

    /// Check whether asset or granted tags match any tag in `query`.
    #[must_use]
    pub fn matches_any(&self, query: &[GameplayTag]) -> bool {
        let def = &self.spec.definition;
        any_matches(&def.asset_tags, query) || any_matches(&def.granted_tags, query)
    }
}

/// Why an active effect left the table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemovalReason {
    /// Removed through its handle.
    Explicit,
    /// Its duration ran out.
    Expired,
    /// Matched a "remove effects with tags" query.
    MatchedTags,
    /// Its predicted activation was rejected by the authority.
    PredictionRejected,
}

/// Notification that an effect was applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EffectApplied {
    /// Actor the effect landed on.
    pub target: ActorId,
    /// Handle of the application. Instant effects never become active, so
    /// theirs is never valid for removal.
    pub handle: ActiveEffectHandle,
    /// Definition that was applied.
    pub effect: EffectId,
    /// The effect changed base values and was not kept.
    pub instant: bool,
}

/// Notification that an active effect was removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EffectRemoved {
    /// Actor the effect was on.
    pub target: ActorId,
    /// Handle of the removed active effect.
    pub handle: ActiveEffectHandle,
    /// Definition of the removed effect.
    pub effect: EffectId,
    /// Why it was removed.
    pub reason: RemovalReason,
}

/// The active effects on one actor.
#[derive(Debug)]
pub struct EffectHandleTable {
    owner: ActorId,

    /// Active effects in application order.
    active: Vec<ActiveEffect>,

    next_handle: u64,

    on_applied: MulticastDelegate<EffectApplied>,
    on_removed: MulticastDelegate<EffectRemoved>,
}

impl EffectHandleTable {
    /// Create an empty table for `owner`.
    pub fn new(owner: ActorId) -> Self {
        Self {
            owner,
            active: Vec::new(),
            next_handle: 1,
            on_applied: MulticastDelegate::new(),
            on_removed: MulticastDelegate::new(),
        }
    }

    /// The actor this table belongs to.
    #[must_use]
    pub fn owner(&self) -> ActorId {
        self.owner
    }

    /// Apply an effect to the owner.
    ///
    /// Validation happens before anything is touched: a failed application
    /// leaves attributes, tags and the table unchanged.
    pub fn apply(
        &mut self,
        attributes: &mut AttributeStore,
        tags: &mut StatusTagIndex,
        spec: EffectSpec,
        prediction_key: Option<PredictionKey>,
    ) -> Result<ActiveEffectHandle, ApplicationFailure> {
        let def = &spec.definition;

        if let Some(missing) = def
            .application_required_tags
            .iter()
            .find(|t| !tags.has_matching(t))
        {
            return Err(ApplicationFailure::RequirementsNotMet {
                effect: def.id,
                missing: missing.clone(),
            });
        }
        if let Some(tag) = def
            .application_blocked_tags
            .iter()
            .find(|t| tags.has_matching(t))
        {
            return Err(ApplicationFailure::Immune {
                effect: def.id,
                tag: tag.clone(),
            });
        }
        if let Some(m) = def.modifiers.iter().find(|m| !attributes.contains(m.attribute)) {
            return Err(ApplicationFailure::UnknownAttribute {
                effect: def.id,
                attribute: m.attribute,
            });
        }
        let modifications = spec.resolve_modifiers()?;
        let duration = spec.resolve_duration()?;
        if modifications
            .iter()
            .map(|(_, m)| m.magnitude)
            .chain(duration)
            .any(|v| !v.is_finite())
        {
            return Err(ApplicationFailure::NonFiniteMagnitude(def.id));
        }

        let handle = ActiveEffectHandle(self.next_handle);
        self.next_handle += 1;
        let instigator = spec.context.instigator;
        let effect = def.id;
        let instant = def.is_instant();

        if instant {
            for (attribute, modification) in modifications {
                // Carried attributes were checked above.
                let _ = attributes.apply_modification_from(attribute, modification, instigator);
            }
            debug!(target_actor = %self.owner, %effect, %handle, "executed instant effect");
        } else {
            for (attribute, modification) in modifications {
                let _ = attributes.add_modifier(
                    attribute,
                    handle.modifier_source(),
                    modification,
                    instigator,
                );
            }
            tags.add_tags(&def.granted_tags);
            self.active.push(ActiveEffect {
                handle,
                spec,
                remaining: duration,
                prediction_key,
            });
            debug!(target_actor = %self.owner, %effect, %handle, ?duration, "applied effect");
        }

        self.on_applied.broadcast(&EffectApplied {
            target: self.owner,
            handle,
            effect,
            instant,
        });
        Ok(handle)
    }

    /// Remove one active effect. Returns `true` if this call removed it.
    pub fn remove(
        &mut self,
        handle: ActiveEffectHandle,
        attributes: &mut AttributeStore,
        tags: &mut StatusTagIndex,
    ) -> bool {
        match self.active.iter().position(|e| e.handle == handle) {
            Some(index) => {
                self.remove_at(index, RemovalReason::Explicit, attributes, tags);
                true
            }
            None => false,
        }
    }

    /// Remove every active effect whose asset or granted tags match `query`.
    pub fn remove_with_tags(
        &mut self,
        query: &[GameplayTag],
        attributes: &mut AttributeStore,
        tags: &mut StatusTagIndex,
    ) -> usize {
        self.remove_where(|e| e.matches_any(query), RemovalReason::MatchedTags, attributes, tags)
    }

    /// Remove every effect applied under `key`.
    pub fn remove_predicted(
        &mut self,
        key: PredictionKey,
        attributes: &mut AttributeStore,
        tags: &mut StatusTagIndex,
    ) -> usize {
        self.remove_where(
            |e| e.prediction_key == Some(key),
            RemovalReason::PredictionRejected,
            attributes,
            tags,
        )
    }

    /// The authority accepted `key`: its effects are no longer provisional.
    pub fn confirm_predicted(&mut self, key: PredictionKey) -> usize {
        let mut confirmed = 0;
        for effect in &mut self.active {
            if effect.prediction_key == Some(key) {
                effect.prediction_key = None;
                confirmed += 1;
            }
        }
        confirmed
    }

    /// Advance timed effects by `dt` seconds, removing the expired ones.
    pub fn tick(
        &mut self,
        dt: f32,
        attributes: &mut AttributeStore,
        tags: &mut StatusTagIndex,
    ) -> Vec<ActiveEffectHandle> {
        for effect in &mut self.active {
            if let Some(remaining) = effect.remaining.as_mut() {
                *remaining -= dt;
            }
        }
        let expired: Vec<ActiveEffectHandle> = self
            .active
            .iter()
            .filter(|e| e.remaining.is_some_and(|r| r <= 0.0))
            .map(|e| e.handle)
            .collect();
        for handle in &expired {
            if let Some(index) = self.active.iter().position(|e| e.handle == *handle) {
                self.remove_at(index, RemovalReason::Expired, attributes, tags);
            }
        }
        expired
    }

    /// Look up an active effect.
    #[must_use]
    pub fn get(&self, handle: ActiveEffectHandle) -> Option<&ActiveEffect> {
        self.active.iter().find(|e| e.handle == handle)
    }

    /// Check if `handle` is active.
    #[must_use]
    pub fn contains(&self, handle: ActiveEffectHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Seconds left on a timed effect.
    #[must_use]
    pub fn remaining(&self, handle: ActiveEffectHandle) -> Option<f32> {
        self.get(handle).and_then(|e| e.remaining)
    }

    /// Number of active instances of `effect`.
    #[must_use]
    pub fn count_of(&self, effect: EffectId) -> usize {
        self.active.iter().filter(|e| e.effect_id() == effect).count()
    }

    /// Handles still provisional under `key`.
    #[must_use]
    pub fn predicted_handles(&self, key: PredictionKey) -> Vec<ActiveEffectHandle> {
        self.active
            .iter()
            .filter(|e| e.prediction_key == Some(key))
            .map(|e| e.handle)
            .collect()
    }

    /// Iterate over active effects in application order.
    pub fn iter(&self) -> impl Iterator<Item = &ActiveEffect> {
        self.active.iter()
    }

    /// Number of active effects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Check if no effect is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Subscribe to application notifications.
    pub fn subscribe_applied(&mut self, callback: impl FnMut(&EffectApplied) + 'static) -> DelegateHandle {
        self.on_applied.add(callback)
    }

    /// Subscribe to removal notifications.
    pub fn subscribe_removed(&mut self, callback: impl FnMut(&EffectRemoved) + 'static) -> DelegateHandle {
        self.on_removed.add(callback)
    }

    /// Drop an application subscription.
    pub fn unsubscribe_applied(&mut self, handle: DelegateHandle) -> bool {
        self.on_applied.remove(handle)
    }

    /// Drop a removal subscription.
    pub fn unsubscribe_removed(&mut self, handle: DelegateHandle) -> bool {
        self.on_removed.remove(handle)
    }

    fn remove_where(
        &mut self,
        predicate: impl Fn(&ActiveEffect) -> bool,
        reason: RemovalReason,
        attributes: &mut AttributeStore,
        tags: &mut StatusTagIndex,
    ) -> usize {
        let handles: Vec<ActiveEffectHandle> = self
            .active
            .iter()
            .filter(|e| predicate(e))
            .map(|e| e.handle)
            .collect();
        for handle in &handles {
            if let Some(index) = self.active.iter().position(|e| e.handle == *handle) {
                self.remove_at(index, reason, attributes, tags);
            }
        }
        handles.len()
    }

    fn remove_at(
        &mut self,
        index: usize,
        reason: RemovalReason,
        attributes: &mut AttributeStore,
        tags: &mut StatusTagIndex,
    ) {
        let effect = self.active.remove(index);
        attributes.remove_modifiers(effect.handle.modifier_source(), effect.spec.context.instigator);
        tags.remove_tags(&effect.spec.definition.granted_tags);

        debug!(
            target_actor = %self.owner,
            effect = %effect.effect_id(),
            handle = %effect.handle,
            ?reason,
            "removed effect"
        );
        self.on_removed.broadcast(&EffectRemoved {
            target: self.owner,
            handle: effect.handle,
            effect: effect.effect_id(),
            reason,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::{Attribute, ModOp};
    use crate::effects::{EffectContext, EffectDefinition};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;

    struct Fixture {
        attributes: AttributeStore,
        tags: StatusTagIndex,
        table: EffectHandleTable,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                attributes: AttributeStore::character(),
                tags: StatusTagIndex::new(),
                table: EffectHandleTable::new(ActorId(1)),
            }
        }

        fn apply(&mut self, def: EffectDefinition) -> Result<ActiveEffectHandle, ApplicationFailure> {
            self.apply_predicted(def, None)
        }

        fn apply_predicted(
            &mut self,
            def: EffectDefinition,
            key: Option<PredictionKey>,
        ) -> Result<ActiveEffectHandle, ApplicationFailure> {
            let spec = EffectSpec::new(Arc::new(def)).with_context(EffectContext::from_actor(ActorId(1)));
            self.table.apply(&mut self.attributes, &mut self.tags, spec, key)
        }

        fn remove(&mut self, handle: ActiveEffectHandle) -> bool {
            self.table.remove(handle, &mut self.attributes, &mut self.tags)
        }
    }

    fn sprint() -> EffectDefinition {
        EffectDefinition::infinite(EffectId(1), "Sprint")
            .with_modifier(Attribute::MoveSpeedMultiplier, ModOp::Multiply, 1.5)
            .with_granted_tag("State.Sprinting")
    }

    #[test]
    fn test_instant_effect_is_not_stored() {
        let mut fx = Fixture::new();
        let damage = EffectDefinition::instant(EffectId(2), "Damage")
            .with_modifier(Attribute::Health, ModOp::Add, -150.0);

        let handle = fx.apply(damage).unwrap();

        assert!(handle.is_valid());
        assert!(fx.table.is_empty());
        assert_eq!(fx.attributes.value(Attribute::Health).unwrap(), 0.0);
        assert!(!fx.remove(handle));
    }

    #[test]
    fn test_infinite_effect_modifies_and_tags() {
        let mut fx = Fixture::new();
        let handle = fx.apply(sprint()).unwrap();

        assert!(fx.table.contains(handle));
        assert_eq!(fx.attributes.value(Attribute::MoveSpeedMultiplier).unwrap(), 1.5);
        assert!(fx.tags.has_tag(&"State.Sprinting".into()));

        assert!(fx.remove(handle));
        assert_eq!(fx.attributes.value(Attribute::MoveSpeedMultiplier).unwrap(), 1.0);
        assert!(!fx.tags.has_tag(&"State.Sprinting".into()));
    }

    #[test]
    fn test_double_remove_notifies_once() {
        let mut fx = Fixture::new();
        let removed = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&removed);
        fx.table.subscribe_removed(move |e| sink.borrow_mut().push(e.handle));

        let handle = fx.apply(sprint()).unwrap();
        assert!(fx.remove(handle));
        assert!(!fx.remove(handle));
        assert!(!fx.remove(ActiveEffectHandle::INVALID));

        assert_eq!(*removed.borrow(), vec![handle]);
    }

    #[test]
    fn test_handles_never_reused() {
        let mut fx = Fixture::new();
        let first = fx.apply(sprint()).unwrap();
        fx.remove(first);
        let second = fx.apply(sprint()).unwrap();
        assert!(second > first);
    }

    #[test]
    fn test_immunity_and_requirements() {
        let mut fx = Fixture::new();
        fx.tags.add_tag(&"State.Dead".into());

        let heal = EffectDefinition::instant(EffectId(3), "Heal")
            .with_modifier(Attribute::Health, ModOp::Add, 10.0)
            .with_blocked_tag("State.Dead");
        assert!(matches!(fx.apply(heal), Err(ApplicationFailure::Immune { .. })));

        let revive = EffectDefinition::instant(EffectId(4), "Revive").with_required_tag("State.Downed");
        assert_eq!(
            fx.apply(revive),
            Err(ApplicationFailure::RequirementsNotMet {
                effect: EffectId(4),
                missing: "State.Downed".into(),
            })
        );
    }

    #[test]
    fn test_unknown_attribute_rejected_without_side_effects() {
        let mut fx = Fixture {
            attributes: AttributeStore::enemy(),
            ..Fixture::new()
        };
        let loot = EffectDefinition::infinite(EffectId(5), "Loot")
            .with_modifier(Attribute::Health, ModOp::Add, 5.0)
            .with_modifier(Attribute::Gold, ModOp::Add, 5.0)
            .with_granted_tag("State.Looted");

        let err = fx.apply(loot).unwrap_err();
        assert_eq!(
            err,
            ApplicationFailure::UnknownAttribute {
                effect: EffectId(5),
                attribute: Attribute::Gold,
            }
        );
        assert!(fx.table.is_empty());
        assert!(fx.tags.is_empty());
        assert_eq!(fx.attributes.modifier_count(Attribute::Health), 0);
    }

    #[test]
    fn test_non_finite_magnitude_rejected() {
        let mut fx = Fixture::new();
        let poison = EffectDefinition::instant(EffectId(8), "Poison").with_modifier(Attribute::Health, ModOp::Add, f32::NAN);
        assert_eq!(fx.apply(poison), Err(ApplicationFailure::NonFiniteMagnitude(EffectId(8))));
        assert_eq!(fx.attributes.value(Attribute::Health).unwrap(), 100.0);

        let forever = EffectDefinition::timed(EffectId(9), "Forever", f32::NAN).with_granted_tag("State.Stuck");
        assert_eq!(fx.apply(forever), Err(ApplicationFailure::NonFiniteMagnitude(EffectId(9))));
        assert!(fx.table.is_empty());
        assert!(!fx.tags.has_tag(&"State.Stuck".into()));
    }

    #[test]
    fn test_timed_effect_expires() {
        let mut fx = Fixture::new();
        let cooldown = EffectDefinition::timed(EffectId(6), "Cooldown", 1.0).with_granted_tag("Cooldown.Attack");
        let handle = fx.apply(cooldown).unwrap();

        assert!(fx.table.tick(0.6, &mut fx.attributes, &mut fx.tags).is_empty());
        assert!(fx.tags.has_tag(&"Cooldown.Attack".into()));

        assert_eq!(fx.table.tick(0.6, &mut fx.attributes, &mut fx.tags), vec![handle]);
        assert!(!fx.tags.has_tag(&"Cooldown.Attack".into()));
        // Explicit removal racing natural expiry is harmless.
        assert!(!fx.remove(handle));
    }

    #[test]
    fn test_remove_with_tags_is_hierarchical() {
        let mut fx = Fixture::new();
        let jump = EffectDefinition::infinite(EffectId(7), "Jump")
            .with_granted_tag("State.InAir")
            .with_granted_tag("State.InAir.Jumping");
        fx.apply(jump).unwrap();
        let sprint_handle = fx.apply(sprint()).unwrap();

        let removed = fx
            .table
            .remove_with_tags(&["State.InAir".into()], &mut fx.attributes, &mut fx.tags);

        assert_eq!(removed, 1);
        assert!(!fx.tags.has_matching(&"State.InAir".into()));
        assert!(fx.table.contains(sprint_handle));
    }

    #[test]
    fn test_predicted_effects_removed_or_confirmed() {
        let mut fx = Fixture::new();
        let key = PredictionKey(3);
        let a = fx.apply_predicted(sprint(), Some(key)).unwrap();
        let b = fx.apply_predicted(sprint(), Some(PredictionKey(4))).unwrap();

        assert_eq!(fx.table.predicted_handles(key), vec![a]);
        assert_eq!(fx.table.remove_predicted(key, &mut fx.attributes, &mut fx.tags), 1);
        assert!(!fx.table.contains(a));

        assert_eq!(fx.table.confirm_predicted(PredictionKey(4)), 1);
        assert_eq!(fx.table.get(b).unwrap().prediction_key, None);
        assert_eq!(fx.table.remove_predicted(PredictionKey(4), &mut fx.attributes, &mut fx.tags), 0);
    }

    #[test]
    fn test_applied_notification() {
        let mut fx = Fixture::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let sub = fx.table.subscribe_applied(move |e| sink.borrow_mut().push(e.instant));

        fx.apply(sprint()).unwrap();
        fx.apply(EffectDefinition::instant(EffectId(8), "Noop")).unwrap();
        assert!(fx.table.unsubscribe_applied(sub));
        fx.apply(sprint()).unwrap();

        assert_eq!(*seen.borrow(), vec![false, true]);
    }
}
