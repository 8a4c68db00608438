//! Attribute storage with post-modification clamping.
//!
//! Every attribute has a *base* value, changed permanently by instant
//! modifications, and a *current* value: the base aggregated with the
//! modifiers contributed by active duration/infinite effects.
//!
//! ## Aggregation
//!
//! - If any override modifier is present, the most recently added one wins.
//! - Otherwise `current = (base + Σ add) × Π multiply`.
//!
//! ## Write ordering
//!
//! 1. The raw value is written.
//! 2. The attribute's [`ClampRule`] is enforced on base and current.
//! 3. Subscribers receive an [`AttributeChange`] carrying the final value.
//! 4. Attributes clamped against this one (Health against MaxHealth) are
//!    re-clamped, notifying in turn.
//!
//! Subscribers therefore never observe an out-of-range value.
//!
//! ```
//! use rust_abilities::attributes::{Attribute, AttributeStore, Modification};
//!
//! let mut store = AttributeStore::character();
//! assert_eq!(store.value(Attribute::Health).unwrap(), 100.0);
//!
//! let health = store
//!     .apply_modification(Attribute::Health, Modification::add(-150.0))
//!     .unwrap();
//! assert_eq!(health, 0.0);
//! ```

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::core::{ActorId, DelegateHandle, MulticastDelegate};

use super::attribute::{Attribute, ModOp, Modification};
use super::clamp::ClampRule;
use super::error::AttributeError;

/// Identifies who contributed a modifier, so it can be withdrawn later.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModifierSource(pub u64);

/// Payload delivered to attribute subscribers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AttributeChange {
    pub attribute: Attribute,
    pub old_value: f32,
    pub new_value: f32,
    /// The actor whose effect caused the change, when known.
    pub instigator: Option<ActorId>,
}

#[derive(Clone, Debug)]
struct AttributeSlot {
    base: f32,
    current: f32,
    clamp: ClampRule,
    modifiers: Vec<(ModifierSource, Modification)>,
}

impl AttributeSlot {
    fn evaluate(&self, base: f32) -> f32 {
        if let Some((_, m)) = self
            .modifiers
            .iter()
            .rev()
            .find(|(_, m)| m.op == ModOp::Override)
        {
            return m.magnitude;
        }
        let mut additive = 0.0;
        let mut multiplier = 1.0;
        for (_, m) in &self.modifiers {
            match m.op {
                ModOp::Add => additive += m.magnitude,
                ModOp::Multiply => multiplier *= m.magnitude,
                ModOp::Override => {}
            }
        }
        (base + additive) * multiplier
    }
}

/// The numeric attributes of one actor.
#[derive(Debug, Default)]
pub struct AttributeStore {
    slots: FxHashMap<Attribute, AttributeSlot>,
    listeners: FxHashMap<Attribute, MulticastDelegate<AttributeChange>>,
}

impl AttributeStore {
    /// Create a store carrying no attributes.
    pub fn new() -> Self {
        Self::default()
    }

    /// The full player character set.
    pub fn character() -> Self {
        Self::new()
            .with_attribute(Attribute::MaxHealth, 100.0, ClampRule::AtLeast(0.0))
            .with_attribute(
                Attribute::Health,
                100.0,
                ClampRule::Between {
                    min: 0.0,
                    max: Attribute::MaxHealth,
                },
            )
            .with_attribute(Attribute::MaxStamina, 100.0, ClampRule::AtLeast(0.0))
            .with_attribute(
                Attribute::Stamina,
                100.0,
                ClampRule::Between {
                    min: 0.0,
                    max: Attribute::MaxStamina,
                },
            )
            .with_attribute(Attribute::BaseMoveSpeed, 600.0, ClampRule::AtLeast(0.0))
            .with_attribute(Attribute::MoveSpeedMultiplier, 1.0, ClampRule::AtLeast(0.0))
            .with_attribute(Attribute::MaxJumpCount, 1.0, ClampRule::AtLeast(0.0))
            .with_attribute(Attribute::Gold, 0.0, ClampRule::AtLeast(0.0))
            .with_attribute(Attribute::AttackPower, 10.0, ClampRule::Unclamped)
            .with_attribute(Attribute::DamageMultiplier, 1.0, ClampRule::Unclamped)
            .with_attribute(Attribute::CooldownReduction, 0.0, ClampRule::Unclamped)
    }

    /// The reduced enemy set: vitals only.
    pub fn enemy() -> Self {
        Self::new()
            .with_attribute(Attribute::MaxHealth, 100.0, ClampRule::AtLeast(0.0))
            .with_attribute(
                Attribute::Health,
                100.0,
                ClampRule::Between {
                    min: 0.0,
                    max: Attribute::MaxHealth,
                },
            )
    }

    /// Define an attribute (builder pattern).
    #[must_use]
    pub fn with_attribute(mut self, attribute: Attribute, base: f32, clamp: ClampRule) -> Self {
        self.define(attribute, base, clamp);
        self
    }

    /// Define or redefine an attribute. Existing modifiers are dropped and no
    /// change event fires; this is setup, not gameplay.
    pub fn define(&mut self, attribute: Attribute, base: f32, clamp: ClampRule) {
        let upper = clamp
            .bound()
            .and_then(|b| self.slots.get(&b))
            .map(|s| s.current);
        let value = clamp.apply(base, upper);
        self.slots.insert(
            attribute,
            AttributeSlot {
                base: value,
                current: value,
                clamp,
                modifiers: Vec::new(),
            },
        );
    }

    /// Check if the store carries `attribute`.
    #[must_use]
    pub fn contains(&self, attribute: Attribute) -> bool {
        self.slots.contains_key(&attribute)
    }

    /// Current (aggregated, clamped) value.
    pub fn value(&self, attribute: Attribute) -> Result<f32, AttributeError> {
        self.slot(attribute).map(|s| s.current)
    }

    /// Base value, ignoring active modifiers.
    pub fn base_value(&self, attribute: Attribute) -> Result<f32, AttributeError> {
        self.slot(attribute).map(|s| s.base)
    }

    /// Current value, or `default` when the attribute is not carried.
    #[must_use]
    pub fn value_or(&self, attribute: Attribute, default: f32) -> f32 {
        self.value(attribute).unwrap_or(default)
    }

    /// Permanently modify the base value. Returns the post-clamp current value.
    pub fn apply_modification(
        &mut self,
        attribute: Attribute,
        modification: Modification,
    ) -> Result<f32, AttributeError> {
        self.apply_modification_from(attribute, modification, None)
    }

    /// Like [`apply_modification`](Self::apply_modification), recording who
    /// caused the change.
    pub fn apply_modification_from(
        &mut self,
        attribute: Attribute,
        modification: Modification,
        instigator: Option<ActorId>,
    ) -> Result<f32, AttributeError> {
        if !modification.magnitude.is_finite() {
            return Err(AttributeError::NonFinite(attribute));
        }
        let slot = self.slot_mut(attribute)?;
        slot.base = modification.apply(slot.base);
        self.refresh(attribute, instigator);
        self.value(attribute)
    }

    /// Add a temporary modifier owned by `source`.
    pub fn add_modifier(
        &mut self,
        attribute: Attribute,
        source: ModifierSource,
        modification: Modification,
        instigator: Option<ActorId>,
    ) -> Result<f32, AttributeError> {
        if !modification.magnitude.is_finite() {
            return Err(AttributeError::NonFinite(attribute));
        }
        self.slot_mut(attribute)?
            .modifiers
            .push((source, modification));
        self.refresh(attribute, instigator);
        self.value(attribute)
    }

    /// Withdraw every modifier owned by `source`. Returns how many were removed.
    pub fn remove_modifiers(&mut self, source: ModifierSource, instigator: Option<ActorId>) -> usize {
        let mut removed = 0;
        let mut touched = Vec::new();
        for attribute in Attribute::ALL {
            if let Some(slot) = self.slots.get_mut(&attribute) {
                let before = slot.modifiers.len();
                slot.modifiers.retain(|(s, _)| *s != source);
                if slot.modifiers.len() != before {
                    removed += before - slot.modifiers.len();
                    touched.push(attribute);
                }
            }
        }
        for attribute in touched {
            self.refresh(attribute, instigator);
        }
        removed
    }

    /// Number of active modifiers on `attribute`.
    #[must_use]
    pub fn modifier_count(&self, attribute: Attribute) -> usize {
        self.slots.get(&attribute).map_or(0, |s| s.modifiers.len())
    }

    /// Subscribe to value changes of `attribute`.
    pub fn subscribe(
        &mut self,
        attribute: Attribute,
        callback: impl FnMut(&AttributeChange) + 'static,
    ) -> Result<DelegateHandle, AttributeError> {
        self.slot(attribute)?;
        Ok(self.listeners.entry(attribute).or_default().add(callback))
    }

    /// Drop a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, attribute: Attribute, handle: DelegateHandle) -> bool {
        self.listeners
            .get_mut(&attribute)
            .is_some_and(|d| d.remove(handle))
    }

    /// Current values of every carried attribute, in declaration order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(Attribute, f32)> {
        Attribute::ALL
            .iter()
            .filter_map(|a| self.slots.get(a).map(|s| (*a, s.current)))
            .collect()
    }

    fn slot(&self, attribute: Attribute) -> Result<&AttributeSlot, AttributeError> {
        self.slots
            .get(&attribute)
            .ok_or(AttributeError::UnknownAttribute(attribute))
    }

    fn slot_mut(&mut self, attribute: Attribute) -> Result<&mut AttributeSlot, AttributeError> {
        self.slots
            .get_mut(&attribute)
            .ok_or(AttributeError::UnknownAttribute(attribute))
    }

    /// Re-evaluate and clamp one attribute, notify, then cascade to the
    /// attributes bounded by it.
    fn refresh(&mut self, attribute: Attribute, instigator: Option<ActorId>) {
        let Some(slot) = self.slots.get(&attribute) else {
            return;
        };
        let upper = slot
            .clamp
            .bound()
            .and_then(|b| self.slots.get(&b))
            .map(|s| s.current);
        let base = slot.clamp.apply(slot.base, upper);
        let current = slot.clamp.apply(slot.evaluate(base), upper);
        let old_value = slot.current;

        let Some(slot) = self.slots.get_mut(&attribute) else {
            return;
        };
        slot.base = base;
        slot.current = current;

        if old_value == current {
            return;
        }

        if let Some(delegate) = self.listeners.get_mut(&attribute) {
            delegate.broadcast(&AttributeChange {
                attribute,
                old_value,
                new_value: current,
                instigator,
            });
        }

        let dependents: Vec<Attribute> = Attribute::ALL
            .into_iter()
            .filter(|a| *a != attribute)
            .filter(|a| {
                self.slots
                    .get(a)
                    .is_some_and(|s| s.clamp.bound() == Some(attribute))
            })
            .collect();
        for dependent in dependents {
            self.refresh(dependent, instigator);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn record(store: &mut AttributeStore, attribute: Attribute) -> Rc<RefCell<Vec<(f32, f32)>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        store
            .subscribe(attribute, move |c| sink.borrow_mut().push((c.old_value, c.new_value)))
            .unwrap();
        log
    }

    #[test]
    fn test_overshoot_clamps_to_zero() {
        let mut store = AttributeStore::character();
        let log = record(&mut store, Attribute::Health);

        let value = store
            .apply_modification(Attribute::Health, Modification::add(-150.0))
            .unwrap();

        assert_eq!(value, 0.0);
        assert_eq!(store.base_value(Attribute::Health).unwrap(), 0.0);
        assert_eq!(*log.borrow(), vec![(100.0, 0.0)]);
    }

    #[test]
    fn test_heal_clamps_to_max() {
        let mut store = AttributeStore::character();
        store
            .apply_modification(Attribute::Health, Modification::add(-30.0))
            .unwrap();
        let value = store
            .apply_modification(Attribute::Health, Modification::add(500.0))
            .unwrap();
        assert_eq!(value, 100.0);
    }

    #[test]
    fn test_unknown_attribute_is_error() {
        let mut store = AttributeStore::enemy();
        let err = store
            .apply_modification(Attribute::Gold, Modification::add(5.0))
            .unwrap_err();
        assert_eq!(err, AttributeError::UnknownAttribute(Attribute::Gold));
        assert!(store.value(Attribute::Gold).is_err());
        assert!(store.subscribe(Attribute::Gold, |_| {}).is_err());
    }

    #[test]
    fn test_non_finite_modification_rejected() {
        let mut store = AttributeStore::character();
        store
            .apply_modification(Attribute::Health, Modification::add(-30.0))
            .unwrap();

        let err = store
            .apply_modification(Attribute::Health, Modification::add(f32::NAN))
            .unwrap_err();
        assert_eq!(err, AttributeError::NonFinite(Attribute::Health));
        assert!(store
            .add_modifier(
                Attribute::MaxHealth,
                ModifierSource(1),
                Modification::add(f32::INFINITY),
                None,
            )
            .is_err());
        assert_eq!(store.value(Attribute::Health).unwrap(), 70.0);
        assert_eq!(store.value(Attribute::MaxHealth).unwrap(), 100.0);
    }

    #[test]
    fn test_gold_never_negative() {
        let mut store = AttributeStore::character();
        store
            .apply_modification(Attribute::Gold, Modification::add(10.0))
            .unwrap();
        let gold = store
            .apply_modification(Attribute::Gold, Modification::add(-25.0))
            .unwrap();
        assert_eq!(gold, 0.0);
    }

    #[test]
    fn test_no_event_when_value_unchanged() {
        let mut store = AttributeStore::character();
        let log = record(&mut store, Attribute::Health);

        store
            .apply_modification(Attribute::Health, Modification::add(50.0))
            .unwrap();
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_lowering_max_reclamps_dependent() {
        let mut store = AttributeStore::character();
        let log = record(&mut store, Attribute::Health);

        store
            .apply_modification(Attribute::MaxHealth, Modification::override_with(40.0))
            .unwrap();

        assert_eq!(store.value(Attribute::Health).unwrap(), 40.0);
        assert_eq!(*log.borrow(), vec![(100.0, 40.0)]);
    }

    #[test]
    fn test_modifiers_aggregate_and_withdraw() {
        let mut store = AttributeStore::character();
        let haste = ModifierSource(1);
        let slow = ModifierSource(2);

        store
            .add_modifier(Attribute::BaseMoveSpeed, haste, Modification::add(100.0), None)
            .unwrap();
        store
            .add_modifier(Attribute::BaseMoveSpeed, slow, Modification::multiply(0.5), None)
            .unwrap();
        assert_eq!(store.value(Attribute::BaseMoveSpeed).unwrap(), 350.0);
        assert_eq!(store.base_value(Attribute::BaseMoveSpeed).unwrap(), 600.0);

        assert_eq!(store.remove_modifiers(slow, None), 1);
        assert_eq!(store.value(Attribute::BaseMoveSpeed).unwrap(), 700.0);
        assert_eq!(store.remove_modifiers(slow, None), 0);
    }

    #[test]
    fn test_override_wins() {
        let mut store = AttributeStore::character();
        store
            .add_modifier(Attribute::AttackPower, ModifierSource(1), Modification::add(5.0), None)
            .unwrap();
        store
            .add_modifier(
                Attribute::AttackPower,
                ModifierSource(2),
                Modification::override_with(1.0),
                None,
            )
            .unwrap();
        assert_eq!(store.value(Attribute::AttackPower).unwrap(), 1.0);
        store.remove_modifiers(ModifierSource(2), None);
        assert_eq!(store.value(Attribute::AttackPower).unwrap(), 15.0);
    }

    #[test]
    fn test_unsubscribe() {
        let mut store = AttributeStore::character();
        let handle = store.subscribe(Attribute::Gold, |_| {}).unwrap();
        assert!(store.unsubscribe(Attribute::Gold, handle));
        assert!(!store.unsubscribe(Attribute::Gold, handle));
        assert!(!store.unsubscribe(Attribute::Stamina, handle));
    }

    #[test]
    fn test_instigator_forwarded() {
        let mut store = AttributeStore::enemy();
        let seen = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&seen);
        store
            .subscribe(Attribute::Health, move |c| *sink.borrow_mut() = c.instigator)
            .unwrap();

        store
            .apply_modification_from(Attribute::Health, Modification::add(-1.0), Some(ActorId(9)))
            .unwrap();
        assert_eq!(*seen.borrow(), Some(ActorId(9)));
    }

    #[test]
    fn test_snapshot_order() {
        let store = AttributeStore::enemy();
        assert_eq!(
            store.snapshot(),
            vec![(Attribute::Health, 100.0), (Attribute::MaxHealth, 100.0)]
        );
    }
}
