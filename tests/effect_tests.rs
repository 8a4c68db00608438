//! Active effect table integration tests.
//!
//! These tests verify handle stability, idempotent removal, timed expiry
//! and prediction-key cleanup.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use rust_abilities::attributes::{Attribute, AttributeStore, ModOp};
use rust_abilities::core::{ActorId, PredictionKey};
use rust_abilities::effects::{
    ActiveEffectHandle, ApplicationFailure, DurationPolicy, EffectDefinition, EffectHandleTable, EffectId,
    EffectSpec, Magnitude,
};
use rust_abilities::tags::{GameplayTag, StatusTagIndex};

struct Target {
    attributes: AttributeStore,
    tags: StatusTagIndex,
    effects: EffectHandleTable,
}

impl Target {
    fn new() -> Self {
        Self {
            attributes: AttributeStore::character(),
            tags: StatusTagIndex::new(),
            effects: EffectHandleTable::new(ActorId(1)),
        }
    }

    fn apply(
        &mut self,
        definition: &Arc<EffectDefinition>,
        key: Option<PredictionKey>,
    ) -> Result<ActiveEffectHandle, ApplicationFailure> {
        let spec = EffectSpec::new(Arc::clone(definition));
        self.effects.apply(&mut self.attributes, &mut self.tags, spec, key)
    }
}

fn shield() -> Arc<EffectDefinition> {
    Arc::new(
        EffectDefinition::timed(EffectId(1), "Shield", 2.0)
            .with_granted_tag("State.Shielded")
            .with_modifier(Attribute::MaxHealth, ModOp::Add, 50.0),
    )
}

/// Test that removing a handle twice equals removing it once.
#[test]
fn test_double_remove_single_notification() {
    let mut target = Target::new();
    let removals = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&removals);
    target.effects.subscribe_removed(move |_| *sink.borrow_mut() += 1);

    let handle = target.apply(&shield(), None).unwrap();
    assert!(target.effects.remove(handle, &mut target.attributes, &mut target.tags));
    assert!(!target.effects.remove(handle, &mut target.attributes, &mut target.tags));

    assert_eq!(*removals.borrow(), 1);
    assert_eq!(target.attributes.value(Attribute::MaxHealth).unwrap(), 100.0);
    assert!(!target.tags.has_tag(&GameplayTag::new("State.Shielded")));
}

/// Test that a timed effect expires and withdraws its tags and modifiers.
#[test]
fn test_timed_expiry() {
    let mut target = Target::new();
    let handle = target.apply(&shield(), None).unwrap();
    assert_eq!(target.attributes.value(Attribute::MaxHealth).unwrap(), 150.0);

    assert!(target.effects.tick(1.5, &mut target.attributes, &mut target.tags).is_empty());
    assert_eq!(target.effects.remaining(handle), Some(0.5));

    let expired = target.effects.tick(0.5, &mut target.attributes, &mut target.tags);
    assert_eq!(expired, vec![handle]);
    assert!(!target.effects.contains(handle));
    assert_eq!(target.attributes.value(Attribute::MaxHealth).unwrap(), 100.0);
}

/// Test that handles are never reused.
#[test]
fn test_handles_are_unique() {
    let mut target = Target::new();
    let first = target.apply(&shield(), None).unwrap();
    target.effects.remove(first, &mut target.attributes, &mut target.tags);
    let second = target.apply(&shield(), None).unwrap();
    assert_ne!(first, second);
}

/// Test that a blocked effect leaves the target untouched.
#[test]
fn test_blocked_application_changes_nothing() {
    let mut target = Target::new();
    target.tags.add_tag(&GameplayTag::new("State.Dead"));
    let heal = Arc::new(
        EffectDefinition::instant(EffectId(2), "Heal")
            .with_modifier(Attribute::Health, ModOp::Add, 10.0)
            .with_blocked_tag("State.Dead"),
    );

    let err = target.apply(&heal, None).unwrap_err();
    assert!(matches!(err, ApplicationFailure::Immune { effect: EffectId(2), .. }));
    assert!(target.effects.is_empty());
}

/// Test that a missing set-by-caller magnitude fails the application.
#[test]
fn test_missing_set_by_caller() {
    let mut target = Target::new();
    let cooldown = Arc::new(
        EffectDefinition::new(EffectId(3), "Cooldown")
            .with_duration(DurationPolicy::HasDuration(Magnitude::SetByCaller("Data.Cooldown".into()))),
    );

    assert!(matches!(
        target.apply(&cooldown, None),
        Err(ApplicationFailure::MissingSetByCaller { .. })
    ));
}

/// Test that predicted handles are removed by key and confirmed ones kept.
#[test]
fn test_prediction_key_cleanup() {
    let mut target = Target::new();
    let rejected = PredictionKey(1);
    let confirmed = PredictionKey(2);
    let a = target.apply(&shield(), Some(rejected)).unwrap();
    let b = target.apply(&shield(), Some(confirmed)).unwrap();

    assert_eq!(target.effects.predicted_handles(rejected), vec![a]);
    assert_eq!(target.effects.remove_predicted(rejected, &mut target.attributes, &mut target.tags), 1);
    assert_eq!(target.effects.confirm_predicted(confirmed), 1);

    assert!(!target.effects.contains(a));
    assert!(target.effects.contains(b));
    assert!(target.effects.predicted_handles(confirmed).is_empty());
}

/// Test that a NaN damage magnitude neither heals nor kills.
#[test]
fn test_nan_damage_rejected() {
    let mut target = Target::new();
    let hurt = Arc::new(EffectDefinition::instant(EffectId(4), "Hurt").with_modifier(Attribute::Health, ModOp::Add, -30.0));
    target.apply(&hurt, None).unwrap();

    let mut spec = EffectSpec::new(Arc::new(
        EffectDefinition::instant(EffectId(5), "Corrupt").with_modifier_magnitude(
            Attribute::Health,
            ModOp::Add,
            Magnitude::SetByCaller("Data.Damage".into()),
        ),
    ));
    spec.set_by_caller("Data.Damage", f32::NAN);

    assert_eq!(
        target.effects.apply(&mut target.attributes, &mut target.tags, spec, None),
        Err(ApplicationFailure::NonFiniteMagnitude(EffectId(5)))
    );
    assert_eq!(target.attributes.value(Attribute::Health).unwrap(), 70.0);
}
