//! Target acquisition integration tests.
//!
//! These tests verify scoring, rebind-on-death and the delegate contract,
//! both against a hand-built host and through the world.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use rust_abilities::abilities::BehaviorRegistry;
use rust_abilities::attributes::{Attribute, AttributeStore, ModOp};
use rust_abilities::core::{ActorId, NetSide, Vec3};
use rust_abilities::effects::{EffectDefinition, EffectId};
use rust_abilities::system::AbilitySystem;
use rust_abilities::tags::GameplayTag;
use rust_abilities::targeting::{
    Candidate, LowestHealthScorer, TargetAcquired, TargetAcquisition, TargetHost,
};
use rust_abilities::world::{ActorKind, World};

struct Host {
    systems: FxHashMap<ActorId, AbilitySystem>,
}

impl TargetHost for Host {
    fn system_mut(&mut self, actor: ActorId) -> Option<&mut AbilitySystem> {
        self.systems.get_mut(&actor)
    }
}

impl Host {
    fn new(ids: &[u32]) -> Self {
        let behaviors = Arc::new(BehaviorRegistry::new());
        let systems = ids
            .iter()
            .map(|id| {
                let actor = ActorId(*id);
                let system = AbilitySystem::new(actor, NetSide::Authority, AttributeStore::enemy(), Arc::clone(&behaviors));
                (actor, system)
            })
            .collect();
        Self { systems }
    }

    fn mark_dead(&mut self, actor: ActorId) {
        let dead = Arc::new(EffectDefinition::infinite(EffectId(1), "Dead").with_granted_tag("State.Dead"));
        let system = self.systems.get_mut(&actor).unwrap();
        let spec = system.make_outgoing_spec(dead);
        system.apply_effect_to_self(spec).unwrap();
    }
}

fn dead_tag() -> GameplayTag {
    GameplayTag::new("State.Dead")
}

/// Test that three candidates at 5, 2 and 9 select 2, then 5 once 2 dies.
#[test]
fn test_nearest_then_rebind_on_death() {
    let mut world = World::new();
    let five = world.spawn(ActorKind::Player, Vec3::new(5.0, 0.0, 0.0));
    let two = world.spawn(ActorKind::Player, Vec3::new(0.0, 2.0, 0.0));
    let _nine = world.spawn(ActorKind::Player, Vec3::new(0.0, 0.0, 9.0));
    let enemy = world.spawn(ActorKind::Npc, Vec3::ZERO);
    assert_eq!(world.target_of(enemy), Some(two));

    let kill = Arc::new(
        EffectDefinition::instant(EffectId(99), "Kill").with_modifier(Attribute::Health, ModOp::Add, -500.0),
    );
    world.apply_effect_to_target(enemy, two, kill).unwrap();

    assert!(world.system(two).unwrap().is_dead());
    assert_eq!(world.target_of(enemy), Some(five));
}

/// Test that the delegate reports each binding change.
#[test]
fn test_acquired_notifications() {
    let observer = ActorId(100);
    let mut host = Host::new(&[1, 2]);
    let mut acquisition = TargetAcquisition::new(observer, dead_tag());
    let seen: Rc<RefCell<Vec<TargetAcquired>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let handle = acquisition.subscribe_acquired(move |event| sink.borrow_mut().push(*event));

    let candidates = [
        Candidate::new(ActorId(1), Vec3::new(1.0, 0.0, 0.0)),
        Candidate::new(ActorId(2), Vec3::new(3.0, 0.0, 0.0)),
    ];
    acquisition.reacquire(Vec3::ZERO, &candidates, &mut host);
    // Same winner: no new notification.
    acquisition.reacquire(Vec3::ZERO, &candidates, &mut host);
    assert_eq!(seen.borrow().len(), 1);

    host.mark_dead(ActorId(1));
    assert!(acquisition.poll_target_died());
    let candidates = [candidates[0].dead(), candidates[1]];
    acquisition.reacquire(Vec3::ZERO, &candidates, &mut host);

    assert_eq!(
        *seen.borrow(),
        vec![
            TargetAcquired { observer, previous: None, target: Some(ActorId(1)) },
            TargetAcquired { observer, previous: Some(ActorId(1)), target: Some(ActorId(2)) },
        ]
    );
    assert!(acquisition.unsubscribe_acquired(handle));
    assert!(!acquisition.unsubscribe_acquired(handle));
}

/// Test that unbinding drops the subscription on the old target.
#[test]
fn test_rebind_releases_old_subscription() {
    let mut host = Host::new(&[1, 2]);
    let mut acquisition = TargetAcquisition::new(ActorId(100), dead_tag());

    assert!(acquisition.bind(ActorId(1), &mut host));
    assert_eq!(host.systems[&ActorId(1)].tags().subscriber_count(&dead_tag()), 1);

    assert!(acquisition.bind(ActorId(2), &mut host));
    assert_eq!(host.systems[&ActorId(1)].tags().subscriber_count(&dead_tag()), 0);
    assert_eq!(host.systems[&ActorId(2)].tags().subscriber_count(&dead_tag()), 1);

    // A death on the old target is no longer reported.
    host.mark_dead(ActorId(1));
    assert!(!acquisition.poll_target_died());
}

/// Test that binding an already dead target reports it straight away.
#[test]
fn test_bind_dead_target_reports_immediately() {
    let mut host = Host::new(&[1]);
    host.mark_dead(ActorId(1));
    let mut acquisition = TargetAcquisition::new(ActorId(100), dead_tag());

    assert!(acquisition.bind(ActorId(1), &mut host));
    assert!(acquisition.poll_target_died());
}

/// Test the pluggable scorer.
#[test]
fn test_lowest_health_scorer() {
    let mut host = Host::new(&[1, 2]);
    let mut acquisition = TargetAcquisition::new(ActorId(100), dead_tag()).with_scorer(Box::new(LowestHealthScorer));
    let candidates = [
        Candidate::new(ActorId(1), Vec3::new(1.0, 0.0, 0.0)).with_health(80.0),
        Candidate::new(ActorId(2), Vec3::new(50.0, 0.0, 0.0)).with_health(20.0),
    ];

    assert_eq!(acquisition.reacquire(Vec3::ZERO, &candidates, &mut host), Some(ActorId(2)));
}

/// Test that NPCs ignore other NPCs under the default candidate policy.
#[test]
fn test_npcs_do_not_target_each_other() {
    let mut world = World::new();
    let first = world.spawn(ActorKind::Npc, Vec3::ZERO);
    let second = world.spawn(ActorKind::Npc, Vec3::new(1.0, 0.0, 0.0));

    assert_eq!(world.target_of(first), None);
    assert_eq!(world.target_of(second), None);
    assert!(world.candidates_for(first).is_empty());
}
