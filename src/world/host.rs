//! A minimal host that owns actors and drives target acquisition.

use std::cell::Ref;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::abilities::{BehaviorRegistry, InteractableId, SharedBehaviors};
use crate::content::Catalog;
use crate::core::{ActorId, CandidatePolicy, DelegateHandle, NetSide, SystemConfig, Vec3};
use crate::effects::{ActiveEffectHandle, ApplicationFailure, EffectContext, EffectDefinition, EffectSpec};
use crate::items::{GrantReport, ItemId, StackChange};
use crate::system::AbilitySystem;
use crate::targeting::{Candidate, TargetAcquired, TargetAcquisition, TargetHost};

use super::actor::{Actor, ActorKind};
use super::error::WorldError;
use super::interactable::{Interactable, Interactables, SharedInteractables};

/// [`TargetHost`] over the actor map, borrowed apart from the acquisitions.
struct Actors<'a>(&'a mut BTreeMap<ActorId, Actor>);

impl TargetHost for Actors<'_> {
    fn system_mut(&mut self, actor: ActorId) -> Option<&mut AbilitySystem> {
        self.0.get_mut(&actor).map(Actor::system_mut)
    }
}

/// Owns every actor of one simulation.
///
/// Actor ids are handed out in increasing order, so iterating the actor map
/// enumerates actors in spawn order. That order breaks ties between equally
/// scored target candidates.
///
/// Every NPC gets a [`TargetAcquisition`]. Target deaths are drained after
/// each world operation and the affected observers reacquire. Mutable
/// access to an actor only goes through [`with_actor`](Self::with_actor)
/// and [`with_system`](Self::with_system), which settle afterwards too.
#[derive(Debug)]
pub struct World {
    side: NetSide,
    config: Arc<SystemConfig>,
    behaviors: SharedBehaviors,
    catalog: Arc<Catalog>,
    actors: BTreeMap<ActorId, Actor>,
    acquisitions: BTreeMap<ActorId, TargetAcquisition>,
    interactables: SharedInteractables,
    next_actor: u32,
}

impl World {
    /// An authoritative world with the standard catalog and builtin behaviors.
    pub fn new() -> Self {
        Self {
            side: NetSide::Authority,
            config: Arc::new(SystemConfig::default()),
            behaviors: Arc::new(BehaviorRegistry::with_builtins()),
            catalog: Arc::new(Catalog::standard()),
            actors: BTreeMap::new(),
            acquisitions: BTreeMap::new(),
            interactables: Rc::default(),
            next_actor: 1,
        }
    }

    /// Use `config` for every actor spawned afterwards (builder pattern).
    pub fn with_config(mut self, config: SystemConfig) -> Result<Self, WorldError> {
        config.validate()?;
        self.config = Arc::new(config);
        Ok(self)
    }

    /// Use `catalog`, checking that every ability's behavior resolves.
    pub fn with_catalog(mut self, catalog: Catalog) -> Result<Self, WorldError> {
        catalog.validate_behaviors(&self.behaviors)?;
        self.catalog = Arc::new(catalog);
        Ok(self)
    }

    /// Use `behaviors` (builder pattern). Set it before the catalog.
    #[must_use]
    pub fn with_behaviors(mut self, behaviors: SharedBehaviors) -> Self {
        self.behaviors = behaviors;
        self
    }

    /// Run as a client: actors predict and forward instead of deciding.
    #[must_use]
    pub fn with_side(mut self, side: NetSide) -> Self {
        self.side = side;
        self
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
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    // === Actors ===

    /// Spawn an actor and grant its kind's starting kit.
    ///
    /// NPCs scan for a target immediately and again after the configured
    /// initial delay, since actors spawned in the same frame may not be
    /// present for the first scan.
    pub fn spawn(&mut self, kind: ActorKind, location: Vec3) -> ActorId {
        let id = ActorId(self.next_actor);
        self.next_actor += 1;

        let mut actor = Actor::new(
            id,
            kind,
            location,
            self.side,
            Arc::clone(&self.config),
            Arc::clone(&self.behaviors),
            Rc::clone(&self.interactables),
        );
        let kit = match kind {
            ActorKind::Player => self.catalog.player_kit(),
            ActorKind::Npc => self.catalog.npc_kit(),
        };
        for ability in kit {
            if let Err(err) = actor.system_mut().grant_ability(Arc::clone(&ability)) {
                warn!(actor = %id, ability = %ability.name, %err, "could not grant starting ability");
            }
        }
        self.actors.insert(id, actor);
        info!(actor = %id, ?kind, "spawned actor");

        if kind == ActorKind::Npc {
            let mut acquisition = TargetAcquisition::new(id, self.config.dead_tag.clone());
            if let Some(delay) = self.config.initial_acquire_delay {
                acquisition.schedule(delay);
            }
            self.acquisitions.insert(id, acquisition);
            self.reacquire(id);
        }
        self.settle();
        id
    }

    /// Remove an actor. Observers bound to it lose their target and
    /// reacquire.
    pub fn destroy(&mut self, id: ActorId) -> Result<(), WorldError> {
        if let Some(mut acquisition) = self.acquisitions.remove(&id) {
            acquisition.unbind(&mut Actors(&mut self.actors));
        }
        if self.actors.remove(&id).is_none() {
            return Err(WorldError::UnknownActor(id));
        }
        info!(actor = %id, "destroyed actor");

        let observers: Vec<ActorId> = self
            .acquisitions
            .iter_mut()
            .filter_map(|(observer, acquisition)| acquisition.target_destroyed(id).then_some(*observer))
            .collect();
        for observer in observers {
            self.reacquire(observer);
        }
        self.settle();
        Ok(())
    }

    #[must_use]
    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.actors.get(&id)
    }

    /// Run `f` on an actor, then deliver pending pickups and rebind
    /// observers whose target died.
    pub fn with_actor<R>(&mut self, id: ActorId, f: impl FnOnce(&mut Actor) -> R) -> Result<R, WorldError> {
        let actor = self.actors.get_mut(&id).ok_or(WorldError::UnknownActor(id))?;
        let result = f(actor);
        self.settle();
        Ok(result)
    }

    #[must_use]
    pub fn system(&self, id: ActorId) -> Option<&AbilitySystem> {
        self.actors.get(&id).map(Actor::system)
    }

    /// Run `f` on an actor's ability system. Settles like
    /// [`with_actor`](Self::with_actor).
    pub fn with_system<R>(
        &mut self,
        id: ActorId,
        f: impl FnOnce(&mut AbilitySystem) -> R,
    ) -> Result<R, WorldError> {
        self.with_actor(id, |actor| f(actor.system_mut()))
    }

    /// Actors in spawn order.
    pub fn actors(&self) -> impl Iterator<Item = &Actor> {
        self.actors.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.actors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    pub fn set_location(&mut self, id: ActorId, location: Vec3) -> Result<(), WorldError> {
        self.actors
            .get_mut(&id)
            .ok_or(WorldError::UnknownActor(id))?
            .set_location(location);
        Ok(())
    }

    // === Gameplay ===

    /// Apply `definition` from `source` to another actor.
    ///
    /// The effect is built with `source` as instigator. A missing target, or
    /// one pending destruction, fails with
    /// [`ApplicationFailure::InvalidTarget`].
    pub fn apply_effect_to_target(
        &mut self,
        source: ActorId,
        target: ActorId,
        definition: Arc<EffectDefinition>,
    ) -> Result<ActiveEffectHandle, ApplicationFailure> {
        let context = EffectContext::from_actor(source);
        let spec = EffectSpec::new(definition).with_context(context);
        self.apply_spec(target, spec)
    }

    /// Tell an actor it touched the ground. Returns the number of in-air
    /// effects removed.
    pub fn notify_landed(&mut self, id: ActorId) -> Result<usize, WorldError> {
        let removed = self.actors.get_mut(&id).ok_or(WorldError::UnknownActor(id))?.land();
        self.settle();
        Ok(removed)
    }

    /// Give `count` units of a catalog item to an actor and apply its grants.
    pub fn add_item(&mut self, id: ActorId, item: ItemId, count: u32) -> Result<(StackChange, GrantReport), WorldError> {
        let given = self.give_item(id, item, count);
        self.settle();
        given
    }

    /// Take up to `count` units of an item from an actor.
    pub fn remove_item(&mut self, id: ActorId, item: ItemId, count: u32) -> Result<StackChange, WorldError> {
        let definition = self.catalog.require_item(item)?;
        let actor = self.actors.get_mut(&id).ok_or(WorldError::UnknownActor(id))?;
        let (items, grants, system) = actor.inventory_parts();
        let change = items.remove(item, count)?;
        grants.apply_change(&definition, change, system);
        self.settle();
        Ok(change)
    }

    // === Interactables ===

    /// Place an interactable. Actors within its radius can use it through
    /// their interact ability.
    pub fn add_interactable(&mut self, interactable: Box<dyn Interactable>) -> InteractableId {
        let id = self.interactables.borrow_mut().add(interactable);
        info!(interactable = %id, "placed interactable");
        id
    }

    pub fn remove_interactable(&mut self, id: InteractableId) -> bool {
        self.interactables.borrow_mut().remove(id).is_some()
    }

    #[must_use]
    pub fn interactables(&self) -> Ref<'_, Interactables> {
        self.interactables.borrow()
    }

    /// `false` for unknown ids.
    #[must_use]
    pub fn can_interact(&self, id: InteractableId, actor: ActorId) -> bool {
        self.interactables
            .borrow()
            .get(id)
            .is_some_and(|interactable| interactable.can_interact(actor))
    }

    /// Blow up `id`, applying `effect` to every live actor within `radius`.
    ///
    /// Only the authority explodes, and each actor at most once. The effect
    /// context carries the exploding actor as instigator and its location
    /// as origin. Returns the actors the effect was applied to.
    pub fn explode(
        &mut self,
        id: ActorId,
        radius: f32,
        effect: Arc<EffectDefinition>,
    ) -> Result<Vec<ActorId>, WorldError> {
        if !self.side.is_authority() {
            return Ok(Vec::new());
        }
        let actor = self.actors.get_mut(&id).ok_or(WorldError::UnknownActor(id))?;
        if actor.has_exploded() {
            return Ok(Vec::new());
        }
        actor.mark_exploded();
        let origin = actor.location();

        let radius_squared = radius * radius;
        let mut affected = Vec::new();
        for (other, actor) in &self.actors {
            if *other == id || affected.contains(other) {
                continue;
            }
            if !actor.candidate().is_eligible() {
                continue;
            }
            if actor.location().distance_squared(origin) <= radius_squared {
                affected.push(*other);
            }
        }

        let context = EffectContext::from_actor(id).with_origin(origin);
        let mut applied = Vec::with_capacity(affected.len());
        for target in affected {
            let spec = EffectSpec::new(Arc::clone(&effect)).with_context(context);
            match self.apply_spec(target, spec) {
                Ok(_) => applied.push(target),
                Err(err) => warn!(actor = %id, %target, %err, "explosion effect failed"),
            }
        }
        info!(actor = %id, radius, hit = applied.len(), "exploded");
        Ok(applied)
    }

    /// Advance every actor by `dt` seconds: timed effects, delayed
    /// acquisitions and ragdoll life spans.
    pub fn tick(&mut self, dt: f32) {
        let mut expired = Vec::new();
        for (id, actor) in &mut self.actors {
            actor.system_mut().tick(dt);
            if actor.tick_life_span(dt) {
                expired.push(*id);
            }
        }

        let due: Vec<ActorId> = self
            .acquisitions
            .iter_mut()
            .filter_map(|(observer, acquisition)| acquisition.tick(dt).then_some(*observer))
            .collect();
        for observer in due {
            debug!(%observer, "delayed reacquisition");
            self.reacquire(observer);
        }

        for id in expired {
            if let Err(err) = self.destroy(id) {
                warn!(actor = %id, %err, "expired actor already gone");
            }
        }
        self.settle();
    }

    // === Targeting ===

    /// The target `observer` is bound to.
    #[must_use]
    pub fn target_of(&self, observer: ActorId) -> Option<ActorId> {
        self.acquisitions.get(&observer).and_then(TargetAcquisition::target)
    }

    #[must_use]
    pub fn acquisition(&self, observer: ActorId) -> Option<&TargetAcquisition> {
        self.acquisitions.get(&observer)
    }

    /// Candidates `observer` may target, in spawn order.
    #[must_use]
    pub fn candidates_for(&self, observer: ActorId) -> Vec<Candidate> {
        self.actors
            .values()
            .filter(|actor| actor.id() != observer)
            .filter(|actor| match self.config.candidate_policy {
                CandidatePolicy::PlayersOnly => actor.kind() == ActorKind::Player,
                CandidatePolicy::AnyOther => true,
            })
            .map(Actor::candidate)
            .collect()
    }

    /// Rescan for `observer`. Returns its new target.
    pub fn reacquire(&mut self, observer: ActorId) -> Option<ActorId> {
        let origin = self.actors.get(&observer)?.location();
        let candidates = self.candidates_for(observer);
        let acquisition = self.acquisitions.get_mut(&observer)?;
        acquisition.reacquire(origin, &candidates, &mut Actors(&mut self.actors))
    }

    pub fn subscribe_target_acquired(
        &mut self,
        observer: ActorId,
        callback: impl FnMut(&TargetAcquired) + 'static,
    ) -> Result<DelegateHandle, WorldError> {
        let acquisition = self
            .acquisitions
            .get_mut(&observer)
            .ok_or(WorldError::UnknownActor(observer))?;
        Ok(acquisition.subscribe_acquired(callback))
    }

    pub fn unsubscribe_target_acquired(&mut self, observer: ActorId, handle: DelegateHandle) -> bool {
        self.acquisitions
            .get_mut(&observer)
            .is_some_and(|acquisition| acquisition.unsubscribe_acquired(handle))
    }

    fn apply_spec(&mut self, target: ActorId, spec: EffectSpec) -> Result<ActiveEffectHandle, ApplicationFailure> {
        let actor = self
            .actors
            .get_mut(&target)
            .filter(|actor| actor.is_valid())
            .ok_or(ApplicationFailure::InvalidTarget(target))?;
        let result = actor.system_mut().apply_effect_to_self(spec);
        self.settle();
        result
    }

    fn give_item(&mut self, id: ActorId, item: ItemId, count: u32) -> Result<(StackChange, GrantReport), WorldError> {
        let definition = self.catalog.require_item(item)?;
        let actor = self.actors.get_mut(&id).ok_or(WorldError::UnknownActor(id))?;
        let (items, grants, system) = actor.inventory_parts();
        let change = items.add(&definition, count)?;
        let report = grants.apply_change(&definition, change, system);
        Ok((change, report))
    }

    /// Work left over by the last operation: pickups, then target deaths.
    fn settle(&mut self) {
        self.deliver_pickups();
        self.refresh_targets();
    }

    /// A picked up item leaves the world only once the interactor's
    /// container took it.
    fn deliver_pickups(&mut self) {
        let pickups = self.interactables.borrow_mut().take_pickups();
        for pickup in pickups {
            match self.give_item(pickup.actor, pickup.item, pickup.count) {
                Ok((change, _)) => {
                    self.interactables.borrow_mut().remove(pickup.source);
                    info!(actor = %pickup.actor, item = %pickup.item, stack = change.new, "picked up item");
                }
                Err(err) => {
                    self.interactables.borrow_mut().restore(pickup.source);
                    warn!(actor = %pickup.actor, item = %pickup.item, %err, "pickup refused");
                }
            }
        }
    }

    /// Reacquire for every observer whose bound target died. Repeats until
    /// no deaths are pending, since a rebind can land on a target that dies
    /// in the same step.
    fn refresh_targets(&mut self) {
        for _ in 0..=self.actors.len() {
            let died: Vec<ActorId> = self
                .acquisitions
                .iter_mut()
                .filter_map(|(observer, acquisition)| acquisition.poll_target_died().then_some(*observer))
                .collect();
            if died.is_empty() {
                return;
            }
            for observer in died {
                self.reacquire(observer);
            }
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
