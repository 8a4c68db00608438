//! Actors owned by a [`World`](super::World).

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::abilities::SharedBehaviors;
use crate::attributes::{Attribute, AttributeStore};
use crate::core::{ActorId, NetSide, SystemConfig, Vec3};
use crate::items::{ItemContainer, ItemGrantBridge};
use crate::system::AbilitySystem;
use crate::tags::TagEventKind;
use crate::targeting::Candidate;

use super::body::{Body, BodyAvatar, SharedBody};
use super::interactable::SharedInteractables;

/// Who controls an actor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorKind {
    Player,
    Npc,
}

impl ActorKind {
    /// Attribute set an actor of this kind starts with.
    #[must_use]
    pub fn attributes(self) -> AttributeStore {
        match self {
            ActorKind::Player => AttributeStore::character(),
            ActorKind::Npc => AttributeStore::enemy(),
        }
    }
}

/// One character in the world.
///
/// The body is shared with the avatar inside the ability system, so
/// movement requests made by abilities show up here. Two tag watchers keep
/// the body in step with the status tags: the firing tag turns
/// rotation-to-movement off, the ragdoll tag hands the body to physics.
#[derive(Debug)]
pub struct Actor {
    id: ActorId,
    kind: ActorKind,
    body: SharedBody,
    system: AbilitySystem,
    items: ItemContainer,
    grants: ItemGrantBridge,
    exploded: bool,
}

impl Actor {
    pub(crate) fn new(
        id: ActorId,
        kind: ActorKind,
        location: Vec3,
        side: NetSide,
        config: Arc<SystemConfig>,
        behaviors: SharedBehaviors,
        interactables: SharedInteractables,
    ) -> Self {
        let body = Rc::new(RefCell::new(Body::new(location)));
        let avatar = BodyAvatar::new(id, Rc::clone(&body), interactables);
        let mut system = AbilitySystem::new(id, side, kind.attributes(), behaviors)
            .with_config(Arc::clone(&config))
            .with_avatar(Box::new(avatar));

        let firing = Rc::clone(&body);
        system.subscribe_tag(&config.firing_tag, TagEventKind::NewOrRemoved, move |change| {
            firing.borrow_mut().orient_rotation_to_movement = change.new_count == 0;
        });

        let ragdoll = Rc::clone(&body);
        let life_span = config.ragdoll_life_span;
        system.subscribe_tag(&config.ragdoll_tag, TagEventKind::NewOrRemoved, move |change| {
            if change.appeared() {
                ragdoll.borrow_mut().start_ragdoll(life_span);
            }
        });

        Self {
            id,
            kind,
            body,
            system,
            items: ItemContainer::new(id),
            grants: ItemGrantBridge::new(),
            exploded: false,
        }
    }

    #[must_use]
    pub fn id(&self) -> ActorId {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> ActorKind {
        self.kind
    }

    /// Snapshot of the body.
    #[must_use]
    pub fn body(&self) -> Body {
        self.body.borrow().clone()
    }

    #[must_use]
    pub fn location(&self) -> Vec3 {
        self.body.borrow().location
    }

    pub fn set_location(&mut self, location: Vec3) {
        self.body.borrow_mut().location = location;
    }

    /// Not pending destruction.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.body.borrow().pending_destroy
    }

    #[must_use]
    pub fn orients_rotation_to_movement(&self) -> bool {
        self.body.borrow().orient_rotation_to_movement
    }

    #[must_use]
    pub fn is_ragdoll(&self) -> bool {
        self.body.borrow().simulating_physics
    }

    #[must_use]
    pub fn has_exploded(&self) -> bool {
        self.exploded
    }

    pub(crate) fn mark_exploded(&mut self) {
        self.exploded = true;
    }

    #[must_use]
    pub fn system(&self) -> &AbilitySystem {
        &self.system
    }

    pub fn system_mut(&mut self) -> &mut AbilitySystem {
        &mut self.system
    }

    #[must_use]
    pub fn items(&self) -> &ItemContainer {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut ItemContainer {
        &mut self.items
    }

    #[must_use]
    pub fn grants(&self) -> &ItemGrantBridge {
        &self.grants
    }

    /// Replace the item grant bridge, e.g. to install a removal policy.
    pub fn set_grants(&mut self, grants: ItemGrantBridge) {
        self.grants = grants;
    }

    /// Split borrow used when a stack change must reach the ability system.
    pub(crate) fn inventory_parts(&mut self) -> (&mut ItemContainer, &mut ItemGrantBridge, &mut AbilitySystem) {
        (&mut self.items, &mut self.grants, &mut self.system)
    }

    pub(crate) fn land(&mut self) -> usize {
        self.body.borrow_mut().land();
        self.system.landed()
    }

    pub(crate) fn tick_life_span(&mut self, dt: f32) -> bool {
        self.body.borrow_mut().tick_life_span(dt)
    }

    /// How an observer sees this actor.
    #[must_use]
    pub fn candidate(&self) -> Candidate {
        let mut candidate = Candidate::new(self.id, self.location());
        if let Ok(health) = self.system.value(Attribute::Health) {
            candidate = candidate.with_health(health);
        }
        if self.system.is_dead() {
            candidate = candidate.dead();
        }
        if !self.is_valid() {
            candidate = candidate.invalid();
        }
        candidate
    }
}
