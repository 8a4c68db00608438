//! The physical side of an actor: position, movement flags and ragdoll.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::abilities::{Avatar, InteractTarget, InteractableId};
use crate::core::{ActorId, Vec3};

use super::interactable::SharedInteractables;

/// Movement and physics state shared between an [`Actor`](super::Actor)
/// and the avatar its abilities act through.
#[derive(Clone, Debug, PartialEq)]
pub struct Body {
    pub location: Vec3,
    pub falling: bool,
    pub crouched: bool,
    /// Rotation follows movement. Turned off while the actor fires.
    pub orient_rotation_to_movement: bool,
    pub simulating_physics: bool,
    /// Seconds left before a ragdolled body is destroyed.
    pub life_span: Option<f32>,
    pub pending_destroy: bool,
    pub jumps: u32,
}

impl Body {
    pub fn new(location: Vec3) -> Self {
        Self {
            location,
            falling: false,
            crouched: false,
            orient_rotation_to_movement: true,
            simulating_physics: false,
            life_span: None,
            pending_destroy: false,
            jumps: 0,
        }
    }

    /// Hand the body to physics. Only the first call has any effect.
    pub fn start_ragdoll(&mut self, life_span: f32) -> bool {
        if self.simulating_physics {
            return false;
        }
        self.simulating_physics = true;
        self.life_span = Some(life_span);
        debug!(life_span, "ragdoll started");
        true
    }

    /// Count down the ragdoll life span. Returns `true` once it runs out.
    pub fn tick_life_span(&mut self, dt: f32) -> bool {
        let Some(remaining) = self.life_span.as_mut() else {
            return false;
        };
        *remaining -= dt;
        if *remaining <= 0.0 {
            self.life_span = None;
            self.pending_destroy = true;
            return true;
        }
        false
    }

    pub fn land(&mut self) {
        self.falling = false;
        self.jumps = 0;
    }
}

pub(crate) type SharedBody = Rc<RefCell<Body>>;

/// [`Avatar`] backed by a shared [`Body`]. Interactions go to the world's
/// interactables, measured from the body's location.
#[derive(Clone, Debug)]
pub struct BodyAvatar {
    actor: ActorId,
    body: SharedBody,
    interactables: SharedInteractables,
}

impl BodyAvatar {
    pub(crate) fn new(actor: ActorId, body: SharedBody, interactables: SharedInteractables) -> Self {
        Self {
            actor,
            body,
            interactables,
        }
    }
}

impl Avatar for BodyAvatar {
    fn is_valid(&self) -> bool {
        !self.body.borrow().pending_destroy
    }

    fn can_jump(&self) -> bool {
        let body = self.body.borrow();
        !body.crouched && !body.simulating_physics
    }

    fn can_crouch(&self) -> bool {
        !self.body.borrow().simulating_physics
    }

    fn is_falling(&self) -> bool {
        self.body.borrow().falling
    }

    fn jump(&mut self) {
        let mut body = self.body.borrow_mut();
        body.falling = true;
        body.jumps += 1;
    }

    fn crouch(&mut self) {
        self.body.borrow_mut().crouched = true;
    }

    fn uncrouch(&mut self) {
        self.body.borrow_mut().crouched = false;
    }

    fn interact_target(&self) -> Option<InteractTarget> {
        let location = self.body.borrow().location;
        self.interactables.borrow().best_target(self.actor, location)
    }

    fn interact(&mut self, target: InteractableId) -> bool {
        let location = self.body.borrow().location;
        self.interactables
            .borrow_mut()
            .execute(target, self.actor, location)
    }
}
