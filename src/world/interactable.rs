//! Objects placed in the world that actors can use: chests and dropped items.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, info};

use crate::abilities::{InteractTarget, InteractableId};
use crate::core::{ActorId, Vec3};
use crate::items::ItemId;

/// How close an interactor must stand, in world units.
pub const DEFAULT_INTERACT_RADIUS: f32 = 2.5;

/// What an executed interaction produced.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Interaction {
    /// A container opened, dropping a stack at its location.
    Opened { drop: Option<(ItemId, u32)> },
    /// The interactor picked up a stack.
    PickedUp { item: ItemId, count: u32 },
}

/// Something an actor can interact with.
pub trait Interactable: fmt::Debug {
    fn location(&self) -> Vec3;

    fn radius(&self) -> f32 {
        DEFAULT_INTERACT_RADIUS
    }

    /// Gold charged to the interactor.
    fn interact_cost(&self) -> f32 {
        0.0
    }

    fn can_interact(&self, interactor: ActorId) -> bool;

    /// Only called after [`can_interact`](Self::can_interact) returned `true`.
    fn execute_interact(&mut self, interactor: ActorId) -> Option<Interaction>;

    /// Undo a pickup the interactor could not take.
    fn restore(&mut self) {}
}

/// A chest that opens once, for a price, and drops its loot.
#[derive(Clone, Debug, PartialEq)]
pub struct Chest {
    location: Vec3,
    cost: f32,
    drop: Option<(ItemId, u32)>,
    opened: bool,
}

impl Chest {
    pub fn new(location: Vec3) -> Self {
        Self {
            location,
            cost: 0.0,
            drop: None,
            opened: false,
        }
    }

    #[must_use]
    pub fn with_cost(mut self, gold: f32) -> Self {
        self.cost = gold;
        self
    }

    #[must_use]
    pub fn with_drop(mut self, item: ItemId, count: u32) -> Self {
        self.drop = Some((item, count));
        self
    }

    pub fn is_opened(&self) -> bool {
        self.opened
    }
}

impl Interactable for Chest {
    fn location(&self) -> Vec3 {
        self.location
    }

    fn interact_cost(&self) -> f32 {
        self.cost
    }

    fn can_interact(&self, _interactor: ActorId) -> bool {
        !self.opened
    }

    fn execute_interact(&mut self, interactor: ActorId) -> Option<Interaction> {
        if self.opened {
            return None;
        }
        self.opened = true;
        debug!(%interactor, drop = ?self.drop, "chest opened");
        Some(Interaction::Opened { drop: self.drop })
    }
}

/// An item stack lying on the ground.
#[derive(Clone, Debug, PartialEq)]
pub struct WorldItem {
    location: Vec3,
    item: ItemId,
    count: u32,
    consumed: bool,
}

impl WorldItem {
    pub fn new(location: Vec3, item: ItemId, count: u32) -> Self {
        Self {
            location,
            item,
            count,
            consumed: false,
        }
    }

    pub fn item(&self) -> ItemId {
        self.item
    }
}

impl Interactable for WorldItem {
    fn location(&self) -> Vec3 {
        self.location
    }

    fn can_interact(&self, _interactor: ActorId) -> bool {
        !self.consumed && self.count > 0
    }

    fn execute_interact(&mut self, _interactor: ActorId) -> Option<Interaction> {
        if self.consumed {
            return None;
        }
        self.consumed = true;
        Some(Interaction::PickedUp {
            item: self.item,
            count: self.count,
        })
    }

    fn restore(&mut self) {
        self.consumed = false;
    }
}

/// A pickup waiting to be put into the interactor's container.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Pickup {
    pub source: InteractableId,
    pub actor: ActorId,
    pub item: ItemId,
    pub count: u32,
}

/// Every interactable in the world, keyed in placement order.
#[derive(Debug, Default)]
pub struct Interactables {
    entries: BTreeMap<InteractableId, Box<dyn Interactable>>,
    next: u32,
    pickups: Vec<Pickup>,
}

impl Interactables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, interactable: Box<dyn Interactable>) -> InteractableId {
        self.next += 1;
        let id = InteractableId(self.next);
        self.entries.insert(id, interactable);
        id
    }

    pub fn remove(&mut self, id: InteractableId) -> Option<Box<dyn Interactable>> {
        self.entries.remove(&id)
    }

    pub fn get(&self, id: InteractableId) -> Option<&dyn Interactable> {
        self.entries.get(&id).map(|entry| entry.as_ref())
    }

    pub fn ids(&self) -> Vec<InteractableId> {
        self.entries.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The nearest interactable in reach of `location` that accepts
    /// `interactor`. Ties go to the earliest placed.
    pub fn best_target(&self, interactor: ActorId, location: Vec3) -> Option<InteractTarget> {
        let mut best: Option<(InteractableId, f32, f32)> = None;
        for (&id, entry) in &self.entries {
            let distance = entry.location().distance_squared(location);
            if distance > entry.radius() * entry.radius() || !entry.can_interact(interactor) {
                continue;
            }
            match best {
                Some((_, nearest, _)) if nearest <= distance => {}
                _ => best = Some((id, distance, entry.interact_cost())),
            }
        }
        best.map(|(id, _, cost)| InteractTarget { id, cost })
    }

    /// Run an interaction, re-checking reach and acceptance first.
    ///
    /// An opened chest places its drop as a new [`WorldItem`]. A pickup is
    /// queued until the world delivers it to the interactor.
    pub fn execute(&mut self, id: InteractableId, interactor: ActorId, location: Vec3) -> bool {
        let Some(entry) = self.entries.get_mut(&id) else {
            return false;
        };
        let in_reach = entry.location().distance_squared(location) <= entry.radius() * entry.radius();
        if !in_reach || !entry.can_interact(interactor) {
            debug!(%interactor, target = %id, in_reach, "interaction refused");
            return false;
        }
        let origin = entry.location();
        match entry.execute_interact(interactor) {
            Some(Interaction::Opened { drop: Some((item, count)) }) => {
                let dropped = self.add(Box::new(WorldItem::new(origin, item, count)));
                info!(%interactor, source = %id, %item, count, %dropped, "loot dropped");
                true
            }
            Some(Interaction::Opened { drop: None }) => true,
            Some(Interaction::PickedUp { item, count }) => {
                self.pickups.push(Pickup {
                    source: id,
                    actor: interactor,
                    item,
                    count,
                });
                true
            }
            None => false,
        }
    }

    pub(crate) fn take_pickups(&mut self) -> Vec<Pickup> {
        std::mem::take(&mut self.pickups)
    }

    pub(crate) fn restore(&mut self, id: InteractableId) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.restore();
        }
    }
}

pub(crate) type SharedInteractables = Rc<RefCell<Interactables>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_open_candidate_wins() {
        let mut store = Interactables::new();
        let far = store.add(Box::new(Chest::new(Vec3::new(2.0, 0.0, 0.0)).with_cost(5.0)));
        let near = store.add(Box::new(Chest::new(Vec3::new(1.0, 0.0, 0.0))));
        let _out_of_reach = store.add(Box::new(Chest::new(Vec3::new(9.0, 0.0, 0.0))));
        let player = ActorId(1);

        assert_eq!(store.best_target(player, Vec3::ZERO).map(|t| t.id), Some(near));
        assert!(store.execute(near, player, Vec3::ZERO));
        assert_eq!(
            store.best_target(player, Vec3::ZERO),
            Some(InteractTarget { id: far, cost: 5.0 })
        );
    }

    #[test]
    fn test_chest_drops_world_item() {
        let mut store = Interactables::new();
        let chest = store.add(Box::new(Chest::new(Vec3::ZERO).with_drop(ItemId(3), 2)));
        let player = ActorId(1);

        assert!(store.execute(chest, player, Vec3::ZERO));
        assert!(!store.execute(chest, player, Vec3::ZERO));
        assert_eq!(store.len(), 2);

        let dropped = store.ids()[1];
        assert!(store.execute(dropped, player, Vec3::ZERO));
        assert_eq!(
            store.take_pickups(),
            vec![Pickup {
                source: dropped,
                actor: player,
                item: ItemId(3),
                count: 2,
            }]
        );
        assert!(!store.get(dropped).is_some_and(|item| item.can_interact(player)));

        store.restore(dropped);
        assert!(store.get(dropped).is_some_and(|item| item.can_interact(player)));
    }

    #[test]
    fn test_out_of_reach_refused() {
        let mut store = Interactables::new();
        let chest = store.add(Box::new(Chest::new(Vec3::new(5.0, 0.0, 0.0))));
        assert!(!store.execute(chest, ActorId(1), Vec3::ZERO));
        assert!(store.best_target(ActorId(1), Vec3::ZERO).is_none());
    }
}
