//! A minimal host world.
//!
//! [`World`] owns actors, enumerates them in spawn order and routes the
//! things that cross actor boundaries: effects applied to another actor,
//! landing, destruction, target acquisition for NPCs and interactables
//! such as [`Chest`] and [`WorldItem`]. Each [`Actor`] pairs an
//! [`AbilitySystem`](crate::system::AbilitySystem) with a [`Body`] and an
//! item container.
//!
//! ## Example
//!
//! ```
//! use rust_abilities::core::Vec3;
//! use rust_abilities::world::{ActorKind, World};
//!
//! let mut world = World::new();
//! let player = world.spawn(ActorKind::Player, Vec3::new(2.0, 0.0, 0.0));
//! let enemy = world.spawn(ActorKind::Npc, Vec3::ZERO);
//! assert_eq!(world.target_of(enemy), Some(player));
//! ```

mod actor;
mod body;
mod error;
mod host;
mod interactable;

pub use actor::{Actor, ActorKind};
pub use body::{Body, BodyAvatar};
pub use error::WorldError;
pub use host::World;
pub use interactable::{Chest, Interactable, Interactables, Interaction, WorldItem, DEFAULT_INTERACT_RADIUS};
