//! The per-actor component tying attributes, tags, effects and abilities
//! together.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use rust_abilities::abilities::{BehaviorRegistry, NullAvatar};
//! use rust_abilities::attributes::{Attribute, AttributeStore, ModOp};
//! use rust_abilities::core::{ActorId, NetSide};
//! use rust_abilities::effects::{EffectDefinition, EffectId};
//! use rust_abilities::system::AbilitySystem;
//!
//! let mut system = AbilitySystem::new(
//!     ActorId(1),
//!     NetSide::Authority,
//!     AttributeStore::character(),
//!     Arc::new(BehaviorRegistry::with_builtins()),
//! )
//! .with_avatar(Box::new(NullAvatar));
//!
//! let hit = Arc::new(EffectDefinition::instant(EffectId(1), "Hit").with_modifier(Attribute::Health, ModOp::Add, -150.0));
//! let spec = system.make_outgoing_spec(hit);
//! system.apply_effect_to_self(spec).unwrap();
//! assert_eq!(system.value(Attribute::Health).unwrap(), 0.0);
//! ```

mod component;

pub use component::AbilitySystem;
