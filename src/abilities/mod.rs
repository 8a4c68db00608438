//! Abilities: definitions, behaviors and the activation runtime.
//!
//! An ability is granted to an actor from a shared [`AbilityDefinition`].
//! Every grant is driven by the same [`AbilityRuntime`] state machine; the
//! ability-specific parts come from an [`AbilityBehavior`] resolved through
//! a [`BehaviorRegistry`].
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use rust_abilities::abilities::{AbilityDefinition, AbilityId, AbilityRuntime, ActorParts, BehaviorRegistry, NullAvatar};
//! use rust_abilities::attributes::AttributeStore;
//! use rust_abilities::core::{ActorId, NetSide};
//! use rust_abilities::effects::EffectHandleTable;
//! use rust_abilities::tags::{GameplayTag, StatusTagIndex};
//!
//! let actor = ActorId(1);
//! let mut runtime = AbilityRuntime::new(actor, Arc::new(BehaviorRegistry::with_builtins()));
//! let dash = AbilityDefinition::new(AbilityId(1), "Dash").with_owned_tag("State.Dashing");
//! let handle = runtime.grant(Arc::new(dash)).unwrap();
//!
//! let mut attributes = AttributeStore::character();
//! let mut tags = StatusTagIndex::new();
//! let mut effects = EffectHandleTable::new(actor);
//! let mut avatar = NullAvatar;
//! let mut parts = ActorParts {
//!     actor,
//!     side: NetSide::Authority,
//!     attributes: &mut attributes,
//!     tags: &mut tags,
//!     effects: &mut effects,
//!     avatar: Some(&mut avatar),
//! };
//!
//! assert!(runtime.try_activate(handle, &mut parts).unwrap().is_activated());
//! assert!(parts.tags.has_tag(&GameplayTag::new("State.Dashing")));
//!
//! runtime.cancel_ability(handle, &mut parts).unwrap();
//! assert!(!parts.tags.has_tag(&GameplayTag::new("State.Dashing")));
//! ```

mod behavior;
mod behaviors;
mod definition;
mod error;
mod instance;
mod interact;
mod message;
mod runtime;

pub use behavior::{
    AbilityBehavior, AbilityContext, Avatar, BehaviorFactory, BehaviorOutcome, BehaviorRegistry, NullAvatar,
    SharedBehaviors,
};
pub use behaviors::{
    BasicBehavior, CrouchBehavior, DeathBehavior, JumpBehavior, PrimaryAttackBehavior, SprintBehavior,
    COOLDOWN_DATA_KEY,
};
pub use definition::{AbilityDefinition, AbilityId, InputSlot, InstancingPolicy, NetExecutionPolicy};
pub use error::{AbilityError, ActivationFailure, FailureKind};
pub use instance::{AbilityInstance, AbilitySpecHandle, AbilityState};
pub use interact::{InteractBehavior, InteractTarget, InteractableId, GOLD_COST_DATA_KEY};
pub use message::{NetError, NetMessage};
pub use runtime::{AbilityActivated, AbilityEnded, AbilityRuntime, AbilitySpec, ActivationOutcome, ActorParts};
