//! # rust-abilities
//!
//! A gameplay ability runtime: attributes, timed and infinite effects,
//! reference-counted status tags, abilities with cost/cooldown commits, enemy
//! target acquisition and item grants.
//!
//! ## Design Principles
//!
//! 1. **Data-Driven**: Effects, abilities and items are immutable
//!    definitions shared behind `Arc`s and loadable from JSON. Only the
//!    behavior hooks are code.
//!
//! 2. **One State Machine**: Every ability runs through the same
//!    activate → commit → end cycle. Ending always cleans up owned effects
//!    and tags, whether the ability finished or was cancelled.
//!
//! 3. **Authority Wins**: Clients predict under a prediction key; the
//!    authority confirms or rejects, and a rejection removes everything the
//!    key applied.
//!
//! 4. **Explicit Subscriptions**: Every notification is a
//!    subscribe/unsubscribe pair. Unsubscribing twice is a no-op.
//!
//! ## Modules
//!
//! - `core`: Actor ids, delegates, network roles, configuration, math
//! - `tags`: Hierarchical labels and the per-actor tag index
//! - `attributes`: Attribute values, modifiers and clamping
//! - `effects`: Effect definitions and the active effect table
//! - `abilities`: Ability definitions, behaviors and the runtime
//! - `system`: The per-actor `AbilitySystem` component
//! - `targeting`: Candidate scoring and rebind-on-death acquisition
//! - `items`: Stack counts and the grant bridge
//! - `content`: The definition catalog and the standard kit
//! - `world`: A minimal host owning actors

pub mod core;
pub mod tags;
pub mod attributes;
pub mod effects;
pub mod abilities;
pub mod system;
pub mod targeting;
pub mod items;
pub mod content;
pub mod world;

// Re-export commonly used types
pub use crate::core::{ActorId, NetSide, PredictionKey, SystemConfig, Vec3};

pub use crate::tags::{GameplayTag, StatusTagIndex, TagContainer, TagEventKind};

pub use crate::attributes::{Attribute, AttributeStore, ClampRule, ModOp};

pub use crate::effects::{
    ActiveEffectHandle, ApplicationFailure, DurationPolicy, EffectDefinition, EffectHandleTable, EffectId,
    EffectSpec,
};

pub use crate::abilities::{
    AbilityBehavior, AbilityDefinition, AbilityError, AbilityId, AbilityRuntime, AbilitySpecHandle,
    ActivationOutcome, Avatar, BehaviorRegistry, InputSlot, NetMessage,
};

pub use crate::system::AbilitySystem;

pub use crate::targeting::{Candidate, TargetAcquisition, TargetScorer};

pub use crate::items::{ItemContainer, ItemDefinition, ItemGrantBridge, ItemId};

pub use crate::content::Catalog;

pub use crate::world::{ActorKind, World, WorldError};
