//! Effect system: definitions, specs and the per-actor handle table.
//!
//! Effects are the only way gameplay changes attributes. Abilities and items
//! build an [`EffectSpec`] from an immutable [`EffectDefinition`] and apply
//! it to a target's [`EffectHandleTable`].

mod definition;
mod error;
mod table;

pub use definition::{DurationPolicy, EffectContext, EffectDefinition, EffectId, EffectSpec, Magnitude, ModifierDef};
pub use error::ApplicationFailure;
pub use table::{
    ActiveEffect, ActiveEffectHandle, EffectApplied, EffectHandleTable, EffectRemoved, RemovalReason,
};
