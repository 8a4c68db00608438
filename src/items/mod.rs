//! Items: definitions, per-actor stack counts and the grant bridge.
//!
//! An [`ItemContainer`] only counts stacks. The [`ItemGrantBridge`] turns
//! the resulting [`StackChange`]s into effect applications and ability
//! grants on the holder's [`AbilitySystem`](crate::system::AbilitySystem).

mod bridge;
mod container;
mod definition;
mod error;

pub use bridge::{GrantReport, ItemGrantBridge, ItemGrants, ItemRemovalPolicy, RetainGrants, RevokeGrants};
pub use container::{ItemContainer, StackChange};
pub use definition::{ItemDefinition, ItemId};
pub use error::ItemError;
