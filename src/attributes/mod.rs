//! Numeric attributes: identifiers, clamp rules and the per-actor store.

mod attribute;
mod clamp;
mod error;
mod store;

pub use attribute::{Attribute, ModOp, Modification};
pub use clamp::ClampRule;
pub use error::AttributeError;
pub use store::{AttributeChange, AttributeStore, ModifierSource};
