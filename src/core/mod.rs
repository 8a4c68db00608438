//! Core types: actor ids, delegates, authority/prediction primitives,
//! configuration and small math helpers.
//!
//! Everything here is independent of abilities and effects; the higher-level
//! modules build on it.

pub mod config;
pub mod delegate;
pub mod entity;
pub mod math;
pub mod net;

pub use config::{CandidatePolicy, ConfigError, SystemConfig};
pub use delegate::{DelegateHandle, MulticastDelegate};
pub use entity::ActorId;
pub use math::Vec3;
pub use net::{NetSide, PredictionKey, PredictionKeyGenerator};
