//! Actor identification.
//!
//! Every participant in the simulation (player pawn, enemy, pickup) is an
//! actor with a unique `ActorId`. IDs are allocated monotonically by the
//! [`World`](crate::world::World) in spawn order and are never recycled, so a
//! stale ID can always be detected as "no longer present".
//!
//! ## Usage
//!
//! ```
//! use rust_abilities::core::ActorId;
//!
//! let hero = ActorId::new(1);
//! let goblin = ActorId::new(2);
//!
//! assert!(hero < goblin); // spawned earlier
//! assert_eq!(hero.to_string(), "Actor(1)");
//! ```

use serde::{Deserialize, Serialize};

/// Unique identifier for an actor.
///
/// Ordering follows allocation order, which the world uses as its stable
/// enumeration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorId(pub u32);

impl ActorId {
    /// Create a new actor ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl From<u32> for ActorId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Actor({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_follows_allocation() {
        let mut ids = vec![ActorId::new(7), ActorId::new(2), ActorId::new(5)];
        ids.sort();
        assert_eq!(ids, vec![ActorId(2), ActorId(5), ActorId(7)]);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", ActorId(42)), "Actor(42)");
    }

    #[test]
    fn test_serialization() {
        let id = ActorId(123);
        let json = serde_json::to_string(&id).unwrap();
        let deserialized: ActorId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }
}
