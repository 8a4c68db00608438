//! Item definitions.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::abilities::AbilityDefinition;
use crate::effects::EffectDefinition;

/// Unique identifier for an item definition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub u32);

impl ItemId {
    /// Create a new item ID.
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

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Item({})", self.0)
    }
}

fn one() -> u32 {
    1
}

/// What an item is. Carries no runtime state; stack counts live in an
/// [`ItemContainer`](super::ItemContainer).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemDefinition {
    pub id: ItemId,
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// At least 1.
    #[serde(default = "one")]
    pub max_stack: u32,

    /// Applied to the holder once per unit gained.
    #[serde(default)]
    pub granted_effects: Vec<Arc<EffectDefinition>>,

    /// Granted to the holder when the first unit is gained.
    #[serde(default)]
    pub granted_abilities: Vec<Arc<AbilityDefinition>>,
}

impl ItemDefinition {
    /// Create a non-stacking item with no grants.
    pub fn new(id: ItemId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            max_stack: 1,
            granted_effects: Vec::new(),
            granted_abilities: Vec::new(),
        }
    }

    /// Set the stack limit, at least 1 (builder pattern).
    #[must_use]
    pub fn with_max_stack(mut self, max_stack: u32) -> Self {
        self.max_stack = max_stack.max(1);
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Arc<EffectDefinition>) -> Self {
        self.granted_effects.push(effect);
        self
    }

    #[must_use]
    pub fn with_ability(mut self, ability: Arc<AbilityDefinition>) -> Self {
        self.granted_abilities.push(ability);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_stack_floor() {
        let item = ItemDefinition::new(ItemId(1), "Feather").with_max_stack(0);
        assert_eq!(item.max_stack, 1);
    }

    #[test]
    fn test_json_defaults() {
        let item: ItemDefinition = serde_json::from_str(r#"{ "id": 4, "name": "Boots" }"#).unwrap();
        assert_eq!(item.max_stack, 1);
        assert!(item.granted_effects.is_empty());
    }
}
