//! Catalog of immutable definitions.
//!
//! The `Catalog` stores every effect, ability and item definition of a game
//! behind `Arc`s so that actors share them. It can be built in code or
//! loaded from JSON.
//!
//! ## Example
//!
//! ```
//! use rust_abilities::content::Catalog;
//! use rust_abilities::effects::EffectId;
//!
//! let json = r#"{
//!     "effects": [
//!         { "id": 1, "name": "Heal", "modifiers": [
//!             { "attribute": "Health", "op": "Add", "magnitude": { "Scalar": 25.0 } }
//!         ] }
//!     ]
//! }"#;
//! let catalog = Catalog::from_json(json).unwrap();
//! assert_eq!(catalog.effect(EffectId(1)).unwrap().name, "Heal");
//! ```

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::abilities::{AbilityDefinition, AbilityId, BehaviorRegistry};
use crate::effects::{EffectDefinition, EffectId};
use crate::items::{ItemDefinition, ItemId};

/// Errors raised while building or querying a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid catalog json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0} registered twice")]
    DuplicateEffect(EffectId),

    #[error("{0} registered twice")]
    DuplicateAbility(AbilityId),

    #[error("{0} registered twice")]
    DuplicateItem(ItemId),

    #[error("{0} must stack to at least 1")]
    InvalidMaxStack(ItemId),

    #[error("{ability} uses unregistered behavior {key:?}")]
    UnknownBehavior { ability: AbilityId, key: String },

    #[error("{0} is not in the catalog")]
    MissingEffect(EffectId),

    #[error("{0} is not in the catalog")]
    MissingAbility(AbilityId),

    #[error("{0} is not in the catalog")]
    MissingItem(ItemId),
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct CatalogFile {
    effects: Vec<EffectDefinition>,
    abilities: Vec<AbilityDefinition>,
    items: Vec<ItemDefinition>,
}

/// Registry of effect, ability and item definitions.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    effects: FxHashMap<EffectId, Arc<EffectDefinition>>,
    abilities: FxHashMap<AbilityId, Arc<AbilityDefinition>>,
    items: FxHashMap<ItemId, Arc<ItemDefinition>>,
}

impl Catalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load definitions from JSON with optional `effects`, `abilities` and
    /// `items` arrays.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        let mut catalog = Self::new();
        for effect in file.effects {
            catalog.register_effect(effect)?;
        }
        for ability in file.abilities {
            catalog.register_ability(ability)?;
        }
        for item in file.items {
            catalog.register_item(item)?;
        }
        Ok(catalog)
    }

    /// Serialize every definition, sorted by id.
    pub fn to_json(&self) -> Result<String, CatalogError> {
        let mut file = CatalogFile {
            effects: self.effects.values().map(|e| e.as_ref().clone()).collect(),
            abilities: self.abilities.values().map(|a| a.as_ref().clone()).collect(),
            items: self.items.values().map(|i| i.as_ref().clone()).collect(),
        };
        file.effects.sort_by_key(|e| e.id);
        file.abilities.sort_by_key(|a| a.id);
        file.items.sort_by_key(|i| i.id);
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Register an effect definition.
    pub fn register_effect(&mut self, effect: EffectDefinition) -> Result<Arc<EffectDefinition>, CatalogError> {
        if self.effects.contains_key(&effect.id) {
            return Err(CatalogError::DuplicateEffect(effect.id));
        }
        let effect = Arc::new(effect);
        self.effects.insert(effect.id, Arc::clone(&effect));
        Ok(effect)
    }

    /// Register an ability definition.
    pub fn register_ability(&mut self, ability: AbilityDefinition) -> Result<Arc<AbilityDefinition>, CatalogError> {
        if self.abilities.contains_key(&ability.id) {
            return Err(CatalogError::DuplicateAbility(ability.id));
        }
        let ability = Arc::new(ability);
        self.abilities.insert(ability.id, Arc::clone(&ability));
        Ok(ability)
    }

    /// Register an item definition. Items must stack to at least 1.
    pub fn register_item(&mut self, item: ItemDefinition) -> Result<Arc<ItemDefinition>, CatalogError> {
        if item.max_stack == 0 {
            return Err(CatalogError::InvalidMaxStack(item.id));
        }
        if self.items.contains_key(&item.id) {
            return Err(CatalogError::DuplicateItem(item.id));
        }
        let item = Arc::new(item);
        self.items.insert(item.id, Arc::clone(&item));
        Ok(item)
    }

    #[must_use]
    pub fn effect(&self, id: EffectId) -> Option<Arc<EffectDefinition>> {
        self.effects.get(&id).cloned()
    }

    #[must_use]
    pub fn ability(&self, id: AbilityId) -> Option<Arc<AbilityDefinition>> {
        self.abilities.get(&id).cloned()
    }

    #[must_use]
    pub fn item(&self, id: ItemId) -> Option<Arc<ItemDefinition>> {
        self.items.get(&id).cloned()
    }

    pub fn require_effect(&self, id: EffectId) -> Result<Arc<EffectDefinition>, CatalogError> {
        self.effect(id).ok_or(CatalogError::MissingEffect(id))
    }

    pub fn require_ability(&self, id: AbilityId) -> Result<Arc<AbilityDefinition>, CatalogError> {
        self.ability(id).ok_or(CatalogError::MissingAbility(id))
    }

    pub fn require_item(&self, id: ItemId) -> Result<Arc<ItemDefinition>, CatalogError> {
        self.item(id).ok_or(CatalogError::MissingItem(id))
    }

    /// Check that every ability's behavior key resolves in `registry`.
    pub fn validate_behaviors(&self, registry: &BehaviorRegistry) -> Result<(), CatalogError> {
        let mut abilities: Vec<&Arc<AbilityDefinition>> = self.abilities.values().collect();
        abilities.sort_by_key(|a| a.id);
        match abilities.into_iter().find(|a| !registry.contains(&a.behavior)) {
            Some(ability) => Err(CatalogError::UnknownBehavior {
                ability: ability.id,
                key: ability.behavior.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Ability definitions, sorted by id.
    #[must_use]
    pub fn abilities(&self) -> Vec<Arc<AbilityDefinition>> {
        let mut abilities: Vec<_> = self.abilities.values().cloned().collect();
        abilities.sort_by_key(|a| a.id);
        abilities
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.effects.len() + self.abilities.len() + self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates_rejected() {
        let mut catalog = Catalog::new();
        catalog
            .register_effect(EffectDefinition::instant(EffectId(1), "A"))
            .unwrap();
        assert!(matches!(
            catalog.register_effect(EffectDefinition::instant(EffectId(1), "B")),
            Err(CatalogError::DuplicateEffect(EffectId(1)))
        ));
    }

    #[test]
    fn test_zero_stack_item_rejected() {
        let json = r#"{ "items": [ { "id": 3, "name": "Broken", "max_stack": 0 } ] }"#;
        assert!(matches!(
            Catalog::from_json(json),
            Err(CatalogError::InvalidMaxStack(ItemId(3)))
        ));
    }

    #[test]
    fn test_unknown_behavior_reported() {
        let mut catalog = Catalog::new();
        catalog
            .register_ability(AbilityDefinition::new(AbilityId(2), "Blink").with_behavior("blink"))
            .unwrap();
        let err = catalog
            .validate_behaviors(&BehaviorRegistry::with_builtins())
            .unwrap_err();
        assert!(matches!(err, CatalogError::UnknownBehavior { ability: AbilityId(2), .. }));
    }

    #[test]
    fn test_json_round_trip_keeps_definitions() {
        let catalog = Catalog::standard();
        let json = catalog.to_json().unwrap();
        let reloaded = Catalog::from_json(&json).unwrap();
        assert_eq!(reloaded.len(), catalog.len());
        assert_eq!(reloaded.abilities(), catalog.abilities());
    }

    #[test]
    fn test_missing_lookups() {
        let catalog = Catalog::new();
        assert!(matches!(
            catalog.require_item(ItemId(9)),
            Err(CatalogError::MissingItem(ItemId(9)))
        ));
        assert!(catalog.is_empty());
    }
}
