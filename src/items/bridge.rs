//! Turning stack changes into ability and effect grants.

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::abilities::AbilitySpecHandle;
use crate::effects::ActiveEffectHandle;
use crate::system::AbilitySystem;

use super::container::StackChange;
use super::definition::{ItemDefinition, ItemId};

/// What the bridge granted for one item, kept so a removal policy can undo
/// it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ItemGrants {
    /// Handles of duration and infinite effects. Instant applications are
    /// never recorded.
    pub effects: Vec<ActiveEffectHandle>,
    pub abilities: Vec<AbilitySpecHandle>,
}

impl ItemGrants {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty() && self.abilities.is_empty()
    }
}

/// Grants made by one stack change.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GrantReport {
    pub effects_applied: usize,
    pub effects_failed: usize,
    pub abilities_granted: usize,
}

/// Decides what happens to an item's grants when its last unit is removed.
pub trait ItemRemovalPolicy {
    fn on_item_removed(&mut self, item: &ItemDefinition, grants: &mut ItemGrants, system: &mut AbilitySystem);
}

/// Keeps everything the item granted.
#[derive(Clone, Copy, Debug, Default)]
pub struct RetainGrants;

impl ItemRemovalPolicy for RetainGrants {
    fn on_item_removed(&mut self, item: &ItemDefinition, grants: &mut ItemGrants, _system: &mut AbilitySystem) {
        debug!(item = %item.name, effects = grants.effects.len(), abilities = grants.abilities.len(), "item removed, grants retained");
    }
}

/// Removes the item's tracked effects and clears its abilities.
#[derive(Clone, Copy, Debug, Default)]
pub struct RevokeGrants;

impl ItemRemovalPolicy for RevokeGrants {
    fn on_item_removed(&mut self, item: &ItemDefinition, grants: &mut ItemGrants, system: &mut AbilitySystem) {
        let mut removed = 0;
        for handle in grants.effects.drain(..) {
            if system.remove_effect(handle) {
                removed += 1;
            }
        }
        for handle in grants.abilities.drain(..) {
            if let Err(err) = system.clear_ability(handle) {
                warn!(item = %item.name, %err, "could not revoke item ability");
            }
        }
        debug!(item = %item.name, removed, "item removed, grants revoked");
    }
}

/// Applies item grants to the holder's [`AbilitySystem`].
pub struct ItemGrantBridge {
    ledger: FxHashMap<ItemId, ItemGrants>,
    removal: Box<dyn ItemRemovalPolicy>,
}

impl std::fmt::Debug for ItemGrantBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemGrantBridge")
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}

impl Default for ItemGrantBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl ItemGrantBridge {
    /// A bridge that retains grants on removal.
    pub fn new() -> Self {
        Self {
            ledger: FxHashMap::default(),
            removal: Box::new(RetainGrants),
        }
    }

    /// Replace the removal policy (builder pattern).
    #[must_use]
    pub fn with_removal_policy(mut self, policy: Box<dyn ItemRemovalPolicy>) -> Self {
        self.removal = policy;
        self
    }

    /// Grants recorded for `item`.
    #[must_use]
    pub fn grants(&self, item: ItemId) -> Option<&ItemGrants> {
        self.ledger.get(&item)
    }

    /// React to a stack moving from `old` to `new`.
    ///
    /// Nothing happens unless `new > 0`. Each granted effect is applied once
    /// per unit gained; granted abilities are granted only on the first
    /// unit. Stack decreases grant nothing; an emptied stack is handed to
    /// the removal policy.
    pub fn on_stack_changed(
        &mut self,
        item: &ItemDefinition,
        old: u32,
        new: u32,
        system: &mut AbilitySystem,
    ) -> GrantReport {
        let mut report = GrantReport::default();
        if new == 0 {
            if old > 0 {
                self.on_item_removed(item, system);
            }
            return report;
        }

        let grants = self.ledger.entry(item.id).or_default();
        for _ in 0..new.saturating_sub(old) {
            for effect in &item.granted_effects {
                let spec = system.make_outgoing_spec(std::sync::Arc::clone(effect));
                match system.apply_effect_to_self(spec) {
                    Ok(handle) => {
                        report.effects_applied += 1;
                        if system.effects().contains(handle) {
                            grants.effects.push(handle);
                        }
                    }
                    Err(err) => {
                        report.effects_failed += 1;
                        warn!(actor = %system.owner(), item = %item.name, effect = %effect.name, %err, "item effect failed to apply");
                    }
                }
            }
        }

        if old == 0 {
            for ability in &item.granted_abilities {
                match system.grant_ability(std::sync::Arc::clone(ability)) {
                    Ok(handle) => {
                        report.abilities_granted += 1;
                        grants.abilities.push(handle);
                    }
                    Err(err) => {
                        warn!(actor = %system.owner(), item = %item.name, ability = %ability.name, %err, "item ability could not be granted");
                    }
                }
            }
        }

        debug!(actor = %system.owner(), item = %item.name, old, new, ?report, "applied item grants");
        report
    }

    /// Convenience for a [`StackChange`] reported by a container.
    pub fn apply_change(&mut self, item: &ItemDefinition, change: StackChange, system: &mut AbilitySystem) -> GrantReport {
        self.on_stack_changed(item, change.old, change.new, system)
    }

    fn on_item_removed(&mut self, item: &ItemDefinition, system: &mut AbilitySystem) {
        let mut grants = self.ledger.remove(&item.id).unwrap_or_default();
        self.removal.on_item_removed(item, &mut grants, system);
        if !grants.is_empty() {
            self.ledger.insert(item.id, grants);
        }
    }
}
