//! Interacting with world objects: chests, dropped items and the like.
//!
//! The avatar resolves what the owner can reach. [`InteractBehavior`]
//! refuses to activate without a target, charges the target's gold price
//! through the ability's cost effect and asks the avatar to run the
//! interaction. The standard interact ability is server-only, so the
//! interaction itself always executes on the authority.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::effects::EffectSpec;

use super::behavior::{AbilityBehavior, AbilityContext, BehaviorOutcome};

/// Set-by-caller key carrying an interaction's gold cost, negated.
pub const GOLD_COST_DATA_KEY: &str = "Data.Cost.Gold";

/// Identifies one interactable object in the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InteractableId(pub u32);

impl fmt::Display for InteractableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Interactable({})", self.0)
    }
}

/// The interactable an avatar would use right now.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InteractTarget {
    /// The object to interact with.
    pub id: InteractableId,
    /// Gold charged when the interaction commits.
    pub cost: f32,
}

/// Uses whatever the avatar can reach, paying its price in gold.
#[derive(Clone, Copy, Debug, Default)]
pub struct InteractBehavior;

impl AbilityBehavior for InteractBehavior {
    fn can_activate(&self, ctx: &AbilityContext<'_>) -> bool {
        ctx.avatar.interact_target().is_some()
    }

    fn modify_cost(&self, spec: &mut EffectSpec, ctx: &AbilityContext<'_>) {
        let cost = ctx.avatar.interact_target().map_or(0.0, |target| target.cost);
        spec.set_by_caller(GOLD_COST_DATA_KEY, -cost);
    }

    fn on_activated(&mut self, ctx: &mut AbilityContext<'_>) -> BehaviorOutcome {
        let Some(target) = ctx.avatar.interact_target() else {
            return BehaviorOutcome::Cancel;
        };
        if ctx.avatar.interact(target.id) {
            debug!(actor = %ctx.actor, target = %target.id, cost = target.cost, "interacted");
            BehaviorOutcome::End
        } else {
            warn!(actor = %ctx.actor, target = %target.id, "interaction refused after commit");
            BehaviorOutcome::Cancel
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::abilities::{
        AbilityDefinition, AbilityId, AbilityRuntime, ActivationFailure, ActivationOutcome, ActorParts, Avatar,
        BehaviorRegistry,
    };
    use crate::attributes::{Attribute, AttributeStore, Modification, ModOp};
    use crate::core::{ActorId, NetSide};
    use crate::effects::{EffectDefinition, EffectHandleTable, EffectId, Magnitude};
    use crate::tags::StatusTagIndex;

    /// One vending machine that works twice.
    struct Vendor {
        price: f32,
        uses_left: u32,
    }

    impl Avatar for Vendor {
        fn interact_target(&self) -> Option<InteractTarget> {
            (self.uses_left > 0).then_some(InteractTarget {
                id: InteractableId(1),
                cost: self.price,
            })
        }

        fn interact(&mut self, _target: InteractableId) -> bool {
            self.uses_left -= 1;
            true
        }
    }

    fn interact() -> Arc<AbilityDefinition> {
        let cost = EffectDefinition::instant(EffectId(1), "InteractCost").with_modifier_magnitude(
            Attribute::Gold,
            ModOp::Add,
            Magnitude::SetByCaller(GOLD_COST_DATA_KEY.into()),
        );
        Arc::new(
            AbilityDefinition::new(AbilityId(1), "Interact")
                .with_behavior("interact")
                .with_cost(Arc::new(cost))
                .auto_ending(),
        )
    }

    #[test]
    fn test_pays_target_price() {
        let actor = ActorId(1);
        let mut runtime = AbilityRuntime::new(actor, Arc::new(BehaviorRegistry::with_builtins()));
        let handle = runtime.grant(interact()).unwrap();
        let mut attributes = AttributeStore::character();
        attributes
            .apply_modification(Attribute::Gold, Modification::add(50.0))
            .unwrap();
        let mut tags = StatusTagIndex::new();
        let mut effects = EffectHandleTable::new(actor);
        let mut vendor = Vendor {
            price: 20.0,
            uses_left: 2,
        };
        let mut parts = ActorParts {
            actor,
            side: NetSide::Authority,
            attributes: &mut attributes,
            tags: &mut tags,
            effects: &mut effects,
            avatar: Some(&mut vendor),
        };

        assert!(runtime.try_activate(handle, &mut parts).unwrap().is_activated());
        assert_eq!(parts.attributes.value(Attribute::Gold).unwrap(), 30.0);
        assert!(runtime.try_activate(handle, &mut parts).unwrap().is_activated());
        assert_eq!(parts.attributes.value(Attribute::Gold).unwrap(), 10.0);

        // Nothing left in reach.
        assert_eq!(
            runtime.try_activate(handle, &mut parts).unwrap(),
            ActivationOutcome::Failed(ActivationFailure::BehaviorRejected)
        );
        assert_eq!(parts.attributes.value(Attribute::Gold).unwrap(), 10.0);
    }
}
