//! The standard character kit: movement, combat, death and a few items.

use std::sync::Arc;

use crate::abilities::{
    AbilityDefinition, InputSlot, InstancingPolicy, NetExecutionPolicy, COOLDOWN_DATA_KEY, GOLD_COST_DATA_KEY,
};
use crate::attributes::{Attribute, ModOp};
use crate::effects::{DurationPolicy, EffectDefinition, Magnitude};
use crate::items::ItemDefinition;

use super::catalog::{Catalog, CatalogError};

pub mod effects {
    use crate::effects::EffectId;

    pub const JUMP_STATE: EffectId = EffectId(1);
    pub const SPRINT_SPEED: EffectId = EffectId(2);
    pub const DEATH: EffectId = EffectId(3);
    pub const PRIMARY_ATTACK_COOLDOWN: EffectId = EffectId(4);
    pub const DASH_COST: EffectId = EffectId(5);
    pub const DASH_COOLDOWN: EffectId = EffectId(6);
    pub const EXPLOSION: EffectId = EffectId(7);
    pub const EXTRA_JUMP: EffectId = EffectId(8);
    pub const SHARPENED: EffectId = EffectId(9);
    pub const INTERACT_COST: EffectId = EffectId(10);
}

pub mod abilities {
    use crate::abilities::AbilityId;

    pub const JUMP: AbilityId = AbilityId(1);
    pub const CROUCH: AbilityId = AbilityId(2);
    pub const SPRINT: AbilityId = AbilityId(3);
    pub const DEATH: AbilityId = AbilityId(4);
    pub const PRIMARY_ATTACK: AbilityId = AbilityId(5);
    pub const DASH: AbilityId = AbilityId(6);
    pub const SECOND_ATTACK: AbilityId = AbilityId(7);
    pub const ULTIMATE: AbilityId = AbilityId(8);
    pub const INTERACT: AbilityId = AbilityId(9);
}

pub mod items {
    use crate::items::ItemId;

    pub const FEATHER: ItemId = ItemId(1);
    pub const WHETSTONE: ItemId = ItemId(2);
}

const DEAD: &str = "State.Dead";

impl Catalog {
    /// The standard kit.
    ///
    /// Abilities granted to players are listed by [`Catalog::player_kit`];
    /// NPCs only get the death ability.
    #[must_use]
    pub fn standard() -> Self {
        let mut catalog = Self::new();
        // Ids are distinct constants.
        let _ = populate(&mut catalog);
        catalog
    }

    /// Abilities every player starts with.
    #[must_use]
    pub fn player_kit(&self) -> Vec<Arc<AbilityDefinition>> {
        [
            abilities::JUMP,
            abilities::CROUCH,
            abilities::SPRINT,
            abilities::DEATH,
            abilities::PRIMARY_ATTACK,
            abilities::DASH,
            abilities::SECOND_ATTACK,
            abilities::ULTIMATE,
            abilities::INTERACT,
        ]
        .into_iter()
        .filter_map(|id| self.ability(id))
        .collect()
    }

    /// Abilities every NPC starts with.
    #[must_use]
    pub fn npc_kit(&self) -> Vec<Arc<AbilityDefinition>> {
        self.ability(abilities::DEATH).into_iter().collect()
    }
}

fn populate(catalog: &mut Catalog) -> Result<(), CatalogError> {
    let jump_state = catalog.register_effect(
        EffectDefinition::infinite(effects::JUMP_STATE, "JumpState")
            .with_asset_tag("State.InAir")
            .with_granted_tag("State.InAir")
            .with_granted_tag("State.InAir.Jumping"),
    )?;
    let sprint_speed = catalog.register_effect(
        EffectDefinition::infinite(effects::SPRINT_SPEED, "SprintSpeed").with_modifier(
            Attribute::MoveSpeedMultiplier,
            ModOp::Multiply,
            1.5,
        ),
    )?;
    let death = catalog.register_effect(
        EffectDefinition::infinite(effects::DEATH, "Death")
            .with_granted_tag(DEAD)
            .with_granted_tag("State.Ragdoll"),
    )?;
    let attack_cooldown = catalog.register_effect(
        EffectDefinition::new(effects::PRIMARY_ATTACK_COOLDOWN, "PrimaryAttackCooldown")
            .with_duration(DurationPolicy::HasDuration(Magnitude::SetByCaller(COOLDOWN_DATA_KEY.into())))
            .with_granted_tag("Cooldown.PrimaryAttack"),
    )?;
    let dash_cost = catalog.register_effect(
        EffectDefinition::instant(effects::DASH_COST, "DashCost").with_modifier(Attribute::Stamina, ModOp::Add, -20.0),
    )?;
    let dash_cooldown = catalog.register_effect(
        EffectDefinition::timed(effects::DASH_COOLDOWN, "DashCooldown", 1.0).with_granted_tag("Cooldown.Dash"),
    )?;
    catalog.register_effect(
        EffectDefinition::instant(effects::EXPLOSION, "Explosion")
            .with_modifier(Attribute::Health, ModOp::Add, -40.0)
            .with_blocked_tag(DEAD),
    )?;
    let extra_jump = catalog.register_effect(
        EffectDefinition::infinite(effects::EXTRA_JUMP, "ExtraJump").with_modifier(
            Attribute::MaxJumpCount,
            ModOp::Add,
            1.0,
        ),
    )?;
    let sharpened = catalog.register_effect(
        EffectDefinition::infinite(effects::SHARPENED, "Sharpened").with_modifier(
            Attribute::AttackPower,
            ModOp::Add,
            5.0,
        ),
    )?;
    // Interactables name their price; the interact behavior fills it in.
    let interact_cost = catalog.register_effect(
        EffectDefinition::instant(effects::INTERACT_COST, "InteractCost").with_modifier_magnitude(
            Attribute::Gold,
            ModOp::Add,
            Magnitude::SetByCaller(GOLD_COST_DATA_KEY.into()),
        ),
    )?;

    catalog.register_ability(
        AbilityDefinition::new(abilities::JUMP, "Jump")
            .with_behavior("jump")
            .with_net_execution(NetExecutionPolicy::ServerOnly)
            .with_instancing(InstancingPolicy::NonInstanced)
            .with_input(InputSlot::Jump)
            .with_blocked_tag(DEAD)
            .with_start_effect(jump_state)
            .auto_ending(),
    )?;
    catalog.register_ability(
        AbilityDefinition::new(abilities::CROUCH, "Crouch")
            .with_behavior("crouch")
            .with_input(InputSlot::Crouch)
            .with_blocked_tag(DEAD),
    )?;
    catalog.register_ability(
        AbilityDefinition::new(abilities::SPRINT, "Sprint")
            .with_behavior("sprint")
            .with_input(InputSlot::Sprint)
            .with_blocked_tag(DEAD)
            .with_tracked_effect(sprint_speed),
    )?;
    catalog.register_ability(
        AbilityDefinition::new(abilities::DEATH, "Death")
            .with_behavior("death")
            .with_net_execution(NetExecutionPolicy::ServerOnly)
            .with_ability_tag("Ability.Death")
            .triggered_by("Event.ZeroHealth")
            .with_start_effect(death),
    )?;
    catalog.register_ability(
        AbilityDefinition::new(abilities::PRIMARY_ATTACK, "PrimaryAttack")
            .with_behavior("primary_attack")
            .with_input(InputSlot::PrimaryAttack)
            .with_ability_tag("Ability.Attack")
            .with_owned_tag("State.Firing")
            .with_blocked_tag(DEAD)
            .with_cooldown(attack_cooldown),
    )?;
    catalog.register_ability(
        AbilityDefinition::new(abilities::DASH, "Dash")
            .with_input(InputSlot::Skill1)
            .with_ability_tag("Ability.Skill")
            .with_blocked_tag(DEAD)
            .with_cost(dash_cost)
            .with_cooldown(dash_cooldown)
            .auto_ending(),
    )?;
    catalog.register_ability(
        AbilityDefinition::new(abilities::SECOND_ATTACK, "SecondAttack")
            .with_input(InputSlot::Skill2)
            .with_ability_tag("Ability.Attack")
            .with_blocked_tag(DEAD)
            .auto_ending(),
    )?;
    catalog.register_ability(
        AbilityDefinition::new(abilities::ULTIMATE, "Ultimate")
            .with_input(InputSlot::Skill3)
            .with_ability_tag("Ability.Skill")
            .with_blocked_tag(DEAD)
            .auto_ending(),
    )?;
    catalog.register_ability(
        AbilityDefinition::new(abilities::INTERACT, "Interact")
            .with_behavior("interact")
            .with_net_execution(NetExecutionPolicy::ServerOnly)
            .with_input(InputSlot::Interact)
            .with_blocked_tag(DEAD)
            .with_cost(interact_cost)
            .auto_ending(),
    )?;

    catalog.register_item(
        ItemDefinition::new(items::FEATHER, "Feather")
            .with_description("One more jump per feather.")
            .with_max_stack(3)
            .with_effect(extra_jump),
    )?;
    catalog.register_item(
        ItemDefinition::new(items::WHETSTONE, "Whetstone")
            .with_max_stack(5)
            .with_effect(sharpened),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abilities::{AbilityId, BehaviorRegistry};
    use crate::effects::EffectId;
    use crate::items::ItemId;

    #[test]
    fn test_standard_kit_resolves() {
        let catalog = Catalog::standard();
        assert!(catalog.validate_behaviors(&BehaviorRegistry::with_builtins()).is_ok());
        assert_eq!(catalog.player_kit().len(), 9);
        assert_eq!(catalog.npc_kit().len(), 1);
    }

    #[test]
    fn test_jump_is_server_only_and_shared() {
        let jump = Catalog::standard().ability(abilities::JUMP).unwrap();
        assert_eq!(jump.net_execution, NetExecutionPolicy::ServerOnly);
        assert!(!jump.is_instanced());
        assert!(jump.auto_end);
    }

    #[test]
    fn test_interact_charges_gold() {
        let catalog = Catalog::standard();
        let interact = catalog.ability(abilities::INTERACT).unwrap();
        assert_eq!(interact.behavior, "interact");
        assert_eq!(interact.net_execution, NetExecutionPolicy::ServerOnly);
        let cost = interact.cost.as_ref().unwrap();
        assert_eq!(cost.id, effects::INTERACT_COST);
        assert_eq!(
            cost.modifiers[0].magnitude,
            Magnitude::SetByCaller(GOLD_COST_DATA_KEY.into())
        );
    }

    #[test]
    fn test_attack_cooldown_is_caller_driven() {
        let catalog = Catalog::standard();
        let cooldown = catalog.effect(effects::PRIMARY_ATTACK_COOLDOWN).unwrap();
        assert_eq!(
            cooldown.duration,
            DurationPolicy::HasDuration(Magnitude::SetByCaller(COOLDOWN_DATA_KEY.into()))
        );
    }

    #[test]
    fn test_ids_unique() {
        let mut catalog = Catalog::new();
        assert!(populate(&mut catalog).is_ok());
        assert_eq!(catalog.len(), 10 + 9 + 2);
        assert_eq!(catalog.item(items::FEATHER).unwrap().max_stack, 3);
        assert_eq!(catalog.ability(AbilityId(6)).unwrap().name, "Dash");
        assert!(catalog.effect(EffectId(7)).is_some());
        assert!(catalog.item(ItemId(2)).is_some());
    }
}
