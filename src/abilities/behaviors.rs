//! Built-in behaviors for the standard character abilities.

use tracing::debug;

use crate::attributes::Attribute;
use crate::effects::EffectSpec;

use super::behavior::{AbilityBehavior, AbilityContext, BehaviorOutcome, BehaviorRegistry};
use super::interact::InteractBehavior;

/// Set-by-caller key carrying the primary attack's cooldown duration.
pub const COOLDOWN_DATA_KEY: &str = "Data.Cooldown";

/// Logs and does nothing else. Used for abilities that are pure effect
/// bundles (dash, skills) and for the empty behavior key.
#[derive(Clone, Copy, Debug, Default)]
pub struct BasicBehavior;

impl AbilityBehavior for BasicBehavior {
    fn on_activated(&mut self, ctx: &mut AbilityContext<'_>) -> BehaviorOutcome {
        debug!(ability = %ctx.definition.name, actor = %ctx.actor, "basic ability activated");
        BehaviorOutcome::Continue
    }
}

/// Asks the avatar to jump, then ends.
#[derive(Clone, Copy, Debug, Default)]
pub struct JumpBehavior;

impl AbilityBehavior for JumpBehavior {
    fn can_activate(&self, ctx: &AbilityContext<'_>) -> bool {
        ctx.avatar.can_jump()
    }

    fn on_activated(&mut self, ctx: &mut AbilityContext<'_>) -> BehaviorOutcome {
        ctx.avatar.jump();
        BehaviorOutcome::End
    }
}

/// Crouches while the input is held.
#[derive(Clone, Copy, Debug, Default)]
pub struct CrouchBehavior;

impl AbilityBehavior for CrouchBehavior {
    fn can_activate(&self, ctx: &AbilityContext<'_>) -> bool {
        ctx.avatar.can_crouch() && !ctx.avatar.is_falling()
    }

    fn on_activated(&mut self, ctx: &mut AbilityContext<'_>) -> BehaviorOutcome {
        ctx.avatar.crouch();
        BehaviorOutcome::Continue
    }

    fn on_input_released(&mut self, _ctx: &mut AbilityContext<'_>) -> BehaviorOutcome {
        BehaviorOutcome::End
    }

    fn on_ended(&mut self, ctx: &mut AbilityContext<'_>, _was_cancelled: bool) {
        ctx.avatar.uncrouch();
    }
}

/// Sprints while the input is held. The speed boost is a tracked effect on
/// the definition, so it disappears when the ability ends.
#[derive(Clone, Copy, Debug, Default)]
pub struct SprintBehavior;

impl AbilityBehavior for SprintBehavior {
    fn can_activate(&self, ctx: &AbilityContext<'_>) -> bool {
        !ctx.avatar.is_falling()
    }

    fn on_input_released(&mut self, _ctx: &mut AbilityContext<'_>) -> BehaviorOutcome {
        BehaviorOutcome::End
    }
}

/// Runs for the rest of the actor's life. The death effect is a start
/// effect on the definition.
#[derive(Clone, Copy, Debug, Default)]
pub struct DeathBehavior;

impl AbilityBehavior for DeathBehavior {
    fn on_activated(&mut self, ctx: &mut AbilityContext<'_>) -> BehaviorOutcome {
        debug!(actor = %ctx.actor, "death ability running");
        BehaviorOutcome::Continue
    }
}

/// Fires while the input is held. The cooldown duration is scaled by the
/// owner's `CooldownReduction`.
#[derive(Clone, Copy, Debug)]
pub struct PrimaryAttackBehavior {
    pub base_cooldown: f32,
}

impl Default for PrimaryAttackBehavior {
    fn default() -> Self {
        Self { base_cooldown: 0.1 }
    }
}

impl PrimaryAttackBehavior {
    /// Cooldown after applying `reduction`, clamped to `[0, 1]`.
    #[must_use]
    pub fn cooldown_for(&self, reduction: f32) -> f32 {
        self.base_cooldown * (1.0 - reduction.clamp(0.0, 1.0))
    }
}

impl AbilityBehavior for PrimaryAttackBehavior {
    fn modify_cooldown(&self, spec: &mut EffectSpec, ctx: &AbilityContext<'_>) {
        let reduction = ctx.attributes.value_or(Attribute::CooldownReduction, 0.0);
        spec.set_by_caller(COOLDOWN_DATA_KEY, self.cooldown_for(reduction));
    }

    fn on_input_released(&mut self, _ctx: &mut AbilityContext<'_>) -> BehaviorOutcome {
        BehaviorOutcome::End
    }
}

fn basic() -> Box<dyn AbilityBehavior> {
    Box::new(BasicBehavior)
}

fn jump() -> Box<dyn AbilityBehavior> {
    Box::new(JumpBehavior)
}

fn crouch() -> Box<dyn AbilityBehavior> {
    Box::new(CrouchBehavior)
}

fn sprint() -> Box<dyn AbilityBehavior> {
    Box::new(SprintBehavior)
}

fn death() -> Box<dyn AbilityBehavior> {
    Box::new(DeathBehavior)
}

fn primary_attack() -> Box<dyn AbilityBehavior> {
    Box::new(PrimaryAttackBehavior::default())
}

fn interact() -> Box<dyn AbilityBehavior> {
    Box::new(InteractBehavior)
}

pub(crate) fn register_builtins(registry: &mut BehaviorRegistry) {
    registry.register("basic", basic);
    registry.register("jump", jump);
    registry.register("crouch", crouch);
    registry.register("sprint", sprint);
    registry.register("death", death);
    registry.register("primary_attack", primary_attack);
    registry.register("interact", interact);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_keys() {
        let registry = BehaviorRegistry::with_builtins();
        assert_eq!(
            registry.keys(),
            vec!["basic", "crouch", "death", "interact", "jump", "primary_attack", "sprint"]
        );
        assert!(registry.create("").is_some());
        assert!(registry.create("teleport").is_none());
    }

    #[test]
    fn test_cooldown_reduction_is_clamped() {
        let attack = PrimaryAttackBehavior::default();
        assert!((attack.cooldown_for(0.0) - 0.1).abs() < 1e-6);
        assert!((attack.cooldown_for(0.5) - 0.05).abs() < 1e-6);
        assert_eq!(attack.cooldown_for(3.0), 0.0);
        assert!((attack.cooldown_for(-1.0) - 0.1).abs() < 1e-6);
    }
}
