//! Attribute identifiers and modification operations.

use serde::{Deserialize, Serialize};

/// A numeric character attribute.
///
/// The set mirrors what a character sheet needs: vitals with paired
/// maxima, movement tuning, currency and combat scalars. Which of these an
/// actor actually carries depends on its [`AttributeStore`](super::AttributeStore).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Attribute {
    Health,
    MaxHealth,
    Stamina,
    MaxStamina,
    BaseMoveSpeed,
    MoveSpeedMultiplier,
    MaxJumpCount,
    Gold,
    AttackPower,
    DamageMultiplier,
    CooldownReduction,
}

impl Attribute {
    /// Every attribute, in declaration order.
    pub const ALL: [Attribute; 11] = [
        Attribute::Health,
        Attribute::MaxHealth,
        Attribute::Stamina,
        Attribute::MaxStamina,
        Attribute::BaseMoveSpeed,
        Attribute::MoveSpeedMultiplier,
        Attribute::MaxJumpCount,
        Attribute::Gold,
        Attribute::AttackPower,
        Attribute::DamageMultiplier,
        Attribute::CooldownReduction,
    ];

    /// Stable display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Attribute::Health => "Health",
            Attribute::MaxHealth => "MaxHealth",
            Attribute::Stamina => "Stamina",
            Attribute::MaxStamina => "MaxStamina",
            Attribute::BaseMoveSpeed => "BaseMoveSpeed",
            Attribute::MoveSpeedMultiplier => "MoveSpeedMultiplier",
            Attribute::MaxJumpCount => "MaxJumpCount",
            Attribute::Gold => "Gold",
            Attribute::AttackPower => "AttackPower",
            Attribute::DamageMultiplier => "DamageMultiplier",
            Attribute::CooldownReduction => "CooldownReduction",
        }
    }
}

impl std::fmt::Display for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// How a modification combines with the value it modifies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModOp {
    /// `value + magnitude`
    Add,
    /// `value * magnitude`
    Multiply,
    /// `magnitude`
    Override,
}

/// One concrete modification: an operation with a resolved magnitude.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Modification {
    pub op: ModOp,
    pub magnitude: f32,
}

impl Modification {
    #[must_use]
    pub const fn new(op: ModOp, magnitude: f32) -> Self {
        Self { op, magnitude }
    }

    #[must_use]
    pub const fn add(magnitude: f32) -> Self {
        Self::new(ModOp::Add, magnitude)
    }

    #[must_use]
    pub const fn multiply(factor: f32) -> Self {
        Self::new(ModOp::Multiply, factor)
    }

    #[must_use]
    pub const fn override_with(value: f32) -> Self {
        Self::new(ModOp::Override, value)
    }

    /// Apply this modification to a raw value. No clamping happens here.
    #[must_use]
    pub fn apply(self, value: f32) -> f32 {
        match self.op {
            ModOp::Add => value + self.magnitude,
            ModOp::Multiply => value * self.magnitude,
            ModOp::Override => self.magnitude,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply() {
        assert_eq!(Modification::add(-150.0).apply(100.0), -50.0);
        assert_eq!(Modification::multiply(1.5).apply(10.0), 15.0);
        assert_eq!(Modification::override_with(7.0).apply(10.0), 7.0);
    }

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<_> = Attribute::ALL.iter().map(|a| a.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Attribute::ALL.len());
        assert_eq!(Attribute::Gold.to_string(), "Gold");
    }
}
