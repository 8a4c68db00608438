use thiserror::Error;

use crate::attributes::Attribute;
use crate::core::NetSide;
use crate::effects::ApplicationFailure;
use crate::tags::GameplayTag;

use super::definition::{AbilityId, NetExecutionPolicy};
use super::instance::AbilitySpecHandle;

/// Broad class of an activation failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Invalid actor/context or wrong execution side.
    Validation,
    /// Tags, behavior pre-check, cooldown or cost.
    Commit,
}

/// Why an activation ended cancelled.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ActivationFailure {
    #[error("avatar is missing or no longer valid")]
    InvalidAvatar,

    #[error("{policy:?} ability cannot run on the {side:?} side")]
    NetSideMismatch {
        policy: NetExecutionPolicy,
        side: NetSide,
    },

    #[error("ability is already active")]
    AlreadyActive,

    #[error("blocked by tag {0}")]
    Blocked(GameplayTag),

    #[error("missing required tag {0}")]
    MissingTag(GameplayTag),

    #[error("behavior pre-check refused activation")]
    BehaviorRejected,

    #[error("on cooldown ({0})")]
    OnCooldown(GameplayTag),

    #[error("not enough {attribute}: need {required}, have {available}")]
    InsufficientCost {
        attribute: Attribute,
        required: f32,
        available: f32,
    },

    #[error("cost could not be paid: {0}")]
    CostFailed(ApplicationFailure),

    #[error("cooldown could not be started: {0}")]
    CooldownFailed(ApplicationFailure),

    #[error("rejected by the authority")]
    RejectedByAuthority,
}

impl ActivationFailure {
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            ActivationFailure::InvalidAvatar
            | ActivationFailure::NetSideMismatch { .. }
            | ActivationFailure::AlreadyActive
            | ActivationFailure::RejectedByAuthority => FailureKind::Validation,
            _ => FailureKind::Commit,
        }
    }
}

/// Errors from misusing the runtime API.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AbilityError {
    #[error("no ability granted under {0}")]
    UnknownSpec(AbilitySpecHandle),

    #[error("{0} is not granted to this actor")]
    NotGranted(AbilityId),

    #[error("no behavior registered as {0:?}")]
    UnknownBehavior(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(ActivationFailure::InvalidAvatar.kind(), FailureKind::Validation);
        assert_eq!(ActivationFailure::BehaviorRejected.kind(), FailureKind::Commit);
        assert_eq!(
            ActivationFailure::OnCooldown("Cooldown.Dash".into()).kind(),
            FailureKind::Commit
        );
    }

    #[test]
    fn test_messages() {
        let err = ActivationFailure::InsufficientCost {
            attribute: Attribute::Gold,
            required: 30.0,
            available: 10.0,
        };
        assert_eq!(err.to_string(), "not enough Gold: need 30, have 10");
    }
}
