use thiserror::Error;

use crate::attributes::Attribute;
use crate::core::ActorId;
use crate::tags::GameplayTag;

use super::definition::EffectId;

/// Why an effect could not be applied.
///
/// Application failures are reported to the caller and logged; they never
/// abort the surrounding ability or sibling applications.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ApplicationFailure {
    #[error("{0} is not a valid target")]
    InvalidTarget(ActorId),

    #[error("target is immune to {effect}: carries {tag}")]
    Immune { effect: EffectId, tag: GameplayTag },

    #[error("{effect} requires {missing} on the target")]
    RequirementsNotMet { effect: EffectId, missing: GameplayTag },

    #[error("{effect} modifies {attribute}, which the target does not carry")]
    UnknownAttribute { effect: EffectId, attribute: Attribute },

    #[error("{effect} needs a set-by-caller magnitude for {tag}")]
    MissingSetByCaller { effect: EffectId, tag: GameplayTag },

    #[error("{0} resolved to a NaN or infinite magnitude or duration")]
    NonFiniteMagnitude(EffectId),
}
