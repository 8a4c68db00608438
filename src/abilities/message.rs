//! Messages crossing the authority boundary.
//!
//! The transport is the host's concern; the runtime only queues outgoing
//! messages in its outbox and consumes incoming ones. Messages are plain
//! serde data with a compact bincode encoding.
//!
//! ```
//! use rust_abilities::abilities::{AbilityId, NetMessage};
//! use rust_abilities::core::PredictionKey;
//!
//! let msg = NetMessage::TryActivate { ability: AbilityId(3), key: Some(PredictionKey(1)) };
//! let bytes = msg.encode().unwrap();
//! assert_eq!(NetMessage::decode(&bytes).unwrap(), msg);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::PredictionKey;

use super::definition::AbilityId;

/// Errors from encoding or decoding messages.
#[derive(Debug, Error)]
pub enum NetError {
    #[error("message codec failed: {0}")]
    Codec(#[from] bincode::Error),
}

/// One ability-related message between client and authority.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetMessage {
    /// Client → authority: run this ability. `key` is set for predicted
    /// activations and absent for forwarded server-only ones.
    TryActivate {
        ability: AbilityId,
        key: Option<PredictionKey>,
    },
    /// Authority → client: the predicted activation stands.
    ActivationConfirmed {
        ability: AbilityId,
        key: PredictionKey,
    },
    /// Authority → client: undo everything done under `key`.
    ActivationRejected {
        ability: AbilityId,
        key: PredictionKey,
    },
    /// Either direction: the ability ended on the sender.
    AbilityEnded {
        ability: AbilityId,
        was_cancelled: bool,
    },
}

impl NetMessage {
    /// Encode to bytes.
    pub fn encode(&self) -> Result<Vec<u8>, NetError> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode from bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, NetError> {
        Ok(bincode::deserialize(bytes)?)
    }

    /// The ability this message concerns.
    #[must_use]
    pub fn ability(&self) -> AbilityId {
        match self {
            NetMessage::TryActivate { ability, .. }
            | NetMessage::ActivationConfirmed { ability, .. }
            | NetMessage::ActivationRejected { ability, .. }
            | NetMessage::AbilityEnded { ability, .. } => *ability,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_garbage_fails() {
        assert!(matches!(NetMessage::decode(&[0xff; 3]), Err(NetError::Codec(_))));
    }

    #[test]
    fn test_ability_accessor() {
        let msg = NetMessage::AbilityEnded {
            ability: AbilityId(4),
            was_cancelled: true,
        };
        assert_eq!(msg.ability(), AbilityId(4));
    }
}
