use thiserror::Error;

use super::definition::ItemId;

/// Why a stack change was refused.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ItemError {
    #[error("item count must be positive")]
    InvalidCount,

    #[error("{0} stack is unchanged")]
    Unchanged(ItemId),

    #[error("{0} is not held")]
    NotHeld(ItemId),
}
