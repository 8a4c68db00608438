use thiserror::Error;

use crate::abilities::AbilityError;
use crate::content::CatalogError;
use crate::core::{ActorId, ConfigError};
use crate::items::ItemError;

/// Errors raised by [`World`](super::World) operations.
#[derive(Debug, Error)]
pub enum WorldError {
    #[error("{0} is not in the world")]
    UnknownActor(ActorId),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Ability(#[from] AbilityError),

    #[error(transparent)]
    Item(#[from] ItemError),
}
