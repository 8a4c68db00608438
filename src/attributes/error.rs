use thiserror::Error;

use super::attribute::Attribute;

/// Errors raised by [`AttributeStore`](super::AttributeStore).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum AttributeError {
    #[error("attribute {0} is not carried by this store")]
    UnknownAttribute(Attribute),

    #[error("modification of {0} is NaN or infinite")]
    NonFinite(Attribute),
}
