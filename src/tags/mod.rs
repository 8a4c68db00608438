//! Status tags: hierarchical labels and the per-actor reference-counted index.

mod index;
mod tag;

pub use index::{StatusTagIndex, TagCountChanged, TagEventKind, TagSubscription};
pub use tag::{any_matches, GameplayTag, TagContainer};
