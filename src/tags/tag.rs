//! Gameplay tags: dotted hierarchical labels such as `State.InAir.Jumping`.
//!
//! Tags are opaque to the engine except for their hierarchy: a tag *matches*
//! a query when it is equal to it or is a descendant of it, so
//! `State.InAir.Jumping` matches `State.InAir` but not `State.In`.
//!
//! ```
//! use rust_abilities::tags::GameplayTag;
//!
//! let jumping = GameplayTag::new("State.InAir.Jumping");
//! assert!(jumping.matches(&"State.InAir".into()));
//! assert!(jumping.matches(&jumping));
//! assert!(!jumping.matches(&"State.In".into()));
//! assert_eq!(jumping.parent(), Some(GameplayTag::new("State.InAir")));
//! ```

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// A hierarchical gameplay label.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GameplayTag(pub String);

/// Small inline collection of tags. Most definitions carry one or two.
pub type TagContainer = SmallVec<[GameplayTag; 4]>;

impl GameplayTag {
    /// Create a new tag.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The full dotted name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether this tag equals `query` or sits beneath it.
    #[must_use]
    pub fn matches(&self, query: &GameplayTag) -> bool {
        match self.0.strip_prefix(query.as_str()) {
            Some("") => true,
            Some(rest) => rest.starts_with('.') && !query.0.is_empty(),
            None => false,
        }
    }

    /// The immediate parent tag, if any.
    #[must_use]
    pub fn parent(&self) -> Option<GameplayTag> {
        self.0
            .rfind('.')
            .map(|idx| GameplayTag(self.0[..idx].to_string()))
    }
}

impl From<&str> for GameplayTag {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for GameplayTag {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for GameplayTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Check whether any tag in `tags` matches any tag in `query`.
#[must_use]
pub fn any_matches(tags: &[GameplayTag], query: &[GameplayTag]) -> bool {
    tags.iter().any(|t| query.iter().any(|q| t.matches(q)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn test_exact_and_child_matching() {
        let tag = GameplayTag::new("State.Dead");
        assert!(tag.matches(&GameplayTag::new("State.Dead")));
        assert!(tag.matches(&GameplayTag::new("State")));
        assert!(!tag.matches(&GameplayTag::new("State.Dea")));
        assert!(!tag.matches(&GameplayTag::new("State.Dead.Forever")));
        assert!(!tag.matches(&GameplayTag::new("")));
    }

    #[test]
    fn test_parent() {
        assert_eq!(
            GameplayTag::new("A.B.C").parent(),
            Some(GameplayTag::new("A.B"))
        );
        assert_eq!(GameplayTag::new("A").parent(), None);
    }

    #[test]
    fn test_any_matches() {
        let granted: TagContainer = smallvec!["State.InAir.Jumping".into()];
        let query: TagContainer = smallvec!["Cooldown".into(), "State.InAir".into()];
        assert!(any_matches(&granted, &query));
        assert!(!any_matches(&granted, &[GameplayTag::new("State.Dead")]));
        assert!(!any_matches(&[], &query));
    }

    #[test]
    fn test_serialization() {
        let tag = GameplayTag::new("State.Firing");
        let json = serde_json::to_string(&tag).unwrap();
        assert_eq!(json, "\"State.Firing\"");
        let back: GameplayTag = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tag);
    }
}
