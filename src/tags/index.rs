//! Reference-counted status tag index.
//!
//! Each actor owns one `StatusTagIndex`. Sources (active effects, running
//! abilities, scripted state) add and remove labels in pairs; the index keeps
//! a count per label so that a label held by two sources stays present until
//! both release it.
//!
//! ## Notifications
//!
//! Subscribers choose a [`TagEventKind`]:
//!
//! - `NewOrRemoved` fires only on 0→1 and 1→0 transitions, exactly once per
//!   transition no matter how many sources hold the label.
//! - `AnyCountChange` fires on every count change.
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use rust_abilities::tags::{GameplayTag, StatusTagIndex, TagEventKind};
//!
//! let dead = GameplayTag::new("State.Dead");
//! let mut tags = StatusTagIndex::new();
//! let seen = Rc::new(RefCell::new(Vec::new()));
//!
//! let sink = Rc::clone(&seen);
//! tags.subscribe(&dead, TagEventKind::NewOrRemoved, move |change| {
//!     sink.borrow_mut().push(change.new_count);
//! });
//!
//! tags.add_tag(&dead);
//! tags.add_tag(&dead);
//! tags.remove_tag(&dead); // still held once, no notification
//! tags.remove_tag(&dead);
//!
//! assert_eq!(*seen.borrow(), vec![1, 0]);
//! ```

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::core::{DelegateHandle, MulticastDelegate};

use super::tag::GameplayTag;

/// Which count changes a subscriber wants to hear about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TagEventKind {
    /// Only when the label appears (0→1) or disappears (1→0).
    #[default]
    NewOrRemoved,
    /// Whenever the count changes.
    AnyCountChange,
}

/// Payload delivered to tag subscribers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagCountChanged {
    pub tag: GameplayTag,
    pub previous_count: u32,
    pub new_count: u32,
}

impl TagCountChanged {
    /// The label went from absent to present.
    #[must_use]
    pub fn appeared(&self) -> bool {
        self.previous_count == 0 && self.new_count > 0
    }

    /// The label went from present to absent.
    #[must_use]
    pub fn disappeared(&self) -> bool {
        self.previous_count > 0 && self.new_count == 0
    }
}

/// A live subscription. Pass it back to [`StatusTagIndex::unsubscribe`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TagSubscription {
    pub tag: GameplayTag,
    pub kind: TagEventKind,
    pub handle: DelegateHandle,
}

/// Per-actor multiset of status labels.
#[derive(Debug, Default)]
pub struct StatusTagIndex {
    counts: FxHashMap<GameplayTag, u32>,
    on_transition: FxHashMap<GameplayTag, MulticastDelegate<TagCountChanged>>,
    on_count_change: FxHashMap<GameplayTag, MulticastDelegate<TagCountChanged>>,
}

impl StatusTagIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one reference to `tag`, returns the new count.
    pub fn add_tag(&mut self, tag: &GameplayTag) -> u32 {
        let count = self.counts.entry(tag.clone()).or_insert(0);
        let previous_count = *count;
        *count += 1;
        let new_count = *count;

        self.notify(tag, previous_count, new_count);
        new_count
    }

    /// Remove one reference to `tag`, returns the new count.
    ///
    /// Removing a label that is not present does nothing and fires nothing.
    pub fn remove_tag(&mut self, tag: &GameplayTag) -> u32 {
        let Some(count) = self.counts.get_mut(tag) else {
            return 0;
        };
        let previous_count = *count;
        *count -= 1;
        let new_count = *count;
        if new_count == 0 {
            self.counts.remove(tag);
        }

        self.notify(tag, previous_count, new_count);
        new_count
    }

    /// Add one reference to each tag.
    pub fn add_tags<'a>(&mut self, tags: impl IntoIterator<Item = &'a GameplayTag>) {
        for tag in tags {
            self.add_tag(tag);
        }
    }

    /// Remove one reference to each tag.
    pub fn remove_tags<'a>(&mut self, tags: impl IntoIterator<Item = &'a GameplayTag>) {
        for tag in tags {
            self.remove_tag(tag);
        }
    }

    /// Check if the exact label is present.
    #[must_use]
    pub fn has_tag(&self, tag: &GameplayTag) -> bool {
        self.counts.contains_key(tag)
    }

    /// Check if any present label equals or descends from `query`.
    #[must_use]
    pub fn has_matching(&self, query: &GameplayTag) -> bool {
        self.counts.keys().any(|t| t.matches(query))
    }

    /// Check if any label in `query` is matched.
    #[must_use]
    pub fn has_any(&self, query: &[GameplayTag]) -> bool {
        query.iter().any(|q| self.has_matching(q))
    }

    /// Check if every label in `query` is matched. Empty queries pass.
    #[must_use]
    pub fn has_all(&self, query: &[GameplayTag]) -> bool {
        query.iter().all(|q| self.has_matching(q))
    }

    /// Current reference count of the exact label.
    #[must_use]
    pub fn count(&self, tag: &GameplayTag) -> u32 {
        self.counts.get(tag).copied().unwrap_or(0)
    }

    /// Iterate over present labels and their counts (unordered).
    pub fn iter(&self) -> impl Iterator<Item = (&GameplayTag, u32)> {
        self.counts.iter().map(|(t, c)| (t, *c))
    }

    /// Number of distinct labels present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Check if no label is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Subscribe to count changes of `tag`.
    pub fn subscribe(
        &mut self,
        tag: &GameplayTag,
        kind: TagEventKind,
        callback: impl FnMut(&TagCountChanged) + 'static,
    ) -> TagSubscription {
        let listeners = match kind {
            TagEventKind::NewOrRemoved => &mut self.on_transition,
            TagEventKind::AnyCountChange => &mut self.on_count_change,
        };
        let handle = listeners.entry(tag.clone()).or_default().add(callback);
        TagSubscription {
            tag: tag.clone(),
            kind,
            handle,
        }
    }

    /// Drop a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, subscription: &TagSubscription) -> bool {
        let listeners = match subscription.kind {
            TagEventKind::NewOrRemoved => &mut self.on_transition,
            TagEventKind::AnyCountChange => &mut self.on_count_change,
        };
        let Some(delegate) = listeners.get_mut(&subscription.tag) else {
            return false;
        };
        let removed = delegate.remove(subscription.handle);
        if delegate.is_empty() {
            listeners.remove(&subscription.tag);
        }
        removed
    }

    /// Total live subscriptions for `tag`, across both event kinds.
    #[must_use]
    pub fn subscriber_count(&self, tag: &GameplayTag) -> usize {
        self.on_transition.get(tag).map_or(0, MulticastDelegate::len)
            + self.on_count_change.get(tag).map_or(0, MulticastDelegate::len)
    }

    fn notify(&mut self, tag: &GameplayTag, previous_count: u32, new_count: u32) {
        let change = TagCountChanged {
            tag: tag.clone(),
            previous_count,
            new_count,
        };
        if change.appeared() || change.disappeared() {
            if let Some(delegate) = self.on_transition.get_mut(tag) {
                delegate.broadcast(&change);
            }
        }
        if let Some(delegate) = self.on_count_change.get_mut(tag) {
            delegate.broadcast(&change);
        }
    }
}
