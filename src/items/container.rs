//! Per-actor item stack counts.

use std::collections::BTreeMap;

use tracing::debug;

use crate::core::{ActorId, DelegateHandle, MulticastDelegate};

use super::definition::{ItemDefinition, ItemId};
use super::error::ItemError;

/// A stack count moved from `old` to `new`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StackChange {
    pub owner: ActorId,
    pub item: ItemId,
    pub old: u32,
    pub new: u32,
}

impl StackChange {
    #[must_use]
    pub fn is_first(&self) -> bool {
        self.old == 0 && self.new > 0
    }

    #[must_use]
    pub fn is_emptied(&self) -> bool {
        self.new == 0
    }
}

/// Stack counts of one actor, clamped to `[0, max_stack]`.
#[derive(Debug)]
pub struct ItemContainer {
    owner: ActorId,
    stacks: BTreeMap<ItemId, u32>,
    on_item_added: MulticastDelegate<StackChange>,
    on_stack_changed: MulticastDelegate<StackChange>,
}

impl ItemContainer {
    pub fn new(owner: ActorId) -> Self {
        Self {
            owner,
            stacks: BTreeMap::new(),
            on_item_added: MulticastDelegate::new(),
            on_stack_changed: MulticastDelegate::new(),
        }
    }

    #[must_use]
    pub fn owner(&self) -> ActorId {
        self.owner
    }

    /// Add `count` units, clamped to the item's stack limit.
    ///
    /// Fails when the clamped count does not change (the stack is full).
    pub fn add(&mut self, item: &ItemDefinition, count: u32) -> Result<StackChange, ItemError> {
        if count == 0 {
            return Err(ItemError::InvalidCount);
        }
        let old = self.count(item.id);
        let new = old.saturating_add(count).min(item.max_stack.max(1));
        if new == old {
            return Err(ItemError::Unchanged(item.id));
        }
        self.stacks.insert(item.id, new);

        let change = StackChange {
            owner: self.owner,
            item: item.id,
            old,
            new,
        };
        debug!(actor = %self.owner, item = %item.name, old, new, "item added");
        if change.is_first() {
            self.on_item_added.broadcast(&change);
        }
        self.on_stack_changed.broadcast(&change);
        Ok(change)
    }

    /// Remove up to `count` units. An emptied stack is dropped.
    pub fn remove(&mut self, item: ItemId, count: u32) -> Result<StackChange, ItemError> {
        if count == 0 {
            return Err(ItemError::InvalidCount);
        }
        let Some(stack) = self.stacks.get_mut(&item) else {
            return Err(ItemError::NotHeld(item));
        };
        let old = *stack;
        let new = old.saturating_sub(count);
        *stack = new;
        if new == 0 {
            self.stacks.remove(&item);
        }

        let change = StackChange {
            owner: self.owner,
            item,
            old,
            new,
        };
        debug!(actor = %self.owner, %item, old, new, "item removed");
        self.on_stack_changed.broadcast(&change);
        Ok(change)
    }

    #[must_use]
    pub fn count(&self, item: ItemId) -> u32 {
        self.stacks.get(&item).copied().unwrap_or(0)
    }

    /// Check if at least `count` units are held. Asking for zero is `false`.
    #[must_use]
    pub fn has(&self, item: ItemId, count: u32) -> bool {
        count > 0 && self.count(item) >= count
    }

    /// Held items in id order.
    pub fn iter(&self) -> impl Iterator<Item = (ItemId, u32)> + '_ {
        self.stacks.iter().map(|(id, count)| (*id, *count))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    pub fn subscribe_item_added(&mut self, callback: impl FnMut(&StackChange) + 'static) -> DelegateHandle {
        self.on_item_added.add(callback)
    }

    pub fn subscribe_stack_changed(&mut self, callback: impl FnMut(&StackChange) + 'static) -> DelegateHandle {
        self.on_stack_changed.add(callback)
    }

    pub fn unsubscribe_item_added(&mut self, handle: DelegateHandle) -> bool {
        self.on_item_added.remove(handle)
    }

    pub fn unsubscribe_stack_changed(&mut self, handle: DelegateHandle) -> bool {
        self.on_stack_changed.remove(handle)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    fn potion() -> ItemDefinition {
        ItemDefinition::new(ItemId(1), "Potion").with_max_stack(3)
    }

    #[test]
    fn test_add_clamps_to_max_stack() {
        let mut container = ItemContainer::new(ActorId(1));
        let change = container.add(&potion(), 5).unwrap();
        assert_eq!((change.old, change.new), (0, 3));
        assert_eq!(container.add(&potion(), 1), Err(ItemError::Unchanged(ItemId(1))));
        assert_eq!(container.count(ItemId(1)), 3);
    }

    #[test]
    fn test_remove_drops_empty_stack() {
        let mut container = ItemContainer::new(ActorId(1));
        container.add(&potion(), 2).unwrap();
        let change = container.remove(ItemId(1), 5).unwrap();
        assert!(change.is_emptied());
        assert!(container.is_empty());
        assert_eq!(container.remove(ItemId(1), 1), Err(ItemError::NotHeld(ItemId(1))));
    }

    #[test]
    fn test_zero_count_rejected() {
        let mut container = ItemContainer::new(ActorId(1));
        assert_eq!(container.add(&potion(), 0), Err(ItemError::InvalidCount));
        assert!(!container.has(ItemId(1), 0));
    }

    #[test]
    fn test_added_fires_only_for_first_unit() {
        let mut container = ItemContainer::new(ActorId(1));
        let added = Rc::new(RefCell::new(0));
        let changed = Rc::new(RefCell::new(0));
        let (a, c) = (Rc::clone(&added), Rc::clone(&changed));
        container.subscribe_item_added(move |_| *a.borrow_mut() += 1);
        container.subscribe_stack_changed(move |_| *c.borrow_mut() += 1);

        container.add(&potion(), 1).unwrap();
        container.add(&potion(), 1).unwrap();
        container.remove(ItemId(1), 1).unwrap();
        assert_eq!(*added.borrow(), 1);
        assert_eq!(*changed.borrow(), 3);
    }
}
