//! Multicast delegates: explicit subscribe/unsubscribe callback lists.
//!
//! Every notification the crate exposes (attribute changes, tag transitions,
//! ability activated/ended, target acquired, item stack changes) is a
//! `MulticastDelegate`. Subscribing returns a [`DelegateHandle`]; removing a
//! handle twice, or a handle that was never issued, is a no-op.
//!
//! Callbacks run synchronously, in subscription order, while the owner is
//! mutably borrowed. A callback therefore cannot reach back into the object
//! that is notifying it; callbacks that need to trigger follow-up work record
//! it (for example into a shared queue) and let the host drain it afterward.
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use rust_abilities::core::MulticastDelegate;
//!
//! let mut on_hit: MulticastDelegate<u32> = MulticastDelegate::new();
//! let total = Rc::new(Cell::new(0));
//!
//! let sink = Rc::clone(&total);
//! let handle = on_hit.add(move |damage: &u32| sink.set(sink.get() + *damage));
//!
//! on_hit.broadcast(&5);
//! assert!(on_hit.remove(handle));
//! assert!(!on_hit.remove(handle)); // already gone
//! on_hit.broadcast(&5);
//!
//! assert_eq!(total.get(), 5);
//! ```

use serde::{Deserialize, Serialize};

/// Handle identifying one subscription on one delegate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DelegateHandle(pub u32);

impl DelegateHandle {
    /// Never issued by any delegate.
    pub const INVALID: Self = Self(0);

    /// Get the raw handle value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Check whether this handle could have been issued by a delegate.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl std::fmt::Display for DelegateHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Delegate({})", self.0)
    }
}

struct Listener<E> {
    handle: DelegateHandle,
    callback: Box<dyn FnMut(&E)>,
}

/// An ordered list of callbacks invoked with a shared event payload.
pub struct MulticastDelegate<E> {
    listeners: Vec<Listener<E>>,
    next_id: u32,
}

impl<E> MulticastDelegate<E> {
    /// Create an empty delegate.
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 1,
        }
    }

    /// Subscribe a callback, returns the handle used to unsubscribe.
    pub fn add(&mut self, callback: impl FnMut(&E) + 'static) -> DelegateHandle {
        let handle = DelegateHandle(self.next_id);
        self.next_id += 1;
        self.listeners.push(Listener {
            handle,
            callback: Box::new(callback),
        });
        handle
    }

    /// Unsubscribe a callback.
    ///
    /// Returns `true` if the handle was subscribed. Unknown or already
    /// removed handles are ignored.
    pub fn remove(&mut self, handle: DelegateHandle) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.handle != handle);
        self.listeners.len() != before
    }

    /// Check whether a handle is currently subscribed.
    #[must_use]
    pub fn contains(&self, handle: DelegateHandle) -> bool {
        self.listeners.iter().any(|l| l.handle == handle)
    }

    /// Invoke every callback with the event, in subscription order.
    pub fn broadcast(&mut self, event: &E) {
        for listener in &mut self.listeners {
            (listener.callback)(event);
        }
    }

    /// Drop every subscription.
    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    /// Number of subscribed callbacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Check if no callback is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl<E> Default for MulticastDelegate<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for MulticastDelegate<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MulticastDelegate")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
