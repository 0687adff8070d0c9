//! Protocol signals with RAII subscriptions.
//!
//! An [`EventSource`] only holds weak references to its listeners. The
//! strong side lives in the [`Subscription`] returned by
//! [`EventSource::subscribe`], so dropping the subscription (or the object
//! owning it) is all it takes to stop receiving events.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Emitting side of a signal. `T` identifies the receiver of an event.
pub struct EventSource<T> {
    listeners: RefCell<Vec<Weak<T>>>,
}

impl<T> Default for EventSource<T> {
    fn default() -> Self {
        Self {
            listeners: RefCell::new(Vec::new()),
        }
    }
}

impl<T: Copy> EventSource<T> {
    pub fn subscribe(&self, target: T) -> Subscription<T> {
        let listener = Rc::new(target);
        let mut listeners = self.listeners.borrow_mut();
        listeners.retain(|weak| weak.strong_count() > 0);
        listeners.push(Rc::downgrade(&listener));
        Subscription { listener }
    }

    /// Live listeners in registration order.
    ///
    /// Returns a snapshot so callers may drop subscriptions while
    /// delivering the event.
    pub fn listeners(&self) -> Vec<T> {
        self.listeners
            .borrow()
            .iter()
            .filter_map(Weak::upgrade)
            .map(|listener| *listener)
            .collect()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    pub fn has_listeners(&self) -> bool {
        self.listener_count() > 0
    }
}

impl<T> fmt::Debug for EventSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let live = self
            .listeners
            .borrow()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count();
        f.debug_struct("EventSource").field("listeners", &live).finish()
    }
}

/// Registration handle. Dropping it deregisters the listener.
#[must_use = "dropping a subscription unregisters it immediately"]
pub struct Subscription<T> {
    listener: Rc<T>,
}

impl<T: Copy> Subscription<T> {
    pub fn target(&self) -> T {
        *self.listener
    }
}

impl<T: fmt::Debug> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Subscription").field(&*self.listener).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_unsubscribes() {
        let source = EventSource::default();
        let first = source.subscribe(1u32);
        let second = source.subscribe(2u32);
        assert_eq!(source.listeners(), vec![1, 2]);

        drop(first);
        assert_eq!(source.listeners(), vec![2]);
        assert_eq!(source.listener_count(), 1);

        drop(second);
        assert!(!source.has_listeners());
    }

    #[test]
    fn test_resubscribe_after_drop() {
        let source = EventSource::default();
        let sub = source.subscribe(7u32);
        drop(sub);
        let sub = source.subscribe(7u32);
        assert_eq!(sub.target(), 7);
        assert_eq!(source.listener_count(), 1);
    }
}
