//! Single-owner state with coalesced change notification
//!
//! Hover/menu style collaborators and the parameter source both push many
//! small updates per frame. Instead of each call site arming its own debounce
//! timer, updates only mark the store dirty and `flush` (called once per frame
//! by the owner) emits a single notification carrying the latest value.
//!
//! ```rust
//! use vitro_core::StateStore;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let mut hovered = StateStore::new(None::<u32>);
//! let emissions = Arc::new(AtomicUsize::new(0));
//! let seen = emissions.clone();
//! hovered.subscribe(move |_| {
//!     seen.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! hovered.update(|v| *v = Some(1));
//! hovered.update(|v| *v = Some(2));
//! assert!(hovered.flush());
//! assert_eq!(emissions.load(Ordering::SeqCst), 1);
//! ```

use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Handle returned by [`StateStore::subscribe`]
    pub struct SubscriptionId;
}

/// Subscriber callback, invoked with the latest value on flush
pub type Subscriber<T> = Box<dyn Fn(&T) + Send + Sync>;

/// Explicit owner of a piece of shared UI state
pub struct StateStore<T> {
    value: T,
    subscribers: SlotMap<SubscriptionId, Subscriber<T>>,
    dirty: bool,
    pending_updates: u32,
}

impl<T> StateStore<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            subscribers: SlotMap::with_key(),
            dirty: false,
            pending_updates: 0,
        }
    }

    /// Current value, including updates not yet flushed
    pub fn get(&self) -> &T {
        &self.value
    }

    /// Mutate the value; subscribers hear about it on the next flush
    pub fn update<F: FnOnce(&mut T)>(&mut self, f: F) {
        f(&mut self.value);
        self.dirty = true;
        self.pending_updates += 1;
    }

    /// Replace the value outright
    pub fn set(&mut self, value: T) {
        self.update(|v| *v = value);
    }

    pub fn subscribe<F>(&mut self, f: F) -> SubscriptionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.subscribers.insert(Box::new(f))
    }

    /// Remove a subscriber; returns false if it was already gone
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.remove(id).is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Emit one notification if anything changed since the last flush.
    ///
    /// Returns whether subscribers were notified.
    pub fn flush(&mut self) -> bool {
        if !self.dirty {
            return false;
        }

        tracing::trace!(
            updates = self.pending_updates,
            subscribers = self.subscribers.len(),
            "flushing coalesced state updates"
        );

        self.dirty = false;
        self.pending_updates = 0;
        for (_, subscriber) in self.subscribers.iter() {
            subscriber(&self.value);
        }
        true
    }
}

impl<T: Default> Default for StateStore<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn many_updates_flush_once_with_latest_value() {
        let mut store = StateStore::new(0i32);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        store.subscribe(move |v| sink.lock().unwrap().push(*v));

        for i in 1..=5 {
            store.update(|v| *v = i);
        }
        assert!(store.flush());
        assert!(!store.flush());

        assert_eq!(*seen.lock().unwrap(), vec![5]);
    }

    #[test]
    fn clean_store_does_not_emit() {
        let mut store = StateStore::new("idle");
        let seen = Arc::new(Mutex::new(0));
        let sink = seen.clone();
        store.subscribe(move |_| *sink.lock().unwrap() += 1);

        assert!(!store.flush());
        assert_eq!(*seen.lock().unwrap(), 0);
    }

    #[test]
    fn unsubscribed_callbacks_stop_receiving() {
        let mut store = StateStore::new(0u8);
        let seen = Arc::new(Mutex::new(0));
        let sink = seen.clone();
        let id = store.subscribe(move |_| *sink.lock().unwrap() += 1);

        store.set(1);
        store.flush();
        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));

        store.set(2);
        store.flush();
        assert_eq!(*seen.lock().unwrap(), 1);
        assert_eq!(store.subscriber_count(), 0);
    }
}
