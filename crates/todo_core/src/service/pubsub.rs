//! Minimal publish/subscribe registry shared by the services.
//!
//! # Invariants
//! - Subscription ids are never reused within one registry.
//! - Callbacks run in subscription order on the publishing thread.
//! - Callbacks must not call back into the publishing service; they run
//!   while the publisher holds its state.

use std::collections::BTreeMap;
use std::fmt::{Debug, Display, Formatter};

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl Display for SubscriptionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

type Callback<T> = Box<dyn FnMut(&T) + Send>;

/// Subscriber registry keyed by `SubscriptionId`.
pub struct SubscriberSet<T> {
    next_id: u64,
    callbacks: BTreeMap<SubscriptionId, Callback<T>>,
}

impl<T> SubscriberSet<T> {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            callbacks: BTreeMap::new(),
        }
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&T) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.callbacks.insert(id, Box::new(callback));
        id
    }

    /// Returns whether the subscription existed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.callbacks.remove(&id).is_some()
    }

    pub fn publish(&mut self, value: &T) {
        for callback in self.callbacks.values_mut() {
            callback(value);
        }
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl<T> Default for SubscriberSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Debug for SubscriberSet<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberSet")
            .field("subscribers", &self.callbacks.len())
            .finish()
    }
}
