//! Topic management
//!
//! A `Topic` holds the subscribers of one post in insertion order. Order is
//! only used to make fanout iteration deterministic.
//!
//! Concurrency note: callers must hold the registry lock when modifying a
//! topic. Delivery never walks the live list; it works on `snapshot()`.

use super::subscriber::{Subscriber, SubscriberId};

#[derive(Debug, Default)]
pub struct Topic {
    subscribers: Vec<Subscriber>,
}

impl Topic {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }

    /// Append a subscriber. Ids come from the registry counter, so they are
    /// unique without checking.
    pub fn subscribe(&mut self, subscriber: Subscriber) {
        self.subscribers.push(subscriber);
    }

    /// Remove a subscriber and hand it back so the caller can close it
    /// outside the registry lock. Unknown ids return `None`.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> Option<Subscriber> {
        let pos = self.subscribers.iter().position(|s| s.id == id)?;
        Some(self.subscribers.remove(pos))
    }

    /// Copy of the current subscriber list, used for delivery outside the lock.
    pub fn snapshot(&self) -> Vec<Subscriber> {
        self.subscribers.clone()
    }

    pub fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.iter().any(|s| s.id == id)
    }

    pub fn ids(&self) -> Vec<SubscriberId> {
        self.subscribers.iter().map(|s| s.id).collect()
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}
