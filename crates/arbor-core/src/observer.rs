//! Change observers registered on a [`Blackboard`](crate::Blackboard).
//!
//! Observers are keyed by the hash of the watched key (or by nothing, for observers interested in
//! every key). Each registration hands back a [`Subscription`] guard; dropping the guard removes
//! the observer, so a node that is reset or dropped never leaves a dangling callback behind.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::Value;

pub type ObserverFn = dyn Fn(&str, Option<&Value>) + Send + Sync;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn get(self) -> u64 {
        self.0
    }
}

struct Observer {
    id: SubscriptionId,
    key_hash: Option<u64>,
    callback: Arc<ObserverFn>,
}

#[derive(Default)]
pub(crate) struct ObserverList {
    next_id: AtomicU64,
    observers: Mutex<Vec<Observer>>,
}

impl ObserverList {
    pub(crate) fn add(self: &Arc<Self>, key_hash: Option<u64>, callback: Arc<ObserverFn>) -> Subscription {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.observers.lock().push(Observer {
            id,
            key_hash,
            callback,
        });
        Subscription {
            id,
            list: Arc::downgrade(self),
        }
    }

    fn remove(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.lock();
        match observers.iter().position(|o| o.id == id) {
            Some(pos) => {
                observers.remove(pos);
                true
            }
            None => false,
        }
    }

    fn contains(&self, id: SubscriptionId) -> bool {
        self.observers.lock().iter().any(|o| o.id == id)
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.lock().len()
    }

    pub(crate) fn clear(&self) {
        self.observers.lock().clear();
    }

    /// Invoke every observer interested in `key_hash`, in registration order.
    ///
    /// Callbacks run outside the list lock so they may subscribe or unsubscribe.
    pub(crate) fn notify(&self, key_hash: u64, key: &str, value: Option<&Value>) {
        let interested: Vec<Arc<ObserverFn>> = {
            let observers = self.observers.lock();
            observers
                .iter()
                .filter(|o| o.key_hash.map_or(true, |h| h == key_hash))
                .map(|o| o.callback.clone())
                .collect()
        };
        for callback in interested {
            callback(key, value);
        }
    }
}

/// Guard for a registered observer. Dropping it unsubscribes.
#[must_use = "dropping a Subscription immediately unsubscribes the observer"]
pub struct Subscription {
    id: SubscriptionId,
    list: Weak<ObserverList>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// `false` once the observer was removed, either explicitly or by disposing the blackboard.
    pub fn is_active(&self) -> bool {
        self.list
            .upgrade()
            .map(|list| list.contains(self.id))
            .unwrap_or(false)
    }

    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(list) = self.list.upgrade() {
            list.remove(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
