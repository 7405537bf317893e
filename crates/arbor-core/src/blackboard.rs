use std::any::Any;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::observer::{ObserverList, Subscription};
use crate::{Value, ValueTag};

const DEFAULT_CAPACITY: usize = 32;

/// Stable 64-bit FNV-1a hash of a blackboard key.
///
/// Keys are identified by this hash alone.
pub const fn key_hash(key: &str) -> u64 {
    let bytes = key.as_bytes();
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        i += 1;
    }
    hash
}

/// A typed, named blackboard key.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BbKey<T: 'static> {
    name: &'static str,
    _phantom: PhantomData<fn() -> T>,
}

impl<T: 'static> Copy for BbKey<T> {}

impl<T: 'static> Clone for BbKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: 'static> BbKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _phantom: PhantomData,
        }
    }

    pub fn name(self) -> &'static str {
        self.name
    }

    pub fn key_hash(self) -> u64 {
        key_hash(self.name)
    }
}

#[derive(Debug, Clone)]
struct Entry {
    key_hash: u64,
    key: Arc<str>,
    value: Value,
}

#[derive(Debug, Default)]
struct Store {
    entries: Vec<Entry>,
    index: HashMap<u64, usize>,
}

impl Store {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    fn get(&self, hash: u64) -> Option<&Entry> {
        self.index.get(&hash).map(|&slot| &self.entries[slot])
    }

    fn upsert(&mut self, hash: u64, key: &str, value: Value) {
        if let Some(&slot) = self.index.get(&hash) {
            self.entries[slot].value = value;
            return;
        }
        self.index.insert(hash, self.entries.len());
        self.entries.push(Entry {
            key_hash: hash,
            key: Arc::from(key),
            value,
        });
    }

    /// Swap-remove: the last live entry moves into the freed slot.
    fn remove(&mut self, hash: u64) -> Option<Value> {
        let slot = self.index.remove(&hash)?;
        let removed = self.entries.swap_remove(slot);
        if let Some(moved) = self.entries.get(slot) {
            self.index.insert(moved.key_hash, slot);
        }
        Some(removed.value)
    }
}

/// Shared key/value store read and written by nodes during a run.
///
/// Entries are kept densely packed; removal is O(1). Every `set_value` (and every removal of a
/// present key) synchronously notifies the observers watching that key.
pub struct Blackboard {
    id: u64,
    store: RwLock<Store>,
    observers: Arc<ObserverList>,
}

impl Default for Blackboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Blackboard {
    pub fn new() -> Self {
        Self::with_capacity(0, DEFAULT_CAPACITY)
    }

    pub fn with_id(id: u64) -> Self {
        Self::with_capacity(id, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(id: u64, capacity: usize) -> Self {
        Self {
            id,
            store: RwLock::new(Store::with_capacity(capacity)),
            observers: Arc::new(ObserverList::default()),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn len(&self) -> usize {
        self.store.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn set_value<T: Any + Send + Sync>(&self, key: &str, value: T) {
        if key.is_empty() {
            return;
        }
        let hash = key_hash(key);
        let value = Value::from_typed(value);
        self.store.write().upsert(hash, key, value.clone());
        self.observers.notify(hash, key, Some(&value));
    }

    /// Read `key` as `T`, falling back to best-effort conversion and finally to `default`.
    pub fn get_value<T: Any + Clone>(&self, key: &str, default: T) -> T {
        self.try_get_value(key).unwrap_or(default)
    }

    pub fn try_get_value<T: Any + Clone>(&self, key: &str) -> Option<T> {
        let store = self.store.read();
        store.get(key_hash(key))?.value.to_typed::<T>()
    }

    /// The raw cell stored under `key`.
    pub fn value(&self, key: &str) -> Option<Value> {
        let store = self.store.read();
        store.get(key_hash(key)).map(|e| e.value.clone())
    }

    pub fn value_tag(&self, key: &str) -> Option<ValueTag> {
        let store = self.store.read();
        store.get(key_hash(key)).map(|e| e.value.tag())
    }

    pub fn has_value(&self, key: &str) -> bool {
        if key.is_empty() {
            return false;
        }
        self.store.read().index.contains_key(&key_hash(key))
    }

    pub fn remove_value(&self, key: &str) -> Option<Value> {
        if key.is_empty() {
            return None;
        }
        let hash = key_hash(key);
        let removed = self.store.write().remove(hash)?;
        self.observers.notify(hash, key, None);
        Some(removed)
    }

    /// Live keys in slot order. The order changes whenever an entry is removed.
    pub fn keys(&self) -> Vec<Arc<str>> {
        self.store
            .read()
            .entries
            .iter()
            .map(|e| e.key.clone())
            .collect()
    }

    pub fn set<T: Any + Send + Sync>(&self, key: BbKey<T>, value: T) {
        self.set_value(key.name, value);
    }

    pub fn get<T: Any + Clone>(&self, key: BbKey<T>) -> Option<T> {
        self.try_get_value(key.name)
    }

    pub fn contains<T: 'static>(&self, key: BbKey<T>) -> bool {
        self.has_value(key.name)
    }

    pub fn remove<T: Any + Clone>(&self, key: BbKey<T>) -> Option<T> {
        self.remove_value(key.name)?.to_typed::<T>()
    }

    /// Observe changes to `key`. The observer lives as long as the returned guard.
    pub fn subscribe(
        &self,
        key: &str,
        callback: impl Fn(&str, Option<&Value>) + Send + Sync + 'static,
    ) -> Subscription {
        self.observers.add(Some(key_hash(key)), Arc::new(callback))
    }

    /// Observe changes to every key.
    pub fn subscribe_all(
        &self,
        callback: impl Fn(&str, Option<&Value>) + Send + Sync + 'static,
    ) -> Subscription {
        self.observers.add(None, Arc::new(callback))
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Drop every entry without notifying observers.
    pub fn clear(&self) {
        let mut store = self.store.write();
        store.entries.clear();
        store.index.clear();
    }

    /// Clear all entries and drop every observer.
    pub fn dispose(&self) {
        self.clear();
        self.observers.clear();
        tracing::debug!(blackboard = self.id, "blackboard disposed");
    }
}

impl std::fmt::Debug for Blackboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blackboard")
            .field("id", &self.id)
            .field("len", &self.len())
            .field("observers", &self.observer_count())
            .finish()
    }
}
