//! Fixed-capacity cache that evicts the lowest-ordered keys first.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Key-ordered store holding at most `capacity` entries.
///
/// Eviction follows key order rather than insertion order: when an insert
/// pushes the cache over capacity, the smallest keys are dropped until it
/// fits again. With block heights as keys this keeps the most recent window
/// of blocks even when older heights are (re)inserted late.
#[derive(Debug)]
pub struct BoundedRecencyCache<K, T> {
    capacity: usize,
    entries: Mutex<BTreeMap<K, T>>,
}

impl<K, T> BoundedRecencyCache<K, T>
where
    K: Ord,
    T: Clone,
{
    /// Builds an empty cache retaining at most `capacity` entries.
    #[must_use]
    pub const fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    /// Returns a clone of the value stored for `key`.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<T> {
        self.lock_entries().get(key).cloned()
    }

    /// Stores `value` under `key` and returns how many entries were evicted.
    ///
    /// The freshly inserted entry is itself evicted when its key is the
    /// smallest and the cache is full.
    pub fn set(&self, key: K, value: T) -> usize {
        let mut entries = self.lock_entries();
        entries.insert(key, value);
        let mut evicted = 0;
        while entries.len() > self.capacity {
            if entries.pop_first().is_none() {
                break;
            }
            evicted += 1;
        }
        evicted
    }

    /// Returns `true` when `key` is cached.
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.lock_entries().contains_key(key)
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    /// Returns `true` when nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock_entries().is_empty()
    }

    /// Maximum number of retained entries.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.lock_entries().clear();
    }

    fn lock_entries(&self) -> MutexGuard<'_, BTreeMap<K, T>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
