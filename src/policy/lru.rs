//! The LRU policy implementation.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use tracing::debug;

use super::{acquire_weight, release_weight, Entry, LockedCache, ReplacementPolicy, SizeCalculator};
use crate::collections::{Handle, OrderedQueue};

/// A thread safe LRU cache.
pub type LruCache<K, V> = LockedCache<LruCore<K, V>>;

impl<K: Hash + Eq + Clone, V> LockedCache<LruCore<K, V>> {
    /// Create an LRU cache bounded by `max_weight`.
    ///
    /// Without a `size_calc`, every value weighs 1.
    #[inline]
    #[must_use]
    pub fn new(max_weight: u64, size_calc: Option<SizeCalculator<V>>) -> Self {
        Self::with_core("lru", LruCore::new(max_weight, size_calc))
    }
}

/// The evict policy based on LRU, bounded by the total weight of its values.
pub struct LruCore<K, V> {
    /// Resident keys
    map: HashMap<K, Handle>,
    /// Entries from the least to the most recently used
    queue: OrderedQueue<Entry<K, V>>,
    /// The total weight of resident values
    weight: u64,
    /// The weight this cache may hold
    max_weight: u64,
    /// Computes the weight of a value, every value weighs 1 without it
    size_calc: Option<SizeCalculator<V>>,
}

impl<K, V> fmt::Debug for LruCore<K, V> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCore")
            .field("len", &self.map.len())
            .field("weight", &self.weight)
            .field("max_weight", &self.max_weight)
            .finish_non_exhaustive()
    }
}

impl<K: Hash + Eq + Clone, V> LruCore<K, V> {
    /// Create a new `LruCore` bounded by `max_weight`.
    #[inline]
    #[must_use]
    pub fn new(max_weight: u64, size_calc: Option<SizeCalculator<V>>) -> Self {
        Self {
            map: HashMap::new(),
            queue: OrderedQueue::new(),
            weight: 0,
            max_weight,
            size_calc,
        }
    }

    /// The total weight of resident values.
    #[inline]
    #[must_use]
    pub fn weight(&self) -> u64 {
        self.weight
    }

    /// The weight this cache may hold.
    #[inline]
    #[must_use]
    pub fn max_weight(&self) -> u64 {
        self.max_weight
    }

    /// Resident keys, from the next to be evicted to the most recently used.
    #[inline]
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.queue.iter().map(|entry| &entry.key)
    }

    /// The weight of `value`.
    fn weigh(&self, value: &V) -> u64 {
        self.size_calc.as_ref().map_or(1, |calc| calc(value))
    }

    /// Evict from the front until the weight fits.
    fn shrink(&mut self) {
        while self.weight > self.max_weight {
            let Some(evicted) = self.queue.pop_front() else {
                panic!(
                    "LRU current size {} with no resident element",
                    self.weight
                );
            };
            let _: Option<Handle> = self.map.remove(&evicted.key);
            let released = self.weigh(&evicted.value);
            self.weight = release_weight(self.weight, released, "LRU");
            debug!(weight = self.weight, released, "LRU evicted an entry");
        }
    }
}

impl<K: Hash + Eq + Clone, V> ReplacementPolicy<K, V> for LruCore<K, V> {
    #[inline]
    fn put(&mut self, key: K, value: V) {
        let added = self.weigh(&value);
        if let Some(&handle) = self.map.get(&key) {
            let entry = self
                .queue
                .get_mut(handle)
                .unwrap_or_else(|| panic!("LRU lookup table refers to a removed entry"));
            let old = std::mem::replace(&mut entry.value, value);
            let released = self.weigh(&old);
            self.weight = acquire_weight(release_weight(self.weight, released, "LRU"), added);
            let _: bool = self.queue.move_to_back(handle);
        } else {
            let handle = self.queue.push_back(Entry {
                key: key.clone(),
                value,
            });
            let _: Option<Handle> = self.map.insert(key, handle);
            self.weight = acquire_weight(self.weight, added);
        }
        self.shrink();
    }

    #[inline]
    fn get(&mut self, key: &K) -> Option<&V> {
        let handle = *self.map.get(key)?;
        let _: bool = self.queue.move_to_back(handle);
        self.queue.get(handle).map(|entry| &entry.value)
    }

    #[inline]
    fn delete(&mut self, key: &K) {
        let Some(handle) = self.map.remove(key) else {
            return;
        };
        if let Some(entry) = self.queue.remove(handle) {
            let released = self.weigh(&entry.value);
            self.weight = release_weight(self.weight, released, "LRU");
        }
    }

    #[inline]
    fn len(&self) -> usize {
        self.map.len()
    }
}
