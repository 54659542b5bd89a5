//! The LFU policy implementation.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use tracing::debug;

use super::{Entry, LockedCache, ReplacementPolicy};
use crate::collections::{Handle, IndexedPriorityQueue};

/// The score of a freshly inserted entry.
const INITIAL_SCORE: i64 = -1;

/// A thread safe LFU cache.
pub type LfuCache<K, V> = LockedCache<LfuCore<K, V>>;

impl<K: Hash + Eq + Clone, V> LockedCache<LfuCore<K, V>> {
    /// Create an LFU cache holding at most `max_entries` entries.
    ///
    /// # Panics
    /// Panics if `max_entries` is zero.
    #[inline]
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self::with_core("lfu", LfuCore::new(max_entries))
    }
}

/// The evict policy based on access counts.
///
/// Each entry carries a score starting at -1 and decremented on every hit.
/// The entry with the highest score, i.e. the fewest accesses, goes first.
pub struct LfuCore<K, V> {
    /// Resident keys
    map: HashMap<K, Handle>,
    /// Entries keyed by score
    queue: IndexedPriorityQueue<i64, Entry<K, V>>,
}

impl<K, V> fmt::Debug for LfuCore<K, V> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LfuCore")
            .field("len", &self.map.len())
            .field("max_entries", &self.queue.max_size())
            .finish_non_exhaustive()
    }
}

impl<K: Hash + Eq + Clone, V> LfuCore<K, V> {
    /// Create a new `LfuCore` holding at most `max_entries` entries.
    ///
    /// # Panics
    /// Panics if `max_entries` is zero.
    #[inline]
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            map: HashMap::with_capacity(max_entries),
            queue: IndexedPriorityQueue::new(max_entries),
        }
    }

    /// The maximum number of entries.
    #[inline]
    #[must_use]
    pub fn max_entries(&self) -> usize {
        self.queue.max_size()
    }

    /// The current score of `key`, lower is stickier.
    #[inline]
    #[must_use]
    pub fn score(&self, key: &K) -> Option<i64> {
        self.map
            .get(key)
            .and_then(|&handle| self.queue.priority(handle))
    }

    /// Resident keys, in no particular order.
    #[inline]
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.map.keys()
    }
}

impl<K: Hash + Eq + Clone, V> ReplacementPolicy<K, V> for LfuCore<K, V> {
    #[inline]
    fn put(&mut self, key: K, value: V) {
        if let Some(&handle) = self.map.get(&key) {
            if let Some(entry) = self.queue.get_mut(handle) {
                entry.value = value;
            }
            return;
        }

        let (handle, evicted) = self.queue.push_bounded(
            INITIAL_SCORE,
            Entry {
                key: key.clone(),
                value,
            },
        );
        if let Some(evicted) = evicted {
            let _: Option<Handle> = self.map.remove(&evicted.key);
            debug!(len = self.queue.len(), "LFU evicted an entry");
        }
        let _: Option<Handle> = self.map.insert(key, handle);
    }

    #[inline]
    fn get(&mut self, key: &K) -> Option<&V> {
        let handle = *self.map.get(key)?;
        let _: bool = self.queue.decrease_priority(handle, 1);
        self.queue.get(handle).map(|entry| &entry.value)
    }

    #[inline]
    fn delete(&mut self, key: &K) {
        if let Some(handle) = self.map.remove(key) {
            let _: Option<Entry<K, V>> = self.queue.remove(handle);
        }
    }

    #[inline]
    fn len(&self) -> usize {
        self.map.len()
    }
}
