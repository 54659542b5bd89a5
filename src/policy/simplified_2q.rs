//! The simplified 2Q policy implementation.
//!
//! New keys enter the recency segment `A1`. A second reference promotes a key
//! to the frequency segment `Am`, which is managed as an LRU list.
//! See "2Q: A Low Overhead High Performance Buffer Management Replacement
//! Algorithm", Johnson and Shasha, VLDB 1994.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use tracing::debug;

use super::{Entry, Location, LockedCache, ReplacementPolicy, Segment};
use crate::collections::OrderedQueue;

/// A thread safe simplified 2Q cache.
pub type Simplified2QCache<K, V> = LockedCache<Simplified2QCore<K, V>>;

impl<K: Hash + Eq + Clone, V> LockedCache<Simplified2QCore<K, V>> {
    /// Create a simplified 2Q cache holding `a1_size + am_size` entries.
    ///
    /// # Panics
    /// Panics if either size is zero.
    #[inline]
    #[must_use]
    pub fn new(a1_size: usize, am_size: usize) -> Self {
        Self::with_core("2q_simplified", Simplified2QCore::new(a1_size, am_size))
    }
}

/// The simplified 2Q policy core.
pub struct Simplified2QCore<K, V> {
    /// Resident keys
    map: HashMap<K, Location>,
    /// The recency segment
    a1: OrderedQueue<Entry<K, V>>,
    /// The frequency segment
    am: OrderedQueue<Entry<K, V>>,
    /// The length `A1` is pruned at once the cache is full
    a1_size: usize,
    /// The total number of resident entries
    capacity: usize,
}

impl<K, V> fmt::Debug for Simplified2QCore<K, V> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simplified2QCore")
            .field("a1_len", &self.a1.len())
            .field("am_len", &self.am.len())
            .field("a1_size", &self.a1_size)
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

impl<K: Hash + Eq + Clone, V> Simplified2QCore<K, V> {
    /// Create a new `Simplified2QCore`.
    ///
    /// # Panics
    /// Panics if either size is zero.
    #[inline]
    #[must_use]
    pub fn new(a1_size: usize, am_size: usize) -> Self {
        assert!(a1_size > 0, "2Q cache needs a non-empty A1 segment");
        assert!(am_size > 0, "2Q cache needs a non-empty Am segment");
        let capacity = a1_size.saturating_add(am_size);
        Self {
            map: HashMap::with_capacity(capacity),
            a1: OrderedQueue::new(),
            am: OrderedQueue::new(),
            a1_size,
            capacity,
        }
    }

    /// The total number of resident entries.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The segment holding `key`.
    #[inline]
    #[must_use]
    pub fn segment_of(&self, key: &K) -> Option<Segment> {
        self.map.get(key).map(|location| location.segment)
    }

    /// Keys of a segment, from the next to be evicted to the newest.
    #[inline]
    pub fn keys(&self, segment: Segment) -> impl Iterator<Item = &K> + '_ {
        self.queue(segment).iter().map(|entry| &entry.key)
    }

    /// The queue of a segment.
    fn queue(&self, segment: Segment) -> &OrderedQueue<Entry<K, V>> {
        match segment {
            Segment::Recent => &self.a1,
            Segment::Frequent => &self.am,
        }
    }

    /// The queue of a segment, mutably.
    fn queue_mut(&mut self, segment: Segment) -> &mut OrderedQueue<Entry<K, V>> {
        match segment {
            Segment::Recent => &mut self.a1,
            Segment::Frequent => &mut self.am,
        }
    }

    /// Refresh a referenced entry: move it to the back of `Am`, promoting it
    /// from `A1` if needed. Returns its new location.
    fn touch(&mut self, location: Location) -> Location {
        match location.segment {
            Segment::Frequent => {
                let _: bool = self.am.move_to_back(location.handle);
                location
            }
            Segment::Recent => {
                let entry = self
                    .a1
                    .remove(location.handle)
                    .unwrap_or_else(|| panic!("2Q lookup table refers to a removed entry"));
                let handle = self.am.push_back(entry);
                Location {
                    segment: Segment::Frequent,
                    handle,
                }
            }
        }
    }

    /// Reference `key` and return its refreshed location.
    fn reference(&mut self, key: &K) -> Option<Location> {
        let location = *self.map.get(key)?;
        let touched = self.touch(location);
        if let Some(slot) = self.map.get_mut(key) {
            *slot = touched;
        }
        Some(touched)
    }

    /// Evict one entry to make room for a new key.
    ///
    /// `A1` is pruned once it reached `a1_size`, `Am` otherwise.
    fn reclaim(&mut self) {
        if self.map.len() < self.capacity {
            return;
        }
        let (first, second) = if self.a1.len() >= self.a1_size {
            (Segment::Recent, Segment::Frequent)
        } else {
            (Segment::Frequent, Segment::Recent)
        };
        let evicted = self
            .queue_mut(first)
            .pop_front()
            .map(|entry| (first, entry))
            .or_else(|| self.queue_mut(second).pop_front().map(|entry| (second, entry)));
        if let Some((segment, entry)) = evicted {
            let _: Option<Location> = self.map.remove(&entry.key);
            debug!(?segment, "2Q evicted an entry");
        }
    }
}

impl<K: Hash + Eq + Clone, V> ReplacementPolicy<K, V> for Simplified2QCore<K, V> {
    #[inline]
    fn put(&mut self, key: K, value: V) {
        if let Some(location) = self.reference(&key) {
            if let Some(entry) = self.queue_mut(location.segment).get_mut(location.handle) {
                entry.value = value;
            }
            return;
        }

        self.reclaim();
        let handle = self.a1.push_back(Entry {
            key: key.clone(),
            value,
        });
        let _: Option<Location> = self.map.insert(
            key,
            Location {
                segment: Segment::Recent,
                handle,
            },
        );
    }

    #[inline]
    fn get(&mut self, key: &K) -> Option<&V> {
        let location = self.reference(key)?;
        self.queue(location.segment)
            .get(location.handle)
            .map(|entry| &entry.value)
    }

    #[inline]
    fn delete(&mut self, key: &K) {
        if let Some(location) = self.map.remove(key) {
            let _: Option<Entry<K, V>> = self.queue_mut(location.segment).remove(location.handle);
        }
    }

    #[inline]
    fn len(&self) -> usize {
        self.map.len()
    }
}
