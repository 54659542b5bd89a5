//! The full 2Q policy implementation.
//!
//! Resident entries live in `A1-in` (first reference) or `Am` (frequent).
//! Keys evicted from `A1-in` are remembered without their values in `A1-out`;
//! a key put again while it is remembered there goes straight to `Am`.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use hashlink::LinkedHashSet;
use tracing::debug;

use super::{Entry, Location, LockedCache, ReplacementPolicy, Segment};
use crate::collections::OrderedQueue;

/// A thread safe full 2Q cache.
pub type Full2QCache<K, V> = LockedCache<Full2QCore<K, V>>;

impl<K: Hash + Eq + Clone, V> LockedCache<Full2QCore<K, V>> {
    /// Create a full 2Q cache holding `am_size + a1_in_size` entries and
    /// remembering up to `a1_out_size` evicted keys.
    ///
    /// # Panics
    /// Panics if `am_size` or `a1_in_size` is zero.
    #[inline]
    #[must_use]
    pub fn new(am_size: usize, a1_in_size: usize, a1_out_size: usize) -> Self {
        Self::with_core(
            "2q_full",
            Full2QCore::new(am_size, a1_in_size, a1_out_size),
        )
    }
}

/// The full 2Q policy core.
pub struct Full2QCore<K, V> {
    /// Resident keys
    map: HashMap<K, Location>,
    /// The frequency segment
    am: OrderedQueue<Entry<K, V>>,
    /// The recency segment
    a1_in: OrderedQueue<Entry<K, V>>,
    /// Keys recently evicted from `A1-in`, oldest first
    a1_out: LinkedHashSet<K>,
    /// The length above which `A1-in` is pruned
    a1_in_size: usize,
    /// The number of keys `A1-out` remembers
    a1_out_size: usize,
    /// The total number of resident entries
    capacity: usize,
}

impl<K, V> fmt::Debug for Full2QCore<K, V> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Full2QCore")
            .field("am_len", &self.am.len())
            .field("a1_in_len", &self.a1_in.len())
            .field("a1_out_len", &self.a1_out.len())
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

impl<K: Hash + Eq + Clone, V> Full2QCore<K, V> {
    /// Create a new `Full2QCore`. A zero `a1_out_size` keeps no ghost.
    ///
    /// # Panics
    /// Panics if `am_size` or `a1_in_size` is zero.
    #[inline]
    #[must_use]
    pub fn new(am_size: usize, a1_in_size: usize, a1_out_size: usize) -> Self {
        assert!(am_size > 0, "2Q cache needs a non-empty Am segment");
        assert!(a1_in_size > 0, "2Q cache needs a non-empty A1-in segment");
        let capacity = am_size.saturating_add(a1_in_size);
        Self {
            map: HashMap::with_capacity(capacity),
            am: OrderedQueue::new(),
            a1_in: OrderedQueue::new(),
            a1_out: LinkedHashSet::with_capacity(a1_out_size),
            a1_in_size,
            a1_out_size,
            capacity,
        }
    }

    /// The total number of resident entries.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The segment holding `key`, `None` if it is not resident.
    #[inline]
    #[must_use]
    pub fn segment_of(&self, key: &K) -> Option<Segment> {
        self.map.get(key).map(|location| location.segment)
    }

    /// Whether `key` is remembered in `A1-out`.
    #[inline]
    #[must_use]
    pub fn is_ghost(&self, key: &K) -> bool {
        self.a1_out.contains(key)
    }

    /// Keys of a resident segment, from the next to be evicted to the newest.
    #[inline]
    pub fn keys(&self, segment: Segment) -> impl Iterator<Item = &K> + '_ {
        self.queue(segment).iter().map(|entry| &entry.key)
    }

    /// Keys remembered in `A1-out`, oldest first.
    #[inline]
    pub fn ghost_keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.a1_out.iter()
    }

    /// The queue of a segment.
    fn queue(&self, segment: Segment) -> &OrderedQueue<Entry<K, V>> {
        match segment {
            Segment::Recent => &self.a1_in,
            Segment::Frequent => &self.am,
        }
    }

    /// The queue of a segment, mutably.
    fn queue_mut(&mut self, segment: Segment) -> &mut OrderedQueue<Entry<K, V>> {
        match segment {
            Segment::Recent => &mut self.a1_in,
            Segment::Frequent => &mut self.am,
        }
    }

    /// Free a slot for a new key once the cache is full.
    ///
    /// `A1-in` is pruned while it is over its size, and the pruned key is
    /// remembered in `A1-out`. Otherwise `Am` loses its oldest entry, which is
    /// forgotten entirely.
    fn reclaim(&mut self) {
        if self.map.len() < self.capacity {
            return;
        }
        if self.a1_in.len() > self.a1_in_size || self.am.is_empty() {
            let Some(entry) = self.a1_in.pop_front() else {
                return;
            };
            let _: Option<Location> = self.map.remove(&entry.key);
            let _: bool = self.a1_out.insert(entry.key);
            while self.a1_out.len() > self.a1_out_size {
                let _: Option<K> = self.a1_out.pop_front();
            }
            debug!(ghosts = self.a1_out.len(), "2Q moved an entry to A1-out");
        } else if let Some(entry) = self.am.pop_front() {
            let _: Option<Location> = self.map.remove(&entry.key);
            debug!("2Q evicted an entry from Am");
        } else {
            // Both segments are empty, nothing to reclaim.
        }
    }
}

impl<K: Hash + Eq + Clone, V> ReplacementPolicy<K, V> for Full2QCore<K, V> {
    #[inline]
    fn put(&mut self, key: K, value: V) {
        if let Some(&location) = self.map.get(&key) {
            let queue = self.queue_mut(location.segment);
            if let Some(entry) = queue.get_mut(location.handle) {
                entry.value = value;
            }
            if location.segment == Segment::Frequent {
                let _: bool = queue.move_to_back(location.handle);
            }
            return;
        }

        self.reclaim();
        let segment = if self.a1_out.remove(&key) {
            debug!("2Q re-admitted a key from A1-out");
            Segment::Frequent
        } else {
            Segment::Recent
        };
        let handle = self.queue_mut(segment).push_back(Entry {
            key: key.clone(),
            value,
        });
        let _: Option<Location> = self.map.insert(key, Location { segment, handle });
    }

    #[inline]
    fn get(&mut self, key: &K) -> Option<&V> {
        let location = *self.map.get(key)?;
        if location.segment == Segment::Frequent {
            let _: bool = self.am.move_to_back(location.handle);
        }
        self.queue(location.segment)
            .get(location.handle)
            .map(|entry| &entry.value)
    }

    #[inline]
    fn delete(&mut self, key: &K) {
        if let Some(location) = self.map.remove(key) {
            let _: Option<Entry<K, V>> = self.queue_mut(location.segment).remove(location.handle);
        }
        let _: bool = self.a1_out.remove(key);
    }

    #[inline]
    fn len(&self) -> usize {
        self.map.len()
    }
}
