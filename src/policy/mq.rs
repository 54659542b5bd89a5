//! The Multi-Queue policy implementation.
//!
//! Entries are spread over tiers by their hit count, tier 0 being the coldest.
//! A logical clock ticks on every `put` and `get`; an entry that was not
//! referenced within `life_time` ticks is demoted one tier at a time. Eviction
//! takes the oldest entry of the coldest non-empty tier and remembers its hit
//! count in a ghost list, so a key coming back resumes where it left off.
//! See "The Multi-Queue Replacement Algorithm for Second Level Buffer Caches",
//! Zhou, Philbin and Li, USENIX 2001.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use hashlink::LinkedHashMap;
use tracing::debug;

use super::{
    acquire_weight, log2_tier, release_weight, LockedCache, ReplacementPolicy, SizeCalculator,
    TierCalculator,
};
use crate::collections::{Handle, OrderedQueue};

/// A thread safe MQ cache.
pub type MqCache<K, V> = LockedCache<MqCore<K, V>>;

impl<K: Hash + Eq + Clone, V> LockedCache<MqCore<K, V>> {
    /// Create an MQ cache.
    ///
    /// See [`MqCore::new`] for the parameters.
    ///
    /// # Panics
    /// Panics if `tiers` is zero.
    #[inline]
    #[must_use]
    pub fn new(
        tiers: usize,
        max_weight: u64,
        ghost_size: usize,
        life_time: u64,
        tier_calc: Option<TierCalculator>,
        size_calc: Option<SizeCalculator<V>>,
    ) -> Self {
        Self::with_core(
            "mq",
            MqCore::new(tiers, max_weight, ghost_size, life_time, tier_calc, size_calc),
        )
    }
}

/// A resident MQ entry.
#[derive(Debug)]
struct TieredEntry<K, V> {
    /// The key
    key: K,
    /// The cached value
    value: V,
    /// The number of references, resurrected ones included
    hits: u64,
    /// The logical time after which the entry is demoted
    expire_at: u64,
}

/// Where an MQ entry lives.
#[derive(Clone, Copy, Debug)]
struct TierLocation {
    /// The tier holding the entry
    tier: usize,
    /// The handle into that tier
    handle: Handle,
}

/// The Multi-Queue policy core.
pub struct MqCore<K, V> {
    /// Tiers from the coldest to the hottest
    tiers: Vec<OrderedQueue<TieredEntry<K, V>>>,
    /// Resident keys
    map: HashMap<K, TierLocation>,
    /// Hit counts of evicted keys, oldest first
    ghosts: LinkedHashMap<K, u64>,
    /// The number of keys the ghost list remembers
    ghost_size: usize,
    /// The total weight of resident values
    weight: u64,
    /// The weight this cache may hold
    max_weight: u64,
    /// Ticks an entry stays in its tier without being referenced
    life_time: u64,
    /// The logical clock
    current_time: u64,
    /// Maps hit counts to tiers
    tier_calc: TierCalculator,
    /// Computes the weight of a value, every value weighs 1 without it
    size_calc: Option<SizeCalculator<V>>,
}

impl<K, V> fmt::Debug for MqCore<K, V> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MqCore")
            .field("tiers", &self.tiers.len())
            .field("len", &self.map.len())
            .field("ghosts", &self.ghosts.len())
            .field("weight", &self.weight)
            .field("max_weight", &self.max_weight)
            .field("current_time", &self.current_time)
            .finish_non_exhaustive()
    }
}

/// Resolve a tier.
fn tier_mut<T>(tiers: &mut [OrderedQueue<T>], tier: usize) -> &mut OrderedQueue<T> {
    tiers
        .get_mut(tier)
        .unwrap_or_else(|| panic!("MQ tier {tier} out of range"))
}

impl<K: Hash + Eq + Clone, V> MqCore<K, V> {
    /// Create a new `MqCore`.
    ///
    /// * `tiers` - the number of tiers.
    /// * `max_weight` - the total weight of resident values.
    /// * `ghost_size` - the number of evicted keys whose hits are remembered.
    /// * `life_time` - ticks an unreferenced entry stays in its tier.
    /// * `tier_calc` - maps hits to a tier, `floor(log2(hits))` by default.
    ///   Results past the hottest tier are clamped to it.
    /// * `size_calc` - the weight of a value, 1 by default.
    ///
    /// # Panics
    /// Panics if `tiers` is zero.
    #[inline]
    #[must_use]
    pub fn new(
        tiers: usize,
        max_weight: u64,
        ghost_size: usize,
        life_time: u64,
        tier_calc: Option<TierCalculator>,
        size_calc: Option<SizeCalculator<V>>,
    ) -> Self {
        assert!(tiers > 0, "MQ cache needs at least one tier");
        let tier_calc: TierCalculator = match tier_calc {
            Some(calc) => calc,
            None => Box::new(log2_tier),
        };
        Self {
            tiers: (0..tiers).map(|_| OrderedQueue::new()).collect(),
            map: HashMap::new(),
            ghosts: LinkedHashMap::with_capacity(ghost_size),
            ghost_size,
            weight: 0,
            max_weight,
            life_time,
            current_time: 0,
            tier_calc,
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

    /// The logical clock.
    #[inline]
    #[must_use]
    pub fn current_time(&self) -> u64 {
        self.current_time
    }

    /// The number of tiers.
    #[inline]
    #[must_use]
    pub fn tier_count(&self) -> usize {
        self.tiers.len()
    }

    /// The tier holding `key`.
    #[inline]
    #[must_use]
    pub fn tier_of(&self, key: &K) -> Option<usize> {
        self.map.get(key).map(|location| location.tier)
    }

    /// The hit count of a resident `key`.
    #[inline]
    #[must_use]
    pub fn hits_of(&self, key: &K) -> Option<u64> {
        let location = self.map.get(key)?;
        self.tiers
            .get(location.tier)?
            .get(location.handle)
            .map(|entry| entry.hits)
    }

    /// The hit count remembered for an evicted `key`.
    #[inline]
    #[must_use]
    pub fn ghost_hits(&self, key: &K) -> Option<u64> {
        self.ghosts.get(key).copied()
    }

    /// Keys of a tier, from the next to be evicted or demoted to the newest.
    #[inline]
    pub fn keys(&self, tier: usize) -> impl Iterator<Item = &K> + '_ {
        self.tiers
            .get(tier)
            .into_iter()
            .flat_map(|queue| queue.iter().map(|entry| &entry.key))
    }

    /// The weight of `value`.
    fn weigh(&self, value: &V) -> u64 {
        self.size_calc.as_ref().map_or(1, |calc| calc(value))
    }

    /// The tier for `hits`, clamped to the hottest tier.
    fn tier_for(&self, hits: u64) -> usize {
        let hottest = self.tiers.len().saturating_sub(1);
        (self.tier_calc)(hits).min(hottest)
    }

    /// The expiry of an entry referenced now.
    fn expire(&self) -> u64 {
        self.current_time.saturating_add(self.life_time)
    }

    /// Tick the clock and demote the expired front entry of each tier.
    fn adjust(&mut self) {
        self.current_time = self.current_time.saturating_add(1);
        let now = self.current_time;
        let expire_at = self.expire();
        for tier in 1..self.tiers.len() {
            let expired = self
                .tiers
                .get(tier)
                .and_then(OrderedQueue::front)
                .is_some_and(|entry| entry.expire_at < now);
            if !expired {
                continue;
            }
            let Some(mut entry) = tier_mut(&mut self.tiers, tier).pop_front() else {
                continue;
            };
            let lower = tier.saturating_sub(1);
            entry.expire_at = expire_at;
            let location = self
                .map
                .get_mut(&entry.key)
                .unwrap_or_else(|| panic!("MQ entry in tier {tier} missing from lookup table"));
            location.tier = lower;
            location.handle = tier_mut(&mut self.tiers, lower).push_back(entry);
            debug!(from = tier, to = lower, "MQ demoted an entry");
        }
    }

    /// Evict the oldest entry of the coldest non-empty tier.
    ///
    /// Returns `false` if every tier is empty.
    fn evict(&mut self) -> bool {
        let Some(entry) = self.tiers.iter_mut().find_map(OrderedQueue::pop_front) else {
            return false;
        };
        let _: Option<TierLocation> = self.map.remove(&entry.key);
        let _: Option<u64> = self.ghosts.insert(entry.key, entry.hits);
        while self.ghosts.len() > self.ghost_size {
            let _: Option<(K, u64)> = self.ghosts.pop_front();
        }
        let released = self.weigh(&entry.value);
        self.weight = release_weight(self.weight, released, "MqCache");
        debug!(
            weight = self.weight,
            released,
            hits = entry.hits,
            "MQ evicted an entry"
        );
        true
    }

    /// Place a referenced entry at the back of the tier its hits map to.
    fn place(&mut self, mut entry: TieredEntry<K, V>) -> TierLocation {
        let tier = self.tier_for(entry.hits);
        entry.expire_at = self.expire();
        let handle = tier_mut(&mut self.tiers, tier).push_back(entry);
        TierLocation { tier, handle }
    }
}

impl<K: Hash + Eq + Clone, V> ReplacementPolicy<K, V> for MqCore<K, V> {
    /// Insert or update `key`.
    ///
    /// # Panics
    /// Panics if the weight of `value` exceeds the weight of the whole cache.
    #[inline]
    fn put(&mut self, key: K, value: V) {
        let added = self.weigh(&value);
        assert!(
            added <= self.max_weight,
            "MqCache put element of size {added} larger than cache size {}",
            self.max_weight
        );

        // The replaced entry leaves its tier first, so it is never a victim
        // of the evictions below.
        let hits = if let Some(location) = self.map.remove(&key) {
            let old = tier_mut(&mut self.tiers, location.tier)
                .remove(location.handle)
                .unwrap_or_else(|| panic!("MQ lookup table refers to a removed entry"));
            let released = self.weigh(&old.value);
            self.weight = release_weight(self.weight, released, "MqCache");
            old.hits
        } else if let Some(hits) = self.ghosts.remove(&key) {
            debug!(hits, "MQ resurrected a key from the ghost list");
            hits
        } else {
            0
        };

        while acquire_weight(self.weight, added) > self.max_weight {
            if !self.evict() {
                panic!(
                    "MqCache current size {} with no resident element",
                    self.weight
                );
            }
        }

        self.weight = acquire_weight(self.weight, added);
        let location = self.place(TieredEntry {
            key: key.clone(),
            value,
            hits: hits.saturating_add(1),
            expire_at: 0,
        });
        let _: Option<TierLocation> = self.map.insert(key, location);
        self.adjust();
    }

    #[inline]
    fn get(&mut self, key: &K) -> Option<&V> {
        let Some(&location) = self.map.get(key) else {
            self.adjust();
            return None;
        };

        let queue = tier_mut(&mut self.tiers, location.tier);
        let hits = queue
            .get(location.handle)
            .map(|entry| entry.hits.saturating_add(1))
            .unwrap_or_else(|| panic!("MQ lookup table refers to a removed entry"));
        let tier = self.tier_for(hits);
        let expire_at = self.expire();

        if tier == location.tier {
            let queue = tier_mut(&mut self.tiers, tier);
            if let Some(entry) = queue.get_mut(location.handle) {
                entry.hits = hits;
                entry.expire_at = expire_at;
            }
            let _: bool = queue.move_to_back(location.handle);
        } else {
            let mut entry = tier_mut(&mut self.tiers, location.tier)
                .remove(location.handle)
                .unwrap_or_else(|| panic!("MQ lookup table refers to a removed entry"));
            entry.hits = hits;
            let relocated = self.place(entry);
            if let Some(slot) = self.map.get_mut(key) {
                *slot = relocated;
            }
        }

        self.adjust();
        // Aging may have moved the entry again.
        let location = *self.map.get(key)?;
        self.tiers
            .get(location.tier)?
            .get(location.handle)
            .map(|entry| &entry.value)
    }

    #[inline]
    fn delete(&mut self, key: &K) {
        if let Some(location) = self.map.remove(key) {
            if let Some(entry) = tier_mut(&mut self.tiers, location.tier).remove(location.handle) {
                let released = self.weigh(&entry.value);
                self.weight = release_weight(self.weight, released, "MqCache");
            }
        }
        let _: Option<u64> = self.ghosts.remove(key);
    }

    #[inline]
    fn len(&self) -> usize {
        self.map.len()
    }
}

#[cfg(test)]
#[allow(clippy::default_numeric_fallback)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::{MqCache, MqCore};
    use crate::policy::{Cache, ReplacementPolicy};

    fn key(i: i32) -> String {
        i.to_string()
    }

    /// `hits - 1` from 2 hits on, past the 8 tiers above 8 hits.
    fn linear_tier(hits: u64) -> usize {
        if hits < 2 {
            return 0;
        }
        if hits > 8 {
            return 8;
        }
        usize::try_from(hits - 1).unwrap_or(usize::MAX)
    }

    /// Create a `MqCore` of 8 tiers and weight 5, after putting keys `1..=10`.
    fn create_mq() -> MqCore<String, i32> {
        let mut cache = MqCore::new(8, 5, 5, 5, Some(Box::new(linear_tier)), None);
        for i in 1..=10 {
            cache.put(key(i), i);
        }
        cache
    }

    #[test]
    fn test_fill() {
        let mut cache = create_mq();

        for i in 1..=5 {
            assert_eq!(cache.ghost_hits(&key(i)), Some(1));
            assert_eq!(cache.get(&key(i)), None);
        }
        for i in 6..=10 {
            assert_eq!(cache.get(&key(i)), Some(&i));
        }
        assert_eq!(cache.weight(), 5);
    }

    #[test]
    fn test_resurrection() {
        let mut cache = create_mq();

        // Key 1 comes back with the hit it had before eviction.
        cache.put(key(1), 1);
        assert_eq!(cache.hits_of(&key(1)), Some(2));
        assert_eq!(cache.tier_of(&key(1)), Some(1));
        assert_eq!(cache.ghost_hits(&key(1)), None);

        // Making room evicted the coldest, oldest entry.
        assert_eq!(cache.tier_of(&key(6)), None);
        assert_eq!(cache.ghost_hits(&key(6)), Some(1));
        assert_eq!(cache.weight(), 5);
    }

    #[test]
    fn test_get_promotes() {
        let mut cache = create_mq();

        assert_eq!(cache.get(&key(7)), Some(&7));
        assert_eq!(cache.tier_of(&key(7)), Some(1));
        assert_eq!(cache.get(&key(7)), Some(&7));
        assert_eq!(cache.tier_of(&key(7)), Some(2));
        assert_eq!(cache.hits_of(&key(7)), Some(3));

        // Tier 0 is drained before any hotter tier.
        cache.put(key(11), 11);
        assert_eq!(cache.tier_of(&key(6)), None);
        cache.put(key(12), 12);
        assert_eq!(cache.tier_of(&key(8)), None);
        assert_eq!(cache.tier_of(&key(7)), Some(2));
    }

    #[test]
    fn test_tier_is_clamped() {
        let mut cache = MqCore::new(3, 10, 2, 100, Some(Box::new(|_hits: u64| 3_usize)), None);
        cache.put(key(1), 1);
        assert_eq!(cache.tier_of(&key(1)), Some(2));
        assert_eq!(cache.get(&key(1)), Some(&1));
        assert_eq!(cache.tier_of(&key(1)), Some(2));
        assert_eq!(cache.tier_count(), 3);
    }

    #[test]
    fn test_aging_demotes_one_tier_per_step() {
        let mut cache: MqCore<String, i32> = MqCore::new(4, 100, 10, 2, None, None);

        cache.put("hot".to_owned(), 0);
        for _ in 0..3 {
            assert_eq!(cache.get(&"hot".to_owned()), Some(&0));
        }
        // 4 hits sit in tier floor(log2(4)) = 2.
        assert_eq!(cache.tier_of(&"hot".to_owned()), Some(2));
        assert_eq!(cache.current_time(), 4);

        let mut tiers = vec![];
        for i in 0..6 {
            cache.put(key(i), i);
            tiers.push(cache.tier_of(&"hot".to_owned()).unwrap_or(usize::MAX));
        }
        assert_eq!(tiers, vec![2, 1, 1, 1, 0, 0]);
        assert_eq!(cache.hits_of(&"hot".to_owned()), Some(4));
    }

    #[test]
    fn test_zero_life_time_demotes_on_next_tick() {
        let mut cache: MqCore<String, i32> = MqCore::new(4, 100, 10, 0, None, None);
        cache.put("a".to_owned(), 1);
        cache.put("b".to_owned(), 2);
        // The 2nd hit moves `a` to tier 1, the tick right after demotes it.
        assert_eq!(cache.get(&"a".to_owned()), Some(&1));
        assert_eq!(cache.tier_of(&"a".to_owned()), Some(0));
    }

    #[test]
    fn test_put_replaces_weight() {
        let mut cache: MqCore<u32, String> = MqCore::new(
            4,
            10,
            4,
            5,
            None,
            Some(Box::new(|value: &String| value.len() as u64)),
        );
        cache.put(1, "aaaa".to_owned());
        cache.put(2, "bbbb".to_owned());
        assert_eq!(cache.weight(), 8);

        cache.put(1, "aaaa".to_owned());
        assert_eq!(cache.weight(), 8);
        assert_eq!(cache.len(), 2);

        // 2 is the oldest entry of tier 0, 1 moved to tier 1.
        cache.put(3, "cccccc".to_owned());
        assert_eq!(cache.get(&2), None);
        assert_eq!(cache.weight(), 10);
        assert_eq!(cache.ghost_hits(&2), Some(1));

        cache.delete(&1);
        assert_eq!(cache.weight(), 6);
        cache.delete(&2);
        assert_eq!(cache.ghost_hits(&2), None);
    }

    #[test]
    #[should_panic(expected = "larger than cache size")]
    fn test_put_too_large() {
        let mut cache: MqCore<u32, Vec<u8>> = MqCore::new(
            2,
            4,
            4,
            5,
            None,
            Some(Box::new(|value: &Vec<u8>| value.len() as u64)),
        );
        cache.put(1, vec![0; 5]);
    }

    #[test]
    #[should_panic(expected = "less than size")]
    fn test_weight_underflow() {
        // A size calculator that is not pure breaks the bookkeeping.
        let calls = AtomicU64::new(0);
        let mut cache: MqCore<u32, u32> = MqCore::new(
            2,
            10,
            4,
            5,
            None,
            Some(Box::new(move |_value: &u32| {
                calls.fetch_add(1, Ordering::Relaxed).saturating_add(1)
            })),
        );
        cache.put(1, 1);
        cache.delete(&1);
    }

    #[test]
    fn test_thread_safe_version() {
        let cache = MqCache::<i32, i32>::new(8, 5, 5, 5, None, None);
        cache.put(1, 1);

        assert_eq!(cache.get(&1, 0), (1, true));

        cache.delete(&1);

        assert_eq!(cache.get(&1, 0), (0, false));
        assert_eq!(cache.inspect(MqCore::weight), 0);
    }
}
