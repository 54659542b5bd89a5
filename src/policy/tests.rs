//! Behaviour shared by every policy, checked against random workloads.

use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{
    Cache, Full2QCache, Full2QCore, LfuCache, LfuCore, LruCache, LruCore, MqCache, MqCore,
    ReplacementPolicy, Segment, Simplified2QCache, Simplified2QCore,
};

/// The number of entries every test cache holds.
const CAPACITY: usize = 8;

/// The key space of the random workloads, larger than `CAPACITY`.
const KEY_SPACE: u32 = 32;

/// One cache of each policy, all holding `CAPACITY` entries.
fn create_caches() -> Vec<Box<dyn Cache<u32, u32>>> {
    let mut caches: Vec<Box<dyn Cache<u32, u32>>> = Vec::new();
    caches.push(Box::new(LruCache::<u32, u32>::new(8, None)));
    caches.push(Box::new(LfuCache::<u32, u32>::new(CAPACITY)));
    caches.push(Box::new(Simplified2QCache::<u32, u32>::new(3, 5)));
    caches.push(Box::new(Full2QCache::<u32, u32>::new(5, 3, 8)));
    caches.push(Box::new(MqCache::<u32, u32>::new(4, 8, 8, 4, None, None)));
    caches
}

/// Run `steps` random operations against `cache`.
fn run_workload(cache: &dyn Cache<u32, u32>, rng: &mut StdRng, steps: usize) {
    for _ in 0..steps {
        let key = rng.gen_range(0..KEY_SPACE);
        match rng.gen_range(0..10) {
            0 => cache.delete(&key),
            1..=4 => cache.put(key, key.wrapping_mul(10)),
            _ => {
                let (value, hit) = cache.get(&key, u32::MAX);
                if hit {
                    assert_eq!(value, key.wrapping_mul(10));
                } else {
                    assert_eq!(value, u32::MAX);
                }
            }
        }
        assert!(cache.len() <= CAPACITY);
    }
}

/// Assert that no key is resident twice.
fn assert_unique(keys: impl Iterator<Item = u32>, len: usize) {
    let keys: Vec<u32> = keys.collect();
    let unique: HashSet<u32> = keys.iter().copied().collect();
    assert_eq!(keys.len(), len);
    assert_eq!(unique.len(), len);
}

#[test]
fn test_random_workload_respects_capacity() {
    for (seed, cache) in create_caches().into_iter().enumerate() {
        let mut rng = StdRng::seed_from_u64(seed as u64);
        run_workload(cache.as_ref(), &mut rng, 2000);
    }
}

#[test]
fn test_keys_are_resident_once() {
    let mut rng = StdRng::seed_from_u64(42);

    let mut lru = LruCore::<u32, u32>::new(8, None);
    let mut lfu = LfuCore::<u32, u32>::new(CAPACITY);
    let mut simplified = Simplified2QCore::<u32, u32>::new(3, 5);
    let mut full = Full2QCore::<u32, u32>::new(5, 3, 8);
    let mut mq = MqCore::<u32, u32>::new(4, 8, 8, 4, None, None);
    for _ in 0..2000 {
        let key = rng.gen_range(0..KEY_SPACE);
        if rng.gen_bool(0.5) {
            lru.put(key, key);
            lfu.put(key, key);
            simplified.put(key, key);
            full.put(key, key);
            mq.put(key, key);
        } else {
            let _: Option<&u32> = lru.get(&key);
            let _: Option<&u32> = lfu.get(&key);
            let _: Option<&u32> = simplified.get(&key);
            let _: Option<&u32> = full.get(&key);
            let _: Option<&u32> = mq.get(&key);
        }

        assert_unique(lru.keys().copied(), lru.len());
        assert_unique(lfu.keys().copied(), lfu.len());
        assert!(lfu.len() <= lfu.max_entries());
        assert_unique(
            simplified
                .keys(Segment::Recent)
                .chain(simplified.keys(Segment::Frequent))
                .copied(),
            simplified.len(),
        );
        assert_unique(
            full.keys(Segment::Recent)
                .chain(full.keys(Segment::Frequent))
                .copied(),
            full.len(),
        );
        assert_unique(
            (0..mq.tier_count())
                .flat_map(|tier| mq.keys(tier))
                .copied(),
            mq.len(),
        );
        assert!(full.ghost_keys().all(|ghost| full.segment_of(ghost).is_none()));
        // A resident key is never remembered as a ghost.
        assert!((0..mq.tier_count())
            .flat_map(|tier| mq.keys(tier))
            .all(|key| mq.ghost_hits(key).is_none()));
        assert!(mq.weight() <= mq.max_weight());
    }
}

/// The weight of the value stored under `key` by `test_weight_matches_resident_values`.
fn weight_of(key: u32) -> u64 {
    u64::from(key % 7 + 1)
}

#[test]
fn test_weight_matches_resident_values() {
    let mut rng = StdRng::seed_from_u64(7);

    let mut lru = LruCore::<u32, u32>::new(
        40,
        Some(Box::new(|value: &u32| weight_of(*value))),
    );
    let mut mq = MqCore::<u32, u32>::new(
        4,
        40,
        8,
        4,
        None,
        Some(Box::new(|value: &u32| weight_of(*value))),
    );
    for _ in 0..5000 {
        let key = rng.gen_range(0..KEY_SPACE);
        match rng.gen_range(0..10) {
            0 => {
                lru.delete(&key);
                mq.delete(&key);
            }
            1..=5 => {
                lru.put(key, key);
                mq.put(key, key);
            }
            _ => {
                let _: Option<&u32> = lru.get(&key);
                let _: Option<&u32> = mq.get(&key);
            }
        }

        let lru_weight: u64 = lru.keys().map(|&key| weight_of(key)).sum();
        assert_eq!(lru.weight(), lru_weight);
        assert!(lru.weight() <= lru.max_weight());

        let mq_weight: u64 = (0..mq.tier_count())
            .flat_map(|tier| mq.keys(tier))
            .map(|&key| weight_of(key))
            .sum();
        assert_eq!(mq.weight(), mq_weight);
        assert!(mq.weight() <= mq.max_weight());
    }
}

#[test]
fn test_delete_is_complete() {
    for (seed, cache) in create_caches().into_iter().enumerate() {
        let mut rng = StdRng::seed_from_u64(seed as u64);
        run_workload(cache.as_ref(), &mut rng, 500);

        for key in 0..KEY_SPACE {
            cache.delete(&key);
            assert_eq!(cache.get(&key, 0), (0, false));
        }
        assert!(cache.is_empty());

        // Deleting an absent key is a no-op.
        cache.delete(&0);
        assert!(cache.is_empty());
    }
}

#[test]
fn test_put_is_idempotent() {
    for cache in create_caches() {
        for key in 0..4 {
            cache.put(key, key);
        }
        let len = cache.len();

        cache.put(2, 20);
        cache.put(2, 20);
        assert_eq!(cache.len(), len);
        assert_eq!(cache.get(&2, 0), (20, true));
    }
}

#[test]
fn test_concurrent_access() {
    for cache in create_caches() {
        let cache: Arc<dyn Cache<u32, u32>> = Arc::from(cache);
        let workers: Vec<_> = (0..4_u64)
            .map(|seed| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    let mut rng = StdRng::seed_from_u64(seed);
                    run_workload(cache.as_ref(), &mut rng, 1000);
                })
            })
            .collect();
        for worker in workers {
            if let Err(e) = worker.join() {
                panic::resume_unwind(e);
            }
        }
        assert!(cache.len() <= CAPACITY);
    }
}

#[test]
fn test_lock_released_after_panic() {
    let cache = MqCache::<u32, Vec<u8>>::new(
        2,
        4,
        4,
        5,
        None,
        Some(Box::new(|value: &Vec<u8>| value.len() as u64)),
    );
    cache.put(1, vec![0; 2]);

    let result = panic::catch_unwind(AssertUnwindSafe(|| cache.put(2, vec![0; 5])));
    assert!(result.is_err());

    // The cache stays usable and unchanged.
    assert_eq!(cache.get(&1, vec![]), (vec![0; 2], true));
    cache.put(3, vec![0; 2]);
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.inspect(MqCore::weight), 4);
}
