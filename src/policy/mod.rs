//! Replacement policies.
//!
//! Every policy is split into a single-threaded core implementing
//! [`ReplacementPolicy`] and the shared [`LockedCache`] wrapper, which
//! serializes access to the core and exposes the uniform [`Cache`] contract.

mod full_2q;
mod lfu;
mod lru;
mod mq;
mod simplified_2q;
#[cfg(test)]
mod tests;

use std::fmt;

use clippy_utilities::{Cast, OverflowArithmetic};
use parking_lot::Mutex;
use tracing::trace;

use crate::collections::Handle;
use crate::metrics::CACHE_METRICS;

pub use full_2q::{Full2QCache, Full2QCore};
pub use lfu::{LfuCache, LfuCore};
pub use lru::{LruCache, LruCore};
pub use mq::{MqCache, MqCore};
pub use simplified_2q::{Simplified2QCache, Simplified2QCore};

/// Computes the weight a value occupies in a cache.
pub type SizeCalculator<V> = Box<dyn Fn(&V) -> u64 + Send + Sync>;

/// Maps the hit count of an MQ entry to its tier.
pub type TierCalculator = Box<dyn Fn(u64) -> usize + Send + Sync>;

/// The default size calculator, every value weighs 1.
#[inline]
#[must_use]
pub fn unit_size<V>(_value: &V) -> u64 {
    1
}

/// The default tier calculator, `floor(log2(hits))` with 0 hits on tier 0.
#[inline]
#[must_use]
pub fn log2_tier(hits: u64) -> usize {
    if hits < 1 {
        return 0;
    }
    hits.ilog2().cast()
}

/// The uniform contract of every cache.
///
/// Implementations are safe to share between threads. Each call runs to
/// completion under the cache's own lock.
pub trait Cache<K, V>: Send + Sync {
    /// Insert or update `key`.
    fn put(&self, key: K, value: V);

    /// Look up `key`.
    ///
    /// Returns the stored value and `true` on a hit, or `default` and `false`
    /// on a miss.
    fn get(&self, key: &K, default: V) -> (V, bool);

    /// Remove `key` if present.
    fn delete(&self, key: &K);

    /// The number of resident entries.
    fn len(&self) -> usize;

    /// Whether no entry is resident.
    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A single-threaded replacement policy core.
pub trait ReplacementPolicy<K, V> {
    /// Insert or update `key`, evicting as the policy dictates.
    fn put(&mut self, key: K, value: V);

    /// Look up `key`, recording the access.
    fn get(&mut self, key: &K) -> Option<&V>;

    /// Remove `key` if present.
    fn delete(&mut self, key: &K);

    /// The number of resident entries.
    fn len(&self) -> usize;

    /// Whether no entry is resident.
    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A policy core guarded by an exclusive lock.
///
/// The lock is held for the whole of each operation. A panic raised by the
/// core on a broken invariant unwinds through the guard, which releases the
/// lock.
pub struct LockedCache<P> {
    /// The name used to label metrics.
    name: String,
    /// The guarded core.
    inner: Mutex<P>,
}

impl<P: fmt::Debug> fmt::Debug for LockedCache<P> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("LockedCache");
        let _: &mut fmt::DebugStruct<'_, '_> = debug.field("name", &self.name);
        // Do not block when formatted from inside `inspect`.
        match self.inner.try_lock() {
            Some(inner) => debug.field("inner", &*inner).finish(),
            None => debug.finish_non_exhaustive(),
        }
    }
}

impl<P> LockedCache<P> {
    /// Wrap `core`, labelling its metrics with `name`.
    #[inline]
    #[must_use]
    pub fn with_core(name: impl Into<String>, core: P) -> Self {
        Self {
            name: name.into(),
            inner: Mutex::new(core),
        }
    }

    /// Relabel this cache.
    #[inline]
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The metrics label of this cache.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run `f` against the core while holding the lock.
    #[inline]
    pub fn inspect<R>(&self, f: impl FnOnce(&P) -> R) -> R {
        f(&self.inner.lock())
    }

    /// Unwrap the core.
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> P {
        self.inner.into_inner()
    }
}

impl<K, V, P> Cache<K, V> for LockedCache<P>
where
    P: ReplacementPolicy<K, V> + Send,
    V: Clone,
{
    #[inline]
    fn put(&self, key: K, value: V) {
        self.inner.lock().put(key, value);
    }

    #[inline]
    fn get(&self, key: &K, default: V) -> (V, bool) {
        let hit = self.inner.lock().get(key).cloned();
        trace!(cache = %self.name, hit = hit.is_some(), "cache lookup");
        if let Some(value) = hit {
            CACHE_METRICS.cache_hit_count_inc(&self.name);
            (value, true)
        } else {
            CACHE_METRICS.cache_miss_count_inc(&self.name);
            (default, false)
        }
    }

    #[inline]
    fn delete(&self, key: &K) {
        self.inner.lock().delete(key);
    }

    #[inline]
    fn len(&self) -> usize {
        self.inner.lock().len()
    }
}

/// A resident key and value, the entry shape shared by LRU, LFU and 2Q.
#[derive(Debug)]
struct Entry<K, V> {
    /// The key, kept to clean the lookup table on eviction.
    key: K,
    /// The cached value.
    value: V,
}

/// The resident segment of a 2Q entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Segment {
    /// The recency segment, `A1` or `A1-in`.
    Recent,
    /// The frequency segment, `Am`.
    Frequent,
}

/// Where a 2Q entry lives. Handles are local to one queue, so the segment is
/// needed to resolve them.
#[derive(Clone, Copy, Debug)]
struct Location {
    /// The segment holding the entry.
    segment: Segment,
    /// The handle into that segment.
    handle: Handle,
}

/// Add `weight` to a running total.
fn acquire_weight(total: u64, weight: u64) -> u64 {
    total.overflow_add(weight)
}

/// Subtract `weight` from a running total.
///
/// A running total smaller than the released weight means the bookkeeping is
/// broken, which is fatal.
fn release_weight(total: u64, weight: u64, policy: &str) -> u64 {
    total.checked_sub(weight).unwrap_or_else(|| {
        panic!("{policy} current size {total} less than size {weight} of the released element")
    })
}
