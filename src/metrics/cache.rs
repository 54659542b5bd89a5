//! Metrics for in-memory caches.

use once_cell::sync::Lazy;
use prometheus::{register_int_counter_vec_with_registry, IntCounterVec, Registry};

use super::CACHE_REGISTRY;

/// The cache related metrics.
pub static CACHE_METRICS: Lazy<CacheMetrics> = Lazy::new(|| CacheMetrics::new(&CACHE_REGISTRY));

/// The cache related metrics.
#[derive(Debug)]
pub struct CacheMetrics {
    /// The counters of total of cache hits. With label: `[name]`.
    cache_hit_count: IntCounterVec,
    /// The counters of total of cache misses. With label: `[name]`
    cache_miss_count: IntCounterVec,
}

impl CacheMetrics {
    /// Creates an instance of `CacheMetrics`, which will create two
    /// `IntCounterVec`s and register them into the specified registry.
    ///
    /// # Panics
    /// This method panics if it called multiple times on the same registry.
    #[allow(clippy::expect_used)] // We can ensure that this method won't panic if we followed the hints above
    #[allow(clippy::ignored_unit_patterns)] // Raised by `register_int_counter_vec_with_registry`
    fn new(registry: &Registry) -> Self {
        let cache_hit_count = register_int_counter_vec_with_registry!(
            "cache_hit_count",
            "The total of cache hits",
            &["name"],
            registry,
        )
        .expect("Metrics name must be unique.");

        let cache_miss_count = register_int_counter_vec_with_registry!(
            "cache_miss_count",
            "The total of cache misses",
            &["name"],
            registry,
        )
        .expect("Metrics name must be unique.");

        Self {
            cache_hit_count,
            cache_miss_count,
        }
    }

    /// Increase the hit count with `name`.
    #[inline]
    pub fn cache_hit_count_inc(&self, name: &str) {
        self.cache_hit_count.with_label_values(&[name]).inc();
    }

    /// Increase the miss count with `name`.
    #[inline]
    pub fn cache_miss_count_inc(&self, name: &str) {
        self.cache_miss_count.with_label_values(&[name]).inc();
    }

    /// The total of hits recorded for `name`.
    #[inline]
    #[must_use]
    pub fn cache_hit_count(&self, name: &str) -> u64 {
        self.cache_hit_count.with_label_values(&[name]).get()
    }

    /// The total of misses recorded for `name`.
    #[inline]
    #[must_use]
    pub fn cache_miss_count(&self, name: &str) -> u64 {
        self.cache_miss_count.with_label_values(&[name]).get()
    }
}
