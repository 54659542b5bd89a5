//! Build a cache from its config.

use std::hash::Hash;

use tracing::info;

use super::PolicyConfig;
use crate::common::error::{CacheResult, Context};
use crate::policy::{Cache, Full2QCache, LfuCache, LruCache, MqCache, Simplified2QCache};

/// Build the cache described by `config`, with default size and tier
/// calculators.
#[inline]
pub fn build_cache<K, V>(config: &PolicyConfig) -> CacheResult<Box<dyn Cache<K, V>>>
where
    K: Hash + Eq + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    config
        .validate()
        .with_context(|| format!("failed to build a {} cache", config.kind()))?;
    info!(?config, "building cache");

    let cache: Box<dyn Cache<K, V>> = match *config {
        PolicyConfig::Lru { capacity } => Box::new(LruCache::<K, V>::new(capacity, None)),
        PolicyConfig::Lfu { capacity } => Box::new(LfuCache::<K, V>::new(capacity)),
        PolicyConfig::Simplified2Q { a1_size, am_size } => {
            Box::new(Simplified2QCache::<K, V>::new(a1_size, am_size))
        }
        PolicyConfig::Full2Q {
            am_size,
            a1_in_size,
            a1_out_size,
        } => Box::new(Full2QCache::<K, V>::new(am_size, a1_in_size, a1_out_size)),
        PolicyConfig::Mq {
            tiers,
            capacity,
            ghost_size,
            life_time,
        } => Box::new(MqCache::<K, V>::new(
            tiers, capacity, ghost_size, life_time, None, None,
        )),
    };
    Ok(cache)
}
