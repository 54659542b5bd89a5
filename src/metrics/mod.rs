//! `allcache` metrics.

mod cache;

use once_cell::sync::Lazy;
use prometheus::Registry;

pub use self::cache::{CacheMetrics, CACHE_METRICS};

/// The global metrics registry used by `allcache`.
pub static CACHE_REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);
