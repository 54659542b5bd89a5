/// Build a cache from a validated config.
mod builder;
/// Configuration module. This module is used to parse configuration from command line arguments
mod config;
/// Inner configuration module. This module is used to store the validated configuration
/// and will be used to build the cache
mod inner;

pub use builder::build_cache;
pub use config::{Config, MqConfig};
pub use inner::{PolicyConfig, PolicyKind};
