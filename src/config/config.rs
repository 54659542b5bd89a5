use clap::Parser;

#[derive(Debug, Parser)]
#[clap(author, version, about, long_about = None)]
/// A cache config
pub struct Config {
    #[clap(long = "policy", value_name = "VALUE", default_value = "lru")]
    /// Replacement policy: lru, lfu, 2q-simple, 2q-full, mq
    pub policy: String,
    #[clap(long = "capacity", value_name = "VALUE", default_value = "1024")]
    /// Total weight for lru and mq, entry count for lfu
    pub capacity: u64,
    #[clap(long = "a1-size", value_name = "VALUE", default_value = "256")]
    /// Size of the recency segment of the 2q policies
    pub a1_size: usize,
    #[clap(long = "am-size", value_name = "VALUE", default_value = "768")]
    /// Size of the frequency segment of the 2q policies
    pub am_size: usize,
    #[clap(long = "a1-out-size", value_name = "VALUE", default_value = "512")]
    /// Number of evicted keys remembered by 2q-full
    pub a1_out_size: usize,
    #[clap(flatten)]
    /// Multi-Queue related config
    pub mq: MqConfig,
}

#[derive(Debug, Parser)]
/// Multi-Queue config
pub struct MqConfig {
    #[clap(long = "tiers", value_name = "VALUE", default_value = "8")]
    /// Number of tiers
    pub tiers: usize,
    #[clap(long = "ghost-size", value_name = "VALUE", default_value = "1024")]
    /// Number of evicted keys whose hit counts are remembered
    pub ghost_size: usize,
    #[clap(long = "life-time", value_name = "VALUE", default_value = "1024")]
    /// Operations an unreferenced entry stays in its tier
    pub life_time: u64,
}
