//! `allcache` replay tool
//!
//! Replays a Zipf distributed workload against one of the caches and reports
//! the hit ratio. A miss is followed by a put of the missed key.

#![deny(
    // The following are allowed by default lints according to
    // https://doc.rust-lang.org/rustc/lints/listing/allowed-by-default.html
    anonymous_parameters,
    bare_trait_objects,
    // box_pointers,
    // elided_lifetimes_in_paths, // allow anonymous lifetime
    // missing_copy_implementations, // Copy may cause unnecessary memory copy
    missing_debug_implementations,
    missing_docs,
    single_use_lifetimes,
    trivial_casts,
    trivial_numeric_casts,
    // unreachable_pub, allow clippy::redundant_pub_crate lint instead
    unsafe_code,
    unstable_features,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    // unused_results,
    variant_size_differences,

    clippy::all,
    clippy::restriction,
    clippy::pedantic,
    clippy::cargo
)]
#![allow(
    // Some explicitly allowed Clippy lints, must have clear reason to allow
    clippy::blanket_clippy_restriction_lints, // allow clippy::restriction
    clippy::implicit_return, // actually omitting the return keyword is idiomatic Rust code
    clippy::module_name_repetitions, // repeation of module name in a struct name is not big deal
    clippy::multiple_crate_versions, // multi-version dependency crates is not able to fix
    clippy::panic, // allow debug_assert, panic in production code
    clippy::unreachable,  // Use `unreachable!` instead of `panic!` when impossible cases occurs
    // clippy::panic_in_result_fn,
    clippy::missing_errors_doc,
    clippy::exhaustive_structs,
    clippy::exhaustive_enums,
    clippy::missing_panics_doc,
    clippy::panic_in_result_fn,
    clippy::single_char_lifetime_names,
    clippy::separated_literal_suffix, // conflict with unseparated_literal_suffix
    clippy::shadow_unrelated, //it’s a common pattern in Rust code
    clippy::shadow_reuse, //it’s a common pattern in Rust code
    clippy::shadow_same, //it’s a common pattern in Rust code
    clippy::mod_module_files,
    clippy::std_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::pub_use,
    clippy::missing_trait_methods,
    clippy::arithmetic_side_effects,
    clippy::use_debug, // Allow debug print
    clippy::print_stdout, // Allow println!
    clippy::question_mark_used, // Allow ? operator
    clippy::absolute_paths,   // Allow use through absolute paths,like `std::env::current_dir`
    clippy::ref_patterns,    // Allow Some(ref x)
    clippy::single_call_fn,  // Allow function is called only once
    clippy::pub_with_shorthand,  // Allow pub(super)
    clippy::min_ident_chars,  // Allow Err(e)
        clippy::impl_trait_in_params,  // Allow impl AsRef<Path>, it's common in Rust
    clippy::missing_assert_message, // Allow assert! without message, mainly in test code
    clippy::semicolon_outside_block, // We need to choose between this and `semicolon_inside_block`, we choose outside
    clippy::similar_names, // Allow similar names like a1_in and a1_out
)]

use allcache::common::logger::init_logger;
use allcache::config::{build_cache, Config, PolicyConfig};
use clap::Parser;
use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::Zipf;
use tracing::info;
use tracing::level_filters::LevelFilter;

#[derive(Debug, Parser)]
#[clap(author, version, about, long_about = None)]
/// Replay tool args
struct Args {
    #[clap(flatten)]
    /// Cache related config
    cache: Config,
    #[clap(long = "requests", value_name = "VALUE", default_value = "100000")]
    /// Number of lookups to replay
    requests: u64,
    #[clap(long = "keys", value_name = "VALUE", default_value = "10000")]
    /// Number of distinct keys
    keys: u64,
    #[clap(long = "zipf-exponent", value_name = "VALUE", default_value = "1.1")]
    /// Skew of the key popularity
    exponent: f64,
    #[clap(long = "seed", value_name = "VALUE", default_value = "0")]
    /// Seed of the workload
    seed: u64,
    #[clap(long = "log-level", value_name = "VALUE", default_value = "info")]
    /// Log level: off, error, warn, info, debug, trace
    log_level: LevelFilter,
}

#[allow(
    clippy::as_conversions,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::float_arithmetic
)]
fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logger(args.log_level);

    let policy = PolicyConfig::try_from(args.cache)?;
    let cache = build_cache::<u64, u64>(&policy)?;
    let zipf = Zipf::new(args.keys, args.exponent)?;
    let mut rng = StdRng::seed_from_u64(args.seed);
    info!(
        policy = %policy.kind(),
        requests = args.requests,
        keys = args.keys,
        "replaying workload"
    );

    let mut hits = 0_u64;
    for _ in 0..args.requests {
        // Zipf samples are integers in `1..=keys`.
        let key = zipf.sample(&mut rng) as u64;
        let (_, hit) = cache.get(&key, 0);
        if hit {
            hits += 1;
        } else {
            cache.put(key, key);
        }
    }

    let ratio = if args.requests == 0 {
        0.0
    } else {
        hits as f64 / args.requests as f64
    };
    println!("policy:    {}", policy.kind());
    println!("requests:  {}", args.requests);
    println!("hits:      {hits}");
    println!("hit ratio: {ratio:.4}");
    println!("resident:  {}", cache.len());
    Ok(())
}
