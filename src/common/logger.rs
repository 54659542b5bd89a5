use tracing::level_filters::LevelFilter as Level;
use tracing_subscriber::filter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::prelude::*;

/// Initialize the logger, writing compact lines to stderr.
///
/// Events of the replacement policies are emitted under the
/// `allcache::policy` target, which follows `level` like everything else.
#[allow(clippy::let_underscore_must_use)]
#[inline]
pub fn init_logger(level: Level) {
    let filter = filter::Targets::new()
        .with_target("allcache::metrics", Level::INFO)
        .with_target("", level);

    let layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_file(false)
        .with_target(true)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .with_filter(filter);

    let subscriber = tracing_subscriber::Registry::default().with(layer);

    if cfg!(test) {
        let _: Result<(), tracing::subscriber::SetGlobalDefaultError> =
            tracing::subscriber::set_global_default(subscriber);
    } else {
        tracing::subscriber::set_global_default(subscriber)
            .unwrap_or_else(|error| panic!("Could not set logger ,err {error}"));
    }
}
