use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global subscriber.
///
/// The filter comes from `RUST_LOG`, then `LOG_LEVEL`, then `default_level`.
/// When a Sentry DSN is given, events at `error` are also reported there; the
/// returned guard must be held for the lifetime of the process.
pub fn init_tracing(default_level: &str, sentry_dsn: Option<&str>) -> Option<sentry::ClientInitGuard> {
    let filter = EnvFilter::try_from_env("RUST_LOG")
        .or_else(|_| EnvFilter::try_from_env("LOG_LEVEL"))
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let guard = sentry_dsn.filter(|dsn| !dsn.is_empty()).map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true));

    if guard.is_some() {
        registry.with(sentry_tracing::layer()).init();
    } else {
        registry.init();
    }

    guard
}
