use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

pub const DEFAULT_FILTER: &str = "info,mailora_dedup=debug";

/// Installs the global subscriber. `RUST_LOG` overrides the default filter.
/// Calling it again after a subscriber is set is a no-op.
pub fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let fmt_layer = fmt::layer().with_target(true);

    if Registry::default().with(env_filter).with(fmt_layer).try_init().is_ok() {
        ::tracing::info!("tracing initialized");
    }
}
