use tracing_subscriber::{fmt, EnvFilter};

/// Install the global `tracing` subscriber. Honors `RUST_LOG`, defaulting to
/// `info`. Calling this twice is harmless.
pub fn init_tracing() {
    init_tracing_with_default("info");
}

pub fn init_tracing_with_default(default_filter: &str) {
    if tracing::dispatcher::has_been_set() {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}
