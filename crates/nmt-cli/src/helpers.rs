//! Shared CLI helpers.

use tracing_subscriber::EnvFilter;

/// Initialize `tracing` with an `RUST_LOG`-driven filter, falling back to
/// `default_level` when unset.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
