//! Telemetry helpers for structured logging and tracing.

use tracing_subscriber::EnvFilter;

/// Install a default env-based subscriber (`RUST_LOG`) unless the host
/// application already installed one.
pub fn init_tracing() {
    install(EnvFilter::from_default_env());
}

/// Install a subscriber with explicit filter directives such as
/// `"slotgate=debug"`. Falls back to `RUST_LOG` when the directives do not parse.
pub fn init_tracing_with_filter(directives: &str) {
    let filter = EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::from_default_env());
    install(filter);
}

fn install(filter: EnvFilter) {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
