//! Logging initialization.
//!
//! Installs a `tracing` subscriber with an environment-overridable filter.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Default log filter directive.
pub const DEFAULT_LOG_FILTER: &str = "replayhub=info,sqlx=warn";

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the default directive. Safe to call once
/// per process; subsequent calls would panic, so tests use their own
/// subscribers.
pub fn init() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
