//! Logging Module
//!
//! Installs the global tracing subscriber for binaries. The library itself
//! only emits events.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Builds the filter: `RUST_LOG` when set, otherwise `config.filter`.
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter))
}

/// Initializes the tracing subscriber with an env filter and a fmt layer
/// writing to stderr.
///
/// Returns false if a global subscriber was already installed.
pub fn init(config: &LoggingConfig) -> bool {
    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(config.ansi)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .is_ok()
}
