//! Structured logging.
//!
//! The library only emits `tracing` events. Binaries call [`init_logging`]
//! once at startup; `RUST_LOG` takes precedence over the configured level.

use std::io;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use crate::config::ObservabilityConfig;

/// Install the global subscriber. Returns false if one was already set.
pub fn init_logging(config: &ObservabilityConfig) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.json {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).with_writer(io::stderr));
        tracing::subscriber::set_global_default(subscriber).is_ok()
    } else {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_writer(io::stderr));
        tracing::subscriber::set_global_default(subscriber).is_ok()
    }
}

/// Generate a request correlation ID.
pub fn generate_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
