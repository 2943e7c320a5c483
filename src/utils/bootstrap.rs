//! Bootstrap utilities for applications using sqlhooks.
//!
//! The logging hook emits `tracing` events; these helpers install a
//! subscriber for applications that do not bring their own.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LOG_ENV_VAR;

/// Filter from the SQLHOOKS_LOG environment variable, "info" if unset or
/// invalid.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize tracing with SQLHOOKS_LOG environment variable.
///
/// Defaults to "info" level if SQLHOOKS_LOG is not set. Does nothing when a
/// global subscriber is already installed.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
