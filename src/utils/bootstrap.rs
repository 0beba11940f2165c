//! Bootstrap utilities for tablemap hosts.
//!
//! Shared initialization code for processes that embed the gateway.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LOG_ENV_VAR;

/// Initialize tracing with TABLEMAP_LOG environment variable.
///
/// Defaults to "info" level if TABLEMAP_LOG is not set. A subscriber that is
/// already installed is left in place.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV_VAR)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
