//! Tracing subscriber setup.

use crate::config::DEFAULT_LOG_FILTER;
use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber, filtered by `RUST_LOG` or the default filter. A second call is a no-op.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    if tracing_subscriber::fmt().with_env_filter(filter).try_init().is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
