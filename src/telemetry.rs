//! Tracing initialization for binaries and test harnesses embedding the crate.

use tracing_subscriber::EnvFilter;

/// Initialize tracing with an env-filter, falling back to the given level
/// for this crate when `RUST_LOG` is unset.
///
/// Safe to call more than once; subsequent calls are no-ops.
pub fn init(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("conviction_core={}", log_level).into());

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
