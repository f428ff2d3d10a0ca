//! Structured logging initialization shared by all services.
//!
//! Every service calls [`init_logging`] once at startup and logs through
//! `tracing` macros from then on. Output is line-delimited JSON so log
//! collectors can ingest it without format rules on their side.

use tracing::info;
use tracing_subscriber::EnvFilter;

/// Initialize JSON logging with an environment-controlled filter.
///
/// `RUST_LOG` wins when set; otherwise `default_level` is used, and an
/// unparseable `default_level` falls back to `info`. Calling this more than
/// once (tests, embedded setups) is a no-op after the first call.
pub fn init_logging(service_name: &str, default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .json()
        .try_init();

    info!(service = service_name, "logging initialized");
}

fn default_filter(level: &str) -> EnvFilter {
    let level: tracing::Level = level.parse().unwrap_or(tracing::Level::INFO);
    EnvFilter::new(level.to_string().to_lowercase())
}
