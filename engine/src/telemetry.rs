//! Structured logging setup
//!
//! One-shot `tracing-subscriber` initialization. The effective filter is
//! `RUST_LOG` when set, otherwise the level resolved from the CLI flag or
//! config. Pretty output in debug builds, JSON in release builds.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global tracing subscriber. Call once, after the log level
/// has been resolved; later calls are ignored.
pub fn init_logging(log_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{0},valet_engine={0}", log_level)));

    #[cfg(debug_assertions)]
    let format = fmt::layer().pretty().with_target(false);
    #[cfg(not(debug_assertions))]
    let format = fmt::layer().json().with_current_span(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(format)
        .try_init()
        .ok();
}
