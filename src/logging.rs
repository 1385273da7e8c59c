//! Log output for applications embedding the store.
//!
//! The engine itself only emits `tracing` events. This module installs a
//! `tracing-subscriber` formatter writing to stderr at the configured level.

use tracing::Level;

use crate::config::LoggingConfig;

/// Parses a configured level name, falling back to `INFO`.
pub fn parse_level(level: &str) -> Level {
    level.trim().parse().unwrap_or(Level::INFO)
}

/// Installs the global subscriber.
///
/// Returns `false` if a subscriber was already installed, in which case the
/// existing one is left in place.
pub fn init(config: &LoggingConfig) -> bool {
    tracing_subscriber::fmt()
        .with_max_level(parse_level(&config.level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
