//! Logger setup and byte-dump helpers.
//!
//! The library only emits through the `log` facade. Binaries pick a backend by
//! calling one of the init functions below once at startup.

use log::{log_enabled, trace, Level, LevelFilter};

/// Initializes the logger with the `env_logger` crate (honours `RUST_LOG`).
pub fn init_logger() {
    env_logger::init();
}

/// Initializes `env_logger` with a fixed default level that `RUST_LOG` can still override.
pub fn init_logger_with_level(level: LevelFilter) {
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

/// Logs a labelled hex dump of raw bus bytes at trace level.
pub fn log_frame(label: &str, bytes: &[u8]) {
    if log_enabled!(Level::Trace) {
        trace!("{label} [{}] {}", bytes.len(), hex::encode_upper(bytes));
    }
}

/// Formats bytes for human-facing output (CLI, debug logs).
pub fn hex_string(bytes: &[u8]) -> String {
    hex::encode_upper(bytes)
}
