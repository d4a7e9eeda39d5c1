//! Defines helpers for logging

pub use tracing_subscriber::{filter::LevelFilter, fmt::format::Format};
use tracing_subscriber::{EnvFilter, fmt};

/// Initialize a logger at the given log level
pub fn setup_system_logger(level: LevelFilter) {
    tracing_subscriber::fmt().event_format(Format::default().pretty()).with_max_level(level).init();
}

/// Initialize a logger that respects `RUST_LOG`, falling back to the given
/// level when the environment is silent
pub fn setup_env_logger(default_level: LevelFilter) {
    let filter =
        EnvFilter::builder().with_default_directive(default_level.into()).from_env_lossy();
    fmt().event_format(Format::default().pretty()).with_env_filter(filter).init();
}
