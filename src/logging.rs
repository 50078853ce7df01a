//! Logging infrastructure for RemoteRobot
//!
//! This module sets up structured logging using the tracing crate.

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// Log level configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level - very verbose
    Trace,
    /// Debug level - detailed information
    Debug,
    /// Info level - general information
    #[default]
    Info,
    /// Warn level - warnings
    Warn,
    /// Error level - errors only
    Error,
}

impl LogLevel {
    /// Converts LogLevel to tracing level filter string
    fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Initializes the logging system
///
/// Sets up tracing subscriber with the specified log level.
/// Can be overridden by RUST_LOG environment variable. Calling this more
/// than once is harmless; only the first subscriber is installed.
///
/// # Examples
///
/// ```no_run
/// use remote_robot::logging::{init_logging, LogLevel};
///
/// init_logging(LogLevel::Debug);
/// ```
pub fn init_logging(level: LogLevel) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(level)));

    let _ = fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .try_init();
}

/// Initializes logging at the level from the `[logging]` config section
pub fn init_from_config(config: &LoggingConfig) {
    init_logging(config.level);
}

/// Initializes logging with default settings
pub fn init_default_logging() {
    init_logging(LogLevel::default());
}

fn default_filter(level: LogLevel) -> String {
    format!("remote_robot={}", level.as_filter_str())
}
