//! Error types for RemoteRobot
//!
//! This module defines all error types used throughout the crate.
//! Every failure is reported synchronously to the immediate caller; nothing
//! in here is retried or swallowed.

use std::io;
use thiserror::Error;

use crate::timer::TimerId;

/// Main error type for RemoteRobot
#[derive(Error, Debug)]
pub enum RemoteRobotError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Session, control and command errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Timer registry errors
    #[error("Timer error: {0}")]
    Timer(#[from] TimerError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("Configuration directory not found: {0}")]
    DirectoryNotFound(String),

    #[error("Failed to create configuration directory: {0}")]
    DirectoryCreationFailed(String),
}

/// Session lifecycle, exclusive control and command encoding errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("Already connected to a robot")]
    AlreadyConnected,

    #[error("Not connected to a robot")]
    NotConnected,

    #[error("Connection rejected: {0}")]
    ConnectionRejected(String),

    #[error("Exclusive control of the robot is not permitted yet")]
    NotPermitted,

    #[error("Invalid camera index {index} ({available} cameras available)")]
    InvalidCameraIndex { index: i64, available: usize },

    #[error("Invalid custom command ID {0}, must be within 25..=255")]
    InvalidCommandId(i64),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Timer registry errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimerError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown timer ID {0}")]
    UnknownTimer(TimerId),
}

/// Type alias for Results using RemoteRobotError
pub type Result<T> = std::result::Result<T, RemoteRobotError>;

/// Type alias for Config Results
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Type alias for Session Results
pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Type alias for Timer Results
pub type TimerResult<T> = std::result::Result<T, TimerError>;

impl From<toml::de::Error> for RemoteRobotError {
    fn from(err: toml::de::Error) -> Self {
        RemoteRobotError::Config(ConfigError::LoadFailed(err.to_string()))
    }
}

impl From<toml::ser::Error> for RemoteRobotError {
    fn from(err: toml::ser::Error) -> Self {
        RemoteRobotError::Config(ConfigError::SaveFailed(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = SessionError::InvalidCameraIndex {
            index: 5,
            available: 2,
        };
        assert_eq!(
            error.to_string(),
            "Invalid camera index 5 (2 cameras available)"
        );
        assert_eq!(TimerError::UnknownTimer(7).to_string(), "Unknown timer ID 7");
    }

    #[test]
    fn test_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let remote_error: RemoteRobotError = io_error.into();
        assert!(matches!(remote_error, RemoteRobotError::Io(_)));

        let remote_error: RemoteRobotError = SessionError::NotConnected.into();
        assert!(matches!(
            remote_error,
            RemoteRobotError::Session(SessionError::NotConnected)
        ));
    }
}
