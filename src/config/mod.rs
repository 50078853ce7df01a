//! Configuration management for RemoteRobot
//!
//! This module handles client configuration including:
//! - Loading and saving the configuration file
//! - Managing the configuration directory
//! - Providing defaults for speech, timer and video operations
//! - Configuration validation

use crate::error::{ConfigError, ConfigResult};
use crate::logging::LogLevel;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "config.toml";

const DEFAULT_SPEECH_VOLUME: f32 = 1.0;
const DEFAULT_REPEAT_COUNT: i64 = 0;
const DEFAULT_INTERVAL_SECS: f32 = 1.0;
const DEFAULT_FPS: u32 = 10;

/// Lowest frame rate a subscriber may request
pub const MIN_FPS: u32 = 1;

/// Highest frame rate a subscriber may request
pub const MAX_FPS: u32 = 30;

/// Client configuration
///
/// Missing sections fall back to their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Speech command defaults
    pub speech: SpeechConfig,

    /// Timer defaults
    pub timers: TimerConfig,

    /// Image-frame subscription defaults
    pub video: VideoConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Speech command defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Volume used when the caller does not pass one (0.0-1.0)
    pub default_volume: f32,
}

/// Timer defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Repeat count used when the caller does not pass one (negative = infinite)
    pub default_repeat_count: i64,

    /// Interval between repeats in seconds (raised to 0.1s if smaller)
    pub default_interval_secs: f32,
}

/// Image-frame subscription defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    /// Frame rate requested when the caller does not pass one
    pub default_fps: u32,

    /// Decode frames before delivery
    pub decode_frames: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (overridden by RUST_LOG)
    pub level: LogLevel,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            default_volume: DEFAULT_SPEECH_VOLUME,
        }
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            default_repeat_count: DEFAULT_REPEAT_COUNT,
            default_interval_secs: DEFAULT_INTERVAL_SECS,
        }
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            default_fps: DEFAULT_FPS,
            decode_frames: true,
        }
    }
}

impl Config {
    /// Validates configuration values
    ///
    /// # Errors
    ///
    /// Returns error naming the first out-of-range value
    pub fn validate(&self) -> ConfigResult<()> {
        let volume = self.speech.default_volume;
        if !volume.is_finite() || !(0.0..=1.0).contains(&volume) {
            return Err(ConfigError::InvalidValue(
                "Speech volume must be between 0.0 and 1.0".to_string(),
            ));
        }

        if !(MIN_FPS..=MAX_FPS).contains(&self.video.default_fps) {
            return Err(ConfigError::InvalidValue(format!(
                "FPS must be between {} and {}",
                MIN_FPS, MAX_FPS
            )));
        }

        Ok(())
    }
}

/// Configuration manager
pub struct ConfigManager {
    config_dir: PathBuf,
    config_file: PathBuf,
}

impl ConfigManager {
    /// Creates a ConfigManager rooted in the per-user configuration directory
    ///
    /// # Errors
    ///
    /// Returns error if project directory cannot be determined
    pub fn new() -> ConfigResult<Self> {
        let config_dir = Self::get_config_directory()?;
        Ok(Self::with_directory(config_dir))
    }

    /// Creates a ConfigManager rooted in an explicit directory
    pub fn with_directory(config_dir: impl Into<PathBuf>) -> Self {
        let config_dir = config_dir.into();
        let config_file = config_dir.join(CONFIG_FILE_NAME);

        Self {
            config_dir,
            config_file,
        }
    }

    fn get_config_directory() -> ConfigResult<PathBuf> {
        ProjectDirs::from("com", "remoterobot", "RemoteRobot")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .ok_or_else(|| {
                ConfigError::DirectoryNotFound(
                    "Could not determine configuration directory".to_string(),
                )
            })
    }

    fn ensure_config_directory(&self) -> ConfigResult<()> {
        if !self.config_dir.exists() {
            fs::create_dir_all(&self.config_dir).map_err(|e| {
                ConfigError::DirectoryCreationFailed(format!(
                    "Failed to create config directory at {:?}: {}",
                    self.config_dir, e
                ))
            })?;
        }
        Ok(())
    }

    /// Loads configuration from file, or creates default if it doesn't exist
    ///
    /// # Errors
    ///
    /// Returns error if configuration cannot be loaded or created
    pub fn load_or_create_default(&self) -> ConfigResult<Config> {
        self.ensure_config_directory()?;

        if self.config_file.exists() {
            self.load()
        } else {
            let config = Config::default();
            self.save(&config)?;
            Ok(config)
        }
    }

    fn load(&self) -> ConfigResult<Config> {
        let content = fs::read_to_string(&self.config_file).map_err(|e| {
            ConfigError::LoadFailed(format!("Failed to read config file: {}", e))
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| {
            ConfigError::LoadFailed(format!("Failed to parse config file: {}", e))
        })?;

        config.validate()?;

        Ok(config)
    }

    /// Saves configuration to file
    ///
    /// # Errors
    ///
    /// Returns error if configuration is invalid or cannot be written
    pub fn save(&self, config: &Config) -> ConfigResult<()> {
        self.ensure_config_directory()?;
        config.validate()?;

        let content = toml::to_string_pretty(config).map_err(|e| {
            ConfigError::SaveFailed(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(&self.config_file, content).map_err(|e| {
            ConfigError::SaveFailed(format!("Failed to write config file: {}", e))
        })?;

        Ok(())
    }

    /// Gets the path to the configuration file
    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Gets the configuration directory path
    pub fn config_directory(&self) -> &Path {
        &self.config_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.speech.default_volume, 1.0);
        assert_eq!(config.timers.default_repeat_count, 0);
        assert_eq!(config.timers.default_interval_secs, 1.0);
        assert_eq!(config.video.default_fps, 10);
        assert!(config.video.decode_frames);
        assert_eq!(config.logging.level, LogLevel::Info);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.video.default_fps = 31;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.speech.default_volume = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timer_defaults_accept_what_timers_accept() {
        let mut config = Config::default();
        config.timers.default_repeat_count = -2;
        config.timers.default_interval_secs = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_or_create_default_writes_file() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_directory(temp_dir.path().join("remote-robot"));

        let config = manager.load_or_create_default().unwrap();
        assert!(manager.config_file().exists());
        assert_eq!(config.video.default_fps, 10);
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_directory(temp_dir.path());

        let mut config = Config::default();
        config.video.default_fps = 25;
        config.logging.level = LogLevel::Debug;
        manager.save(&config).unwrap();

        let reloaded = manager.load_or_create_default().unwrap();
        assert_eq!(reloaded.video.default_fps, 25);
        assert_eq!(reloaded.logging.level, LogLevel::Debug);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_directory(temp_dir.path());
        fs::write(manager.config_file(), "[speech]\ndefault_volume = 0.5\n").unwrap();

        let config = manager.load_or_create_default().unwrap();
        assert_eq!(config.speech.default_volume, 0.5);
        assert_eq!(config.video.default_fps, 10);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_directory(temp_dir.path());
        fs::write(
            manager.config_file(),
            "[video]\ndefault_fps = 0\ndecode_frames = true\n",
        )
        .unwrap();

        assert!(matches!(
            manager.load_or_create_default(),
            Err(ConfigError::InvalidValue(_))
        ));
    }
}
