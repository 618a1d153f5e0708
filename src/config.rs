//! Configuration management for CrabReel
//!
//! Provides loading, saving, and validation of recorder settings: where
//! recordings go, how files are named, the container frame rate, and the
//! per-session frame budget.

use crate::errors::RecordError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Recorder settings, stored as TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Directory new recordings are written to (created if missing)
    pub output_directory: PathBuf,
    /// File name prefix; a hex millisecond timestamp and `.mp4` are appended
    pub file_prefix: String,
    /// Container frame rate
    pub fps: f64,
    /// Maximum number of frames accepted per recording
    pub frame_budget: u32,
    /// Enable fast-start (moov before mdat)
    pub fast_start: bool,
    /// Optional title metadata
    pub title: Option<String>,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            output_directory: PathBuf::from("./recordings"),
            file_prefix: "crabreel-record".to_string(),
            fps: 25.0,
            frame_budget: 60,
            fast_start: true,
            title: None,
        }
    }
}

impl RecorderConfig {
    pub const MAX_FPS: f64 = 240.0;
    pub const MAX_FRAME_BUDGET: u32 = 100_000;

    pub fn with_output_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_directory = dir.into();
        self
    }

    pub fn with_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_prefix = prefix.into();
        self
    }

    pub fn with_fps(mut self, fps: f64) -> Self {
        self.fps = fps;
        self
    }

    pub fn with_frame_budget(mut self, budget: u32) -> Self {
        self.frame_budget = budget;
        self
    }

    pub fn with_fast_start(mut self, enabled: bool) -> Self {
        self.fast_start = enabled;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, RecordError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| RecordError::Config(format!("Failed to read config file: {}", e)))?;

        let config: RecorderConfig = toml::from_str(&contents)
            .map_err(|e| RecordError::Config(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), RecordError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                RecordError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| RecordError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| RecordError::Config(format!("Failed to write config file: {}", e)))?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("crabreel.toml")
    }

    /// Load from default location or fall back to defaults
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.output_directory.as_os_str().is_empty() {
            return Err(RecordError::Config("Output directory must not be empty".into()));
        }
        if self.file_prefix.is_empty() || self.file_prefix.contains(['/', '\\']) {
            return Err(RecordError::Config(format!(
                "Invalid file prefix {:?}",
                self.file_prefix
            )));
        }
        if !self.fps.is_finite() || self.fps < 1.0 || self.fps > Self::MAX_FPS {
            return Err(RecordError::Config(format!(
                "Invalid FPS {} (must be 1-{})",
                self.fps,
                Self::MAX_FPS
            )));
        }
        if self.frame_budget == 0 || self.frame_budget > Self::MAX_FRAME_BUDGET {
            return Err(RecordError::Config(format!(
                "Frame budget must be between 1 and {}",
                Self::MAX_FRAME_BUDGET
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RecorderConfig::default();
        assert_eq!(config.fps, 25.0);
        assert_eq!(config.frame_budget, 60);
        assert!(config.fast_start);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let bad_fps = RecorderConfig::default().with_fps(0.0);
        assert!(matches!(bad_fps.validate(), Err(RecordError::Config(_))));

        let bad_budget = RecorderConfig::default().with_frame_budget(0);
        assert!(bad_budget.validate().is_err());

        let bad_prefix = RecorderConfig::default().with_file_prefix("a/b");
        assert!(bad_prefix.validate().is_err());

        let nan_fps = RecorderConfig::default().with_fps(f64::NAN);
        assert!(nan_fps.validate().is_err());
    }

    #[test]
    fn test_config_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("nested").join("crabreel.toml");

        let config = RecorderConfig::default()
            .with_frame_budget(12)
            .with_title("Session");
        config.save_to_file(&config_path).unwrap();

        let loaded = RecorderConfig::load_from_file(&config_path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("partial.toml");
        fs::write(&config_path, "frame_budget = 5\n").unwrap();

        let loaded = RecorderConfig::load_from_file(&config_path).unwrap();
        assert_eq!(loaded.frame_budget, 5);
        assert_eq!(loaded.fps, 25.0);
    }

    #[test]
    fn test_invalid_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("bad.toml");
        fs::write(&config_path, "fps = 1000.0\n").unwrap();

        assert!(matches!(
            RecorderConfig::load_from_file(&config_path),
            Err(RecordError::Config(_))
        ));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = RecorderConfig::load_from_file("nonexistent_crabreel.toml");
        assert_eq!(result.unwrap(), RecorderConfig::default());
    }
}
