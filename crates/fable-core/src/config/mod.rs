//! Configuration management for Fable.
//!
//! Configuration is loaded from the platform config directory
//! (`~/.config/fable/config.toml` on Linux) with sensible defaults; every
//! section and key is optional.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Root configuration structure for Fable.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Resource limits
    pub limits: LimitsConfig,

    /// Local captioning model settings
    pub captioner: CaptionerConfig,

    /// Narrative enhancement settings
    pub enhancer: EnhancerConfig,

    /// HTTP server settings
    pub server: ServerConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.fable.fable/config.toml
    /// - Linux: ~/.config/fable/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\fable\config\config.toml
    ///
    /// Falls back to ~/.fable/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "fable", "fable")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".fable").join("config.toml")
            })
    }

    /// Get the resolved model directory path (with ~ expansion).
    pub fn model_dir(&self) -> PathBuf {
        let path_str = self.general.model_dir.to_string_lossy();
        let expanded = shellexpand::tilde(&path_str);
        PathBuf::from(expanded.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.limits.max_upload_mb, 25);
        assert_eq!(config.captioner.repo, "Salesforce/blip-image-captioning-base");
        assert_eq!(config.enhancer.model, "gemini-1.5-flash");
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_model_dir_expands_tilde() {
        let config = Config::default();
        let dir = config.model_dir();
        assert!(!dir.to_string_lossy().starts_with('~'));
    }

    #[test]
    fn test_load_from_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nport = 9001\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.server.port, 9001);
        // Unspecified sections keep their defaults
        assert_eq!(config.limits.max_upload_mb, 25);
    }

    #[test]
    fn test_load_from_rejects_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server\nport = oops").unwrap();

        assert!(Config::load_from(&path).is_err());
    }
}
