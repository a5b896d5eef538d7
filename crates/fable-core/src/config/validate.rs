//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_upload_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_upload_mb must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if self.limits.decode_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.decode_timeout_ms must be > 0".into(),
            ));
        }
        if self.limits.caption_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.caption_timeout_ms must be > 0".into(),
            ));
        }
        if self.captioner.repo.is_empty() {
            return Err(ConfigError::ValidationError(
                "captioner.repo must not be empty".into(),
            ));
        }
        if self.captioner.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "captioner.max_tokens must be > 0".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.enhancer.temperature) {
            return Err(ConfigError::ValidationError(
                "enhancer.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.enhancer.top_p) {
            return Err(ConfigError::ValidationError(
                "enhancer.top_p must be between 0.0 and 1.0".into(),
            ));
        }
        if self.enhancer.max_output_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "enhancer.max_output_tokens must be > 0".into(),
            ));
        }
        if self.enhancer.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "enhancer.timeout_ms must be > 0".into(),
            ));
        }
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "server.port must be > 0".into(),
            ));
        }
        // An unrecognized level would yield a filter that silences everything.
        if !["error", "warn", "info", "debug", "trace"].contains(&self.logging.level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "logging.level must be one of error, warn, info, debug, trace (got {:?})",
                self.logging.level
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_upload_limit() {
        let mut config = Config::default();
        config.limits.max_upload_mb = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_upload_mb"));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.limits.decode_timeout_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("decode_timeout_ms"));
    }

    #[test]
    fn test_validate_rejects_invalid_temperature() {
        let mut config = Config::default();
        config.enhancer.temperature = 2.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("temperature"));

        config.enhancer.temperature = -0.1;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("temperature"));
    }

    #[test]
    fn test_validate_rejects_invalid_top_p() {
        let mut config = Config::default();
        config.enhancer.top_p = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("top_p"));
    }

    #[test]
    fn test_validate_rejects_empty_repo() {
        let mut config = Config::default();
        config.captioner.repo = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("captioner.repo"));
    }

    #[test]
    fn test_validate_rejects_unknown_log_level() {
        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("logging.level"));
    }
}
