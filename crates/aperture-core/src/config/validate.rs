//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.discovery.supported_formats.is_empty() {
            return Err(ConfigError::ValidationError(
                "discovery.supported_formats must not be empty".into(),
            ));
        }
        if self.prepare.max_long_edge == 0 {
            return Err(ConfigError::ValidationError(
                "prepare.max_long_edge must be > 0".into(),
            ));
        }
        if self.prepare.jpeg_quality == 0 || self.prepare.jpeg_quality > 100 {
            return Err(ConfigError::ValidationError(
                "prepare.jpeg_quality must be between 1 and 100".into(),
            ));
        }
        if self.prepare.decode_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "prepare.decode_timeout_ms must be > 0".into(),
            ));
        }
        if self.batch.poll_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "batch.poll_interval_secs must be > 0".into(),
            ));
        }
        if self.batch.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "batch.timeout_secs must be > 0".into(),
            ));
        }
        if self.batch.progress_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "batch.progress_interval_secs must be > 0".into(),
            ));
        }
        if self.batch.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "batch.max_tokens must be > 0".into(),
            ));
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
    fn test_validate_rejects_zero_poll_interval() {
        let mut config = Config::default();
        config.batch.poll_interval_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("poll_interval_secs"));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.batch.timeout_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));
    }

    #[test]
    fn test_validate_rejects_bad_jpeg_quality() {
        let mut config = Config::default();
        config.prepare.jpeg_quality = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("jpeg_quality"));

        config.prepare.jpeg_quality = 101;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("jpeg_quality"));
    }

    #[test]
    fn test_validate_rejects_empty_formats() {
        let mut config = Config::default();
        config.discovery.supported_formats.clear();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("supported_formats"));
    }
}
