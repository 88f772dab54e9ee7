//! Lifecycle configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

/// Configuration for user state transitions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LifecycleConfig {
    /// Longest detention a single `detain` call may impose, in days.
    pub max_detention_days: i64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            max_detention_days: 365,
        }
    }
}

impl LifecycleConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `WARDEN_MAX_DETENTION_DAYS`: Longest detention in days (default: 365)
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            max_detention_days: std::env::var("WARDEN_MAX_DETENTION_DAYS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.max_detention_days),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_detention_days <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "WARDEN_MAX_DETENTION_DAYS".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LifecycleConfig::default();
        assert_eq!(config.max_detention_days, 365);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_non_positive_maximum_rejected() {
        let config = LifecycleConfig {
            max_detention_days: 0,
        };
        assert!(config.validate().is_err());
    }
}
