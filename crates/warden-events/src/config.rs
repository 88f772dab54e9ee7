//! Event bus configuration.
//!
//! Loaded from environment variables with defaults suitable for a
//! single-process deployment.

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

/// Configuration for [`MemoryEventBus`](crate::MemoryEventBus).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventBusConfig {
    /// Capacity of each topic's broadcast channel.
    pub channel_capacity: usize,

    /// Log events that reached no subscriber and no handler.
    pub log_dead_letters: bool,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
            log_dead_letters: true,
        }
    }
}

impl EventBusConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `WARDEN_EVENT_CHANNEL_CAPACITY`: Broadcast channel capacity (default: 1024)
    /// - `WARDEN_LOG_DEAD_LETTERS`: Log undelivered events (default: true)
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            channel_capacity: std::env::var("WARDEN_EVENT_CHANNEL_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.channel_capacity),
            log_dead_letters: std::env::var("WARDEN_LOG_DEAD_LETTERS")
                .map(|s| s != "false" && s != "0")
                .unwrap_or(default.log_dead_letters),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: "WARDEN_EVENT_CHANNEL_CAPACITY".to_string(),
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
        let config = EventBusConfig::default();
        assert_eq!(config.channel_capacity, 1024);
        assert!(config.log_dead_letters);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = EventBusConfig {
            channel_capacity: 0,
            log_dead_letters: false,
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("WARDEN_EVENT_CHANNEL_CAPACITY"));
    }
}
