//! Policy engine configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::subject::DEFAULT_ROLE_PREFIX;

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

/// Configuration for [`OwnershipPolicyEngine`](crate::OwnershipPolicyEngine).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AbacConfig {
    /// Prefix prepended to a tuple's required role before the grant lookup.
    pub role_prefix: String,
}

impl Default for AbacConfig {
    fn default() -> Self {
        Self {
            role_prefix: DEFAULT_ROLE_PREFIX.to_string(),
        }
    }
}

impl AbacConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `WARDEN_ROLE_PREFIX`: Grant prefix for roles (default: `ROLE_`)
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            role_prefix: std::env::var("WARDEN_ROLE_PREFIX").unwrap_or(default.role_prefix),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.role_prefix.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidValue {
                key: "WARDEN_ROLE_PREFIX".to_string(),
                message: "must not contain whitespace".to_string(),
            });
        }
        Ok(())
    }

    /// Grant a subject must hold for `role`.
    pub fn grant_for(&self, role: &str) -> String {
        format!("{}{}", self.role_prefix, role)
    }
}
