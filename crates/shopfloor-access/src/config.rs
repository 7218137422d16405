//! Access-control configuration.
//!
//! Loaded from environment variables with defaults suitable for local
//! development.

use serde::{Deserialize, Serialize};
use shopfloor_rbac::FALLBACK_ROLE;
use shopfloor_store::MAX_BATCH_WRITES;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
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

/// Settings shared by the role and permission stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Maximum writes per batch commit during cascades and bootstrap.
    pub batch_write_limit: usize,

    /// Role injected into a principal whose role set would become empty.
    pub fallback_role: String,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            batch_write_limit: MAX_BATCH_WRITES,
            fallback_role: FALLBACK_ROLE.to_string(),
        }
    }
}

impl AccessConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `SHOPFLOOR_BATCH_WRITE_LIMIT`: Writes per batch commit (default: 500)
    /// - `SHOPFLOOR_FALLBACK_ROLE`: Fallback role slug (default: personnel)
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            batch_write_limit: std::env::var("SHOPFLOOR_BATCH_WRITE_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.batch_write_limit),
            fallback_role: std::env::var("SHOPFLOOR_FALLBACK_ROLE")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(default.fallback_role),
        }
    }

    /// Set the batch write limit.
    pub fn with_batch_write_limit(mut self, limit: usize) -> Self {
        self.batch_write_limit = limit;
        self
    }

    /// Set the fallback role.
    pub fn with_fallback_role(mut self, role: impl Into<String>) -> Self {
        self.fallback_role = role.into();
        self
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_write_limit == 0 || self.batch_write_limit > MAX_BATCH_WRITES {
            return Err(ConfigError::InvalidValue {
                key: "SHOPFLOOR_BATCH_WRITE_LIMIT".to_string(),
                message: format!("must be between 1 and {}", MAX_BATCH_WRITES),
            });
        }
        if self.fallback_role.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "SHOPFLOOR_FALLBACK_ROLE".to_string(),
                message: "must not be empty".to_string(),
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
        let config = AccessConfig::default();
        assert_eq!(config.batch_write_limit, 500);
        assert_eq!(config.fallback_role, "personnel");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range_limit() {
        assert!(AccessConfig::default().with_batch_write_limit(0).validate().is_err());
        assert!(AccessConfig::default().with_batch_write_limit(501).validate().is_err());
        assert!(AccessConfig::default().with_batch_write_limit(1).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_fallback() {
        let err = AccessConfig::default()
            .with_fallback_role("  ")
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("SHOPFLOOR_FALLBACK_ROLE"));
    }
}
