//! Audit trail configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
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

/// Audit trail settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Debounce delay before a queued batch is flushed, in milliseconds.
    pub flush_delay_ms: u64,

    /// Changed-field labels listed in an update summary before collapsing
    /// the rest into "and N more".
    pub summary_max_fields: usize,

    /// Collection receiving audit entries.
    pub collection: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            flush_delay_ms: 1000,
            summary_max_fields: 3,
            collection: "audit_logs".to_string(),
        }
    }
}

impl AuditConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `SHOPFLOOR_AUDIT_FLUSH_DELAY_MS`: Debounce delay (default: 1000)
    /// - `SHOPFLOOR_AUDIT_SUMMARY_MAX_FIELDS`: Labels per summary (default: 3)
    /// - `SHOPFLOOR_AUDIT_COLLECTION`: Target collection (default: audit_logs)
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            flush_delay_ms: std::env::var("SHOPFLOOR_AUDIT_FLUSH_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.flush_delay_ms),
            summary_max_fields: std::env::var("SHOPFLOOR_AUDIT_SUMMARY_MAX_FIELDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.summary_max_fields),
            collection: std::env::var("SHOPFLOOR_AUDIT_COLLECTION")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(default.collection),
        }
    }

    /// Set the debounce delay.
    pub fn with_flush_delay(mut self, delay: Duration) -> Self {
        self.flush_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the collection.
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// Get the debounce delay as a Duration.
    pub fn flush_delay(&self) -> Duration {
        Duration::from_millis(self.flush_delay_ms)
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.summary_max_fields == 0 {
            return Err(ConfigError::InvalidValue {
                key: "SHOPFLOOR_AUDIT_SUMMARY_MAX_FIELDS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.collection.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "SHOPFLOOR_AUDIT_COLLECTION".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
