//! Error types for audit delivery.
//!
//! These never reach the code that called [`crate::AuditTrail::record`];
//! they are logged by the flush task.

use shopfloor_store::StoreError;
use thiserror::Error;

/// Audit delivery error types.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuditError {
    /// Persisting the entry failed
    #[error("Failed to persist audit entry: {0}")]
    Store(#[from] StoreError),

    /// Entry could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for audit delivery.
pub type AuditResult<T> = Result<T, AuditError>;

impl From<serde_json::Error> for AuditError {
    fn from(err: serde_json::Error) -> Self {
        AuditError::Serialization(err.to_string())
    }
}
