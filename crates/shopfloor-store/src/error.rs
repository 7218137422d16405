//! Error types for document store operations.

use thiserror::Error;

/// Document store error types.
///
/// These mirror the ways a remote document database rejects a call:
/// transport problems, quota, security-rule violations and malformed data.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Document does not exist
    #[error("Document not found: {collection}/{id}")]
    NotFound {
        /// Collection name
        collection: String,
        /// Document ID
        id: String,
    },

    /// Write or read rejected by store security rules
    #[error("Rejected by store rules: {0}")]
    RuleViolation(String),

    /// Store quota exhausted
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Store cannot be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Too many operations in one batch
    #[error("Batch limit exceeded: at most {limit} writes per commit")]
    BatchLimitExceeded {
        /// Maximum writes per commit
        limit: usize,
    },

    /// Document data is not a JSON object
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for document store operations.
pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// Shorthand for a missing document.
    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Check if retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::QuotaExceeded(_))
    }

    /// Get error code for logs and API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            StoreError::NotFound { .. } => "NOT_FOUND",
            StoreError::RuleViolation(_) => "PERMISSION_DENIED",
            StoreError::QuotaExceeded(_) => "RESOURCE_EXHAUSTED",
            StoreError::Unavailable(_) => "UNAVAILABLE",
            StoreError::BatchLimitExceeded { .. } => "BATCH_LIMIT_EXCEEDED",
            StoreError::InvalidDocument(_) => "INVALID_ARGUMENT",
            StoreError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
