//! Error types for access-control operations
//!
//! Raw store failures are logged and replaced by a human-readable message
//! before they reach the caller.

use shopfloor_rbac::{Capability, Resource};
use shopfloor_store::StoreError;
use thiserror::Error;

/// Access-control error types.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccessError {
    /// The principal lacks the capability
    #[error("Permission denied: {capability} on {resource}")]
    PermissionDenied {
        /// Resource being accessed
        resource: Resource,
        /// Requested capability
        capability: Capability,
    },

    /// Role or permission row does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Attempt to delete a system role
    #[error("System role '{0}' cannot be deleted")]
    SystemRoleProtected(String),

    /// A role with the same slug exists
    #[error("Role '{0}' already exists")]
    RoleAlreadyExists(String),

    /// Role label produces no usable slug
    #[error("Invalid role: {0}")]
    InvalidRole(String),

    /// Underlying store call failed
    #[error("{message}")]
    Persistence {
        /// Store error code
        code: &'static str,
        /// Translated message
        message: String,
    },
}

/// Result type for access-control operations.
pub type AccessResult<T> = Result<T, AccessError>;

impl AccessError {
    /// Check if retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AccessError::Persistence {
                code: "UNAVAILABLE" | "RESOURCE_EXHAUSTED",
                ..
            }
        )
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            AccessError::PermissionDenied { .. } => "PERMISSION_DENIED",
            AccessError::NotFound(_) => "NOT_FOUND",
            AccessError::SystemRoleProtected(_) => "SYSTEM_ROLE_PROTECTED",
            AccessError::RoleAlreadyExists(_) => "ROLE_ALREADY_EXISTS",
            AccessError::InvalidRole(_) => "INVALID_ROLE",
            AccessError::Persistence { .. } => "PERSISTENCE_FAILURE",
        }
    }

    /// Message suitable for showing to an end user.
    pub fn user_message(&self) -> String {
        match self {
            AccessError::PermissionDenied { resource, capability } => format!(
                "You do not have permission to {} this {}.",
                describe(capability),
                resource.display_name().to_lowercase()
            ),
            AccessError::NotFound(what) => format!("{} could not be found.", what),
            AccessError::SystemRoleProtected(role) => {
                format!("'{}' is a system role and cannot be deleted.", role)
            }
            AccessError::RoleAlreadyExists(role) => {
                format!("A role named '{}' already exists.", role)
            }
            AccessError::InvalidRole(_) => "Please enter a role name.".to_string(),
            AccessError::Persistence { message, .. } => message.clone(),
        }
    }
}

fn describe(capability: &Capability) -> String {
    match capability {
        Capability::Action(action) => action.as_str().to_string(),
        Capability::Sub(key) => key.replace('_', " "),
    }
}

fn translate(err: &StoreError) -> &'static str {
    match err {
        StoreError::NotFound { .. } => "The requested record no longer exists.",
        StoreError::RuleViolation(_) => "You are not allowed to change this data.",
        StoreError::QuotaExceeded(_) => "The service is busy. Please try again in a moment.",
        StoreError::Unavailable(_) => "Unable to reach the server. Check your connection and try again.",
        StoreError::BatchLimitExceeded { .. } => "Too many changes at once. Please try again.",
        StoreError::InvalidDocument(_) | StoreError::Serialization(_) => {
            "Stored data could not be read."
        }
    }
}

impl From<StoreError> for AccessError {
    fn from(err: StoreError) -> Self {
        if let StoreError::NotFound { collection, id } = &err {
            return AccessError::NotFound(format!("{}/{}", collection, id));
        }
        tracing::error!(code = err.error_code(), error = %err, "Store call failed");
        AccessError::Persistence {
            code: err.error_code(),
            message: translate(&err).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopfloor_rbac::Action;

    #[test]
    fn test_store_error_is_translated() {
        let err = AccessError::from(StoreError::Unavailable("grpc: deadline exceeded".into()));
        assert_eq!(err.error_code(), "PERSISTENCE_FAILURE");
        assert!(err.is_retryable());
        assert!(!err.to_string().contains("grpc"));
        assert_eq!(err.user_message(), err.to_string());
    }

    #[test]
    fn test_store_not_found_maps_to_not_found() {
        let err = AccessError::from(StoreError::not_found("role_permissions", "x__tasks"));
        assert_eq!(err, AccessError::NotFound("role_permissions/x__tasks".into()));
    }

    #[test]
    fn test_user_messages() {
        let denied = AccessError::PermissionDenied {
            resource: Resource::Orders,
            capability: Capability::from(Action::Delete),
        };
        assert_eq!(denied.user_message(), "You do not have permission to delete this order.");

        let sub = AccessError::PermissionDenied {
            resource: Resource::Orders,
            capability: Capability::sub("view_financials"),
        };
        assert!(sub.user_message().contains("view financials"));

        assert_eq!(
            AccessError::SystemRoleProtected("admin".into()).error_code(),
            "SYSTEM_ROLE_PROTECTED"
        );
    }
}
