//! Guard for business operations.
//!
//! Business services call [`PermissionGate::require`] before mutating. A
//! denial is returned as an error and surfaced to the user through a
//! [`Notifier`].

use async_trait::async_trait;
use shopfloor_org::Principal;
use shopfloor_rbac::{Capability, Resource};
use std::sync::Arc;

use crate::error::{AccessError, AccessResult};
use crate::resolver::PermissionResolver;

/// User-facing notification channel for denied operations.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Tell the user their operation was rejected.
    async fn permission_denied(&self, principal: &Principal, error: &AccessError);
}

/// Notifier that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn permission_denied(&self, principal: &Principal, error: &AccessError) {
        tracing::info!(
            principal = %principal.id,
            code = error.error_code(),
            message = %error.user_message(),
            "Operation rejected"
        );
    }
}

/// Resolver plus notification.
///
/// # Example
///
/// ```rust,no_run
/// use shopfloor_access::{AccessResult, PermissionGate};
/// use shopfloor_org::Principal;
/// use shopfloor_rbac::{Action, Capability, Resource};
///
/// async fn cancel_order(gate: &PermissionGate, user: &Principal) -> AccessResult<()> {
///     gate.require(user, Resource::Orders, Capability::sub("cancel")).await?;
///     // ... perform the cancellation, then record it in the audit trail
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct PermissionGate {
    resolver: PermissionResolver,
    notifier: Arc<dyn Notifier>,
}

impl std::fmt::Debug for PermissionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionGate")
            .field("resolver", &self.resolver)
            .finish()
    }
}

impl PermissionGate {
    /// Create a gate that logs denials.
    pub fn new(resolver: PermissionResolver) -> Self {
        Self {
            resolver,
            notifier: Arc::new(TracingNotifier),
        }
    }

    /// Replace the notifier.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// The underlying resolver.
    pub fn resolver(&self) -> &PermissionResolver {
        &self.resolver
    }

    /// Succeed if `principal` holds `capability` on `resource`.
    ///
    /// # Errors
    ///
    /// `PermissionDenied` otherwise; the notifier has been told.
    pub async fn require(
        &self,
        principal: &Principal,
        resource: Resource,
        capability: Capability,
    ) -> AccessResult<()> {
        if self.resolver.can(principal, resource, &capability).await {
            return Ok(());
        }

        let error = AccessError::PermissionDenied { resource, capability };
        self.notifier.permission_denied(principal, &error).await;
        Err(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::PermissionLookup;
    use shopfloor_rbac::{Action, Permission};
    use std::sync::Mutex;

    struct ReadOnly;

    #[async_trait]
    impl PermissionLookup for ReadOnly {
        async fn lookup(&self, role: &str, resource: Resource) -> AccessResult<Option<Permission>> {
            let mut perm = Permission::new(role, resource);
            perm.can_read = true;
            Ok(Some(perm))
        }
    }

    #[derive(Default)]
    struct Recorder {
        messages: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Notifier for Recorder {
        async fn permission_denied(&self, _principal: &Principal, error: &AccessError) {
            self.messages.lock().unwrap().push(error.user_message());
        }
    }

    #[tokio::test]
    async fn test_require_notifies_on_denial() {
        let recorder = Arc::new(Recorder::default());
        let gate = PermissionGate::new(PermissionResolver::new(Arc::new(ReadOnly)))
            .with_notifier(recorder.clone());
        let user = Principal::new("u-1", ["clerk"]);

        assert!(gate.require(&user, Resource::Orders, Action::Read.into()).await.is_ok());

        let err = gate
            .require(&user, Resource::Orders, Action::Delete.into())
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "PERMISSION_DENIED");

        let messages = recorder.messages.lock().unwrap();
        assert_eq!(messages.as_slice(), ["You do not have permission to delete this order."]);
    }
}
