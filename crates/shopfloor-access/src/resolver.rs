//! Permission resolution against stored rows.
//!
//! Every call re-reads the store: one lookup per role, stopping at the first
//! grant. Nothing is cached, so a decision always reflects the latest row the
//! store returns.

use async_trait::async_trait;
use shopfloor_org::Principal;
use shopfloor_rbac::{resolve, Action, Capability, Permission, Resource, FALLBACK_ROLE};
use std::sync::Arc;

use crate::error::AccessResult;
use crate::permission_store::PermissionStore;

/// Source of permission rows for the resolver.
#[async_trait]
pub trait PermissionLookup: Send + Sync {
    /// The row for a (role, resource) pair, if one exists.
    async fn lookup(&self, role: &str, resource: Resource) -> AccessResult<Option<Permission>>;
}

#[async_trait]
impl PermissionLookup for PermissionStore {
    async fn lookup(&self, role: &str, resource: Resource) -> AccessResult<Option<Permission>> {
        self.get_permission(role, resource).await
    }
}

/// Decides whether a principal may perform an operation.
///
/// The effective permission is the union over the principal's roles. The
/// highest-privilege role is granted everything without a lookup.
#[derive(Clone)]
pub struct PermissionResolver {
    lookup: Arc<dyn PermissionLookup>,
    fallback_role: String,
}

impl std::fmt::Debug for PermissionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionResolver")
            .field("fallback_role", &self.fallback_role)
            .finish()
    }
}

impl PermissionResolver {
    /// Create a resolver over a row source.
    pub fn new(lookup: Arc<dyn PermissionLookup>) -> Self {
        Self {
            lookup,
            fallback_role: FALLBACK_ROLE.to_string(),
        }
    }

    /// Role used when a principal's role set is empty.
    pub fn with_fallback_role(mut self, role: impl Into<String>) -> Self {
        self.fallback_role = role.into();
        self
    }

    /// Check whether `principal` holds `capability` on `resource`.
    ///
    /// A missing row, or a lookup that fails, counts as "no grant from that
    /// role" and the next role is tried.
    pub async fn can(&self, principal: &Principal, resource: Resource, capability: &Capability) -> bool {
        if principal.is_highest() {
            return true;
        }

        for role in principal.effective_roles(&self.fallback_role) {
            match self.lookup.lookup(role, resource).await {
                Ok(row) => {
                    if resolve::grants(row.as_ref(), capability) {
                        return true;
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        principal = %principal.id,
                        role,
                        resource = %resource,
                        error = %e,
                        "Permission lookup failed, treating as no grant"
                    );
                }
            }
        }

        tracing::debug!(
            principal = %principal.id,
            resource = %resource,
            capability = %capability,
            "Permission not granted"
        );
        false
    }

    /// May create records of `resource`.
    pub async fn can_create(&self, principal: &Principal, resource: Resource) -> bool {
        self.can(principal, resource, &Capability::from(Action::Create)).await
    }

    /// May view records of `resource`.
    pub async fn can_read(&self, principal: &Principal, resource: Resource) -> bool {
        self.can(principal, resource, &Capability::from(Action::Read)).await
    }

    /// May modify records of `resource`.
    pub async fn can_update(&self, principal: &Principal, resource: Resource) -> bool {
        self.can(principal, resource, &Capability::from(Action::Update)).await
    }

    /// May remove records of `resource`.
    pub async fn can_delete(&self, principal: &Principal, resource: Resource) -> bool {
        self.can(principal, resource, &Capability::from(Action::Delete)).await
    }

    /// May perform the resource-specific capability `sub_key`.
    pub async fn can_perform_sub_permission(
        &self,
        principal: &Principal,
        resource: Resource,
        sub_key: &str,
    ) -> bool {
        self.can(principal, resource, &Capability::sub(sub_key)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AccessError;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fixed rows; roles named `broken*` fail their lookup.
    #[derive(Default)]
    struct FixedRows {
        rows: HashMap<(String, Resource), Permission>,
        lookups: AtomicUsize,
    }

    impl FixedRows {
        fn with(mut self, row: Permission) -> Self {
            self.rows.insert((row.role.clone(), row.resource), row);
            self
        }
    }

    #[async_trait]
    impl PermissionLookup for FixedRows {
        async fn lookup(&self, role: &str, resource: Resource) -> AccessResult<Option<Permission>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            if role.starts_with("broken") {
                return Err(AccessError::Persistence {
                    code: "UNAVAILABLE",
                    message: "offline".into(),
                });
            }
            Ok(self.rows.get(&(role.to_string(), resource)).cloned())
        }
    }

    fn row(role: &str, resource: Resource, delete: bool) -> Permission {
        let mut perm = Permission::new(role, resource);
        perm.can_read = true;
        perm.can_delete = delete;
        perm
    }

    #[tokio::test]
    async fn test_union_across_roles() {
        let rows = FixedRows::default()
            .with(row("clerk", Resource::Orders, false))
            .with(row("auditor", Resource::Orders, true));
        let resolver = PermissionResolver::new(Arc::new(rows));

        let both = Principal::new("u-1", ["clerk", "auditor"]);
        assert!(resolver.can_delete(&both, Resource::Orders).await);

        let clerk = Principal::new("u-2", ["clerk"]);
        assert!(!resolver.can_delete(&clerk, Resource::Orders).await);
        assert!(resolver.can_read(&clerk, Resource::Orders).await);
    }

    #[tokio::test]
    async fn test_highest_role_skips_lookups() {
        let rows = Arc::new(FixedRows::default());
        let resolver = PermissionResolver::new(rows.clone());
        let boss = Principal::new("u-1", ["super_admin"]);

        for resource in Resource::all() {
            assert!(resolver.can_delete(&boss, resource).await);
            assert!(resolver.can_perform_sub_permission(&boss, resource, "anything").await);
        }
        assert_eq!(rows.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_row_and_failed_lookup_do_not_stop_iteration() {
        let rows = FixedRows::default().with(row("auditor", Resource::Orders, true));
        let resolver = PermissionResolver::new(Arc::new(rows));

        let principal = Principal::new("u-1", ["ghost", "broken_role", "auditor"]);
        assert!(resolver.can_delete(&principal, Resource::Orders).await);

        let unlucky = Principal::new("u-2", ["broken_role"]);
        assert!(!resolver.can_read(&unlucky, Resource::Orders).await);
    }

    #[tokio::test]
    async fn test_empty_role_set_resolves_as_fallback() {
        let rows = FixedRows::default().with(row("personnel", Resource::Tasks, false));
        let resolver = PermissionResolver::new(Arc::new(rows));

        let orphan = Principal::new("u-1", Vec::<String>::new());
        assert!(resolver.can_read(&orphan, Resource::Tasks).await);
        assert!(!resolver.can_read(&orphan, Resource::Orders).await);
    }

    #[tokio::test]
    async fn test_sub_permission_union() {
        let mut approver = Permission::new("approver", Resource::Orders);
        approver.sub_permissions.insert("approve".into(), true);
        let mut clerk = Permission::new("clerk", Resource::Orders);
        clerk.sub_permissions.insert("approve".into(), false);

        let resolver = PermissionResolver::new(Arc::new(
            FixedRows::default().with(clerk).with(approver),
        ));
        let principal = Principal::new("u-1", ["clerk", "approver"]);

        assert!(resolver.can_perform_sub_permission(&principal, Resource::Orders, "approve").await);
        assert!(!resolver.can_perform_sub_permission(&principal, Resource::Orders, "export").await);
    }
}
