//! Permission table persistence
//!
//! One row per (role, resource) pair in the `role_permissions` collection,
//! keyed `{role}__{resource}`. The listing path self-heals: it bootstraps
//! missing rows and reconciles outdated ones before returning. Point lookups
//! never heal.

use chrono::Utc;
use serde_json::json;
use shopfloor_events::PermissionCacheBus;
use shopfloor_rbac::{policy, Permission, PermissionUpdate, Resource};
use shopfloor_store::{to_data, to_fields, DocumentStore};
use std::sync::Arc;

use crate::error::{AccessError, AccessResult};
use crate::role_store::RoleStore;
use crate::writer::BatchWriter;

/// Collection holding permission rows.
pub const PERMISSIONS_COLLECTION: &str = "role_permissions";

/// Store-backed permission table.
#[derive(Clone)]
pub struct PermissionStore {
    store: Arc<dyn DocumentStore>,
    roles: RoleStore,
    bus: PermissionCacheBus,
}

impl std::fmt::Debug for PermissionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionStore")
            .field("roles", &self.roles)
            .finish()
    }
}

impl PermissionStore {
    /// Create a permission store over the same document store as `roles`.
    pub fn new(store: Arc<dyn DocumentStore>, roles: RoleStore, bus: PermissionCacheBus) -> Self {
        Self { store, roles, bus }
    }

    /// Sub-permission vocabulary of a resource.
    pub fn get_sub_permission_keys(resource: Resource) -> &'static [&'static str] {
        resource.sub_permission_keys()
    }

    async fn stored_rows(&self) -> AccessResult<Vec<Permission>> {
        let docs = self.store.list(PERMISSIONS_COLLECTION).await?;
        Ok(docs
            .iter()
            .filter_map(|doc| match doc.decode::<Permission>() {
                Ok(row) => Some(row),
                Err(e) => {
                    tracing::warn!(id = %doc.id, error = %e, "Skipping undecodable permission row");
                    None
                }
            })
            .collect())
    }

    /// Create a row for every (role, resource) pair that has none, using the
    /// role's tier defaults.
    ///
    /// # Returns
    ///
    /// Number of rows written (zero once the table is complete)
    pub async fn bootstrap_missing_permissions(&self) -> AccessResult<usize> {
        let roles = self.roles.try_get_roles().await?;
        let existing = self.stored_rows().await?;
        let missing = policy::plan_missing(
            roles.iter().map(|r| r.key.as_str()),
            &existing,
            &Resource::all(),
        );

        if missing.is_empty() {
            tracing::debug!(rows = existing.len(), "Permission table complete");
            return Ok(0);
        }

        let mut writer = BatchWriter::new(self.store.as_ref(), self.roles.config().batch_write_limit);
        for row in &missing {
            writer
                .set(PERMISSIONS_COLLECTION, &row.id(), to_data(row)?)
                .await?;
        }
        let (written, commits) = writer.finish().await?;

        tracing::debug!(written, commits, "Bootstrapped missing permission rows");
        self.bus.publish();
        Ok(written)
    }

    /// Patch existing rows: add sub-permission keys missing from their map
    /// and correct drifted team-lead flags.
    ///
    /// # Returns
    ///
    /// Number of rows patched (zero once reconciled)
    pub async fn reconcile_sub_permissions(&self) -> AccessResult<usize> {
        let existing = self.stored_rows().await?;
        let patches = policy::plan_patches(&existing);

        if patches.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let mut writer = BatchWriter::new(self.store.as_ref(), self.roles.config().batch_write_limit);
        for patch in &patches {
            let mut fields = to_fields(&patch.update)?;
            fields.insert("updated_at".to_string(), json!(now));
            writer
                .update(PERMISSIONS_COLLECTION, &patch.id, fields)
                .await?;
        }
        let (written, _) = writer.finish().await?;

        tracing::debug!(patched = written, "Reconciled permission rows");
        self.bus.publish();
        Ok(written)
    }

    /// Every permission row, after bootstrapping and reconciling.
    pub async fn list_permissions(&self) -> AccessResult<Vec<Permission>> {
        self.bootstrap_missing_permissions().await?;
        self.reconcile_sub_permissions().await?;
        self.stored_rows().await
    }

    /// Rows stored for one role. Does not self-heal.
    pub async fn permissions_for_role(&self, role: &str) -> AccessResult<Vec<Permission>> {
        let docs = self
            .store
            .query_eq(PERMISSIONS_COLLECTION, "role", &json!(role))
            .await?;
        let mut rows = docs
            .iter()
            .map(|doc| doc.decode::<Permission>())
            .collect::<Result<Vec<_>, _>>()?;
        rows.sort_by_key(|row| row.resource);
        Ok(rows)
    }

    /// Point lookup. `None` if the pair has not been bootstrapped yet.
    pub async fn get_permission(&self, role: &str, resource: Resource) -> AccessResult<Option<Permission>> {
        let id = Permission::document_id(role, resource);
        match self.store.get(PERMISSIONS_COLLECTION, &id).await? {
            Some(doc) => Ok(Some(doc.decode()?)),
            None => Ok(None),
        }
    }

    /// Apply an administrative edit to a row.
    ///
    /// Unset fields in `update` are left untouched; `updated_at` is stamped.
    ///
    /// # Errors
    ///
    /// `NotFound` if no row has this ID.
    pub async fn update_permission(&self, id: &str, update: &PermissionUpdate) -> AccessResult<()> {
        let mut fields = to_fields(update)?;
        fields.insert("updated_at".to_string(), json!(Utc::now()));

        self.store
            .update(PERMISSIONS_COLLECTION, id, fields)
            .await
            .map_err(|e| match AccessError::from(e) {
                AccessError::NotFound(_) => AccessError::NotFound(format!("Permission '{}'", id)),
                other => other,
            })?;

        tracing::info!(id = %id, "Permission updated");
        self.bus.publish();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopfloor_store::MemoryDocumentStore;

    fn stores() -> (Arc<MemoryDocumentStore>, PermissionStore, PermissionCacheBus) {
        let memory = Arc::new(MemoryDocumentStore::new());
        let bus = PermissionCacheBus::new();
        let roles = RoleStore::new(memory.clone(), bus.clone());
        let perms = PermissionStore::new(memory.clone(), roles, bus.clone());
        (memory, perms, bus)
    }

    #[tokio::test]
    async fn test_bootstrap_fills_every_pair_once() {
        let (memory, perms, _) = stores();

        let written = perms.bootstrap_missing_permissions().await.unwrap();
        assert_eq!(written, 4 * Resource::all().len());

        let writes = memory.write_count();
        assert_eq!(perms.bootstrap_missing_permissions().await.unwrap(), 0);
        assert_eq!(memory.write_count(), writes);
    }

    #[tokio::test]
    async fn test_list_permissions_heals_custom_role() {
        let (memory, perms, _) = stores();
        perms.roles.add_role("Auditor", "#111").await.unwrap();

        let rows = perms.list_permissions().await.unwrap();
        assert_eq!(rows.len(), 5 * Resource::all().len());

        // Seeded custom rows gained explicit false keys
        let orders = perms.get_permission("auditor", Resource::Orders).await.unwrap().unwrap();
        assert_eq!(orders.sub_permissions.get("approve"), Some(&false));
        assert!(orders.can_read && !orders.can_update);

        let writes = memory.write_count();
        perms.list_permissions().await.unwrap();
        assert_eq!(memory.write_count(), writes);
    }

    #[tokio::test]
    async fn test_reconcile_restores_team_lead_policy() {
        let (memory, perms, _) = stores();
        perms.bootstrap_missing_permissions().await.unwrap();

        let id = Permission::document_id("team_lead", Resource::AuditLogs);
        perms
            .update_permission(&id, &PermissionUpdate::new().can_delete(true))
            .await
            .unwrap();
        memory
            .update(
                PERMISSIONS_COLLECTION,
                &Permission::document_id("team_lead", Resource::Orders),
                to_fields(&json!({ "sub_permissions": { "approve": true } })).unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(perms.reconcile_sub_permissions().await.unwrap(), 2);

        let audit = perms.get_permission("team_lead", Resource::AuditLogs).await.unwrap().unwrap();
        assert!(!audit.can_delete);
        let orders = perms.get_permission("team_lead", Resource::Orders).await.unwrap().unwrap();
        assert_eq!(orders.sub_permissions.len(), Resource::Orders.sub_permission_keys().len());

        assert_eq!(perms.reconcile_sub_permissions().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_permission_strips_unset_fields() {
        let (_, perms, bus) = stores();
        perms.bootstrap_missing_permissions().await.unwrap();
        let before = perms.get_permission("personnel", Resource::Orders).await.unwrap().unwrap();
        let generation = bus.generation();

        perms
            .update_permission(&before.id(), &PermissionUpdate::new().can_update(true))
            .await
            .unwrap();

        let after = perms.get_permission("personnel", Resource::Orders).await.unwrap().unwrap();
        assert!(after.can_update);
        assert_eq!(after.can_read, before.can_read);
        assert_eq!(after.sub_permissions, before.sub_permissions);
        assert!(after.updated_at >= before.updated_at);
        assert_eq!(bus.generation(), generation + 1);
    }

    #[tokio::test]
    async fn test_update_unknown_permission() {
        let (_, perms, _) = stores();
        let err = perms
            .update_permission("ghost__orders", &PermissionUpdate::new().can_read(true))
            .await
            .unwrap_err();
        assert_eq!(err, AccessError::NotFound("Permission 'ghost__orders'".into()));
    }

    #[tokio::test]
    async fn test_point_lookup_does_not_heal() {
        let (memory, perms, _) = stores();
        assert!(perms.get_permission("admin", Resource::Tasks).await.unwrap().is_none());
        assert_eq!(memory.write_count(), 0);
    }

    #[tokio::test]
    async fn test_permissions_for_role() {
        let (_, perms, _) = stores();
        perms.bootstrap_missing_permissions().await.unwrap();

        let rows = perms.permissions_for_role("personnel").await.unwrap();
        assert_eq!(rows.len(), Resource::all().len());
        assert!(rows.iter().all(|r| r.role == "personnel"));
        assert!(rows.iter().all(|r| !r.can_delete));
    }

    #[test]
    fn test_sub_permission_vocabulary() {
        assert!(PermissionStore::get_sub_permission_keys(Resource::Orders).contains(&"approve"));
        assert!(PermissionStore::get_sub_permission_keys(Resource::Departments).is_empty());
    }
}
