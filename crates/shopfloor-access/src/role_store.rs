//! Role catalog persistence
//!
//! Role definitions live in the `roles` collection keyed by slug. The four
//! system roles are bootstrapped the first time the catalog is read without
//! them, and can never be deleted.

use serde_json::{json, Map, Value};
use shopfloor_events::PermissionCacheBus;
use shopfloor_org::{system_roles, Principal, RoleDefinition, RoleRemoval, SystemRole};
use shopfloor_rbac::{policy, Resource};
use shopfloor_store::{to_data, DocumentStore};
use std::sync::Arc;

use crate::config::AccessConfig;
use crate::error::{AccessError, AccessResult};
use crate::permission_store::PERMISSIONS_COLLECTION;
use crate::writer::BatchWriter;

/// Collection holding role definitions.
pub const ROLES_COLLECTION: &str = "roles";

/// Collection holding user records (principals).
pub const USERS_COLLECTION: &str = "users";

/// Outcome of a role deletion cascade.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleDeletion {
    /// Deleted role slug
    pub role: String,
    /// Principals whose role set was rewritten
    pub principals_healed: usize,
    /// Principals whose last role was replaced by the fallback role
    pub fallback_injected: usize,
    /// Permission rows removed
    pub permissions_removed: usize,
}

/// Store-backed role catalog.
#[derive(Clone)]
pub struct RoleStore {
    store: Arc<dyn DocumentStore>,
    bus: PermissionCacheBus,
    config: AccessConfig,
}

impl std::fmt::Debug for RoleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleStore")
            .field("config", &self.config)
            .finish()
    }
}

fn catalog_rank(role: &RoleDefinition) -> usize {
    let system = SystemRole::all();
    system
        .iter()
        .position(|s| s.key() == role.key)
        .unwrap_or(system.len())
}

impl RoleStore {
    /// Create a role store with default configuration.
    pub fn new(store: Arc<dyn DocumentStore>, bus: PermissionCacheBus) -> Self {
        Self {
            store,
            bus,
            config: AccessConfig::default(),
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: AccessConfig) -> Self {
        self.config = config;
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    /// All role definitions, bootstrapping the system roles into an empty
    /// catalog (or any system role found missing).
    ///
    /// Never fails: if the catalog cannot be read or bootstrapped, the
    /// hard-coded system roles are returned instead.
    pub async fn get_roles(&self) -> Vec<RoleDefinition> {
        match self.try_get_roles().await {
            Ok(roles) => roles,
            Err(e) => {
                tracing::warn!(error = %e, "Role catalog unavailable, using system roles");
                system_roles()
            }
        }
    }

    /// Same as [`get_roles`](Self::get_roles) but surfaces failures.
    pub async fn try_get_roles(&self) -> AccessResult<Vec<RoleDefinition>> {
        let docs = self.store.list(ROLES_COLLECTION).await?;

        let mut roles: Vec<RoleDefinition> = docs
            .iter()
            .filter_map(|doc| match doc.decode::<RoleDefinition>() {
                Ok(role) => Some(role),
                Err(e) => {
                    tracing::warn!(role = %doc.id, error = %e, "Skipping undecodable role");
                    None
                }
            })
            .collect();

        let missing: Vec<RoleDefinition> = system_roles()
            .into_iter()
            .filter(|system| !docs.iter().any(|doc| doc.id == system.key))
            .collect();
        if !missing.is_empty() {
            self.bootstrap_system_roles(&missing).await?;
            roles.extend(missing);
        }

        roles.sort_by(|a, b| {
            catalog_rank(a)
                .cmp(&catalog_rank(b))
                .then(a.created_at.cmp(&b.created_at))
                .then(a.key.cmp(&b.key))
        });
        Ok(roles)
    }

    async fn bootstrap_system_roles(&self, roles: &[RoleDefinition]) -> AccessResult<()> {
        let mut writer = BatchWriter::new(self.store.as_ref(), self.config.batch_write_limit);
        for role in roles {
            writer.set(ROLES_COLLECTION, &role.key, to_data(role)?).await?;
        }
        writer.finish().await?;

        tracing::info!(count = roles.len(), "Bootstrapped system roles");
        Ok(())
    }

    /// Point lookup of a role.
    ///
    /// # Errors
    ///
    /// `NotFound` if no role has this slug.
    pub async fn get_role(&self, key: &str) -> AccessResult<RoleDefinition> {
        let doc = self
            .store
            .get(ROLES_COLLECTION, key)
            .await?
            .ok_or_else(|| AccessError::NotFound(format!("Role '{}'", key)))?;
        Ok(doc.decode()?)
    }

    /// Create a custom role and seed its permission rows.
    ///
    /// The role gets one read-only row per resource so the resolver never
    /// sees a missing row for it.
    ///
    /// # Errors
    ///
    /// - `InvalidRole` if the label has no usable characters
    /// - `RoleAlreadyExists` if the slug is taken (including system slugs)
    pub async fn add_role(&self, label: &str, color: &str) -> AccessResult<RoleDefinition> {
        let role = RoleDefinition::custom(label.trim(), color);
        if role.key.is_empty() {
            return Err(AccessError::InvalidRole(label.to_string()));
        }
        if SystemRole::parse(&role.key).is_some()
            || self.store.get(ROLES_COLLECTION, &role.key).await?.is_some()
        {
            return Err(AccessError::RoleAlreadyExists(role.key));
        }

        let mut writer = BatchWriter::new(self.store.as_ref(), self.config.batch_write_limit);
        writer
            .set(ROLES_COLLECTION, &role.key, to_data(&role)?)
            .await?;
        for resource in Resource::all() {
            let row = policy::custom_role_permission(&role.key, resource);
            writer
                .set(PERMISSIONS_COLLECTION, &row.id(), to_data(&row)?)
                .await?;
        }
        let (written, _) = writer.finish().await?;

        tracing::info!(role = %role.key, label = %role.label, writes = written, "Role added");
        self.bus.publish();
        Ok(role)
    }

    /// Delete a custom role, cascading to principals and permission rows.
    ///
    /// Principals holding the role are healed first (in capped batches),
    /// then the permission rows and finally the role definition are removed.
    /// The cascade is not atomic but safe to retry: the definition is the
    /// last thing deleted, and healing an already-healed principal is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// - `SystemRoleProtected` for system roles (nothing is written)
    /// - `NotFound` if the role does not exist
    pub async fn delete_role(&self, key: &str) -> AccessResult<RoleDeletion> {
        let existing = self.store.get(ROLES_COLLECTION, key).await?;
        let is_system = SystemRole::parse(key).is_some()
            || existing
                .as_ref()
                .and_then(|doc| doc.field("is_system"))
                .and_then(Value::as_bool)
                .unwrap_or(false);
        if is_system {
            tracing::warn!(role = %key, "Refusing to delete system role");
            return Err(AccessError::SystemRoleProtected(key.to_string()));
        }
        if existing.is_none() {
            return Err(AccessError::NotFound(format!("Role '{}'", key)));
        }

        let fallback = self.config.fallback_role.as_str();
        let mut report = RoleDeletion {
            role: key.to_string(),
            ..RoleDeletion::default()
        };

        // Heal principals
        let holders = self
            .store
            .query_array_contains(USERS_COLLECTION, "roles", &json!(key))
            .await?;
        let mut writer = BatchWriter::new(self.store.as_ref(), self.config.batch_write_limit);
        for doc in holders {
            let roles: Vec<String> = match doc.field("roles").cloned().map(serde_json::from_value) {
                Some(Ok(roles)) => roles,
                Some(Err(e)) => {
                    tracing::warn!(user = %doc.id, error = %e, "Skipping user with malformed roles");
                    continue;
                }
                None => Vec::new(),
            };
            let mut principal = Principal::new(doc.id.clone(), roles);
            match principal.remove_role(key, fallback) {
                RoleRemoval::Unchanged => continue,
                RoleRemoval::FallbackInjected => report.fallback_injected += 1,
                RoleRemoval::Removed => {}
            }

            let mut fields = Map::new();
            fields.insert("roles".to_string(), json!(principal.roles));
            writer.update(USERS_COLLECTION, &doc.id, fields).await?;
            report.principals_healed += 1;
        }
        writer.finish().await?;

        // Permission rows, then the definition itself
        let rows = self
            .store
            .query_eq(PERMISSIONS_COLLECTION, "role", &json!(key))
            .await?;
        let mut writer = BatchWriter::new(self.store.as_ref(), self.config.batch_write_limit);
        for row in &rows {
            writer.delete(PERMISSIONS_COLLECTION, &row.id).await?;
        }
        writer.delete(ROLES_COLLECTION, key).await?;
        writer.finish().await?;
        report.permissions_removed = rows.len();

        tracing::info!(
            role = %key,
            principals_healed = report.principals_healed,
            permissions_removed = report.permissions_removed,
            "Role deleted"
        );
        self.bus.publish();
        Ok(report)
    }
}
