//! # Shopfloor Access Control
//!
//! Store-backed role catalog, permission table and permission resolution for
//! the Shopfloor business application.
//!
//! ## Overview
//!
//! The shopfloor-access crate handles:
//! - **RoleStore**: Role catalog with bootstrapped, undeletable system roles
//!   and a cascading delete that heals principals
//! - **PermissionStore**: One row per (role, resource), self-healed on every
//!   listing read
//! - **PermissionResolver**: Union-across-roles decisions, re-read on every call
//! - **PermissionGate**: Guard for business operations with user notification
//!
//! Every mutation of roles or permission rows publishes on the shared
//! [`PermissionCacheBus`] so open views can refresh.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use shopfloor_access::{AccessConfig, AccessControl};
//! use shopfloor_org::Principal;
//! use shopfloor_rbac::Resource;
//! use shopfloor_store::MemoryDocumentStore;
//! use std::sync::Arc;
//!
//! async fn example() -> shopfloor_access::AccessResult<()> {
//!     let access = AccessControl::new(Arc::new(MemoryDocumentStore::new()), AccessConfig::from_env());
//!
//!     access.roles().add_role("QA Reviewer", "#0ea5e9").await?;
//!     access.permissions().list_permissions().await?;
//!
//!     let user = Principal::new("u-1", ["qa_reviewer"]);
//!     assert!(access.resolver().can_read(&user, Resource::Tasks).await);
//!     assert!(!access.resolver().can_delete(&user, Resource::Tasks).await);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod gate;
pub mod permission_store;
pub mod resolver;
pub mod role_store;
mod writer;

use shopfloor_events::PermissionCacheBus;
use shopfloor_store::DocumentStore;
use std::sync::Arc;

// Re-export main types for convenience
pub use config::{AccessConfig, ConfigError};
pub use error::{AccessError, AccessResult};
pub use gate::{Notifier, PermissionGate, TracingNotifier};
pub use permission_store::{PermissionStore, PERMISSIONS_COLLECTION};
pub use resolver::{PermissionLookup, PermissionResolver};
pub use role_store::{RoleDeletion, RoleStore, ROLES_COLLECTION, USERS_COLLECTION};

/// The access-control services wired over one document store and one bus.
#[derive(Debug, Clone)]
pub struct AccessControl {
    bus: PermissionCacheBus,
    roles: RoleStore,
    permissions: PermissionStore,
    resolver: PermissionResolver,
}

impl AccessControl {
    /// Wire the services with a fresh bus.
    pub fn new(store: Arc<dyn DocumentStore>, config: AccessConfig) -> Self {
        Self::with_bus(store, config, PermissionCacheBus::new())
    }

    /// Wire the services publishing on an existing bus.
    pub fn with_bus(store: Arc<dyn DocumentStore>, config: AccessConfig, bus: PermissionCacheBus) -> Self {
        let fallback = config.fallback_role.clone();
        let roles = RoleStore::new(store.clone(), bus.clone()).with_config(config);
        let permissions = PermissionStore::new(store, roles.clone(), bus.clone());
        let resolver =
            PermissionResolver::new(Arc::new(permissions.clone())).with_fallback_role(fallback);
        Self {
            bus,
            roles,
            permissions,
            resolver,
        }
    }

    /// Role catalog.
    pub fn roles(&self) -> &RoleStore {
        &self.roles
    }

    /// Permission table.
    pub fn permissions(&self) -> &PermissionStore {
        &self.permissions
    }

    /// Resolver over the permission table.
    pub fn resolver(&self) -> &PermissionResolver {
        &self.resolver
    }

    /// Gate over the resolver, logging denials.
    pub fn gate(&self) -> PermissionGate {
        PermissionGate::new(self.resolver.clone())
    }

    /// Invalidation bus.
    pub fn bus(&self) -> &PermissionCacheBus {
        &self.bus
    }

    /// Register a callback for permission changes.
    pub fn on_permission_cache_change<F>(&self, callback: F) -> shopfloor_events::SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.bus.on_permission_cache_change(callback)
    }

    /// Tell every subscriber to re-read permissions.
    pub fn clear_permission_cache(&self) {
        self.bus.clear_permission_cache();
    }
}
