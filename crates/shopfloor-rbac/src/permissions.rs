//! # Permissions
//!
//! A permission row authorizes one role on one resource: four coarse CRUD
//! flags plus a sparse map of resource-specific sub-permissions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::actions::{Action, Capability};
use crate::resources::Resource;

/// Authorization record for a (role, resource) pair.
///
/// Once bootstrapped, exactly one row exists per pair. Rows are keyed in the
/// store by [`Permission::document_id`].
///
/// # Example
///
/// ```
/// use shopfloor_rbac::{Action, Capability, Permission, Resource};
///
/// let mut perm = Permission::new("qa_reviewer", Resource::Tasks);
/// perm.can_read = true;
///
/// assert!(perm.allows(&Capability::from(Action::Read)));
/// assert!(!perm.allows(&Capability::from(Action::Delete)));
/// assert_eq!(perm.id(), "qa_reviewer__tasks");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Permission {
    /// Role slug this row belongs to.
    pub role: String,
    /// Resource this row authorizes.
    pub resource: Resource,
    /// May create records.
    #[serde(default)]
    pub can_create: bool,
    /// May view records.
    #[serde(default)]
    pub can_read: bool,
    /// May modify records.
    #[serde(default)]
    pub can_update: bool,
    /// May remove records.
    #[serde(default)]
    pub can_delete: bool,
    /// Sparse sub-permission map; a missing key means "not granted".
    #[serde(default)]
    pub sub_permissions: BTreeMap<String, bool>,
    /// When the row was first written.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// When the row was last modified.
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Permission {
    /// Create a row that grants nothing.
    pub fn new(role: impl Into<String>, resource: Resource) -> Self {
        let now = Utc::now();
        Self {
            role: role.into(),
            resource,
            can_create: false,
            can_read: false,
            can_update: false,
            can_delete: false,
            sub_permissions: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Store key for a (role, resource) pair.
    pub fn document_id(role: &str, resource: Resource) -> String {
        format!("{}__{}", role, resource.as_str())
    }

    /// Store key of this row.
    pub fn id(&self) -> String {
        Self::document_id(&self.role, self.resource)
    }

    /// Read one coarse flag.
    pub fn flag(&self, action: Action) -> bool {
        match action {
            Action::Create => self.can_create,
            Action::Read => self.can_read,
            Action::Update => self.can_update,
            Action::Delete => self.can_delete,
        }
    }

    /// Set one coarse flag.
    pub fn set_flag(&mut self, action: Action, value: bool) {
        match action {
            Action::Create => self.can_create = value,
            Action::Read => self.can_read = value,
            Action::Update => self.can_update = value,
            Action::Delete => self.can_delete = value,
        }
    }

    /// Read one sub-permission; absent keys are denied.
    pub fn sub_permission(&self, key: &str) -> bool {
        self.sub_permissions.get(key).copied().unwrap_or(false)
    }

    /// Check whether this row grants a capability.
    pub fn allows(&self, capability: &Capability) -> bool {
        match capability {
            Capability::Action(action) => self.flag(*action),
            Capability::Sub(key) => self.sub_permission(key),
        }
    }

    /// Apply a partial update in place. Fields left as `None` are untouched;
    /// a provided sub-permission map replaces the existing one.
    pub fn apply(&mut self, update: &PermissionUpdate) {
        if let Some(v) = update.can_create {
            self.can_create = v;
        }
        if let Some(v) = update.can_read {
            self.can_read = v;
        }
        if let Some(v) = update.can_update {
            self.can_update = v;
        }
        if let Some(v) = update.can_delete {
            self.can_delete = v;
        }
        if let Some(ref subs) = update.sub_permissions {
            self.sub_permissions = subs.clone();
        }
    }
}

/// Partial change to a permission row, used for administrative editing.
///
/// Unset fields are stripped when serialized, so persisting an update never
/// overwrites a flag the administrator did not touch.
///
/// # Example
///
/// ```
/// use shopfloor_rbac::PermissionUpdate;
///
/// let update = PermissionUpdate::new().can_delete(true);
/// let json = serde_json::to_value(&update).unwrap();
/// assert_eq!(json, serde_json::json!({ "can_delete": true }));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermissionUpdate {
    /// New create flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_create: Option<bool>,
    /// New read flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_read: Option<bool>,
    /// New update flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_update: Option<bool>,
    /// New delete flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_delete: Option<bool>,
    /// Full replacement of the sub-permission map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_permissions: Option<BTreeMap<String, bool>>,
}

impl PermissionUpdate {
    /// Create an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the create flag.
    pub fn can_create(mut self, value: bool) -> Self {
        self.can_create = Some(value);
        self
    }

    /// Set the read flag.
    pub fn can_read(mut self, value: bool) -> Self {
        self.can_read = Some(value);
        self
    }

    /// Set the update flag.
    pub fn can_update(mut self, value: bool) -> Self {
        self.can_update = Some(value);
        self
    }

    /// Set the delete flag.
    pub fn can_delete(mut self, value: bool) -> Self {
        self.can_delete = Some(value);
        self
    }

    /// Set the sub-permission map.
    pub fn sub_permissions(mut self, subs: BTreeMap<String, bool>) -> Self {
        self.sub_permissions = Some(subs);
        self
    }

    /// Set one coarse flag by action.
    pub fn flag(mut self, action: Action, value: bool) -> Self {
        match action {
            Action::Create => self.can_create = Some(value),
            Action::Read => self.can_read = Some(value),
            Action::Update => self.can_update = Some(value),
            Action::Delete => self.can_delete = Some(value),
        }
        self
    }

    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        self.can_create.is_none()
            && self.can_read.is_none()
            && self.can_update.is_none()
            && self.can_delete.is_none()
            && self.sub_permissions.is_none()
    }
}
