//! # Tier Policy
//!
//! Default permissions are synthesized from a role's tier. This module holds
//! the tier table and the pure planning functions behind bootstrap and
//! reconciliation. Planning never touches storage: callers fetch the current
//! rows, ask for a [`ReconcilePlan`], and apply it themselves.
//!
//! ```text
//! existing rows + role catalog + resource vocabulary
//!         │
//!         ▼
//! plan_reconciliation ──► missing rows (create) + patches (update)
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::actions::Action;
use crate::permissions::{Permission, PermissionUpdate};
use crate::resources::Resource;

/// Slug of the highest-privilege role. Holders bypass row lookups entirely.
pub const HIGHEST_ROLE: &str = "super_admin";

/// Slug of the administrator role.
pub const ADMIN_ROLE: &str = "admin";

/// Slug of the team-lead role.
pub const TEAM_LEAD_ROLE: &str = "team_lead";

/// Slug of the lowest-privilege role, injected when a principal would
/// otherwise be left without any role.
pub const FALLBACK_ROLE: &str = "personnel";

/// Resources base personnel may create and update.
const PERSONNEL_WRITABLE: &[Resource] = &[
    Resource::Tasks,
    Resource::ProductionOrders,
    Resource::Warranty,
];

/// Sub-permissions granted to base personnel.
const PERSONNEL_SUB_PERMISSIONS: &[(Resource, &str)] = &[
    (Resource::Tasks, "close"),
    (Resource::ProductionOrders, "start"),
    (Resource::ProductionOrders, "complete"),
];

/// Policy bucket used to synthesize default permissions for a role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Full CRUD and every sub-permission on every resource.
    Full,
    /// Full CRUD except permission administration; no audit-log deletion.
    TeamLead,
    /// Read everywhere, writes only on an allow-list.
    Personnel,
    /// Runtime-defined roles: read-only, no sub-permissions.
    Custom,
}

impl Tier {
    /// Map a role slug to its tier. Unknown slugs are custom roles.
    ///
    /// # Example
    ///
    /// ```
    /// use shopfloor_rbac::Tier;
    ///
    /// assert_eq!(Tier::for_role("super_admin"), Tier::Full);
    /// assert_eq!(Tier::for_role("team_lead"), Tier::TeamLead);
    /// assert_eq!(Tier::for_role("qa_reviewer"), Tier::Custom);
    /// ```
    pub fn for_role(role: &str) -> Self {
        match role {
            HIGHEST_ROLE | ADMIN_ROLE => Tier::Full,
            TEAM_LEAD_ROLE => Tier::TeamLead,
            FALLBACK_ROLE => Tier::Personnel,
            _ => Tier::Custom,
        }
    }

    /// Get the string representation of the tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Full => "full",
            Tier::TeamLead => "team_lead",
            Tier::Personnel => "personnel",
            Tier::Custom => "custom",
        }
    }

    /// Default value of a coarse flag for this tier.
    pub fn default_flag(&self, resource: Resource, action: Action) -> bool {
        match self {
            Tier::Full => true,
            Tier::TeamLead => match (resource, action) {
                (Resource::RolePermissions, Action::Read) => true,
                (Resource::RolePermissions, _) => false,
                (Resource::AuditLogs, Action::Delete) => false,
                _ => true,
            },
            Tier::Personnel => match action {
                Action::Read => true,
                Action::Create | Action::Update => PERSONNEL_WRITABLE.contains(&resource),
                Action::Delete => false,
            },
            Tier::Custom => action == Action::Read,
        }
    }

    /// Default value of a sub-permission for this tier.
    pub fn default_sub_permission(&self, resource: Resource, key: &str) -> bool {
        match self {
            Tier::Full => true,
            Tier::TeamLead => resource != Resource::RolePermissions,
            Tier::Personnel => PERSONNEL_SUB_PERMISSIONS
                .iter()
                .any(|(r, k)| *r == resource && *k == key),
            Tier::Custom => false,
        }
    }
}

/// Synthesize the default row for a (role, resource) pair.
///
/// Every vocabulary key gets an explicit entry, so the map doubles as a
/// record of which keys the row has already been reconciled against. Custom
/// roles are the exception: they are seeded with an empty map and only gain
/// explicit `false` entries through reconciliation.
///
/// # Example
///
/// ```
/// use shopfloor_rbac::{policy, Resource};
///
/// let row = policy::default_permission("qa_reviewer", Resource::Tasks);
/// assert!(row.can_read);
/// assert!(!row.can_create && !row.can_update && !row.can_delete);
/// ```
pub fn default_permission(role: &str, resource: Resource) -> Permission {
    let tier = Tier::for_role(role);
    let mut perm = Permission::new(role, resource);
    for action in Action::all() {
        perm.set_flag(action, tier.default_flag(resource, action));
    }
    if tier != Tier::Custom {
        perm.sub_permissions = default_sub_permissions(tier, resource);
    }
    perm
}

/// Conservative row seeded for a freshly created custom role.
pub fn custom_role_permission(role: &str, resource: Resource) -> Permission {
    let mut perm = Permission::new(role, resource);
    perm.can_read = true;
    perm
}

fn default_sub_permissions(tier: Tier, resource: Resource) -> BTreeMap<String, bool> {
    resource
        .sub_permission_keys()
        .iter()
        .map(|key| (key.to_string(), tier.default_sub_permission(resource, key)))
        .collect()
}

/// A change to apply to an existing row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionPatch {
    /// Store key of the row to patch.
    pub id: String,
    /// Role of the row.
    pub role: String,
    /// Resource of the row.
    pub resource: Resource,
    /// Fields to overwrite.
    pub update: PermissionUpdate,
}

/// Writes needed to bring the permission table in line with policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// Rows that do not exist yet.
    pub missing: Vec<Permission>,
    /// Existing rows that need patching.
    pub patches: Vec<PermissionPatch>,
}

impl ReconcilePlan {
    /// True when nothing needs to be written.
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.patches.is_empty()
    }

    /// Total number of writes in the plan.
    pub fn len(&self) -> usize {
        self.missing.len() + self.patches.len()
    }
}

/// Rows to create so that every (role, resource) pair has exactly one row.
pub fn plan_missing<'a, I>(roles: I, existing: &[Permission], resources: &[Resource]) -> Vec<Permission>
where
    I: IntoIterator<Item = &'a str>,
{
    let present: HashSet<(&str, Resource)> = existing
        .iter()
        .map(|p| (p.role.as_str(), p.resource))
        .collect();

    let mut seen_roles = HashSet::new();
    let mut missing = Vec::new();
    for role in roles {
        if !seen_roles.insert(role) {
            continue;
        }
        for resource in resources {
            if !present.contains(&(role, *resource)) {
                missing.push(default_permission(role, *resource));
            }
        }
    }
    missing
}

/// Patches for existing rows: vocabulary keys the row has never seen, and
/// team-lead coarse flags that drifted from policy.
pub fn plan_patches(existing: &[Permission]) -> Vec<PermissionPatch> {
    existing.iter().filter_map(plan_patch).collect()
}

fn plan_patch(row: &Permission) -> Option<PermissionPatch> {
    let tier = Tier::for_role(&row.role);
    let mut update = PermissionUpdate::new();

    let missing_keys: Vec<&str> = row
        .resource
        .sub_permission_keys()
        .iter()
        .copied()
        .filter(|key| !row.sub_permissions.contains_key(*key))
        .collect();

    if !missing_keys.is_empty() {
        let mut subs = row.sub_permissions.clone();
        for key in missing_keys {
            subs.insert(key.to_string(), tier.default_sub_permission(row.resource, key));
        }
        update = update.sub_permissions(subs);
    }

    if tier == Tier::TeamLead {
        for action in Action::all() {
            let expected = tier.default_flag(row.resource, action);
            if row.flag(action) != expected {
                update = update.flag(action, expected);
            }
        }
    }

    if update.is_empty() {
        None
    } else {
        Some(PermissionPatch {
            id: row.id(),
            role: row.role.clone(),
            resource: row.resource,
            update,
        })
    }
}

/// Full reconciliation plan: missing rows plus patches to existing ones.
///
/// Applying the plan and planning again yields an empty plan.
pub fn plan_reconciliation<'a, I>(
    roles: I,
    existing: &[Permission],
    resources: &[Resource],
) -> ReconcilePlan
where
    I: IntoIterator<Item = &'a str>,
{
    ReconcilePlan {
        missing: plan_missing(roles, existing, resources),
        patches: plan_patches(existing),
    }
}
