//! # Resources
//!
//! Defines the closed set of business-entity categories that are subject to
//! authorization, along with the sub-permission vocabulary each one accepts.

use serde::{Deserialize, Serialize};

/// Resource categories that can have permissions assigned.
///
/// The set is closed and enumerable: bootstrap creates exactly one permission
/// row per (role, resource) pair across every variant returned by
/// [`Resource::all`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    /// Task boards and individual tasks.
    Tasks,
    /// Application users and their role assignments.
    Users,
    /// Departments.
    Departments,
    /// Sales orders.
    Orders,
    /// Manufacturing work orders.
    ProductionOrders,
    /// Customers.
    Customers,
    /// Product catalog.
    Products,
    /// Projects.
    Projects,
    /// The audit trail itself.
    AuditLogs,
    /// Role and permission administration.
    RolePermissions,
    /// Raw material inventory.
    RawMaterials,
    /// Warranty claims.
    Warranty,
}

impl Resource {
    /// Get the string representation stored in permission rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Tasks => "tasks",
            Resource::Users => "users",
            Resource::Departments => "departments",
            Resource::Orders => "orders",
            Resource::ProductionOrders => "production_orders",
            Resource::Customers => "customers",
            Resource::Products => "products",
            Resource::Projects => "projects",
            Resource::AuditLogs => "audit_logs",
            Resource::RolePermissions => "role_permissions",
            Resource::RawMaterials => "raw_materials",
            Resource::Warranty => "warranty",
        }
    }

    /// Singular, human-readable name used in audit summaries.
    ///
    /// # Example
    ///
    /// ```
    /// use shopfloor_rbac::Resource;
    ///
    /// assert_eq!(Resource::ProductionOrders.display_name(), "Production order");
    /// ```
    pub fn display_name(&self) -> &'static str {
        match self {
            Resource::Tasks => "Task",
            Resource::Users => "User",
            Resource::Departments => "Department",
            Resource::Orders => "Order",
            Resource::ProductionOrders => "Production order",
            Resource::Customers => "Customer",
            Resource::Products => "Product",
            Resource::Projects => "Project",
            Resource::AuditLogs => "Audit log",
            Resource::RolePermissions => "Role permission",
            Resource::RawMaterials => "Raw material",
            Resource::Warranty => "Warranty claim",
        }
    }

    /// Parse resource from string representation.
    ///
    /// # Arguments
    ///
    /// * `s` - String to parse (case-insensitive, accepts singular forms)
    ///
    /// # Example
    ///
    /// ```
    /// use shopfloor_rbac::Resource;
    ///
    /// assert_eq!(Resource::parse("orders"), Some(Resource::Orders));
    /// assert_eq!(Resource::parse("order"), Some(Resource::Orders));
    /// assert_eq!(Resource::parse("production-order"), Some(Resource::ProductionOrders));
    /// assert_eq!(Resource::parse("invoices"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "tasks" | "task" => Some(Resource::Tasks),
            "users" | "user" => Some(Resource::Users),
            "departments" | "department" => Some(Resource::Departments),
            "orders" | "order" => Some(Resource::Orders),
            "production_orders" | "production_order" | "productionorders" => {
                Some(Resource::ProductionOrders)
            }
            "customers" | "customer" => Some(Resource::Customers),
            "products" | "product" => Some(Resource::Products),
            "projects" | "project" => Some(Resource::Projects),
            "audit_logs" | "audit_log" | "auditlogs" => Some(Resource::AuditLogs),
            "role_permissions" | "role_permission" | "rolepermissions" => {
                Some(Resource::RolePermissions)
            }
            "raw_materials" | "raw_material" | "materials" => Some(Resource::RawMaterials),
            "warranty" | "warranties" => Some(Resource::Warranty),
            _ => None,
        }
    }

    /// Get all resources, in the order the administration screen lists them.
    pub fn all() -> Vec<Self> {
        vec![
            Resource::Tasks,
            Resource::Users,
            Resource::Departments,
            Resource::Orders,
            Resource::ProductionOrders,
            Resource::Customers,
            Resource::Products,
            Resource::Projects,
            Resource::AuditLogs,
            Resource::RolePermissions,
            Resource::RawMaterials,
            Resource::Warranty,
        ]
    }

    /// Sub-permission keys that are valid for this resource.
    ///
    /// The vocabulary grows over time; reconciliation retrofits new keys into
    /// existing permission rows. Some resources have none.
    ///
    /// # Example
    ///
    /// ```
    /// use shopfloor_rbac::Resource;
    ///
    /// assert!(Resource::Orders.sub_permission_keys().contains(&"approve"));
    /// assert!(Resource::Departments.sub_permission_keys().is_empty());
    /// ```
    pub fn sub_permission_keys(&self) -> &'static [&'static str] {
        match self {
            Resource::Orders => &["approve", "cancel", "export", "view_financials", "edit_price"],
            Resource::ProductionOrders => &["start", "complete", "cancel", "assign"],
            Resource::Customers => &["export", "view_financials"],
            Resource::Products => &["edit_price", "manage_stock"],
            Resource::Tasks => &["assign", "close"],
            Resource::Projects => &["archive", "manage_members"],
            Resource::AuditLogs => &["export"],
            Resource::RawMaterials => &["adjust_stock"],
            Resource::Warranty => &["approve_claim", "reject_claim"],
            Resource::Users => &["assign_roles", "deactivate"],
            Resource::Departments | Resource::RolePermissions => &[],
        }
    }

    /// Check whether `key` belongs to this resource's sub-permission vocabulary.
    pub fn has_sub_permission(&self, key: &str) -> bool {
        self.sub_permission_keys().contains(&key)
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
