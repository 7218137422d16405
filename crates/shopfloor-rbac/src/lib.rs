//! # Shopfloor RBAC (Role-Based Access Control)
//!
//! Authorization vocabulary and policy for the Shopfloor business
//! application. Everything in this crate is pure: no storage, no async.
//!
//! ## Overview
//!
//! The shopfloor-rbac crate handles:
//! - **Resources**: The closed set of business-entity categories
//! - **Actions**: Coarse create/read/update/delete flags
//! - **Permissions**: One row per (role, resource) pair with CRUD flags and
//!   resource-specific sub-permissions
//! - **Policy**: Tier-based default permissions and reconciliation planning
//! - **Resolution**: Union of grants across a principal's roles
//!
//! ## Architecture
//!
//! ```text
//! Permission row = role + resource + {create, read, update, delete} + sub-permissions
//!
//! Examples:
//!   team_lead__orders      can_delete = true,  sub["approve"] = true
//!   personnel__orders      can_delete = false, sub["approve"] = false
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use shopfloor_rbac::{policy, resolve, Action, Capability, Resource};
//!
//! let lead = policy::default_permission("team_lead", Resource::Orders);
//! let staff = policy::default_permission("personnel", Resource::Orders);
//!
//! // Effective permission is the union across roles
//! assert!(resolve::grants([&staff, &lead], &Capability::from(Action::Delete)));
//! assert!(!resolve::grants([&staff], &Capability::from(Action::Delete)));
//! ```
//!
//! ## Tiers
//!
//! - `super_admin`, `admin`: full CRUD, every sub-permission
//! - `team_lead`: full CRUD except permission administration, no audit-log deletion
//! - `personnel`: read everywhere, writes on an allow-list
//! - any other role: read-only

pub mod actions;
pub mod permissions;
pub mod policy;
pub mod resolve;
pub mod resources;

// Re-export main types for convenience
pub use actions::{Action, Capability};
pub use permissions::{Permission, PermissionUpdate};
pub use policy::{PermissionPatch, ReconcilePlan, Tier, FALLBACK_ROLE, HIGHEST_ROLE};
pub use resources::Resource;
