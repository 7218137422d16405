//! # Shopfloor Organization Model
//!
//! Roles, principals and actor identity for the Shopfloor business
//! application.
//!
//! ## Overview
//!
//! The shopfloor-org crate handles:
//! - **Roles**: Runtime-defined role catalog with four protected system roles
//! - **Principals**: Users and the role slugs they hold
//! - **Identity**: Who is currently acting, for audit attribution
//!
//! ## Architecture
//!
//! ```text
//! User (users/{id})
//!   └─ roles: [slug, ...] ─→ RoleDefinition (roles/{slug})
//!                               └─ Permission rows (role_permissions/{slug}__{resource})
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use shopfloor_org::{Principal, RoleDefinition};
//!
//! let role = RoleDefinition::custom("QA Reviewer", "#0ea5e9");
//! let mut principal = Principal::new("u-1", [role.key.clone()]);
//!
//! // Removing the only role falls back to base personnel
//! principal.remove_role(&role.key, "personnel");
//! assert!(principal.has_role("personnel"));
//! ```

pub mod identity;
pub mod principal;
pub mod roles;

// Re-export main types for convenience
pub use identity::{ActorIdentity, Anonymous, IdentityProvider, SessionIdentity};
pub use principal::{Principal, RoleRemoval, UserRecord};
pub use roles::{system_roles, RoleDefinition, SystemRole};
