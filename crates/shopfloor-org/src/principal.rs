//! Principals
//!
//! A principal is an actor holding a set of role slugs. In steady state the
//! set is never empty: any operation that would empty it injects the fallback
//! role instead.

use serde::{Deserialize, Serialize};
use shopfloor_rbac::HIGHEST_ROLE;

/// What [`Principal::remove_role`] did to the role set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleRemoval {
    /// The role was not held
    Unchanged,
    /// The role was removed and other roles remain
    Removed,
    /// The role was the last one and the fallback took its place
    FallbackInjected,
}

impl RoleRemoval {
    /// True if the role set was rewritten.
    pub fn changed(&self) -> bool {
        !matches!(self, RoleRemoval::Unchanged)
    }
}

/// An actor as seen by the permission resolver.
///
/// # Examples
///
/// ```
/// use shopfloor_org::Principal;
///
/// let mut principal = Principal::new("u-1", ["qa_reviewer"]);
/// assert!(principal.remove_role("qa_reviewer", "personnel").changed());
/// assert_eq!(principal.roles, vec!["personnel".to_string()]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    /// User ID
    pub id: String,

    /// Role slugs held by the user
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Principal {
    /// Create a principal from an ID and its role slugs.
    pub fn new<I, S>(id: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    /// Check if the principal holds a role.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Check if the principal holds the highest-privilege role.
    pub fn is_highest(&self) -> bool {
        self.has_role(HIGHEST_ROLE)
    }

    /// Roles to resolve against. A transiently empty set resolves as the
    /// fallback role.
    pub fn effective_roles<'a>(&'a self, fallback: &'a str) -> Vec<&'a str> {
        if self.roles.is_empty() {
            vec![fallback]
        } else {
            self.roles.iter().map(String::as_str).collect()
        }
    }

    /// Remove a role, injecting `fallback` if the set would become empty.
    ///
    /// A principal that already held `fallback` alongside `role` keeps it
    /// and reports [`RoleRemoval::Removed`].
    pub fn remove_role(&mut self, role: &str, fallback: &str) -> RoleRemoval {
        if !self.has_role(role) {
            return RoleRemoval::Unchanged;
        }
        self.roles.retain(|r| r != role);
        if self.roles.is_empty() {
            self.roles.push(fallback.to_string());
            return RoleRemoval::FallbackInjected;
        }
        RoleRemoval::Removed
    }

    /// Return a copy whose role set is guaranteed non-empty.
    pub fn healed(mut self, fallback: &str) -> Self {
        if self.roles.is_empty() {
            self.roles.push(fallback.to_string());
        }
        self
    }
}

/// User document as stored in the `users` collection.
///
/// Only the fields the authorization layer reads are modelled; other profile
/// fields are left untouched in storage.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    /// Contact address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Role slugs
    #[serde(default)]
    pub roles: Vec<String>,
}

impl UserRecord {
    /// Create a record holding the given roles.
    pub fn with_roles<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Set the contact address.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the display name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// View this record as a principal with the given ID.
    pub fn principal(&self, id: impl Into<String>) -> Principal {
        Principal::new(id, self.roles.iter().cloned())
    }
}
