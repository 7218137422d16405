//! Role catalog
//!
//! Roles are defined at runtime by administrators and keyed by a string slug.
//! Four system roles are bootstrapped on first use and can never be deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shopfloor_rbac::{policy, Tier};

/// A role as stored in the role catalog.
///
/// # Examples
///
/// ```
/// use shopfloor_org::RoleDefinition;
///
/// let role = RoleDefinition::custom("QA Reviewer", "#0ea5e9");
/// assert_eq!(role.key, "qa_reviewer");
/// assert!(!role.is_system);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleDefinition {
    /// Unique slug, also the store key
    pub key: String,

    /// Display label
    pub label: String,

    /// Display color (CSS color string)
    pub color: String,

    /// System roles cannot be deleted
    #[serde(default)]
    pub is_system: bool,

    /// When the role was created
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl RoleDefinition {
    /// Create a non-system role whose key is derived from the label.
    pub fn custom(label: impl Into<String>, color: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            key: slugify(&label),
            label,
            color: color.into(),
            is_system: false,
            created_at: Utc::now(),
        }
    }

    /// Tier used to synthesize default permissions for this role.
    pub fn tier(&self) -> Tier {
        Tier::for_role(&self.key)
    }
}

/// The fixed roles bootstrapped into an empty catalog.
///
/// # Examples
///
/// ```
/// use shopfloor_org::SystemRole;
///
/// assert_eq!(SystemRole::TeamLead.key(), "team_lead");
/// assert_eq!(SystemRole::parse("PERSONNEL"), Some(SystemRole::Personnel));
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SystemRole {
    /// Highest privilege; bypasses permission rows
    SuperAdmin,

    /// Administrators
    Admin,

    /// Team leads
    TeamLead,

    /// Base personnel; also the fallback role
    Personnel,
}

impl SystemRole {
    /// Get all system roles, highest privilege first.
    pub fn all() -> [SystemRole; 4] {
        [
            SystemRole::SuperAdmin,
            SystemRole::Admin,
            SystemRole::TeamLead,
            SystemRole::Personnel,
        ]
    }

    /// Slug of the role.
    pub fn key(&self) -> &'static str {
        match self {
            Self::SuperAdmin => policy::HIGHEST_ROLE,
            Self::Admin => policy::ADMIN_ROLE,
            Self::TeamLead => policy::TEAM_LEAD_ROLE,
            Self::Personnel => policy::FALLBACK_ROLE,
        }
    }

    /// Display label of the role.
    pub fn label(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "Super Admin",
            Self::Admin => "Admin",
            Self::TeamLead => "Team Lead",
            Self::Personnel => "Personnel",
        }
    }

    /// Display color of the role.
    pub fn color(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "#dc2626",
            Self::Admin => "#7c3aed",
            Self::TeamLead => "#2563eb",
            Self::Personnel => "#16a34a",
        }
    }

    /// Parse a system role from its slug (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        let key = s.to_lowercase();
        Self::all().into_iter().find(|role| role.key() == key)
    }

    /// Build the stored definition of this role.
    pub fn definition(&self) -> RoleDefinition {
        RoleDefinition {
            key: self.key().to_string(),
            label: self.label().to_string(),
            color: self.color().to_string(),
            is_system: true,
            created_at: Utc::now(),
        }
    }
}

/// Hard-coded system role list, used both for bootstrapping and as the
/// degraded answer when the catalog cannot be read.
pub fn system_roles() -> Vec<RoleDefinition> {
    SystemRole::all().iter().map(SystemRole::definition).collect()
}

/// Derive a canonical role slug from a display label.
///
/// # Examples
///
/// ```
/// use shopfloor_org::roles::slugify;
///
/// assert_eq!(slugify("QA Reviewer"), "qa_reviewer");
/// assert_eq!(slugify("  Night   Shift "), "night_shift");
/// ```
pub fn slugify(label: &str) -> String {
    label
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}
