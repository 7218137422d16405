//! # Actions
//!
//! Coarse CRUD actions and the capability type used to ask the resolver
//! about either a CRUD flag or a resource-specific sub-permission.

use serde::{Deserialize, Serialize};

/// Coarse actions that every permission row carries a flag for.
///
/// Unlike hierarchical action models, the four flags are independent: a row
/// may grant `Update` while denying `Read`, and resolution checks exactly the
/// requested flag.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Create new records.
    Create,

    /// View records.
    Read,

    /// Modify existing records.
    Update,

    /// Remove records.
    Delete,
}

impl Action {
    /// Lowercase action name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }

    /// Name of the permission-row flag holding this action.
    pub fn flag_name(&self) -> &'static str {
        match self {
            Action::Create => "can_create",
            Action::Read => "can_read",
            Action::Update => "can_update",
            Action::Delete => "can_delete",
        }
    }

    /// Parse an action name or its flag name.
    ///
    /// # Example
    ///
    /// ```
    /// use shopfloor_rbac::Action;
    ///
    /// assert_eq!(Action::parse("read"), Some(Action::Read));
    /// assert_eq!(Action::parse("can_delete"), Some(Action::Delete));
    /// assert_eq!(Action::parse("canUpdate"), Some(Action::Update));
    /// assert_eq!(Action::parse("approve"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        let lower = s.trim().to_ascii_lowercase();
        let name = lower
            .strip_prefix("can_")
            .or_else(|| lower.strip_prefix("can"))
            .unwrap_or(&lower);
        Self::all().into_iter().find(|a| a.as_str() == name)
    }

    /// All four actions, in CRUD order.
    pub fn all() -> Vec<Self> {
        vec![Action::Create, Action::Read, Action::Update, Action::Delete]
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something a principal may be allowed to do on a resource.
///
/// # Example
///
/// ```
/// use shopfloor_rbac::{Action, Capability};
///
/// let coarse = Capability::from(Action::Delete);
/// assert_eq!(coarse.to_string(), "delete");
///
/// let fine = Capability::sub("approve");
/// assert_eq!(fine.to_string(), "sub:approve");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "name")]
pub enum Capability {
    /// One of the four coarse CRUD flags.
    Action(Action),
    /// A resource-specific sub-permission key.
    Sub(String),
}

impl Capability {
    /// Create a sub-permission capability.
    pub fn sub(key: impl Into<String>) -> Self {
        Capability::Sub(key.into())
    }

    /// Parse the display form back (`delete`, `sub:approve`).
    pub fn parse(s: &str) -> Option<Self> {
        match s.strip_prefix("sub:") {
            Some(key) if !key.is_empty() => Some(Capability::sub(key)),
            Some(_) => None,
            None => Action::parse(s).map(Capability::Action),
        }
    }
}

impl From<Action> for Capability {
    fn from(action: Action) -> Self {
        Capability::Action(action)
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::Action(action) => f.write_str(action.as_str()),
            Capability::Sub(key) => write!(f, "sub:{}", key),
        }
    }
}
