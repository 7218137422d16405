//! Current-actor identity
//!
//! Authentication happens elsewhere; this module only describes who is acting
//! so the audit trail can attribute entries.

use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// Identity of the user performing an operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActorIdentity {
    /// User ID
    pub id: String,

    /// Contact address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl ActorIdentity {
    /// Create an identity with only an ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            display_name: None,
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
}

/// Source of the currently signed-in actor.
pub trait IdentityProvider: Send + Sync {
    /// The actor currently signed in, if any.
    fn current_actor(&self) -> Option<ActorIdentity>;
}

/// Provider that never knows who is acting.
#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

impl IdentityProvider for Anonymous {
    fn current_actor(&self) -> Option<ActorIdentity> {
        None
    }
}

/// Provider holding a single, replaceable identity (sign-in / sign-out).
///
/// # Examples
///
/// ```
/// use shopfloor_org::{ActorIdentity, IdentityProvider, SessionIdentity};
///
/// let identity = SessionIdentity::default();
/// assert!(identity.current_actor().is_none());
///
/// identity.sign_in(ActorIdentity::new("u-1").with_email("ana@example.com"));
/// assert_eq!(identity.current_actor().unwrap().id, "u-1");
/// ```
#[derive(Debug, Default)]
pub struct SessionIdentity {
    actor: RwLock<Option<ActorIdentity>>,
}

impl SessionIdentity {
    /// Create a provider already signed in as `actor`.
    pub fn signed_in(actor: ActorIdentity) -> Self {
        Self {
            actor: RwLock::new(Some(actor)),
        }
    }

    /// Replace the current actor.
    pub fn sign_in(&self, actor: ActorIdentity) {
        let mut guard = self.actor.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(actor);
    }

    /// Clear the current actor.
    pub fn sign_out(&self) {
        let mut guard = self.actor.write().unwrap_or_else(|e| e.into_inner());
        *guard = None;
    }
}

impl IdentityProvider for SessionIdentity {
    fn current_actor(&self) -> Option<ActorIdentity> {
        self.actor.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_provider() {
        assert!(Anonymous.current_actor().is_none());
    }

    #[test]
    fn test_session_identity_sign_in_out() {
        let identity = SessionIdentity::signed_in(
            ActorIdentity::new("u-1").with_display_name("Ana"),
        );
        assert_eq!(
            identity.current_actor().and_then(|a| a.display_name),
            Some("Ana".to_string())
        );

        identity.sign_out();
        assert!(identity.current_actor().is_none());
    }

    #[test]
    fn test_identity_serialization_skips_empty_fields() {
        let json = serde_json::to_value(ActorIdentity::new("u-1")).unwrap();
        assert_eq!(json, serde_json::json!({ "id": "u-1" }));
    }
}
