//! Audit log domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of state change being recorded.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    /// A record was created
    Create,
    /// A record was modified
    Update,
    /// A record was removed
    Delete,
}

impl AuditAction {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Delete => "delete",
        }
    }

    /// Parse from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "create" | "created" => Some(AuditAction::Create),
            "update" | "updated" => Some(AuditAction::Update),
            "delete" | "deleted" => Some(AuditAction::Delete),
            _ => None,
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A state change as reported by a business service.
///
/// # Example
///
/// ```
/// use shopfloor_audit::{AuditAction, AuditEvent};
/// use serde_json::json;
///
/// let event = AuditEvent::new(AuditAction::Update, "orders", "o-17", "u-1")
///     .before(json!({ "status": "open" }))
///     .after(json!({ "status": "shipped" }))
///     .metadata("reason", json!("customer request"));
/// assert_eq!(event.record_id, "o-17");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEvent {
    /// Kind of change
    pub action: AuditAction,
    /// Resource name (e.g. `orders`)
    pub resource: String,
    /// Changed record
    pub record_id: String,
    /// Acting user
    pub actor_id: String,
    /// Record before the change (`None` for creations)
    pub before: Option<Value>,
    /// Record after the change (`None` for deletions)
    pub after: Option<Value>,
    /// Caller metadata, merged last into the entry
    pub extra: Map<String, Value>,
}

impl AuditEvent {
    /// Create an event without snapshots.
    pub fn new(
        action: AuditAction,
        resource: impl Into<String>,
        record_id: impl Into<String>,
        actor_id: impl Into<String>,
    ) -> Self {
        Self {
            action,
            resource: resource.into(),
            record_id: record_id.into(),
            actor_id: actor_id.into(),
            before: None,
            after: None,
            extra: Map::new(),
        }
    }

    /// Set the before-snapshot.
    pub fn before(mut self, snapshot: Value) -> Self {
        self.before = Some(snapshot);
        self
    }

    /// Set the after-snapshot.
    pub fn after(mut self, snapshot: Value) -> Self {
        self.after = Some(snapshot);
        self
    }

    /// Add a caller metadata key.
    pub fn metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Enriched, immutable record of one state change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditLogEntry {
    /// Kind of change
    pub action: AuditAction,
    /// Resource name
    pub resource: String,
    /// Changed record
    pub record_id: String,
    /// Acting user
    pub actor_id: String,
    /// Record before the change
    #[serde(default)]
    pub before: Option<Value>,
    /// Record after the change
    #[serde(default)]
    pub after: Option<Value>,
    /// Enrichment plus caller metadata
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// When `record` was called (epoch milliseconds in storage, so ordered
    /// queries sort correctly)
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl AuditLogEntry {
    /// Human-readable change summary, if enrichment attached one.
    pub fn change_summary(&self) -> Option<&str> {
        self.metadata.get("change_summary").and_then(Value::as_str)
    }

    /// Session that produced the entry, if attached.
    pub fn session_id(&self) -> Option<&str> {
        self.metadata.get("session_id").and_then(Value::as_str)
    }
}
