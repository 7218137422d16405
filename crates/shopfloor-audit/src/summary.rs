//! Human-readable change summaries.
//!
//! Updates are diffed on top-level keys only; a key counts as changed when
//! its serialized value differs. Labels come from a resource-agnostic
//! dictionary, falling back to a humanized form of the key.

use serde_json::Value;
use shopfloor_rbac::Resource;
use std::collections::BTreeSet;

use crate::entry::AuditAction;

/// Bookkeeping keys that change on every write.
const IGNORED_KEYS: &[&str] = &["updated_at", "updatedAt"];

/// Field-label dictionary, keyed by snake_case field name.
const FIELD_LABELS: &[(&str, &str)] = &[
    ("title", "Title"),
    ("name", "Name"),
    ("description", "Description"),
    ("status", "Status"),
    ("priority", "Priority"),
    ("notes", "Notes"),
    ("due_date", "Due date"),
    ("start_date", "Start date"),
    ("end_date", "End date"),
    ("deadline", "Deadline"),
    ("assigned_to", "Assignee"),
    ("assignee_id", "Assignee"),
    ("customer_id", "Customer"),
    ("product_id", "Product"),
    ("department_id", "Department"),
    ("project_id", "Project"),
    ("order_number", "Order number"),
    ("serial_number", "Serial number"),
    ("sku", "SKU"),
    ("quantity", "Quantity"),
    ("unit_price", "Unit price"),
    ("price", "Price"),
    ("total_amount", "Total amount"),
    ("currency", "Currency"),
    ("stock_quantity", "Stock quantity"),
    ("email", "Email"),
    ("phone", "Phone"),
    ("address", "Address"),
    ("display_name", "Display name"),
    ("roles", "Roles"),
    ("is_active", "Active"),
];

/// Convert `camelCase` or `kebab-case` to `snake_case`.
fn snake_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for (i, c) in key.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else if c == '-' || c == ' ' {
            out.push('_');
        } else {
            out.push(c);
        }
    }
    out
}

/// Turn a field key into a sentence-case label.
///
/// # Example
///
/// ```
/// use shopfloor_audit::summary::humanize;
///
/// assert_eq!(humanize("due_date"), "Due date");
/// assert_eq!(humanize("dueDate"), "Due date");
/// ```
pub fn humanize(key: &str) -> String {
    let words: Vec<String> = snake_case(key)
        .split('_')
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect();
    let sentence = words.join(" ");
    let mut chars = sentence.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Display label for a field key.
pub fn field_label(key: &str) -> String {
    let normalized = snake_case(key);
    FIELD_LABELS
        .iter()
        .find(|(k, _)| *k == normalized)
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| humanize(key))
}

/// Display name for a resource (singular).
pub fn resource_label(resource: &str) -> String {
    match Resource::parse(resource) {
        Some(known) => known.display_name().to_string(),
        None => humanize(resource),
    }
}

/// Top-level keys whose values differ between the snapshots, in key order.
pub fn changed_fields(before: Option<&Value>, after: Option<&Value>) -> Vec<String> {
    let empty = serde_json::Map::new();
    let before = before.and_then(Value::as_object).unwrap_or(&empty);
    let after = after.and_then(Value::as_object).unwrap_or(&empty);

    let keys: BTreeSet<&String> = before.keys().chain(after.keys()).collect();
    keys.into_iter()
        .filter(|k| !IGNORED_KEYS.contains(&k.as_str()))
        .filter(|k| before.get(*k) != after.get(*k))
        .cloned()
        .collect()
}

/// One-line description of a change.
///
/// # Example
///
/// ```
/// use shopfloor_audit::{summarize, AuditAction};
/// use serde_json::json;
///
/// let before = json!({ "title": "A" });
/// let after = json!({ "title": "B", "status": "done" });
/// assert_eq!(
///     summarize(AuditAction::Update, "tasks", Some(&before), Some(&after), 3),
///     "Updated Status, Title"
/// );
/// assert_eq!(
///     summarize(AuditAction::Create, "orders", None, Some(&after), 3),
///     "New Order created"
/// );
/// ```
pub fn summarize(
    action: AuditAction,
    resource: &str,
    before: Option<&Value>,
    after: Option<&Value>,
    max_fields: usize,
) -> String {
    let label = resource_label(resource);

    match action {
        AuditAction::Create => return format!("New {} created", label),
        AuditAction::Delete => return format!("{} deleted", label),
        AuditAction::Update => {}
    }
    // Updates missing a snapshot read as the creation or removal they are
    if before.map_or(true, Value::is_null) {
        return format!("New {} created", label);
    }
    if after.map_or(true, Value::is_null) {
        return format!("{} deleted", label);
    }

    let mut labels: Vec<String> = Vec::new();
    for key in changed_fields(before, after) {
        let field = field_label(&key);
        if !labels.contains(&field) {
            labels.push(field);
        }
    }

    if labels.is_empty() {
        return format!("No changes to {}", label);
    }

    let shown = max_fields.max(1);
    if labels.len() <= shown {
        format!("Updated {}", labels.join(", "))
    } else {
        format!(
            "Updated {} and {} more",
            labels[..shown].join(", "),
            labels.len() - shown
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_update_names_only_changed_fields() {
        let before = json!({ "title": "A", "priority": "low" });
        let after = json!({ "title": "B", "status": "done", "priority": "low" });
        assert_eq!(
            summarize(AuditAction::Update, "tasks", Some(&before), Some(&after), 3),
            "Updated Status, Title"
        );
    }

    #[test]
    fn test_creation_ignores_payload_shape() {
        for after in [json!({}), json!([1, 2]), json!("x"), json!({ "a": { "b": 1 } })] {
            assert_eq!(
                summarize(AuditAction::Create, "customers", None, Some(&after), 3),
                "New Customer created"
            );
        }
        // A null before-snapshot is a creation regardless of the action
        assert_eq!(
            summarize(AuditAction::Update, "customers", Some(&Value::Null), Some(&json!({})), 3),
            "New Customer created"
        );
    }

    #[test]
    fn test_deletion() {
        let before = json!({ "title": "A" });
        assert_eq!(
            summarize(AuditAction::Delete, "production_orders", Some(&before), None, 3),
            "Production order deleted"
        );
    }

    #[test]
    fn test_deletion_without_snapshots() {
        assert_eq!(
            summarize(AuditAction::Delete, "orders", None, None, 3),
            "Order deleted"
        );
        assert_eq!(
            summarize(AuditAction::Update, "orders", Some(&json!({ "title": "A" })), None, 3),
            "Order deleted"
        );
    }

    #[test]
    fn test_overflow_count() {
        let before = json!({ "a": 1, "b": 1, "c": 1, "d": 1, "e": 1 });
        let after = json!({ "a": 2, "b": 2, "c": 2, "d": 2, "e": 2 });
        assert_eq!(
            summarize(AuditAction::Update, "orders", Some(&before), Some(&after), 3),
            "Updated A, B, C and 2 more"
        );
    }

    #[test]
    fn test_no_changes_and_bookkeeping_keys() {
        let before = json!({ "title": "A", "updated_at": "2024-01-01" });
        let after = json!({ "title": "A", "updated_at": "2024-02-01", "updatedAt": 5 });
        assert_eq!(
            summarize(AuditAction::Update, "orders", Some(&before), Some(&after), 3),
            "No changes to Order"
        );
    }

    #[test]
    fn test_nested_values_compare_by_value() {
        let before = json!({ "address": { "city": "Oslo" } });
        let after = json!({ "address": { "city": "Bergen" } });
        assert_eq!(changed_fields(Some(&before), Some(&after)), vec!["address"]);
    }

    #[test]
    fn test_labels() {
        assert_eq!(field_label("dueDate"), "Due date");
        assert_eq!(field_label("assigned_to"), "Assignee");
        assert_eq!(field_label("sku"), "SKU");
        assert_eq!(field_label("batch_code"), "Batch code");
        assert_eq!(resource_label("invoices"), "Invoices");
        assert_eq!(resource_label("warranty"), "Warranty claim");
    }

    #[test]
    fn test_synonym_labels_are_not_repeated() {
        let before = json!({ "assigned_to": "a", "assignee_id": "a" });
        let after = json!({ "assigned_to": "b", "assignee_id": "b" });
        assert_eq!(
            summarize(AuditAction::Update, "tasks", Some(&before), Some(&after), 3),
            "Updated Assignee"
        );
    }
}
