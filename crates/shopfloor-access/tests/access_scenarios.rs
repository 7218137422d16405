//! End-to-end authorization scenarios against the in-memory store.

use serde_json::json;
use shopfloor_access::{
    AccessConfig, AccessControl, AccessError, PERMISSIONS_COLLECTION, ROLES_COLLECTION,
    USERS_COLLECTION,
};
use shopfloor_org::{Principal, UserRecord};
use shopfloor_rbac::{Action, Capability, Permission, PermissionUpdate, Resource};
use shopfloor_store::{to_data, DocumentStore, MemoryDocumentStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn setup() -> (Arc<MemoryDocumentStore>, AccessControl) {
    let memory = Arc::new(MemoryDocumentStore::new());
    let access = AccessControl::new(memory.clone(), AccessConfig::default());
    (memory, access)
}

async fn add_user(memory: &MemoryDocumentStore, id: &str, roles: &[&str]) {
    let record = UserRecord::with_roles(roles.iter().copied());
    memory
        .set(USERS_COLLECTION, id, to_data(&record).unwrap())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_resolution_is_union_of_role_rows() {
    let (_, access) = setup();
    access.roles().add_role("Clerk", "#111").await.unwrap();
    access.roles().add_role("Approver", "#222").await.unwrap();
    access.permissions().list_permissions().await.unwrap();

    access
        .permissions()
        .update_permission(
            &Permission::document_id("approver", Resource::Orders),
            &PermissionUpdate::new().can_update(true),
        )
        .await
        .unwrap();
    access
        .permissions()
        .update_permission(
            &Permission::document_id("clerk", Resource::Orders),
            &PermissionUpdate::new().can_create(true),
        )
        .await
        .unwrap();

    let both = Principal::new("u-1", ["clerk", "approver"]);
    for action in Action::all() {
        let mut expected = false;
        for role in &both.roles {
            let row = access
                .permissions()
                .get_permission(role, Resource::Orders)
                .await
                .unwrap()
                .unwrap();
            expected |= row.flag(action);
        }
        assert_eq!(
            access.resolver().can(&both, Resource::Orders, &Capability::from(action)).await,
            expected,
            "{}",
            action
        );
    }
    assert!(access.resolver().can_create(&both, Resource::Orders).await);
    assert!(access.resolver().can_update(&both, Resource::Orders).await);
    assert!(!access.resolver().can_delete(&both, Resource::Orders).await);
}

#[tokio::test]
async fn test_highest_role_on_empty_store() {
    let (memory, access) = setup();
    let boss = Principal::new("u-1", ["super_admin"]);

    for resource in Resource::all() {
        assert!(access.resolver().can_create(&boss, resource).await);
        assert!(access.resolver().can_read(&boss, resource).await);
        assert!(access.resolver().can_update(&boss, resource).await);
        assert!(access.resolver().can_delete(&boss, resource).await);
    }
    assert_eq!(memory.len(PERMISSIONS_COLLECTION).await, 0);
}

#[tokio::test]
async fn test_bootstrap_twice_is_stable() {
    let (memory, access) = setup();
    access.roles().add_role("Night Shift", "#333").await.unwrap();

    access.permissions().bootstrap_missing_permissions().await.unwrap();
    let first = memory.snapshot(PERMISSIONS_COLLECTION).await;
    let writes = memory.write_count();

    assert_eq!(access.permissions().bootstrap_missing_permissions().await.unwrap(), 0);
    assert_eq!(memory.write_count(), writes);
    assert_eq!(memory.snapshot(PERMISSIONS_COLLECTION).await, first);
}

#[tokio::test]
async fn test_delete_unassigned_role_removes_only_its_rows() {
    let (memory, access) = setup();
    access.roles().add_role("Temp", "#444").await.unwrap();
    access.permissions().list_permissions().await.unwrap();

    let before = memory.snapshot(PERMISSIONS_COLLECTION).await;
    let report = access.roles().delete_role("temp").await.unwrap();
    let after = memory.snapshot(PERMISSIONS_COLLECTION).await;

    assert_eq!(report.principals_healed, 0);
    assert_eq!(report.permissions_removed, Resource::all().len());
    assert_eq!(before.len() - after.len(), Resource::all().len());
    for (id, row) in &after {
        assert!(!id.starts_with("temp__"));
        assert_eq!(before.get(id), Some(row));
    }
    assert!(memory.get(ROLES_COLLECTION, "temp").await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_only_role_leaves_fallback() {
    let (memory, access) = setup();
    access.roles().add_role("Night Shift", "#333").await.unwrap();
    add_user(&memory, "u-1", &["night_shift"]).await;
    add_user(&memory, "u-2", &["team_lead", "night_shift"]).await;
    add_user(&memory, "u-3", &["team_lead"]).await;

    access.roles().delete_role("night_shift").await.unwrap();

    let users = memory.snapshot(USERS_COLLECTION).await;
    assert_eq!(users["u-1"]["roles"], json!(["personnel"]));
    assert_eq!(users["u-2"]["roles"], json!(["team_lead"]));
    assert_eq!(users["u-3"]["roles"], json!(["team_lead"]));
}

#[tokio::test]
async fn test_interrupted_cascade_can_be_retried() {
    let (memory, access) = setup();
    access.roles().add_role("Night Shift", "#333").await.unwrap();
    add_user(&memory, "u-1", &["night_shift"]).await;

    memory.fail_writes(true);
    assert!(access.roles().delete_role("night_shift").await.is_err());
    memory.fail_writes(false);

    let report = access.roles().delete_role("night_shift").await.unwrap();
    assert_eq!(report.principals_healed, 1);
    assert!(memory.get(ROLES_COLLECTION, "night_shift").await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_system_role_is_rejected_without_writes() {
    let (memory, access) = setup();
    access.roles().get_roles().await;
    add_user(&memory, "u-1", &["team_lead"]).await;
    let writes = memory.write_count();

    for role in ["super_admin", "admin", "team_lead", "personnel"] {
        let err = access.roles().delete_role(role).await.unwrap_err();
        assert_eq!(err, AccessError::SystemRoleProtected(role.to_string()));
    }
    assert_eq!(memory.write_count(), writes);
}

#[tokio::test]
async fn test_new_custom_role_is_read_only() {
    let (_, access) = setup();
    access.roles().add_role("QA Reviewer", "#0ea5e9").await.unwrap();

    let row = access
        .permissions()
        .get_permission("qa_reviewer", Resource::Tasks)
        .await
        .unwrap()
        .unwrap();
    assert!(row.can_read);
    assert!(!row.can_create);
    assert!(!row.can_update);
    assert!(!row.can_delete);
}

#[tokio::test]
async fn test_second_role_grants_delete() {
    let (_, access) = setup();
    access.roles().add_role("Role A", "#aaa").await.unwrap();
    access.roles().add_role("Role B", "#bbb").await.unwrap();
    access
        .permissions()
        .update_permission(
            &Permission::document_id("role_b", Resource::Orders),
            &PermissionUpdate::new().can_delete(true),
        )
        .await
        .unwrap();

    let principal = Principal::new("u-1", ["role_a", "role_b"]);
    assert!(access.resolver().can_delete(&principal, Resource::Orders).await);

    let only_a = Principal::new("u-2", ["role_a"]);
    assert!(!access.resolver().can_delete(&only_a, Resource::Orders).await);
}

#[tokio::test]
async fn test_personnel_defaults() {
    let (_, access) = setup();
    access.permissions().list_permissions().await.unwrap();
    let worker = Principal::new("u-1", ["personnel"]);
    let resolver = access.resolver();

    assert!(resolver.can_create(&worker, Resource::Tasks).await);
    assert!(resolver.can_update(&worker, Resource::ProductionOrders).await);
    assert!(!resolver.can_create(&worker, Resource::Orders).await);
    assert!(!resolver.can_delete(&worker, Resource::Tasks).await);
    assert!(resolver.can_read(&worker, Resource::Customers).await);
    assert!(resolver.can_perform_sub_permission(&worker, Resource::Tasks, "close").await);
    assert!(!resolver.can_perform_sub_permission(&worker, Resource::Tasks, "assign").await);
}

#[tokio::test]
async fn test_team_lead_defaults() {
    let (_, access) = setup();
    access.permissions().list_permissions().await.unwrap();
    let lead = Principal::new("u-1", ["team_lead"]);
    let resolver = access.resolver();

    assert!(resolver.can_delete(&lead, Resource::Orders).await);
    assert!(!resolver.can_delete(&lead, Resource::AuditLogs).await);
    assert!(resolver.can_read(&lead, Resource::RolePermissions).await);
    assert!(!resolver.can_update(&lead, Resource::RolePermissions).await);
    assert!(resolver.can_perform_sub_permission(&lead, Resource::Orders, "approve").await);
}

#[tokio::test]
async fn test_mutations_publish_invalidation() {
    let (_, access) = setup();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    access.on_permission_cache_change(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    access.roles().add_role("Temp", "#444").await.unwrap();
    access.roles().delete_role("temp").await.unwrap();
    access.clear_permission_cache();

    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_gate_rejects_with_permission_denied() {
    let (_, access) = setup();
    access.permissions().list_permissions().await.unwrap();
    let worker = Principal::new("u-1", ["personnel"]);

    let err = access
        .gate()
        .require(&worker, Resource::Orders, Capability::sub("approve"))
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::PermissionDenied { resource: Resource::Orders, .. }));
}
