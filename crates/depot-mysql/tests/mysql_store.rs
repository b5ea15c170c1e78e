//! Integration tests against a live MySQL server.
//!
//! Run with `DEPOT_TEST_DATABASE_URL=mysql://... cargo test -p depot-mysql -- --ignored`.
//! Each test works in its own id range so they can share one database.

use std::sync::Arc;

use depot_acl::{AclConfig, AclEngine, AclStore, Capabilities};
use depot_core::{Caller, RoleName, UserId, WarehouseId};
use depot_mysql::{DatabaseConfig, MySqlAclStore};

async fn store() -> MySqlAclStore {
    store_with(DatabaseConfig::default().max_connections).await
}

async fn store_with(max_connections: u32) -> MySqlAclStore {
    let url = std::env::var("DEPOT_TEST_DATABASE_URL")
        .expect("DEPOT_TEST_DATABASE_URL must be set for ignored tests");
    let store = MySqlAclStore::connect_lazy(&DatabaseConfig {
        url,
        max_connections,
        ..Default::default()
    })
    .unwrap();
    sqlx::raw_sql(include_str!("../sql/schema.sql"))
        .execute(store.pool())
        .await
        .unwrap();
    store
}

async fn exec(store: &MySqlAclStore, sql: &str) {
    sqlx::query(sql).execute(store.pool()).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_probes_succeed_on_full_schema() {
    let store = store().await;
    store.probe_permission_schema().await.unwrap();
    store.probe_warehouse_schema().await.unwrap();

    let engine = AclEngine::new(Arc::new(store), AclConfig::default());
    assert_eq!(engine.capabilities().await, Capabilities::FULL);
}

#[tokio::test]
#[ignore]
async fn test_override_wins_against_live_schema() {
    let store = store().await;
    exec(&store, "INSERT IGNORE INTO roles (name, priority) VALUES ('operator', 40)").await;
    exec(
        &store,
        "INSERT IGNORE INTO permissions (code, category, name) VALUES ('view_qc', 'qc', 'View QC')",
    )
    .await;
    exec(
        &store,
        "REPLACE INTO role_permissions (role_id, permission_id, can_access, is_visible) \
         SELECT r.id, p.id, 0, 0 FROM roles r, permissions p \
         WHERE r.name = 'operator' AND p.code = 'view_qc'",
    )
    .await;
    exec(
        &store,
        "REPLACE INTO user_permissions (user_id, permission_id, can_access, is_visible) \
         SELECT 900001, id, 1, 1 FROM permissions WHERE code = 'view_qc'",
    )
    .await;

    let grants = store.role_grants(&RoleName::new("operator")).await.unwrap();
    assert!(grants.iter().any(|g| g.code.as_str() == "view_qc" && !g.can_access));

    let engine = AclEngine::new(Arc::new(store), AclConfig::default());
    let caller = Caller::new(UserId::new(900001), "operator");
    assert!(engine.has_permission(&caller, "view_qc").await.unwrap());
    let other = Caller::new(UserId::new(900002), "operator");
    assert!(!engine.has_permission(&other, "view_qc").await.unwrap());
}

#[tokio::test]
#[ignore]
async fn test_warehouse_assignments_restrict() {
    let store = store().await;
    exec(&store, "DELETE FROM user_warehouses WHERE user_id IN (900011, 900012)").await;
    exec(
        &store,
        "INSERT INTO user_warehouses (user_id, warehouse_id, is_default) VALUES (900011, 3, 1)",
    )
    .await;

    let rows = store.warehouse_assignments(UserId::new(900011)).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].is_default);

    let engine = AclEngine::new(Arc::new(store), AclConfig::default());
    let restricted = Caller::new(UserId::new(900011), "operator");
    let scope = engine.resolve_warehouse_scope(&restricted).await.unwrap();
    assert!(scope.allows(WarehouseId::new(3)));
    assert!(!scope.allows(WarehouseId::new(5)));

    let unassigned = Caller::new(UserId::new(900012), "operator");
    let scope = engine.resolve_warehouse_scope(&unassigned).await.unwrap();
    assert!(scope.is_unrestricted());
}

#[tokio::test]
#[ignore]
async fn test_reshaped_roles_table_means_legacy() {
    // one connection, so the session-scoped table below shadows `roles` for
    // every query the store runs
    let store = store_with(1).await;
    exec(&store, "CREATE TEMPORARY TABLE roles (id BIGINT PRIMARY KEY)").await;

    let err = store.probe_permission_schema().await.unwrap_err();
    assert!(matches!(err, depot_acl::Error::SchemaUnavailable(_)));
    store.probe_warehouse_schema().await.unwrap();

    let engine = AclEngine::new(Arc::new(store), AclConfig::default());
    let caps = engine.capabilities().await;
    assert!(caps.is_legacy());
    assert!(caps.warehouse_scoping);

    let caller = Caller::new(UserId::new(900021), "operator");
    assert!(engine.has_permission(&caller, "view_qc").await.unwrap());
}
