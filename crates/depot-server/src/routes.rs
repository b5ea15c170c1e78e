//! HTTP routes.
//!
//! | Method | Path | Gate |
//! |---|---|---|
//! | GET | `/health` | none |
//! | GET | `/api/permissions/me` | authenticated |
//! | GET | `/api/permissions/catalog` | authenticated |
//! | GET | `/api/warehouses/{warehouseId}/access` | warehouse scope |
//! | GET | `/api/permissions/status` | `manage_roles` or `manage_users` |
//! | POST | `/api/permissions/cache/clear` | `manage_roles` or `manage_users` |

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use depot_acl::AclEngine;
use depot_auth::{
    AccessError, AuthLayer, AuthenticatedUser, InjectWarehouseFilter, RequirePermission,
    RequireWarehouseAccess, TokenValidator, WarehouseAccessConfig, WarehouseContext,
};
use depot_core::{EffectivePermission, Permission, PermissionCode, UserId, WarehouseId};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Codes that unlock the administrative endpoints.
pub const ADMIN_CODES: [&str; 2] = ["manage_roles", "manage_users"];

/// Shared handler state.
#[derive(Clone, Debug)]
pub struct AppState {
    /// The permission engine.
    pub engine: AclEngine,
}

/// Builds the application router.
pub fn router<V: TokenValidator>(
    state: AppState,
    auth: AuthLayer<V>,
    warehouse: WarehouseAccessConfig,
) -> Router {
    let engine = state.engine.clone();

    let caller = Router::new()
        .route("/api/permissions/me", get(me))
        .route("/api/permissions/catalog", get(catalog))
        .route_layer(InjectWarehouseFilter::new(engine.clone(), &warehouse));

    let scoped = Router::new()
        .route("/api/warehouses/{warehouseId}/access", get(warehouse_access))
        .route_layer(RequireWarehouseAccess::new(engine.clone(), warehouse));

    let admin = Router::new()
        .route("/api/permissions/status", get(status))
        .route("/api/permissions/cache/clear", post(clear_cache))
        .route_layer(RequirePermission::any(engine, ADMIN_CODES));

    let api = Router::new()
        .merge(caller)
        .merge(scoped)
        .merge(admin)
        .with_state(state)
        .layer(auth);

    Router::new().route("/health", get(health)).merge(api)
}

// ============================================================================
// Handlers
// ============================================================================

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Response of `GET /api/permissions/me`.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    /// Who the caller is.
    pub user: AuthenticatedUser,
    /// Every decision for the caller.
    pub permissions: Vec<EffectivePermission>,
    /// Codes whose UI element should be shown.
    pub visible: Vec<PermissionCode>,
    /// The caller's warehouse scope.
    pub warehouses: Option<WarehouseContext>,
}

async fn me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    warehouses: Option<Extension<WarehouseContext>>,
) -> Result<Json<MeResponse>, AccessError> {
    let caller = user.caller();
    let permissions = state
        .engine
        .effective_permissions(&caller)
        .await
        .map_err(AccessError::ResolutionFailed)?;
    let visible = state
        .engine
        .visible_permissions(&caller)
        .await
        .map_err(AccessError::ResolutionFailed)?;
    Ok(Json(MeResponse {
        user,
        permissions,
        visible,
        warehouses: warehouses.map(|Extension(ctx)| ctx),
    }))
}

async fn catalog(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Json<Vec<Permission>> {
    Json(state.engine.catalog().iter().cloned().collect())
}

async fn warehouse_access(
    axum::extract::Path(warehouse_id): axum::extract::Path<i64>,
    _user: AuthenticatedUser,
) -> Json<Value> {
    Json(json!({ "warehouse_id": WarehouseId::new(warehouse_id), "allowed": true }))
}

async fn status(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "capabilities": state.engine.capability_state(),
        "cache": state.engine.cache_stats().await,
    }))
}

/// Body of `POST /api/permissions/cache/clear`.
#[derive(Debug, Default, Deserialize)]
pub struct ClearCacheRequest {
    /// Clear only this user; omit to clear everything.
    #[serde(default)]
    pub user_id: Option<i64>,
}

async fn clear_cache(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    body: Option<Json<ClearCacheRequest>>,
) -> Json<Value> {
    let target = body.and_then(|Json(req)| req.user_id).map(UserId::new);
    log::info!(
        "User {} cleared the permission cache ({})",
        user.user_id,
        target.map_or_else(|| "all users".to_string(), |u| format!("user {u}"))
    );
    state.engine.clear_permission_cache(target).await;
    Json(json!({ "cleared": target.map_or(Value::String("all".to_string()), |u| json!(u)) }))
}
