//! Warehouse scoping layers.
//!
//! [`RequireWarehouseAccess`] rejects requests that name a warehouse outside
//! the caller's scope. [`InjectWarehouseFilter`] never rejects; it attaches a
//! [`WarehouseContext`] that handlers apply to their own queries.
//!
//! The requested warehouse is looked up in this order: the caller's session
//! warehouse, the JSON body field, the path parameter, the query parameter.
//! A request that names no warehouse passes.

use std::collections::HashMap;
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::{Body, Bytes};
use axum::extract::{FromRequestParts, Query, RawPathParams};
use axum::response::IntoResponse;
use depot_acl::{AclEngine, WarehouseAllowList, WarehouseFilter, WarehouseScope};
use depot_core::WarehouseId;
use futures::StreamExt;
use http::request::Parts;
use http::{HeaderMap, Request, Uri};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use tower::{Layer, Service};

use crate::error::AccessError;
use crate::user::AuthenticatedUser;

// ============================================================================
// Configuration
// ============================================================================

/// Where requests carry warehouse ids, and how filters are rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarehouseAccessConfig {
    /// JSON body field and query parameter name.
    pub warehouse_field: String,
    /// Route path parameter name.
    pub warehouse_path_param: String,
    /// Column name used in the injected [`WarehouseFilter`].
    pub filter_column: String,
    /// Largest JSON body buffered to look for the warehouse field.
    pub max_body_bytes: usize,
}

impl Default for WarehouseAccessConfig {
    fn default() -> Self {
        Self {
            warehouse_field: "warehouse_id".to_string(),
            warehouse_path_param: "warehouseId".to_string(),
            filter_column: "warehouse_id".to_string(),
            max_body_bytes: 1024 * 1024,
        }
    }
}

// ============================================================================
// WarehouseContext
// ============================================================================

/// Warehouse scope attached to a request for handlers to apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WarehouseContext {
    /// `None` when unrestricted, otherwise the explicit allow-list.
    pub accessible_warehouses: Option<Vec<WarehouseId>>,
    /// The warehouse the caller works in by default.
    pub default_warehouse_id: Option<WarehouseId>,
    /// Predicate for scoping queries.
    pub warehouse_filter: WarehouseFilter,
}

impl WarehouseContext {
    /// Builds the context for `scope`, given the caller's session warehouse.
    pub fn from_scope(scope: &WarehouseScope, session: Option<WarehouseId>, column: &str) -> Self {
        Self {
            accessible_warehouses: scope.accessible(),
            default_warehouse_id: scope.default_warehouse(session),
            warehouse_filter: scope.filter(column),
        }
    }

    /// Whether `id` is accessible.
    pub fn allows(&self, id: WarehouseId) -> bool {
        match &self.accessible_warehouses {
            None => true,
            Some(ids) => ids.contains(&id),
        }
    }
}

/// Extract the `WarehouseContext` from HTTP request `Parts`, if present.
pub fn warehouse_context_from_parts(parts: &Parts) -> Option<&WarehouseContext> {
    parts.extensions.get::<WarehouseContext>()
}

// ============================================================================
// Requested warehouse lookup
// ============================================================================

async fn requested_warehouse(
    req: Request<Body>,
    user: &AuthenticatedUser,
    config: &WarehouseAccessConfig,
) -> Result<(Request<Body>, Option<String>), AccessError> {
    if let Some(session) = user.warehouse_id {
        return Ok((req, Some(session.to_string())));
    }

    let (mut parts, body) = req.into_parts();

    let (body, mut found) = if is_json(&parts.headers) {
        match buffer_body(body, &parts.headers, config.max_body_bytes).await? {
            Buffered::Complete(bytes) => {
                let found = body_field(&bytes, &config.warehouse_field);
                (Body::from(bytes), found)
            }
            Buffered::Oversized(body) => {
                log::debug!(
                    "JSON body over {} bytes not inspected for a warehouse id",
                    config.max_body_bytes
                );
                (body, None)
            }
        }
    } else {
        (body, None)
    };

    if found.is_none() {
        found = path_param(&mut parts, &config.warehouse_path_param).await;
    }
    if found.is_none() {
        found = query_param(&parts.uri, &config.warehouse_field);
    }

    Ok((Request::from_parts(parts, body), found))
}

/// A request body read up to a byte limit.
enum Buffered {
    /// The whole body.
    Complete(Bytes),
    /// Over the limit. The body is handed on intact and uninspected.
    Oversized(Body),
}

async fn buffer_body(body: Body, headers: &HeaderMap, limit: usize) -> Result<Buffered, AccessError> {
    let declared = headers
        .get(http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    if declared.is_some_and(|len| len > limit as u64) {
        return Ok(Buffered::Oversized(body));
    }

    let mut stream = body.into_data_stream();
    let mut chunks: Vec<Bytes> = Vec::new();
    let mut size = 0usize;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|_| AccessError::InvalidBody)?;
        size += chunk.len();
        chunks.push(chunk);
        if size > limit {
            let head = futures::stream::iter(chunks.into_iter().map(Ok::<_, axum::Error>));
            return Ok(Buffered::Oversized(Body::from_stream(head.chain(stream))));
        }
    }
    Ok(Buffered::Complete(Bytes::from(chunks.concat())))
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|mime| {
            let mime = mime.trim();
            mime.eq_ignore_ascii_case("application/json") || mime.ends_with("+json")
        })
        .unwrap_or(false)
}

fn body_field(bytes: &Bytes, field: &str) -> Option<String> {
    let value: Value = serde_json::from_slice(bytes).ok()?;
    match value.get(field)? {
        Value::Null => None,
        Value::String(s) => non_empty(s),
        Value::Number(n) => Some(integral(n).map_or_else(|| n.to_string(), |id| id.to_string())),
        // named but not an id: reported as-is so the gate rejects it
        other => Some(other.to_string()),
    }
}

/// `3` and `3.0` both name warehouse 3.
fn integral(n: &Number) -> Option<i64> {
    n.as_i64().or_else(|| {
        n.as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
            .map(|f| f as i64)
    })
}

async fn path_param(parts: &mut Parts, name: &str) -> Option<String> {
    let params = RawPathParams::from_request_parts(parts, &()).await.ok()?;
    params
        .iter()
        .find(|(key, _)| *key == name)
        .and_then(|(_, value)| non_empty(value))
}

fn query_param(uri: &Uri, name: &str) -> Option<String> {
    let Query(params) = Query::<HashMap<String, String>>::try_from_uri(uri).ok()?;
    params.get(name).and_then(|v| non_empty(v))
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

// ============================================================================
// RequireWarehouseAccess
// ============================================================================

/// Tower `Layer` rejecting requests for warehouses outside the caller's scope.
///
/// Apply with `route_layer` so path parameters are available.
#[derive(Clone)]
pub struct RequireWarehouseAccess {
    engine: AclEngine,
    config: WarehouseAccessConfig,
}

impl RequireWarehouseAccess {
    /// Creates the layer.
    pub fn new(engine: AclEngine, config: WarehouseAccessConfig) -> Self {
        Self { engine, config }
    }
}

impl<S> Layer<S> for RequireWarehouseAccess {
    type Service = RequireWarehouseAccessService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequireWarehouseAccessService {
            inner,
            engine: self.engine.clone(),
            config: self.config.clone(),
        }
    }
}

/// Service wrapper for [`RequireWarehouseAccess`].
#[derive(Clone)]
pub struct RequireWarehouseAccessService<S> {
    inner: S,
    engine: AclEngine,
    config: WarehouseAccessConfig,
}

impl<S> Service<Request<Body>> for RequireWarehouseAccessService<S>
where
    S: Service<Request<Body>, Error = Infallible> + Clone + Send + 'static,
    S::Response: IntoResponse,
    S::Future: Send,
{
    type Response = axum::response::Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let engine = self.engine.clone();
        let config = self.config.clone();

        Box::pin(async move {
            let Some(user) = req.extensions().get::<AuthenticatedUser>().cloned() else {
                return Ok(AccessError::Unauthenticated.into_response());
            };

            let scope = match engine.resolve_warehouse_scope(&user.caller()).await {
                Ok(scope) => scope,
                Err(e) => {
                    log::error!("Warehouse scope resolution failed for user {}: {e}", user.user_id);
                    return Ok(AccessError::ResolutionFailed(e).into_response());
                }
            };

            let req = if scope.is_unrestricted() {
                req
            } else {
                let (req, requested) = match requested_warehouse(req, &user, &config).await {
                    Ok(found) => found,
                    Err(e) => return Ok(e.into_response()),
                };
                if let Some(raw) = requested {
                    let allowed = WarehouseId::parse(&raw).is_ok_and(|id| scope.allows(id));
                    if !allowed {
                        log::info!(
                            "Warehouse access denied for user {} ({}): warehouse {raw}",
                            user.user_id,
                            user.role
                        );
                        return Ok(AccessError::WarehouseDenied { warehouse: raw }.into_response());
                    }
                }
                req
            };

            let resp = inner
                .call(req)
                .await
                .unwrap_or_else(|infallible| match infallible {});
            Ok(resp.into_response())
        })
    }
}

// ============================================================================
// InjectWarehouseFilter
// ============================================================================

/// Tower `Layer` attaching a [`WarehouseContext`] to authenticated requests.
///
/// Never rejects. Anonymous requests pass through untouched. When the scope
/// cannot be resolved the attached context allows no warehouse.
#[derive(Clone)]
pub struct InjectWarehouseFilter {
    engine: AclEngine,
    filter_column: String,
}

impl InjectWarehouseFilter {
    /// Creates the layer.
    pub fn new(engine: AclEngine, config: &WarehouseAccessConfig) -> Self {
        Self {
            engine,
            filter_column: config.filter_column.clone(),
        }
    }
}

impl<S> Layer<S> for InjectWarehouseFilter {
    type Service = InjectWarehouseFilterService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        InjectWarehouseFilterService {
            inner,
            engine: self.engine.clone(),
            filter_column: self.filter_column.clone(),
        }
    }
}

/// Service wrapper for [`InjectWarehouseFilter`].
#[derive(Clone)]
pub struct InjectWarehouseFilterService<S> {
    inner: S,
    engine: AclEngine,
    filter_column: String,
}

impl<S> Service<Request<Body>> for InjectWarehouseFilterService<S>
where
    S: Service<Request<Body>, Error = Infallible> + Clone + Send + 'static,
    S::Response: IntoResponse,
    S::Future: Send,
{
    type Response = axum::response::Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let engine = self.engine.clone();
        let column = self.filter_column.clone();

        Box::pin(async move {
            let user = req.extensions().get::<AuthenticatedUser>().cloned();
            if let Some(user) = user {
                let context = match engine.resolve_warehouse_scope(&user.caller()).await {
                    Ok(scope) => WarehouseContext::from_scope(&scope, user.warehouse_id, &column),
                    Err(e) => {
                        log::error!(
                            "Warehouse scope resolution failed for user {}: {e}",
                            user.user_id
                        );
                        let nothing = WarehouseScope::Restricted(WarehouseAllowList::default());
                        WarehouseContext::from_scope(&nothing, None, &column)
                    }
                };
                req.extensions_mut().insert(context);
            }

            let resp = inner
                .call(req)
                .await
                .unwrap_or_else(|infallible| match infallible {});
            Ok(resp.into_response())
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
