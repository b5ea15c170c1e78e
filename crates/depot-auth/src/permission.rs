//! Route-level permission gates.
//!
//! [`RequirePermission`] wraps a route with an any-of or all-of check against
//! the caller's effective permissions. Bypass states (super admin, legacy
//! mode) always pass.
//!
//! ```rust,ignore
//! Router::new()
//!     .route("/inbound", post(create_inbound))
//!     .route_layer(RequirePermission::any(engine.clone(), ["create_inbound"]))
//!     .route("/qc/{id}/approve", post(approve))
//!     .route_layer(RequirePermission::all(engine, ["view_qc", "approve_qc"]));
//! ```

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::response::IntoResponse;
use depot_acl::{AclEngine, PermissionCheck};
use depot_core::PermissionCode;
use http::Request;
use tower::{Layer, Service};

use crate::error::AccessError;
use crate::user::AuthenticatedUser;

/// How multiple required codes combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// At least one code must be granted.
    Any,
    /// Every code must be granted.
    All,
}

/// Tower `Layer` gating a route on permission codes.
#[derive(Clone)]
pub struct RequirePermission {
    engine: AclEngine,
    codes: Arc<[PermissionCode]>,
    requirement: Requirement,
}

impl RequirePermission {
    /// Passes when the caller holds at least one of `codes`.
    pub fn any<I, C>(engine: AclEngine, codes: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<PermissionCode>,
    {
        Self::new(engine, codes, Requirement::Any)
    }

    /// Passes only when the caller holds every one of `codes`.
    pub fn all<I, C>(engine: AclEngine, codes: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<PermissionCode>,
    {
        Self::new(engine, codes, Requirement::All)
    }

    fn new<I, C>(engine: AclEngine, codes: I, requirement: Requirement) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<PermissionCode>,
    {
        Self {
            engine,
            codes: codes.into_iter().map(Into::into).collect(),
            requirement,
        }
    }
}

impl<S> Layer<S> for RequirePermission {
    type Service = RequirePermissionService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequirePermissionService {
            inner,
            engine: self.engine.clone(),
            codes: self.codes.clone(),
            requirement: self.requirement,
        }
    }
}

/// Service wrapper for [`RequirePermission`].
#[derive(Clone)]
pub struct RequirePermissionService<S> {
    inner: S,
    engine: AclEngine,
    codes: Arc<[PermissionCode]>,
    requirement: Requirement,
}

impl<S> Service<Request<Body>> for RequirePermissionService<S>
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
        let codes = self.codes.clone();
        let requirement = self.requirement;

        Box::pin(async move {
            let Some(caller) = req.extensions().get::<AuthenticatedUser>().map(|u| u.caller())
            else {
                return Ok(AccessError::Unauthenticated.into_response());
            };

            let check = match requirement {
                Requirement::Any => engine.check_any(&caller, &codes[..]).await,
                Requirement::All => engine.check_all(&caller, &codes[..]).await,
            };

            match check {
                Ok(PermissionCheck::Granted) => {
                    let resp = inner
                        .call(req)
                        .await
                        .unwrap_or_else(|infallible| match infallible {});
                    Ok(resp.into_response())
                }
                Ok(PermissionCheck::Denied { codes: denied }) => {
                    log::info!(
                        "Permission denied for user {} ({}): {:?} {}",
                        caller.user_id,
                        caller.role,
                        requirement,
                        join(&denied)
                    );
                    let err = match requirement {
                        Requirement::Any => AccessError::MissingAnyOf { required: denied },
                        Requirement::All => AccessError::MissingAllOf { missing: denied },
                    };
                    Ok(err.into_response())
                }
                Err(e) => {
                    log::error!("Permission check failed for user {}: {e}", caller.user_id);
                    Ok(AccessError::ResolutionFailed(e).into_response())
                }
            }
        })
    }
}

fn join(codes: &[PermissionCode]) -> String {
    codes
        .iter()
        .map(PermissionCode::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
