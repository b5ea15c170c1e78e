//! Authentication and authorization middleware for Depot.
//!
//! Provides:
//! - [`AuthenticatedUser`]: identity extracted from a validated session token
//! - [`TokenValidator`]: trait for async token validation, with [`JwtValidator`] for HS256
//! - [`AuthLayer`] / [`AuthService`]: Tower middleware attaching the identity
//! - [`RequirePermission`]: any-of / all-of permission gates
//! - [`RequireWarehouseAccess`]: rejects requests for out-of-scope warehouses
//! - [`InjectWarehouseFilter`]: attaches a [`WarehouseContext`] for handlers
//! - [`AccessError`]: structured 401 / 403 / 500 responses
//!
//! Layering order, outermost first: `AuthLayer`, then the permission and
//! warehouse layers (as `route_layer`), then the handler.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

mod error;
mod jwt;
mod middleware;
mod permission;
mod user;
mod warehouse;

#[cfg(test)]
mod testing;

use serde::{Deserialize, Serialize};

pub use error::{AccessError, AuthError};
pub use jwt::{Claims, JwtValidator};
pub use middleware::{AuthLayer, AuthService};
pub use permission::{RequirePermission, RequirePermissionService, Requirement};
pub use user::{AuthenticatedUser, caller_from_parts, user_from_parts};
pub use warehouse::{
    InjectWarehouseFilter, InjectWarehouseFilterService, RequireWarehouseAccess,
    RequireWarehouseAccessService, WarehouseAccessConfig, WarehouseContext,
    warehouse_context_from_parts,
};

/// Configuration for the auth middleware.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Whether authentication is enabled. When false, requests pass through
    /// without an identity.
    pub enabled: bool,
    /// Expected `iss` claim, if tokens must carry one.
    pub issuer: Option<String>,
}

/// Trait for validating tokens and extracting user identity.
///
/// The middleware calls `validate()` with the bearer token and attaches the
/// returned user to the request on success.
pub trait TokenValidator: Send + Sync + 'static {
    /// Validate a token and return the authenticated user.
    fn validate(
        &self,
        token: &str,
        config: &AuthConfig,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<AuthenticatedUser, AuthError>> + Send + '_>,
    >;
}
