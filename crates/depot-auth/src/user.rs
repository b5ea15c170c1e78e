//! Authenticated caller identity and extraction helpers.

use axum::extract::FromRequestParts;
use depot_core::{Caller, RoleName, UserId, WarehouseId};
use serde::Serialize;

use crate::error::AccessError;

/// An authenticated user identity, extracted from a validated token.
///
/// Stored in HTTP request extensions by [`AuthLayer`](crate::AuthLayer) and
/// read by every authorization layer downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedUser {
    /// Numeric user id.
    pub user_id: UserId,
    /// Display name, when the token carries one.
    pub username: Option<String>,
    /// Role name.
    pub role: RoleName,
    /// Warehouse baked into the session at login, if any.
    pub warehouse_id: Option<WarehouseId>,
}

impl AuthenticatedUser {
    /// An identity with no name and no session warehouse.
    pub fn new(user_id: UserId, role: impl Into<RoleName>) -> Self {
        Self {
            user_id,
            username: None,
            role: role.into(),
            warehouse_id: None,
        }
    }

    /// Sets the session warehouse.
    pub fn with_warehouse(mut self, warehouse_id: WarehouseId) -> Self {
        self.warehouse_id = Some(warehouse_id);
        self
    }

    /// The identity the permission engine resolves against.
    pub fn caller(&self) -> Caller {
        Caller {
            user_id: self.user_id,
            role: self.role.clone(),
            warehouse_id: self.warehouse_id,
        }
    }
}

/// Extract the `AuthenticatedUser` from HTTP request `Parts`, if present.
pub fn user_from_parts(parts: &http::request::Parts) -> Option<&AuthenticatedUser> {
    parts.extensions.get::<AuthenticatedUser>()
}

/// Extract the engine-facing [`Caller`] from HTTP request `Parts`, if present.
pub fn caller_from_parts(parts: &http::request::Parts) -> Option<Caller> {
    user_from_parts(parts).map(AuthenticatedUser::caller)
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AccessError;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        user_from_parts(parts)
            .cloned()
            .ok_or(AccessError::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts_with_user() -> http::request::Parts {
        let (mut parts, _body) = http::Request::new(()).into_parts();
        parts.extensions.insert(
            AuthenticatedUser::new(UserId::new(7), "Operator").with_warehouse(WarehouseId::new(2)),
        );
        parts
    }

    fn parts_without_user() -> http::request::Parts {
        let (parts, _body) = http::Request::new(()).into_parts();
        parts
    }

    #[test]
    fn test_user_from_parts_present() {
        let parts = parts_with_user();
        let user = user_from_parts(&parts).unwrap();
        assert_eq!(user.user_id, UserId::new(7));
        assert_eq!(user.role.as_str(), "operator");
    }

    #[test]
    fn test_user_from_parts_absent() {
        assert!(user_from_parts(&parts_without_user()).is_none());
        assert!(caller_from_parts(&parts_without_user()).is_none());
    }

    #[test]
    fn test_caller_from_parts_carries_session_warehouse() {
        let caller = caller_from_parts(&parts_with_user()).unwrap();
        assert_eq!(caller.warehouse_id, Some(WarehouseId::new(2)));
    }

    #[tokio::test]
    async fn test_extractor_rejects_anonymous() {
        let mut parts = parts_without_user();
        let err = AuthenticatedUser::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::Unauthenticated));

        let mut parts = parts_with_user();
        let user = AuthenticatedUser::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(user.user_id, UserId::new(7));
    }
}
