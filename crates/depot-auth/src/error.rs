//! Authentication and authorization error types.
//!
//! [`AuthError`] covers token validation. [`AccessError`] is what the
//! middleware layers reject a request with; it renders as a JSON body of the
//! form `{"error": {"category": ..., "message": ..., ...}}`.

use axum::response::{IntoResponse, Response};
use depot_core::PermissionCode;
use http::StatusCode;
use serde_json::{Value, json};

// ============================================================================
// AuthError
// ============================================================================

/// Errors that can occur during authentication.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AuthError {
    /// No Authorization header or bearer token present.
    #[error("missing authentication token")]
    MissingToken,

    /// Token format is invalid (not a valid JWT).
    #[error("invalid token format: {0}")]
    InvalidFormat(String),

    /// JWT signature verification failed.
    #[error("invalid token signature: {0}")]
    InvalidSignature(String),

    /// Token has expired.
    #[error("token has expired")]
    Expired,

    /// Token was issued by someone else.
    #[error("invalid issuer")]
    InvalidIssuer,

    /// A required claim is absent or malformed.
    #[error("invalid claim '{claim}': {reason}")]
    InvalidClaim {
        /// Claim name.
        claim: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// The validator is misconfigured.
    #[error("validator misconfigured: {0}")]
    Misconfigured(String),
}

impl AuthError {
    /// Whether this error should result in a 401 (vs. a 500).
    pub fn is_client_error(&self) -> bool {
        !matches!(self, AuthError::Misconfigured(_))
    }
}

// ============================================================================
// AccessError
// ============================================================================

/// Why a request was rejected by an authorization layer.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AccessError {
    /// No authenticated caller on the request.
    #[error("authentication required")]
    Unauthenticated,

    /// None of the required codes are granted.
    #[error("insufficient permissions")]
    MissingAnyOf {
        /// Every code that would have sufficed.
        required: Vec<PermissionCode>,
    },

    /// Some of the required codes are not granted.
    #[error("insufficient permissions")]
    MissingAllOf {
        /// The codes that are not granted.
        missing: Vec<PermissionCode>,
    },

    /// The requested warehouse is outside the caller's scope.
    #[error("access to warehouse {warehouse} denied")]
    WarehouseDenied {
        /// The warehouse id as it appeared in the request.
        warehouse: String,
    },

    /// The request body could not be read.
    #[error("invalid request body")]
    InvalidBody,

    /// Authority could not be resolved.
    #[error("permission check failed")]
    ResolutionFailed(#[source] depot_acl::Error),
}

impl AccessError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::MissingAnyOf { .. } | Self::MissingAllOf { .. } | Self::WarehouseDenied { .. } => {
                StatusCode::FORBIDDEN
            }
            Self::InvalidBody => StatusCode::BAD_REQUEST,
            Self::ResolutionFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Error category reported to the client.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "authentication",
            Self::MissingAnyOf { .. } | Self::MissingAllOf { .. } | Self::WarehouseDenied { .. } => {
                "authorization"
            }
            Self::InvalidBody => "request",
            Self::ResolutionFailed(_) => "internal",
        }
    }

    /// The JSON body. Never carries internal detail such as cache state,
    /// capability mode, or store errors.
    pub fn body(&self) -> Value {
        let mut error = json!({
            "category": self.category(),
            "message": self.to_string(),
        });
        match self {
            Self::MissingAnyOf { required } => error["required"] = json!(required),
            Self::MissingAllOf { missing } => error["missing"] = json!(missing),
            Self::WarehouseDenied { warehouse } => {
                error["warehouse_id"] = warehouse
                    .trim()
                    .parse::<i64>()
                    .map(Value::from)
                    .unwrap_or_else(|_| Value::String(warehouse.clone()));
            }
            _ => {}
        }
        json!({ "error": error })
    }
}

impl IntoResponse for AccessError {
    fn into_response(self) -> Response {
        let mut response = (
            self.status(),
            [(http::header::CONTENT_TYPE, "application/json")],
            self.body().to_string(),
        )
            .into_response();

        if matches!(self, Self::Unauthenticated) {
            response.headers_mut().insert(
                http::header::WWW_AUTHENTICATE,
                http::HeaderValue::from_static(r#"Bearer realm="depot""#),
            );
        }
        response
    }
}
