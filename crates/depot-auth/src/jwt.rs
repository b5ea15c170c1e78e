//! HS256 JWT validation.
//!
//! Tokens carry the numeric user id in `sub`, the role in `role`, and
//! optionally the session warehouse in `warehouse_id` and a display name in
//! `name`.

use std::future::Future;
use std::pin::Pin;

use depot_core::{RoleName, UserId, WarehouseId};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::{AuthConfig, AuthError, AuthenticatedUser, TokenValidator};

/// Claims issued by the WMS login endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id, as a decimal string.
    pub sub: String,
    /// Role name.
    pub role: String,
    /// Session warehouse.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warehouse_id: Option<i64>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Issuer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    /// Expiry, seconds since the epoch.
    pub exp: u64,
}

impl Claims {
    fn into_user(self) -> Result<AuthenticatedUser, AuthError> {
        let user_id: i64 = self.sub.trim().parse().map_err(|_| AuthError::InvalidClaim {
            claim: "sub",
            reason: format!("'{}' is not a user id", self.sub),
        })?;
        let role = RoleName::new(&self.role);
        if role.as_str().is_empty() {
            return Err(AuthError::InvalidClaim {
                claim: "role",
                reason: "empty".to_string(),
            });
        }
        Ok(AuthenticatedUser {
            user_id: UserId::new(user_id),
            username: self.name,
            role,
            warehouse_id: self.warehouse_id.map(WarehouseId::new),
        })
    }
}

/// Validates HS256-signed session tokens with a shared secret.
pub struct JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl JwtValidator {
    /// Creates a validator for tokens signed with `secret`.
    pub fn new(secret: &str, issuer: Option<&str>) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::Misconfigured("empty JWT secret".to_string()));
        }
        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
        }
        Ok(Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    /// Validates `token` and returns the identity it carries.
    pub fn validate_token(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
                jsonwebtoken::errors::ErrorKind::InvalidToken
                | jsonwebtoken::errors::ErrorKind::Base64(_)
                | jsonwebtoken::errors::ErrorKind::Json(_)
                | jsonwebtoken::errors::ErrorKind::Utf8(_) => AuthError::InvalidFormat(e.to_string()),
                _ => AuthError::InvalidSignature(e.to_string()),
            }
        })?;
        data.claims.into_user()
    }
}

impl TokenValidator for JwtValidator {
    fn validate(
        &self,
        token: &str,
        _config: &AuthConfig,
    ) -> Pin<Box<dyn Future<Output = Result<AuthenticatedUser, AuthError>> + Send + '_>> {
        let result = self.validate_token(token);
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode, get_current_timestamp};

    const SECRET: &str = "test-secret";

    fn claims(sub: &str, role: &str) -> Claims {
        Claims {
            sub: sub.to_string(),
            role: role.to_string(),
            warehouse_id: Some(3),
            name: Some("alice".to_string()),
            iss: None,
            exp: get_current_timestamp() + 3600,
        }
    }

    fn sign(claims: &Claims, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_valid_token() {
        let validator = JwtValidator::new(SECRET, None).unwrap();
        let user = validator
            .validate_token(&sign(&claims("42", "Operator"), SECRET))
            .unwrap();
        assert_eq!(user.user_id, UserId::new(42));
        assert_eq!(user.role.as_str(), "operator");
        assert_eq!(user.warehouse_id, Some(WarehouseId::new(3)));
        assert_eq!(user.username.as_deref(), Some("alice"));
    }

    #[test]
    fn test_wrong_secret() {
        let validator = JwtValidator::new(SECRET, None).unwrap();
        let err = validator
            .validate_token(&sign(&claims("42", "operator"), "other"))
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidSignature(_)));
    }

    #[test]
    fn test_expired() {
        let validator = JwtValidator::new(SECRET, None).unwrap();
        let mut c = claims("42", "operator");
        c.exp = get_current_timestamp() - 3600;
        let err = validator.validate_token(&sign(&c, SECRET)).unwrap_err();
        assert!(matches!(err, AuthError::Expired));
    }

    #[test]
    fn test_non_numeric_subject() {
        let validator = JwtValidator::new(SECRET, None).unwrap();
        let err = validator
            .validate_token(&sign(&claims("alice", "operator"), SECRET))
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidClaim { claim: "sub", .. }));
    }

    #[test]
    fn test_issuer_enforced() {
        let validator = JwtValidator::new(SECRET, Some("depot")).unwrap();
        let err = validator
            .validate_token(&sign(&claims("42", "operator"), SECRET))
            .unwrap_err();
        assert!(err.is_client_error());

        let mut c = claims("42", "operator");
        c.iss = Some("depot".to_string());
        assert!(validator.validate_token(&sign(&c, SECRET)).is_ok());
    }

    #[test]
    fn test_garbage_token() {
        let validator = JwtValidator::new(SECRET, None).unwrap();
        assert!(validator.validate_token("not-a-jwt").is_err());
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(matches!(
            JwtValidator::new("", None),
            Err(AuthError::Misconfigured(_))
        ));
    }
}
