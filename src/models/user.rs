//! User model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::AppError;
use crate::repository::Entity;

/// Full user model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i32,
    pub phone_number: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Hashed password (argon2)
    #[serde(skip_serializing)]
    pub password: String,
    pub is_reader: bool,
    pub is_admin: bool,
}

impl Entity for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "phone_number",
        "first_name",
        "last_name",
        "email",
        "password",
        "is_reader",
        "is_admin",
    ];
}

impl User {
    /// Require admin privileges
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin {
            Ok(())
        } else {
            Err(AppError::Authorization(
                "Administrator privileges required".to_string(),
            ))
        }
    }
}

/// JWT claims for authenticated users
///
/// `sub` defaults to empty when the claim is absent so that a missing
/// subject can be reported separately from a malformed token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    #[serde(default)]
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse and verify a JWT token (signature, algorithm, expiration)
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }
}

/// Self-service registration request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterUser {
    #[validate(length(min = 5, message = "Phone number must be at least 5 characters"))]
    pub phone_number: String,
    #[validate(length(min = 1, message = "First name must not be empty"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name must not be empty"))]
    pub last_name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 5, message = "Password must be at least 5 characters"))]
    pub password: String,
}

/// Create user request (admin)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[validate(length(min = 5, message = "Phone number must be at least 5 characters"))]
    pub phone_number: String,
    #[validate(length(min = 1, message = "First name must not be empty"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name must not be empty"))]
    pub last_name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 5, message = "Password must be at least 5 characters"))]
    pub password: String,
    pub is_reader: Option<bool>,
    pub is_admin: Option<bool>,
}

/// Update user request (admin)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUser {
    #[validate(length(min = 5, message = "Phone number must be at least 5 characters"))]
    pub phone_number: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(min = 5, message = "Password must be at least 5 characters"))]
    pub password: Option<String>,
    pub is_reader: Option<bool>,
    pub is_admin: Option<bool>,
}

/// Login request
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// User list query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct UserQuery {
    /// Exact-match filter on email
    pub email: Option<String>,
    /// Filter by admin flag
    pub is_admin: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::errors::ErrorKind;

    const SECRET: &str = "unit-test-secret";

    fn claims_with_exp(exp: i64) -> UserClaims {
        let now = Utc::now().timestamp();
        UserClaims {
            sub: "42".to_string(),
            exp,
            iat: now,
        }
    }

    #[test]
    fn test_token_round_trip() {
        let claims = claims_with_exp(Utc::now().timestamp() + 3600);
        let token = claims.create_token(SECRET).unwrap();
        let parsed = UserClaims::from_token(&token, SECRET).unwrap();
        assert_eq!(parsed.sub, "42");
    }

    #[test]
    fn test_expired_token_rejected() {
        // Far enough in the past to clear the default leeway
        let claims = claims_with_exp(Utc::now().timestamp() - 7200);
        let token = claims.create_token(SECRET).unwrap();
        let err = UserClaims::from_token(&token, SECRET).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ExpiredSignature));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let claims = claims_with_exp(Utc::now().timestamp() + 3600);
        let token = claims.create_token(SECRET).unwrap();
        let err = UserClaims::from_token(&token, "other-secret").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidSignature));
    }

    #[test]
    fn test_missing_exp_rejected() {
        use jsonwebtoken::{encode, EncodingKey, Header};
        use serde::Serialize;

        #[derive(Serialize)]
        struct NoExp {
            sub: String,
        }

        let token = encode(
            &Header::default(),
            &NoExp { sub: "42".into() },
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        let err = UserClaims::from_token(&token, SECRET).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::MissingRequiredClaim(c) if c == "exp"));
    }

    #[test]
    fn test_missing_sub_defaults_to_empty() {
        use jsonwebtoken::{encode, EncodingKey, Header};
        use serde::Serialize;

        #[derive(Serialize)]
        struct NoSub {
            exp: i64,
            iat: i64,
        }

        let now = Utc::now().timestamp();
        let token = encode(
            &Header::default(),
            &NoSub {
                exp: now + 3600,
                iat: now,
            },
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        let parsed = UserClaims::from_token(&token, SECRET).unwrap();
        assert!(parsed.sub.is_empty());
    }
}
