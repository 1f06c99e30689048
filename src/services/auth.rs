//! Authentication and user management service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{CreateUser, RegisterUser, UpdateUser, User, UserClaims, UserQuery},
    repository::{FieldMap, Repository},
};

use super::page_bounds;

/// External message for credential failures. Unknown email and wrong
/// password are deliberately indistinguishable so registered addresses
/// cannot be probed.
const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    fn hash_password(password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))
    }

    fn verify_password(password: &str, digest: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(digest) else {
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    /// Register a new user account
    pub async fn register(&self, payload: RegisterUser) -> AppResult<User> {
        let mut by_email = FieldMap::new();
        by_email.set("email", payload.email.clone());
        if self.repository.users.find_one(&by_email).await?.is_some() {
            return Err(AppError::Conflict(
                "A user with this email already exists".to_string(),
            ));
        }

        let digest = Self::hash_password(&payload.password)?;

        let mut fields = FieldMap::new();
        fields.set("phone_number", payload.phone_number);
        fields.set("first_name", payload.first_name);
        fields.set("last_name", payload.last_name);
        fields.set("email", payload.email);
        fields.set("password", digest);

        let user = self.repository.users.create(&fields).await?;
        tracing::info!(user_id = user.id, "user registered");
        Ok(user)
    }

    /// Authenticate by email and password, returning a freshly minted token
    pub async fn login(&self, email: &str, password: &str) -> AppResult<(String, User)> {
        let mut by_email = FieldMap::new();
        by_email.set("email", email);

        let user = match self.repository.users.find_one(&by_email).await? {
            Some(user) if Self::verify_password(password, &user.password) => user,
            _ => return Err(AppError::Authentication(INVALID_CREDENTIALS.to_string())),
        };

        let token = self.mint_token(user.id)?;
        tracing::info!(user_id = user.id, "user logged in");
        Ok((token, user))
    }

    /// Mint a signed token carrying the user id as subject
    fn mint_token(&self, user_id: i32) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let exp = now + (self.config.jwt_expiration_hours as i64 * 3600);

        let claims = UserClaims {
            sub: user_id.to_string(),
            exp,
            iat: now,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Validate a presented token and resolve the caller.
    ///
    /// Every failure mode carries its own message: bad signature or format,
    /// elapsed or missing expiration, missing subject, unknown user.
    pub async fn resolve_token(&self, token: &str) -> AppResult<User> {
        let claims = UserClaims::from_token(token, &self.config.jwt_secret).map_err(|e| {
            use jsonwebtoken::errors::ErrorKind;
            let message = match e.kind() {
                ErrorKind::ExpiredSignature => "Token has expired",
                ErrorKind::MissingRequiredClaim(_) => "Token has no expiration",
                _ => "Invalid token",
            };
            AppError::Authentication(message.to_string())
        })?;

        if claims.sub.is_empty() {
            return Err(AppError::Authentication("Token has no subject".to_string()));
        }

        let user_id: i32 = claims
            .sub
            .parse()
            .map_err(|_| AppError::Authentication("Token subject is not a user id".to_string()))?;

        self.repository
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::Authentication("User not found".to_string()))
    }

    /// List users with pagination (admin)
    pub async fn list_users(&self, query: &UserQuery) -> AppResult<(Vec<User>, i64)> {
        let (offset, limit) = page_bounds(query.page, query.per_page);

        let mut filters = FieldMap::new();
        if let Some(ref email) = query.email {
            filters.set("email", email.clone());
        }
        if let Some(is_admin) = query.is_admin {
            filters.set("is_admin", is_admin);
        }

        let users = self.repository.users.get_all(offset, limit, &filters).await?;
        let total = self.repository.users.count(&filters).await?;
        Ok((users, total))
    }

    /// Get a user by id (admin)
    pub async fn get_user(&self, id: i32) -> AppResult<User> {
        self.repository
            .users
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Create a user with explicit role flags (admin)
    pub async fn create_user(&self, payload: CreateUser) -> AppResult<User> {
        let digest = Self::hash_password(&payload.password)?;

        let mut fields = FieldMap::new();
        fields.set("phone_number", payload.phone_number);
        fields.set("first_name", payload.first_name);
        fields.set("last_name", payload.last_name);
        fields.set("email", payload.email);
        fields.set("password", digest);
        if let Some(is_reader) = payload.is_reader {
            fields.set("is_reader", is_reader);
        }
        if let Some(is_admin) = payload.is_admin {
            fields.set("is_admin", is_admin);
        }

        self.repository.users.create(&fields).await
    }

    /// Partially update a user (admin)
    pub async fn update_user(&self, id: i32, payload: UpdateUser) -> AppResult<User> {
        let mut fields = FieldMap::new();
        if let Some(phone_number) = payload.phone_number {
            fields.set("phone_number", phone_number);
        }
        if let Some(first_name) = payload.first_name {
            fields.set("first_name", first_name);
        }
        if let Some(last_name) = payload.last_name {
            fields.set("last_name", last_name);
        }
        if let Some(email) = payload.email {
            fields.set("email", email);
        }
        if let Some(password) = payload.password {
            fields.set("password", Self::hash_password(&password)?);
        }
        if let Some(is_reader) = payload.is_reader {
            fields.set("is_reader", is_reader);
        }
        if let Some(is_admin) = payload.is_admin {
            fields.set("is_admin", is_admin);
        }

        self.repository
            .users
            .update(id, &fields)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Delete a user (admin)
    pub async fn delete_user(&self, id: i32) -> AppResult<()> {
        if !self.repository.users.delete(id).await? {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let digest = AuthService::hash_password("correct horse").unwrap();
        assert!(AuthService::verify_password("correct horse", &digest));
        assert!(!AuthService::verify_password("battery staple", &digest));
    }

    #[test]
    fn test_hashes_are_salted() {
        let first = AuthService::hash_password("same password").unwrap();
        let second = AuthService::hash_password("same password").unwrap();
        assert_ne!(first, second);
        assert!(AuthService::verify_password("same password", &first));
        assert!(AuthService::verify_password("same password", &second));
    }

    #[test]
    fn test_verify_rejects_garbage_digest() {
        assert!(!AuthService::verify_password("anything", "not-a-phc-string"));
    }
}
