//! # Authentication Module
//!
//! Password hashing with Argon2, HS256 access tokens, and the [`AuthUser`]
//! extractor that turns a bearer token into the calling [`Actor`].
//!
//! The extractor reloads the user on every request, so a role change or a
//! deleted account takes effect immediately instead of when the token
//! expires.

use std::sync::Arc;

use argon2::{
    Argon2, PasswordHasher, PasswordVerifier,
    password_hash::{PasswordHash, SaltString},
};
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::{Duration, Utc};
use eyre::{Result, eyre};
use halaqa_core::{
    authz::Actor,
    errors::HalaqaError,
    models::user::{Role, User},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ApiState, middleware::error_handling::AppError};

/// Hashes a password using the Argon2 algorithm
///
/// A fresh random salt is generated for each call and the result is
/// returned in PHC string format, ready to store.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| eyre!("Error hashing password: {}", e))?
        .to_string();

    Ok(password_hash)
}

/// Checks `password` against a stored PHC hash.
///
/// A malformed stored hash is an error; a wrong password is `Ok(false)`.
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    let parsed_hash =
        PasswordHash::new(password_hash).map_err(|e| eyre!("Invalid password hash: {}", e))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Token signing settings shared by the login handler and the extractor.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub token_ttl: Duration,
}

impl AuthSettings {
    pub fn new(jwt_secret: impl Into<String>, ttl_days: i64) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            token_ttl: Duration::days(ttl_days),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: Uuid,
    /// Role at the time of issue. Informational; the stored role wins.
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

pub fn issue_token(user: &User, settings: &AuthSettings) -> Result<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id,
        role: user.role,
        iat: now.timestamp(),
        exp: (now + settings.token_ttl).timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.jwt_secret.as_bytes()),
    )
    .map_err(|e| eyre!("Token generation failed: {}", e))
}

pub fn decode_token(token: &str, settings: &AuthSettings) -> Result<Claims, HalaqaError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(settings.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => {
            HalaqaError::Authentication("Authorization token has expired".to_string())
        }
        _ => HalaqaError::Authentication("Invalid authorization token".to_string()),
    })?;

    Ok(token_data.claims)
}

/// The authenticated caller of a request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub actor: Actor,
    pub user: User,
}

#[axum::async_trait]
impl FromRequestParts<Arc<ApiState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<ApiState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                HalaqaError::Authentication("Authorization token is required".to_string())
            })?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| HalaqaError::Authentication("Invalid authorization token".to_string()))?;

        let claims = decode_token(token, &state.auth)?;

        let user = state.repos.users.get_user(claims.sub).await?.ok_or_else(|| {
            tracing::debug!("Token for unknown user {}", claims.sub);
            HalaqaError::Authentication("Invalid authorization token".to_string())
        })?;

        Ok(AuthUser {
            actor: Actor::new(user.id, user.role),
            user,
        })
    }
}
