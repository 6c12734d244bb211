use std::sync::Arc;

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};

use crate::store::{StoreError, UserStore};

use super::rbac::Role;
use super::session::Session;
use super::token::{self, TokenError};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing credential")]
    MissingCredential,
    #[error("{0}")]
    MalformedHeader(&'static str),
    #[error("invalid token")]
    InvalidToken,
    #[error("session expired")]
    Expired,
    #[error("unknown subject")]
    UnknownSubject,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Turns request credentials into a fully populated [`Session`].
///
/// The user store is the source of truth for the subject's role: the token
/// only proves identity and freshness, never entitlement.
pub struct SessionResolver {
    users: Arc<dyn UserStore>,
    jwt_secret: String,
}

impl SessionResolver {
    pub fn new(users: Arc<dyn UserStore>, jwt_secret: impl Into<String>) -> Self {
        Self {
            users,
            jwt_secret: jwt_secret.into(),
        }
    }

    /// Resolve the caller's session from request headers.
    pub async fn resolve(&self, headers: &HeaderMap) -> Result<Session, AuthError> {
        let token = extract_bearer_token(headers)?;

        let claims = match token::verify(&token, &self.jwt_secret) {
            Ok(claims) => claims,
            Err(TokenError::Expired) => return Err(AuthError::Expired),
            Err(TokenError::MissingSecret) => {
                tracing::error!("JWT secret not configured");
                return Err(AuthError::InvalidToken);
            }
            Err(e) => {
                tracing::debug!("token rejected: {}", e);
                return Err(AuthError::InvalidToken);
            }
        };

        let user = self
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or(AuthError::UnknownSubject)?;

        // The stored role wins over whatever the token claims
        let role: Role = user.role.parse().map_err(|_| {
            tracing::warn!(user_id = %user.id, role = %user.role, "stored role not recognized");
            AuthError::UnknownSubject
        })?;

        let expires_at = DateTime::<Utc>::from_timestamp(claims.exp, 0)
            .unwrap_or_else(Utc::now);

        Ok(Session::new(user.id, user.name, user.email, role, expires_at))
    }
}

/// Extract the bearer token from the Authorization header.
fn extract_bearer_token(headers: &HeaderMap) -> Result<String, AuthError> {
    let auth_header = headers
        .get("authorization")
        .ok_or(AuthError::MissingCredential)?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AuthError::MalformedHeader("Invalid Authorization header format"))?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err(AuthError::MalformedHeader("Empty bearer token"));
        }
        Ok(token.to_string())
    } else {
        Err(AuthError::MalformedHeader(
            "Authorization header must use Bearer token format",
        ))
    }
}
