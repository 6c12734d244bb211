use axum::body::Bytes;
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::envelope::{ApiResponse, ApiResult};
use crate::auth::token;
use crate::auth::Session;
use crate::error::ApiError;
use crate::services::rate_limit::{self, RateLimitConfig};
use crate::state::AppState;
use crate::store::AuditRecord;

use super::users::UserView;

#[derive(Debug, Deserialize)]
struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    token: String,
    user: UserView,
    expires_in: i64,
}

/// POST /auth/login - public; rate-limited, always audited.
///
/// Wrong email and wrong password return the same message so the endpoint
/// cannot be used to enumerate accounts.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let client_ip = rate_limit::client_identifier(&headers);
    let outcome = state
        .rate_limiter
        .check(&client_ip, RateLimitConfig::AUTH)
        .await;
    if !outcome.allowed {
        tracing::warn!(client = %client_ip, "login rate limit exceeded");
        return rate_limit::limited_response(&outcome);
    }

    let user_agent = headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());

    match attempt_login(&state, &body).await {
        Ok((user_id, response)) => {
            audit_login(&state, Some(user_id), true, &client_ip, user_agent).await;
            response.into_response()
        }
        Err((user_id, error)) => {
            if matches!(error, ApiError::Unauthenticated(_)) {
                audit_login(&state, user_id, false, &client_ip, user_agent).await;
            }
            error.into_response()
        }
    }
}

async fn attempt_login(
    state: &AppState,
    body: &[u8],
) -> Result<(Uuid, ApiResponse<LoginResponse>), (Option<Uuid>, ApiError)> {
    let payload: LoginRequest = serde_json::from_slice(body)
        .map_err(|e| (None, ApiError::invalid_json(e.to_string())))?;

    let invalid = || ApiError::unauthenticated("Invalid email or password");

    let user = state
        .users
        .find_by_email(payload.email.trim())
        .await
        .map_err(|e| (None, ApiError::from(e)))?
        .ok_or_else(|| (None, invalid()))?;

    let hash = user.hashed_password.as_deref().ok_or_else(|| {
        tracing::warn!(user_id = %user.id, "login attempt against user without a password");
        (Some(user.id), invalid())
    })?;

    let verified = bcrypt::verify(&payload.password, hash).map_err(|e| {
        tracing::error!("password verification failed: {}", e);
        (Some(user.id), invalid())
    })?;
    if !verified {
        return Err((Some(user.id), invalid()));
    }

    let role = user.role.parse().map_err(|_| {
        tracing::error!(user_id = %user.id, role = %user.role, "stored role not recognized");
        (Some(user.id), invalid())
    })?;

    let expiry = Duration::hours(state.config.security.jwt_expiry_hours as i64);
    let token = token::issue(
        user.id,
        &user.email,
        role,
        &state.config.security.jwt_secret,
        expiry,
    )
    .map_err(|e| {
        tracing::error!("token issue failed: {}", e);
        (
            Some(user.id),
            ApiError::internal_error("An error occurred while processing your request"),
        )
    })?;

    tracing::info!(user_id = %user.id, role = %user.role, "login succeeded");

    let user_id = user.id;
    Ok((
        user_id,
        ApiResponse::success(LoginResponse {
            token,
            user: UserView::from(user),
            expires_in: expiry.num_seconds(),
        }),
    ))
}

async fn audit_login(
    state: &AppState,
    user_id: Option<Uuid>,
    success: bool,
    client_ip: &str,
    user_agent: Option<String>,
) {
    let entry = AuditRecord::login_event(user_id, success)
        .with_client(Some(client_ip.to_string()), user_agent);
    if let Err(e) = state.audit.record(entry).await {
        // Never fail a login over a broken audit sink
        tracing::warn!("failed to record login audit entry: {}", e);
    }
}

#[derive(Debug, Serialize)]
pub struct WhoamiView {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
    pub role: String,
    pub grants: Vec<String>,
}

/// GET /api/auth/whoami - any valid session, no permission check.
pub async fn whoami(_state: AppState, _request: Request, session: Session) -> ApiResult<WhoamiView> {
    Ok(ApiResponse::success(WhoamiView {
        id: session.user_id,
        name: session.name.clone(),
        email: session.email.clone(),
        role: session.role.as_str().to_string(),
        grants: session.grants.iter().map(|g| g.to_string()).collect(),
    }))
}
