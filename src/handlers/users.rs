use std::collections::HashMap;

use axum::extract::Request;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::api::envelope::{ApiResponse, ApiResult};
use crate::auth::rbac::Role;
use crate::auth::Session;
use crate::error::ApiError;
use crate::state::AppState;
use crate::store::{AuditRecord, NewUser, UserRecord};

/// Client-facing projection of a user row. The password hash never leaves
/// the store boundary.
#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl From<UserRecord> for UserView {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            email: record.email,
            role: record.role,
            created_at: record.created_at,
        }
    }
}

/// GET /api/admin/users - (users, read)
pub async fn list(state: AppState, _request: Request, _session: Session) -> ApiResult<Vec<UserView>> {
    let users = state.users.list().await?;
    Ok(ApiResponse::success(
        users.into_iter().map(UserView::from).collect(),
    ))
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub role: Option<String>,
}

/// POST /api/admin/users - (users, create)
pub async fn create(state: AppState, request: Request, session: Session) -> ApiResult<UserView> {
    let client_ip = crate::services::rate_limit::client_identifier(request.headers());
    let payload: CreateUserRequest = super::read_json(request).await?;

    let mut field_errors = HashMap::new();
    if payload.email.trim().is_empty() {
        field_errors.insert("email".to_string(), "This field is required".to_string());
    }
    if payload.password.trim().is_empty() {
        field_errors.insert("password".to_string(), "This field is required".to_string());
    }
    if !field_errors.is_empty() {
        return Err(ApiError::validation(
            "Missing required fields",
            Some(field_errors),
        ));
    }

    let role: Role = match payload.role.as_deref() {
        None => Role::Viewer,
        Some(name) => name.parse().map_err(|_| {
            let mut errors = HashMap::new();
            errors.insert("role".to_string(), format!("Unknown role: {}", name));
            ApiError::validation("Invalid role", Some(errors))
        })?,
    };

    let email = payload.email.trim().to_lowercase();
    if state.users.find_by_email(&email).await?.is_some() {
        return Err(ApiError::conflict("A user with this email already exists"));
    }

    let hashed_password = bcrypt::hash(&payload.password, state.config.security.bcrypt_cost)
        .map_err(|e| {
            tracing::error!("password hashing failed: {}", e);
            ApiError::internal_error("An error occurred while processing your request")
        })?;

    let created = state
        .users
        .insert(NewUser {
            name: payload.name,
            email,
            hashed_password,
            role,
        })
        .await?;

    tracing::info!(created_by = %session.user_id, user_id = %created.id, "user created");

    if let Err(e) = state
        .audit
        .record(
            AuditRecord::api_change(
                Some(session.user_id),
                "create",
                "users",
                &created.id.to_string(),
                None,
                Some(json!({"email": created.email, "role": created.role})),
            )
            .with_client(Some(client_ip), None),
        )
        .await
    {
        tracing::warn!("failed to record user-create audit entry: {}", e);
    }

    Ok(ApiResponse::created(UserView::from(created)))
}
