use axum::extract::Request;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::api::envelope::{ApiResponse, ApiResult};
use crate::auth::Session;
use crate::error::ApiError;
use crate::services::rate_limit;
use crate::state::AppState;
use crate::store::{AlertRecord, AuditRecord};

/// GET /api/alerts/history - (alert_history, read); newest first.
pub async fn list_history(
    state: AppState,
    _request: Request,
    _session: Session,
) -> ApiResult<Vec<AlertRecord>> {
    let alerts = state.alerts.list().await?;
    Ok(ApiResponse::success(alerts))
}

/// PATCH /api/alerts/history/:id/acknowledge - (alert_history, update).
///
/// Stamps the entry with the caller's email and records before/after
/// snapshots in the audit trail.
pub async fn acknowledge(
    state: AppState,
    request: Request,
    session: Session,
) -> ApiResult<AlertRecord> {
    let client_ip = rate_limit::client_identifier(request.headers());
    let id: Uuid = super::path_param(request).await?;

    let before = state
        .alerts
        .find(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Alert history entry not found"))?;

    let acknowledged_at = Utc::now();
    let updated = state
        .alerts
        .acknowledge(id, &session.email, acknowledged_at)
        .await?
        .ok_or_else(|| ApiError::not_found("Alert history entry not found"))?;

    tracing::info!(alert_id = %id, by = %session.email, "alert acknowledged");

    if let Err(e) = state
        .audit
        .record(
            AuditRecord::api_change(
                Some(session.user_id),
                "acknowledge",
                "alert_history",
                &id.to_string(),
                Some(json!({
                    "acknowledged_at": before.acknowledged_at,
                    "acknowledged_by": before.acknowledged_by,
                })),
                Some(json!({
                    "acknowledged_at": updated.acknowledged_at,
                    "acknowledged_by": updated.acknowledged_by,
                })),
            )
            .with_client(Some(client_ip), None),
        )
        .await
    {
        tracing::warn!("failed to record acknowledge audit entry: {}", e);
    }

    Ok(ApiResponse::success(updated))
}
