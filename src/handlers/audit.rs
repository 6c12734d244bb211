use axum::extract::Request;
use serde::Deserialize;

use crate::api::envelope::{ApiResponse, ApiResult};
use crate::auth::Session;
use crate::state::AppState;
use crate::store::{AuditFilter, AuditRecord};

#[derive(Debug, Default, Deserialize)]
pub struct AuditQuery {
    pub table_name: Option<String>,
    pub record_id: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/audit-logs - (audit_logs, read); newest first, paginated.
pub async fn list(
    state: AppState,
    request: Request,
    _session: Session,
) -> ApiResult<Vec<AuditRecord>> {
    let query: AuditQuery = super::query_params(request).await?;
    let entries = state
        .audit
        .list(AuditFilter {
            table_name: query.table_name,
            record_id: query.record_id,
            limit: query.limit,
            offset: query.offset,
        })
        .await?;
    Ok(ApiResponse::success(entries))
}
