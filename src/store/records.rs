use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::auth::rbac::Role;

/// User row. Never serialized directly; handlers project the fields a
/// client may see.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
    pub hashed_password: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for `UserStore::insert`. Ids and timestamps are assigned
/// by the caller-facing record constructor, matching how the console always
/// generated ids application-side.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: Option<String>,
    pub email: String,
    pub hashed_password: String,
    pub role: Role,
}

impl NewUser {
    pub fn into_record(self) -> UserRecord {
        let now = Utc::now();
        UserRecord {
            id: Uuid::new_v4(),
            name: self.name,
            email: self.email,
            hashed_password: Some(self.hashed_password),
            role: self.role.as_str().to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Alert history row. Severity is one of: critical, warning, info.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AlertRecord {
    pub id: Uuid,
    pub rule_id: Option<Uuid>,
    pub severity: String,
    pub message: String,
    pub resource_type: String,
    pub resource_id: String,
    pub resource_name: String,
    pub threshold_value: Option<f64>,
    pub actual_value: Option<f64>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub acknowledged_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Audit trail row. Action type is one of: login, api_call, asset_view,
/// export.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditRecord {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub action_type: String,
    pub table_name: String,
    pub record_id: String,
    pub changes_before: Option<Value>,
    pub changes_after: Option<Value>,
    pub reason: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditRecord {
    fn base(
        user_id: Option<Uuid>,
        action: &str,
        action_type: &str,
        table_name: &str,
        record_id: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            action: action.to_string(),
            action_type: action_type.to_string(),
            table_name: table_name.to_string(),
            record_id: record_id.to_string(),
            changes_before: None,
            changes_after: None,
            reason: None,
            ip_address: None,
            user_agent: None,
            created_at: Utc::now(),
        }
    }

    /// A state-changing API call, with optional before/after snapshots.
    pub fn api_change(
        user_id: Option<Uuid>,
        action: &str,
        table_name: &str,
        record_id: &str,
        before: Option<Value>,
        after: Option<Value>,
    ) -> Self {
        let mut entry = Self::base(user_id, action, "api_call", table_name, record_id);
        entry.changes_before = before;
        entry.changes_after = after;
        entry
    }

    /// A login attempt, successful or not.
    pub fn login_event(user_id: Option<Uuid>, success: bool) -> Self {
        let record_id = user_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        Self::base(
            user_id,
            if success { "login_success" } else { "login_failed" },
            "login",
            "users",
            &record_id,
        )
    }

    /// A bulk export forwarded to the collector.
    pub fn export_event(user_id: Uuid, export_type: &str, filters: Option<Value>) -> Self {
        let mut entry = Self::base(Some(user_id), "export", "export", export_type, "bulk");
        entry.changes_after = filters;
        entry
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_client(
        mut self,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }
}

/// Filters for the audit trail listing.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub table_name: Option<String>,
    pub record_id: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl AuditFilter {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(50).clamp(1, 500)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}
