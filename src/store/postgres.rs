use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    AlertRecord, AlertStore, AuditFilter, AuditRecord, AuditStore, Db, NewUser, StoreError,
    UserRecord, UserStore,
};

const USER_COLUMNS: &str = "id, name, email, hashed_password, role, created_at, updated_at";

const ALERT_COLUMNS: &str = "id, rule_id, severity, message, resource_type, resource_id, \
     resource_name, threshold_value, actual_value, acknowledged_at, acknowledged_by, \
     resolved_at, created_at";

const AUDIT_COLUMNS: &str = "id, user_id, action, action_type, table_name, record_id, \
     changes_before, changes_after, reason, ip_address, user_agent, created_at";

pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(db: &Db) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError> {
        let user = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let user = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn list(&self) -> Result<Vec<UserRecord>, StoreError> {
        let users = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users ORDER BY created_at DESC",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn insert(&self, user: NewUser) -> Result<UserRecord, StoreError> {
        let record = user.into_record();
        sqlx::query(
            "INSERT INTO users (id, name, email, hashed_password, role, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(record.id)
        .bind(&record.name)
        .bind(&record.email)
        .bind(&record.hashed_password)
        .bind(&record.role)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(record)
    }
}

pub struct PgAlertStore {
    pool: PgPool,
}

impl PgAlertStore {
    pub fn new(db: &Db) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }
}

#[async_trait]
impl AlertStore for PgAlertStore {
    async fn list(&self) -> Result<Vec<AlertRecord>, StoreError> {
        let alerts = sqlx::query_as::<_, AlertRecord>(&format!(
            "SELECT {} FROM alert_history ORDER BY created_at DESC",
            ALERT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(alerts)
    }

    async fn find(&self, id: Uuid) -> Result<Option<AlertRecord>, StoreError> {
        let alert = sqlx::query_as::<_, AlertRecord>(&format!(
            "SELECT {} FROM alert_history WHERE id = $1",
            ALERT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(alert)
    }

    async fn acknowledge(
        &self,
        id: Uuid,
        acknowledged_by: &str,
        acknowledged_at: DateTime<Utc>,
    ) -> Result<Option<AlertRecord>, StoreError> {
        let updated = sqlx::query_as::<_, AlertRecord>(&format!(
            "UPDATE alert_history SET acknowledged_at = $2, acknowledged_by = $3 \
             WHERE id = $1 RETURNING {}",
            ALERT_COLUMNS
        ))
        .bind(id)
        .bind(acknowledged_at)
        .bind(acknowledged_by)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }
}

pub struct PgAuditStore {
    pool: PgPool,
}

impl PgAuditStore {
    pub fn new(db: &Db) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }
}

#[async_trait]
impl AuditStore for PgAuditStore {
    async fn record(&self, entry: AuditRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO audit_logs (id, user_id, action, action_type, table_name, record_id, \
             changes_before, changes_after, reason, ip_address, user_agent, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(entry.id)
        .bind(entry.user_id)
        .bind(&entry.action)
        .bind(&entry.action_type)
        .bind(&entry.table_name)
        .bind(&entry.record_id)
        .bind(&entry.changes_before)
        .bind(&entry.changes_after)
        .bind(&entry.reason)
        .bind(&entry.ip_address)
        .bind(&entry.user_agent)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list(&self, filter: AuditFilter) -> Result<Vec<AuditRecord>, StoreError> {
        let entries = sqlx::query_as::<_, AuditRecord>(&format!(
            "SELECT {} FROM audit_logs \
             WHERE ($1::text IS NULL OR table_name = $1) \
               AND ($2::text IS NULL OR record_id = $2) \
             ORDER BY created_at DESC LIMIT $3 OFFSET $4",
            AUDIT_COLUMNS
        ))
        .bind(&filter.table_name)
        .bind(&filter.record_id)
        .bind(filter.limit())
        .bind(filter.offset())
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }
}
