use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    AlertRecord, AlertStore, AuditFilter, AuditRecord, AuditStore, NewUser, StoreError,
    UserRecord, UserStore,
};

/// In-memory stores, used when no DATABASE_URL is configured and by the
/// test suite. Same trait surface as the Postgres stores.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<Vec<UserRecord>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: Vec<UserRecord>) -> Self {
        Self {
            users: RwLock::new(users),
        }
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.users.read().await.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<UserRecord>, StoreError> {
        let mut users = self.users.read().await.clone();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn insert(&self, user: NewUser) -> Result<UserRecord, StoreError> {
        let record = user.into_record();
        self.users.write().await.push(record.clone());
        Ok(record)
    }
}

#[derive(Default)]
pub struct MemoryAlertStore {
    alerts: RwLock<Vec<AlertRecord>>,
}

impl MemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_alerts(alerts: Vec<AlertRecord>) -> Self {
        Self {
            alerts: RwLock::new(alerts),
        }
    }
}

#[async_trait]
impl AlertStore for MemoryAlertStore {
    async fn list(&self) -> Result<Vec<AlertRecord>, StoreError> {
        let mut alerts = self.alerts.read().await.clone();
        alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(alerts)
    }

    async fn find(&self, id: Uuid) -> Result<Option<AlertRecord>, StoreError> {
        Ok(self
            .alerts
            .read()
            .await
            .iter()
            .find(|a| a.id == id)
            .cloned())
    }

    async fn acknowledge(
        &self,
        id: Uuid,
        acknowledged_by: &str,
        acknowledged_at: DateTime<Utc>,
    ) -> Result<Option<AlertRecord>, StoreError> {
        let mut alerts = self.alerts.write().await;
        match alerts.iter_mut().find(|a| a.id == id) {
            Some(alert) => {
                alert.acknowledged_at = Some(acknowledged_at);
                alert.acknowledged_by = Some(acknowledged_by.to_string());
                Ok(Some(alert.clone()))
            }
            None => Ok(None),
        }
    }
}

#[derive(Default)]
pub struct MemoryAuditStore {
    entries: RwLock<Vec<AuditRecord>>,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn record(&self, entry: AuditRecord) -> Result<(), StoreError> {
        self.entries.write().await.push(entry);
        Ok(())
    }

    async fn list(&self, filter: AuditFilter) -> Result<Vec<AuditRecord>, StoreError> {
        let entries = self.entries.read().await;
        let mut matched: Vec<AuditRecord> = entries
            .iter()
            .filter(|e| {
                filter
                    .table_name
                    .as_ref()
                    .map_or(true, |t| &e.table_name == t)
                    && filter.record_id.as_ref().map_or(true, |r| &e.record_id == r)
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matched
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.limit() as usize)
            .collect())
    }
}

/// Demo fixture identities, shared by the storeless dev mode and the tests.
pub mod seed {
    use uuid::Uuid;

    pub const PASSWORD: &str = "password123";

    pub const ADMIN_ID: Uuid = Uuid::from_u128(0xA1);
    pub const OPERATOR_ID: Uuid = Uuid::from_u128(0xB2);
    pub const VIEWER_ID: Uuid = Uuid::from_u128(0xC3);
    pub const TENANT_VIEWER_ID: Uuid = Uuid::from_u128(0xD4);

    pub const ADMIN_EMAIL: &str = "admin@example.com";
    pub const OPERATOR_EMAIL: &str = "operator@example.com";
    pub const VIEWER_EMAIL: &str = "viewer@example.com";
    pub const TENANT_VIEWER_EMAIL: &str = "tenant@example.com";

    pub const UNACKED_ALERT_ID: Uuid = Uuid::from_u128(0xE1);
    pub const ACKED_ALERT_ID: Uuid = Uuid::from_u128(0xE2);
    pub const INFO_ALERT_ID: Uuid = Uuid::from_u128(0xE3);
}

// Low cost; fixture data only
const SEED_BCRYPT_COST: u32 = 4;

fn seed_user(id: Uuid, name: &str, email: &str, role: &str) -> Result<UserRecord, bcrypt::BcryptError> {
    let now = Utc::now();
    Ok(UserRecord {
        id,
        name: Some(name.to_string()),
        email: email.to_string(),
        hashed_password: Some(bcrypt::hash(seed::PASSWORD, SEED_BCRYPT_COST)?),
        role: role.to_string(),
        created_at: now,
        updated_at: now,
    })
}

fn seed_alerts() -> Vec<AlertRecord> {
    let now = Utc::now();
    vec![
        AlertRecord {
            id: seed::UNACKED_ALERT_ID,
            rule_id: None,
            severity: "critical".to_string(),
            message: "Rack PWR-12 power draw above threshold".to_string(),
            resource_type: "racks".to_string(),
            resource_id: Uuid::from_u128(0xF1).to_string(),
            resource_name: "PWR-12".to_string(),
            threshold_value: Some(8.0),
            actual_value: Some(9.2),
            acknowledged_at: None,
            acknowledged_by: None,
            resolved_at: None,
            created_at: now - Duration::minutes(10),
        },
        AlertRecord {
            id: seed::ACKED_ALERT_ID,
            rule_id: None,
            severity: "warning".to_string(),
            message: "Device sw-core-01 warranty expires in 30 days".to_string(),
            resource_type: "devices".to_string(),
            resource_id: Uuid::from_u128(0xF2).to_string(),
            resource_name: "sw-core-01".to_string(),
            threshold_value: None,
            actual_value: None,
            acknowledged_at: Some(now - Duration::hours(1)),
            acknowledged_by: Some(seed::ADMIN_EMAIL.to_string()),
            resolved_at: None,
            created_at: now - Duration::hours(2),
        },
        AlertRecord {
            id: seed::INFO_ALERT_ID,
            rule_id: None,
            severity: "info".to_string(),
            message: "Rack R2-07 capacity above 80 percent".to_string(),
            resource_type: "racks".to_string(),
            resource_id: Uuid::from_u128(0xF3).to_string(),
            resource_name: "R2-07".to_string(),
            threshold_value: Some(80.0),
            actual_value: Some(83.5),
            acknowledged_at: None,
            acknowledged_by: None,
            resolved_at: None,
            created_at: now - Duration::hours(3),
        },
    ]
}

/// Stores pre-loaded with one user per role and a small alert history.
pub fn seeded_stores(
) -> Result<(MemoryUserStore, MemoryAlertStore, MemoryAuditStore), bcrypt::BcryptError> {
    let users = vec![
        seed_user(seed::ADMIN_ID, "Admin User", seed::ADMIN_EMAIL, "admin")?,
        seed_user(seed::OPERATOR_ID, "Operator User", seed::OPERATOR_EMAIL, "operator")?,
        seed_user(seed::VIEWER_ID, "Viewer User", seed::VIEWER_EMAIL, "viewer")?,
        seed_user(
            seed::TENANT_VIEWER_ID,
            "Tenant Viewer",
            seed::TENANT_VIEWER_EMAIL,
            "tenant_viewer",
        )?,
    ];

    Ok((
        MemoryUserStore::with_users(users),
        MemoryAlertStore::with_alerts(seed_alerts()),
        MemoryAuditStore::new(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn alert_list_is_newest_first() {
        let store = MemoryAlertStore::with_alerts(seed_alerts());
        let alerts = store.list().await.expect("list");
        assert_eq!(alerts.len(), 3);
        assert_eq!(alerts[0].id, seed::UNACKED_ALERT_ID);
        assert!(alerts[0].created_at >= alerts[1].created_at);
    }

    #[tokio::test]
    async fn acknowledge_updates_matching_entry_only() {
        let store = MemoryAlertStore::with_alerts(seed_alerts());
        let updated = store
            .acknowledge(seed::UNACKED_ALERT_ID, "op@example.com", Utc::now())
            .await
            .expect("acknowledge")
            .expect("entry exists");
        assert_eq!(updated.acknowledged_by.as_deref(), Some("op@example.com"));

        let missing = store
            .acknowledge(Uuid::from_u128(0xDEAD), "op@example.com", Utc::now())
            .await
            .expect("acknowledge");
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn audit_list_applies_filters_and_pagination() {
        let store = MemoryAuditStore::new();
        for i in 0..5 {
            store
                .record(AuditRecord::api_change(
                    Some(Uuid::from_u128(1)),
                    "update",
                    "alert_history",
                    &format!("rec-{}", i),
                    None,
                    None,
                ))
                .await
                .expect("record");
        }
        store
            .record(AuditRecord::login_event(Some(Uuid::from_u128(1)), true))
            .await
            .expect("record");

        let all = store.list(AuditFilter::default()).await.expect("list");
        assert_eq!(all.len(), 6);

        let alerts_only = store
            .list(AuditFilter {
                table_name: Some("alert_history".to_string()),
                ..Default::default()
            })
            .await
            .expect("list");
        assert_eq!(alerts_only.len(), 5);

        let page = store
            .list(AuditFilter {
                table_name: Some("alert_history".to_string()),
                limit: Some(2),
                offset: Some(4),
                ..Default::default()
            })
            .await
            .expect("list");
        assert_eq!(page.len(), 1);
    }

    #[tokio::test]
    async fn seeded_users_can_authenticate_with_seed_password() {
        let (users, _, _) = seeded_stores().expect("seed");
        let admin = users
            .find_by_email(seed::ADMIN_EMAIL)
            .await
            .expect("find")
            .expect("admin exists");
        let hash = admin.hashed_password.expect("has password");
        assert!(bcrypt::verify(seed::PASSWORD, &hash).expect("verify"));
    }
}
