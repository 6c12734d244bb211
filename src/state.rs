use std::sync::Arc;

use crate::auth::SessionResolver;
use crate::config::AppConfig;
use crate::proxy::TelemetryProxy;
use crate::services::rate_limit::RateLimiter;
use crate::store::memory;
use crate::store::postgres::{PgAlertStore, PgAuditStore, PgUserStore};
use crate::store::{AlertStore, AuditStore, Db, UserStore};

/// Shared application state, built once in `main` and injected into every
/// handler through axum's `State` extractor. All handles are read-shared;
/// nothing here is lazily constructed on the request path.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub resolver: Arc<SessionResolver>,
    pub users: Arc<dyn UserStore>,
    pub alerts: Arc<dyn AlertStore>,
    pub audit: Arc<dyn AuditStore>,
    pub rate_limiter: Arc<RateLimiter>,
    pub proxy: Arc<TelemetryProxy>,
    /// Present only when backed by Postgres; used by the health probe and
    /// for the explicit pool close on shutdown.
    pub db: Option<Db>,
}

impl AppState {
    /// Assemble state from explicit store handles. The resolver shares the
    /// user store with the handlers.
    pub fn with_stores(
        config: AppConfig,
        users: Arc<dyn UserStore>,
        alerts: Arc<dyn AlertStore>,
        audit: Arc<dyn AuditStore>,
        db: Option<Db>,
    ) -> Self {
        let resolver = Arc::new(SessionResolver::new(
            users.clone(),
            config.security.jwt_secret.clone(),
        ));
        let proxy = Arc::new(TelemetryProxy::new(&config.collector));
        Self {
            config: Arc::new(config),
            resolver,
            users,
            alerts,
            audit,
            rate_limiter: Arc::new(RateLimiter::new()),
            proxy,
            db,
        }
    }

    /// Postgres-backed state sharing one connection pool.
    pub fn new(config: AppConfig, db: Db) -> Self {
        Self::with_stores(
            config,
            Arc::new(PgUserStore::new(&db)),
            Arc::new(PgAlertStore::new(&db)),
            Arc::new(PgAuditStore::new(&db)),
            Some(db),
        )
    }

    /// In-memory state pre-loaded with the demo fixture. Used by the test
    /// suite and by `main` when no DATABASE_URL is configured.
    pub fn in_memory(config: AppConfig) -> Result<Self, bcrypt::BcryptError> {
        let (users, alerts, audit) = memory::seeded_stores()?;
        Ok(Self::with_stores(
            config,
            Arc::new(users),
            Arc::new(alerts),
            Arc::new(audit),
            None,
        ))
    }
}
