use axum::extract::State;
use axum::http::HeaderValue;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{any, get, patch, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::rbac::{Action, Resource};
use crate::auth::{guard, guard_authenticated};
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::handlers;
use crate::proxy;
use crate::services::rate_limit;
use crate::state::AppState;

/// Assemble the full router. Takes the state explicitly so the test suite
/// can drive the app in-process against in-memory stores.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .route("/api/auth/whoami", get(guard_authenticated(handlers::auth::whoami)))
        .route(
            "/api/alerts/history",
            get(guard(
                Resource::AlertHistory,
                Action::Read,
                handlers::alerts::list_history,
            )),
        )
        .route(
            "/api/alerts/history/:id/acknowledge",
            patch(guard(
                Resource::AlertHistory,
                Action::Update,
                handlers::alerts::acknowledge,
            )),
        )
        .route(
            "/api/audit-logs",
            get(guard(Resource::AuditLogs, Action::Read, handlers::audit::list)),
        )
        .route(
            "/api/admin/users",
            get(guard(Resource::Users, Action::Read, handlers::users::list))
                .post(guard(Resource::Users, Action::Create, handlers::users::create)),
        )
        // Telemetry passthrough to the collector service
        .route("/api/power/readings", get(proxy::readings))
        .route("/api/power/sse", get(proxy::sse))
        .route("/api/export/*path", any(proxy::export))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::api_rate_limit,
        ));

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/auth/login", post(handlers::auth::login))
        .merge(api)
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index() -> Json<serde_json::Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "description": env!("CARGO_PKG_DESCRIPTION"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Liveness probe. Degrades to 503 when the database pool stops answering.
async fn health(State(state): State<AppState>) -> axum::response::Response {
    if let Some(db) = &state.db {
        if let Err(e) = db.health_check().await {
            tracing::error!("health check failed: {}", e);
            return ApiError::service_unavailable("Database unreachable").into_response();
        }
    }
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
    .into_response()
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if config.security.cors_origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}
