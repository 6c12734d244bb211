use axum::extract::{Request, State};
use axum::response::{IntoResponse, Response};
use futures::future::BoxFuture;
use serde::Serialize;
use std::future::Future;

use crate::api::envelope::ApiResponse;
use crate::error::ApiError;
use crate::state::AppState;

use super::rbac::{self, Action, Decision, Resource};
use super::session::Session;

/// Wrap a business handler in the authorization pipeline.
///
/// The returned closure is a plain axum handler that runs, in order:
/// resolve session, evaluate the required (resource, action) grant, then the
/// wrapped handler. Any stage failure short-circuits into a failure envelope
/// and the handler is never reached; on success the handler runs exactly
/// once and its value is wrapped in a success envelope.
pub fn guard<H, Fut, T>(
    resource: Resource,
    action: Action,
    handler: H,
) -> impl Fn(State<AppState>, Request) -> BoxFuture<'static, Response> + Clone + Send + 'static
where
    H: Fn(AppState, Request, Session) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<ApiResponse<T>, ApiError>> + Send + 'static,
    T: Serialize + 'static,
{
    move |State(state): State<AppState>, request: Request| {
        let handler = handler.clone();
        Box::pin(async move {
            let session = match state.resolver.resolve(request.headers()).await {
                Ok(session) => session,
                Err(e) => {
                    tracing::info!(error = %e, "session resolution failed");
                    return ApiError::from(e).into_response();
                }
            };

            if rbac::evaluate(&session, resource, action) == Decision::Deny {
                tracing::warn!(
                    subject = %session.user_id,
                    role = session.role.as_str(),
                    resource = resource.as_str(),
                    action = action.as_str(),
                    "permission denied"
                );
                return ApiError::forbidden("Forbidden").into_response();
            }

            tracing::debug!(
                subject = %session.user_id,
                resource = resource.as_str(),
                action = action.as_str(),
                "authorized"
            );

            match handler(state, request, session).await {
                Ok(response) => response.into_response(),
                Err(e) => e.into_response(),
            }
        })
    }
}

/// Like [`guard`] but without a permission check: any valid session passes.
/// Used by routes that only need to know who is calling (whoami, telemetry
/// proxy).
pub fn guard_authenticated<H, Fut, T>(
    handler: H,
) -> impl Fn(State<AppState>, Request) -> BoxFuture<'static, Response> + Clone + Send + 'static
where
    H: Fn(AppState, Request, Session) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<ApiResponse<T>, ApiError>> + Send + 'static,
    T: Serialize + 'static,
{
    move |State(state): State<AppState>, request: Request| {
        let handler = handler.clone();
        Box::pin(async move {
            let session = match state.resolver.resolve(request.headers()).await {
                Ok(session) => session,
                Err(e) => {
                    tracing::info!(error = %e, "session resolution failed");
                    return ApiError::from(e).into_response();
                }
            };

            match handler(state, request, session).await {
                Ok(response) => response.into_response(),
                Err(e) => e.into_response(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::rbac::Role;
    use crate::auth::token;
    use crate::config::AppConfig;
    use crate::state::AppState;
    use crate::store::memory::{MemoryAlertStore, MemoryAuditStore, MemoryUserStore};
    use crate::store::UserRecord;
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use chrono::{Duration, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tower::ServiceExt;
    use uuid::Uuid;

    const SECRET: &str = "test-secret";

    fn test_state(users: Vec<UserRecord>) -> AppState {
        let mut config = AppConfig::development();
        config.security.jwt_secret = SECRET.to_string();
        AppState::with_stores(
            config,
            Arc::new(MemoryUserStore::with_users(users)),
            Arc::new(MemoryAlertStore::new()),
            Arc::new(MemoryAuditStore::new()),
            None,
        )
    }

    fn user(id: u128, role: &str) -> UserRecord {
        let now = Utc::now();
        UserRecord {
            id: Uuid::from_u128(id),
            name: None,
            email: format!("user{}@example.com", id),
            hashed_password: None,
            role: role.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn token_for(id: u128, role: Role) -> String {
        token::issue(
            Uuid::from_u128(id),
            &format!("user{}@example.com", id),
            role,
            SECRET,
            Duration::hours(1),
        )
        .expect("issue token")
    }

    async fn run(
        app: Router,
        auth_header: Option<String>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = HttpRequest::builder().method("GET").uri("/probe");
        if let Some(value) = auth_header {
            builder = builder.header("authorization", value);
        }
        let request = builder.body(Body::empty()).expect("request");
        let response = app.oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let json = serde_json::from_slice(&bytes).expect("json body");
        (status, json)
    }

    fn probe_app(state: AppState, calls: Arc<AtomicUsize>) -> Router {
        let handler = move |_state: AppState, _req: Request, _session: Session| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(ApiResponse::success(vec!["r1", "r2", "r3"]))
            }
        };
        Router::new()
            .route(
                "/probe",
                get(guard(Resource::AlertHistory, Action::Read, handler)),
            )
            .with_state(state)
    }

    #[tokio::test]
    async fn entitled_session_runs_handler_exactly_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = probe_app(test_state(vec![user(1, "viewer")]), calls.clone());

        let (status, body) =
            run(app, Some(format!("Bearer {}", token_for(1, Role::Viewer)))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"], serde_json::json!(["r1", "r2", "r3"]));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_credential_never_reaches_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = probe_app(test_state(vec![user(1, "viewer")]), calls.clone());

        let (status, body) = run(app, None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["kind"], "Unauthenticated");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_grant_never_reaches_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let state = test_state(vec![user(2, "viewer")]);
        let handler = {
            let calls = calls.clone();
            move |_state: AppState, _req: Request, _session: Session| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(ApiResponse::success(()))
                }
            }
        };
        // Viewer holds read but not update on alert history
        let app = Router::new()
            .route(
                "/probe",
                get(guard(Resource::AlertHistory, Action::Update, handler)),
            )
            .with_state(state);

        let (status, body) =
            run(app, Some(format!("Bearer {}", token_for(2, Role::Viewer)))).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["kind"], "Forbidden");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn expired_credential_yields_session_expired() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = probe_app(test_state(vec![user(3, "viewer")]), calls.clone());

        let expired = token::issue(
            Uuid::from_u128(3),
            "user3@example.com",
            Role::Viewer,
            SECRET,
            Duration::hours(-2),
        )
        .expect("issue");
        let (status, body) = run(app, Some(format!("Bearer {}", expired))).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["kind"], "SessionExpired");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn handler_error_kind_passes_through_unmodified() {
        let state = test_state(vec![user(4, "admin")]);
        let handler = |_state: AppState, _req: Request, _session: Session| async move {
            Err::<ApiResponse<()>, _>(ApiError::conflict("already exists"))
        };
        let app = Router::new()
            .route("/probe", get(guard(Resource::Users, Action::Create, handler)))
            .with_state(state);

        let (status, body) =
            run(app, Some(format!("Bearer {}", token_for(4, Role::Admin)))).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["kind"], "Conflict");
        assert_eq!(body["error"]["message"], "already exists");
    }

    #[tokio::test]
    async fn guard_authenticated_skips_permission_check() {
        let state = test_state(vec![user(5, "tenant_viewer")]);
        let handler = |_state: AppState, _req: Request, session: Session| async move {
            Ok(ApiResponse::success(session.email))
        };
        let app = Router::new()
            .route("/probe", get(guard_authenticated(handler)))
            .with_state(state);

        let (status, body) = run(
            app,
            Some(format!("Bearer {}", token_for(5, Role::TenantViewer))),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], "user5@example.com");
    }
}
