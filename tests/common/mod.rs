#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Duration;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use dcim_api_rust::auth::rbac::Role;
use dcim_api_rust::auth::token;
use dcim_api_rust::config::AppConfig;
use dcim_api_rust::routes;
use dcim_api_rust::state::AppState;

pub use dcim_api_rust::store::memory::seed;

pub const SECRET: &str = "integration-test-secret";

/// Config for in-process testing: fixed secret, no general API limiting,
/// collector pointed at a port nothing listens on.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.security.jwt_secret = SECRET.to_string();
    config.security.bcrypt_cost = 4;
    config.collector.base_url = "http://127.0.0.1:9".to_string();
    config
}

/// The full app over seeded in-memory stores.
pub fn test_app() -> Router {
    routes::app(AppState::in_memory(test_config()).expect("seeded state"))
}

pub fn token_for(user_id: Uuid, email: &str, role: Role) -> String {
    token::issue(user_id, email, role, SECRET, Duration::hours(1)).expect("issue token")
}

pub fn admin_token() -> String {
    token_for(seed::ADMIN_ID, seed::ADMIN_EMAIL, Role::Admin)
}

pub fn operator_token() -> String {
    token_for(seed::OPERATOR_ID, seed::OPERATOR_EMAIL, Role::Operator)
}

pub fn viewer_token() -> String {
    token_for(seed::VIEWER_ID, seed::VIEWER_EMAIL, Role::Viewer)
}

pub fn tenant_viewer_token() -> String {
    token_for(seed::TENANT_VIEWER_ID, seed::TENANT_VIEWER_EMAIL, Role::TenantViewer)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Value,
}

/// Drive one request through the router and parse the JSON body.
pub async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request");

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    TestResponse {
        status,
        headers,
        body,
    }
}

pub async fn get(app: &Router, uri: &str, token: Option<&str>) -> TestResponse {
    request(app, "GET", uri, token, None).await
}

pub async fn post(
    app: &Router,
    uri: &str,
    token: Option<&str>,
    body: Value,
) -> TestResponse {
    request(app, "POST", uri, token, Some(body)).await
}

pub async fn patch(app: &Router, uri: &str, token: Option<&str>) -> TestResponse {
    request(app, "PATCH", uri, token, None).await
}
