mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{seed, test_app};

#[tokio::test]
async fn only_admin_may_list_users() {
    let app = test_app();

    let denied = common::get(&app, "/api/admin/users", Some(&common::operator_token())).await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);
    assert_eq!(denied.body["error"]["kind"], "Forbidden");

    let allowed = common::get(&app, "/api/admin/users", Some(&common::admin_token())).await;
    assert_eq!(allowed.status, StatusCode::OK);
    let users = allowed.body["data"].as_array().expect("users");
    assert_eq!(users.len(), 4);
    for user in users {
        assert!(user.get("hashed_password").is_none());
    }
}

#[tokio::test]
async fn admin_creates_a_user_who_can_then_log_in() {
    let app = test_app();
    let created = common::post(
        &app,
        "/api/admin/users",
        Some(&common::admin_token()),
        json!({
            "name": "New Operator",
            "email": "new-op@example.com",
            "password": "s3cure-enough",
            "role": "operator"
        }),
    )
    .await;

    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["data"]["email"], "new-op@example.com");
    assert_eq!(created.body["data"]["role"], "operator");

    let login = common::post(
        &app,
        "/auth/login",
        None,
        json!({"email": "new-op@example.com", "password": "s3cure-enough"}),
    )
    .await;
    assert_eq!(login.status, StatusCode::OK);

    // The creation is audited under the new user's id
    let new_id = created.body["data"]["id"].as_str().expect("id").to_string();
    let trail_uri = format!("/api/audit-logs?table_name=users&record_id={}", new_id);
    let trail = common::get(&app, &trail_uri, Some(&common::admin_token())).await;
    let entries = trail.body["data"].as_array().expect("entries");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["action"], "create");
    assert_eq!(entries[0]["user_id"], seed::ADMIN_ID.to_string());
}

#[tokio::test]
async fn missing_fields_fail_validation_with_field_errors() {
    let app = test_app();
    let response = common::post(
        &app,
        "/api/admin/users",
        Some(&common::admin_token()),
        json!({"name": "No Credentials"}),
    )
    .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["error"]["kind"], "Validation");
    assert!(response.body["error"]["field_errors"]["email"].is_string());
    assert!(response.body["error"]["field_errors"]["password"].is_string());
}

#[tokio::test]
async fn unknown_role_fails_validation() {
    let app = test_app();
    let response = common::post(
        &app,
        "/api/admin/users",
        Some(&common::admin_token()),
        json!({"email": "x@example.com", "password": "pw", "role": "superuser"}),
    )
    .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body["error"]["field_errors"]["role"].is_string());
}

#[tokio::test]
async fn duplicate_email_conflicts() {
    let app = test_app();
    let response = common::post(
        &app,
        "/api/admin/users",
        Some(&common::admin_token()),
        json!({"email": seed::VIEWER_EMAIL, "password": "pw"}),
    )
    .await;

    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["error"]["kind"], "Conflict");
}

#[tokio::test]
async fn audit_trail_is_gated_on_audit_logs_read() {
    let app = test_app();

    let denied = common::get(&app, "/api/audit-logs", Some(&common::viewer_token())).await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    let allowed = common::get(&app, "/api/audit-logs", Some(&common::operator_token())).await;
    assert_eq!(allowed.status, StatusCode::OK);
    assert!(allowed.body["data"].is_array());
}

#[tokio::test]
async fn audit_trail_pagination_limits_results() {
    let app = test_app();
    for _ in 0..3 {
        common::post(
            &app,
            "/auth/login",
            None,
            json!({"email": seed::VIEWER_EMAIL, "password": "nope"}),
        )
        .await;
    }

    let page = common::get(
        &app,
        "/api/audit-logs?table_name=users&limit=2",
        Some(&common::admin_token()),
    )
    .await;
    assert_eq!(page.status, StatusCode::OK);
    assert_eq!(page.body["data"].as_array().expect("entries").len(), 2);
}
