mod support;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use docket_core::Permission;
use serde_json::{json, Value};
use support::TestApp;

fn settings_body(overrides: Value) -> Value {
    let mut body = json!({
        "site_name": "Docket Law",
        "domain": "law.example.com",
        "contact_email": "desk@law.example.com",
        "smtp_host": "smtp.example.com",
        "smtp_port": 465,
        "smtp_username": "mailer",
        "smtp_password": "smtp-secret",
        "smtp_from": "noreply@law.example.com",
        "smtp_tls_mode": "tls",
        "jwt_expiry_minutes": 60,
        "cors_origins": ["https://law.example.com"]
    });
    if let (Some(body), Some(overrides)) = (body.as_object_mut(), overrides.as_object()) {
        for (key, value) in overrides {
            body.insert(key.clone(), value.clone());
        }
    }
    body
}

async fn put_settings(app: &TestApp, token: &str, body: Value) -> support::TestResponse {
    app.request(Method::PUT, "/v1/admin/settings", Some(token), Some(body))
        .await
}

#[tokio::test]
async fn defaults_are_seeded() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;

    let response = app.get("/v1/admin/settings", Some(&token)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["site_name"], "Docket");
    assert_eq!(response.body["smtp_port"], 587);
    assert_eq!(response.body["smtp_tls_mode"], "starttls");
    assert_eq!(response.body["jwt_expiry_minutes"], 120);
    assert_eq!(response.body["blocked_ips"], json!([]));
}

#[tokio::test]
async fn smtp_password_is_masked_and_kept() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;

    let response = put_settings(&app, &token, settings_body(json!({}))).await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert_eq!(response.body["smtp_password"], "********");
    assert_eq!(response.body["smtp_tls_mode"], "tls");

    let response = put_settings(
        &app,
        &token,
        settings_body(json!({ "smtp_password": "********", "site_name": "Renamed" })),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    let stored: Option<String> = sqlx_core::query_scalar::query_scalar::<sqlx_sqlite::Sqlite, Option<String>>(
        "SELECT smtp_password FROM site_settings WHERE id = 1",
    )
    .fetch_one(&app.pool)
    .await
    .expect("stored password");
    assert_eq!(stored.as_deref(), Some("smtp-secret"));

    let response = put_settings(&app, &token, settings_body(json!({ "smtp_password": "" }))).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body["smtp_password"].is_null());
}

#[tokio::test]
async fn invalid_settings_are_rejected() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;

    let cases = [
        (json!({ "smtp_port": 70000 }), "invalid_smtp_port"),
        (json!({ "smtp_tls_mode": "ssl" }), "invalid_smtp_tls_mode"),
        (json!({ "jwt_expiry_minutes": 1 }), "invalid_jwt_expiry"),
        (json!({ "cors_origins": ["ftp://law.example.com"] }), "invalid_cors_origin"),
        (json!({ "blocked_ips": ["300.1.1.1"] }), "invalid_blocked_ip"),
        (json!({ "site_name": "   " }), "invalid_site_name"),
    ];
    for (overrides, code) in cases {
        let response = put_settings(&app, &token, settings_body(overrides)).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{code}");
        assert_eq!(response.body["error"], code);
    }
}

#[tokio::test]
async fn settings_need_the_settings_permission() {
    let app = TestApp::new().await;
    let token = app.staff_token("clerk", &[Permission::Banners]).await;
    let response = app.get("/v1/admin/settings", Some(&token)).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let token = app.staff_token("office", &[Permission::Settings]).await;
    let response = app.get("/v1/admin/settings", Some(&token)).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn public_settings_expose_only_safe_fields() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;
    put_settings(&app, &token, settings_body(json!({}))).await;

    let response = app.get("/v1/public/settings", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.body,
        json!({
            "site_name": "Docket Law",
            "domain": "law.example.com",
            "contact_email": "desk@law.example.com"
        })
    );
}

#[tokio::test]
async fn new_session_expiry_applies_to_next_login() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;
    put_settings(&app, &token, settings_body(json!({ "jwt_expiry_minutes": 15 }))).await;

    let response = app
        .request(
            Method::POST,
            "/v1/auth/login",
            None,
            Some(json!({ "login_id": support::ADMIN_LOGIN, "password": support::ADMIN_PASSWORD })),
        )
        .await;
    assert_eq!(response.body["expires_in"], 15 * 60);
}

fn with_origin(uri: &str, origin: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header("origin", origin)
        .body(Body::empty())
        .expect("request")
}

#[tokio::test]
async fn cors_allowlist_follows_settings() {
    let app = TestApp::with_config(|config| {
        config.server.cors_origins = vec!["https://admin.example.com".to_string()];
    })
    .await;
    let token = app.admin_token().await;

    let response = app
        .send(with_origin("/v1/public/settings", "https://admin.example.com"))
        .await;
    assert_eq!(
        response.headers.get("access-control-allow-origin").map(|v| v.as_bytes()),
        Some(&b"https://admin.example.com"[..])
    );
    let response = app
        .send(with_origin("/v1/public/settings", "https://law.example.com"))
        .await;
    assert!(response.headers.get("access-control-allow-origin").is_none());

    put_settings(&app, &token, settings_body(json!({}))).await;

    let response = app
        .send(with_origin("/v1/public/settings", "https://law.example.com"))
        .await;
    assert_eq!(
        response.headers.get("access-control-allow-origin").map(|v| v.as_bytes()),
        Some(&b"https://law.example.com"[..])
    );
    // Static origins from the config survive the swap.
    let response = app
        .send(with_origin("/v1/public/settings", "https://admin.example.com"))
        .await;
    assert!(response.headers.get("access-control-allow-origin").is_some());
}
