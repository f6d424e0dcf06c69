mod support;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use docket_core::{EmployeeStatus, Permission};
use serde_json::json;
use support::{TestApp, ADMIN_LOGIN, ADMIN_PASSWORD};

#[tokio::test]
async fn login_returns_token_and_employee() {
    let app = TestApp::new().await;
    app.seed_employee(ADMIN_LOGIN, ADMIN_PASSWORD, &[Permission::SuperAdmin])
        .await;

    let response = app
        .request(
            Method::POST,
            "/v1/auth/login",
            None,
            Some(json!({ "login_id": ADMIN_LOGIN, "password": ADMIN_PASSWORD })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["token_type"], "Bearer");
    assert_eq!(response.body["expires_in"], 120 * 60);
    assert_eq!(response.body["employee"]["login_id"], ADMIN_LOGIN);
    assert_eq!(response.body["employee"]["permissions"], json!([1]));
    assert!(response.body["employee"].get("password_hash").is_none());
    assert!(response.headers.get("set-cookie").is_some());
}

#[tokio::test]
async fn login_rejects_wrong_password_and_unknown_login_alike() {
    let app = TestApp::new().await;
    app.seed_employee(ADMIN_LOGIN, ADMIN_PASSWORD, &[Permission::SuperAdmin])
        .await;

    for (login, password) in [(ADMIN_LOGIN, "wrong-password"), ("nobody", ADMIN_PASSWORD)] {
        let response = app
            .request(
                Method::POST,
                "/v1/auth/login",
                None,
                Some(json!({ "login_id": login, "password": password })),
            )
            .await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.body["error"], "invalid_credentials");
    }
}

#[tokio::test]
async fn disabled_employee_cannot_login() {
    let app = TestApp::new().await;
    app.seed_employee_with_status("paused", "paused-password", &[], EmployeeStatus::Disabled)
        .await;

    let response = app
        .request(
            Method::POST,
            "/v1/auth/login",
            None,
            Some(json!({ "login_id": "paused", "password": "paused-password" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.body["error"], "account_disabled");
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() {
    let app = TestApp::new().await;

    let response = app.get("/v1/auth/me", None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = app.get("/v1/auth/me", Some("not-a-token")).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let token = app.admin_token().await;
    let response = app.get("/v1/auth/me", Some(&token)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["login_id"], ADMIN_LOGIN);
}

#[tokio::test]
async fn session_cookie_is_accepted() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/v1/auth/me")
        .header(
            "cookie",
            format!("{}={token}", app.config.auth.cookie_name),
        )
        .body(Body::empty())
        .expect("request");
    let response = app.send(request).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn token_stops_working_once_employee_is_disabled() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let staff_id = app
        .seed_employee("clerk", "clerk-password", &[Permission::Contents])
        .await;
    let staff = app.login("clerk", "clerk-password").await;

    let response = app
        .request(
            Method::PUT,
            &format!("/v1/admin/employees/{staff_id}"),
            Some(&admin),
            Some(json!({ "name": "Clerk", "status": "disabled" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app.get("/v1/auth/me", Some(&staff)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn change_password_flow() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;

    let response = app
        .request(
            Method::PUT,
            "/v1/auth/me/password",
            Some(&token),
            Some(json!({ "current_password": "wrong-password", "new_password": "next-password" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "invalid_password");

    let response = app
        .request(
            Method::PUT,
            "/v1/auth/me/password",
            Some(&token),
            Some(json!({ "current_password": ADMIN_PASSWORD, "new_password": ADMIN_PASSWORD })),
        )
        .await;
    assert_eq!(response.body["error"], "no_changes");

    let response = app
        .request(
            Method::PUT,
            "/v1/auth/me/password",
            Some(&token),
            Some(json!({ "current_password": ADMIN_PASSWORD, "new_password": "next-password" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    app.login(ADMIN_LOGIN, "next-password").await;
}

#[tokio::test]
async fn logout_clears_cookie() {
    let app = TestApp::new().await;
    let response = app.request(Method::POST, "/v1/auth/logout", None, None).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    let cookie = response
        .headers
        .get("set-cookie")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    assert!(cookie.contains("Max-Age=0"), "cookie: {cookie}");
}
