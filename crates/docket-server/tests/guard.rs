mod support;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::json;
use support::{with_peer, TestApp};

fn get_as(uri: &str, user_agent: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header("user-agent", user_agent)
        .body(Body::empty())
        .expect("request")
}

async fn block(app: &TestApp, token: &str, ips: &[&str], bots: &[&str]) {
    let response = app
        .request(
            Method::PUT,
            "/v1/admin/settings",
            Some(token),
            Some(json!({
                "site_name": "Docket",
                "jwt_expiry_minutes": 120,
                "blocked_ips": ips,
                "blocked_bots": bots
            })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
}

#[tokio::test]
async fn health_reports_ok() {
    let app = TestApp::new().await;
    let response = app.get("/health", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    assert!(response.body["version"].is_string());
}

#[tokio::test]
async fn blocked_bots_are_refused_outside_health() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;
    block(&app, &token, &[], &["AhrefsBot"]).await;

    let response = app
        .send(get_as("/v1/public/settings", "Mozilla/5.0 (compatible; ahrefsbot/7.0)"))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.body["error"], "blocked");

    let response = app
        .send(get_as("/health", "Mozilla/5.0 (compatible; ahrefsbot/7.0)"))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app
        .send(get_as("/v1/public/settings", "Mozilla/5.0 (Macintosh)"))
        .await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn blocked_ips_are_refused() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;
    block(&app, &token, &["192.0.2.10"], &[]).await;

    let blocked = with_peer(get_as("/v1/public/settings", "curl/8"), [192, 0, 2, 10]);
    let response = app.send(blocked).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let allowed = with_peer(get_as("/v1/public/settings", "curl/8"), [192, 0, 2, 11]);
    let response = app.send(allowed).await;
    assert_eq!(response.status, StatusCode::OK);

    // Lifting the block takes effect immediately.
    block(&app, &token, &[], &[]).await;
    let unblocked = with_peer(get_as("/v1/public/settings", "curl/8"), [192, 0, 2, 10]);
    let response = app.send(unblocked).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn forwarded_ip_is_used_behind_a_trusted_proxy() {
    let app = TestApp::with_config(|config| {
        config.server.trusted_proxies = vec!["10.0.0.0/8".to_string()];
    })
    .await;
    let token = app.admin_token().await;
    block(&app, &token, &["198.51.100.20"], &[]).await;

    let mut request = with_peer(get_as("/v1/public/settings", "curl/8"), [10, 0, 0, 5]);
    request
        .headers_mut()
        .insert("x-forwarded-for", "198.51.100.20".parse().expect("header"));
    let response = app.send(request).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    // An untrusted peer cannot spoof its way into or out of the list.
    let mut request = with_peer(get_as("/v1/public/settings", "curl/8"), [203, 0, 113, 9]);
    request
        .headers_mut()
        .insert("x-forwarded-for", "198.51.100.20".parse().expect("header"));
    let response = app.send(request).await;
    assert_eq!(response.status, StatusCode::OK);
}
