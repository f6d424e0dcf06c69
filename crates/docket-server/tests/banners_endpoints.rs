mod support;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use docket_core::Permission;
use serde_json::{json, Value};
use support::{multipart_request, png_bytes, TestApp};

async fn create_group(app: &TestApp, token: &str, kind: &str) -> i64 {
    let response = app
        .request(
            Method::POST,
            "/v1/admin/banner-groups",
            Some(token),
            Some(json!({ "kind": kind, "name": format!("{kind} banners") })),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    response.body["id"].as_i64().expect("group id")
}

async fn create_banner(app: &TestApp, token: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .request(Method::POST, "/v1/admin/banners", Some(token), Some(body))
        .await;
    (response.status, response.body)
}

#[tokio::test]
async fn overlapping_windows_in_one_slot_conflict() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;
    let group = create_group(&app, &token, "top").await;

    let (status, first) = create_banner(
        &app,
        &token,
        json!({
            "group_id": group,
            "sequence": 1,
            "title": "Spring consultation",
            "is_published": true,
            "published_at": "2024-03-01T00:00:00Z",
            "unpublished_at": "2024-03-10T00:00:00Z"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let first_id = first["id"].as_i64().expect("id");

    let (status, body) = create_banner(
        &app,
        &token,
        json!({
            "group_id": group,
            "sequence": 1,
            "title": "Overlapping",
            "is_published": true,
            "published_at": "2024-03-05T00:00:00Z",
            "unpublished_at": "2024-03-20T00:00:00Z"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "banner_schedule_conflict");
    assert_eq!(body["conflicts"], json!([first_id]));

    // A different slot, or the same slot unpublished, is fine.
    let (status, _) = create_banner(
        &app,
        &token,
        json!({
            "group_id": group,
            "sequence": 2,
            "title": "Other slot",
            "is_published": true,
            "published_at": "2024-03-05T00:00:00Z"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = create_banner(
        &app,
        &token,
        json!({
            "group_id": group,
            "sequence": 1,
            "title": "Draft",
            "published_at": "2024-03-05T00:00:00Z"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Touching the closed end counts as an overlap.
    let (status, body) = create_banner(
        &app,
        &token,
        json!({
            "group_id": group,
            "sequence": 1,
            "title": "Back to back",
            "is_published": true,
            "published_at": "2024-03-10T00:00:00Z"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["conflicts"], json!([first_id]));
}

#[tokio::test]
async fn publishing_a_draft_checks_the_slot() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;
    let group = create_group(&app, &token, "popup").await;

    let (_, live) = create_banner(
        &app,
        &token,
        json!({
            "group_id": group,
            "title": "Live",
            "is_published": true,
            "published_at": "2024-01-01T00:00:00Z"
        }),
    )
    .await;
    let (_, draft) = create_banner(
        &app,
        &token,
        json!({
            "group_id": group,
            "title": "Draft",
            "published_at": "2024-06-01T00:00:00Z",
            "unpublished_at": "2024-06-30T00:00:00Z"
        }),
    )
    .await;
    let draft_id = draft["id"].as_i64().expect("id");

    let response = app
        .request(
            Method::PUT,
            &format!("/v1/admin/banners/{draft_id}/publish"),
            Some(&token),
            Some(json!({ "is_published": true })),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["conflicts"], json!([live["id"]]));

    let live_id = live["id"].as_i64().expect("id");
    let response = app
        .request(
            Method::PUT,
            &format!("/v1/admin/banners/{live_id}/publish"),
            Some(&token),
            Some(json!({ "is_published": false })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["is_published"], false);

    let response = app
        .request(
            Method::PUT,
            &format!("/v1/admin/banners/{draft_id}/publish"),
            Some(&token),
            Some(json!({ "is_published": true })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["is_published"], true);
}

#[tokio::test]
async fn updating_a_banner_ignores_its_own_window() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;
    let group = create_group(&app, &token, "mid").await;
    let (_, banner) = create_banner(
        &app,
        &token,
        json!({
            "group_id": group,
            "title": "Original",
            "is_published": true,
            "published_at": "2024-03-01T00:00:00Z",
            "unpublished_at": "2024-03-31T00:00:00Z"
        }),
    )
    .await;
    let id = banner["id"].as_i64().expect("id");

    let response = app
        .request(
            Method::PUT,
            &format!("/v1/admin/banners/{id}"),
            Some(&token),
            Some(json!({
                "group_id": group,
                "title": "Extended",
                "link_url": "https://law.example.com/consult",
                "link_target": "new_window",
                "is_published": true,
                "published_at": "2024-03-01T00:00:00Z",
                "unpublished_at": "2024-04-30T00:00:00Z"
            })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert_eq!(response.body["title"], "Extended");
    assert_eq!(response.body["link_target"], "new_window");
}

#[tokio::test]
async fn invalid_banner_payloads_are_rejected() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;
    let group = create_group(&app, &token, "bottom").await;

    let (status, body) = create_banner(
        &app,
        &token,
        json!({
            "group_id": group,
            "title": "Backwards",
            "published_at": "2024-03-10T00:00:00Z",
            "unpublished_at": "2024-03-01T00:00:00Z"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_publish_window");

    let (status, body) = create_banner(
        &app,
        &token,
        json!({ "group_id": 9999, "title": "Orphan", "published_at": "2024-03-10T00:00:00Z" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "unknown_group");

    let (status, body) = create_banner(
        &app,
        &token,
        json!({
            "group_id": group,
            "title": "Script link",
            "link_url": "javascript:alert(1)",
            "published_at": "2024-03-10T00:00:00Z"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_link_url");
}

#[tokio::test]
async fn public_feed_serves_live_banners_and_follows_changes() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;
    let group = create_group(&app, &token, "top").await;
    let started = (Utc::now() - Duration::days(1)).to_rfc3339();
    let ended = (Utc::now() - Duration::hours(1)).to_rfc3339();

    let (_, live) = create_banner(
        &app,
        &token,
        json!({
            "group_id": group,
            "title": "Now showing",
            "is_published": true,
            "published_at": started
        }),
    )
    .await;
    create_banner(
        &app,
        &token,
        json!({
            "group_id": group,
            "sequence": 2,
            "title": "Expired",
            "is_published": true,
            "published_at": started,
            "unpublished_at": ended
        }),
    )
    .await;

    let response = app.get("/v1/public/banners?kind=top", None).await;
    assert_eq!(response.status, StatusCode::OK);
    let banners = response.body["banners"].as_array().expect("banners");
    assert_eq!(banners.len(), 1);
    assert_eq!(banners[0]["title"], "Now showing");

    let response = app.get("/v1/public/banners?kind=popup", None).await;
    assert_eq!(response.body["banners"], json!([]));

    let live_id = live["id"].as_i64().expect("id");
    app.request(
        Method::PUT,
        &format!("/v1/admin/banners/{live_id}/publish"),
        Some(&token),
        Some(json!({ "is_published": false })),
    )
    .await;
    let response = app.get("/v1/public/banners?kind=top", None).await;
    assert_eq!(response.body["banners"], json!([]));
}

#[tokio::test]
async fn public_feed_requires_a_known_kind() {
    let app = TestApp::new().await;
    let response = app.get("/v1/public/banners", None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "invalid_kind");

    let response = app.get("/v1/public/banners?kind=sidebar", None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn image_upload_stores_and_serves_the_file() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;
    let group = create_group(&app, &token, "top").await;
    let (_, banner) = create_banner(
        &app,
        &token,
        json!({ "group_id": group, "title": "Pictured", "published_at": "2024-03-10T00:00:00Z" }),
    )
    .await;
    let id = banner["id"].as_i64().expect("id");

    let response = app
        .send(multipart_request(
            &format!("/v1/admin/banners/{id}/image"),
            Some(&token),
            "image",
            "hero.png",
            &png_bytes(),
        ))
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    let url = response.body["image_url"].as_str().expect("image url").to_string();
    assert!(url.starts_with("/uploads/banners/"), "{url}");
    assert!(response.body["mobile_image_url"].is_null());

    let served = app.get(&url, None).await;
    assert_eq!(served.status, StatusCode::OK);

    let response = app
        .send(multipart_request(
            &format!("/v1/admin/banners/{id}/image"),
            Some(&token),
            "image",
            "hero.exe",
            b"MZ",
        ))
        .await;
    assert_eq!(response.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let response = app
        .send(multipart_request(
            &format!("/v1/admin/banners/{id}/image"),
            Some(&token),
            "image",
            "broken.png",
            b"not really a png",
        ))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "invalid_image");
}

#[tokio::test]
async fn non_empty_group_cannot_be_deleted() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;
    let group = create_group(&app, &token, "top").await;
    let (_, banner) = create_banner(
        &app,
        &token,
        json!({ "group_id": group, "title": "Occupant", "published_at": "2024-03-10T00:00:00Z" }),
    )
    .await;

    let response = app
        .request(
            Method::DELETE,
            &format!("/v1/admin/banner-groups/{group}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["error"], "banner_group_not_empty");

    let id = banner["id"].as_i64().expect("id");
    let response = app
        .request(Method::DELETE, &format!("/v1/admin/banners/{id}"), Some(&token), None)
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    let response = app
        .request(
            Method::DELETE,
            &format!("/v1/admin/banner-groups/{group}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn banners_need_the_banner_permission() {
    let app = TestApp::new().await;
    let token = app.staff_token("analyst", &[Permission::Analytics]).await;
    let response = app.get("/v1/admin/banners", Some(&token)).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let token = app.staff_token("designer", &[Permission::Banners]).await;
    let response = app.get("/v1/admin/banners", Some(&token)).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writes_to_one_slot_admit_a_single_banner() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;
    let group = create_group(&app, &token, "top").await;

    for sequence in 1..=10 {
        let body = |title: &str, from: &str| {
            json!({
                "group_id": group,
                "sequence": sequence,
                "title": title,
                "is_published": true,
                "published_at": from,
                "unpublished_at": "2024-04-30T00:00:00Z"
            })
        };
        let (left, right) = tokio::join!(
            create_banner(&app, &token, body("Left", "2024-04-01T00:00:00Z")),
            create_banner(&app, &token, body("Right", "2024-04-10T00:00:00Z")),
        );
        let mut statuses = [left.0, right.0];
        statuses.sort();
        assert_eq!(
            statuses,
            [StatusCode::CREATED, StatusCode::CONFLICT],
            "slot {sequence}"
        );
    }

    // Publishing two overlapping drafts at once lets only one go live.
    let mut drafts = Vec::new();
    for title in ["Draft A", "Draft B"] {
        let (status, body) = create_banner(
            &app,
            &token,
            json!({
                "group_id": group,
                "sequence": 99,
                "title": title,
                "is_published": false,
                "published_at": "2024-05-01T00:00:00Z"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        drafts.push(body["id"].as_i64().expect("id"));
    }
    let (app, token) = (&app, token.as_str());
    let publish = |id: i64| async move {
        let uri = format!("/v1/admin/banners/{id}/publish");
        app.request(Method::PUT, &uri, Some(token), Some(json!({ "is_published": true })))
            .await
    };
    let (first, second) = tokio::join!(publish(drafts[0]), publish(drafts[1]));
    let mut statuses = [first.status, second.status];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::CONFLICT]);
}
