use chrono::{DateTime, Duration, TimeZone, Utc};
use docket_core::{BannerKind, ContentStatus, EmployeeStatus, LinkTarget, Permission};
use docket_db::repo::{
    BannerGroupRepo, BannerRepo, BannerWrite, ContentFileRepo, ContentFilter, ContentGroupRepo,
    ContentGroupWrite, ContentRepo, ContentUpdate, EmployeeProfile, EmployeeRepo, NewBannerGroup,
    NewContent, NewContentFile, NewEmployee, Page, PermissionRepo, SiteSettingsRepo, SlotWrite,
    VisitRepo,
};
use docket_db::{connect_sqlite, migrate, SqlitePool};

async fn setup_db() -> SqlitePool {
    let pool = connect_sqlite("sqlite::memory:").await.expect("connect");
    migrate(&pool).await.expect("migrate");
    pool
}

fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, d, 9, 0, 0)
        .single()
        .expect("valid date")
}

async fn create_employee(pool: &SqlitePool, login_id: &str) -> i64 {
    EmployeeRepo::new(pool)
        .create(&NewEmployee {
            login_id,
            name: "Han",
            email: Some("han@firm.example"),
            phone: None,
            position: Some("Associate"),
            password_hash: "hash",
            status: EmployeeStatus::Active,
            created_at: Utc::now(),
        })
        .await
        .expect("create employee")
}

fn board(slug: &str) -> ContentGroupWrite<'_> {
    ContentGroupWrite {
        slug,
        name: "Board",
        description: None,
        allow_anonymous: true,
        use_secret: true,
        allow_files: false,
        notify_email: false,
        is_active: true,
    }
}

fn post(group_id: i64, title: &str, is_notice: bool) -> NewContent<'_> {
    NewContent {
        group_id,
        title,
        body: "<p>body</p>",
        author_name: "Visitor",
        author_email: None,
        author_phone: None,
        password_hash: None,
        is_secret: false,
        is_notice,
        status: ContentStatus::Published,
        employee_id: None,
    }
}

#[tokio::test]
async fn employee_crud_and_permissions() {
    let pool = setup_db().await;
    let repo = EmployeeRepo::new(&pool);
    let id = create_employee(&pool, "han").await;

    let fetched = repo.get_by_login_id("han").await.expect("get").expect("exists");
    assert_eq!(fetched.id, id);
    assert_eq!(fetched.status, EmployeeStatus::Active);
    assert!(fetched.last_login_at.is_none());

    repo.update_profile(
        id,
        &EmployeeProfile {
            name: "Han Seo",
            email: None,
            phone: Some("02-555-0100"),
            position: None,
            status: EmployeeStatus::Disabled,
        },
    )
    .await
    .expect("update");
    let updated = repo.get_by_id(id).await.expect("get").expect("exists");
    assert_eq!(updated.name, "Han Seo");
    assert_eq!(updated.email, None);
    assert_eq!(updated.status, EmployeeStatus::Disabled);

    repo.set_permissions(id, &[Permission::Banners.id(), Permission::Analytics.id()])
        .await
        .expect("set permissions");
    assert_eq!(repo.permissions(id).await.expect("perms"), vec![2, 6]);
    repo.set_permissions(id, &[Permission::Contents.id()])
        .await
        .expect("replace permissions");
    assert_eq!(repo.permissions(id).await.expect("perms"), vec![3]);

    assert_eq!(repo.delete(id).await.expect("delete"), 1);
    assert!(repo.get_by_id(id).await.expect("get").is_none());
}

#[tokio::test]
async fn duplicate_login_id_is_rejected() {
    let pool = setup_db().await;
    create_employee(&pool, "park").await;
    let result = EmployeeRepo::new(&pool)
        .create(&NewEmployee {
            login_id: "park",
            name: "Other",
            email: None,
            phone: None,
            position: None,
            password_hash: "hash",
            status: EmployeeStatus::Active,
            created_at: Utc::now(),
        })
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn employee_search_and_paging() {
    let pool = setup_db().await;
    for login in ["alpha", "beta", "gamma_1", "gamma_2"] {
        create_employee(&pool, login).await;
    }
    let repo = EmployeeRepo::new(&pool);

    let (rows, total) = repo.list(Some("gamma"), Page::default()).await.expect("list");
    assert_eq!(total, 2);
    assert_eq!(rows.len(), 2);

    let (rows, total) = repo.list(None, Page::new(Some(3), Some(0))).await.expect("list");
    assert_eq!(total, 4);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].login_id, "gamma_2");

    let (_, total) = repo.list(Some("a_1"), Page::default()).await.expect("list");
    assert_eq!(total, 1);
}

#[tokio::test]
async fn counts_active_permission_holders() {
    let pool = setup_db().await;
    let repo = EmployeeRepo::new(&pool);
    let first = create_employee(&pool, "first").await;
    let second = create_employee(&pool, "second").await;
    let super_admin = Permission::SuperAdmin.id();
    repo.set_permissions(first, &[super_admin]).await.expect("set");
    repo.set_permissions(second, &[super_admin]).await.expect("set");
    assert_eq!(repo.count_active_with_permission(super_admin).await.expect("count"), 2);

    repo.update_profile(
        second,
        &EmployeeProfile {
            name: "Second",
            email: None,
            phone: None,
            position: None,
            status: EmployeeStatus::Disabled,
        },
    )
    .await
    .expect("disable");
    assert_eq!(repo.count_active_with_permission(super_admin).await.expect("count"), 1);
}

#[tokio::test]
async fn permission_catalogue_is_seeded() {
    let pool = setup_db().await;
    let rows = PermissionRepo::new(&pool).list().await.expect("list");
    let ids: Vec<i32> = rows.iter().map(|row| row.id).collect();
    let expected: Vec<i32> = Permission::ALL.iter().map(|p| p.id()).collect();
    assert_eq!(ids, expected);
    assert_eq!(rows[0].name, "super_admin");
}

#[tokio::test]
async fn banner_slot_queries() {
    let pool = setup_db().await;
    let groups = BannerGroupRepo::new(&pool);
    let group_id = groups
        .create(&NewBannerGroup {
            kind: BannerKind::Top,
            name: "Top",
            description: None,
            is_active: true,
        })
        .await
        .expect("group");
    let banners = BannerRepo::new(&pool);
    let write = |sequence: i32, published: bool, start: u32, end: Option<u32>| BannerWrite {
        group_id,
        sequence,
        title: "Banner",
        link_url: Some("/about"),
        link_target: LinkTarget::SameWindow,
        is_published: published,
        published_at: day(start),
        unpublished_at: end.map(day),
    };

    let a = banners.create(&write(1, true, 1, Some(10)), None).await.expect("a");
    let _hidden = banners.create(&write(1, false, 1, None), None).await.expect("hidden");
    let _other_slot = banners.create(&write(2, true, 1, None), None).await.expect("other");
    let b = banners.create(&write(1, true, 20, None), None).await.expect("b");

    let slot = banners
        .list_published_in_slot(group_id, 1, None)
        .await
        .expect("slot");
    assert_eq!(slot.iter().map(|b| b.id).collect::<Vec<_>>(), vec![a, b]);

    let slot = banners
        .list_published_in_slot(group_id, 1, Some(a))
        .await
        .expect("slot");
    assert_eq!(slot.iter().map(|b| b.id).collect::<Vec<_>>(), vec![b]);

    let stored = banners.get(a).await.expect("get").expect("exists");
    assert_eq!(stored.published_at, day(1));
    assert_eq!(stored.unpublished_at, Some(day(10)));

    assert_eq!(groups.count_banners(group_id).await.expect("count"), 4);
}

#[tokio::test]
async fn live_banners_respect_group_state_and_window() {
    let pool = setup_db().await;
    let groups = BannerGroupRepo::new(&pool);
    let banners = BannerRepo::new(&pool);
    let now = Utc::now();
    let group = |is_active: bool| NewBannerGroup {
        kind: BannerKind::Popup,
        name: "Popups",
        description: None,
        is_active,
    };
    let active = groups.create(&group(true)).await.expect("active");
    let inactive = groups.create(&group(false)).await.expect("inactive");

    let write = |group_id: i64, sequence: i32, start: DateTime<Utc>, end: Option<DateTime<Utc>>| {
        BannerWrite {
            group_id,
            sequence,
            title: "Popup",
            link_url: None,
            link_target: LinkTarget::NewWindow,
            is_published: true,
            published_at: start,
            unpublished_at: end,
        }
    };

    let live_second = banners
        .create(&write(active, 2, now - Duration::days(1), None), None)
        .await
        .expect("live");
    let live_first = banners
        .create(&write(active, 1, now - Duration::days(2), Some(now + Duration::days(2))), None)
        .await
        .expect("live");
    banners
        .create(&write(active, 3, now + Duration::days(1), None), None)
        .await
        .expect("future");
    banners
        .create(&write(active, 4, now - Duration::days(5), Some(now - Duration::days(1))), None)
        .await
        .expect("expired");
    banners
        .create(&write(inactive, 1, now - Duration::days(1), None), None)
        .await
        .expect("inactive group");

    let live = banners
        .list_live_by_kind(BannerKind::Popup, now)
        .await
        .expect("live");
    assert_eq!(
        live.iter().map(|b| b.id).collect::<Vec<_>>(),
        vec![live_first, live_second]
    );
    assert!(banners
        .list_live_by_kind(BannerKind::Bottom, now)
        .await
        .expect("live")
        .is_empty());
}

#[tokio::test]
async fn banner_image_and_publish_updates() {
    let pool = setup_db().await;
    let group_id = BannerGroupRepo::new(&pool)
        .create(&NewBannerGroup {
            kind: BannerKind::Mid,
            name: "Mid",
            description: Some("middle"),
            is_active: true,
        })
        .await
        .expect("group");
    let banners = BannerRepo::new(&pool);
    let id = banners
        .create(
            &BannerWrite {
                group_id,
                sequence: 1,
                title: "Mid",
                link_url: None,
                link_target: LinkTarget::SameWindow,
                is_published: false,
                published_at: day(1),
                unpublished_at: None,
            },
            None,
        )
        .await
        .expect("create");

    banners
        .set_image(id, false, Some("banners/2024/05/a.webp"))
        .await
        .expect("image");
    banners
        .set_image(id, true, Some("banners/2024/05/m.webp"))
        .await
        .expect("mobile image");
    banners.set_published(id, true).await.expect("publish");

    let stored = banners.get(id).await.expect("get").expect("exists");
    assert_eq!(stored.image_path.as_deref(), Some("banners/2024/05/a.webp"));
    assert_eq!(stored.mobile_image_path.as_deref(), Some("banners/2024/05/m.webp"));
    assert!(stored.is_published);

    assert_eq!(banners.delete(id).await.expect("delete"), 1);
    assert!(banners.get(id).await.expect("get").is_none());
}

#[tokio::test]
async fn content_listing_puts_notices_first_and_hides_deleted() {
    let pool = setup_db().await;
    let group_id = ContentGroupRepo::new(&pool)
        .create(&board("qna"))
        .await
        .expect("group");
    let contents = ContentRepo::new(&pool);

    let first = contents.create(&post(group_id, "First question", false)).await.expect("first");
    let notice = contents.create(&post(group_id, "Office hours", true)).await.expect("notice");
    let second = contents.create(&post(group_id, "Second question", false)).await.expect("second");
    let deleted = contents.create(&post(group_id, "Spam", false)).await.expect("deleted");
    contents.soft_delete(deleted).await.expect("soft delete");
    contents
        .set_status(second, ContentStatus::Hidden)
        .await
        .expect("hide");

    let filter = ContentFilter {
        group_id: Some(group_id),
        ..ContentFilter::default()
    };
    let (rows, total) = contents.list(&filter, Page::default()).await.expect("list");
    assert_eq!(total, 3);
    assert_eq!(rows[0].id, notice);
    assert!(rows.iter().all(|row| row.id != deleted));

    let public = ContentFilter {
        group_id: Some(group_id),
        search: None,
        published_only: true,
    };
    let (rows, total) = contents.list(&public, Page::default()).await.expect("list");
    assert_eq!(total, 2);
    assert_eq!(
        rows.iter().map(|row| row.id).collect::<Vec<_>>(),
        vec![notice, first]
    );

    let search = ContentFilter {
        group_id: Some(group_id),
        search: Some("question".to_string()),
        published_only: false,
    };
    let (_, total) = contents.list(&search, Page::default()).await.expect("search");
    assert_eq!(total, 2);

    assert!(contents.get(deleted).await.expect("get").is_none());
    assert_eq!(
        ContentGroupRepo::new(&pool)
            .count_contents(group_id)
            .await
            .expect("count"),
        4
    );
}

#[tokio::test]
async fn content_update_reply_and_views() {
    let pool = setup_db().await;
    let staff = create_employee(&pool, "staff").await;
    let group_id = ContentGroupRepo::new(&pool)
        .create(&board("consult"))
        .await
        .expect("group");
    let contents = ContentRepo::new(&pool);
    let id = contents.create(&post(group_id, "Help", false)).await.expect("create");

    contents
        .update(
            id,
            &ContentUpdate {
                title: "Help please",
                body: "<p>updated</p>",
                is_secret: true,
                is_notice: false,
            },
        )
        .await
        .expect("update");
    contents
        .set_reply(id, Some("We will call you."), staff)
        .await
        .expect("reply");
    contents.increment_views(id).await.expect("views");
    contents.increment_views(id).await.expect("views");

    let stored = contents.get(id).await.expect("get").expect("exists");
    assert_eq!(stored.title, "Help please");
    assert!(stored.is_secret);
    assert_eq!(stored.reply.as_deref(), Some("We will call you."));
    assert_eq!(stored.replied_by, Some(staff));
    assert!(stored.replied_at.is_some());
    assert_eq!(stored.view_count, 2);

    contents.set_reply(id, None, staff).await.expect("clear reply");
    let stored = contents.get(id).await.expect("get").expect("exists");
    assert!(stored.reply.is_none());
    assert!(stored.replied_by.is_none());
}

#[tokio::test]
async fn checked_banner_writes_report_slot_conflicts() {
    let pool = setup_db().await;
    let group_id = BannerGroupRepo::new(&pool)
        .create(&NewBannerGroup {
            kind: BannerKind::Top,
            name: "Top",
            description: None,
            is_active: true,
        })
        .await
        .expect("group");
    let banners = BannerRepo::new(&pool);
    let write = |published: bool, start: u32, end: Option<u32>| BannerWrite {
        group_id,
        sequence: 1,
        title: "Banner",
        link_url: None,
        link_target: LinkTarget::SameWindow,
        is_published: published,
        published_at: day(start),
        unpublished_at: end.map(day),
    };

    let SlotWrite::Written(live) = banners
        .create_checked(&write(true, 1, Some(10)), None)
        .await
        .expect("live")
    else {
        panic!("first banner should be written");
    };
    assert_eq!(
        banners
            .create_checked(&write(true, 5, None), None)
            .await
            .expect("overlap"),
        SlotWrite::Conflict(vec![live])
    );
    let SlotWrite::Written(draft) = banners
        .create_checked(&write(false, 5, None), None)
        .await
        .expect("draft")
    else {
        panic!("drafts never conflict");
    };

    // The banner's own row does not count against its update.
    assert_eq!(
        banners
            .update_checked(live, &write(true, 2, Some(12)))
            .await
            .expect("update"),
        SlotWrite::Written(1)
    );
    assert_eq!(
        banners.set_published_checked(draft, true).await.expect("publish"),
        SlotWrite::Conflict(vec![live])
    );
    assert!(!banners.get(draft).await.expect("get").expect("exists").is_published);
    assert_eq!(
        banners.set_published_checked(live, false).await.expect("unpublish"),
        SlotWrite::Written(1)
    );
    assert_eq!(
        banners.set_published_checked(draft, true).await.expect("publish"),
        SlotWrite::Written(1)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_checked_creates_on_a_file_database_keep_one_banner() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("docket.db");
    let pool = connect_sqlite(&path.to_string_lossy()).await.expect("connect");
    migrate(&pool).await.expect("migrate");
    let group_id = BannerGroupRepo::new(&pool)
        .create(&NewBannerGroup {
            kind: BannerKind::Top,
            name: "Top",
            description: None,
            is_active: true,
        })
        .await
        .expect("group");

    let tasks: Vec<_> = (0..8u32)
        .map(|offset| {
            let pool = pool.clone();
            tokio::spawn(async move {
                BannerRepo::new(&pool)
                    .create_checked(
                        &BannerWrite {
                            group_id,
                            sequence: 1,
                            title: "Banner",
                            link_url: None,
                            link_target: LinkTarget::SameWindow,
                            is_published: true,
                            published_at: day(1 + offset),
                            unpublished_at: None,
                        },
                        None,
                    )
                    .await
                    .expect("create")
            })
        })
        .collect();
    let mut written = 0;
    for task in tasks {
        if matches!(task.await.expect("join"), SlotWrite::Written(_)) {
            written += 1;
        }
    }
    assert_eq!(written, 1);
    let slot = BannerRepo::new(&pool)
        .list_published_in_slot(group_id, 1, None)
        .await
        .expect("slot");
    assert_eq!(slot.len(), 1);
}

#[tokio::test]
async fn content_files_stop_at_the_limit() {
    let pool = setup_db().await;
    let group_id = ContentGroupRepo::new(&pool)
        .create(&board("limited"))
        .await
        .expect("group");
    let content_id = ContentRepo::new(&pool)
        .create(&post(group_id, "Limited", false))
        .await
        .expect("content");
    let files = ContentFileRepo::new(&pool);
    let file = NewContentFile {
        content_id,
        original_name: "brief.pdf",
        stored_path: "contents/2024/05/brief.pdf",
        mime_type: "application/pdf",
        size_bytes: 1024,
    };
    assert!(files.create_within_limit(&file, 2).await.expect("first").is_some());
    assert!(files.create_within_limit(&file, 2).await.expect("second").is_some());
    assert!(files.create_within_limit(&file, 2).await.expect("third").is_none());
    assert_eq!(files.count_by_content(content_id).await.expect("count"), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_attachments_respect_the_limit() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("docket.db");
    let pool = connect_sqlite(&path.to_string_lossy()).await.expect("connect");
    migrate(&pool).await.expect("migrate");
    let group_id = ContentGroupRepo::new(&pool)
        .create(&board("racing"))
        .await
        .expect("group");
    let content_id = ContentRepo::new(&pool)
        .create(&post(group_id, "Racing", false))
        .await
        .expect("content");

    let tasks: Vec<_> = (0..6)
        .map(|_| {
            let pool = pool.clone();
            tokio::spawn(async move {
                ContentFileRepo::new(&pool)
                    .create_within_limit(
                        &NewContentFile {
                            content_id,
                            original_name: "brief.pdf",
                            stored_path: "contents/2024/05/brief.pdf",
                            mime_type: "application/pdf",
                            size_bytes: 1024,
                        },
                        2,
                    )
                    .await
                    .expect("create")
            })
        })
        .collect();
    let mut stored = 0;
    for task in tasks {
        if task.await.expect("join").is_some() {
            stored += 1;
        }
    }
    assert_eq!(stored, 2);
    assert_eq!(
        ContentFileRepo::new(&pool)
            .count_by_content(content_id)
            .await
            .expect("count"),
        2
    );
}

#[tokio::test]
async fn content_group_slug_is_unique() {
    let pool = setup_db().await;
    let groups = ContentGroupRepo::new(&pool);
    let id = groups.create(&board("notice")).await.expect("create");
    assert!(groups.create(&board("notice")).await.is_err());
    let fetched = groups.get_by_slug("notice").await.expect("get").expect("exists");
    assert_eq!(fetched.id, id);
    assert!(fetched.allow_anonymous);
    assert!(!fetched.allow_files);
}

#[tokio::test]
async fn content_files_follow_their_post() {
    let pool = setup_db().await;
    let group_id = ContentGroupRepo::new(&pool)
        .create(&board("files"))
        .await
        .expect("group");
    let content_id = ContentRepo::new(&pool)
        .create(&post(group_id, "With file", false))
        .await
        .expect("content");
    let files = ContentFileRepo::new(&pool);
    let file_id = files
        .create(&NewContentFile {
            content_id,
            original_name: "brief.pdf",
            stored_path: "contents/2024/05/brief.pdf",
            mime_type: "application/pdf",
            size_bytes: 1024,
        })
        .await
        .expect("file");

    let listed = files.list_by_content(content_id).await.expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].original_name, "brief.pdf");
    assert_eq!(files.count_by_content(content_id).await.expect("count"), 1);
    assert_eq!(files.delete(file_id).await.expect("delete"), 1);
    assert!(files.get(file_id).await.expect("get").is_none());
}

#[tokio::test]
async fn site_settings_roundtrip() {
    let pool = setup_db().await;
    let repo = SiteSettingsRepo::new(&pool);
    let mut settings = repo.get().await.expect("seeded");
    assert_eq!(settings.site_name, "Docket");
    assert_eq!(settings.smtp_port, 587);
    assert_eq!(settings.smtp_tls_mode, "starttls");
    assert!(settings.cors_origins.is_empty());

    settings.site_name = "Han & Partners".to_string();
    settings.cors_origins = vec!["https://hanlaw.example".to_string()];
    settings.blocked_bots = vec!["BadBot".to_string()];
    settings.jwt_expiry_minutes = 60;
    settings.updated_at = Utc::now();
    repo.update(&settings).await.expect("update");

    let stored = repo.get().await.expect("get");
    assert_eq!(stored.site_name, "Han & Partners");
    assert_eq!(stored.cors_origins, vec!["https://hanlaw.example".to_string()]);
    assert!(stored.is_bot("Mozilla/5.0 (compatible; badbot/1.0)"));
    assert_eq!(stored.jwt_expiry_minutes, 60);
}

#[tokio::test]
async fn visit_aggregates() {
    let pool = setup_db().await;
    let repo = VisitRepo::new(&pool);
    let visits = [
        ("/", Some("https://search.example"), Some("1.1.1.1"), day(1)),
        ("/", None, Some("1.1.1.1"), day(1)),
        ("/about", Some("https://search.example"), Some("2.2.2.2"), day(2)),
        ("/about", None, None, day(2)),
        ("/", None, Some("3.3.3.3"), day(3)),
        ("/old", None, Some("4.4.4.4"), day(20)),
    ];
    for (path, referrer, ip, at) in visits {
        repo.create(path, referrer, Some("Mozilla/5.0"), ip, at)
            .await
            .expect("visit");
    }

    let (from, to) = (day(1), day(4));
    assert_eq!(repo.count_between(from, to).await.expect("count"), 5);
    assert_eq!(repo.unique_visitors(from, to).await.expect("unique"), 3);

    let daily = repo.daily_counts(from, to).await.expect("daily");
    let daily: Vec<(String, i64)> = daily.into_iter().map(|d| (d.day, d.count)).collect();
    assert_eq!(
        daily,
        vec![
            ("2024-05-01".to_string(), 2),
            ("2024-05-02".to_string(), 2),
            ("2024-05-03".to_string(), 1),
        ]
    );

    let paths = repo.top_paths(from, to, 10).await.expect("paths");
    assert_eq!(paths[0].name, "/");
    assert_eq!(paths[0].count, 3);
    assert_eq!(paths[1].name, "/about");

    let referrers = repo.top_referrers(from, to, 10).await.expect("referrers");
    assert_eq!(referrers.len(), 1);
    assert_eq!(referrers[0].count, 2);

    let recent = repo.list_between(from, to, 2).await.expect("recent");
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].visited_at, day(3));
}
