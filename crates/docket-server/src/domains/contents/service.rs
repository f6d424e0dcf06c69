//! Boards (content groups) and their posts.
//!
//! Staff manage everything under `/v1/admin`; visitors read and write through
//! a board's slug. Anonymous posts carry an author password that gates secret
//! posts and later attachments.

use chrono::{DateTime, Utc};
use docket_core::sanitize::{escape_text, sanitize_html, to_plain_text, unescape_text};
use docket_core::validation;
use docket_core::{Content, ContentFile, ContentGroup, ContentStatus, Identity, Permission};
use docket_db::repo::{
    ContentFileRepo, ContentFilter, ContentGroupRepo, ContentGroupWrite, ContentRepo,
    ContentUpdate, NewContent, NewContentFile, Page,
};

use crate::app::AppState;
use crate::domains::access_control::{require, require_owner_or};
use crate::domains::auth::helpers::{hash_limited, verify_limited};
use crate::domains::errors::{db_error, is_unique_violation, ServiceError};
use crate::domains::site::service::load_settings;
use crate::infra::mailer::{render_new_post, NewPostNotice};
use crate::infra::metrics;
use crate::infra::recaptcha::CaptchaOutcome;
use crate::infra::uploads::UploadKind;

pub const SECRET_TITLE: &str = "Secret post";
const AUTHOR_PASSWORD_MIN: usize = 4;
const AUTHOR_PASSWORD_MAX: usize = 128;
const BODY_MAX: usize = 20_000;

pub struct ContentGroupCommand {
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub allow_anonymous: bool,
    pub use_secret: bool,
    pub allow_files: bool,
    pub notify_email: bool,
    pub is_active: bool,
}

pub struct ListContentsCommand {
    pub group_id: Option<i64>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub struct ContentListResult {
    pub contents: Vec<Content>,
    pub total: i64,
}

pub struct ContentDetail {
    pub content: Content,
    pub files: Vec<ContentFile>,
}

pub struct StaffPostCommand {
    pub group_id: i64,
    pub title: String,
    pub body: String,
    pub is_secret: bool,
    pub is_notice: bool,
}

pub struct UpdateContentCommand {
    pub title: String,
    pub body: String,
    pub is_secret: bool,
    pub is_notice: bool,
}

pub struct PublicPostCommand {
    pub author_name: String,
    pub author_email: Option<String>,
    pub author_phone: Option<String>,
    pub password: String,
    pub title: String,
    pub body: String,
    pub is_secret: bool,
    pub captcha_token: Option<String>,
    pub client_ip: Option<String>,
}

pub struct Attachment {
    pub file_name: String,
    pub data: Vec<u8>,
}

/// A row of a public board listing. Secret posts keep their place in the
/// list but hide the title.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PublicSummary {
    pub id: i64,
    pub title: String,
    pub author_name: String,
    pub is_secret: bool,
    pub is_notice: bool,
    pub view_count: i64,
    pub answered: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Content> for PublicSummary {
    fn from(content: &Content) -> Self {
        let title = if content.is_secret {
            SECRET_TITLE.to_string()
        } else {
            content.title.clone()
        };
        Self {
            id: content.id,
            title,
            author_name: content.author_name.clone(),
            is_secret: content.is_secret,
            is_notice: content.is_notice,
            view_count: content.view_count,
            answered: content.reply.is_some(),
            created_at: content.created_at,
        }
    }
}

pub struct PublicListResult {
    pub group: ContentGroup,
    pub items: Vec<PublicSummary>,
    pub total: i64,
}

async fn load_group(state: &AppState, id: i64) -> Result<ContentGroup, ServiceError> {
    ContentGroupRepo::new(&state.db)
        .get(id)
        .await
        .map_err(|err| db_error("content_group_get", err))?
        .ok_or(ServiceError::NotFound)
}

/// Inactive boards do not exist for visitors.
async fn load_public_group(state: &AppState, slug: &str) -> Result<ContentGroup, ServiceError> {
    ContentGroupRepo::new(&state.db)
        .get_by_slug(slug)
        .await
        .map_err(|err| db_error("content_group_by_slug", err))?
        .filter(|group| group.is_active)
        .ok_or(ServiceError::NotFound)
}

async fn load_content(state: &AppState, id: i64) -> Result<Content, ServiceError> {
    ContentRepo::new(&state.db)
        .get(id)
        .await
        .map_err(|err| db_error("content_get", err))?
        .ok_or(ServiceError::NotFound)
}

async fn load_files(state: &AppState, content_id: i64) -> Result<Vec<ContentFile>, ServiceError> {
    ContentFileRepo::new(&state.db)
        .list_by_content(content_id)
        .await
        .map_err(|err| db_error("content_files", err))
}

async fn load_public_content(
    state: &AppState,
    group: &ContentGroup,
    id: i64,
) -> Result<Content, ServiceError> {
    let content = load_content(state, id).await?;
    if content.group_id != group.id || content.status != ContentStatus::Published {
        return Err(ServiceError::NotFound);
    }
    Ok(content)
}

fn validated_group(cmd: &ContentGroupCommand) -> Result<(String, String, Option<String>), ServiceError> {
    let slug = cmd.slug.trim().to_ascii_lowercase();
    if !validation::is_slug(&slug) {
        return Err(ServiceError::BadRequest("invalid_slug"));
    }
    let name = validation::require_len("invalid_name", &cmd.name, 1, 100)?;
    let description =
        validation::optional_len("invalid_description", cmd.description.as_deref(), 500)?;
    Ok((slug, name, description))
}

fn group_write_error(operation: &'static str, err: sqlx_core::Error) -> ServiceError {
    if is_unique_violation(&err) {
        ServiceError::Conflict("slug_taken")
    } else {
        db_error(operation, err)
    }
}

fn validated_body(body: &str) -> Result<String, ServiceError> {
    let body = validation::require_len("invalid_body", body, 1, BODY_MAX)?;
    let body = sanitize_html(&body);
    if body.is_empty() {
        return Err(ServiceError::BadRequest("invalid_body"));
    }
    Ok(body)
}

fn author_password(value: &str) -> Result<(), ServiceError> {
    let len = value.chars().count();
    if (AUTHOR_PASSWORD_MIN..=AUTHOR_PASSWORD_MAX).contains(&len) {
        Ok(())
    } else {
        Err(ServiceError::BadRequest("invalid_password"))
    }
}

/// Staff-authored posts belong to their author; anonymous posts to nobody.
fn owner_of(content: &Content) -> Option<i64> {
    content.employee_id
}

pub async fn list_groups(
    state: &AppState,
    identity: &Identity,
) -> Result<Vec<ContentGroup>, ServiceError> {
    require(identity, Permission::Contents, "list_groups")?;
    ContentGroupRepo::new(&state.db)
        .list()
        .await
        .map_err(|err| db_error("content_group_list", err))
}

pub async fn get_group(
    state: &AppState,
    identity: &Identity,
    id: i64,
) -> Result<ContentGroup, ServiceError> {
    require(identity, Permission::Contents, "get_group")?;
    load_group(state, id).await
}

pub async fn create_group(
    state: &AppState,
    identity: &Identity,
    cmd: ContentGroupCommand,
) -> Result<ContentGroup, ServiceError> {
    require(identity, Permission::Contents, "create_group")?;
    let (slug, name, description) = validated_group(&cmd)?;
    let id = ContentGroupRepo::new(&state.db)
        .create(&ContentGroupWrite {
            slug: &slug,
            name: &name,
            description: description.as_deref(),
            allow_anonymous: cmd.allow_anonymous,
            use_secret: cmd.use_secret,
            allow_files: cmd.allow_files,
            notify_email: cmd.notify_email,
            is_active: cmd.is_active,
        })
        .await
        .map_err(|err| group_write_error("content_group_create", err))?;
    tracing::info!(event = "content_group_created", group_id = id, slug = %slug, by = identity.employee_id);
    load_group(state, id).await
}

pub async fn update_group(
    state: &AppState,
    identity: &Identity,
    id: i64,
    cmd: ContentGroupCommand,
) -> Result<ContentGroup, ServiceError> {
    require(identity, Permission::Contents, "update_group")?;
    let (slug, name, description) = validated_group(&cmd)?;
    let updated = ContentGroupRepo::new(&state.db)
        .update(
            id,
            &ContentGroupWrite {
                slug: &slug,
                name: &name,
                description: description.as_deref(),
                allow_anonymous: cmd.allow_anonymous,
                use_secret: cmd.use_secret,
                allow_files: cmd.allow_files,
                notify_email: cmd.notify_email,
                is_active: cmd.is_active,
            },
        )
        .await
        .map_err(|err| group_write_error("content_group_update", err))?;
    if updated == 0 {
        return Err(ServiceError::NotFound);
    }
    tracing::info!(event = "content_group_updated", group_id = id, by = identity.employee_id);
    load_group(state, id).await
}

pub async fn delete_group(
    state: &AppState,
    identity: &Identity,
    id: i64,
) -> Result<(), ServiceError> {
    require(identity, Permission::Contents, "delete_group")?;
    let repo = ContentGroupRepo::new(&state.db);
    load_group(state, id).await?;
    let count = repo
        .count_contents(id)
        .await
        .map_err(|err| db_error("content_group_count", err))?;
    if count > 0 {
        return Err(ServiceError::Conflict("content_group_not_empty"));
    }
    repo.delete(id)
        .await
        .map_err(|err| db_error("content_group_delete", err))?;
    tracing::info!(event = "content_group_deleted", group_id = id, by = identity.employee_id);
    Ok(())
}

pub async fn list_contents(
    state: &AppState,
    identity: &Identity,
    cmd: ListContentsCommand,
) -> Result<ContentListResult, ServiceError> {
    require(identity, Permission::Contents, "list")?;
    let filter = ContentFilter {
        group_id: cmd.group_id,
        search: cmd
            .search
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty()),
        published_only: false,
    };
    let (contents, total) = ContentRepo::new(&state.db)
        .list(&filter, Page::new(cmd.limit, cmd.offset))
        .await
        .map_err(|err| db_error("content_list", err))?;
    Ok(ContentListResult { contents, total })
}

pub async fn get_content(
    state: &AppState,
    identity: &Identity,
    id: i64,
) -> Result<ContentDetail, ServiceError> {
    let content = load_content(state, id).await?;
    require_owner_or(identity, owner_of(&content), Permission::Contents, "get")?;
    let files = load_files(state, id).await?;
    Ok(ContentDetail { content, files })
}

pub async fn create_content(
    state: &AppState,
    identity: &Identity,
    cmd: StaffPostCommand,
) -> Result<ContentDetail, ServiceError> {
    require(identity, Permission::Contents, "create")?;
    let group = load_group(state, cmd.group_id)
        .await
        .map_err(|err| match err {
            ServiceError::NotFound => ServiceError::BadRequest("unknown_group"),
            other => other,
        })?;
    let title = validation::require_len("invalid_title", &cmd.title, 1, 200)?;
    let body = validated_body(&cmd.body)?;
    let id = ContentRepo::new(&state.db)
        .create(&NewContent {
            group_id: group.id,
            title: &title,
            body: &body,
            author_name: &identity.name,
            author_email: None,
            author_phone: None,
            password_hash: None,
            is_secret: cmd.is_secret,
            is_notice: cmd.is_notice,
            status: ContentStatus::Published,
            employee_id: Some(identity.employee_id),
        })
        .await
        .map_err(|err| db_error("content_create", err))?;
    tracing::info!(event = "content_created", content_id = id, group_id = group.id, by = identity.employee_id);
    get_content(state, identity, id).await
}

pub async fn update_content(
    state: &AppState,
    identity: &Identity,
    id: i64,
    cmd: UpdateContentCommand,
) -> Result<ContentDetail, ServiceError> {
    let current = load_content(state, id).await?;
    require_owner_or(identity, owner_of(&current), Permission::Contents, "update")?;
    let title = validation::require_len("invalid_title", &cmd.title, 1, 200)?;
    let body = validated_body(&cmd.body)?;
    ContentRepo::new(&state.db)
        .update(
            id,
            &ContentUpdate {
                title: &title,
                body: &body,
                is_secret: cmd.is_secret,
                is_notice: cmd.is_notice,
            },
        )
        .await
        .map_err(|err| db_error("content_update", err))?;
    tracing::info!(event = "content_updated", content_id = id, by = identity.employee_id);
    get_content(state, identity, id).await
}

pub async fn delete_content(
    state: &AppState,
    identity: &Identity,
    id: i64,
) -> Result<(), ServiceError> {
    let current = load_content(state, id).await?;
    require_owner_or(identity, owner_of(&current), Permission::Contents, "delete")?;
    ContentRepo::new(&state.db)
        .soft_delete(id)
        .await
        .map_err(|err| db_error("content_delete", err))?;
    tracing::info!(event = "content_deleted", content_id = id, by = identity.employee_id);
    Ok(())
}

/// An empty reply clears the answer.
pub async fn reply(
    state: &AppState,
    identity: &Identity,
    id: i64,
    reply: Option<String>,
) -> Result<ContentDetail, ServiceError> {
    require(identity, Permission::Contents, "reply")?;
    load_content(state, id).await?;
    let reply = validation::optional_len("invalid_reply", reply.as_deref(), BODY_MAX)?
        .map(|value| sanitize_html(&value))
        .filter(|value| !value.is_empty());
    ContentRepo::new(&state.db)
        .set_reply(id, reply.as_deref(), identity.employee_id)
        .await
        .map_err(|err| db_error("content_reply", err))?;
    tracing::info!(
        event = "content_replied",
        content_id = id,
        cleared = reply.is_none(),
        by = identity.employee_id
    );
    get_content(state, identity, id).await
}

pub async fn set_status(
    state: &AppState,
    identity: &Identity,
    id: i64,
    status: ContentStatus,
) -> Result<ContentDetail, ServiceError> {
    require(identity, Permission::Contents, "set_status")?;
    load_content(state, id).await?;
    ContentRepo::new(&state.db)
        .set_status(id, status)
        .await
        .map_err(|err| db_error("content_status", err))?;
    tracing::info!(event = "content_status_set", content_id = id, status = status.as_str(), by = identity.employee_id);
    get_content(state, identity, id).await
}

async fn remove_stored(state: &AppState, stored_path: &str) {
    if let Err(cleanup) = state.uploads.remove(stored_path).await {
        tracing::warn!(event = "upload_cleanup_failed", error = %cleanup);
    }
}

/// Stores one attachment after the board and per-post limits pass. The
/// early count skips the disk write; the insert re-checks under the lock.
async fn attach(
    state: &AppState,
    group: &ContentGroup,
    content: &Content,
    file: Attachment,
) -> Result<ContentFile, ServiceError> {
    if !group.allow_files {
        return Err(ServiceError::BadRequest("files_not_allowed"));
    }
    let repo = ContentFileRepo::new(&state.db);
    let count = repo
        .count_by_content(content.id)
        .await
        .map_err(|err| db_error("content_file_count", err))?;
    if count >= state.uploads.max_files_per_content() {
        return Err(ServiceError::BadRequest("too_many_files"));
    }
    let stored = state
        .uploads
        .save("contents", UploadKind::Attachment, &file.file_name, file.data)
        .await?;
    let created = repo
        .create_within_limit(
            &NewContentFile {
                content_id: content.id,
                original_name: &stored.original_name,
                stored_path: &stored.stored_path,
                mime_type: &stored.mime_type,
                size_bytes: stored.size_bytes,
            },
            state.uploads.max_files_per_content(),
        )
        .await;
    let id = match created {
        Ok(Some(id)) => id,
        Ok(None) => {
            remove_stored(state, &stored.stored_path).await;
            return Err(ServiceError::BadRequest("too_many_files"));
        }
        Err(err) => {
            remove_stored(state, &stored.stored_path).await;
            return Err(db_error("content_file_create", err));
        }
    };
    tracing::info!(event = "content_file_added", content_id = content.id, file_id = id, size = stored.size_bytes);
    repo.get(id)
        .await
        .map_err(|err| db_error("content_file_get", err))?
        .ok_or(ServiceError::NotFound)
}

pub async fn upload_attachment(
    state: &AppState,
    identity: &Identity,
    id: i64,
    file: Attachment,
) -> Result<ContentFile, ServiceError> {
    let content = load_content(state, id).await?;
    require_owner_or(identity, owner_of(&content), Permission::Contents, "upload_file")?;
    let group = load_group(state, content.group_id).await?;
    attach(state, &group, &content, file).await
}

pub async fn delete_attachment(
    state: &AppState,
    identity: &Identity,
    content_id: i64,
    file_id: i64,
) -> Result<(), ServiceError> {
    let content = load_content(state, content_id).await?;
    require_owner_or(identity, owner_of(&content), Permission::Contents, "delete_file")?;
    let repo = ContentFileRepo::new(&state.db);
    let file = repo
        .get(file_id)
        .await
        .map_err(|err| db_error("content_file_get", err))?
        .filter(|file| file.content_id == content_id)
        .ok_or(ServiceError::NotFound)?;
    repo.delete(file_id)
        .await
        .map_err(|err| db_error("content_file_delete", err))?;
    if let Err(err) = state.uploads.remove(&file.stored_path).await {
        tracing::warn!(event = "upload_cleanup_failed", file_id, error = %err);
    }
    tracing::info!(event = "content_file_deleted", content_id, file_id, by = identity.employee_id);
    Ok(())
}

pub async fn public_list(
    state: &AppState,
    slug: &str,
    search: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
) -> Result<PublicListResult, ServiceError> {
    let group = load_public_group(state, slug).await?;
    let filter = ContentFilter {
        group_id: Some(group.id),
        search: search
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty()),
        published_only: true,
    };
    let (contents, total) = ContentRepo::new(&state.db)
        .list(&filter, Page::new(limit, offset))
        .await
        .map_err(|err| db_error("content_public_list", err))?;
    Ok(PublicListResult {
        group,
        items: contents.iter().map(PublicSummary::from).collect(),
        total,
    })
}

/// Secret posts need the author password. Staff-authored secret posts have
/// none and stay closed to visitors.
async fn check_author_password(
    state: &AppState,
    content: &Content,
    password: Option<&str>,
) -> Result<(), ServiceError> {
    let Some(stored) = content.password_hash.as_deref() else {
        return Err(ServiceError::Forbidden("secret_content"));
    };
    let Some(password) = password.filter(|value| !value.is_empty()) else {
        return Err(ServiceError::Unauthorized("password_required"));
    };
    if verify_limited(state, stored, password, "content_password").await? {
        Ok(())
    } else {
        tracing::warn!(event = "content_password_rejected", content_id = content.id);
        Err(ServiceError::Forbidden("wrong_password"))
    }
}

pub async fn public_get(
    state: &AppState,
    slug: &str,
    id: i64,
    password: Option<&str>,
) -> Result<ContentDetail, ServiceError> {
    let group = load_public_group(state, slug).await?;
    let mut content = load_public_content(state, &group, id).await?;
    if content.is_secret {
        check_author_password(state, &content, password).await?;
    }
    ContentRepo::new(&state.db)
        .increment_views(id)
        .await
        .map_err(|err| db_error("content_views", err))?;
    content.view_count += 1;
    let files = load_files(state, id).await?;
    Ok(ContentDetail { content, files })
}

pub async fn public_create(
    state: &AppState,
    slug: &str,
    cmd: PublicPostCommand,
) -> Result<ContentDetail, ServiceError> {
    let group = load_public_group(state, slug).await?;
    if !group.allow_anonymous {
        return Err(ServiceError::Forbidden("anonymous_posts_disabled"));
    }
    if cmd.is_secret && !group.use_secret {
        return Err(ServiceError::BadRequest("secret_not_allowed"));
    }
    let author_name = validation::require_len("invalid_author_name", &cmd.author_name, 1, 50)?;
    let author_email = validation::optional_email(cmd.author_email.as_deref())?;
    let author_phone = validation::optional_phone(cmd.author_phone.as_deref())?;
    author_password(&cmd.password)?;
    let title = validation::require_len("invalid_title", &cmd.title, 1, 200)?;
    let body = validated_body(&cmd.body)?;

    match state
        .recaptcha
        .verify(cmd.captcha_token.as_deref(), cmd.client_ip.as_deref())
        .await
    {
        CaptchaOutcome::Rejected => {
            tracing::warn!(event = "captcha_rejected", board = %group.slug);
            return Err(ServiceError::BadRequest("captcha_failed"));
        }
        CaptchaOutcome::Passed | CaptchaOutcome::Skipped => {}
    }

    let password_hash = hash_limited(state, &cmd.password, "content_create").await?;
    let title = escape_text(&title);
    let author_name = escape_text(&author_name);
    let id = ContentRepo::new(&state.db)
        .create(&NewContent {
            group_id: group.id,
            title: &title,
            body: &body,
            author_name: &author_name,
            author_email: author_email.as_deref(),
            author_phone: author_phone.as_deref(),
            password_hash: Some(&password_hash),
            is_secret: cmd.is_secret,
            is_notice: false,
            status: ContentStatus::Published,
            employee_id: None,
        })
        .await
        .map_err(|err| db_error("content_public_create", err))?;
    tracing::info!(event = "public_post_created", content_id = id, board = %group.slug);

    let content = load_content(state, id).await?;
    if group.notify_email {
        notify_staff(state, &group, &content).await;
    }
    Ok(ContentDetail {
        content,
        files: Vec::new(),
    })
}

/// Mail failures never fail the post.
async fn notify_staff(state: &AppState, group: &ContentGroup, content: &Content) {
    let settings = match load_settings(state).await {
        Ok(settings) => settings,
        Err(err) => {
            tracing::warn!(event = "post_notice_skipped", reason = %err);
            return;
        }
    };
    let Some(to) = settings.contact_email.clone() else {
        tracing::debug!(event = "post_notice_skipped", reason = "no_contact_email");
        return;
    };
    // Titles and author names are stored escaped; the template escapes again.
    let title = unescape_text(&content.title);
    let author = unescape_text(&content.author_name);
    let text = to_plain_text(&content.body);
    let notice = NewPostNotice {
        site_name: &settings.site_name,
        board: &group.name,
        title: &title,
        author: &author,
        email: content.author_email.as_deref(),
        phone: content.author_phone.as_deref(),
        body: &content.body,
        text: &text,
    };
    let message = match render_new_post(&to, &notice) {
        Ok(message) => message,
        Err(err) => {
            metrics::mail_sent("failed");
            tracing::error!(event = "post_notice_render_failed", error = %err);
            return;
        }
    };
    match state.mailer.send(&settings, message).await {
        Ok(()) => {
            metrics::mail_sent("sent");
            tracing::info!(event = "post_notice_sent", content_id = content.id);
        }
        Err(err) => {
            metrics::mail_sent("failed");
            tracing::error!(event = "post_notice_failed", content_id = content.id, error = %err);
        }
    }
}

pub async fn public_upload(
    state: &AppState,
    slug: &str,
    id: i64,
    password: Option<&str>,
    file: Attachment,
) -> Result<ContentFile, ServiceError> {
    let group = load_public_group(state, slug).await?;
    let content = load_public_content(state, &group, id).await?;
    if content.employee_id.is_some() {
        return Err(ServiceError::Forbidden("forbidden"));
    }
    check_author_password(state, &content, password).await?;
    attach(state, &group, &content, file).await
}
