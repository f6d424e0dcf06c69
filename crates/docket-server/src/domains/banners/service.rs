//! Banner groups, banners and the public banner feed.
//!
//! Every write that leaves a banner published runs the slot conflict check
//! first: within one `(group, sequence)` slot no two published banners may
//! have overlapping publish windows.

use chrono::{DateTime, Utc};
use docket_core::validation;
use docket_core::{Banner, BannerGroup, BannerKind, Identity, LinkTarget, Permission, PublishWindow};
use docket_db::repo::{BannerGroupRepo, BannerRepo, BannerWrite, NewBannerGroup, SlotWrite};

use crate::app::AppState;
use crate::domains::access_control::require;
use crate::domains::errors::{db_error, ServiceError};
use crate::infra::metrics;
use crate::infra::uploads::{StoredFile, UploadKind};

const CACHE_PREFIX: &str = "banners:";

pub struct BannerGroupCommand {
    pub kind: BannerKind,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
}

pub struct BannerCommand {
    pub group_id: i64,
    pub sequence: i32,
    pub title: String,
    pub link_url: Option<String>,
    pub link_target: LinkTarget,
    pub is_published: bool,
    pub published_at: DateTime<Utc>,
    pub unpublished_at: Option<DateTime<Utc>>,
}

pub struct BannerImage {
    pub mobile: bool,
    pub file_name: String,
    pub data: Vec<u8>,
}

fn invalidate_feed(state: &AppState) {
    state.banner_cache.invalidate_prefix(CACHE_PREFIX);
}

async fn load_group(state: &AppState, id: i64) -> Result<BannerGroup, ServiceError> {
    BannerGroupRepo::new(&state.db)
        .get(id)
        .await
        .map_err(|err| db_error("banner_group_get", err))?
        .ok_or(ServiceError::NotFound)
}

async fn load_banner(state: &AppState, id: i64) -> Result<Banner, ServiceError> {
    BannerRepo::new(&state.db)
        .get(id)
        .await
        .map_err(|err| db_error("banner_get", err))?
        .ok_or(ServiceError::NotFound)
}

/// Maps a slot-checked write to its value, reporting a collision as
/// `ScheduleConflict`.
fn slot_outcome<T>(
    outcome: SlotWrite<T>,
    group_id: i64,
    sequence: i32,
    operation: &'static str,
) -> Result<T, ServiceError> {
    let conflicts = match outcome {
        SlotWrite::Written(value) => return Ok(value),
        SlotWrite::Conflict(conflicts) => conflicts,
    };
    metrics::schedule_conflict(operation);
    tracing::warn!(
        event = "banner_schedule_conflict",
        operation,
        group_id,
        sequence,
        conflicts = ?conflicts,
        "Publish window overlaps"
    );
    Err(ServiceError::ScheduleConflict { conflicts })
}

fn validated_group(cmd: &BannerGroupCommand) -> Result<(String, Option<String>), ServiceError> {
    let name = validation::require_len("invalid_name", &cmd.name, 1, 100)?;
    let description =
        validation::optional_len("invalid_description", cmd.description.as_deref(), 500)?;
    Ok((name, description))
}

struct ValidatedBanner {
    title: String,
    link_url: Option<String>,
    window: PublishWindow,
}

fn validated_banner(cmd: &BannerCommand) -> Result<ValidatedBanner, ServiceError> {
    if cmd.sequence < 0 {
        return Err(ServiceError::BadRequest("invalid_sequence"));
    }
    let title = validation::require_len("invalid_title", &cmd.title, 1, 200)?;
    let link_url = validation::optional_len("invalid_link_url", cmd.link_url.as_deref(), 500)?;
    if let Some(url) = link_url.as_deref() {
        if !validation::is_link_url(url) {
            return Err(ServiceError::BadRequest("invalid_link_url"));
        }
    }
    let window = PublishWindow::new(cmd.published_at, cmd.unpublished_at)
        .map_err(|_| ServiceError::BadRequest("invalid_publish_window"))?;
    Ok(ValidatedBanner {
        title,
        link_url,
        window,
    })
}

pub async fn list_groups(
    state: &AppState,
    identity: &Identity,
    kind: Option<BannerKind>,
) -> Result<Vec<BannerGroup>, ServiceError> {
    require(identity, Permission::Banners, "list_groups")?;
    BannerGroupRepo::new(&state.db)
        .list(kind)
        .await
        .map_err(|err| db_error("banner_group_list", err))
}

pub async fn get_group(
    state: &AppState,
    identity: &Identity,
    id: i64,
) -> Result<BannerGroup, ServiceError> {
    require(identity, Permission::Banners, "get_group")?;
    load_group(state, id).await
}

pub async fn create_group(
    state: &AppState,
    identity: &Identity,
    cmd: BannerGroupCommand,
) -> Result<BannerGroup, ServiceError> {
    require(identity, Permission::Banners, "create_group")?;
    let (name, description) = validated_group(&cmd)?;
    let id = BannerGroupRepo::new(&state.db)
        .create(&NewBannerGroup {
            kind: cmd.kind,
            name: &name,
            description: description.as_deref(),
            is_active: cmd.is_active,
        })
        .await
        .map_err(|err| db_error("banner_group_create", err))?;
    invalidate_feed(state);
    tracing::info!(event = "banner_group_created", group_id = id, by = identity.employee_id);
    load_group(state, id).await
}

pub async fn update_group(
    state: &AppState,
    identity: &Identity,
    id: i64,
    cmd: BannerGroupCommand,
) -> Result<BannerGroup, ServiceError> {
    require(identity, Permission::Banners, "update_group")?;
    let (name, description) = validated_group(&cmd)?;
    let updated = BannerGroupRepo::new(&state.db)
        .update(
            id,
            &NewBannerGroup {
                kind: cmd.kind,
                name: &name,
                description: description.as_deref(),
                is_active: cmd.is_active,
            },
        )
        .await
        .map_err(|err| db_error("banner_group_update", err))?;
    if updated == 0 {
        return Err(ServiceError::NotFound);
    }
    invalidate_feed(state);
    tracing::info!(event = "banner_group_updated", group_id = id, by = identity.employee_id);
    load_group(state, id).await
}

pub async fn delete_group(
    state: &AppState,
    identity: &Identity,
    id: i64,
) -> Result<(), ServiceError> {
    require(identity, Permission::Banners, "delete_group")?;
    let repo = BannerGroupRepo::new(&state.db);
    load_group(state, id).await?;
    let banners = repo
        .count_banners(id)
        .await
        .map_err(|err| db_error("banner_group_count", err))?;
    if banners > 0 {
        return Err(ServiceError::Conflict("banner_group_not_empty"));
    }
    repo.delete(id)
        .await
        .map_err(|err| db_error("banner_group_delete", err))?;
    invalidate_feed(state);
    tracing::info!(event = "banner_group_deleted", group_id = id, by = identity.employee_id);
    Ok(())
}

pub async fn list_banners(
    state: &AppState,
    identity: &Identity,
    group_id: Option<i64>,
) -> Result<Vec<Banner>, ServiceError> {
    require(identity, Permission::Banners, "list")?;
    BannerRepo::new(&state.db)
        .list(group_id)
        .await
        .map_err(|err| db_error("banner_list", err))
}

pub async fn get_banner(
    state: &AppState,
    identity: &Identity,
    id: i64,
) -> Result<Banner, ServiceError> {
    require(identity, Permission::Banners, "get")?;
    load_banner(state, id).await
}

pub async fn create_banner(
    state: &AppState,
    identity: &Identity,
    cmd: BannerCommand,
) -> Result<Banner, ServiceError> {
    require(identity, Permission::Banners, "create")?;
    let banner = validated_banner(&cmd)?;
    load_group(state, cmd.group_id)
        .await
        .map_err(|err| match err {
            ServiceError::NotFound => ServiceError::BadRequest("unknown_group"),
            other => other,
        })?;
    let outcome = BannerRepo::new(&state.db)
        .create_checked(
            &BannerWrite {
                group_id: cmd.group_id,
                sequence: cmd.sequence,
                title: &banner.title,
                link_url: banner.link_url.as_deref(),
                link_target: cmd.link_target,
                is_published: cmd.is_published,
                published_at: banner.window.start,
                unpublished_at: banner.window.end,
            },
            Some(identity.employee_id),
        )
        .await
        .map_err(|err| db_error("banner_create", err))?;
    let id = slot_outcome(outcome, cmd.group_id, cmd.sequence, "create")?;
    invalidate_feed(state);
    tracing::info!(event = "banner_created", banner_id = id, by = identity.employee_id);
    load_banner(state, id).await
}

pub async fn update_banner(
    state: &AppState,
    identity: &Identity,
    id: i64,
    cmd: BannerCommand,
) -> Result<Banner, ServiceError> {
    require(identity, Permission::Banners, "update")?;
    let banner = validated_banner(&cmd)?;
    load_banner(state, id).await?;
    load_group(state, cmd.group_id)
        .await
        .map_err(|err| match err {
            ServiceError::NotFound => ServiceError::BadRequest("unknown_group"),
            other => other,
        })?;
    let outcome = BannerRepo::new(&state.db)
        .update_checked(
            id,
            &BannerWrite {
                group_id: cmd.group_id,
                sequence: cmd.sequence,
                title: &banner.title,
                link_url: banner.link_url.as_deref(),
                link_target: cmd.link_target,
                is_published: cmd.is_published,
                published_at: banner.window.start,
                unpublished_at: banner.window.end,
            },
        )
        .await
        .map_err(|err| db_error("banner_update", err))?;
    slot_outcome(outcome, cmd.group_id, cmd.sequence, "update")?;
    invalidate_feed(state);
    tracing::info!(event = "banner_updated", banner_id = id, by = identity.employee_id);
    load_banner(state, id).await
}

/// Publishing runs the same slot check against the stored window.
pub async fn set_published(
    state: &AppState,
    identity: &Identity,
    id: i64,
    is_published: bool,
) -> Result<Banner, ServiceError> {
    require(identity, Permission::Banners, "publish")?;
    let banner = load_banner(state, id).await?;
    let outcome = BannerRepo::new(&state.db)
        .set_published_checked(id, is_published)
        .await
        .map_err(|err| db_error("banner_publish", err))?;
    slot_outcome(outcome, banner.group_id, banner.sequence, "publish")?;
    invalidate_feed(state);
    tracing::info!(
        event = "banner_publish_toggled",
        banner_id = id,
        is_published,
        by = identity.employee_id
    );
    load_banner(state, id).await
}

pub async fn delete_banner(
    state: &AppState,
    identity: &Identity,
    id: i64,
) -> Result<(), ServiceError> {
    require(identity, Permission::Banners, "delete")?;
    let banner = load_banner(state, id).await?;
    BannerRepo::new(&state.db)
        .delete(id)
        .await
        .map_err(|err| db_error("banner_delete", err))?;
    for path in [banner.image_path, banner.mobile_image_path].into_iter().flatten() {
        if let Err(err) = state.uploads.remove(&path).await {
            tracing::warn!(event = "banner_image_remove_failed", path = %path, error = %err);
        }
    }
    invalidate_feed(state);
    tracing::info!(event = "banner_deleted", banner_id = id, by = identity.employee_id);
    Ok(())
}

/// Stores a desktop or mobile image and drops the file it replaces.
pub async fn upload_image(
    state: &AppState,
    identity: &Identity,
    id: i64,
    image: BannerImage,
) -> Result<Banner, ServiceError> {
    require(identity, Permission::Banners, "upload_image")?;
    let banner = load_banner(state, id).await?;
    let StoredFile { stored_path, .. } = state
        .uploads
        .save("banners", UploadKind::Image, &image.file_name, image.data)
        .await?;
    BannerRepo::new(&state.db)
        .set_image(id, image.mobile, Some(&stored_path))
        .await
        .map_err(|err| db_error("banner_set_image", err))?;
    let previous = if image.mobile {
        banner.mobile_image_path
    } else {
        banner.image_path
    };
    if let Some(previous) = previous {
        if let Err(err) = state.uploads.remove(&previous).await {
            tracing::warn!(event = "banner_image_remove_failed", path = %previous, error = %err);
        }
    }
    invalidate_feed(state);
    tracing::info!(
        event = "banner_image_uploaded",
        banner_id = id,
        mobile = image.mobile,
        by = identity.employee_id
    );
    load_banner(state, id).await
}

/// Live banners of active groups of `kind`, in display order. The feed is
/// cached per kind and re-filtered on read so windows that close while
/// cached drop out on time.
pub async fn live_banners(state: &AppState, kind: BannerKind) -> Result<Vec<Banner>, ServiceError> {
    let key = format!("{CACHE_PREFIX}{}", kind.as_str());
    let banners = state
        .banner_cache
        .get_or_try_insert_with(&key, || async {
            BannerRepo::new(&state.db)
                .list_live_by_kind(kind, Utc::now())
                .await
                .map_err(|err| db_error("banner_feed", err))
        })
        .await?;
    let now = Utc::now();
    Ok(banners
        .into_iter()
        .filter(|banner| banner.window().is_active_at(now))
        .collect())
}
