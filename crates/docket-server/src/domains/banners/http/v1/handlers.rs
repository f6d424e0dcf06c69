use std::str::FromStr;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use docket_core::{BannerKind, Identity};

use crate::app::AppState;
use crate::domains::banners::service::{self, BannerCommand, BannerGroupCommand, BannerImage};
use crate::domains::errors::ServiceError;
use crate::infra::uploads::read_field;

use super::types::{
    BannerGroupListResponse, BannerGroupRequest, BannerListResponse, BannerRequest,
    BannerResponse, GroupQuery, KindQuery, PublishRequest,
};

fn parse_kind(value: Option<&str>) -> Result<Option<BannerKind>, ServiceError> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| {
            BannerKind::from_str(&value.to_ascii_lowercase())
                .map_err(|_| ServiceError::BadRequest("invalid_kind"))
        })
        .transpose()
}

fn group_command(payload: BannerGroupRequest) -> BannerGroupCommand {
    BannerGroupCommand {
        kind: payload.kind,
        name: payload.name,
        description: payload.description,
        is_active: payload.is_active,
    }
}

fn banner_command(payload: BannerRequest) -> BannerCommand {
    BannerCommand {
        group_id: payload.group_id,
        sequence: payload.sequence,
        title: payload.title,
        link_url: payload.link_url,
        link_target: payload.link_target,
        is_published: payload.is_published,
        published_at: payload.published_at,
        unpublished_at: payload.unpublished_at,
    }
}

#[tracing::instrument(skip(state, identity, query))]
pub(crate) async fn list_groups(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<KindQuery>,
) -> impl IntoResponse {
    let kind = match parse_kind(query.kind.as_deref()) {
        Ok(kind) => kind,
        Err(err) => return err.into_response(),
    };
    match service::list_groups(&state, &identity, kind).await {
        Ok(groups) => Json(BannerGroupListResponse { groups }).into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity))]
pub(crate) async fn get_group(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match service::get_group(&state, &identity, id).await {
        Ok(group) => Json(group).into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity, payload))]
pub(crate) async fn create_group(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<BannerGroupRequest>,
) -> impl IntoResponse {
    match service::create_group(&state, &identity, group_command(payload)).await {
        Ok(group) => (StatusCode::CREATED, Json(group)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity, payload))]
pub(crate) async fn update_group(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
    Json(payload): Json<BannerGroupRequest>,
) -> impl IntoResponse {
    match service::update_group(&state, &identity, id, group_command(payload)).await {
        Ok(group) => Json(group).into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity))]
pub(crate) async fn delete_group(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match service::delete_group(&state, &identity, id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity, query))]
pub(crate) async fn list_banners(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<GroupQuery>,
) -> impl IntoResponse {
    match service::list_banners(&state, &identity, query.group_id).await {
        Ok(banners) => Json(BannerListResponse::new(banners)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity))]
pub(crate) async fn get_banner(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match service::get_banner(&state, &identity, id).await {
        Ok(banner) => Json(BannerResponse::from(banner)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity, payload))]
pub(crate) async fn create_banner(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<BannerRequest>,
) -> impl IntoResponse {
    match service::create_banner(&state, &identity, banner_command(payload)).await {
        Ok(banner) => (StatusCode::CREATED, Json(BannerResponse::from(banner))).into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity, payload))]
pub(crate) async fn update_banner(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
    Json(payload): Json<BannerRequest>,
) -> impl IntoResponse {
    match service::update_banner(&state, &identity, id, banner_command(payload)).await {
        Ok(banner) => Json(BannerResponse::from(banner)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity, payload))]
pub(crate) async fn set_published(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
    Json(payload): Json<PublishRequest>,
) -> impl IntoResponse {
    match service::set_published(&state, &identity, id, payload.is_published).await {
        Ok(banner) => Json(BannerResponse::from(banner)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity))]
pub(crate) async fn delete_banner(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match service::delete_banner(&state, &identity, id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

/// Expects one `image` or `mobile_image` field.
#[tracing::instrument(skip(state, identity, multipart))]
pub(crate) async fn upload_image(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let limit = state.uploads.max_file_bytes();
    let image = loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return ServiceError::BadRequest("image_missing").into_response(),
            Err(_) => return ServiceError::BadRequest("invalid_multipart").into_response(),
        };
        let mobile = match field.name() {
            Some("image") => false,
            Some("mobile_image") => true,
            _ => continue,
        };
        match read_field(field, limit).await {
            Ok((file_name, data)) => {
                break BannerImage {
                    mobile,
                    file_name,
                    data,
                }
            }
            Err(err) => return ServiceError::from(err).into_response(),
        }
    };
    match service::upload_image(&state, &identity, id, image).await {
        Ok(banner) => Json(BannerResponse::from(banner)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, query))]
pub(crate) async fn public_banners(
    State(state): State<AppState>,
    Query(query): Query<KindQuery>,
) -> impl IntoResponse {
    let kind = match parse_kind(query.kind.as_deref()) {
        Ok(Some(kind)) => kind,
        Ok(None) => return ServiceError::BadRequest("invalid_kind").into_response(),
        Err(err) => return err.into_response(),
    };
    match service::live_banners(&state, kind).await {
        Ok(banners) => Json(BannerListResponse::new(banners)).into_response(),
        Err(err) => err.into_response(),
    }
}
