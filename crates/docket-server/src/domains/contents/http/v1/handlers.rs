use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use docket_core::Identity;

use crate::app::AppState;
use crate::domains::contents::service::{
    self, Attachment, ContentGroupCommand, ListContentsCommand, PublicPostCommand,
    StaffPostCommand, UpdateContentCommand,
};
use crate::domains::errors::ServiceError;
use crate::infra::request_context::client_ip;
use crate::infra::uploads::read_field;

use super::types::{
    BoardResponse, ContentGroupListResponse, ContentGroupRequest, ContentListResponse,
    ContentResponse, CreateContentRequest, FileResponse, ListContentsQuery, PublicContentResponse,
    PublicListQuery, PublicListResponse, PublicPostRequest, ReplyRequest, StatusRequest,
    UpdateContentRequest,
};

const PASSWORD_HEADER: &str = "x-content-password";
const RECAPTCHA_HEADER: &str = "x-recaptcha-token";

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Takes the first `file` field of the form.
async fn read_attachment(
    state: &AppState,
    multipart: &mut Multipart,
) -> Result<Attachment, ServiceError> {
    let limit = state.uploads.max_file_bytes();
    loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|_| ServiceError::BadRequest("invalid_multipart"))?
            .ok_or(ServiceError::BadRequest("file_missing"))?;
        if field.name() != Some("file") {
            continue;
        }
        let (file_name, data) = read_field(field, limit).await?;
        return Ok(Attachment { file_name, data });
    }
}

fn group_command(payload: ContentGroupRequest) -> ContentGroupCommand {
    ContentGroupCommand {
        slug: payload.slug,
        name: payload.name,
        description: payload.description,
        allow_anonymous: payload.allow_anonymous,
        use_secret: payload.use_secret,
        allow_files: payload.allow_files,
        notify_email: payload.notify_email,
        is_active: payload.is_active,
    }
}

#[tracing::instrument(skip(state, identity))]
pub(crate) async fn list_groups(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> impl IntoResponse {
    match service::list_groups(&state, &identity).await {
        Ok(groups) => Json(ContentGroupListResponse { groups }).into_response(),
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
    Json(payload): Json<ContentGroupRequest>,
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
    Json(payload): Json<ContentGroupRequest>,
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
pub(crate) async fn list_contents(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<ListContentsQuery>,
) -> impl IntoResponse {
    let command = ListContentsCommand {
        group_id: query.group_id,
        search: query.search,
        limit: query.limit,
        offset: query.offset,
    };
    match service::list_contents(&state, &identity, command).await {
        Ok(result) => Json(ContentListResponse {
            contents: result.contents,
            total: result.total,
        })
        .into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity))]
pub(crate) async fn get_content(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match service::get_content(&state, &identity, id).await {
        Ok(detail) => Json(ContentResponse::from(detail)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity, payload))]
pub(crate) async fn create_content(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<CreateContentRequest>,
) -> impl IntoResponse {
    let command = StaffPostCommand {
        group_id: payload.group_id,
        title: payload.title,
        body: payload.body,
        is_secret: payload.is_secret,
        is_notice: payload.is_notice,
    };
    match service::create_content(&state, &identity, command).await {
        Ok(detail) => (StatusCode::CREATED, Json(ContentResponse::from(detail))).into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity, payload))]
pub(crate) async fn update_content(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateContentRequest>,
) -> impl IntoResponse {
    let command = UpdateContentCommand {
        title: payload.title,
        body: payload.body,
        is_secret: payload.is_secret,
        is_notice: payload.is_notice,
    };
    match service::update_content(&state, &identity, id, command).await {
        Ok(detail) => Json(ContentResponse::from(detail)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity))]
pub(crate) async fn delete_content(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match service::delete_content(&state, &identity, id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity, payload))]
pub(crate) async fn reply(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
    Json(payload): Json<ReplyRequest>,
) -> impl IntoResponse {
    match service::reply(&state, &identity, id, payload.reply).await {
        Ok(detail) => Json(ContentResponse::from(detail)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity, payload))]
pub(crate) async fn set_status(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
    Json(payload): Json<StatusRequest>,
) -> impl IntoResponse {
    match service::set_status(&state, &identity, id, payload.status).await {
        Ok(detail) => Json(ContentResponse::from(detail)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity, multipart))]
pub(crate) async fn upload_file(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let file = match read_attachment(&state, &mut multipart).await {
        Ok(file) => file,
        Err(err) => return err.into_response(),
    };
    match service::upload_attachment(&state, &identity, id, file).await {
        Ok(file) => (StatusCode::CREATED, Json(FileResponse::from(file))).into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity))]
pub(crate) async fn delete_file(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path((id, file_id)): Path<(i64, i64)>,
) -> impl IntoResponse {
    match service::delete_attachment(&state, &identity, id, file_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, query))]
pub(crate) async fn public_list(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<PublicListQuery>,
) -> impl IntoResponse {
    match service::public_list(&state, &slug, query.search, query.limit, query.offset).await {
        Ok(result) => Json(PublicListResponse {
            board: BoardResponse::from(result.group),
            items: result.items,
            total: result.total,
        })
        .into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, headers))]
pub(crate) async fn public_get(
    State(state): State<AppState>,
    Path((slug, id)): Path<(String, i64)>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let password = header_value(&headers, PASSWORD_HEADER);
    match service::public_get(&state, &slug, id, password.as_deref()).await {
        Ok(detail) => Json(PublicContentResponse::from(detail)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, remote_addr, headers, payload))]
pub(crate) async fn public_create(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    remote_addr: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(payload): Json<PublicPostRequest>,
) -> impl IntoResponse {
    let command = PublicPostCommand {
        author_name: payload.author_name,
        author_email: payload.author_email,
        author_phone: payload.author_phone,
        password: payload.password,
        title: payload.title,
        body: payload.body,
        is_secret: payload.is_secret,
        captcha_token: payload
            .recaptcha_token
            .or_else(|| header_value(&headers, RECAPTCHA_HEADER)),
        client_ip: client_ip(
            &headers,
            remote_addr.map(|value| value.0),
            &state.config.server.trusted_proxies,
        ),
    };
    match service::public_create(&state, &slug, command).await {
        Ok(detail) => {
            (StatusCode::CREATED, Json(PublicContentResponse::from(detail))).into_response()
        }
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, headers, multipart))]
pub(crate) async fn public_upload(
    State(state): State<AppState>,
    Path((slug, id)): Path<(String, i64)>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let password = header_value(&headers, PASSWORD_HEADER);
    let file = match read_attachment(&state, &mut multipart).await {
        Ok(file) => file,
        Err(err) => return err.into_response(),
    };
    match service::public_upload(&state, &slug, id, password.as_deref(), file).await {
        Ok(file) => (StatusCode::CREATED, Json(FileResponse::from(file))).into_response(),
        Err(err) => err.into_response(),
    }
}
