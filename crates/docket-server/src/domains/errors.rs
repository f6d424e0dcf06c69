use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use docket_core::validation::ValidationError;
use serde::Serialize;
use thiserror::Error;

use crate::infra::uploads::UploadError;

#[derive(Debug, Error, Clone)]
pub enum ServiceError {
    #[error("forbidden: {0}")]
    Forbidden(&'static str),
    #[error("unauthorized: {0}")]
    Unauthorized(&'static str),
    #[error("bad_request: {0}")]
    BadRequest(&'static str),
    #[error("conflict: {0}")]
    Conflict(&'static str),
    #[error("banner_schedule_conflict")]
    ScheduleConflict { conflicts: Vec<i64> },
    #[error("not_found")]
    NotFound,
    #[error("payload_too_large: {0}")]
    PayloadTooLarge(&'static str),
    #[error("unsupported_media_type: {0}")]
    UnsupportedMediaType(&'static str),
    #[error("db_error")]
    DbError,
    #[error("internal: {0}")]
    Internal(&'static str),
    #[error("no_changes")]
    NoChanges,
    #[error("invalid_password")]
    InvalidPassword,
    #[error("invalid_credentials")]
    InvalidCredentials,
    #[error("kdf_error")]
    Kdf,
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        Self::BadRequest(err.code)
    }
}

impl From<UploadError> for ServiceError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Empty => Self::BadRequest("file_empty"),
            UploadError::TooLarge { .. } => Self::PayloadTooLarge("file_too_large"),
            UploadError::ExtensionNotAllowed(_) => Self::UnsupportedMediaType("file_type_not_allowed"),
            UploadError::InvalidImage(_) => Self::BadRequest("invalid_image"),
            UploadError::InvalidPath => Self::BadRequest("invalid_path"),
            UploadError::Multipart(_) => Self::BadRequest("invalid_multipart"),
            UploadError::Io(err) => {
                tracing::error!(event = "upload_io_failed", error = %err);
                Self::Internal("upload_failed")
            }
        }
    }
}

#[derive(Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: &'static str,
}

#[derive(Serialize)]
struct ConflictResponse<'a> {
    error: &'static str,
    conflicts: &'a [i64],
}

/// Logs the store failure and collapses it to `DbError`.
pub(crate) fn db_error(operation: &'static str, err: sqlx_core::Error) -> ServiceError {
    tracing::error!(event = "db_error", operation, error = %err);
    ServiceError::DbError
}

pub(crate) fn is_unique_violation(err: &sqlx_core::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation())
}

fn error_body(status: StatusCode, code: &'static str) -> Response {
    (status, Json(ErrorResponse { error: code })).into_response()
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        match self {
            Self::Forbidden(code) => error_body(StatusCode::FORBIDDEN, code),
            Self::Unauthorized(code) => error_body(StatusCode::UNAUTHORIZED, code),
            Self::BadRequest(code) => error_body(StatusCode::BAD_REQUEST, code),
            Self::Conflict(code) => error_body(StatusCode::CONFLICT, code),
            Self::ScheduleConflict { conflicts } => (
                StatusCode::CONFLICT,
                Json(ConflictResponse {
                    error: "banner_schedule_conflict",
                    conflicts: &conflicts,
                }),
            )
                .into_response(),
            Self::NotFound => error_body(StatusCode::NOT_FOUND, "not_found"),
            Self::PayloadTooLarge(code) => error_body(StatusCode::PAYLOAD_TOO_LARGE, code),
            Self::UnsupportedMediaType(code) => {
                error_body(StatusCode::UNSUPPORTED_MEDIA_TYPE, code)
            }
            Self::DbError => error_body(StatusCode::INTERNAL_SERVER_ERROR, "db_error"),
            Self::Internal(code) => error_body(StatusCode::INTERNAL_SERVER_ERROR, code),
            Self::NoChanges => error_body(StatusCode::BAD_REQUEST, "no_changes"),
            Self::InvalidPassword => error_body(StatusCode::BAD_REQUEST, "invalid_password"),
            Self::InvalidCredentials => {
                error_body(StatusCode::UNAUTHORIZED, "invalid_credentials")
            }
            Self::Kdf => error_body(StatusCode::INTERNAL_SERVER_ERROR, "kdf_error"),
        }
    }
}
