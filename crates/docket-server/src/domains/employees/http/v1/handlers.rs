use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use docket_core::Identity;

use crate::app::AppState;
use crate::domains::employees::service::{
    self, CreateEmployeeCommand, ListEmployeesCommand, UpdateEmployeeCommand,
};

use super::types::{
    CreateEmployeeRequest, EmployeeListResponse, EmployeeResponse, ListEmployeesQuery,
    PermissionCatalogResponse, PermissionsResponse, ResetPasswordRequest, ResetPasswordResponse,
    SetPermissionsRequest, UpdateEmployeeRequest,
};

#[tracing::instrument(skip(state, identity, query))]
pub(crate) async fn list_employees(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<ListEmployeesQuery>,
) -> impl IntoResponse {
    let command = ListEmployeesCommand {
        search: query.search,
        limit: query.limit,
        offset: query.offset,
    };
    match service::list_employees(&state, &identity, command).await {
        Ok(result) => (
            StatusCode::OK,
            Json(EmployeeListResponse {
                employees: result.employees,
                total: result.total,
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity, payload))]
pub(crate) async fn create_employee(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<CreateEmployeeRequest>,
) -> impl IntoResponse {
    let command = CreateEmployeeCommand {
        login_id: payload.login_id,
        name: payload.name,
        email: payload.email,
        phone: payload.phone,
        position: payload.position,
        password: payload.password,
        permissions: payload.permissions,
    };
    match service::create_employee(&state, &identity, command).await {
        Ok(detail) => (
            StatusCode::CREATED,
            Json(EmployeeResponse::new(detail.employee, detail.permissions)),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity))]
pub(crate) async fn get_employee(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match service::get_employee(&state, &identity, id).await {
        Ok(detail) => Json(EmployeeResponse::new(detail.employee, detail.permissions)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity, payload))]
pub(crate) async fn update_employee(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateEmployeeRequest>,
) -> impl IntoResponse {
    let command = UpdateEmployeeCommand {
        name: payload.name,
        email: payload.email,
        phone: payload.phone,
        position: payload.position,
        status: payload.status,
    };
    match service::update_employee(&state, &identity, id, command).await {
        Ok(detail) => Json(EmployeeResponse::new(detail.employee, detail.permissions)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity))]
pub(crate) async fn delete_employee(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match service::delete_employee(&state, &identity, id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity, payload))]
pub(crate) async fn set_permissions(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
    Json(payload): Json<SetPermissionsRequest>,
) -> impl IntoResponse {
    match service::set_permissions(&state, &identity, id, payload.permissions).await {
        Ok(permissions) => Json(PermissionsResponse { permissions }).into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity, payload))]
pub(crate) async fn reset_password(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
    payload: Option<Json<ResetPasswordRequest>>,
) -> impl IntoResponse {
    let password = payload.and_then(|Json(body)| body.password);
    match service::reset_password(&state, &identity, id, password).await {
        Ok(result) => Json(ResetPasswordResponse {
            password: result.password,
        })
        .into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity))]
pub(crate) async fn list_permissions(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> impl IntoResponse {
    match service::list_permissions(&state, &identity).await {
        Ok(permissions) => Json(PermissionCatalogResponse { permissions }).into_response(),
        Err(err) => err.into_response(),
    }
}
