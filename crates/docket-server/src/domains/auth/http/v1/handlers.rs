use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, State},
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use docket_core::Identity;

use crate::app::AppState;
use crate::domains::auth::core::cookies::{clear_cookie, session_cookie};
use crate::domains::auth::service::{self, ChangePasswordCommand, LoginCommand};
use crate::domains::employees::http::v1::types::EmployeeResponse;
use crate::infra::request_context::client_ip;

use super::types::{ChangePasswordRequest, LoginRequest, LoginResponse};

#[tracing::instrument(skip(state, remote_addr, headers, payload))]
pub(crate) async fn login(
    State(state): State<AppState>,
    remote_addr: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> impl IntoResponse {
    let command = LoginCommand {
        login_id: payload.login_id,
        password: payload.password,
        client_ip: client_ip(
            &headers,
            remote_addr.map(|value| value.0),
            &state.config.server.trusted_proxies,
        ),
    };
    match service::login(&state, command).await {
        Ok(result) => {
            let mut response_headers = HeaderMap::new();
            if let Some(cookie) =
                session_cookie(&state.config.auth, &result.token, result.expires_in_seconds)
            {
                response_headers.insert(SET_COOKIE, cookie);
            }
            let body = LoginResponse {
                token: result.token,
                token_type: "Bearer",
                expires_in: result.expires_in_seconds,
                employee: EmployeeResponse::new(result.employee, result.permissions),
            };
            (StatusCode::OK, response_headers, Json(body)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    if let Some(cookie) = clear_cookie(&state.config.auth) {
        headers.insert(SET_COOKIE, cookie);
    }
    (StatusCode::NO_CONTENT, headers)
}

#[tracing::instrument(skip(state, identity))]
pub(crate) async fn me(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> impl IntoResponse {
    match service::me(&state, &identity).await {
        Ok(employee) => (
            StatusCode::OK,
            Json(EmployeeResponse::new(employee, identity.permissions.clone())),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity, payload))]
pub(crate) async fn change_password(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<ChangePasswordRequest>,
) -> impl IntoResponse {
    let command = ChangePasswordCommand {
        current_password: payload.current_password,
        new_password: payload.new_password,
    };
    match service::change_password(&state, &identity, command).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}
