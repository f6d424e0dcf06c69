use axum::{extract::State, response::IntoResponse, Extension, Json};
use docket_core::Identity;

use crate::app::AppState;
use crate::domains::site::service::{self, UpdateSettingsCommand};

use super::types::UpdateSettingsRequest;

#[tracing::instrument(skip(state, identity))]
pub(crate) async fn get_settings(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> impl IntoResponse {
    match service::get_settings(&state, &identity).await {
        Ok(settings) => Json(settings).into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity, payload))]
pub(crate) async fn update_settings(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<UpdateSettingsRequest>,
) -> impl IntoResponse {
    let command = UpdateSettingsCommand {
        site_name: payload.site_name,
        domain: payload.domain,
        contact_email: payload.contact_email,
        smtp_host: payload.smtp_host,
        smtp_port: payload.smtp_port,
        smtp_username: payload.smtp_username,
        smtp_password: payload.smtp_password,
        smtp_from: payload.smtp_from,
        smtp_tls_mode: payload.smtp_tls_mode,
        jwt_expiry_minutes: payload.jwt_expiry_minutes,
        cors_origins: payload.cors_origins,
        blocked_ips: payload.blocked_ips,
        blocked_bots: payload.blocked_bots,
    };
    match service::update_settings(&state, &identity, command).await {
        Ok(settings) => Json(settings).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn public_settings(State(state): State<AppState>) -> impl IntoResponse {
    match service::public_settings(&state).await {
        Ok(settings) => Json(settings).into_response(),
        Err(err) => err.into_response(),
    }
}
