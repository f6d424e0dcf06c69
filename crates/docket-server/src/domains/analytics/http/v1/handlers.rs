use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use docket_core::Identity;

use crate::app::AppState;
use crate::domains::analytics::service::{self, RecordVisitCommand};
use crate::infra::request_context::{client_ip, referrer, user_agent};

use super::types::{RecordVisitRequest, RecordVisitResponse, SummaryQuery};

/// The body referrer wins over the header: the page reports its own
/// `document.referrer`.
#[tracing::instrument(skip(state, remote_addr, headers, payload))]
pub(crate) async fn record_visit(
    State(state): State<AppState>,
    remote_addr: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(payload): Json<RecordVisitRequest>,
) -> impl IntoResponse {
    let command = RecordVisitCommand {
        path: payload.path,
        referrer: payload.referrer.or_else(|| referrer(&headers)),
        user_agent: user_agent(&headers),
        client_ip: client_ip(
            &headers,
            remote_addr.map(|value| value.0),
            &state.config.server.trusted_proxies,
        ),
    };
    match service::record_visit(&state, command).await {
        Ok(recorded) => (StatusCode::ACCEPTED, Json(RecordVisitResponse { recorded })).into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity, query))]
pub(crate) async fn summary(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<SummaryQuery>,
) -> impl IntoResponse {
    match service::summary(&state, &identity, query.from, query.to).await {
        Ok(summary) => Json(summary).into_response(),
        Err(err) => err.into_response(),
    }
}
