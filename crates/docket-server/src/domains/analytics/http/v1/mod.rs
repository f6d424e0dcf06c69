use axum::{
    routing::{get, post},
    Router,
};

use crate::app::AppState;

mod handlers;
pub(crate) mod types;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/admin/analytics/summary", get(handlers::summary))
}

pub fn public_router() -> Router<AppState> {
    Router::new().route("/v1/public/visits", post(handlers::record_visit))
}
