use axum::{routing::get, Router};

use crate::app::AppState;

mod handlers;
pub(crate) mod types;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/v1/admin/settings",
        get(handlers::get_settings).put(handlers::update_settings),
    )
}

pub fn public_router() -> Router<AppState> {
    Router::new().route("/v1/public/settings", get(handlers::public_settings))
}
