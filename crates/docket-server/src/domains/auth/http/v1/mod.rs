use axum::{
    routing::{get, post, put},
    Router,
};

use crate::app::AppState;

mod handlers;
pub(crate) mod types;

/// Login and logout work without a session.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/auth/login", post(handlers::login))
        .route("/v1/auth/logout", post(handlers::logout))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/v1/auth/me", get(handlers::me))
        .route("/v1/auth/me/password", put(handlers::change_password))
}
