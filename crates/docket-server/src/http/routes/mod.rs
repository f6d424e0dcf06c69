use crate::app::AppState;
use axum::{middleware, Router};

pub(crate) mod health;
pub mod v1;

/// Health stays outside the request guard so probes are never blocked.
pub fn router() -> Router<AppState> {
    let guarded = v1::router().layer(middleware::from_fn(crate::infra::guard::request_guard));

    Router::new().merge(health::router()).merge(guarded)
}
