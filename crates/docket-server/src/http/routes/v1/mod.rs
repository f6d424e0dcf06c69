use crate::app::AppState;
use axum::{middleware, Router};

pub fn router() -> Router<AppState> {
    // Admin API requires auth middleware.
    let protected = Router::new()
        .merge(crate::domains::auth::http::v1::protected_router())
        .merge(crate::domains::employees::http::v1::router())
        .merge(crate::domains::banners::http::v1::router())
        .merge(crate::domains::contents::http::v1::router())
        .merge(crate::domains::site::http::v1::router())
        .merge(crate::domains::analytics::http::v1::router())
        .layer(middleware::from_fn(
            crate::domains::auth::core::auth_middleware,
        ));

    // Login and the visitor-facing site API are unauthenticated.
    Router::new()
        .merge(crate::domains::auth::http::v1::router())
        .merge(crate::domains::banners::http::v1::public_router())
        .merge(crate::domains::contents::http::v1::public_router())
        .merge(crate::domains::site::http::v1::public_router())
        .merge(crate::domains::analytics::http::v1::public_router())
        .merge(protected)
}
