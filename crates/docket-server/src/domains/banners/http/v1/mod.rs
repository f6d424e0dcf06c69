use axum::{
    routing::{get, post, put},
    Router,
};

use crate::app::AppState;

mod handlers;
pub(crate) mod types;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/admin/banner-groups",
            get(handlers::list_groups).post(handlers::create_group),
        )
        .route(
            "/v1/admin/banner-groups/:id",
            get(handlers::get_group)
                .put(handlers::update_group)
                .delete(handlers::delete_group),
        )
        .route(
            "/v1/admin/banners",
            get(handlers::list_banners).post(handlers::create_banner),
        )
        .route(
            "/v1/admin/banners/:id",
            get(handlers::get_banner)
                .put(handlers::update_banner)
                .delete(handlers::delete_banner),
        )
        .route("/v1/admin/banners/:id/publish", put(handlers::set_published))
        .route("/v1/admin/banners/:id/image", post(handlers::upload_image))
}

pub fn public_router() -> Router<AppState> {
    Router::new().route("/v1/public/banners", get(handlers::public_banners))
}
