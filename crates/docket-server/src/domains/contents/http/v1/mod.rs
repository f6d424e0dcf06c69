use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::app::AppState;

mod handlers;
pub(crate) mod types;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/admin/content-groups",
            get(handlers::list_groups).post(handlers::create_group),
        )
        .route(
            "/v1/admin/content-groups/:id",
            get(handlers::get_group)
                .put(handlers::update_group)
                .delete(handlers::delete_group),
        )
        .route(
            "/v1/admin/contents",
            get(handlers::list_contents).post(handlers::create_content),
        )
        .route(
            "/v1/admin/contents/:id",
            get(handlers::get_content)
                .put(handlers::update_content)
                .delete(handlers::delete_content),
        )
        .route("/v1/admin/contents/:id/reply", put(handlers::reply))
        .route("/v1/admin/contents/:id/status", put(handlers::set_status))
        .route("/v1/admin/contents/:id/files", post(handlers::upload_file))
        .route(
            "/v1/admin/contents/:id/files/:file_id",
            delete(handlers::delete_file),
        )
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/public/boards/:slug/contents",
            get(handlers::public_list).post(handlers::public_create),
        )
        .route(
            "/v1/public/boards/:slug/contents/:id",
            get(handlers::public_get),
        )
        .route(
            "/v1/public/boards/:slug/contents/:id/files",
            post(handlers::public_upload),
        )
}
