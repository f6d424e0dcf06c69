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
            "/v1/admin/employees",
            get(handlers::list_employees).post(handlers::create_employee),
        )
        .route(
            "/v1/admin/employees/:id",
            get(handlers::get_employee)
                .put(handlers::update_employee)
                .delete(handlers::delete_employee),
        )
        .route(
            "/v1/admin/employees/:id/permissions",
            put(handlers::set_permissions),
        )
        .route(
            "/v1/admin/employees/:id/reset-password",
            post(handlers::reset_password),
        )
        .route("/v1/admin/permissions", get(handlers::list_permissions))
}
