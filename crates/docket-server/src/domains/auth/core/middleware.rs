use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;

use crate::app::AppState;
use crate::domains::auth::core::cookies::session_token;
use crate::domains::auth::core::identity::identity_from_session_token;

pub async fn auth_middleware(
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let state = request
        .extensions()
        .get::<AppState>()
        .cloned()
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;
    let token = session_token(request.headers(), &state.config.auth.cookie_name)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let identity = match identity_from_session_token(&state, &token).await {
        Ok(identity) => identity,
        Err("db_error") => return Err(StatusCode::INTERNAL_SERVER_ERROR),
        Err(reason) => {
            tracing::warn!(event = "auth_failed", reason = %reason, "Session token rejected");
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    tracing::Span::current().record("employee_id", identity.employee_id);
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}
