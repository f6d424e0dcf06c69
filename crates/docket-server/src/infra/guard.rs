use std::sync::{Arc, RwLock};

use axum::body::Body;
use axum::http::{header, HeaderValue, Method, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::app::AppState;
use crate::domains::errors::ErrorResponse;
use crate::domains::site::service::load_settings;
use crate::infra::metrics;
use crate::infra::request_context::{client_ip, remote_addr, user_agent};

/// Origins accepted by the CORS layer. Replaced in place when site settings
/// change, so the layer never has to be rebuilt.
#[derive(Clone, Default)]
pub struct CorsAllowlist {
    origins: Arc<RwLock<Vec<String>>>,
}

fn normalize_origin(origin: &str) -> String {
    origin.trim().trim_end_matches('/').to_ascii_lowercase()
}

impl CorsAllowlist {
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let list = Self::default();
        list.replace(origins);
        list
    }

    pub fn replace<I, S>(&self, origins: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut next: Vec<String> = origins
            .into_iter()
            .map(|origin| normalize_origin(origin.as_ref()))
            .filter(|origin| !origin.is_empty())
            .collect();
        next.sort();
        next.dedup();
        let mut guard = self
            .origins
            .write()
            .unwrap_or_else(|err| err.into_inner());
        *guard = next;
    }

    pub fn allows(&self, origin: &str) -> bool {
        let origin = normalize_origin(origin);
        self.origins
            .read()
            .unwrap_or_else(|err| err.into_inner())
            .iter()
            .any(|allowed| *allowed == origin)
    }

    pub fn origins(&self) -> Vec<String> {
        self.origins
            .read()
            .unwrap_or_else(|err| err.into_inner())
            .clone()
    }
}

pub fn cors_layer(allowlist: CorsAllowlist) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts: &axum::http::request::Parts| {
                origin
                    .to_str()
                    .map(|value| allowlist.allows(value))
                    .unwrap_or(false)
            },
        ))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::HeaderName::from_static("x-content-password"),
            header::HeaderName::from_static("x-recaptcha-token"),
        ])
        .allow_credentials(true)
}

fn blocked() -> Response {
    (StatusCode::FORBIDDEN, Json(ErrorResponse { error: "blocked" })).into_response()
}

/// Rejects requests from blocked IPs and bot user agents listed in the site
/// settings. A settings lookup failure lets the request through.
pub async fn request_guard(request: Request<Body>, next: Next) -> Response {
    let Some(state) = request.extensions().get::<AppState>().cloned() else {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };
    let settings = match load_settings(&state).await {
        Ok(settings) => settings,
        Err(_) => {
            tracing::warn!(event = "guard_settings_unavailable");
            return next.run(request).await;
        }
    };

    let ip = client_ip(
        request.headers(),
        remote_addr(request.extensions()),
        &state.config.server.trusted_proxies,
    );
    if let Some(ip) = ip.as_deref() {
        if settings.is_ip_blocked(ip) {
            metrics::blocked_request("ip");
            tracing::info!(event = "request_blocked", reason = "ip", ip = %ip);
            return blocked();
        }
    }
    if let Some(agent) = user_agent(request.headers()) {
        if settings.is_bot(&agent) {
            metrics::blocked_request("bot");
            tracing::info!(event = "request_blocked", reason = "bot", user_agent = %agent);
            return blocked();
        }
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowlist_normalizes_and_replaces() {
        let list = CorsAllowlist::new(["https://Example.com/", " https://admin.example.com", ""]);
        assert!(list.allows("https://example.com"));
        assert!(list.allows("https://admin.example.com/"));
        assert!(!list.allows("https://evil.example.com"));
        assert_eq!(list.origins().len(), 2);

        let shared = list.clone();
        shared.replace(["https://new.example.com"]);
        assert!(list.allows("https://new.example.com"));
        assert!(!list.allows("https://example.com"));
    }
}
