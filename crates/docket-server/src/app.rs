use axum::{extract::DefaultBodyLimit, Extension, Router};
use docket_core::{Banner, SiteSettings};
use docket_db::SqlitePool;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tower_http::services::ServeDir;

use crate::config::ServerConfig;
use crate::infra::cache::TtlCache;
use crate::infra::guard::{cors_layer, CorsAllowlist};
use crate::infra::mailer::{build_mailer, Mailer};
use crate::infra::recaptcha::RecaptchaVerifier;
use crate::infra::uploads::{UploadStore, PUBLIC_PREFIX};

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub started_at: Instant,
    pub config: ServerConfig,
    pub jwt_secret: String,
    pub argon2_semaphore: Arc<Semaphore>,
    pub banner_cache: TtlCache<Vec<Banner>>,
    pub settings_cache: TtlCache<SiteSettings>,
    pub cors_origins: CorsAllowlist,
    pub mailer: Arc<dyn Mailer>,
    pub recaptcha: RecaptchaVerifier,
    pub uploads: UploadStore,
}

impl AppState {
    pub fn new(db: SqlitePool, config: ServerConfig, jwt_secret: String) -> Self {
        let ttl = Duration::from_secs(config.cache.ttl_seconds);
        Self {
            db,
            started_at: Instant::now(),
            jwt_secret,
            argon2_semaphore: Arc::new(Semaphore::new(4)),
            banner_cache: TtlCache::new("banners", ttl),
            settings_cache: TtlCache::new("settings", ttl),
            cors_origins: CorsAllowlist::new(&config.server.cors_origins),
            mailer: build_mailer(&config.mail),
            recaptcha: RecaptchaVerifier::new(config.recaptcha.clone()),
            uploads: UploadStore::new(config.uploads.clone()),
            config,
        }
    }

    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = mailer;
        self
    }
}

pub fn build_router(state: AppState) -> Router {
    let extension_state = state.clone();
    let max_body_bytes = state.config.server.max_body_bytes;
    let cors = cors_layer(state.cors_origins.clone());
    let uploads = ServeDir::new(state.uploads.root());
    crate::http::router()
        .nest_service(PUBLIC_PREFIX, uploads)
        .with_state(state)
        .layer(Extension(extension_state))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(cors)
}
