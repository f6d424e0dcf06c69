use std::env;
use std::net::SocketAddr;

use crate::config::ServerConfig;
use ipnet::IpNet;
use tracing::warn;

mod env_config;

pub const MIN_JWT_SECRET_LEN: usize = 32;

#[derive(Debug)]
pub struct Settings {
    pub addr: SocketAddr,
    pub db_url: String,
    pub db_pool_max: u32,
    pub jwt_secret: String,
    pub require_secret: bool,
    pub config: ServerConfig,
}

impl Settings {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with_options(true)
    }

    #[must_use]
    pub fn from_env_with_options(require_secret: bool) -> Self {
        let default_addr = SocketAddr::from(([127, 0, 0, 1], 8080));
        let addr = match env::var("DOCKET_ADDR") {
            Ok(value) => value.parse().unwrap_or_else(|_| {
                warn!(event = "config_invalid", field = "DOCKET_ADDR", value = %value);
                default_addr
            }),
            Err(_) => default_addr,
        };
        let db_url = env::var("DOCKET_DB_URL").unwrap_or_else(|_| "sqlite://docket.db".to_string());
        let db_pool_max = env::var("DOCKET_DB_POOL_MAX")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(10);
        let config_path =
            env::var("DOCKET_CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());
        let mut config = env_config::load_config(&config_path);
        env_config::apply_server_env_overrides(&mut config);
        env_config::apply_auth_env_overrides(&mut config);
        env_config::apply_upload_env_overrides(&mut config);
        env_config::apply_mail_env_overrides(&mut config);
        env_config::apply_recaptcha_env_overrides(&mut config);
        env_config::apply_metrics_env_overrides(&mut config);

        let jwt_secret = if require_secret {
            match env_config::load_secret_env_or_file("DOCKET_JWT_SECRET", "DOCKET_JWT_SECRET_FILE")
            {
                Ok(Some(value)) => value,
                Ok(None) => String::new(),
                Err(err) => {
                    warn!(event = "config_invalid", field = "DOCKET_JWT_SECRET", error = %err);
                    String::new()
                }
            }
        } else {
            String::new()
        };

        Self {
            addr,
            db_url,
            db_pool_max,
            jwt_secret,
            require_secret,
            config,
        }
    }
}

pub fn preflight(settings: &Settings) -> Result<(), Vec<String>> {
    let mut missing = Vec::new();
    if settings.require_secret {
        if settings.jwt_secret.is_empty() {
            missing.push(
                "DOCKET_JWT_SECRET or DOCKET_JWT_SECRET_FILE is required for session tokens"
                    .to_string(),
            );
        } else if settings.jwt_secret.len() < MIN_JWT_SECRET_LEN {
            missing.push(format!(
                "DOCKET_JWT_SECRET must be at least {MIN_JWT_SECRET_LEN} bytes"
            ));
        }
        if let Err(err) =
            env_config::load_secret_env_or_file("DOCKET_JWT_SECRET", "DOCKET_JWT_SECRET_FILE")
        {
            missing.push(err);
        }
    }
    if let Some(err) = validate_trusted_proxies(settings) {
        missing.push(err);
    }
    if let Some(err) = validate_recaptcha(settings) {
        missing.push(err);
    }
    if let Some(err) = validate_uploads(settings) {
        missing.push(err);
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(missing)
    }
}

fn validate_trusted_proxies(settings: &Settings) -> Option<String> {
    let proxies = &settings.config.server.trusted_proxies;
    for value in proxies {
        if value.parse::<IpNet>().is_err() {
            return Some(format!("invalid trusted proxy CIDR: {value}"));
        }
    }
    None
}

fn validate_recaptcha(settings: &Settings) -> Option<String> {
    let recaptcha = &settings.config.recaptcha;
    if recaptcha.enabled && recaptcha.secret.trim().is_empty() {
        return Some(
            "recaptcha.secret or DOCKET_RECAPTCHA_SECRET is required when recaptcha.enabled=true"
                .to_string(),
        );
    }
    None
}

fn validate_uploads(settings: &Settings) -> Option<String> {
    let uploads = &settings.config.uploads;
    if uploads.dir.trim().is_empty() {
        return Some("uploads.dir must not be empty".to_string());
    }
    if !(0.0..=100.0).contains(&uploads.webp_quality) {
        return Some("uploads.webp_quality must be between 0 and 100".to_string());
    }
    None
}
