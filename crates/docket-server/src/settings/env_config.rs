use std::env;
use std::fs;
use std::path::Path;

use tracing::warn;

use crate::config::{MetricsProfile, ServerConfig};

pub(super) fn load_config(path: &str) -> ServerConfig {
    if !Path::new(path).exists() {
        return ServerConfig::default();
    }

    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            warn!(event = "config_read_failed", path, error = %err);
            return ServerConfig::default();
        }
    };
    match serde_yaml::from_str(&contents) {
        Ok(config) => config,
        Err(err) => {
            warn!(event = "config_parse_failed", path, error = %err);
            ServerConfig::default()
        }
    }
}

pub(super) fn apply_server_env_overrides(config: &mut ServerConfig) {
    if let Some(value) = parsed_env::<usize>("DOCKET_MAX_BODY_BYTES") {
        config.server.max_body_bytes = value;
    }
    if let Some(values) = list_env("DOCKET_TRUSTED_PROXIES") {
        config.server.trusted_proxies = values;
    }
    if let Some(values) = list_env("DOCKET_CORS_ORIGINS") {
        config.server.cors_origins = values;
    }
    if let Some(value) = parsed_env::<u64>("DOCKET_CACHE_TTL_SECONDS") {
        config.cache.ttl_seconds = value;
    }
}

pub(super) fn apply_auth_env_overrides(config: &mut ServerConfig) {
    if let Ok(value) = env::var("DOCKET_COOKIE_NAME") {
        let value = value.trim();
        if value.is_empty() || !value.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
            warn!(event = "config_invalid", field = "DOCKET_COOKIE_NAME", value = %value);
        } else {
            config.auth.cookie_name = value.to_string();
        }
    }
    if let Some(value) = bool_env("DOCKET_COOKIE_SECURE") {
        config.auth.cookie_secure = value;
    }
}

pub(super) fn apply_upload_env_overrides(config: &mut ServerConfig) {
    if let Ok(value) = env::var("DOCKET_UPLOAD_DIR") {
        config.uploads.dir = value;
    }
    if let Some(value) = parsed_env::<usize>("DOCKET_UPLOAD_MAX_FILE_BYTES") {
        config.uploads.max_file_bytes = value;
    }
    if let Some(value) = bool_env("DOCKET_UPLOAD_CONVERT_WEBP") {
        config.uploads.convert_to_webp = value;
    }
}

pub(super) fn apply_mail_env_overrides(config: &mut ServerConfig) {
    if let Some(value) = bool_env("DOCKET_MAIL_ENABLED") {
        config.mail.enabled = value;
    }
}

pub(super) fn apply_recaptcha_env_overrides(config: &mut ServerConfig) {
    if let Some(value) = bool_env("DOCKET_RECAPTCHA_ENABLED") {
        config.recaptcha.enabled = value;
    }
    match load_secret_env_or_file("DOCKET_RECAPTCHA_SECRET", "DOCKET_RECAPTCHA_SECRET_FILE") {
        Ok(Some(secret)) => config.recaptcha.secret = secret,
        Ok(None) => {}
        Err(err) => {
            warn!(event = "config_invalid", field = "DOCKET_RECAPTCHA_SECRET", error = %err);
        }
    }
}

pub(super) fn apply_metrics_env_overrides(config: &mut ServerConfig) {
    if let Some(value) = bool_env("DOCKET_METRICS_ENABLED") {
        config.metrics.enabled = value;
    }
    if let Ok(value) = env::var("DOCKET_METRICS_ENDPOINT") {
        if value.starts_with('/') {
            config.metrics.endpoint = value;
        } else {
            warn!(event = "config_invalid", field = "DOCKET_METRICS_ENDPOINT", value = %value);
        }
    }
    if let Ok(value) = env::var("DOCKET_METRICS_PROFILE") {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" => config.metrics.profile = Some(MetricsProfile::Prod),
            "staging" => config.metrics.profile = Some(MetricsProfile::Staging),
            "debug" => config.metrics.profile = Some(MetricsProfile::Debug),
            _ => warn!(event = "config_invalid", field = "DOCKET_METRICS_PROFILE", value = %value),
        }
    }
}

fn bool_env(name: &'static str) -> Option<bool> {
    let value = env::var(name).ok()?;
    let parsed = parse_bool(&value);
    if parsed.is_none() {
        warn!(event = "config_invalid", field = name, value = %value);
    }
    parsed
}

fn parsed_env<T: std::str::FromStr>(name: &'static str) -> Option<T> {
    let value = env::var(name).ok()?;
    let parsed = value.trim().parse::<T>().ok();
    if parsed.is_none() {
        warn!(event = "config_invalid", field = name, value = %value);
    }
    parsed
}

/// Comma separated; blanks are dropped.
fn list_env(name: &'static str) -> Option<Vec<String>> {
    let value = env::var(name).ok()?;
    Some(
        value
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

pub(super) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub(super) fn load_secret_env_or_file(
    var_name: &str,
    file_var_name: &str,
) -> Result<Option<String>, String> {
    if let Ok(value) = env::var(var_name) {
        return Ok(Some(value));
    }
    let Ok(path) = env::var(file_var_name) else {
        return Ok(None);
    };
    read_secret_file(&path)
        .map(Some)
        .map_err(|err| format!("{file_var_name} invalid: {err}"))
}

fn read_secret_file(path: &str) -> Result<String, String> {
    let value = fs::read_to_string(path)
        .map_err(|err| format!("secret file not accessible ({}): {}", path, err))?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("secret file is empty ({})", path));
    }
    Ok(trimmed.to_string())
}
