//! The single site-settings row: SMTP, session expiry, CORS origins and the
//! block lists read by the request guard.

use std::net::IpAddr;

use chrono::Utc;
use docket_core::validation;
use docket_core::{Identity, Permission, SiteSettings};
use docket_db::repo::SiteSettingsRepo;

use crate::app::AppState;
use crate::domains::access_control::require;
use crate::domains::errors::{db_error, ServiceError};

const CACHE_KEY: &str = "site";
pub const SMTP_PASSWORD_MASK: &str = "********";
pub const TLS_MODES: [&str; 3] = ["none", "starttls", "tls"];
pub const JWT_EXPIRY_RANGE: std::ops::RangeInclusive<i64> = 5..=10_080;

pub struct UpdateSettingsCommand {
    pub site_name: String,
    pub domain: Option<String>,
    pub contact_email: Option<String>,
    pub smtp_host: Option<String>,
    pub smtp_port: i32,
    pub smtp_username: Option<String>,
    /// `None` or the mask keeps the stored password; an empty string clears it.
    pub smtp_password: Option<String>,
    pub smtp_from: Option<String>,
    pub smtp_tls_mode: String,
    pub jwt_expiry_minutes: i64,
    pub cors_origins: Vec<String>,
    pub blocked_ips: Vec<String>,
    pub blocked_bots: Vec<String>,
}

/// Fields safe to show on the public site.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PublicSettings {
    pub site_name: String,
    pub domain: Option<String>,
    pub contact_email: Option<String>,
}

/// Cached read used by login, the guard and mail notifications.
pub async fn load_settings(state: &AppState) -> Result<SiteSettings, ServiceError> {
    state
        .settings_cache
        .get_or_try_insert_with(CACHE_KEY, || async {
            SiteSettingsRepo::new(&state.db)
                .get()
                .await
                .map_err(|err| db_error("settings_get", err))
        })
        .await
}

fn masked(mut settings: SiteSettings) -> SiteSettings {
    if settings.smtp_password.as_deref().is_some_and(|value| !value.is_empty()) {
        settings.smtp_password = Some(SMTP_PASSWORD_MASK.to_string());
    }
    settings
}

/// Accepts `scheme://host[:port]` only; returns the normalized origin.
fn normalize_origin(value: &str) -> Option<String> {
    let origin = value.trim().trim_end_matches('/').to_ascii_lowercase();
    let rest = origin
        .strip_prefix("https://")
        .or_else(|| origin.strip_prefix("http://"))?;
    let valid = !rest.is_empty()
        && !rest.contains(['/', '?', '#', '@'])
        && !rest.contains(char::is_whitespace);
    valid.then_some(origin)
}

fn clean_list<F>(values: &[String], code: &'static str, check: F) -> Result<Vec<String>, ServiceError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        let cleaned = check(value).ok_or(ServiceError::BadRequest(code))?;
        if !out.contains(&cleaned) {
            out.push(cleaned);
        }
    }
    Ok(out)
}

fn validated(cmd: UpdateSettingsCommand, current: &SiteSettings) -> Result<SiteSettings, ServiceError> {
    let site_name = validation::require_len("invalid_site_name", &cmd.site_name, 1, 100)?;
    let domain = validation::optional_len("invalid_domain", cmd.domain.as_deref(), 253)?;
    let contact_email = validation::optional_email(cmd.contact_email.as_deref())?;
    let smtp_host = validation::optional_len("invalid_smtp_host", cmd.smtp_host.as_deref(), 253)?;
    if !(1..=65_535).contains(&cmd.smtp_port) {
        return Err(ServiceError::BadRequest("invalid_smtp_port"));
    }
    let smtp_username =
        validation::optional_len("invalid_smtp_username", cmd.smtp_username.as_deref(), 254)?;
    let smtp_from = validation::optional_email(cmd.smtp_from.as_deref())
        .map_err(|_| ServiceError::BadRequest("invalid_smtp_from"))?;
    let smtp_tls_mode = cmd.smtp_tls_mode.trim().to_ascii_lowercase();
    if !TLS_MODES.contains(&smtp_tls_mode.as_str()) {
        return Err(ServiceError::BadRequest("invalid_smtp_tls_mode"));
    }
    if !JWT_EXPIRY_RANGE.contains(&cmd.jwt_expiry_minutes) {
        return Err(ServiceError::BadRequest("invalid_jwt_expiry"));
    }
    let smtp_password = match cmd.smtp_password {
        None => current.smtp_password.clone(),
        Some(value) if value == SMTP_PASSWORD_MASK => current.smtp_password.clone(),
        Some(value) if value.is_empty() => None,
        Some(value) => Some(value),
    };
    let cors_origins = clean_list(&cmd.cors_origins, "invalid_cors_origin", normalize_origin)?;
    let blocked_ips = clean_list(&cmd.blocked_ips, "invalid_blocked_ip", |value| {
        value.parse::<IpAddr>().ok().map(|ip| ip.to_string())
    })?;
    let blocked_bots = clean_list(&cmd.blocked_bots, "invalid_blocked_bot", |value| {
        (value.chars().count() <= 100).then(|| value.to_string())
    })?;

    Ok(SiteSettings {
        site_name,
        domain,
        contact_email,
        smtp_host,
        smtp_port: cmd.smtp_port,
        smtp_username,
        smtp_password,
        smtp_from,
        smtp_tls_mode,
        jwt_expiry_minutes: cmd.jwt_expiry_minutes,
        cors_origins,
        blocked_ips,
        blocked_bots,
        updated_at: Utc::now(),
    })
}

pub async fn get_settings(state: &AppState, identity: &Identity) -> Result<SiteSettings, ServiceError> {
    require(identity, Permission::Settings, "get")?;
    let settings = SiteSettingsRepo::new(&state.db)
        .get()
        .await
        .map_err(|err| db_error("settings_get", err))?;
    Ok(masked(settings))
}

/// Saves, drops the cached copy and swaps the live CORS allowlist.
pub async fn update_settings(
    state: &AppState,
    identity: &Identity,
    cmd: UpdateSettingsCommand,
) -> Result<SiteSettings, ServiceError> {
    require(identity, Permission::Settings, "update")?;
    let repo = SiteSettingsRepo::new(&state.db);
    let current = repo
        .get()
        .await
        .map_err(|err| db_error("settings_get", err))?;
    let next = validated(cmd, &current)?;
    repo.update(&next)
        .await
        .map_err(|err| db_error("settings_update", err))?;
    state.settings_cache.invalidate(CACHE_KEY);
    apply_cors(state, &next);
    tracing::info!(
        event = "settings_updated",
        by = identity.employee_id,
        cors_origins = next.cors_origins.len(),
        blocked_ips = next.blocked_ips.len(),
        blocked_bots = next.blocked_bots.len()
    );
    Ok(masked(next))
}

/// Static origins from the config file plus the ones stored in settings.
pub fn apply_cors(state: &AppState, settings: &SiteSettings) {
    state.cors_origins.replace(
        state
            .config
            .server
            .cors_origins
            .iter()
            .chain(settings.cors_origins.iter()),
    );
}

pub async fn public_settings(state: &AppState) -> Result<PublicSettings, ServiceError> {
    let settings = load_settings(state).await?;
    Ok(PublicSettings {
        site_name: settings.site_name,
        domain: settings.domain,
        contact_email: settings.contact_email,
    })
}
