use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 128;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$").expect("email regex")
});
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9 ()\-]{7,20}$").expect("phone regex"));
static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9\-]{0,63}$").expect("slug regex"));
static LOGIN_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._\-]{2,31}$").expect("login id regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{code}")]
pub struct ValidationError {
    pub code: &'static str,
}

const fn invalid(code: &'static str) -> ValidationError {
    ValidationError { code }
}

/// Trims and checks the length in characters, not bytes.
pub fn require_len(
    code: &'static str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if len < min || len > max {
        return Err(invalid(code));
    }
    Ok(trimmed.to_string())
}

/// Empty strings collapse to `None`; anything else must fit `max`.
pub fn optional_len(
    code: &'static str,
    value: Option<&str>,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    match value.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) if value.chars().count() > max => Err(invalid(code)),
        Some(value) => Ok(Some(value.to_string())),
        None => Ok(None),
    }
}

#[must_use]
pub fn is_email(value: &str) -> bool {
    value.len() <= 254 && EMAIL_RE.is_match(value)
}

#[must_use]
pub fn is_phone(value: &str) -> bool {
    PHONE_RE.is_match(value)
}

#[must_use]
pub fn is_slug(value: &str) -> bool {
    SLUG_RE.is_match(value)
}

#[must_use]
pub fn is_login_id(value: &str) -> bool {
    LOGIN_ID_RE.is_match(value)
}

/// Absolute http(s) URLs or site-relative paths.
#[must_use]
pub fn is_link_url(value: &str) -> bool {
    if value.starts_with('/') {
        return !value.starts_with("//");
    }
    let lower = value.to_ascii_lowercase();
    (lower.starts_with("http://") || lower.starts_with("https://")) && !value.contains(char::is_whitespace)
}

pub fn optional_email(value: Option<&str>) -> Result<Option<String>, ValidationError> {
    let value = optional_len("invalid_email", value, 254)?;
    match value {
        Some(email) if !is_email(&email) => Err(invalid("invalid_email")),
        other => Ok(other),
    }
}

pub fn optional_phone(value: Option<&str>) -> Result<Option<String>, ValidationError> {
    let value = optional_len("invalid_phone", value, 20)?;
    match value {
        Some(phone) if !is_phone(&phone) => Err(invalid("invalid_phone")),
        other => Ok(other),
    }
}

pub fn password(value: &str) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len) {
        return Err(invalid("invalid_password"));
    }
    Ok(())
}
