use serde::Deserialize;

#[derive(Deserialize)]
pub(crate) struct UpdateSettingsRequest {
    pub(crate) site_name: String,
    pub(crate) domain: Option<String>,
    pub(crate) contact_email: Option<String>,
    pub(crate) smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub(crate) smtp_port: i32,
    pub(crate) smtp_username: Option<String>,
    pub(crate) smtp_password: Option<String>,
    pub(crate) smtp_from: Option<String>,
    #[serde(default = "default_tls_mode")]
    pub(crate) smtp_tls_mode: String,
    pub(crate) jwt_expiry_minutes: i64,
    #[serde(default)]
    pub(crate) cors_origins: Vec<String>,
    #[serde(default)]
    pub(crate) blocked_ips: Vec<String>,
    #[serde(default)]
    pub(crate) blocked_bots: Vec<String>,
}

const fn default_smtp_port() -> i32 {
    587
}

fn default_tls_mode() -> String {
    "starttls".to_string()
}
