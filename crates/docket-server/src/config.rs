use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerRuntimeConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub uploads: UploadConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub recaptcha: RecaptchaConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

pub const DEFAULT_MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerRuntimeConfig {
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    #[serde(default)]
    pub trusted_proxies: Vec<String>,
    /// Origins allowed before site settings are loaded; merged with the stored list.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ServerRuntimeConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: default_max_body_bytes(),
            trusted_proxies: Vec::new(),
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default = "default_true")]
    pub cookie_secure: bool,
    #[serde(default)]
    pub kdf: KdfConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            cookie_secure: default_true(),
            kdf: KdfConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KdfConfig {
    #[serde(default = "default_kdf_iterations")]
    pub iterations: u32,
    #[serde(default = "default_kdf_memory_kb")]
    pub memory_kb: u32,
    #[serde(default = "default_kdf_parallelism")]
    pub parallelism: u32,
}

impl Default for KdfConfig {
    fn default() -> Self {
        Self {
            iterations: default_kdf_iterations(),
            memory_kb: default_kdf_memory_kb(),
            parallelism: default_kdf_parallelism(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_ttl_seconds")]
    pub ttl_seconds: u64,
    #[serde(default = "default_cache_purge_interval_seconds")]
    pub purge_interval_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_cache_ttl_seconds(),
            purge_interval_seconds: default_cache_purge_interval_seconds(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_upload_dir")]
    pub dir: String,
    #[serde(default = "default_upload_max_file_bytes")]
    pub max_file_bytes: usize,
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,
    #[serde(default = "default_file_extensions")]
    pub file_extensions: Vec<String>,
    #[serde(default = "default_true")]
    pub convert_to_webp: bool,
    #[serde(default = "default_webp_quality")]
    pub webp_quality: f32,
    #[serde(default = "default_max_files_per_content")]
    pub max_files_per_content: i64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: default_upload_dir(),
            max_file_bytes: default_upload_max_file_bytes(),
            image_extensions: default_image_extensions(),
            file_extensions: default_file_extensions(),
            convert_to_webp: default_true(),
            webp_quality: default_webp_quality(),
            max_files_per_content: default_max_files_per_content(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_mail_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout_seconds: default_mail_timeout_seconds(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecaptchaConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub secret: String,
    #[serde(default = "default_recaptcha_verify_url")]
    pub verify_url: String,
    /// Only applied when the verifier returns a score (v3).
    #[serde(default = "default_recaptcha_min_score")]
    pub min_score: f64,
}

impl Default for RecaptchaConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            secret: String::new(),
            verify_url: default_recaptcha_verify_url(),
            min_score: default_recaptcha_min_score(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub profile: Option<MetricsProfile>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_metrics_endpoint(),
            profile: None,
        }
    }
}

/// Controls label cardinality; `prod` redacts resource labels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MetricsProfile {
    #[default]
    Prod,
    Staging,
    Debug,
}

impl MetricsConfig {
    pub fn effective_profile(&self) -> MetricsProfile {
        self.profile.unwrap_or_default()
    }
}

const fn default_true() -> bool {
    true
}

const fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

fn default_cookie_name() -> String {
    "docket_session".to_string()
}

const fn default_kdf_iterations() -> u32 {
    3
}

const fn default_kdf_memory_kb() -> u32 {
    19456
}

const fn default_kdf_parallelism() -> u32 {
    1
}

const fn default_cache_ttl_seconds() -> u64 {
    5 * 60
}

const fn default_cache_purge_interval_seconds() -> u64 {
    60
}

fn default_upload_dir() -> String {
    "uploads".to_string()
}

const fn default_upload_max_file_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_image_extensions() -> Vec<String> {
    ["jpg", "jpeg", "png", "gif", "webp"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn default_file_extensions() -> Vec<String> {
    [
        "pdf", "hwp", "hwpx", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "txt", "zip", "jpg",
        "jpeg", "png", "gif",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

const fn default_webp_quality() -> f32 {
    80.0
}

const fn default_max_files_per_content() -> i64 {
    5
}

const fn default_mail_timeout_seconds() -> u64 {
    10
}

fn default_recaptcha_verify_url() -> String {
    "https://www.google.com/recaptcha/api/siteverify".to_string()
}

const fn default_recaptcha_min_score() -> f64 {
    0.5
}

fn default_metrics_endpoint() -> String {
    "/metrics".to_string()
}
