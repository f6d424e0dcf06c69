use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{BannerKind, ContentStatus, EmployeeStatus, LinkTarget};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub id: i64,
    pub login_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub status: EmployeeStatus,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionRow {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BannerGroup {
    pub id: i64,
    pub kind: BannerKind,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Banner {
    pub id: i64,
    pub group_id: i64,
    pub sequence: i32,
    pub title: String,
    pub image_path: Option<String>,
    pub mobile_image_path: Option<String>,
    pub link_url: Option<String>,
    pub link_target: LinkTarget,
    pub is_published: bool,
    pub published_at: DateTime<Utc>,
    pub unpublished_at: Option<DateTime<Utc>>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Banner {
    #[must_use]
    pub fn window(&self) -> crate::schedule::PublishWindow {
        crate::schedule::PublishWindow::from_stored(self.published_at, self.unpublished_at)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentGroup {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub allow_anonymous: bool,
    pub use_secret: bool,
    pub allow_files: bool,
    pub notify_email: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub id: i64,
    pub group_id: i64,
    pub title: String,
    pub body: String,
    pub author_name: String,
    pub author_email: Option<String>,
    pub author_phone: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub is_secret: bool,
    pub is_notice: bool,
    pub status: ContentStatus,
    pub view_count: i64,
    pub employee_id: Option<i64>,
    pub reply: Option<String>,
    pub replied_at: Option<DateTime<Utc>>,
    pub replied_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentFile {
    pub id: i64,
    pub content_id: i64,
    pub original_name: String,
    pub stored_path: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteSettings {
    pub site_name: String,
    pub domain: Option<String>,
    pub contact_email: Option<String>,
    pub smtp_host: Option<String>,
    pub smtp_port: i32,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: Option<String>,
    pub smtp_tls_mode: String,
    pub jwt_expiry_minutes: i64,
    pub cors_origins: Vec<String>,
    pub blocked_ips: Vec<String>,
    pub blocked_bots: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl SiteSettings {
    #[must_use]
    pub fn smtp_configured(&self) -> bool {
        self.smtp_host.as_deref().is_some_and(|host| !host.is_empty())
            && self.smtp_from.as_deref().is_some_and(|from| !from.is_empty())
    }

    #[must_use]
    pub fn is_ip_blocked(&self, ip: &str) -> bool {
        self.blocked_ips.iter().any(|blocked| blocked == ip)
    }

    /// Case-insensitive substring match against the configured bot markers.
    #[must_use]
    pub fn is_bot(&self, user_agent: &str) -> bool {
        let agent = user_agent.to_ascii_lowercase();
        self.blocked_bots
            .iter()
            .map(|marker| marker.trim().to_ascii_lowercase())
            .any(|marker| !marker.is_empty() && agent.contains(&marker))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Visit {
    pub id: i64,
    pub path: String,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub ip: Option<String>,
    pub visited_at: DateTime<Utc>,
}
