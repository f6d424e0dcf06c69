use chrono::{DateTime, Utc};
use docket_core::{Content, ContentFile, ContentGroup, ContentStatus};
use serde::{Deserialize, Serialize};

use crate::domains::contents::service::{ContentDetail, PublicSummary};
use crate::infra::uploads::public_url;

#[derive(Serialize)]
pub(crate) struct FileResponse {
    pub(crate) id: i64,
    pub(crate) original_name: String,
    pub(crate) mime_type: String,
    pub(crate) size_bytes: i64,
    pub(crate) url: String,
    pub(crate) created_at: DateTime<Utc>,
}

impl From<ContentFile> for FileResponse {
    fn from(file: ContentFile) -> Self {
        Self {
            url: public_url(&file.stored_path),
            id: file.id,
            original_name: file.original_name,
            mime_type: file.mime_type,
            size_bytes: file.size_bytes,
            created_at: file.created_at,
        }
    }
}

#[derive(Serialize)]
pub(crate) struct ContentResponse {
    #[serde(flatten)]
    pub(crate) content: Content,
    pub(crate) files: Vec<FileResponse>,
}

impl From<ContentDetail> for ContentResponse {
    fn from(detail: ContentDetail) -> Self {
        Self {
            content: detail.content,
            files: detail.files.into_iter().map(FileResponse::from).collect(),
        }
    }
}

#[derive(Serialize)]
pub(crate) struct ContentListResponse {
    pub(crate) contents: Vec<Content>,
    pub(crate) total: i64,
}

#[derive(Serialize)]
pub(crate) struct ContentGroupListResponse {
    pub(crate) groups: Vec<ContentGroup>,
}

/// Visitor view of a post; contact details and staff fields stay private.
#[derive(Serialize)]
pub(crate) struct PublicContentResponse {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) body: String,
    pub(crate) author_name: String,
    pub(crate) is_secret: bool,
    pub(crate) is_notice: bool,
    pub(crate) view_count: i64,
    pub(crate) reply: Option<String>,
    pub(crate) replied_at: Option<DateTime<Utc>>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) files: Vec<FileResponse>,
}

impl From<ContentDetail> for PublicContentResponse {
    fn from(detail: ContentDetail) -> Self {
        let content = detail.content;
        Self {
            id: content.id,
            title: content.title,
            body: content.body,
            author_name: content.author_name,
            is_secret: content.is_secret,
            is_notice: content.is_notice,
            view_count: content.view_count,
            reply: content.reply,
            replied_at: content.replied_at,
            created_at: content.created_at,
            files: detail.files.into_iter().map(FileResponse::from).collect(),
        }
    }
}

#[derive(Serialize)]
pub(crate) struct BoardResponse {
    pub(crate) slug: String,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) allow_anonymous: bool,
    pub(crate) use_secret: bool,
    pub(crate) allow_files: bool,
}

impl From<ContentGroup> for BoardResponse {
    fn from(group: ContentGroup) -> Self {
        Self {
            slug: group.slug,
            name: group.name,
            description: group.description,
            allow_anonymous: group.allow_anonymous,
            use_secret: group.use_secret,
            allow_files: group.allow_files,
        }
    }
}

#[derive(Serialize)]
pub(crate) struct PublicListResponse {
    pub(crate) board: BoardResponse,
    pub(crate) items: Vec<PublicSummary>,
    pub(crate) total: i64,
}

#[derive(Deserialize)]
pub(crate) struct ListContentsQuery {
    pub(crate) group_id: Option<i64>,
    pub(crate) search: Option<String>,
    pub(crate) limit: Option<i64>,
    pub(crate) offset: Option<i64>,
}

#[derive(Deserialize)]
pub(crate) struct PublicListQuery {
    pub(crate) search: Option<String>,
    pub(crate) limit: Option<i64>,
    pub(crate) offset: Option<i64>,
}

#[derive(Deserialize)]
pub(crate) struct ContentGroupRequest {
    pub(crate) slug: String,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    #[serde(default)]
    pub(crate) allow_anonymous: bool,
    #[serde(default)]
    pub(crate) use_secret: bool,
    #[serde(default)]
    pub(crate) allow_files: bool,
    #[serde(default)]
    pub(crate) notify_email: bool,
    #[serde(default = "default_true")]
    pub(crate) is_active: bool,
}

#[derive(Deserialize)]
pub(crate) struct CreateContentRequest {
    pub(crate) group_id: i64,
    pub(crate) title: String,
    pub(crate) body: String,
    #[serde(default)]
    pub(crate) is_secret: bool,
    #[serde(default)]
    pub(crate) is_notice: bool,
}

#[derive(Deserialize)]
pub(crate) struct UpdateContentRequest {
    pub(crate) title: String,
    pub(crate) body: String,
    #[serde(default)]
    pub(crate) is_secret: bool,
    #[serde(default)]
    pub(crate) is_notice: bool,
}

#[derive(Deserialize)]
pub(crate) struct ReplyRequest {
    pub(crate) reply: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct StatusRequest {
    pub(crate) status: ContentStatus,
}

#[derive(Deserialize)]
pub(crate) struct PublicPostRequest {
    pub(crate) author_name: String,
    pub(crate) author_email: Option<String>,
    pub(crate) author_phone: Option<String>,
    pub(crate) password: String,
    pub(crate) title: String,
    pub(crate) body: String,
    #[serde(default)]
    pub(crate) is_secret: bool,
    pub(crate) recaptcha_token: Option<String>,
}

const fn default_true() -> bool {
    true
}
