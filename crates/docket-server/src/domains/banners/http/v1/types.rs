use chrono::{DateTime, Utc};
use docket_core::{Banner, BannerGroup, BannerKind, LinkTarget};
use serde::{Deserialize, Serialize};

use crate::infra::uploads::public_url;

#[derive(Serialize)]
pub(crate) struct BannerResponse {
    #[serde(flatten)]
    pub(crate) banner: Banner,
    pub(crate) image_url: Option<String>,
    pub(crate) mobile_image_url: Option<String>,
}

impl From<Banner> for BannerResponse {
    fn from(banner: Banner) -> Self {
        Self {
            image_url: banner.image_path.as_deref().map(public_url),
            mobile_image_url: banner.mobile_image_path.as_deref().map(public_url),
            banner,
        }
    }
}

#[derive(Serialize)]
pub(crate) struct BannerListResponse {
    pub(crate) banners: Vec<BannerResponse>,
}

impl BannerListResponse {
    pub(crate) fn new(banners: Vec<Banner>) -> Self {
        Self {
            banners: banners.into_iter().map(BannerResponse::from).collect(),
        }
    }
}

#[derive(Serialize)]
pub(crate) struct BannerGroupListResponse {
    pub(crate) groups: Vec<BannerGroup>,
}

#[derive(Deserialize)]
pub(crate) struct KindQuery {
    pub(crate) kind: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct GroupQuery {
    pub(crate) group_id: Option<i64>,
}

#[derive(Deserialize)]
pub(crate) struct BannerGroupRequest {
    pub(crate) kind: BannerKind,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    #[serde(default = "default_true")]
    pub(crate) is_active: bool,
}

#[derive(Deserialize)]
pub(crate) struct BannerRequest {
    pub(crate) group_id: i64,
    #[serde(default)]
    pub(crate) sequence: i32,
    pub(crate) title: String,
    pub(crate) link_url: Option<String>,
    #[serde(default = "default_link_target")]
    pub(crate) link_target: LinkTarget,
    #[serde(default)]
    pub(crate) is_published: bool,
    pub(crate) published_at: DateTime<Utc>,
    pub(crate) unpublished_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub(crate) struct PublishRequest {
    pub(crate) is_published: bool,
}

const fn default_true() -> bool {
    true
}

const fn default_link_target() -> LinkTarget {
    LinkTarget::SameWindow
}
