use sqlx_core::from_row::FromRow;
use sqlx_core::row::Row;
use sqlx_core::types::Json;
use sqlx_sqlite::SqliteRow;

use super::*;

fn parse_enum<T: TryFrom<i32, Error = EnumParseError>>(value: i64) -> Result<T, sqlx_core::Error> {
    let value = i32::try_from(value).map_err(|err| sqlx_core::Error::Decode(Box::new(err)))?;
    T::try_from(value).map_err(|err| sqlx_core::Error::Decode(Box::new(err)))
}

macro_rules! impl_from_row {
    ($ty:ty, $row:ident => $body:block) => {
        impl FromRow<'_, SqliteRow> for $ty {
            fn from_row($row: &SqliteRow) -> Result<Self, sqlx_core::Error> {
                $body
            }
        }
    };
}

impl_from_row!(Employee, row => {
        let status: i64 = row.try_get("status")?;
        Ok(Self {
            id: row.try_get("id")?,
            login_id: row.try_get("login_id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            position: row.try_get("position")?,
            password_hash: row.try_get("password_hash")?,
            status: parse_enum(status)?,
            last_login_at: row.try_get("last_login_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
);

impl_from_row!(PermissionRow, row => {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
        })
    }
);

impl_from_row!(BannerGroup, row => {
        let kind: i64 = row.try_get("kind")?;
        Ok(Self {
            id: row.try_get("id")?,
            kind: parse_enum(kind)?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
);

impl_from_row!(Banner, row => {
        let link_target: i64 = row.try_get("link_target")?;
        Ok(Self {
            id: row.try_get("id")?,
            group_id: row.try_get("group_id")?,
            sequence: row.try_get("sequence")?,
            title: row.try_get("title")?,
            image_path: row.try_get("image_path")?,
            mobile_image_path: row.try_get("mobile_image_path")?,
            link_url: row.try_get("link_url")?,
            link_target: parse_enum(link_target)?,
            is_published: row.try_get("is_published")?,
            published_at: row.try_get("published_at")?,
            unpublished_at: row.try_get("unpublished_at")?,
            created_by: row.try_get("created_by")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
);

impl_from_row!(ContentGroup, row => {
        Ok(Self {
            id: row.try_get("id")?,
            slug: row.try_get("slug")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            allow_anonymous: row.try_get("allow_anonymous")?,
            use_secret: row.try_get("use_secret")?,
            allow_files: row.try_get("allow_files")?,
            notify_email: row.try_get("notify_email")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
);

impl_from_row!(Content, row => {
        let status: i64 = row.try_get("status")?;
        Ok(Self {
            id: row.try_get("id")?,
            group_id: row.try_get("group_id")?,
            title: row.try_get("title")?,
            body: row.try_get("body")?,
            author_name: row.try_get("author_name")?,
            author_email: row.try_get("author_email")?,
            author_phone: row.try_get("author_phone")?,
            password_hash: row.try_get("password_hash")?,
            is_secret: row.try_get("is_secret")?,
            is_notice: row.try_get("is_notice")?,
            status: parse_enum(status)?,
            view_count: row.try_get("view_count")?,
            employee_id: row.try_get("employee_id")?,
            reply: row.try_get("reply")?,
            replied_at: row.try_get("replied_at")?,
            replied_by: row.try_get("replied_by")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            deleted_at: row.try_get("deleted_at")?,
        })
    }
);

impl_from_row!(ContentFile, row => {
        Ok(Self {
            id: row.try_get("id")?,
            content_id: row.try_get("content_id")?,
            original_name: row.try_get("original_name")?,
            stored_path: row.try_get("stored_path")?,
            mime_type: row.try_get("mime_type")?,
            size_bytes: row.try_get("size_bytes")?,
            created_at: row.try_get("created_at")?,
        })
    }
);

impl_from_row!(SiteSettings, row => {
        let cors_origins: Json<Vec<String>> = row.try_get("cors_origins")?;
        let blocked_ips: Json<Vec<String>> = row.try_get("blocked_ips")?;
        let blocked_bots: Json<Vec<String>> = row.try_get("blocked_bots")?;
        Ok(Self {
            site_name: row.try_get("site_name")?,
            domain: row.try_get("domain")?,
            contact_email: row.try_get("contact_email")?,
            smtp_host: row.try_get("smtp_host")?,
            smtp_port: row.try_get("smtp_port")?,
            smtp_username: row.try_get("smtp_username")?,
            smtp_password: row.try_get("smtp_password")?,
            smtp_from: row.try_get("smtp_from")?,
            smtp_tls_mode: row.try_get("smtp_tls_mode")?,
            jwt_expiry_minutes: row.try_get("jwt_expiry_minutes")?,
            cors_origins: cors_origins.0,
            blocked_ips: blocked_ips.0,
            blocked_bots: blocked_bots.0,
            updated_at: row.try_get("updated_at")?,
        })
    }
);

impl_from_row!(Visit, row => {
        Ok(Self {
            id: row.try_get("id")?,
            path: row.try_get("path")?,
            referrer: row.try_get("referrer")?,
            user_agent: row.try_get("user_agent")?,
            ip: row.try_get("ip")?,
            visited_at: row.try_get("visited_at")?,
        })
    }
);
