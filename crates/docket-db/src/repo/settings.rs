use sqlx_core::types::Json;

use super::prelude::*;

pub struct SiteSettingsRepo<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SiteSettingsRepo<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// The migration seeds the single row, so a missing row is a broken database.
    pub async fn get(&self) -> Result<SiteSettings, sqlx_core::Error> {
        query_as!(
            SiteSettings,
            r#"
            SELECT
                site_name,
                domain,
                contact_email,
                smtp_host,
                smtp_port,
                smtp_username,
                smtp_password,
                smtp_from,
                smtp_tls_mode,
                jwt_expiry_minutes,
                cors_origins,
                blocked_ips,
                blocked_bots,
                updated_at
            FROM site_settings
            WHERE id = 1
            "#
        )
        .fetch_one(self.pool)
        .await
    }

    pub async fn update(&self, settings: &SiteSettings) -> Result<(), sqlx_core::Error> {
        query!(
            r#"
            UPDATE site_settings
            SET site_name = ?,
                domain = ?,
                contact_email = ?,
                smtp_host = ?,
                smtp_port = ?,
                smtp_username = ?,
                smtp_password = ?,
                smtp_from = ?,
                smtp_tls_mode = ?,
                jwt_expiry_minutes = ?,
                cors_origins = ?,
                blocked_ips = ?,
                blocked_bots = ?,
                updated_at = ?
            WHERE id = 1
            "#,
            settings.site_name.as_str(),
            settings.domain.as_deref(),
            settings.contact_email.as_deref(),
            settings.smtp_host.as_deref(),
            settings.smtp_port,
            settings.smtp_username.as_deref(),
            settings.smtp_password.as_deref(),
            settings.smtp_from.as_deref(),
            settings.smtp_tls_mode.as_str(),
            settings.jwt_expiry_minutes,
            Json(&settings.cors_origins),
            Json(&settings.blocked_ips),
            Json(&settings.blocked_bots),
            settings.updated_at
        )
        .execute(self.pool)
        .await
        .map(|_| ())
    }
}
