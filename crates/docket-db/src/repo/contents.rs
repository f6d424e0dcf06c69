use super::prelude::*;
use super::{like_pattern, Page};

const GROUP_COLUMNS: &str = r#"
    id,
    slug,
    name,
    description,
    allow_anonymous,
    use_secret,
    allow_files,
    notify_email,
    is_active,
    created_at,
    updated_at
"#;

const CONTENT_COLUMNS: &str = r#"
    id,
    group_id,
    title,
    body,
    author_name,
    author_email,
    author_phone,
    password_hash,
    is_secret,
    is_notice,
    status,
    view_count,
    employee_id,
    reply,
    replied_at,
    replied_by,
    created_at,
    updated_at,
    deleted_at
"#;

const FILE_COLUMNS: &str =
    "id, content_id, original_name, stored_path, mime_type, size_bytes, created_at";

pub struct ContentGroupWrite<'a> {
    pub slug: &'a str,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub allow_anonymous: bool,
    pub use_secret: bool,
    pub allow_files: bool,
    pub notify_email: bool,
    pub is_active: bool,
}

pub struct ContentGroupRepo<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ContentGroupRepo<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, group: &ContentGroupWrite<'_>) -> Result<i64, sqlx_core::Error> {
        let now = Utc::now();
        query!(
            r#"
            INSERT INTO content_groups (
                slug, name, description, allow_anonymous, use_secret, allow_files,
                notify_email, is_active, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            group.slug,
            group.name,
            group.description,
            group.allow_anonymous,
            group.use_secret,
            group.allow_files,
            group.notify_email,
            group.is_active,
            now,
            now
        )
        .execute(self.pool)
        .await
        .map(|result| result.last_insert_rowid())
    }

    pub async fn get(&self, id: i64) -> Result<Option<ContentGroup>, sqlx_core::Error> {
        let sql = format!("SELECT {GROUP_COLUMNS} FROM content_groups WHERE id = ?");
        query_as!(ContentGroup, &sql, id)
            .fetch_optional(self.pool)
            .await
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<ContentGroup>, sqlx_core::Error> {
        let sql = format!("SELECT {GROUP_COLUMNS} FROM content_groups WHERE slug = ?");
        query_as!(ContentGroup, &sql, slug)
            .fetch_optional(self.pool)
            .await
    }

    pub async fn list(&self) -> Result<Vec<ContentGroup>, sqlx_core::Error> {
        let sql = format!("SELECT {GROUP_COLUMNS} FROM content_groups ORDER BY id");
        query_as!(ContentGroup, &sql).fetch_all(self.pool).await
    }

    pub async fn update(&self, id: i64, group: &ContentGroupWrite<'_>) -> Result<u64, sqlx_core::Error> {
        query!(
            r#"
            UPDATE content_groups
            SET slug = ?, name = ?, description = ?, allow_anonymous = ?, use_secret = ?,
                allow_files = ?, notify_email = ?, is_active = ?, updated_at = ?
            WHERE id = ?
            "#,
            group.slug,
            group.name,
            group.description,
            group.allow_anonymous,
            group.use_secret,
            group.allow_files,
            group.notify_email,
            group.is_active,
            Utc::now(),
            id
        )
        .execute(self.pool)
        .await
        .map(|result| result.rows_affected())
    }

    pub async fn delete(&self, id: i64) -> Result<u64, sqlx_core::Error> {
        query!("DELETE FROM content_groups WHERE id = ?", id)
            .execute(self.pool)
            .await
            .map(|result| result.rows_affected())
    }

    /// Counts soft-deleted rows too; they still reference the group.
    pub async fn count_contents(&self, id: i64) -> Result<i64, sqlx_core::Error> {
        query_scalar!(i64, "SELECT COUNT(*) FROM contents WHERE group_id = ?", id)
            .fetch_one(self.pool)
            .await
    }
}

pub struct NewContent<'a> {
    pub group_id: i64,
    pub title: &'a str,
    pub body: &'a str,
    pub author_name: &'a str,
    pub author_email: Option<&'a str>,
    pub author_phone: Option<&'a str>,
    pub password_hash: Option<&'a str>,
    pub is_secret: bool,
    pub is_notice: bool,
    pub status: ContentStatus,
    pub employee_id: Option<i64>,
}

pub struct ContentUpdate<'a> {
    pub title: &'a str,
    pub body: &'a str,
    pub is_secret: bool,
    pub is_notice: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ContentFilter {
    pub group_id: Option<i64>,
    pub search: Option<String>,
    /// Public listing: restricts to `Published` and keeps secret titles out
    /// of search matches.
    pub published_only: bool,
}

pub struct ContentRepo<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ContentRepo<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, content: &NewContent<'_>) -> Result<i64, sqlx_core::Error> {
        let now = Utc::now();
        query!(
            r#"
            INSERT INTO contents (
                group_id, title, body, author_name, author_email, author_phone, password_hash,
                is_secret, is_notice, status, employee_id, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            content.group_id,
            content.title,
            content.body,
            content.author_name,
            content.author_email,
            content.author_phone,
            content.password_hash,
            content.is_secret,
            content.is_notice,
            content.status.as_i32(),
            content.employee_id,
            now,
            now
        )
        .execute(self.pool)
        .await
        .map(|result| result.last_insert_rowid())
    }

    /// Soft-deleted rows are invisible here.
    pub async fn get(&self, id: i64) -> Result<Option<Content>, sqlx_core::Error> {
        let sql = format!("SELECT {CONTENT_COLUMNS} FROM contents WHERE id = ? AND deleted_at IS NULL");
        query_as!(Content, &sql, id).fetch_optional(self.pool).await
    }

    pub async fn list(
        &self,
        filter: &ContentFilter,
        page: Page,
    ) -> Result<(Vec<Content>, i64), sqlx_core::Error> {
        let pattern = filter.search.as_deref().map(like_pattern);
        let status = filter
            .published_only
            .then_some(ContentStatus::Published.as_i32());
        // Public listings mask secret titles, so a search may not match them.
        let where_clause = r#"
            WHERE deleted_at IS NULL
              AND (?1 IS NULL OR group_id = ?1)
              AND (?2 IS NULL
                   OR (title LIKE ?2 ESCAPE '\' AND (?4 = 0 OR is_secret = 0))
                   OR author_name LIKE ?2 ESCAPE '\')
              AND (?3 IS NULL OR status = ?3)
        "#;
        let sql = format!(
            r#"
            SELECT {CONTENT_COLUMNS}
            FROM contents
            {where_clause}
            ORDER BY is_notice DESC, created_at DESC, id DESC
            LIMIT ?5 OFFSET ?6
            "#
        );
        let count_sql = format!("SELECT COUNT(*) FROM contents {where_clause}");
        let rows = query_as!(
            Content,
            &sql,
            filter.group_id,
            pattern.as_deref(),
            status,
            filter.published_only,
            page.limit,
            page.offset
        )
        .fetch_all(self.pool)
        .await?;
        let total = query_scalar!(
            i64,
            &count_sql,
            filter.group_id,
            pattern.as_deref(),
            status,
            filter.published_only
        )
        .fetch_one(self.pool)
        .await?;
        Ok((rows, total))
    }

    pub async fn update(&self, id: i64, content: &ContentUpdate<'_>) -> Result<u64, sqlx_core::Error> {
        query!(
            r#"
            UPDATE contents
            SET title = ?, body = ?, is_secret = ?, is_notice = ?, updated_at = ?
            WHERE id = ? AND deleted_at IS NULL
            "#,
            content.title,
            content.body,
            content.is_secret,
            content.is_notice,
            Utc::now(),
            id
        )
        .execute(self.pool)
        .await
        .map(|result| result.rows_affected())
    }

    pub async fn soft_delete(&self, id: i64) -> Result<u64, sqlx_core::Error> {
        let now = Utc::now();
        query!(
            "UPDATE contents SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
            now,
            now,
            id
        )
        .execute(self.pool)
        .await
        .map(|result| result.rows_affected())
    }

    pub async fn set_reply(
        &self,
        id: i64,
        reply: Option<&str>,
        replied_by: i64,
    ) -> Result<u64, sqlx_core::Error> {
        let now = Utc::now();
        let replied_at = reply.map(|_| now);
        let replied_by = reply.map(|_| replied_by);
        query!(
            r#"
            UPDATE contents
            SET reply = ?, replied_at = ?, replied_by = ?, updated_at = ?
            WHERE id = ? AND deleted_at IS NULL
            "#,
            reply,
            replied_at,
            replied_by,
            now,
            id
        )
        .execute(self.pool)
        .await
        .map(|result| result.rows_affected())
    }

    pub async fn set_status(&self, id: i64, status: ContentStatus) -> Result<u64, sqlx_core::Error> {
        query!(
            "UPDATE contents SET status = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
            status.as_i32(),
            Utc::now(),
            id
        )
        .execute(self.pool)
        .await
        .map(|result| result.rows_affected())
    }

    pub async fn increment_views(&self, id: i64) -> Result<(), sqlx_core::Error> {
        query!("UPDATE contents SET view_count = view_count + 1 WHERE id = ?", id)
            .execute(self.pool)
            .await
            .map(|_| ())
    }
}

pub struct NewContentFile<'a> {
    pub content_id: i64,
    pub original_name: &'a str,
    pub stored_path: &'a str,
    pub mime_type: &'a str,
    pub size_bytes: i64,
}

pub struct ContentFileRepo<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ContentFileRepo<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, file: &NewContentFile<'_>) -> Result<i64, sqlx_core::Error> {
        query!(
            r#"
            INSERT INTO content_files (content_id, original_name, stored_path, mime_type, size_bytes, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
            file.content_id,
            file.original_name,
            file.stored_path,
            file.mime_type,
            file.size_bytes,
            Utc::now()
        )
        .execute(self.pool)
        .await
        .map(|result| result.last_insert_rowid())
    }

    /// Counts and inserts inside one write-locked transaction; `None` means
    /// the content already holds `max_files` attachments.
    pub async fn create_within_limit(
        &self,
        file: &NewContentFile<'_>,
        max_files: i64,
    ) -> Result<Option<i64>, sqlx_core::Error> {
        let mut tx = begin_write(self.pool).await?;
        let count = query_scalar!(
            i64,
            "SELECT COUNT(*) FROM content_files WHERE content_id = ?",
            file.content_id
        )
        .fetch_one(&mut *tx)
        .await?;
        if count >= max_files {
            tx.rollback().await?;
            return Ok(None);
        }
        let id = query!(
            r#"
            INSERT INTO content_files (content_id, original_name, stored_path, mime_type, size_bytes, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
            file.content_id,
            file.original_name,
            file.stored_path,
            file.mime_type,
            file.size_bytes,
            Utc::now()
        )
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();
        tx.commit().await?;
        Ok(Some(id))
    }

    pub async fn get(&self, id: i64) -> Result<Option<ContentFile>, sqlx_core::Error> {
        let sql = format!("SELECT {FILE_COLUMNS} FROM content_files WHERE id = ?");
        query_as!(ContentFile, &sql, id)
            .fetch_optional(self.pool)
            .await
    }

    pub async fn list_by_content(&self, content_id: i64) -> Result<Vec<ContentFile>, sqlx_core::Error> {
        let sql = format!("SELECT {FILE_COLUMNS} FROM content_files WHERE content_id = ? ORDER BY id");
        query_as!(ContentFile, &sql, content_id)
            .fetch_all(self.pool)
            .await
    }

    pub async fn count_by_content(&self, content_id: i64) -> Result<i64, sqlx_core::Error> {
        query_scalar!(
            i64,
            "SELECT COUNT(*) FROM content_files WHERE content_id = ?",
            content_id
        )
        .fetch_one(self.pool)
        .await
    }

    pub async fn delete(&self, id: i64) -> Result<u64, sqlx_core::Error> {
        query!("DELETE FROM content_files WHERE id = ?", id)
            .execute(self.pool)
            .await
            .map(|result| result.rows_affected())
    }
}
