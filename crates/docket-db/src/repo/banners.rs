use super::prelude::*;

const GROUP_COLUMNS: &str = "id, kind, name, description, is_active, created_at, updated_at";

const BANNER_COLUMNS: &str = r#"
    b.id,
    b.group_id,
    b.sequence,
    b.title,
    b.image_path,
    b.mobile_image_path,
    b.link_url,
    b.link_target,
    b.is_published,
    b.published_at,
    b.unpublished_at,
    b.created_by,
    b.created_at,
    b.updated_at
"#;

pub struct NewBannerGroup<'a> {
    pub kind: BannerKind,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub is_active: bool,
}

pub struct BannerGroupRepo<'a> {
    pool: &'a SqlitePool,
}

impl<'a> BannerGroupRepo<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, group: &NewBannerGroup<'_>) -> Result<i64, sqlx_core::Error> {
        let now = Utc::now();
        query!(
            r#"
            INSERT INTO banner_groups (kind, name, description, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
            group.kind.as_i32(),
            group.name,
            group.description,
            group.is_active,
            now,
            now
        )
        .execute(self.pool)
        .await
        .map(|result| result.last_insert_rowid())
    }

    pub async fn get(&self, id: i64) -> Result<Option<BannerGroup>, sqlx_core::Error> {
        let sql = format!("SELECT {GROUP_COLUMNS} FROM banner_groups WHERE id = ?");
        query_as!(BannerGroup, &sql, id)
            .fetch_optional(self.pool)
            .await
    }

    pub async fn list(&self, kind: Option<BannerKind>) -> Result<Vec<BannerGroup>, sqlx_core::Error> {
        let sql = format!(
            "SELECT {GROUP_COLUMNS} FROM banner_groups WHERE (?1 IS NULL OR kind = ?1) ORDER BY kind, id"
        );
        query_as!(BannerGroup, &sql, kind.map(BannerKind::as_i32))
            .fetch_all(self.pool)
            .await
    }

    pub async fn update(&self, id: i64, group: &NewBannerGroup<'_>) -> Result<u64, sqlx_core::Error> {
        query!(
            r#"
            UPDATE banner_groups
            SET kind = ?, name = ?, description = ?, is_active = ?, updated_at = ?
            WHERE id = ?
            "#,
            group.kind.as_i32(),
            group.name,
            group.description,
            group.is_active,
            Utc::now(),
            id
        )
        .execute(self.pool)
        .await
        .map(|result| result.rows_affected())
    }

    pub async fn delete(&self, id: i64) -> Result<u64, sqlx_core::Error> {
        query!("DELETE FROM banner_groups WHERE id = ?", id)
            .execute(self.pool)
            .await
            .map(|result| result.rows_affected())
    }

    pub async fn count_banners(&self, id: i64) -> Result<i64, sqlx_core::Error> {
        query_scalar!(i64, "SELECT COUNT(*) FROM banners WHERE group_id = ?", id)
            .fetch_one(self.pool)
            .await
    }
}

/// Fields written on banner create and update.
pub struct BannerWrite<'a> {
    pub group_id: i64,
    pub sequence: i32,
    pub title: &'a str,
    pub link_url: Option<&'a str>,
    pub link_target: LinkTarget,
    pub is_published: bool,
    pub published_at: DateTime<Utc>,
    pub unpublished_at: Option<DateTime<Utc>>,
}

/// Result of a write guarded by the slot conflict check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotWrite<T> {
    Written(T),
    /// Ids of the published banners whose windows collide; nothing was written.
    Conflict(Vec<i64>),
}

pub struct BannerRepo<'a> {
    pool: &'a SqlitePool,
}

impl<'a> BannerRepo<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        banner: &BannerWrite<'_>,
        created_by: Option<i64>,
    ) -> Result<i64, sqlx_core::Error> {
        let mut conn = self.pool.acquire().await?;
        insert_banner(&mut conn, banner, created_by).await
    }

    /// Inserts `banner` unless, being published, it collides with its slot.
    /// The lookup and the insert share one write-locked transaction.
    pub async fn create_checked(
        &self,
        banner: &BannerWrite<'_>,
        created_by: Option<i64>,
    ) -> Result<SlotWrite<i64>, sqlx_core::Error> {
        let mut tx = begin_write(self.pool).await?;
        if banner.is_published {
            let conflicts = slot_conflicts(&mut tx, banner, None).await?;
            if !conflicts.is_empty() {
                tx.rollback().await?;
                return Ok(SlotWrite::Conflict(conflicts));
            }
        }
        let id = insert_banner(&mut tx, banner, created_by).await?;
        tx.commit().await?;
        Ok(SlotWrite::Written(id))
    }

    pub async fn get(&self, id: i64) -> Result<Option<Banner>, sqlx_core::Error> {
        let sql = format!("SELECT {BANNER_COLUMNS} FROM banners b WHERE b.id = ?");
        query_as!(Banner, &sql, id).fetch_optional(self.pool).await
    }

    pub async fn list(&self, group_id: Option<i64>) -> Result<Vec<Banner>, sqlx_core::Error> {
        let sql = format!(
            r#"
            SELECT {BANNER_COLUMNS}
            FROM banners b
            WHERE (?1 IS NULL OR b.group_id = ?1)
            ORDER BY b.group_id, b.sequence, b.published_at DESC
            "#
        );
        query_as!(Banner, &sql, group_id).fetch_all(self.pool).await
    }

    pub async fn update(&self, id: i64, banner: &BannerWrite<'_>) -> Result<u64, sqlx_core::Error> {
        let mut conn = self.pool.acquire().await?;
        update_banner(&mut conn, id, banner).await
    }

    /// Conflict-checked counterpart of [`Self::update`]; the banner's own row
    /// is left out of the slot lookup.
    pub async fn update_checked(
        &self,
        id: i64,
        banner: &BannerWrite<'_>,
    ) -> Result<SlotWrite<u64>, sqlx_core::Error> {
        let mut tx = begin_write(self.pool).await?;
        if banner.is_published {
            let conflicts = slot_conflicts(&mut tx, banner, Some(id)).await?;
            if !conflicts.is_empty() {
                tx.rollback().await?;
                return Ok(SlotWrite::Conflict(conflicts));
            }
        }
        let updated = update_banner(&mut tx, id, banner).await?;
        tx.commit().await?;
        Ok(SlotWrite::Written(updated))
    }

    pub async fn set_published(&self, id: i64, is_published: bool) -> Result<u64, sqlx_core::Error> {
        let mut conn = self.pool.acquire().await?;
        update_published(&mut conn, id, is_published).await
    }

    /// Publishing re-reads the stored window inside the transaction and checks
    /// it against the slot; unpublishing never conflicts.
    pub async fn set_published_checked(
        &self,
        id: i64,
        is_published: bool,
    ) -> Result<SlotWrite<u64>, sqlx_core::Error> {
        let mut tx = begin_write(self.pool).await?;
        if is_published {
            let sql = format!("SELECT {BANNER_COLUMNS} FROM banners b WHERE b.id = ?");
            let current = query_as!(Banner, &sql, id).fetch_optional(&mut *tx).await?;
            if let Some(current) = current.filter(|banner| !banner.is_published) {
                let existing =
                    published_in_slot(&mut tx, current.group_id, current.sequence, Some(id))
                        .await?;
                let conflicts = find_conflicts(
                    &current.window(),
                    existing.iter().map(|banner| (banner.id, banner.window())),
                );
                if !conflicts.is_empty() {
                    tx.rollback().await?;
                    return Ok(SlotWrite::Conflict(conflicts));
                }
            }
        }
        let updated = update_published(&mut tx, id, is_published).await?;
        tx.commit().await?;
        Ok(SlotWrite::Written(updated))
    }

    /// `mobile` picks the column; `None` clears it.
    pub async fn set_image(
        &self,
        id: i64,
        mobile: bool,
        path: Option<&str>,
    ) -> Result<u64, sqlx_core::Error> {
        let sql = if mobile {
            "UPDATE banners SET mobile_image_path = ?, updated_at = ? WHERE id = ?"
        } else {
            "UPDATE banners SET image_path = ?, updated_at = ? WHERE id = ?"
        };
        query!(sql, path, Utc::now(), id)
            .execute(self.pool)
            .await
            .map(|result| result.rows_affected())
    }

    pub async fn delete(&self, id: i64) -> Result<u64, sqlx_core::Error> {
        query!("DELETE FROM banners WHERE id = ?", id)
            .execute(self.pool)
            .await
            .map(|result| result.rows_affected())
    }

    /// Published banners sharing a slot, optionally skipping the banner being edited.
    pub async fn list_published_in_slot(
        &self,
        group_id: i64,
        sequence: i32,
        exclude_id: Option<i64>,
    ) -> Result<Vec<Banner>, sqlx_core::Error> {
        let mut conn = self.pool.acquire().await?;
        published_in_slot(&mut conn, group_id, sequence, exclude_id).await
    }

    /// Banners live at `now` in active groups of `kind`, in display order.
    pub async fn list_live_by_kind(
        &self,
        kind: BannerKind,
        now: DateTime<Utc>,
    ) -> Result<Vec<Banner>, sqlx_core::Error> {
        let sql = format!(
            r#"
            SELECT {BANNER_COLUMNS}
            FROM banners b
            JOIN banner_groups g ON g.id = b.group_id
            WHERE g.kind = ?1
              AND g.is_active = 1
              AND b.is_published = 1
              AND b.published_at <= ?2
              AND (b.unpublished_at IS NULL OR b.unpublished_at >= ?2)
            ORDER BY b.group_id, b.sequence, b.id
            "#
        );
        query_as!(Banner, &sql, kind.as_i32(), now)
            .fetch_all(self.pool)
            .await
    }
}

async fn insert_banner(
    conn: &mut SqliteConnection,
    banner: &BannerWrite<'_>,
    created_by: Option<i64>,
) -> Result<i64, sqlx_core::Error> {
    let now = Utc::now();
    query!(
        r#"
        INSERT INTO banners (
            group_id, sequence, title, link_url, link_target, is_published,
            published_at, unpublished_at, created_by, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        banner.group_id,
        banner.sequence,
        banner.title,
        banner.link_url,
        banner.link_target.as_i32(),
        banner.is_published,
        banner.published_at,
        banner.unpublished_at,
        created_by,
        now,
        now
    )
    .execute(conn)
    .await
    .map(|result| result.last_insert_rowid())
}

async fn update_banner(
    conn: &mut SqliteConnection,
    id: i64,
    banner: &BannerWrite<'_>,
) -> Result<u64, sqlx_core::Error> {
    query!(
        r#"
        UPDATE banners
        SET group_id = ?, sequence = ?, title = ?, link_url = ?, link_target = ?,
            is_published = ?, published_at = ?, unpublished_at = ?, updated_at = ?
        WHERE id = ?
        "#,
        banner.group_id,
        banner.sequence,
        banner.title,
        banner.link_url,
        banner.link_target.as_i32(),
        banner.is_published,
        banner.published_at,
        banner.unpublished_at,
        Utc::now(),
        id
    )
    .execute(conn)
    .await
    .map(|result| result.rows_affected())
}

async fn update_published(
    conn: &mut SqliteConnection,
    id: i64,
    is_published: bool,
) -> Result<u64, sqlx_core::Error> {
    query!(
        "UPDATE banners SET is_published = ?, updated_at = ? WHERE id = ?",
        is_published,
        Utc::now(),
        id
    )
    .execute(conn)
    .await
    .map(|result| result.rows_affected())
}

async fn published_in_slot(
    conn: &mut SqliteConnection,
    group_id: i64,
    sequence: i32,
    exclude_id: Option<i64>,
) -> Result<Vec<Banner>, sqlx_core::Error> {
    let sql = format!(
        r#"
        SELECT {BANNER_COLUMNS}
        FROM banners b
        WHERE b.group_id = ?1
          AND b.sequence = ?2
          AND b.is_published = 1
          AND (?3 IS NULL OR b.id <> ?3)
        ORDER BY b.id
        "#
    );
    query_as!(Banner, &sql, group_id, sequence, exclude_id)
        .fetch_all(conn)
        .await
}

async fn slot_conflicts(
    conn: &mut SqliteConnection,
    banner: &BannerWrite<'_>,
    exclude_id: Option<i64>,
) -> Result<Vec<i64>, sqlx_core::Error> {
    let existing = published_in_slot(conn, banner.group_id, banner.sequence, exclude_id).await?;
    let window = PublishWindow::from_stored(banner.published_at, banner.unpublished_at);
    Ok(find_conflicts(
        &window,
        existing.iter().map(|existing| (existing.id, existing.window())),
    ))
}
