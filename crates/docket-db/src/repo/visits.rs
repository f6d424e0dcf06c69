use serde::Serialize;

use super::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub day: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedCount {
    pub name: String,
    pub count: i64,
}

pub struct VisitRepo<'a> {
    pool: &'a SqlitePool,
}

impl<'a> VisitRepo<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        path: &str,
        referrer: Option<&str>,
        user_agent: Option<&str>,
        ip: Option<&str>,
        visited_at: DateTime<Utc>,
    ) -> Result<i64, sqlx_core::Error> {
        query!(
            "INSERT INTO visits (path, referrer, user_agent, ip, visited_at) VALUES (?, ?, ?, ?, ?)",
            path,
            referrer,
            user_agent,
            ip,
            visited_at
        )
        .execute(self.pool)
        .await
        .map(|result| result.last_insert_rowid())
    }

    pub async fn list_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Visit>, sqlx_core::Error> {
        query_as!(
            Visit,
            r#"
            SELECT id, path, referrer, user_agent, ip, visited_at
            FROM visits
            WHERE visited_at >= ? AND visited_at < ?
            ORDER BY visited_at DESC
            LIMIT ?
            "#,
            from,
            to,
            limit
        )
        .fetch_all(self.pool)
        .await
    }

    pub async fn count_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<i64, sqlx_core::Error> {
        query_scalar!(
            i64,
            "SELECT COUNT(*) FROM visits WHERE visited_at >= ? AND visited_at < ?",
            from,
            to
        )
        .fetch_one(self.pool)
        .await
    }

    /// Distinct IPs; rows without an IP are not counted.
    pub async fn unique_visitors(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<i64, sqlx_core::Error> {
        query_scalar!(
            i64,
            "SELECT COUNT(DISTINCT ip) FROM visits WHERE visited_at >= ? AND visited_at < ?",
            from,
            to
        )
        .fetch_one(self.pool)
        .await
    }

    /// Days are UTC calendar days (`YYYY-MM-DD`).
    pub async fn daily_counts(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<DailyCount>, sqlx_core::Error> {
        let rows = query!(
            r#"
            SELECT substr(visited_at, 1, 10) AS day, COUNT(*) AS count
            FROM visits
            WHERE visited_at >= ? AND visited_at < ?
            GROUP BY day
            ORDER BY day
            "#,
            from,
            to
        )
        .fetch_all(self.pool)
        .await?;
        rows.iter()
            .map(|row| {
                Ok(DailyCount {
                    day: row.try_get("day")?,
                    count: row.try_get("count")?,
                })
            })
            .collect()
    }

    pub async fn top_paths(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<NamedCount>, sqlx_core::Error> {
        self.top_by("path", from, to, limit).await
    }

    pub async fn top_referrers(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<NamedCount>, sqlx_core::Error> {
        self.top_by("referrer", from, to, limit).await
    }

    async fn top_by(
        &self,
        column: &'static str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<NamedCount>, sqlx_core::Error> {
        let sql = format!(
            r#"
            SELECT {column} AS name, COUNT(*) AS count
            FROM visits
            WHERE visited_at >= ? AND visited_at < ?
              AND {column} IS NOT NULL AND {column} <> ''
            GROUP BY {column}
            ORDER BY count DESC, name
            LIMIT ?
            "#
        );
        let rows = query!(&sql, from, to, limit).fetch_all(self.pool).await?;
        rows.iter()
            .map(|row| {
                Ok(NamedCount {
                    name: row.try_get("name")?,
                    count: row.try_get("count")?,
                })
            })
            .collect()
    }
}
