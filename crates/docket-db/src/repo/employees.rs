use super::prelude::*;
use super::{like_pattern, Page};

const EMPLOYEE_COLUMNS: &str = r#"
    id,
    login_id,
    name,
    email,
    phone,
    position,
    password_hash,
    status,
    last_login_at,
    created_at,
    updated_at
"#;

pub struct NewEmployee<'a> {
    pub login_id: &'a str,
    pub name: &'a str,
    pub email: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub position: Option<&'a str>,
    pub password_hash: &'a str,
    pub status: EmployeeStatus,
    pub created_at: DateTime<Utc>,
}

pub struct EmployeeProfile<'a> {
    pub name: &'a str,
    pub email: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub position: Option<&'a str>,
    pub status: EmployeeStatus,
}

pub struct EmployeeRepo<'a> {
    pool: &'a SqlitePool,
}

impl<'a> EmployeeRepo<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, employee: &NewEmployee<'_>) -> Result<i64, sqlx_core::Error> {
        query!(
            r#"
            INSERT INTO employees (
                login_id, name, email, phone, position, password_hash, status, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            employee.login_id,
            employee.name,
            employee.email,
            employee.phone,
            employee.position,
            employee.password_hash,
            employee.status.as_i32(),
            employee.created_at,
            employee.created_at
        )
        .execute(self.pool)
        .await
        .map(|result| result.last_insert_rowid())
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Employee>, sqlx_core::Error> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?");
        query_as!(Employee, &sql, id)
            .fetch_optional(self.pool)
            .await
    }

    pub async fn get_by_login_id(&self, login_id: &str) -> Result<Option<Employee>, sqlx_core::Error> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE login_id = ?");
        query_as!(Employee, &sql, login_id)
            .fetch_optional(self.pool)
            .await
    }

    pub async fn list(
        &self,
        search: Option<&str>,
        page: Page,
    ) -> Result<(Vec<Employee>, i64), sqlx_core::Error> {
        let pattern = search.map(like_pattern);
        let where_clause = if pattern.is_some() {
            "WHERE login_id LIKE ?1 ESCAPE '\\' OR name LIKE ?1 ESCAPE '\\'"
        } else {
            ""
        };
        let sql = format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees {where_clause} ORDER BY id DESC LIMIT ?2 OFFSET ?3"
        );
        let count_sql = format!("SELECT COUNT(*) FROM employees {where_clause}");
        let rows = query_as!(Employee, &sql, pattern.as_deref(), page.limit, page.offset)
            .fetch_all(self.pool)
            .await?;
        let total = query_scalar!(i64, &count_sql, pattern.as_deref())
            .fetch_one(self.pool)
            .await?;
        Ok((rows, total))
    }

    pub async fn update_profile(
        &self,
        id: i64,
        profile: &EmployeeProfile<'_>,
    ) -> Result<u64, sqlx_core::Error> {
        query!(
            r#"
            UPDATE employees
            SET name = ?, email = ?, phone = ?, position = ?, status = ?, updated_at = ?
            WHERE id = ?
            "#,
            profile.name,
            profile.email,
            profile.phone,
            profile.position,
            profile.status.as_i32(),
            Utc::now(),
            id
        )
        .execute(self.pool)
        .await
        .map(|result| result.rows_affected())
    }

    pub async fn update_password(&self, id: i64, password_hash: &str) -> Result<u64, sqlx_core::Error> {
        query!(
            "UPDATE employees SET password_hash = ?, updated_at = ? WHERE id = ?",
            password_hash,
            Utc::now(),
            id
        )
        .execute(self.pool)
        .await
        .map(|result| result.rows_affected())
    }

    pub async fn update_last_login(
        &self,
        id: i64,
        last_login_at: DateTime<Utc>,
    ) -> Result<(), sqlx_core::Error> {
        query!(
            "UPDATE employees SET last_login_at = ? WHERE id = ?",
            last_login_at,
            id
        )
        .execute(self.pool)
        .await
        .map(|_| ())
    }

    pub async fn delete(&self, id: i64) -> Result<u64, sqlx_core::Error> {
        query!("DELETE FROM employees WHERE id = ?", id)
            .execute(self.pool)
            .await
            .map(|result| result.rows_affected())
    }

    pub async fn permissions(&self, id: i64) -> Result<Vec<i32>, sqlx_core::Error> {
        query_scalar!(
            i32,
            "SELECT permission_id FROM employee_permissions WHERE employee_id = ? ORDER BY permission_id",
            id
        )
        .fetch_all(self.pool)
        .await
    }

    /// Replaces the whole permission set atomically.
    pub async fn set_permissions(&self, id: i64, permission_ids: &[i32]) -> Result<(), sqlx_core::Error> {
        let mut tx = self.pool.begin().await?;
        query!("DELETE FROM employee_permissions WHERE employee_id = ?", id)
            .execute(&mut *tx)
            .await?;
        for permission_id in permission_ids {
            query!(
                "INSERT OR IGNORE INTO employee_permissions (employee_id, permission_id) VALUES (?, ?)",
                id,
                *permission_id
            )
            .execute(&mut *tx)
            .await?;
        }
        query!("UPDATE employees SET updated_at = ? WHERE id = ?", Utc::now(), id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await
    }

    /// Active employees holding `permission_id`.
    pub async fn count_active_with_permission(&self, permission_id: i32) -> Result<i64, sqlx_core::Error> {
        query_scalar!(
            i64,
            r#"
            SELECT COUNT(*)
            FROM employee_permissions ep
            JOIN employees e ON e.id = ep.employee_id
            WHERE ep.permission_id = ? AND e.status = ?
            "#,
            permission_id,
            EmployeeStatus::Active.as_i32()
        )
        .fetch_one(self.pool)
        .await
    }

    pub async fn count(&self) -> Result<i64, sqlx_core::Error> {
        query_scalar!(i64, "SELECT COUNT(*) FROM employees")
            .fetch_one(self.pool)
            .await
    }
}

pub struct PermissionRepo<'a> {
    pool: &'a SqlitePool,
}

impl<'a> PermissionRepo<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<PermissionRow>, sqlx_core::Error> {
        query_as!(
            PermissionRow,
            "SELECT id, name, description FROM permissions ORDER BY id"
        )
        .fetch_all(self.pool)
        .await
    }
}
