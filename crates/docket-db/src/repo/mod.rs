macro_rules! query {
    ($sql:expr $(, $arg:expr)* $(,)?) => {{
        #[allow(unused_mut)]
        let mut q = sqlx_core::query::query::<sqlx_sqlite::Sqlite>($sql);
        $(q = q.bind($arg);)*
        q
    }};
}

macro_rules! query_as {
    ($ty:ty, $sql:expr $(, $arg:expr)* $(,)?) => {{
        #[allow(unused_mut)]
        let mut q = sqlx_core::query_as::query_as::<sqlx_sqlite::Sqlite, $ty>($sql);
        $(q = q.bind($arg);)*
        q
    }};
}

macro_rules! query_scalar {
    ($ty:ty, $sql:expr $(, $arg:expr)* $(,)?) => {{
        #[allow(unused_mut)]
        let mut q = sqlx_core::query_scalar::query_scalar::<sqlx_sqlite::Sqlite, $ty>($sql);
        $(q = q.bind($arg);)*
        q
    }};
}

pub(crate) mod prelude {
    pub(crate) use crate::{begin_write, SqlitePool};
    pub(crate) use chrono::{DateTime, Utc};
    pub(crate) use docket_core::{
        find_conflicts, Banner, BannerGroup, BannerKind, Content, ContentFile, ContentGroup,
        ContentStatus, Employee, EmployeeStatus, LinkTarget, PermissionRow, PublishWindow,
        SiteSettings, Visit,
    };
    pub(crate) use sqlx_core::row::Row;
    pub(crate) use sqlx_sqlite::SqliteConnection;
}

/// Clamps paging input the same way for every list endpoint.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub const DEFAULT_LIMIT: i64 = 20;
    pub const MAX_LIMIT: i64 = 100;

    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        Self {
            limit: limit.unwrap_or(Self::DEFAULT_LIMIT).clamp(1, Self::MAX_LIMIT),
            offset: offset.unwrap_or(0).max(0),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Escapes `%`, `_` and the escape char itself for `LIKE ... ESCAPE '\'`.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

mod banners;
mod contents;
mod employees;
mod settings;
mod visits;

pub use banners::{BannerGroupRepo, BannerRepo, BannerWrite, NewBannerGroup, SlotWrite};
pub use contents::{
    ContentFileRepo, ContentFilter, ContentGroupRepo, ContentGroupWrite, ContentRepo, ContentUpdate,
    NewContent, NewContentFile,
};
pub use employees::{EmployeeProfile, EmployeeRepo, NewEmployee, PermissionRepo};
pub use settings::SiteSettingsRepo;
pub use visits::{DailyCount, NamedCount, VisitRepo};
