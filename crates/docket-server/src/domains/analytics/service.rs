//! Locally recorded page visits and the admin summary built from them.

use chrono::{DateTime, Duration, Utc};
use docket_core::validation;
use docket_core::{Identity, Permission, Visit};
use docket_db::repo::{DailyCount, NamedCount, VisitRepo};

use crate::app::AppState;
use crate::domains::access_control::require;
use crate::domains::errors::{db_error, ServiceError};
use crate::domains::site::service::load_settings;

const CRAWLER_MARKERS: [&str; 4] = ["bot", "crawler", "spider", "slurp"];
const DEFAULT_RANGE_DAYS: i64 = 30;
const MAX_RANGE_DAYS: i64 = 366;
const TOP_LIMIT: i64 = 10;
const RECENT_LIMIT: i64 = 50;

pub struct RecordVisitCommand {
    pub path: String,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub client_ip: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct VisitSummary {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub total_visits: i64,
    pub unique_visitors: i64,
    pub daily: Vec<DailyCount>,
    pub top_paths: Vec<NamedCount>,
    pub top_referrers: Vec<NamedCount>,
    pub recent: Vec<Visit>,
}

fn is_crawler(user_agent: &str) -> bool {
    let agent = user_agent.to_ascii_lowercase();
    CRAWLER_MARKERS.iter().any(|marker| agent.contains(marker))
}

/// Missing ends default to the last 30 days; longer ranges keep `to` and
/// move `from` forward to 366 days.
pub fn resolve_range(
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<(DateTime<Utc>, DateTime<Utc>), ServiceError> {
    let to = to.unwrap_or(now);
    let from = from.unwrap_or(to - Duration::days(DEFAULT_RANGE_DAYS));
    if from >= to {
        return Err(ServiceError::BadRequest("invalid_range"));
    }
    let earliest = to - Duration::days(MAX_RANGE_DAYS);
    Ok((from.max(earliest), to))
}

/// Returns whether the visit was stored; crawlers are dropped silently.
pub async fn record_visit(state: &AppState, cmd: RecordVisitCommand) -> Result<bool, ServiceError> {
    let path = validation::require_len("invalid_path", &cmd.path, 1, 500)?;
    if !path.starts_with('/') {
        return Err(ServiceError::BadRequest("invalid_path"));
    }
    let referrer = validation::optional_len("invalid_referrer", cmd.referrer.as_deref(), 1000)?;

    if let Some(agent) = cmd.user_agent.as_deref() {
        let configured_bot = match load_settings(state).await {
            Ok(settings) => settings.is_bot(agent),
            Err(_) => false,
        };
        if configured_bot || is_crawler(agent) {
            tracing::debug!(event = "visit_skipped", reason = "bot");
            return Ok(false);
        }
    }

    VisitRepo::new(&state.db)
        .create(
            &path,
            referrer.as_deref(),
            cmd.user_agent.as_deref(),
            cmd.client_ip.as_deref(),
            Utc::now(),
        )
        .await
        .map_err(|err| db_error("visit_create", err))?;
    Ok(true)
}

pub async fn summary(
    state: &AppState,
    identity: &Identity,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Result<VisitSummary, ServiceError> {
    require(identity, Permission::Analytics, "summary")?;
    let (from, to) = resolve_range(from, to, Utc::now())?;
    let repo = VisitRepo::new(&state.db);
    let total_visits = repo
        .count_between(from, to)
        .await
        .map_err(|err| db_error("visit_count", err))?;
    let unique_visitors = repo
        .unique_visitors(from, to)
        .await
        .map_err(|err| db_error("visit_unique", err))?;
    let daily = repo
        .daily_counts(from, to)
        .await
        .map_err(|err| db_error("visit_daily", err))?;
    let top_paths = repo
        .top_paths(from, to, TOP_LIMIT)
        .await
        .map_err(|err| db_error("visit_top_paths", err))?;
    let top_referrers = repo
        .top_referrers(from, to, TOP_LIMIT)
        .await
        .map_err(|err| db_error("visit_top_referrers", err))?;
    let recent = repo
        .list_between(from, to, RECENT_LIMIT)
        .await
        .map_err(|err| db_error("visit_recent", err))?;
    Ok(VisitSummary {
        from,
        to,
        total_visits,
        unique_visitors,
        daily,
        top_paths,
        top_referrers,
        recent,
    })
}
