use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub(crate) struct RecordVisitRequest {
    pub(crate) path: String,
    pub(crate) referrer: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct RecordVisitResponse {
    pub(crate) recorded: bool,
}

#[derive(Deserialize)]
pub(crate) struct SummaryQuery {
    pub(crate) from: Option<DateTime<Utc>>,
    pub(crate) to: Option<DateTime<Utc>>,
}
