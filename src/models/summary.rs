//! Per-user dashboard numbers pushed to the parent app with every activity.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const APP_ID: &str = "flashnote";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub app_id: String,
    pub version: u32,
    pub updated_at: DateTime<Utc>,
    pub decks_count: u64,
    pub cards_count: u64,
    pub reviews_today: u64,
    pub last_study_at: Option<DateTime<Utc>>,
    pub last_imported_from_quiz_at: Option<DateTime<Utc>>,
}
