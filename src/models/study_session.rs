//! A study session groups the ratings of one sitting over a deck.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DeckId, SessionId, UserId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySession {
    pub id: SessionId,
    pub user_id: UserId,
    pub deck_id: DeckId,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub total_cards_seen: u32,
    pub correct_count: u32,
    pub wrong_count: u32,
}

impl StudySession {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}
