//! Deck is a titled set of flashcards owned by one user
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DeckId, UserId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deck {
    pub id: DeckId,
    pub owner_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Deck row as listed for its owner, with the number of cards it holds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckSummary {
    #[serde(flatten)]
    pub deck: Deck,
    pub cards_count: usize,
}
