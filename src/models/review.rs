//! Review history records.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CardId, DeckId, Quality, ReviewId, SessionId, UserId};

/// Schedule produced by the scheduler for one rating.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewState {
    pub interval_days: u32,
    pub ease_factor: f64,
    pub due_at: DateTime<Utc>,
    pub reviewed_at: DateTime<Utc>,
}

impl ReviewState {
    pub fn prior(&self) -> PriorSchedule {
        PriorSchedule {
            interval_days: self.interval_days,
            ease_factor: self.ease_factor,
        }
    }

    pub fn is_due(&self, at: DateTime<Utc>) -> bool {
        self.due_at <= at
    }
}

/// The part of a previous review the scheduler builds on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PriorSchedule {
    pub interval_days: u32,
    pub ease_factor: f64,
}

/// A persisted rating. Never updated after insert.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEvent {
    pub id: ReviewId,
    pub user_id: UserId,
    pub card_id: CardId,
    pub deck_id: DeckId,
    pub session_id: Option<SessionId>,
    pub quality: Quality,
    #[serde(flatten)]
    pub state: ReviewState,
}

/// Input to `reviews::append`.
#[derive(Clone, Debug, PartialEq)]
pub struct NewReviewEvent {
    pub card_id: CardId,
    pub deck_id: DeckId,
    pub session_id: Option<SessionId>,
    pub quality: Quality,
    pub state: ReviewState,
    pub guard: PriorGuard,
}

/// Optimistic concurrency check applied by `reviews::append`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PriorGuard {
    /// Append regardless of what is currently latest.
    #[default]
    Unchecked,
    /// Append only if the card's latest event is still this one
    /// (`None`: the card must still have no reviews).
    Latest(Option<ReviewId>),
}

/// Latest state of a card together with the event it came from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LatestReview {
    pub id: ReviewId,
    pub state: ReviewState,
}

/// Optional filters for listing review events. Unset fields match everything.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReviewFilter {
    pub deck_id: Option<DeckId>,
    pub card_id: Option<CardId>,
    pub session_id: Option<SessionId>,
}
