//! Review history: an append-only log of ratings per (user, card).
//!
//! The current schedule of a card is the state stored with its latest event,
//! ordered by `reviewed_at` and then by id. "Due" is always derived from that
//! projection; nothing else stores a next-review date.

use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::db::{timestamp, to_millis, user_id};
use super::{decks, sessions};
use crate::error::{FlashnoteError, Result};
use crate::models::{
    CardId, DeckId, LatestReview, NewReviewEvent, PriorGuard, Quality, ReviewEvent, ReviewFilter,
    ReviewId, ReviewState, SessionId, UserId,
};

const LATEST_ID: &str = "SELECT l.id FROM reviews l
     WHERE l.user_id = ?1 AND l.card_id = ?2
     ORDER BY l.reviewed_at DESC, l.id DESC
     LIMIT 1";

const EVENT_COLUMNS: &str = "id, user_id, card_id, deck_id, session_id, quality, \
                             reviewed_at, due_at, interval_days, ease_factor";

fn state_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<ReviewState> {
    Ok(ReviewState {
        reviewed_at: timestamp(row, offset)?,
        due_at: timestamp(row, offset + 1)?,
        interval_days: row.get(offset + 2)?,
        ease_factor: row.get(offset + 3)?,
    })
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<ReviewEvent> {
    let quality: i64 = row.get(5)?;
    Ok(ReviewEvent {
        id: ReviewId(row.get(0)?),
        user_id: user_id(row, 1)?,
        card_id: CardId(row.get(2)?),
        deck_id: DeckId(row.get(3)?),
        session_id: row.get::<_, Option<i64>>(4)?.map(SessionId),
        quality: Quality::new(quality).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Integer, Box::new(e))
        })?,
        state: state_from_row(row, 6)?,
    })
}

/// Most recent schedule of a card for this user.
///
/// Returns `None` for a card that was never reviewed, and also for a card of
/// another user: the query is scoped by owner, so foreign history is invisible.
pub fn latest_state_for(
    conn: &Connection,
    user: &UserId,
    card_id: CardId,
) -> Result<Option<LatestReview>> {
    let latest = conn
        .query_row(
            "SELECT id, reviewed_at, due_at, interval_days, ease_factor FROM reviews
             WHERE user_id = ?1 AND card_id = ?2
             ORDER BY reviewed_at DESC, id DESC
             LIMIT 1",
            params![user.as_str(), card_id.0],
            |row| {
                Ok(LatestReview {
                    id: ReviewId(row.get(0)?),
                    state: state_from_row(row, 1)?,
                })
            },
        )
        .optional()?;
    Ok(latest)
}

/// Appends a review event after checking that the card, deck and optional
/// session all belong to the user and to each other.
pub fn append(conn: &Connection, user: &UserId, event: &NewReviewEvent) -> Result<ReviewEvent> {
    let card = decks::get_card(conn, user, event.card_id)?;
    decks::get_deck(conn, user, event.deck_id)?;
    if card.deck_id != event.deck_id {
        return Err(FlashnoteError::NotFound("Card"));
    }
    if let Some(session_id) = event.session_id {
        let session = sessions::get(conn, user, session_id)?;
        if session.deck_id != event.deck_id {
            return Err(FlashnoteError::NotFound("Study session"));
        }
    }

    // Timestamps are stored as milliseconds; return exactly what was stored.
    let state = ReviewState {
        reviewed_at: event.state.reviewed_at.trunc_subsecs(3),
        due_at: event.state.due_at.trunc_subsecs(3),
        ..event.state
    };
    let (checked, expected) = match event.guard {
        PriorGuard::Unchecked => (false, None),
        PriorGuard::Latest(expected) => (true, expected.map(|id| id.0)),
    };

    // Single statement, so the guard and the insert cannot interleave with
    // another writer.
    let inserted = conn.execute(
        &format!(
            "INSERT INTO reviews (user_id, card_id, deck_id, session_id, quality,
                                  reviewed_at, due_at, interval_days, ease_factor)
             SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9
             WHERE NOT ?10 OR ({LATEST_ID}) IS ?11"
        ),
        params![
            user.as_str(),
            event.card_id.0,
            event.deck_id.0,
            event.session_id.map(|s| s.0),
            event.quality.value(),
            to_millis(state.reviewed_at),
            to_millis(state.due_at),
            state.interval_days,
            state.ease_factor,
            checked,
            expected,
        ],
    )?;
    if inserted == 0 {
        log::warn!(
            "Review of card {} by {} lost a concurrent update",
            event.card_id,
            user
        );
        return Err(FlashnoteError::Conflict {
            card_id: event.card_id,
        });
    }

    let id = ReviewId(conn.last_insert_rowid());
    log::debug!(
        "Review {} appended: card {} quality {} interval {}d ease {:.2}",
        id,
        event.card_id,
        event.quality.value(),
        state.interval_days,
        state.ease_factor
    );

    Ok(ReviewEvent {
        id,
        user_id: user.clone(),
        card_id: event.card_id,
        deck_id: event.deck_id,
        session_id: event.session_id,
        quality: event.quality,
        state,
    })
}

/// Cards whose latest schedule is due at or before `at`, soonest due first.
pub fn due_before(conn: &Connection, user: &UserId, at: DateTime<Utc>) -> Result<Vec<CardId>> {
    let mut stmt = conn.prepare(
        "SELECT r.card_id FROM reviews r
         WHERE r.user_id = ?1
           AND r.id = (SELECT l.id FROM reviews l
                       WHERE l.user_id = r.user_id AND l.card_id = r.card_id
                       ORDER BY l.reviewed_at DESC, l.id DESC
                       LIMIT 1)
           AND r.due_at <= ?2
         ORDER BY r.due_at ASC, r.card_id ASC",
    )?;
    let cards = stmt
        .query_map(params![user.as_str(), to_millis(at)], |row| {
            Ok(CardId(row.get(0)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(cards)
}

/// Full review log of a card, newest first.
pub fn history_for(conn: &Connection, user: &UserId, card_id: CardId) -> Result<Vec<ReviewEvent>> {
    decks::get_card(conn, user, card_id)?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {EVENT_COLUMNS} FROM reviews
         WHERE user_id = ?1 AND card_id = ?2
         ORDER BY reviewed_at DESC, id DESC"
    ))?;
    let events = stmt
        .query_map(params![user.as_str(), card_id.0], event_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(events)
}

/// Review events of the user matching `filter`, newest first.
pub fn list_reviews(
    conn: &Connection,
    user: &UserId,
    filter: &ReviewFilter,
) -> Result<Vec<ReviewEvent>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {EVENT_COLUMNS} FROM reviews
         WHERE user_id = ?1
           AND (?2 IS NULL OR deck_id = ?2)
           AND (?3 IS NULL OR card_id = ?3)
           AND (?4 IS NULL OR session_id = ?4)
         ORDER BY reviewed_at DESC, id DESC"
    ))?;
    let events = stmt
        .query_map(
            params![
                user.as_str(),
                filter.deck_id.map(|d| d.0),
                filter.card_id.map(|c| c.0),
                filter.session_id.map(|s| s.0),
            ],
            event_from_row,
        )?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(events)
}

pub fn count_for_session(conn: &Connection, user: &UserId, session_id: SessionId) -> Result<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM reviews WHERE user_id = ?1 AND session_id = ?2",
        params![user.as_str(), session_id.0],
        |row| row.get(0),
    )?;
    Ok(count.max(0) as u64)
}

pub fn count_since(conn: &Connection, user: &UserId, since: DateTime<Utc>) -> Result<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM reviews WHERE user_id = ?1 AND reviewed_at >= ?2",
        params![user.as_str(), to_millis(since)],
        |row| row.get(0),
    )?;
    Ok(count.max(0) as u64)
}
