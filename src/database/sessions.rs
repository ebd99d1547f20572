//! Study session log.
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::db::{optional_timestamp, timestamp, to_millis, user_id};
use super::decks::get_deck;
use crate::error::{FlashnoteError, Result};
use crate::models::{DeckId, SessionId, StudySession, UserId};

const SESSION_COLUMNS: &str = "id, user_id, deck_id, started_at, completed_at, \
                               total_cards_seen, correct_count, wrong_count";

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<StudySession> {
    Ok(StudySession {
        id: SessionId(row.get(0)?),
        user_id: user_id(row, 1)?,
        deck_id: DeckId(row.get(2)?),
        started_at: timestamp(row, 3)?,
        completed_at: optional_timestamp(row, 4)?,
        total_cards_seen: row.get(5)?,
        correct_count: row.get(6)?,
        wrong_count: row.get(7)?,
    })
}

/// Opens a new session over one of the user's decks.
pub fn start(
    conn: &Connection,
    user: &UserId,
    deck_id: DeckId,
    now: DateTime<Utc>,
) -> Result<StudySession> {
    get_deck(conn, user, deck_id)?;
    conn.execute(
        "INSERT INTO study_sessions (user_id, deck_id, started_at) VALUES (?1, ?2, ?3)",
        params![user.as_str(), deck_id.0, to_millis(now)],
    )?;
    let id = SessionId(conn.last_insert_rowid());
    log::debug!("Study session {} started on deck {}", id, deck_id);
    get(conn, user, id)
}

pub fn get(conn: &Connection, user: &UserId, session_id: SessionId) -> Result<StudySession> {
    conn.query_row(
        &format!("SELECT {SESSION_COLUMNS} FROM study_sessions WHERE id = ?1 AND user_id = ?2"),
        params![session_id.0, user.as_str()],
        session_from_row,
    )
    .optional()?
    .ok_or(FlashnoteError::NotFound("Study session"))
}

/// Stamps the completion time. Completing twice keeps the latest time.
pub fn complete(
    conn: &Connection,
    user: &UserId,
    session_id: SessionId,
    now: DateTime<Utc>,
) -> Result<StudySession> {
    get(conn, user, session_id)?;
    conn.execute(
        "UPDATE study_sessions SET completed_at = ?1 WHERE id = ?2 AND user_id = ?3",
        params![to_millis(now), session_id.0, user.as_str()],
    )?;
    get(conn, user, session_id)
}

/// Counts one rated card against the session.
pub fn record_outcome(
    conn: &Connection,
    user: &UserId,
    session_id: SessionId,
    remembered: bool,
) -> Result<()> {
    let (correct, wrong) = if remembered { (1, 0) } else { (0, 1) };
    let changed = conn.execute(
        "UPDATE study_sessions
         SET total_cards_seen = total_cards_seen + 1,
             correct_count = correct_count + ?1,
             wrong_count = wrong_count + ?2
         WHERE id = ?3 AND user_id = ?4",
        params![correct, wrong, session_id.0, user.as_str()],
    )?;
    if changed == 0 {
        return Err(FlashnoteError::NotFound("Study session"));
    }
    Ok(())
}

/// Start or completion time of the user's most recent session.
pub fn last_study_at(conn: &Connection, user: &UserId) -> Result<Option<DateTime<Utc>>> {
    let row = conn
        .query_row(
            "SELECT completed_at, started_at FROM study_sessions
             WHERE user_id = ?1
             ORDER BY completed_at DESC, started_at DESC, id DESC
             LIMIT 1",
            params![user.as_str()],
            |row| Ok((optional_timestamp(row, 0)?, timestamp(row, 1)?)),
        )
        .optional()?;
    Ok(row.map(|(completed, started)| completed.unwrap_or(started)))
}
