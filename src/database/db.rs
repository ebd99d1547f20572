//! Database setup for the flashcard application
//!
//! Handles SQLite connection setup, schema creation and the simulated study
//! clock. Timestamps are stored as Unix milliseconds in INTEGER columns.

use chrono::{DateTime, Days, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::error::{FlashnoteError, Result};
use crate::models::UserId;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS decks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner_id TEXT NOT NULL,
        title TEXT NOT NULL,
        description TEXT,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS cards (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        deck_id INTEGER NOT NULL REFERENCES decks(id) ON DELETE CASCADE,
        user_id TEXT NOT NULL,
        front TEXT NOT NULL,
        back TEXT NOT NULL,
        source_type TEXT NOT NULL DEFAULT 'manual',
        source_ref_id TEXT,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS study_sessions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL,
        deck_id INTEGER NOT NULL REFERENCES decks(id) ON DELETE CASCADE,
        started_at INTEGER NOT NULL,
        completed_at INTEGER,
        total_cards_seen INTEGER NOT NULL DEFAULT 0,
        correct_count INTEGER NOT NULL DEFAULT 0,
        wrong_count INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS reviews (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL,
        deck_id INTEGER NOT NULL REFERENCES decks(id) ON DELETE CASCADE,
        card_id INTEGER NOT NULL REFERENCES cards(id) ON DELETE CASCADE,
        session_id INTEGER REFERENCES study_sessions(id),
        quality INTEGER NOT NULL CHECK (quality BETWEEN 0 AND 5),
        reviewed_at INTEGER NOT NULL,
        due_at INTEGER NOT NULL,
        interval_days INTEGER NOT NULL CHECK (interval_days >= 1),
        ease_factor REAL NOT NULL CHECK (ease_factor >= 1.3)
    );

    CREATE INDEX IF NOT EXISTS idx_reviews_latest
        ON reviews (user_id, card_id, reviewed_at DESC, id DESC);

    CREATE INDEX IF NOT EXISTS idx_cards_deck ON cards (deck_id, user_id);

    CREATE TRIGGER IF NOT EXISTS reviews_append_only
        BEFORE UPDATE ON reviews
    BEGIN
        SELECT RAISE(ABORT, 'review events are append-only');
    END;

    CREATE TABLE IF NOT EXISTS app_state (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
";

/// Opens (or creates) the database file and makes sure the schema exists.
pub fn open(path: impl AsRef<Path>) -> Result<Connection> {
    let conn = Connection::open(path.as_ref())?;
    init_database(&conn)?;
    log::info!("Opened database at {}", path.as_ref().display());
    Ok(conn)
}

/// Fresh private database, used by tests and previews.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    init_database(&conn)?;
    Ok(conn)
}

/// Locks a shared connection.
pub fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
    conn.lock().map_err(|_| FlashnoteError::LockPoisoned)
}

/// Creates tables for decks, cards, study sessions, review events and app
/// state. Sets the study clock to now if it was never initialized.
pub fn init_database(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", true)?;
    conn.execute_batch(SCHEMA)?;
    ensure_column(conn, "cards", "is_active", "INTEGER NOT NULL DEFAULT 1")?;

    conn.execute(
        "INSERT OR IGNORE INTO app_state (key, value) VALUES ('current_date', ?1)",
        params![to_millis(Utc::now()).to_string()],
    )?;

    Ok(())
}

/// Adds a column that databases created by older builds lack.
fn ensure_column(conn: &Connection, table: &str, column: &str, definition: &str) -> Result<()> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let exists = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?
        .iter()
        .any(|name| name == column);
    if !exists {
        conn.execute_batch(&format!("ALTER TABLE {table} ADD COLUMN {column} {definition}"))?;
        log::info!("Added column {}.{}", table, column);
    }
    Ok(())
}

/// Retrieves the simulated "today" of the study clock.
pub fn get_current_date(conn: &Connection) -> Result<DateTime<Utc>> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM app_state WHERE key = 'current_date'",
            [],
            |row| row.get(0),
        )
        .optional()?;

    let Some(value) = value else {
        return Ok(Utc::now());
    };
    value
        .parse::<i64>()
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .ok_or_else(|| FlashnoteError::Validation(format!("Corrupt study clock value: {value}")))
}

pub fn set_current_date(conn: &Connection, at: DateTime<Utc>) -> Result<()> {
    conn.execute(
        "INSERT INTO app_state (key, value) VALUES ('current_date', ?1)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![to_millis(at).to_string()],
    )?;
    Ok(())
}

/// Advances the study clock by one calendar day
pub fn advance_day(conn: &Connection) -> Result<DateTime<Utc>> {
    let current = get_current_date(conn)?;
    let next_day = current
        .checked_add_days(Days::new(1))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    set_current_date(conn, next_day)?;
    log::debug!("Study clock advanced to {}", next_day);
    Ok(next_day)
}

pub(crate) fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

/// Reads a millisecond timestamp column.
pub(crate) fn timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let millis: i64 = row.get(idx)?;
    DateTime::from_timestamp_millis(millis).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, millis))
}

pub(crate) fn optional_timestamp(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let millis: Option<i64> = row.get(idx)?;
    millis
        .map(|m| {
            DateTime::from_timestamp_millis(m).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, m))
        })
        .transpose()
}

pub(crate) fn user_id(row: &Row<'_>, idx: usize) -> rusqlite::Result<UserId> {
    let raw: String = row.get(idx)?;
    UserId::new(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
