//! Dashboard summary pushed to the parent app.
use chrono::{DateTime, NaiveTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use super::db::timestamp;
use super::{reviews, sessions};
use crate::error::Result;
use crate::models::{APP_ID, DashboardSummary, UserId};

fn count(conn: &Connection, sql: &str, user: &UserId) -> Result<u64> {
    let total: i64 = conn.query_row(sql, params![user.as_str()], |row| row.get(0))?;
    Ok(total.max(0) as u64)
}

/// Builds the summary as of `now`. "Today" starts at midnight UTC.
pub fn build(conn: &Connection, user: &UserId, now: DateTime<Utc>) -> Result<DashboardSummary> {
    let today_start = now.date_naive().and_time(NaiveTime::MIN).and_utc();

    let last_imported_from_quiz_at = conn
        .query_row(
            "SELECT created_at FROM cards
             WHERE user_id = ?1 AND source_type = 'quiz'
             ORDER BY created_at DESC, id DESC
             LIMIT 1",
            params![user.as_str()],
            |row| timestamp(row, 0),
        )
        .optional()?;

    Ok(DashboardSummary {
        app_id: APP_ID.to_string(),
        version: 1,
        updated_at: now,
        decks_count: count(conn, "SELECT COUNT(*) FROM decks WHERE owner_id = ?1", user)?,
        cards_count: count(conn, "SELECT COUNT(*) FROM cards WHERE user_id = ?1", user)?,
        reviews_today: reviews::count_since(conn, user, today_start)?,
        last_study_at: sessions::last_study_at(conn, user)?,
        last_imported_from_quiz_at,
    })
}
