//! Owner-scoped deck and card storage.
//!
//! Every query filters on the acting user. A deck or card owned by someone
//! else is reported as `NotFound`, exactly like one that does not exist.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::collections::HashSet;

use super::db::{timestamp, to_millis, user_id};
use crate::error::{FlashnoteError, Result};
use crate::models::{
    CardContent, CardId, Deck, DeckId, DeckSummary, Flashcard, SourceType, UserId,
};

const DECK_COLUMNS: &str = "id, owner_id, title, description, is_active, created_at, updated_at";
const CARD_COLUMNS: &str =
    "id, deck_id, user_id, front, back, source_type, source_ref_id, is_active, created_at, updated_at";

fn normalize_text(value: &str) -> String {
    value.trim().to_string()
}

fn normalize_optional(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

fn require_title(title: &str) -> Result<String> {
    let title = normalize_text(title);
    if title.is_empty() {
        return Err(FlashnoteError::Validation("Title is required.".to_string()));
    }
    Ok(title)
}

fn require_sides(front: &str, back: &str) -> Result<(String, String)> {
    let (front, back) = (normalize_text(front), normalize_text(back));
    if front.is_empty() || back.is_empty() {
        return Err(FlashnoteError::Validation(
            "Both front and back text are required.".to_string(),
        ));
    }
    Ok((front, back))
}

fn deck_from_row(row: &Row<'_>) -> rusqlite::Result<Deck> {
    Ok(Deck {
        id: DeckId(row.get(0)?),
        owner_id: user_id(row, 1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        is_active: row.get(4)?,
        created_at: timestamp(row, 5)?,
        updated_at: timestamp(row, 6)?,
    })
}

fn card_from_row(row: &Row<'_>) -> rusqlite::Result<Flashcard> {
    let source_type: String = row.get(5)?;
    Ok(Flashcard {
        id: CardId(row.get(0)?),
        deck_id: DeckId(row.get(1)?),
        user_id: user_id(row, 2)?,
        front: row.get(3)?,
        back: row.get(4)?,
        source_type: SourceType::parse(&source_type),
        source_ref_id: row.get(6)?,
        is_active: row.get(7)?,
        created_at: timestamp(row, 8)?,
        updated_at: timestamp(row, 9)?,
    })
}

// ==================== Deck Operations ====================

pub fn create_deck(
    conn: &Connection,
    user: &UserId,
    title: &str,
    description: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Deck> {
    let title = require_title(title)?;
    let description = normalize_optional(description);

    conn.execute(
        "INSERT INTO decks (owner_id, title, description, is_active, created_at, updated_at)
         VALUES (?1, ?2, ?3, 1, ?4, ?4)",
        params![user.as_str(), title, description, to_millis(now)],
    )?;
    let id = DeckId(conn.last_insert_rowid());
    log::info!("Deck '{}' ({}) created for {}", title, id, user);

    get_deck(conn, user, id)
}

pub fn get_deck(conn: &Connection, user: &UserId, deck_id: DeckId) -> Result<Deck> {
    conn.query_row(
        &format!("SELECT {DECK_COLUMNS} FROM decks WHERE id = ?1 AND owner_id = ?2"),
        params![deck_id.0, user.as_str()],
        deck_from_row,
    )
    .optional()?
    .ok_or(FlashnoteError::NotFound("Deck"))
}

/// Lists the user's decks, most recently updated first, with their active
/// card counts. Archived decks are listed only with `include_inactive`.
pub fn list_decks(
    conn: &Connection,
    user: &UserId,
    include_inactive: bool,
) -> Result<Vec<DeckSummary>> {
    let mut stmt = conn.prepare(
        "SELECT d.id, d.owner_id, d.title, d.description, d.is_active, d.created_at, d.updated_at,
                (SELECT COUNT(*) FROM cards c
                 WHERE c.deck_id = d.id AND c.user_id = d.owner_id AND c.is_active = 1)
         FROM decks d
         WHERE d.owner_id = ?1 AND (?2 OR d.is_active = 1)
         ORDER BY d.updated_at DESC, d.created_at DESC, d.id DESC",
    )?;

    let decks = stmt
        .query_map(params![user.as_str(), include_inactive], |row| {
            let count: i64 = row.get(7)?;
            Ok(DeckSummary {
                deck: deck_from_row(row)?,
                cards_count: count.max(0) as usize,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(decks)
}

pub fn update_deck(
    conn: &Connection,
    user: &UserId,
    deck_id: DeckId,
    title: &str,
    description: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Deck> {
    get_deck(conn, user, deck_id)?;
    let title = require_title(title)?;

    conn.execute(
        "UPDATE decks SET title = ?1, description = ?2, updated_at = ?3
         WHERE id = ?4 AND owner_id = ?5",
        params![
            title,
            normalize_optional(description),
            to_millis(now),
            deck_id.0,
            user.as_str()
        ],
    )?;

    get_deck(conn, user, deck_id)
}

/// Hides a deck from listings and study. Cards and history are kept.
pub fn archive_deck(
    conn: &Connection,
    user: &UserId,
    deck_id: DeckId,
    now: DateTime<Utc>,
) -> Result<Deck> {
    let changed = conn.execute(
        "UPDATE decks SET is_active = 0, updated_at = ?1 WHERE id = ?2 AND owner_id = ?3",
        params![to_millis(now), deck_id.0, user.as_str()],
    )?;
    if changed == 0 {
        return Err(FlashnoteError::NotFound("Deck"));
    }
    log::info!("Deck {} archived for {}", deck_id, user);
    get_deck(conn, user, deck_id)
}

/// Deletes a deck. Its cards, sessions and review history go with it.
pub fn delete_deck(conn: &Connection, user: &UserId, deck_id: DeckId) -> Result<()> {
    get_deck(conn, user, deck_id)?;
    conn.execute(
        "DELETE FROM decks WHERE id = ?1 AND owner_id = ?2",
        params![deck_id.0, user.as_str()],
    )?;
    log::info!("Deck {} deleted for {}", deck_id, user);
    Ok(())
}

pub(crate) fn touch_deck(
    conn: &Connection,
    user: &UserId,
    deck_id: DeckId,
    now: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "UPDATE decks SET updated_at = ?1 WHERE id = ?2 AND owner_id = ?3",
        params![to_millis(now), deck_id.0, user.as_str()],
    )?;
    Ok(())
}

// ==================== Card Operations ====================

/// Adds a card to one of the user's decks.
pub fn create_card(
    conn: &Connection,
    user: &UserId,
    deck_id: DeckId,
    content: &CardContent,
    now: DateTime<Utc>,
) -> Result<Flashcard> {
    get_deck(conn, user, deck_id)?;
    let (front, back) = require_sides(&content.front, &content.back)?;

    conn.execute(
        "INSERT INTO cards (deck_id, user_id, front, back, source_type, source_ref_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![
            deck_id.0,
            user.as_str(),
            front,
            back,
            content.source_type.as_str(),
            content.source_ref_id,
            to_millis(now)
        ],
    )?;
    let id = CardId(conn.last_insert_rowid());
    touch_deck(conn, user, deck_id, now)?;

    get_card(conn, user, id)
}

pub fn get_card(conn: &Connection, user: &UserId, card_id: CardId) -> Result<Flashcard> {
    conn.query_row(
        &format!("SELECT {CARD_COLUMNS} FROM cards WHERE id = ?1 AND user_id = ?2"),
        params![card_id.0, user.as_str()],
        card_from_row,
    )
    .optional()?
    .ok_or(FlashnoteError::NotFound("Card"))
}

/// Retrieves the cards of a deck in the order they were added. Archived
/// cards are included only with `include_inactive`.
pub fn list_cards(
    conn: &Connection,
    user: &UserId,
    deck_id: DeckId,
    include_inactive: bool,
) -> Result<Vec<Flashcard>> {
    get_deck(conn, user, deck_id)?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {CARD_COLUMNS} FROM cards
         WHERE deck_id = ?1 AND user_id = ?2 AND (?3 OR is_active = 1)
         ORDER BY id ASC"
    ))?;
    let cards = stmt
        .query_map(params![deck_id.0, user.as_str(), include_inactive], card_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(cards)
}

pub fn update_card(
    conn: &Connection,
    user: &UserId,
    card_id: CardId,
    front: &str,
    back: &str,
    now: DateTime<Utc>,
) -> Result<Flashcard> {
    let card = get_card(conn, user, card_id)?;
    let (front, back) = require_sides(front, back)?;

    conn.execute(
        "UPDATE cards SET front = ?1, back = ?2, updated_at = ?3 WHERE id = ?4 AND user_id = ?5",
        params![front, back, to_millis(now), card_id.0, user.as_str()],
    )?;
    touch_deck(conn, user, card.deck_id, now)?;

    get_card(conn, user, card_id)
}

/// Takes a card out of study without touching its review history.
pub fn archive_card(
    conn: &Connection,
    user: &UserId,
    card_id: CardId,
    now: DateTime<Utc>,
) -> Result<Flashcard> {
    let card = get_card(conn, user, card_id)?;
    conn.execute(
        "UPDATE cards SET is_active = 0, updated_at = ?1 WHERE id = ?2 AND user_id = ?3",
        params![to_millis(now), card_id.0, user.as_str()],
    )?;
    touch_deck(conn, user, card.deck_id, now)?;
    log::debug!("Card {} archived", card_id);
    get_card(conn, user, card_id)
}

/// Deletes a card together with its review history.
pub fn delete_card(
    conn: &Connection,
    user: &UserId,
    card_id: CardId,
    now: DateTime<Utc>,
) -> Result<()> {
    let card = get_card(conn, user, card_id)?;
    conn.execute(
        "DELETE FROM cards WHERE id = ?1 AND user_id = ?2",
        params![card_id.0, user.as_str()],
    )?;
    touch_deck(conn, user, card.deck_id, now)?;
    Ok(())
}

/// Quiz question ids already imported into a deck.
pub fn existing_source_refs(
    conn: &Connection,
    user: &UserId,
    deck_id: DeckId,
) -> Result<HashSet<String>> {
    let mut stmt = conn.prepare(
        "SELECT source_ref_id FROM cards
         WHERE deck_id = ?1 AND user_id = ?2 AND source_ref_id IS NOT NULL",
    )?;
    let refs = stmt
        .query_map(params![deck_id.0, user.as_str()], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<HashSet<_>>>()?;
    Ok(refs)
}
