//! JSON import/export module for flashcard decks.
//! Saves a deck's cards to a file and loads such a file back as a new deck.
//! Review history is not part of the file.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::database::decks;
use crate::error::Result;
use crate::models::{CardContent, Deck, DeckId, UserId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckExport {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cards: Vec<CardContent>,
}

/// Collects a deck of the user with its active cards, in the order they
/// were added.
pub fn export_deck(conn: &Connection, user: &UserId, deck_id: DeckId) -> Result<DeckExport> {
    let deck = decks::get_deck(conn, user, deck_id)?;
    let cards = decks::list_cards(conn, user, deck_id, false)?;
    Ok(DeckExport {
        title: deck.title,
        description: deck.description,
        cards: cards.iter().map(CardContent::from).collect(),
    })
}

/// Exports a deck to a JSON file at the specified path.
pub fn export_json_to_path(export: &DeckExport, path: &Path) -> Result<()> {
    let json_string = serde_json::to_string_pretty(export)?;
    fs::write(path, json_string)?;
    log::info!("Deck '{}' exported to {}", export.title, path.display());
    Ok(())
}

/// Reads a deck file written by [`export_json_to_path`].
pub fn import_json(path: &Path) -> Result<DeckExport> {
    let contents = fs::read_to_string(path)?;
    let export: DeckExport = serde_json::from_str(&contents)?;
    log::info!("Deck '{}' read from {}", export.title, path.display());
    Ok(export)
}

/// Creates a new deck for the user from an imported file. Nothing is stored
/// if any card is rejected.
pub fn import_into(
    conn: &mut Connection,
    user: &UserId,
    export: &DeckExport,
    now: DateTime<Utc>,
) -> Result<Deck> {
    let tx = conn.transaction()?;
    let deck = decks::create_deck(&tx, user, &export.title, export.description.as_deref(), now)?;
    for card in &export.cards {
        decks::create_card(&tx, user, deck.id, card, now)?;
    }
    tx.commit()?;
    Ok(deck)
}
