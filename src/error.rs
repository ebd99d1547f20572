//! Error type shared by the scheduling core and the storage layer.

use thiserror::Error;

use crate::models::CardId;

#[derive(Error, Debug)]
pub enum FlashnoteError {
    #[error("Rating {0} is outside the accepted 0-5 scale")]
    InvalidRating(i64),

    #[error("Unknown rating label: {0}")]
    InvalidRatingLabel(String),

    /// Missing or owned by someone else. The two cases are never distinguished.
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("Card {card_id} was reviewed concurrently, retry the rating")]
    Conflict { card_id: CardId },

    #[error("Database connection is unavailable after a panic")]
    LockPoisoned,

    #[error("Quiz API error: {0}")]
    QuizApi(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, FlashnoteError>;
