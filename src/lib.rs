pub mod config;
pub mod database;
pub mod error;
pub mod export;
pub mod import;
pub mod models;
pub mod notify;
pub mod study;

pub use config::Config;
pub use error::{FlashnoteError, Result};
pub use models::{Deck, Flashcard, LearningSession, Quality, Rating, ReviewEvent, UserId};
