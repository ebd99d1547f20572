pub mod db;
pub mod decks;
pub mod reviews;
pub mod sessions;
pub mod summary;
