//! Wrapper for flashcards that tracks progress within one sitting.
use super::{Flashcard, Rating};

#[derive(Clone, Debug)]
pub struct LearningCard {
    pub flashcard: Flashcard,
    pub is_learned: bool,
    pub last_rating: Option<Rating>,
    pub attempts: u32,
}

impl LearningCard {
    pub fn new(flashcard: Flashcard) -> Self {
        Self {
            flashcard,
            is_learned: false,
            last_rating: None,
            attempts: 0,
        }
    }

    /// Records a rating. Only a passing rating counts as learned.
    pub fn record(&mut self, rating: Rating) {
        self.is_learned = rating.quality().is_passing();
        self.last_rating = Some(rating);
        self.attempts += 1;
    }
}
