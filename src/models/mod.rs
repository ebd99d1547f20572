pub mod deck;
pub mod flashcard;
pub mod ids;
pub mod learning_card;
pub mod learning_session;
pub mod rating;
pub mod review;
pub mod sm2;
pub mod study_session;
pub mod summary;

pub use deck::{Deck, DeckSummary};
pub use flashcard::{CardContent, Flashcard, SourceType};
pub use ids::{CardId, DeckId, ReviewId, SessionId, UserId};
pub use learning_card::LearningCard;
pub use learning_session::LearningSession;
pub use rating::{PASSING_QUALITY, Quality, Rating};
pub use review::{
    LatestReview, NewReviewEvent, PriorGuard, PriorSchedule, ReviewEvent, ReviewFilter, ReviewState,
};
pub use study_session::StudySession;
pub use summary::{APP_ID, DashboardSummary};
