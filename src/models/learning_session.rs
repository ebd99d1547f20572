//! Learning session management for spaced repetition practice.
//! Handles multi-round flashcard review on top of the persisted study session.

use rusqlite::Connection;
use std::sync::{Arc, Mutex};

use super::{Deck, DeckId, LearningCard, Rating, ReviewEvent, StudySession, UserId, sm2};
use crate::database::{db, decks, reviews};
use crate::error::Result;
use crate::notify::Notifier;
use crate::study::{self, ReviewRequest};

/// Manages a learning session with multiple review rounds.
/// Cards rated below "hard" are repeated in subsequent rounds.
pub struct LearningSession {
    pub deck: Deck,
    pub session: StudySession,
    pub user: UserId,
    pub show_answer: bool,
    pub round_number: usize,
    cards: Vec<LearningCard>,
    current_round_cards: Vec<usize>,
    current_index: usize,
    conn: Arc<Mutex<Connection>>,
}

impl LearningSession {
    /// Opens a study session over the cards of a deck that are new or due
    /// on the study clock.
    pub fn start(conn: Arc<Mutex<Connection>>, user: UserId, deck_id: DeckId) -> Result<Self> {
        let (deck, session, cards) = {
            let guard = db::lock(&conn)?;
            let now = db::get_current_date(&guard)?;
            let deck = decks::get_deck(&guard, &user, deck_id)?;
            let cards = study::cards_for_study(&guard, &user, deck_id, now)?;
            let session = study::start_session(&guard, &user, deck_id, now)?;
            (deck, session, cards)
        };
        log::info!(
            "Learning session {} on \"{}\" with {} cards",
            session.id,
            deck.title,
            cards.len()
        );

        let cards: Vec<LearningCard> = cards.into_iter().map(LearningCard::new).collect();
        let indices = (0..cards.len()).collect();

        Ok(Self {
            deck,
            session,
            user,
            show_answer: false,
            round_number: 1,
            cards,
            current_round_cards: indices,
            current_index: 0,
            conn,
        })
    }

    pub fn current_card(&self) -> Option<&LearningCard> {
        self.current_round_cards
            .get(self.current_index)
            .and_then(|&idx| self.cards.get(idx))
    }

    pub fn toggle_answer(&mut self) {
        self.show_answer = !self.show_answer;
    }

    pub fn next_card(&mut self) {
        if self.current_index + 1 < self.current_round_cards.len() {
            self.current_index += 1;
            self.show_answer = false;
        } else {
            self.start_next_round();
        }
    }

    /// Starts a new round with the cards that were not remembered.
    /// If none remain, the session is complete.
    fn start_next_round(&mut self) {
        let failed: Vec<usize> = self
            .current_round_cards
            .iter()
            .copied()
            .filter(|&idx| self.cards.get(idx).is_some_and(|card| !card.is_learned))
            .collect();

        if !failed.is_empty() {
            self.current_round_cards = failed;
            self.current_index = 0;
            self.show_answer = false;
            self.round_number += 1;
        }
    }

    /// Rates the current card and stores the review.
    pub fn grade_current_card(&mut self, rating: Rating) -> Result<Option<ReviewEvent>> {
        let Some(&idx) = self.current_round_cards.get(self.current_index) else {
            return Ok(None);
        };
        let Some(card) = self.cards.get_mut(idx) else {
            return Ok(None);
        };

        let mut guard = db::lock(&self.conn)?;
        let now = db::get_current_date(&guard)?;
        let request = ReviewRequest {
            card_id: card.flashcard.id,
            quality: rating.quality(),
            session_id: Some(self.session.id),
        };
        let event = study::review_card(&mut guard, &self.user, &request, now)?;

        card.record(rating);
        Ok(Some(event))
    }

    /// Intervals each rating would give the current card, for the rating buttons.
    pub fn preview_current(&self) -> Result<Option<[(Rating, u32); 4]>> {
        let Some(card) = self.current_card() else {
            return Ok(None);
        };
        let guard = db::lock(&self.conn)?;
        let now = db::get_current_date(&guard)?;
        let latest = reviews::latest_state_for(&guard, &self.user, card.flashcard.id)?;
        Ok(Some(sm2::preview_intervals(
            latest.map(|l| l.state.prior()),
            now,
        )))
    }

    /// Closes the study session. Returns the number of reviews recorded in it.
    pub fn finish(&self, notifier: &dyn Notifier) -> Result<u64> {
        let guard = db::lock(&self.conn)?;
        let now = db::get_current_date(&guard)?;
        study::complete_session(&guard, &self.user, self.session.id, now, notifier)
    }

    pub fn learned_count(&self) -> usize {
        self.current_round_cards
            .iter()
            .filter(|&&idx| self.cards.get(idx).is_some_and(|card| card.is_learned))
            .count()
    }

    pub fn total_count(&self) -> usize {
        self.current_round_cards.len()
    }

    pub fn remaining_count(&self) -> usize {
        self.total_count() - self.learned_count()
    }

    /// True when nothing was due or every card of the current round was remembered.
    pub fn is_completed(&self) -> bool {
        self.current_round_cards.is_empty() || self.learned_count() == self.total_count()
    }

    pub fn phase_message(&self) -> String {
        if self.round_number == 1 {
            format!("Round {}: {} cards", self.round_number, self.total_count())
        } else {
            format!(
                "Round {} (Review): {} cards to retry",
                self.round_number,
                self.total_count()
            )
        }
    }
}
