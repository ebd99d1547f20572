//! Study actions: rating cards, study sessions and quiz imports.
//!
//! These are the entry points the UI calls. Each one validates ownership,
//! does its database work, and only then fires notifications, which never
//! affect the outcome of the action.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, TransactionBehavior, params};

use crate::database::db::to_millis;
use crate::database::{decks, reviews, sessions, summary};
use crate::error::Result;
use crate::import::quiz::QuizQuestion;
use crate::models::{
    CardId, DeckId, Flashcard, NewReviewEvent, PriorGuard, Quality, ReviewEvent, SessionId,
    StudySession, UserId, sm2,
};
use crate::notify::{Activity, ActivityPush, Notifier, ParentNotification};

#[derive(Clone, Debug, PartialEq)]
pub struct ReviewRequest {
    pub card_id: CardId,
    pub quality: Quality,
    pub session_id: Option<SessionId>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImportOutcome {
    pub imported: usize,
    pub skipped: usize,
}

/// Rates a card: reads its latest schedule, runs the scheduler and appends
/// the result, all inside one write transaction.
///
/// Either the review is stored with its full schedule and the session
/// counters are bumped, or nothing is written.
pub fn review_card(
    conn: &mut Connection,
    user: &UserId,
    request: &ReviewRequest,
    now: DateTime<Utc>,
) -> Result<ReviewEvent> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let card = decks::get_card(&tx, user, request.card_id)?;
    let latest = reviews::latest_state_for(&tx, user, card.id)?;
    let state = sm2::schedule(request.quality, latest.map(|l| l.state.prior()), now);

    let event = reviews::append(
        &tx,
        user,
        &NewReviewEvent {
            card_id: card.id,
            deck_id: card.deck_id,
            session_id: request.session_id,
            quality: request.quality,
            state,
            guard: PriorGuard::Latest(latest.map(|l| l.id)),
        },
    )?;
    if let Some(session_id) = request.session_id {
        sessions::record_outcome(&tx, user, session_id, request.quality.is_passing())?;
    }

    tx.commit()?;
    log::info!(
        "Card {} rated {} by {}: next review in {}d",
        card.id,
        request.quality.value(),
        user,
        event.state.interval_days
    );
    Ok(event)
}

/// Cards of a deck to study at `now`: never-reviewed cards first, then cards
/// whose latest schedule is due, the longest overdue first. Archived cards
/// are left out.
pub fn cards_for_study(
    conn: &Connection,
    user: &UserId,
    deck_id: DeckId,
    now: DateTime<Utc>,
) -> Result<Vec<Flashcard>> {
    decks::get_deck(conn, user, deck_id)?;

    let mut stmt = conn.prepare(
        "SELECT id FROM (
             SELECT c.id AS id,
                    (SELECT r.due_at FROM reviews r
                     WHERE r.user_id = c.user_id AND r.card_id = c.id
                     ORDER BY r.reviewed_at DESC, r.id DESC
                     LIMIT 1) AS due_at
             FROM cards c
             WHERE c.deck_id = ?1 AND c.user_id = ?2 AND c.is_active = 1
         )
         WHERE due_at IS NULL OR due_at <= ?3
         ORDER BY due_at IS NOT NULL, due_at ASC, id ASC",
    )?;
    let ids = stmt
        .query_map(params![deck_id.0, user.as_str(), to_millis(now)], |row| {
            Ok(CardId(row.get(0)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    ids.into_iter()
        .map(|id| decks::get_card(conn, user, id))
        .collect()
}

pub fn start_session(
    conn: &Connection,
    user: &UserId,
    deck_id: DeckId,
    now: DateTime<Utc>,
) -> Result<StudySession> {
    sessions::start(conn, user, deck_id, now)
}

/// Closes a session and reports how many cards were reviewed in it.
pub fn complete_session(
    conn: &Connection,
    user: &UserId,
    session_id: SessionId,
    now: DateTime<Utc>,
    notifier: &dyn Notifier,
) -> Result<u64> {
    let session = sessions::complete(conn, user, session_id, now)?;
    let reviewed = reviews::count_for_session(conn, user, session_id)?;
    let deck = decks::get_deck(conn, user, session.deck_id)?;

    notifier.notify_parent(ParentNotification::new(
        user,
        "FlashNote study session completed",
        format!("Reviewed {} cards in “{}”.", reviewed, deck.title),
    ));
    push_dashboard(conn, user, "study.completed", Some(deck.id.to_string()), now, notifier);

    Ok(reviewed)
}

/// Adds quiz questions to a deck as cards. Questions already imported into
/// the deck, and questions with an empty side, are skipped.
pub fn import_quiz_questions(
    conn: &mut Connection,
    user: &UserId,
    deck_id: DeckId,
    questions: &[QuizQuestion],
    now: DateTime<Utc>,
    notifier: &dyn Notifier,
) -> Result<ImportOutcome> {
    let deck = decks::get_deck(conn, user, deck_id)?;
    if questions.is_empty() {
        return Ok(ImportOutcome::default());
    }

    let tx = conn.transaction()?;
    let mut existing = decks::existing_source_refs(&tx, user, deck_id)?;
    let mut imported = 0;
    for question in questions {
        if existing.contains(&question.question_id) {
            continue;
        }
        let Some(content) = question.to_card() else {
            continue;
        };
        decks::create_card(&tx, user, deck_id, &content, now)?;
        existing.insert(question.question_id.clone());
        imported += 1;
    }
    tx.commit()?;

    let outcome = ImportOutcome {
        imported,
        skipped: questions.len() - imported,
    };
    log::info!(
        "Quiz import into deck {}: {} imported, {} skipped",
        deck_id,
        outcome.imported,
        outcome.skipped
    );

    notifier.notify_parent(ParentNotification::new(
        user,
        "FlashNote quiz import completed",
        format!("Imported {} cards into “{}”.", outcome.imported, deck.title),
    ));
    push_dashboard(conn, user, "quiz.imported", Some(deck.id.to_string()), now, notifier);

    Ok(outcome)
}

/// Creates a deck and announces it.
pub fn create_deck(
    conn: &Connection,
    user: &UserId,
    title: &str,
    description: Option<&str>,
    now: DateTime<Utc>,
    notifier: &dyn Notifier,
) -> Result<crate::models::Deck> {
    let deck = decks::create_deck(conn, user, title, description, now)?;
    notifier.notify_parent(ParentNotification::new(
        user,
        "FlashNote deck created",
        format!("Deck “{}” is ready.", deck.title),
    ));
    push_dashboard(conn, user, "deck.created", Some(deck.id.to_string()), now, notifier);
    Ok(deck)
}

/// Sends the activity with a fresh dashboard summary. A summary that cannot
/// be built is logged and the push is dropped.
fn push_dashboard(
    conn: &Connection,
    user: &UserId,
    event: &str,
    entity_id: Option<String>,
    now: DateTime<Utc>,
    notifier: &dyn Notifier,
) {
    match summary::build(conn, user, now) {
        Ok(summary) => notifier.push_activity(ActivityPush {
            user_id: user.clone(),
            app_id: summary.app_id.clone(),
            activity: Activity {
                event: event.to_string(),
                occurred_at: now,
                entity_id,
            },
            summary,
        }),
        Err(e) => log::warn!("Dashboard summary for {} failed: {}", user, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::db::open_in_memory;
    use crate::error::FlashnoteError;
    use crate::models::{CardContent, Deck, Rating};
    use crate::notify::testing::RecordingNotifier;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, 7, 45, 0).unwrap()
    }

    fn alice() -> UserId {
        UserId::new("alice").unwrap()
    }

    fn deck_with_cards(conn: &Connection, count: usize) -> (Deck, Vec<Flashcard>) {
        let deck = decks::create_deck(conn, &alice(), "Polish", None, now()).unwrap();
        let cards = (0..count)
            .map(|i| {
                let content = CardContent::manual(format!("word {i}"), format!("meaning {i}"));
                decks::create_card(conn, &alice(), deck.id, &content, now()).unwrap()
            })
            .collect();
        (deck, cards)
    }

    fn rate(card: &Flashcard, rating: Rating) -> ReviewRequest {
        ReviewRequest {
            card_id: card.id,
            quality: rating.quality(),
            session_id: None,
        }
    }

    #[test]
    fn test_easy_then_again_scenario() {
        let mut conn = open_in_memory().unwrap();
        let (_, cards) = deck_with_cards(&conn, 1);

        let first = review_card(&mut conn, &alice(), &rate(&cards[0], Rating::Easy), now()).unwrap();
        assert_eq!(first.state.interval_days, 4);
        assert!((first.state.ease_factor - 2.6).abs() < 1e-9);
        assert_eq!(first.state.due_at, now() + Duration::days(4));

        let later = now() + Duration::days(4);
        let second = review_card(&mut conn, &alice(), &rate(&cards[0], Rating::Again), later).unwrap();
        assert_eq!(second.state.interval_days, 1);
        assert!((second.state.ease_factor - 2.4).abs() < 1e-9);

        let latest = reviews::latest_state_for(&conn, &alice(), cards[0].id).unwrap().unwrap();
        assert_eq!(latest.id, second.id);
    }

    #[test]
    fn test_stored_review_matches_returned_event() {
        let mut conn = open_in_memory().unwrap();
        let (_, cards) = deck_with_cards(&conn, 1);
        let at = now() + Duration::microseconds(1_500);

        let event = review_card(&mut conn, &alice(), &rate(&cards[0], Rating::Good), at).unwrap();
        let stored = reviews::latest_state_for(&conn, &alice(), cards[0].id).unwrap().unwrap();
        assert_eq!(event.state, stored.state);
        assert_eq!(event.state.reviewed_at, now() + Duration::milliseconds(1));
    }

    #[test]
    fn test_review_of_foreign_card_writes_nothing() {
        let mut conn = open_in_memory().unwrap();
        let (_, cards) = deck_with_cards(&conn, 1);
        let bob = UserId::new("bob").unwrap();

        let result = review_card(&mut conn, &bob, &rate(&cards[0], Rating::Good), now());
        assert!(matches!(result, Err(FlashnoteError::NotFound("Card"))));
        assert!(reviews::history_for(&conn, &alice(), cards[0].id).unwrap().is_empty());
    }

    #[test]
    fn test_failed_session_check_rolls_back() {
        let mut conn = open_in_memory().unwrap();
        let (_, cards) = deck_with_cards(&conn, 1);
        let other = decks::create_deck(&conn, &alice(), "Other", None, now()).unwrap();
        let session = start_session(&conn, &alice(), other.id, now()).unwrap();

        let mut request = rate(&cards[0], Rating::Good);
        request.session_id = Some(session.id);
        let result = review_card(&mut conn, &alice(), &request, now());

        assert!(matches!(result, Err(FlashnoteError::NotFound("Study session"))));
        assert!(reviews::latest_state_for(&conn, &alice(), cards[0].id).unwrap().is_none());
        assert_eq!(sessions::get(&conn, &alice(), session.id).unwrap().total_cards_seen, 0);
    }

    #[test]
    fn test_session_counts_and_completion() {
        let mut conn = open_in_memory().unwrap();
        let (deck, cards) = deck_with_cards(&conn, 2);
        let session = start_session(&conn, &alice(), deck.id, now()).unwrap();
        let notifier = RecordingNotifier::default();

        for (card, rating) in cards.iter().zip([Rating::Good, Rating::Again]) {
            let mut request = rate(card, rating);
            request.session_id = Some(session.id);
            review_card(&mut conn, &alice(), &request, now()).unwrap();
        }

        let reviewed =
            complete_session(&conn, &alice(), session.id, now() + Duration::minutes(3), &notifier)
                .unwrap();
        assert_eq!(reviewed, 2);

        let stored = sessions::get(&conn, &alice(), session.id).unwrap();
        assert_eq!((stored.correct_count, stored.wrong_count), (1, 1));

        let notifications = notifier.notifications.lock().unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].body.as_deref(), Some("Reviewed 2 cards in “Polish”."));

        let activities = notifier.activities.lock().unwrap();
        assert_eq!(activities[0].activity.event, "study.completed");
        assert_eq!(activities[0].summary.reviews_today, 2);
    }

    #[test]
    fn test_cards_for_study() {
        let mut conn = open_in_memory().unwrap();
        let (deck, cards) = deck_with_cards(&conn, 3);

        // Everything is new at first.
        assert_eq!(cards_for_study(&conn, &alice(), deck.id, now()).unwrap().len(), 3);

        review_card(&mut conn, &alice(), &rate(&cards[0], Rating::Easy), now()).unwrap();
        review_card(&mut conn, &alice(), &rate(&cards[1], Rating::Again), now()).unwrap();

        let today: Vec<CardId> = cards_for_study(&conn, &alice(), deck.id, now())
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(today, vec![cards[2].id]);

        let tomorrow: Vec<CardId> = cards_for_study(&conn, &alice(), deck.id, now() + Duration::days(1))
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(tomorrow, vec![cards[2].id, cards[1].id]);

        let later = cards_for_study(&conn, &alice(), deck.id, now() + Duration::days(4)).unwrap();
        assert_eq!(later.len(), 3);
    }

    #[test]
    fn test_archived_cards_are_not_studied() {
        let mut conn = open_in_memory().unwrap();
        let (deck, cards) = deck_with_cards(&conn, 2);
        review_card(&mut conn, &alice(), &rate(&cards[0], Rating::Again), now()).unwrap();

        decks::archive_card(&conn, &alice(), cards[0].id, now()).unwrap();
        decks::archive_card(&conn, &alice(), cards[1].id, now()).unwrap();

        let due = cards_for_study(&conn, &alice(), deck.id, now() + Duration::days(7)).unwrap();
        assert!(due.is_empty());
        assert_eq!(reviews::history_for(&conn, &alice(), cards[0].id).unwrap().len(), 1);
    }

    #[test]
    fn test_quiz_import_dedupes() {
        let mut conn = open_in_memory().unwrap();
        let (deck, _) = deck_with_cards(&conn, 0);
        let notifier = RecordingNotifier::default();
        let questions = vec![
            QuizQuestion {
                question_id: "q1".to_string(),
                question_text: "Capital of Poland?".to_string(),
                answer_text: "Warsaw".to_string(),
                explanation: Some("Since 1596.".to_string()),
                topic_id: None,
                subject_id: None,
                difficulty: None,
            },
            QuizQuestion {
                question_id: "q2".to_string(),
                question_text: "".to_string(),
                answer_text: "nothing".to_string(),
                explanation: None,
                topic_id: None,
                subject_id: None,
                difficulty: None,
            },
        ];

        let first =
            import_quiz_questions(&mut conn, &alice(), deck.id, &questions, now(), &notifier).unwrap();
        assert_eq!(first, ImportOutcome { imported: 1, skipped: 1 });

        let again =
            import_quiz_questions(&mut conn, &alice(), deck.id, &questions, now(), &notifier).unwrap();
        assert_eq!(again, ImportOutcome { imported: 0, skipped: 2 });

        let cards = decks::list_cards(&conn, &alice(), deck.id, false).unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].back, "Warsaw\n\nSince 1596.");

        let activities = notifier.activities.lock().unwrap();
        assert_eq!(activities.len(), 2);
        assert_eq!(activities[0].summary.last_imported_from_quiz_at, Some(now()));
    }

    #[test]
    fn test_create_deck_notifies() {
        let conn = open_in_memory().unwrap();
        let notifier = RecordingNotifier::default();
        let deck = create_deck(&conn, &alice(), "Kinematics", None, now(), &notifier).unwrap();

        let notifications = notifier.notifications.lock().unwrap();
        assert_eq!(notifications[0].title, "FlashNote deck created");
        let activities = notifier.activities.lock().unwrap();
        assert_eq!(activities[0].activity.entity_id, Some(deck.id.to_string()));
        assert_eq!(activities[0].summary.decks_count, 1);
    }
}
