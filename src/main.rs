mod app;

use std::sync::Arc;

use rusqlite::Connection;

use app::{AppState, MyApp};
use flashnote::database::{db, decks};
use flashnote::import::quiz::QuizClient;
use flashnote::models::{CardContent, UserId};
use flashnote::notify::{Notifier, WebhookNotifier};
use flashnote::{Config, Result};

/// Adds a starter deck the first time the app runs for a user.
fn seed_sample_deck(conn: &Connection, user: &UserId) -> Result<()> {
    if !decks::list_decks(conn, user, true)?.is_empty() {
        return Ok(());
    }
    let now = db::get_current_date(conn)?;
    let deck = decks::create_deck(conn, user, "Polish Vocabulary", None, now)?;
    for (front, back) in [("cześć", "hello"), ("dziękuję", "thank you"), ("proszę", "please")] {
        decks::create_card(conn, user, deck.id, &CardContent::manual(front, back), now)?;
    }
    log::info!("Sample deck created for {}", user);
    Ok(())
}

fn startup(config: &Config) -> Result<AppState> {
    let user = config.user()?;
    let conn = db::open(&config.database_path)?;
    seed_sample_deck(&conn, &user)?;

    let notifier: Arc<dyn Notifier> = Arc::new(WebhookNotifier::from_config(config)?);
    let quiz_client = match QuizClient::from_config(config) {
        Ok(client) => Some(client),
        Err(e) => {
            log::info!("Quiz import from the service is disabled: {}", e);
            None
        }
    };

    let decks = decks::list_decks(&conn, &user, false)?;
    log::info!("Loaded {} decks for {}", decks.len(), user);
    for summary in &decks {
        log::debug!("  - {} ({} cards)", summary.deck.title, summary.cards_count);
    }

    Ok(AppState::new(
        conn,
        user,
        notifier,
        quiz_client,
        config.quiz_import_limit,
    ))
}

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let state = match Config::load().and_then(|config| startup(&config)) {
        Ok(state) => state,
        Err(e) => {
            log::error!("Failed to start FlashNote: {}", e);
            std::process::exit(1);
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([500.0, 700.0]),
        ..Default::default()
    };
    eframe::run_native(
        "FlashNote",
        options,
        Box::new(|_cc| Ok(Box::new(MyApp::new(state)))),
    )
}
