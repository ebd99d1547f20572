//! Main application UI and state management.
//! Lists the learner's decks with their due counts and runs study sessions.

use chrono::{DateTime, Local, Utc};
use eframe::egui;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

use flashnote::database::{db, decks};
use flashnote::export::json::{export_deck, export_json_to_path, import_into, import_json};
use flashnote::import::quiz::{QuizClient, QuizQuery, load_quiz_file};
use flashnote::models::{DeckId, DeckSummary, LearningSession, Rating, UserId, sm2};
use flashnote::notify::Notifier;
use flashnote::{Result, study};

/// Application screen states
#[derive(Default)]
enum Screen {
    #[default]
    Main,
    Learning(Box<LearningSession>),
}

struct DeckRow {
    summary: DeckSummary,
    due: usize,
}

/// Everything the screens read and change. Passed by `&mut` to each screen.
pub struct AppState {
    conn: Arc<Mutex<Connection>>,
    user: UserId,
    notifier: Arc<dyn Notifier>,
    quiz_client: Option<QuizClient>,
    quiz_limit: u32,
    decks: Vec<DeckRow>,
    selected_deck: Option<DeckId>,
    current_date: Option<DateTime<Utc>>,
    new_deck_title: String,
    screen: Screen,
    message: Option<String>,
    show_confirmation_dialog: bool,
    allowed_to_close: bool,
}

impl AppState {
    pub fn new(
        conn: Connection,
        user: UserId,
        notifier: Arc<dyn Notifier>,
        quiz_client: Option<QuizClient>,
        quiz_limit: u32,
    ) -> Self {
        let mut state = Self {
            conn: Arc::new(Mutex::new(conn)),
            user,
            notifier,
            quiz_client,
            quiz_limit,
            decks: Vec::new(),
            selected_deck: None,
            current_date: None,
            new_deck_title: String::new(),
            screen: Screen::Main,
            message: None,
            show_confirmation_dialog: false,
            allowed_to_close: false,
        };
        state.refresh();
        state
    }

    /// Reloads decks, due counts and the study clock.
    fn refresh(&mut self) {
        if let Err(e) = self.try_refresh() {
            log::error!("Failed to load decks: {}", e);
            self.message = Some(format!("Failed to load decks: {e}"));
        }
    }

    fn try_refresh(&mut self) -> Result<()> {
        let conn = db::lock(&self.conn)?;
        let now = db::get_current_date(&conn)?;
        let mut rows = Vec::new();
        for summary in decks::list_decks(&conn, &self.user, false)? {
            let due = study::cards_for_study(&conn, &self.user, summary.deck.id, now)?.len();
            rows.push(DeckRow { summary, due });
        }
        drop(conn);

        if !rows.iter().any(|r| Some(r.summary.deck.id) == self.selected_deck) {
            self.selected_deck = rows.first().map(|r| r.summary.deck.id);
        }
        self.decks = rows;
        self.current_date = Some(now);
        Ok(())
    }

    /// Runs an action and turns its outcome into the result dialog.
    fn report(&mut self, outcome: Result<String>) {
        let message = match outcome {
            Ok(message) => message,
            Err(e) => {
                log::warn!("Action failed: {}", e);
                format!("Failed: {e}")
            }
        };
        self.message = Some(message);
        self.refresh();
    }
}

/// Main application
pub struct MyApp {
    state: AppState,
}

impl MyApp {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl eframe::App for MyApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let state = &mut self.state;
        if matches!(state.screen, Screen::Learning(_)) {
            render_learning_screen(state, ctx);
        } else {
            render_main_screen(state, ctx);
        }

        // Handle window close requests with confirmation dialog
        if ctx.input(|i| i.viewport().close_requested()) && !state.allowed_to_close {
            ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
            state.show_confirmation_dialog = true;
        }

        if state.show_confirmation_dialog {
            egui::Window::new("Do you want to quit?")
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    ui.horizontal(|ui| {
                        if ui.button("No").clicked() {
                            state.show_confirmation_dialog = false;
                            state.allowed_to_close = false;
                        }

                        if ui.button("Yes").clicked() {
                            state.show_confirmation_dialog = false;
                            state.allowed_to_close = true;
                            ui.ctx().send_viewport_cmd(egui::ViewportCommand::Close);
                        }
                    });
                });
        }

        let mut dismissed = false;
        if let Some(message) = &state.message {
            egui::Window::new("Result")
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    ui.label(message);
                    ui.add_space(10.0);
                    if ui.button("OK").clicked() {
                        dismissed = true;
                    }
                });
        }
        if dismissed {
            state.message = None;
        }
    }
}

fn format_date(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d").to_string()
}

/// Deck list, study clock and file actions
fn render_main_screen(state: &mut AppState, ctx: &egui::Context) {
    egui::CentralPanel::default().show(ctx, |ui| {
        ui.horizontal(|ui| {
            let today = state.current_date.map(format_date).unwrap_or_else(|| "Unknown".to_string());
            ui.label(format!("Today: {today}"));

            if ui.button("Next Day").clicked() {
                let advanced = db::lock(&state.conn).and_then(|conn| db::advance_day(&conn));
                match advanced {
                    Ok(day) => log::info!("Study clock moved to {}", day),
                    Err(e) => log::error!("Failed to advance the study clock: {}", e),
                }
                state.refresh();
            }
        });
        ui.separator();

        ui.horizontal(|ui| {
            ui.label("New deck:");
            ui.text_edit_singleline(&mut state.new_deck_title);
            if ui.button("Create Deck").clicked() {
                let outcome = handle_create_deck(state);
                state.report(outcome);
            }
        });
        ui.separator();

        ui.heading(format!("Decks ({})", state.decks.len()));

        // Deferred so the deck list is not borrowed while acting on it
        let mut action_select: Option<DeckId> = None;
        let mut action_learn: Option<DeckId> = None;

        egui::ScrollArea::vertical()
            .id_source("decks_list")
            .max_height(250.0)
            .show(ui, |ui| {
                for row in &state.decks {
                    let deck = &row.summary.deck;
                    ui.horizontal(|ui| {
                        let label = format!(
                            "{} ({} cards, {} to study)",
                            deck.title, row.summary.cards_count, row.due
                        );
                        if ui
                            .selectable_label(state.selected_deck == Some(deck.id), label)
                            .clicked()
                        {
                            action_select = Some(deck.id);
                        }
                        if ui.add_enabled(row.due > 0, egui::Button::new("Learn")).clicked() {
                            action_learn = Some(deck.id);
                        }
                    });
                }
            });

        if let Some(id) = action_select {
            state.selected_deck = Some(id);
        }
        if let Some(id) = action_learn {
            start_learning_session(state, id);
        }

        ui.separator();

        let Some(deck_id) = state.selected_deck else {
            ui.label("Create a deck or import one to start studying");
            return;
        };
        ui.horizontal(|ui| {
            if ui.button("Export Deck").clicked() {
                if let Some(path) = rfd::FileDialog::new()
                    .set_file_name("deck.json")
                    .add_filter("JSON files", &["json"])
                    .save_file()
                {
                    let outcome = handle_export(state, deck_id, &path);
                    state.report(outcome);
                }
            }
            if ui.button("Import Deck").clicked() {
                if let Some(path) = rfd::FileDialog::new()
                    .add_filter("JSON files", &["json"])
                    .pick_file()
                {
                    let outcome = handle_import(state, &path);
                    state.report(outcome);
                }
            }
            if ui.button("Archive Deck").clicked() {
                let outcome = handle_archive(state, deck_id);
                state.report(outcome);
            }
        });
        ui.horizontal(|ui| {
            if ui.button("Import Quiz File").clicked() {
                if let Some(path) = rfd::FileDialog::new()
                    .add_filter("JSON files", &["json"])
                    .pick_file()
                {
                    let outcome = load_quiz_file(&path)
                        .and_then(|response| import_questions(state, deck_id, &response.items));
                    state.report(outcome);
                }
            }
            if state.quiz_client.is_some() && ui.button("Import From Quiz").clicked() {
                let outcome = handle_quiz_fetch(state, deck_id);
                state.report(outcome);
            }
        });
    });
}

/// Study screen for the running session
fn render_learning_screen(state: &mut AppState, ctx: &egui::Context) {
    let mut action_back = false;
    let mut failure: Option<String> = None;

    egui::CentralPanel::default().show(ctx, |ui| {
        let Screen::Learning(session) = &mut state.screen else {
            return;
        };
        ui.heading(format!("Learning: {}", session.deck.title));
        ui.label(session.phase_message());
        ui.label(format!(
            "Progress: {} / {} remembered ({} remaining)",
            session.learned_count(),
            session.total_count(),
            session.remaining_count()
        ));
        ui.add_space(20.0);

        if session.is_completed() {
            ui.heading("Congratulations!");
            ui.label("Every card of this session is remembered.");
            ui.add_space(20.0);
            if ui.button("Back to Main Screen").clicked() {
                action_back = true;
            }
            return;
        }

        let Some(card) = session.current_card() else {
            return;
        };
        let show_answer = session.show_answer;
        let front = card.flashcard.front.clone();
        let back = card.flashcard.back.clone();

        ui.group(|ui| {
            ui.set_min_height(200.0);
            ui.vertical_centered(|ui| {
                ui.add_space(20.0);
                ui.heading("Front:");
                ui.label(&front);
                ui.add_space(20.0);
                if show_answer {
                    ui.heading("Back:");
                    ui.label(&back);
                } else {
                    ui.label("(Click 'Show Answer' to reveal)");
                }
                ui.add_space(20.0);
            });
        });
        ui.add_space(20.0);

        let mut action_toggle = false;
        let mut action_grade: Option<Rating> = None;

        if !show_answer {
            if ui.button("Show Answer").clicked() {
                action_toggle = true;
            }
        } else {
            let preview = match session.preview_current() {
                Ok(preview) => preview,
                Err(e) => {
                    log::warn!("Interval preview failed: {}", e);
                    None
                }
            };
            ui.label("How well did you remember it?");
            ui.horizontal(|ui| {
                for rating in Rating::ALL {
                    let days = preview
                        .and_then(|p| p.iter().find(|(r, _)| *r == rating).map(|(_, d)| *d));
                    let text = match days {
                        Some(days) => format!("{} ({})", rating.label(), sm2::format_interval(days)),
                        None => rating.label().to_string(),
                    };
                    if ui.button(text).clicked() {
                        action_grade = Some(rating);
                    }
                }
            });
        }

        ui.add_space(20.0);
        if ui.button("Back to Main Screen").clicked() {
            action_back = true;
        }

        if action_toggle {
            session.toggle_answer();
        }
        if let Some(rating) = action_grade {
            match session.grade_current_card(rating) {
                Ok(_) => session.next_card(),
                Err(e) => {
                    log::error!("Failed to save rating: {}", e);
                    failure = Some(format!("Failed to save rating: {e}"));
                }
            }
        }
    });

    if failure.is_some() {
        state.message = failure;
    }
    if action_back {
        finish_learning_session(state);
    }
}

fn start_learning_session(state: &mut AppState, deck_id: DeckId) {
    match LearningSession::start(Arc::clone(&state.conn), state.user.clone(), deck_id) {
        Ok(session) => state.screen = Screen::Learning(Box::new(session)),
        Err(e) => state.report(Err(e)),
    }
}

/// Closes the study session and returns to the deck list.
fn finish_learning_session(state: &mut AppState) {
    if let Screen::Learning(session) = std::mem::take(&mut state.screen) {
        match session.finish(state.notifier.as_ref()) {
            Ok(reviewed) => log::info!("Session {} finished, {} reviews", session.session.id, reviewed),
            Err(e) => log::error!("Failed to complete session {}: {}", session.session.id, e),
        }
    }
    state.refresh();
}

fn handle_create_deck(state: &mut AppState) -> Result<String> {
    let conn = db::lock(&state.conn)?;
    let now = db::get_current_date(&conn)?;
    let deck = study::create_deck(
        &conn,
        &state.user,
        &state.new_deck_title,
        None,
        now,
        state.notifier.as_ref(),
    )?;
    drop(conn);
    state.new_deck_title.clear();
    state.selected_deck = Some(deck.id);
    Ok(format!("Deck '{}' created.", deck.title))
}

fn handle_export(state: &AppState, deck_id: DeckId, path: &Path) -> Result<String> {
    let conn = db::lock(&state.conn)?;
    let export = export_deck(&conn, &state.user, deck_id)?;
    export_json_to_path(&export, path)?;
    Ok(format!("Deck '{}' exported successfully!", export.title))
}

fn handle_archive(state: &AppState, deck_id: DeckId) -> Result<String> {
    let conn = db::lock(&state.conn)?;
    let now = db::get_current_date(&conn)?;
    let deck = decks::archive_deck(&conn, &state.user, deck_id, now)?;
    Ok(format!("Deck '{}' archived.", deck.title))
}

fn handle_import(state: &mut AppState, path: &Path) -> Result<String> {
    let export = import_json(path)?;
    let mut conn = db::lock(&state.conn)?;
    let now = db::get_current_date(&conn)?;
    let deck = import_into(&mut conn, &state.user, &export, now)?;
    drop(conn);
    state.selected_deck = Some(deck.id);
    Ok(format!(
        "Deck '{}' imported successfully with {} cards!",
        deck.title,
        export.cards.len()
    ))
}

fn handle_quiz_fetch(state: &AppState, deck_id: DeckId) -> Result<String> {
    let Some(client) = &state.quiz_client else {
        return Ok("The quiz service is not configured.".to_string());
    };
    let query = QuizQuery {
        limit: Some(state.quiz_limit),
        ..QuizQuery::default()
    };
    let response = client.fetch(&query)?;
    import_questions(state, deck_id, &response.items)
}

fn import_questions(
    state: &AppState,
    deck_id: DeckId,
    questions: &[flashnote::import::quiz::QuizQuestion],
) -> Result<String> {
    let mut conn = db::lock(&state.conn)?;
    let now = db::get_current_date(&conn)?;
    let outcome = study::import_quiz_questions(
        &mut conn,
        &state.user,
        deck_id,
        questions,
        now,
        state.notifier.as_ref(),
    )?;
    Ok(format!(
        "Imported {} cards, skipped {}.",
        outcome.imported, outcome.skipped
    ))
}
