//! Application state and logic.

use crate::calendar;
use crate::challenges::{ChallengeBoard, ChallengeKind};
use crate::config::Config;
use crate::db::{Database, DbResult};
use crate::evidence::{self, Analysis, FileNameRecognizer, Recognizer};
use crate::game::{Outcome, SlotMachine};
use crate::models::{Category, Quest, QuestId};
use crate::points::{PointsError, PointsLedger};
use chrono::{Local, NaiveDate, Utc};
use crossterm::event::{KeyCode, KeyEvent};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::path::PathBuf;
use std::time::Instant;

/// Application state.
pub struct App {
    /// Quest store.
    pub db: Database,
    /// Where the store lives on disk, if anywhere.
    db_path: Option<PathBuf>,
    /// Configuration.
    pub config: Config,
    /// Points balance and settings.
    pub ledger: PointsLedger,
    /// Challenge progress.
    pub board: ChallengeBoard,
    /// Mini-game.
    pub machine: SlotMachine,
    rng: StdRng,
    recognizer: Box<dyn Recognizer>,
    /// Current view.
    pub view: View,
    /// All quests, in display order.
    pub quests: Vec<Quest>,
    /// Selected quest index.
    pub selected_index: usize,
    /// Selected challenge index on the prizes view.
    pub selected_challenge: usize,
    /// Completed quests per category.
    pub category_counts: HashMap<Category, u32>,
    /// First day of the month shown in the calendar.
    pub calendar_month: NaiveDate,
    /// Completions per day for the calendar month.
    pub calendar_counts: BTreeMap<NaiveDate, u32>,
    /// Whether in editing mode.
    pub editing: bool,
    /// Input buffer for editing.
    pub input_buffer: String,
    /// Editing field.
    pub editing_field: EditField,
    /// Message to display.
    pub message: Option<(String, MessageType)>,
    /// Show help popup.
    pub show_help: bool,
    /// Confirmation dialog.
    pub confirm_dialog: Option<ConfirmDialog>,
    /// Day the challenge board was last evaluated for.
    day: NaiveDate,
    /// Error the event loop must exit with.
    fatal: Option<anyhow::Error>,
}

/// Current view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Quest list.
    Quests,
    /// Month calendar of completions.
    Calendar,
    /// Category totals and challenges.
    Prizes,
    /// Dice roll mini-game.
    Play,
}

/// Editing field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
    None,
    NewQuest,
    QuestTitle,
    Evidence,
}

/// Message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Info,
    Success,
    Warning,
    Error,
}

/// Confirmation dialog.
#[derive(Debug, Clone)]
pub struct ConfirmDialog {
    pub title: String,
    pub message: String,
    pub action: ConfirmAction,
}

/// Confirm action type.
#[derive(Debug, Clone)]
pub enum ConfirmAction {
    DeleteQuest(QuestId),
    EmptyDatabase,
    ResetDatabase,
}

impl App {
    /// Create new application using the per-user files.
    pub fn new() -> anyhow::Result<Self> {
        let config = Config::load();
        if Config::config_path().is_some_and(|p| !p.exists()) {
            if let Err(e) = config.save() {
                tracing::warn!(error = %e, "could not write default config");
            }
        }

        let db_path = Config::db_path().unwrap_or_else(|| "quests.db".into());
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::open(&db_path)?;
        tracing::info!(
            path = %db_path.display(),
            schema = db.schema_version()?,
            "opened quest database"
        );

        let settings_path = Config::settings_path().unwrap_or_else(|| "settings.toml".into());
        let ledger = match PointsLedger::load(&settings_path) {
            Ok(ledger) => ledger,
            Err(e) => {
                tracing::error!(error = %e, "could not read settings, starting from zero");
                PointsLedger::in_memory(0)
            }
        };

        let mut app = Self::with_parts(db, ledger, config, StdRng::from_entropy())?;
        app.db_path = Some(db_path);
        Ok(app)
    }

    /// Assemble an application from explicit parts.
    pub fn with_parts(
        db: Database,
        ledger: PointsLedger,
        config: Config,
        rng: StdRng,
    ) -> DbResult<Self> {
        let board = ChallengeBoard::new(config.challenges.clone(), config.rewards.clone());
        let mut app = Self {
            db,
            db_path: None,
            board,
            config,
            ledger,
            machine: SlotMachine::new(),
            rng,
            recognizer: Box::new(FileNameRecognizer),
            view: View::Quests,
            quests: Vec::new(),
            selected_index: 0,
            selected_challenge: 0,
            category_counts: HashMap::new(),
            calendar_month: calendar::month_start(today()),
            calendar_counts: BTreeMap::new(),
            editing: false,
            input_buffer: String::new(),
            editing_field: EditField::None,
            message: None,
            show_help: false,
            confirm_dialog: None,
            day: today(),
            fatal: None,
        };

        app.refresh()?;
        Ok(app)
    }

    /// Replace the evidence recognizer.
    #[cfg(test)]
    pub fn set_recognizer(&mut self, recognizer: Box<dyn Recognizer>) {
        self.recognizer = recognizer;
    }

    /// Refresh data from database.
    pub fn refresh(&mut self) -> DbResult<()> {
        self.quests = self.db.list_quests()?;
        if self.config.display.completed_at_bottom {
            self.quests.sort_by_key(|q| q.is_completed());
        }

        self.category_counts = self.db.completed_count_by_category()?;
        self.board.evaluate(&self.quests, today());

        if self.view == View::Calendar {
            self.refresh_calendar()?;
        }

        if self.selected_index >= self.quests.len() {
            self.selected_index = self.quests.len().saturating_sub(1);
        }

        Ok(())
    }

    fn refresh_calendar(&mut self) -> DbResult<()> {
        let start = calendar::month_start(self.calendar_month);
        let end = calendar::month_end(self.calendar_month);
        self.calendar_counts = self.db.completions_between(start, end)?;
        Ok(())
    }

    /// Advance time-driven state.
    pub fn tick(&mut self, now: Instant) {
        let day = today();
        if day != self.day {
            self.day = day;
            self.reload();
        }

        let Some(outcome) = self.machine.tick(now) else {
            return;
        };

        match outcome {
            Outcome::Win => {
                let reward = self.config.rewards.roll_win;
                self.award(reward);
                self.set_message(format!("Jackpot! +{} points", reward), MessageType::Success);
            }
            Outcome::Lose => {
                self.set_message("No match this time", MessageType::Info);
            }
        }
    }

    /// Check if in editing mode.
    pub fn is_editing(&self) -> bool {
        self.editing
    }

    /// Take the error that should end the session, if any.
    pub fn take_fatal(&mut self) -> Option<anyhow::Error> {
        self.fatal.take()
    }

    /// Whether a bare `q` should quit.
    pub fn can_quit(&self) -> bool {
        !self.editing && self.confirm_dialog.is_none()
    }

    /// Get selected quest.
    pub fn selected_quest(&self) -> Option<&Quest> {
        self.quests.get(self.selected_index)
    }

    /// Handle key input.
    pub fn handle_key(&mut self, key: KeyEvent) {
        // Handle confirmation dialog
        if let Some(dialog) = self.confirm_dialog.take() {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => self.execute_confirm(dialog.action),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {}
                _ => self.confirm_dialog = Some(dialog),
            }
            return;
        }

        // Handle help popup
        if self.show_help {
            self.show_help = false;
            return;
        }

        // Handle editing mode
        if self.editing {
            self.handle_edit_key(key);
            return;
        }

        // Keep the roll result visible while the game view is idle.
        if self.view != View::Play {
            self.message = None;
        }

        match key.code {
            KeyCode::Char('1') => self.switch_view(View::Quests),
            KeyCode::Char('2') => self.switch_view(View::Calendar),
            KeyCode::Char('3') => self.switch_view(View::Prizes),
            KeyCode::Char('4') => self.switch_view(View::Play),
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Char('L') => self.cycle_language(),
            _ => match self.view {
                View::Quests => self.handle_quests_key(key),
                View::Calendar => self.handle_calendar_key(key),
                View::Prizes => self.handle_prizes_key(key),
                View::Play => self.handle_play_key(key),
            },
        }
    }

    fn handle_quests_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::Char('g') if key.modifiers.is_empty() => self.selected_index = 0,
            KeyCode::Char('G') => self.selected_index = self.quests.len().saturating_sub(1),
            KeyCode::Char(' ') | KeyCode::Enter => self.toggle_completion(),
            KeyCode::Char('a') => self.start_editing(EditField::NewQuest, String::new()),
            KeyCode::Char('e') => {
                if let Some(title) = self.selected_quest().map(|q| q.title.clone()) {
                    self.start_editing(EditField::QuestTitle, title);
                }
            }
            KeyCode::Char('c') => self.cycle_category(),
            KeyCode::Char('f') => {
                if let Some(quest) = self.selected_quest() {
                    let current = quest
                        .document
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default();
                    self.start_editing(EditField::Evidence, current);
                }
            }
            KeyCode::Char('A') => self.analyze_selected(),
            KeyCode::Char('d') => self.confirm_delete_quest(),
            KeyCode::Char('X') => {
                self.confirm_dialog = Some(ConfirmDialog {
                    title: "Empty Database".to_string(),
                    message: "Delete every quest? This cannot be undone. (y/n)".to_string(),
                    action: ConfirmAction::EmptyDatabase,
                });
            }
            KeyCode::Char('R') => {
                self.confirm_dialog = Some(ConfirmDialog {
                    title: "Reset Database".to_string(),
                    message: "Delete the database file and start fresh? (y/n)".to_string(),
                    action: ConfirmAction::ResetDatabase,
                });
            }
            _ => {}
        }
    }

    fn handle_calendar_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('h') | KeyCode::Left => self.change_month(-1),
            KeyCode::Char('l') | KeyCode::Right => self.change_month(1),
            KeyCode::Char('t') => {
                self.calendar_month = calendar::month_start(today());
                self.reload();
            }
            _ => {}
        }
    }

    fn handle_prizes_key(&mut self, key: KeyEvent) {
        let count = self.board.statuses().len();
        match key.code {
            KeyCode::Char('j') | KeyCode::Down if count > 0 => {
                self.selected_challenge = (self.selected_challenge + 1).min(count - 1);
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.selected_challenge = self.selected_challenge.saturating_sub(1);
            }
            KeyCode::Enter | KeyCode::Char(' ') => self.claim_selected_challenge(),
            KeyCode::Char('p') => self.claim_prize(),
            _ => {}
        }
    }

    fn handle_play_key(&mut self, key: KeyEvent) {
        if let KeyCode::Char('r') | KeyCode::Char(' ') | KeyCode::Enter = key.code {
            self.play(Instant::now());
        }
    }

    /// Handle editing keys.
    fn handle_edit_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.stop_editing(),
            KeyCode::Enter => self.finish_editing(),
            KeyCode::Backspace => {
                self.input_buffer.pop();
            }
            KeyCode::Char(c) => self.input_buffer.push(c),
            _ => {}
        }
    }

    fn switch_view(&mut self, view: View) {
        self.view = view;
        self.reload();
    }

    /// Refresh, reporting failures in the status bar.
    fn reload(&mut self) {
        if let Err(e) = self.refresh() {
            self.report("refresh", e);
        }
    }

    fn move_selection(&mut self, delta: i32) {
        if self.quests.is_empty() {
            return;
        }

        let new_index = self.selected_index as i32 + delta;
        self.selected_index = new_index.clamp(0, self.quests.len() as i32 - 1) as usize;
    }

    fn change_month(&mut self, delta: i32) {
        self.calendar_month = calendar::add_months(self.calendar_month, delta);
        self.reload();
    }

    fn start_editing(&mut self, field: EditField, initial: String) {
        self.editing = true;
        self.editing_field = field;
        self.input_buffer = initial;
    }

    fn stop_editing(&mut self) {
        self.editing = false;
        self.input_buffer.clear();
        self.editing_field = EditField::None;
    }

    /// Finish editing and save.
    fn finish_editing(&mut self) {
        let input = self.input_buffer.trim().to_string();

        match self.editing_field {
            EditField::NewQuest if !input.is_empty() => self.add_quest(input),
            EditField::QuestTitle if !input.is_empty() => {
                if let Some(mut quest) = self.selected_quest().cloned() {
                    quest.title = input;
                    self.save_quest(&quest, "Quest renamed");
                }
            }
            EditField::Evidence => self.attach_evidence(&input),
            _ => {}
        }

        self.stop_editing();
    }

    /// Add a new open quest.
    pub fn add_quest(&mut self, title: String) {
        let quest = Quest::new(title, Category::default());
        match self.db.insert_quest(&quest) {
            Ok(()) => {
                self.set_message(format!("Quest '{}' created", quest.title), MessageType::Success);
                self.reload();
                self.select(quest.id);
            }
            Err(e) => self.report("insert quest", e),
        }
    }

    fn select(&mut self, id: QuestId) {
        if let Some(idx) = self.quests.iter().position(|q| q.id == id) {
            self.selected_index = idx;
        }
    }

    fn save_quest(&mut self, quest: &Quest, success: &str) {
        match self.db.update_quest(quest) {
            Ok(()) => {
                self.set_message(success, MessageType::Success);
                self.reload();
            }
            Err(e) => self.report("update quest", e),
        }
    }

    fn cycle_category(&mut self) {
        if let Some(mut quest) = self.selected_quest().cloned() {
            quest.category = quest.category.next();
            let msg = format!("Category: {}", quest.category.as_str());
            self.save_quest(&quest, &msg);
        }
    }

    fn attach_evidence(&mut self, input: &str) {
        let Some(mut quest) = self.selected_quest().cloned() else {
            return;
        };

        if input.is_empty() {
            quest.document = None;
            self.save_quest(&quest, "Evidence removed");
            return;
        }

        match evidence::validate_evidence(input) {
            Ok(path) => {
                quest.document = Some(path);
                self.save_quest(&quest, "Evidence attached");
            }
            Err(e) => {
                tracing::warn!(error = %e, "rejected evidence file");
                self.set_message(e.to_string(), MessageType::Warning);
            }
        }
    }

    /// Toggle completion for the selected quest.
    pub fn toggle_completion(&mut self) {
        let Some(quest) = self.selected_quest().cloned() else {
            return;
        };

        if quest.is_completed() {
            let mut reopened = quest.clone();
            reopened.reopen();
            let msg = format!("'{}' reopened", reopened.title);
            self.save_quest(&reopened, &msg);
        } else {
            self.complete_quest(&quest);
        }
        self.select(quest.id);
    }

    fn complete_quest(&mut self, quest: &Quest) {
        if let Err(e) = self.db.set_completion(quest.id, Some(Utc::now())) {
            return self.report("complete quest", e);
        }

        let reward = self.config.rewards.quest_completed;
        self.award(reward);
        self.set_message(
            format!("'{}' completed! +{} points", quest.title, reward),
            MessageType::Success,
        );
        self.reload();
    }

    /// Check the selected quest's evidence and complete it on a match.
    pub fn analyze_selected(&mut self) {
        let Some(quest) = self.selected_quest().cloned() else {
            return;
        };
        if quest.is_completed() {
            self.set_message("Quest already completed", MessageType::Info);
            return;
        }

        match evidence::analyze(&quest, self.recognizer.as_ref()) {
            Ok(Analysis::Matched(words)) => {
                tracing::info!(quest = %quest.id, ?words, "evidence matched");
                self.complete_quest(&quest);
            }
            Ok(Analysis::NoMatch) => {
                self.set_message("Evidence does not match the quest title", MessageType::Warning);
            }
            Ok(Analysis::NoEvidence) => {
                self.set_message("Attach an evidence file first (f)", MessageType::Info);
            }
            Err(e) => self.report("analyze evidence", e),
        }
    }

    fn confirm_delete_quest(&mut self) {
        if let Some(quest) = self.selected_quest() {
            self.confirm_dialog = Some(ConfirmDialog {
                title: "Delete Quest".to_string(),
                message: format!("Delete '{}'? This cannot be undone. (y/n)", quest.title),
                action: ConfirmAction::DeleteQuest(quest.id),
            });
        }
    }

    /// Execute confirmed action.
    fn execute_confirm(&mut self, action: ConfirmAction) {
        match action {
            ConfirmAction::DeleteQuest(id) => match self.db.delete_quest(id) {
                Ok(_) => self.set_message("Quest deleted", MessageType::Success),
                Err(e) => self.report("delete quest", e),
            },
            ConfirmAction::EmptyDatabase => match self.db.empty() {
                Ok(n) => self.set_message(format!("Deleted {} quests", n), MessageType::Success),
                Err(e) => self.report("empty database", e),
            },
            ConfirmAction::ResetDatabase => match self.reset_database() {
                Ok(()) => self.set_message("Database reset", MessageType::Success),
                Err(e) => self.report("reset database", e),
            },
        }
        self.reload();
    }

    /// Delete the database file and open a fresh one in its place.
    ///
    /// The file is reopened even when the delete fails. If it cannot be
    /// reopened the session ends rather than writing to a throwaway store.
    fn reset_database(&mut self) -> DbResult<()> {
        let Some(path) = self.db_path.clone() else {
            return self.db.empty().map(|_| ());
        };

        let old = std::mem::replace(&mut self.db, Database::in_memory()?);
        let destroyed = old.destroy();
        match Database::open(&path) {
            Ok(db) => self.db = db,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "could not reopen quest database");
                self.fatal = Some(
                    anyhow::Error::new(e).context(format!("could not reopen {}", path.display())),
                );
            }
        }
        destroyed
    }

    fn claim_selected_challenge(&mut self) {
        let Some(kind) = self
            .board
            .statuses()
            .get(self.selected_challenge)
            .map(|s| s.kind)
        else {
            return;
        };

        match self.board.claim(kind, &self.quests, today()) {
            Some(reward) => {
                self.award(reward);
                self.set_message(format!("Challenge reward: +{} points", reward), MessageType::Success);
            }
            None => self.set_message("Nothing to claim yet", MessageType::Info),
        }
    }

    fn claim_prize(&mut self) {
        match self.board.claim_prize(&self.quests, today()) {
            Some(reward) => {
                self.award(reward);
                self.set_message(format!("Prize: +{} points", reward), MessageType::Success);
            }
            None => self.set_message("No prize available today", MessageType::Info),
        }
    }

    /// Pay for and start a roll.
    pub fn play(&mut self, now: Instant) {
        if self.machine.is_rolling() {
            return;
        }

        let cost = self.config.rewards.roll_cost;
        match self.ledger.spend(cost) {
            Ok(()) => {}
            Err(PointsError::InsufficientPoints { balance, cost }) => {
                self.set_message(
                    format!("Need {} points to roll, you have {}", cost, balance),
                    MessageType::Warning,
                );
                return;
            }
            // The deduction happened; only the save failed.
            Err(e) => tracing::error!(error = %e, "could not save points"),
        }

        self.machine.roll(&mut self.rng, now);
        self.set_message("Rolling...", MessageType::Info);
    }

    fn award(&mut self, amount: i64) {
        if let Err(e) = self.ledger.award(amount) {
            tracing::error!(error = %e, "could not save points");
        }
    }

    fn cycle_language(&mut self) {
        let next = self.ledger.language().next();
        if let Err(e) = self.ledger.set_language(next) {
            tracing::error!(error = %e, "could not save language");
        }
        self.set_message(format!("Language: {}", next.code()), MessageType::Info);
    }

    fn set_message(&mut self, message: impl Into<String>, kind: MessageType) {
        self.message = Some((message.into(), kind));
    }

    fn report(&mut self, action: &str, err: impl Display) {
        tracing::error!(action, error = %err, "operation failed");
        self.set_message(format!("Could not {}: {}", action, err), MessageType::Error);
    }
}

/// Today's local date.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::EvidenceError;
    use crate::points::Language;
    use crossterm::event::KeyModifiers;
    use std::path::Path;
    use std::time::Duration;

    fn test_app(points: i64) -> App {
        App::with_parts(
            Database::in_memory().unwrap(),
            PointsLedger::in_memory(points),
            Config::default(),
            StdRng::seed_from_u64(42),
        )
        .unwrap()
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    struct AlwaysMatch;

    impl Recognizer for AlwaysMatch {
        fn labels(&self, _path: &Path) -> Result<Vec<String>, EvidenceError> {
            Ok(vec!["read book".to_string()])
        }
    }

    #[test]
    fn test_add_quest_with_keys() {
        let mut app = test_app(0);
        press(&mut app, KeyCode::Char('a'));
        assert!(app.is_editing());
        type_text(&mut app, "Learn lifetimes");
        press(&mut app, KeyCode::Enter);

        assert!(!app.is_editing());
        assert_eq!(app.quests.len(), 1);
        assert_eq!(app.quests[0].title, "Learn lifetimes");
        assert!(!app.quests[0].is_completed());
    }

    #[test]
    fn test_completion_awards_points() {
        let mut app = test_app(7);
        app.add_quest("Write tests".to_string());

        app.toggle_completion();
        assert_eq!(app.ledger.balance(), 107);
        assert!(app.quests[0].is_completed());
        assert!(app.board.statuses().iter().any(|s| s.kind == ChallengeKind::Today && s.met));

        // Reopening keeps the points.
        app.toggle_completion();
        assert!(!app.quests[0].is_completed());
        assert_eq!(app.ledger.balance(), 107);
    }

    #[test]
    fn test_roll_rejected_without_points() {
        let mut app = test_app(2);
        app.play(Instant::now());

        assert!(!app.machine.is_rolling());
        assert_eq!(app.ledger.balance(), 2);
        assert!(matches!(app.message, Some((_, MessageType::Warning))));
    }

    #[test]
    fn test_roll_charges_and_settles() {
        let mut app = test_app(10);
        let start = Instant::now();
        app.play(start);
        assert!(app.machine.is_rolling());
        assert_eq!(app.ledger.balance(), 7);

        app.tick(start + Duration::from_secs(5));
        assert!(!app.machine.is_rolling());
        let expected = match app.machine.last_outcome() {
            Some(Outcome::Win) => 7 + app.config.rewards.roll_win,
            _ => 7,
        };
        assert_eq!(app.ledger.balance(), expected);
    }

    #[test]
    fn test_delete_requires_confirmation() {
        let mut app = test_app(0);
        app.add_quest("Keep".to_string());
        app.add_quest("Drop".to_string());

        press(&mut app, KeyCode::Char('d'));
        assert!(app.confirm_dialog.is_some());
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.quests.len(), 2);

        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Char('y'));
        assert_eq!(app.quests.len(), 1);
        assert_eq!(app.quests[0].title, "Keep");
    }

    #[test]
    fn test_empty_database_confirmed() {
        let mut app = test_app(0);
        for title in ["one", "two", "three"] {
            app.add_quest(title.to_string());
        }

        press(&mut app, KeyCode::Char('X'));
        press(&mut app, KeyCode::Char('y'));
        assert!(app.quests.is_empty());
        assert!(app.db.list_quests().unwrap().is_empty());
    }

    #[test]
    fn test_cycle_category_persists() {
        let mut app = test_app(0);
        app.add_quest("Refactor".to_string());

        press(&mut app, KeyCode::Char('c'));
        let id = app.quests[0].id;
        assert_eq!(app.db.get_quest(id).unwrap().unwrap().category, Category::Dev);
    }

    #[test]
    fn test_analysis_completes_matching_quest() {
        let mut app = test_app(0);
        app.set_recognizer(Box::new(AlwaysMatch));
        app.add_quest("Read a book".to_string());

        // No evidence attached yet.
        app.analyze_selected();
        assert!(!app.quests[0].is_completed());

        let mut quest = app.quests[0].clone();
        quest.document = Some(PathBuf::from("shelf.png"));
        app.db.update_quest(&quest).unwrap();
        app.refresh().unwrap();

        app.analyze_selected();
        assert!(app.quests[0].is_completed());
        assert_eq!(app.ledger.balance(), 100);
    }

    #[test]
    fn test_claim_challenge_and_prize() {
        let mut app = test_app(0);
        app.add_quest("Daily".to_string());
        app.toggle_completion();

        press(&mut app, KeyCode::Char('3'));
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.ledger.balance(), 150);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.ledger.balance(), 150);

        press(&mut app, KeyCode::Char('p'));
        assert_eq!(app.ledger.balance(), 200);
    }

    fn file_app(path: &Path) -> App {
        let mut app = App::with_parts(
            Database::open(path).unwrap(),
            PointsLedger::in_memory(0),
            Config::default(),
            StdRng::seed_from_u64(42),
        )
        .unwrap();
        app.db_path = Some(path.to_path_buf());
        app
    }

    fn titles_on_disk(path: &Path) -> Vec<String> {
        Database::open(path)
            .unwrap()
            .list_quests()
            .unwrap()
            .into_iter()
            .map(|q| q.title)
            .collect()
    }

    #[test]
    fn test_reset_database_starts_fresh_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quests.db");
        let mut app = file_app(&path);
        app.add_quest("Old".to_string());

        press(&mut app, KeyCode::Char('R'));
        press(&mut app, KeyCode::Char('y'));
        assert!(app.quests.is_empty());
        assert!(matches!(app.message, Some((_, MessageType::Success))));

        app.add_quest("After reset".to_string());
        assert_eq!(titles_on_disk(&path), vec!["After reset"]);
    }

    #[test]
    fn test_failed_reset_keeps_writing_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quests.db");
        let mut app = file_app(&path);
        app.add_quest("Old".to_string());

        // The delete fails because the file is already gone.
        std::fs::remove_file(&path).unwrap();
        app.execute_confirm(ConfirmAction::ResetDatabase);
        assert!(matches!(app.message, Some((_, MessageType::Error))));
        assert!(app.take_fatal().is_none());

        app.add_quest("After reset".to_string());
        assert_eq!(app.quests.len(), 1);
        assert_eq!(titles_on_disk(&path), vec!["After reset"]);
    }

    #[test]
    fn test_reset_that_cannot_reopen_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quests.db");
        let mut app = file_app(&path);
        app.db_path = Some(dir.path().join("missing").join("quests.db"));

        app.execute_confirm(ConfirmAction::ResetDatabase);
        assert!(app.take_fatal().is_some());
        assert!(app.take_fatal().is_none());
    }

    #[test]
    fn test_toggle_keeps_cursor_on_quest() {
        let mut app = test_app(0);
        app.add_quest("First".to_string());
        app.add_quest("Second".to_string());
        app.selected_index = 0;
        let id = app.quests[0].id;

        // Completed quests sort to the bottom.
        app.toggle_completion();
        assert_eq!(app.quests[1].id, id);
        assert_eq!(app.selected_quest().map(|q| q.id), Some(id));

        app.toggle_completion();
        assert!(app.quests.iter().all(|q| !q.is_completed()));
        assert_eq!(app.selected_quest().map(|q| q.id), Some(id));
        assert_eq!(app.ledger.balance(), 100);
    }

    #[test]
    fn test_tick_reevaluates_after_midnight() {
        let mut app = test_app(0);
        app.add_quest("Late".to_string());
        app.toggle_completion();
        assert!(app.board.prize_available(today()));

        // Pretend the board was last evaluated yesterday.
        app.day = today().pred_opt().unwrap();
        app.board.evaluate(&[], app.day);
        app.tick(Instant::now());

        assert_eq!(app.day, today());
        assert!(app.board.statuses()[0].met);
    }

    #[test]
    fn test_language_cycles() {
        let mut app = test_app(0);
        press(&mut app, KeyCode::Char('L'));
        assert_eq!(app.ledger.language(), Language::Fr);
    }

    #[test]
    fn test_calendar_counts_completions() {
        let mut app = test_app(0);
        app.add_quest("Today".to_string());
        app.toggle_completion();

        press(&mut app, KeyCode::Char('2'));
        assert_eq!(app.calendar_counts.get(&today()), Some(&1));

        press(&mut app, KeyCode::Char('h'));
        assert!(app.calendar_counts.is_empty());
    }
}
