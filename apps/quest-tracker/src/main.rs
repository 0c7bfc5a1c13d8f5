//! Quest Tracker - Complete quests, earn points, and roll for more.
//!
//! Features:
//! - Quests with categories, evidence files, and completion dates
//! - Points for completions, challenges, and a daily prize
//! - Three-slot dice roll paid for with points
//! - Month calendar of completions
//! - SQLite persistence with versioned migrations

mod app;
mod calendar;
mod challenges;
mod config;
mod db;
mod evidence;
mod game;
mod models;
mod points;
mod ui;

use anyhow::Result;
use app::App;
use config::Config;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::fs::OpenOptions;
use std::{
    io,
    time::{Duration, Instant},
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Send logs to a file; the terminal belongs to the UI.
fn init_logging() -> Result<()> {
    let Some(log_path) = Config::log_path() else {
        return Ok(());
    };
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&log_path)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(file)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    tracing::info!(path = %log_path.display(), "quest tracker starting");
    Ok(())
}

fn main() -> Result<()> {
    init_logging()?;
    let mut app = App::new()?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run app
    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(ref err) = result {
        tracing::error!(error = %err, "quest tracker exited with error");
    }
    result
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        app.tick(Instant::now());
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }
                if app.can_quit() && key.code == KeyCode::Char('q') {
                    return Ok(());
                }
                app.handle_key(key);
                if let Some(err) = app.take_fatal() {
                    return Err(err);
                }
            }
        }
    }
}
