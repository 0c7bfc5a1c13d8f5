//! UI rendering for quest tracker.

use crate::app::{today, App, ConfirmDialog, EditField, MessageType, View};
use crate::calendar;
use crate::challenges::{ChallengeKind, ChallengeStatus};
use crate::game::Outcome;
use crate::models::Category;
use crate::points::Language;
use chrono::{Datelike, Local};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Row, Table, Wrap},
    Frame,
};
use std::time::Instant;

/// Localized labels.
struct Labels {
    tabs: [&'static str; 4],
    points: &'static str,
    no_quests: &'static str,
    quests: &'static str,
    completed: &'static str,
    category: &'static str,
    evidence: &'static str,
    none: &'static str,
    details: &'static str,
    totals: &'static str,
    challenges: &'static str,
    today_challenge: &'static str,
    streak_challenge: &'static str,
    total_challenge: &'static str,
    claimed: &'static str,
    claim: &'static str,
    in_progress: &'static str,
    prize_ready: &'static str,
    prize_locked: &'static str,
    rolling: &'static str,
    won: &'static str,
    lost: &'static str,
    cost: &'static str,
    win: &'static str,
    balance: &'static str,
    footer: [&'static str; 4],
    help: &'static str,
}

const HELP_EN: &str = r#"
Quest Tracker Keybindings

Views:
  1 2 3 4         Quests / Calendar / Prizes / Play
  L               Switch language

Quests:
  j/k, Up/Down    Move selection
  Space, Enter    Toggle completion
  a / e           Add / rename quest
  c               Cycle category
  f               Attach evidence image
  A               Analyze evidence
  d               Delete quest
  X               Empty database
  R               Delete database file

Calendar:         h/l month, t today
Prizes:           Enter claim, p prize
Play:             r or Space to roll

Press any key to close
"#;

const HELP_FR: &str = r#"
Raccourcis de Quest Tracker

Vues :
  1 2 3 4         Quêtes / Calendrier / Prix / Jouer
  L               Changer de langue

Quêtes :
  j/k, Haut/Bas   Déplacer la sélection
  Espace, Entrée  Terminer / rouvrir
  a / e           Ajouter / renommer une quête
  c               Changer de catégorie
  f               Joindre une image de preuve
  A               Analyser la preuve
  d               Supprimer la quête
  X               Vider la base
  R               Supprimer le fichier de la base

Calendrier :      h/l mois, t aujourd'hui
Prix :            Entrée réclamer, p prix
Jouer :           r ou Espace pour lancer

Appuyez sur une touche pour fermer
"#;

fn labels(language: Language) -> Labels {
    match language {
        Language::En => Labels {
            tabs: ["1:Quests", "2:Calendar", "3:Prizes", "4:Play"],
            points: "Points",
            no_quests: "No quests yet. Press 'a' to add one.",
            quests: "Quests",
            completed: "Completed",
            category: "Category",
            evidence: "Evidence",
            none: "none",
            details: "Details",
            totals: "Totals",
            challenges: "Challenges",
            today_challenge: "Complete at least one quest today",
            streak_challenge: "Complete quests on {} consecutive days",
            total_challenge: "Complete {} quests",
            claimed: "Reward claimed",
            claim: "Claim reward",
            in_progress: "In progress",
            prize_ready: "Prize available! Press 'p'",
            prize_locked: "Meet a challenge to unlock today's prize",
            rolling: "Rolling...",
            won: "Congratulations, you've won!",
            lost: "Try again",
            cost: "Cost",
            win: "Win",
            balance: "Balance",
            footer: [
                "j/k:Navigate  Space:Toggle  a:Add  e:Edit  c:Category  f:Evidence  A:Analyze  d:Delete  ?:Help  q:Quit",
                "h/l:Month  t:Today  ?:Help  q:Quit",
                "j/k:Navigate  Enter:Claim  p:Prize  ?:Help  q:Quit",
                "r/Space:Roll  ?:Help  q:Quit",
            ],
            help: HELP_EN,
        },
        Language::Fr => Labels {
            tabs: ["1:Quêtes", "2:Calendrier", "3:Prix", "4:Jouer"],
            points: "Points",
            no_quests: "Aucune quête. Appuyez sur 'a' pour en ajouter une.",
            quests: "Quêtes",
            completed: "Terminées",
            category: "Catégorie",
            evidence: "Preuve",
            none: "aucune",
            details: "Détails",
            totals: "Totaux",
            challenges: "Défis",
            today_challenge: "Terminer au moins une quête aujourd'hui",
            streak_challenge: "Terminer des quêtes {} jours de suite",
            total_challenge: "Terminer {} quêtes",
            claimed: "Récompense obtenue",
            claim: "Réclamer",
            in_progress: "En cours",
            prize_ready: "Prix disponible ! Appuyez sur 'p'",
            prize_locked: "Réussissez un défi pour débloquer le prix du jour",
            rolling: "Lancement...",
            won: "Bravo, vous avez gagné !",
            lost: "Réessayez",
            cost: "Coût",
            win: "Gain",
            balance: "Solde",
            footer: [
                "j/k:Naviguer  Espace:Terminer  a:Ajouter  e:Renommer  c:Catégorie  f:Preuve  A:Analyser  d:Supprimer  ?:Aide  q:Quitter",
                "h/l:Mois  t:Aujourd'hui  ?:Aide  q:Quitter",
                "j/k:Naviguer  Entrée:Réclamer  p:Prix  ?:Aide  q:Quitter",
                "r/Espace:Lancer  ?:Aide  q:Quitter",
            ],
            help: HELP_FR,
        },
    }
}

/// Draw the application.
pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content
            Constraint::Length(3), // Footer/status
        ])
        .split(f.area());

    let text = labels(app.ledger.language());

    draw_header(f, app, &text, chunks[0]);
    match app.view {
        View::Quests => draw_quests_view(f, app, &text, chunks[1]),
        View::Calendar => draw_calendar_view(f, app, &text, chunks[1]),
        View::Prizes => draw_prizes_view(f, app, &text, chunks[1]),
        View::Play => draw_play_view(f, app, &text, chunks[1]),
    }
    draw_footer(f, app, &text, chunks[2]);

    // Draw popups
    if app.show_help {
        draw_help_popup(f, &text);
    }

    if let Some(dialog) = &app.confirm_dialog {
        draw_confirm_dialog(f, dialog);
    }

    if app.is_editing() {
        draw_edit_dialog(f, app);
    }
}

fn draw_header(f: &mut Frame, app: &App, text: &Labels, area: Rect) {
    let title = format!(" Quest Tracker - {}: {} ", text.points, app.ledger.balance());

    let views = [View::Quests, View::Calendar, View::Prizes, View::Play];
    let mut tabs: Vec<Span> = Vec::new();
    for (label, view) in text.tabs.iter().zip(views) {
        if !tabs.is_empty() {
            tabs.push(Span::raw(" "));
        }
        tabs.push(styled_tab(label, app.view == view));
    }

    let header = Paragraph::new(Line::from(tabs))
        .block(Block::default().borders(Borders::ALL).title(title))
        .alignment(Alignment::Center);

    f.render_widget(header, area);
}

fn styled_tab(label: &str, active: bool) -> Span<'static> {
    if active {
        Span::styled(
            format!("[{}]", label),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled(format!(" {} ", label), Style::default().fg(Color::Gray))
    }
}

fn category_color(category: Category) -> Color {
    match category {
        Category::Study => Color::Cyan,
        Category::Dev => Color::Magenta,
        Category::Work => Color::Blue,
        Category::Health => Color::Green,
        Category::Home => Color::LightYellow,
    }
}

fn draw_quests_view(f: &mut Frame, app: &App, text: &Labels, area: Rect) {
    if app.quests.is_empty() {
        let msg = Paragraph::new(text.no_quests)
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center);
        f.render_widget(msg, area);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(5)])
        .split(area);

    let items: Vec<ListItem> = app
        .quests
        .iter()
        .enumerate()
        .map(|(i, quest)| {
            let completed = quest.is_completed();
            let checkbox = if completed { "[x]" } else { "[ ]" };

            let name_style = if completed {
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::CROSSED_OUT)
            } else if i == app.selected_index {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };

            let mut spans = vec![
                Span::styled(
                    checkbox,
                    Style::default().fg(if completed { Color::Green } else { Color::Gray }),
                ),
                Span::raw(" "),
                Span::styled(quest.title.as_str(), name_style),
                Span::raw(" "),
                Span::styled(
                    format!("[{}]", quest.category.as_str()),
                    Style::default().fg(category_color(quest.category)),
                ),
            ];

            // Evidence indicator
            if quest.document.is_some() {
                spans.push(Span::styled(" *", Style::default().fg(Color::Blue)));
            }

            let style = if i == app.selected_index {
                Style::default().bg(Color::DarkGray)
            } else {
                Style::default()
            };

            ListItem::new(Line::from(spans)).style(style)
        })
        .collect();

    let done = app.quests.iter().filter(|q| q.is_completed()).count();
    let title = format!(
        " {} ({}/{} {}) ",
        text.quests,
        done,
        app.quests.len(),
        text.completed.to_lowercase()
    );
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(list, chunks[0]);

    draw_quest_details(f, app, text, chunks[1]);
}

fn draw_quest_details(f: &mut Frame, app: &App, text: &Labels, area: Rect) {
    let Some(quest) = app.selected_quest() else {
        return;
    };

    let completed = match quest.completion_date {
        Some(at) => at
            .with_timezone(&Local)
            .format(&app.config.display.date_format)
            .to_string(),
        None => "-".to_string(),
    };
    let evidence = quest
        .document
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| text.none.to_string());

    let label = |name: &str| Span::styled(format!("{}: ", name), Style::default().fg(Color::DarkGray));
    let details = vec![
        Line::from(vec![
            label(text.category),
            Span::raw(quest.category.as_str()),
            Span::raw("   "),
            label(text.completed),
            Span::raw(completed),
        ]),
        Line::from(vec![label(text.evidence), Span::raw(evidence)]),
    ];

    let widget = Paragraph::new(details)
        .block(Block::default().borders(Borders::ALL).title(format!(" {} ", text.details)))
        .wrap(Wrap { trim: true });
    f.render_widget(widget, area);
}

fn draw_calendar_view(f: &mut Frame, app: &App, text: &Labels, area: Rect) {
    let week_start = app.config.display.week_start;
    let month = app.calendar_month;
    let today = today();

    let mut lines: Vec<Line> = Vec::new();
    let header: Vec<Span> = calendar::weekday_labels(week_start)
        .iter()
        .map(|d| Span::styled(format!(" {:>3} ", d), Style::default().fg(Color::DarkGray)))
        .collect();
    lines.push(Line::from(header));

    for week in calendar::month_grid(month, week_start) {
        let spans: Vec<Span> = week
            .iter()
            .map(|date| {
                if date.month() != month.month() {
                    return Span::raw("     ");
                }
                let count = app.calendar_counts.get(date).copied().unwrap_or(0);
                let mut style = Style::default().bg(count_to_color(count));
                if *date == today {
                    style = style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
                }
                Span::styled(format!(" {:>3} ", date.day()), style)
            })
            .collect();
        lines.push(Line::from(spans));
    }

    let total: u32 = app.calendar_counts.values().sum();
    let title = format!(
        " {} ({} {}) ",
        month.format("%m/%Y"),
        total,
        text.completed.to_lowercase()
    );
    let grid = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title))
        .alignment(Alignment::Center);

    f.render_widget(grid, area);
}

fn count_to_color(count: u32) -> Color {
    match count {
        0 => Color::Rgb(22, 27, 34),
        1 => Color::Rgb(14, 68, 41),
        2 => Color::Rgb(0, 109, 50),
        3 => Color::Rgb(38, 166, 65),
        _ => Color::Rgb(57, 211, 83),
    }
}

fn challenge_title(app: &App, text: &Labels, kind: ChallengeKind) -> String {
    let thresholds = app.board.thresholds();
    match kind {
        ChallengeKind::Today => text.today_challenge.to_string(),
        ChallengeKind::Streak => text
            .streak_challenge
            .replace("{}", &thresholds.consecutive_days.to_string()),
        ChallengeKind::Total => text
            .total_challenge
            .replace("{}", &thresholds.total_quests.to_string()),
    }
}

fn challenge_state(status: &ChallengeStatus, text: &Labels) -> (String, Color) {
    if status.claimed {
        (text.claimed.to_string(), Color::DarkGray)
    } else if status.met {
        (format!("{} (+{})", text.claim, status.reward), Color::Green)
    } else {
        (text.in_progress.to_string(), Color::Yellow)
    }
}

fn draw_prizes_view(f: &mut Frame, app: &App, text: &Labels, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(Category::ALL.len() as u16 + 4),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(area);

    let header = Row::new(vec![text.category, text.completed])
        .style(Style::default().add_modifier(Modifier::BOLD))
        .bottom_margin(1);
    let rows: Vec<Row> = Category::ALL
        .iter()
        .map(|c| {
            let count = app.category_counts.get(c).copied().unwrap_or(0);
            Row::new(vec![c.as_str().to_string(), count.to_string()])
        })
        .collect();
    let table = Table::new(rows, [Constraint::Percentage(60), Constraint::Percentage(40)])
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", text.totals)),
        );
    f.render_widget(table, chunks[0]);

    let items: Vec<ListItem> = app
        .board
        .statuses()
        .iter()
        .enumerate()
        .map(|(i, status)| {
            let (state, color) = challenge_state(status, text);
            let mark = if status.met { "[x]" } else { "[ ]" };
            let line = Line::from(vec![
                Span::styled(mark, Style::default().fg(color)),
                Span::raw(" "),
                Span::raw(challenge_title(app, text, status.kind)),
                Span::raw(" - "),
                Span::styled(state, Style::default().fg(color)),
            ]);
            let style = if i == app.selected_challenge {
                Style::default().bg(Color::DarkGray)
            } else {
                Style::default()
            };
            ListItem::new(line).style(style)
        })
        .collect();
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} ", text.challenges)),
    );
    f.render_widget(list, chunks[1]);

    let prize = if app.board.prize_available(today()) {
        Paragraph::new(format!("{} (+{})", text.prize_ready, app.config.rewards.prize))
            .style(Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
    } else {
        Paragraph::new(text.prize_locked)
            .style(Style::default().fg(Color::DarkGray))
    };
    f.render_widget(
        prize
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center),
        chunks[2],
    );
}

fn draw_play_view(f: &mut Frame, app: &App, text: &Labels, area: Rect) {
    let now = Instant::now();
    let revealed = app.machine.revealed(now);
    let slots = app.machine.slots();

    let mut reel: Vec<Span> = Vec::new();
    for (symbol, shown) in slots.iter().zip(revealed) {
        let (glyph, style) = if shown {
            (symbol.glyph(), Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        } else {
            ("~", Style::default().fg(Color::DarkGray))
        };
        reel.push(Span::raw("   [ "));
        reel.push(Span::styled(glyph, style));
        reel.push(Span::raw(" ]   "));
    }

    let status = match (app.machine.is_rolling(), app.machine.last_outcome()) {
        (true, _) => Span::styled(text.rolling, Style::default().fg(Color::Cyan)),
        (false, Some(Outcome::Win)) => Span::styled(
            text.won,
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ),
        (false, Some(Outcome::Lose)) => Span::styled(text.lost, Style::default().fg(Color::Gray)),
        (false, None) => Span::raw(""),
    };

    let lines = vec![
        Line::from(""),
        Line::from(reel),
        Line::from(""),
        Line::from(status),
        Line::from(""),
        Line::from(Span::styled(
            format!(
                "{}: {}  {}: +{}  {}: {}",
                text.cost,
                app.config.rewards.roll_cost,
                text.win,
                app.config.rewards.roll_win,
                text.balance,
                app.ledger.balance()
            ),
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Enhancer "))
        .alignment(Alignment::Center);
    f.render_widget(widget, area);
}

fn draw_footer(f: &mut Frame, app: &App, text: &Labels, area: Rect) {
    let (msg, style) = if let Some((ref message, msg_type)) = app.message {
        let color = match msg_type {
            MessageType::Info => Color::Blue,
            MessageType::Success => Color::Green,
            MessageType::Warning => Color::Yellow,
            MessageType::Error => Color::Red,
        };
        (message.clone(), Style::default().fg(color))
    } else {
        let help = match app.view {
            View::Quests => text.footer[0],
            View::Calendar => text.footer[1],
            View::Prizes => text.footer[2],
            View::Play => text.footer[3],
        };
        (help.to_string(), Style::default().fg(Color::DarkGray))
    };

    let footer = Paragraph::new(msg)
        .style(style)
        .block(Block::default().borders(Borders::ALL));

    f.render_widget(footer, area);
}

fn draw_help_popup(f: &mut Frame, text: &Labels) {
    let area = centered_rect(60, 80, f.area());
    f.render_widget(Clear, area);

    let popup = Paragraph::new(text.help)
        .block(Block::default().borders(Borders::ALL).title(" ? "))
        .wrap(Wrap { trim: false });

    f.render_widget(popup, area);
}

fn draw_confirm_dialog(f: &mut Frame, dialog: &ConfirmDialog) {
    let area = centered_rect(50, 20, f.area());
    f.render_widget(Clear, area);

    let text = Paragraph::new(dialog.message.clone())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", dialog.title)),
        )
        .wrap(Wrap { trim: true })
        .alignment(Alignment::Center);

    f.render_widget(text, area);
}

fn draw_edit_dialog(f: &mut Frame, app: &App) {
    let area = centered_rect(50, 20, f.area());
    f.render_widget(Clear, area);

    let title = match app.editing_field {
        EditField::NewQuest => "New quest title",
        EditField::QuestTitle => "Rename quest",
        EditField::Evidence => "Evidence image path (jpg/png, empty to clear)",
        EditField::None => "",
    };

    let input = Paragraph::new(app.input_buffer.as_str())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", title)),
        )
        .style(Style::default().fg(Color::Yellow));

    f.render_widget(input, area);

    // Show cursor
    f.set_cursor_position((
        area.x + 1 + app.input_buffer.chars().count() as u16,
        area.y + 1,
    ));
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::Database;
    use crate::points::PointsLedger;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use ratatui::{backend::TestBackend, Terminal};

    fn render(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|f| draw(f, app)).unwrap();

        let buffer = terminal.backend().buffer();
        let mut out = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    fn test_app() -> App {
        App::with_parts(
            Database::in_memory().unwrap(),
            PointsLedger::in_memory(12),
            Config::default(),
            StdRng::seed_from_u64(0),
        )
        .unwrap()
    }

    #[test]
    fn test_empty_quest_list() {
        let app = test_app();
        let screen = render(&app);
        assert!(screen.contains("No quests yet"));
        assert!(screen.contains("Points: 12"));
    }

    #[test]
    fn test_quest_list_and_details() {
        let mut app = test_app();
        app.add_quest("Practice scales".to_string());
        let screen = render(&app);
        assert!(screen.contains("[ ] Practice scales [Study]"));
        assert!(screen.contains("Evidence: none"));
    }

    #[test]
    fn test_every_view_renders() {
        let mut app = test_app();
        app.add_quest("Stretch".to_string());
        app.toggle_completion();

        app.view = View::Calendar;
        app.refresh().unwrap();
        assert!(render(&app).contains("(1 completed)"));

        app.view = View::Prizes;
        let screen = render(&app);
        assert!(screen.contains("Complete at least one quest today"));
        assert!(screen.contains("Prize available!"));

        app.view = View::Play;
        assert!(render(&app).contains("Balance: 112"));
    }

    #[test]
    fn test_french_labels() {
        let mut app = test_app();
        app.add_quest("Stretch".to_string());
        app.toggle_completion();
        app.ledger.set_language(Language::Fr).unwrap();
        app.message = None;

        let screen = render(&app);
        assert!(screen.contains("Quêtes (1/1 terminées)"));
        assert!(screen.contains("Espace:Terminer"));
        assert!(screen.contains("Preuve: aucune"));

        app.view = View::Prizes;
        let screen = render(&app);
        assert!(screen.contains("Terminer au moins une quête aujourd'hui"));
        assert!(screen.contains("Terminer des quêtes 5 jours de suite"));
        assert!(screen.contains("Prix disponible !"));

        app.view = View::Play;
        assert!(render(&app).contains("Solde: 112"));

        app.show_help = true;
        assert!(render(&app).contains("Changer de langue"));
    }
}
