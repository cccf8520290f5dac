pub mod relative;
pub mod report;

use std::io::{Stdout, stdout};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    style::Print,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use time::OffsetDateTime;

use crate::app::App;
use crate::usecase::badness::{MAX_BADNESS_SCORE, last_activity, review_score};
use relative::{ago, truncate};

pub fn run(mut app: App, tick_rate: Duration) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut last_tick = Instant::now();
    let res = loop {
        app.poll_sync();
        if app.take_alert() {
            execute!(terminal.backend_mut(), Print("\x07"))?;
        }
        terminal.draw(|f| draw(f, &app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
            && handle_key(&mut app, key.code)
        {
            break Ok(());
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }
    };

    cleanup_terminal(&mut terminal)?;
    res
}

/// Returns true when the user asked to quit.
fn handle_key(app: &mut App, code: KeyCode) -> bool {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => return true,
        KeyCode::Char('j') | KeyCode::Down => app.select_next(),
        KeyCode::Char('k') | KeyCode::Up => app.select_previous(),
        KeyCode::Enter | KeyCode::Char('o') => app.open_selected(),
        KeyCode::Char('w') => app.open_queue(),
        KeyCode::Char('r') => app.refresh(),
        _ => {}
    }
    false
}

fn draw(f: &mut ratatui::Frame, app: &App) {
    let size = f.area();
    let now = OffsetDateTime::now_utc();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(size);

    let header = render_header(app, now);
    f.render_widget(header, chunks[0]);

    let mut list_state = ListState::default();
    if !app.reviews.is_empty() {
        list_state.select(Some(app.selected));
    }

    let list = render_list(app, now);
    f.render_stateful_widget(list, chunks[1], &mut list_state);

    let footer = render_footer(app, now);
    f.render_widget(footer, chunks[2]);
}

fn score_color(score: i64) -> Color {
    match score {
        0..=1 => Color::Green,
        2..=4 => Color::Yellow,
        _ => Color::Red,
    }
}

/// `■■■□□□□` for a score of 3.
fn score_bar(score: u8) -> String {
    let filled = score.min(MAX_BADNESS_SCORE) as usize;
    let empty = MAX_BADNESS_SCORE as usize - filled;
    format!("{}{}", "■".repeat(filled), "□".repeat(empty))
}

fn render_header(app: &App, now: OffsetDateTime) -> Paragraph<'static> {
    let mut spans = vec![Span::styled("revwatch", Style::default().fg(Color::Cyan))];
    spans.push(Span::raw("  |  "));
    match app.current_score(now) {
        Some(score) => spans.push(Span::styled(
            format!("badness {} {score}/{MAX_BADNESS_SCORE}", score_bar(score)),
            Style::default()
                .fg(score_color(score as i64))
                .add_modifier(Modifier::BOLD),
        )),
        None => spans.push(Span::styled(
            "loading...",
            Style::default().fg(Color::DarkGray),
        )),
    }
    spans.push(Span::raw("  |  "));
    spans.push(Span::styled(
        format!("Pending: {}", app.reviews.len()),
        Style::default().fg(Color::Yellow),
    ));
    if app.is_syncing {
        spans.push(Span::raw("  |  "));
        spans.push(Span::styled(
            "⏳ Syncing GitHub...",
            Style::default().fg(Color::Magenta),
        ));
    }
    let line = Line::from(spans);
    Paragraph::new(line)
        .block(Block::default().title("Overview").borders(Borders::ALL))
        .wrap(Wrap { trim: true })
}

fn render_list(app: &App, now: OffsetDateTime) -> List<'static> {
    let items: Vec<ListItem> = if app.reviews.is_empty() && app.score.is_some() {
        vec![ListItem::new("Your review queue is empty. Good on ya! 🙌")
            .style(Style::default().fg(Color::Green))]
    } else {
        app.reviews
            .iter()
            .enumerate()
            .map(|(idx, review)| {
                let score = review_score(review, now, &app.calendar);
                let line = vec![
                    Span::styled(
                        format!(" {} ", score.min(MAX_BADNESS_SCORE as i64)),
                        Style::default().fg(score_color(score)),
                    ),
                    Span::raw(format!(
                        "{} [from {}] [last updated {}]",
                        truncate(&review.title, 60),
                        review.author,
                        ago(now, last_activity(review))
                    )),
                    Span::styled(
                        format!("  {}#{}", review.repo, review.number),
                        Style::default().fg(Color::DarkGray),
                    ),
                ];

                let style = if idx == app.selected {
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD | Modifier::REVERSED)
                } else {
                    Style::default()
                };

                ListItem::new(Line::from(line)).style(style)
            })
            .collect()
    };

    List::new(items)
        .block(
            Block::default()
                .title("Your pending reviews (j/k move ; Enter open ; w queue page ; r refresh)")
                .borders(Borders::ALL),
        )
        .highlight_symbol("➤ ")
}

fn render_footer(app: &App, now: OffsetDateTime) -> Paragraph<'static> {
    let msg = match (&app.status, app.last_synced) {
        (Some(status), _) => status.clone(),
        (None, Some(at)) => format!("Last synced {}", ago(now, at)),
        (None, None) => "q quit ; r refresh".to_string(),
    };
    Paragraph::new(msg).block(Block::default().title("Status").borders(Borders::ALL))
}

fn cleanup_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_bar_fills_left_to_right() {
        assert_eq!(score_bar(0), "□□□□□□□");
        assert_eq!(score_bar(3), "■■■□□□□");
        assert_eq!(score_bar(9), "■■■■■■■");
    }
}
